use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Error types that can occur while driving a fixture model
///
/// # Variants
///
/// - `InputValidationError` - indicates the input data provided does not meet the expected format, type, or validation rules
/// - `ProcessingError` - indicates that there is something wrong while processing, e.g. running backward before forward
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    InputValidationError(String),
    ProcessingError(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::InputValidationError(msg) => write!(f, "Input validation error: {}", msg),
            ModelError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

/// Input/Output error types that can occur while writing or reading golden artifacts
///
/// # Variants
///
/// - `StdIoError` - Wraps standard I/O errors from file system operations (reading, writing, file access)
/// - `JsonError` - Wraps JSON serialization/deserialization errors for the golden manifest
#[derive(Debug)]
pub enum IoError {
    StdIoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl IoError {
    pub fn load_in_buf_reader(path: &Path) -> Result<BufReader<File>, IoError> {
        let file = File::open(path).map_err(IoError::StdIoError)?;
        Ok(BufReader::new(file))
    }
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::StdIoError(e) => write!(f, "IO error: {}", e),
            IoError::JsonError(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for IoError {}

/// Combined error type for a full recording run, which touches both the model
/// (forward/backward) and the filesystem (golden artifacts).
///
/// # Variants
///
/// - `Model` - a `ModelError` raised while running the model
/// - `Io` - an `IoError` raised while writing or reading golden files
#[derive(Debug)]
pub enum RecordError {
    Model(ModelError),
    Io(IoError),
}

impl From<ModelError> for RecordError {
    fn from(e: ModelError) -> Self {
        RecordError::Model(e)
    }
}

impl From<IoError> for RecordError {
    fn from(e: IoError) -> Self {
        RecordError::Io(e)
    }
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::Model(e) => write!(f, "{}", e),
            RecordError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RecordError {}
