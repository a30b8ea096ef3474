use crate::IoError;
use crate::model::Tensor;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Extension of the raw value stream of a golden artifact pair.
pub const GOLDEN_EXTENSION: &str = "nnmodelgolden";
/// Extension of the manifest of a golden artifact pair.
pub const MANIFEST_EXTENSION: &str = "json";

/// What a recorded section holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Input,
    Label,
    Weight,
    Output,
    Gradient,
    Loss,
}

/// One recorded tensor: its position in the run, what it is, and how many
/// f32 values of the stream belong to it. Sections appear in the manifest in
/// exactly the order their values appear in the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldenSection {
    pub iteration: usize,
    pub kind: SectionKind,
    pub label: String,
    pub len: usize,
}

/// Manifest half of a golden artifact pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldenManifest {
    pub name: String,
    pub iterations: usize,
    pub sections: Vec<GoldenSection>,
}

fn data_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, GOLDEN_EXTENSION))
}

fn manifest_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, MANIFEST_EXTENSION))
}

/// Streaming writer for a golden artifact pair.
///
/// Values go straight to the `.nnmodelgolden` stream as little-endian f32;
/// the manifest is accumulated in memory and written by `finish`.
pub struct GoldenWriter {
    data: BufWriter<File>,
    manifest: GoldenManifest,
    manifest_path: PathBuf,
}

impl GoldenWriter {
    pub fn create(dir: &Path, name: &str) -> Result<Self, IoError> {
        let file = File::create(data_path(dir, name)).map_err(IoError::StdIoError)?;
        Ok(Self {
            data: BufWriter::new(file),
            manifest: GoldenManifest {
                name: name.to_string(),
                iterations: 0,
                sections: Vec::new(),
            },
            manifest_path: manifest_path(dir, name),
        })
    }

    fn push_values(
        &mut self,
        iteration: usize,
        kind: SectionKind,
        label: &str,
        values: &[f32],
    ) -> Result<(), IoError> {
        for v in values {
            self.data
                .write_all(&v.to_le_bytes())
                .map_err(IoError::StdIoError)?;
        }
        self.manifest.sections.push(GoldenSection {
            iteration,
            kind,
            label: label.to_string(),
            len: values.len(),
        });
        self.manifest.iterations = self.manifest.iterations.max(iteration + 1);
        Ok(())
    }

    /// Appends one tensor-valued section.
    pub fn push_tensor(
        &mut self,
        iteration: usize,
        kind: SectionKind,
        label: &str,
        tensor: &Tensor,
    ) -> Result<(), IoError> {
        let values: Vec<f32> = tensor.iter().copied().collect();
        self.push_values(iteration, kind, label, &values)
    }

    /// Appends one scalar-valued section.
    pub fn push_scalar(
        &mut self,
        iteration: usize,
        kind: SectionKind,
        label: &str,
        value: f32,
    ) -> Result<(), IoError> {
        self.push_values(iteration, kind, label, &[value])
    }

    /// Flushes the value stream and writes the manifest, completing the pair.
    pub fn finish(mut self) -> Result<GoldenManifest, IoError> {
        self.data.flush().map_err(IoError::StdIoError)?;
        let file = File::create(&self.manifest_path).map_err(IoError::StdIoError)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.manifest)
            .map_err(IoError::JsonError)?;
        Ok(self.manifest)
    }
}

/// A golden artifact pair read back into memory, section by section.
pub struct GoldenFile {
    pub manifest: GoldenManifest,
    pub values: Vec<Vec<f32>>,
}

impl GoldenFile {
    pub fn open(dir: &Path, name: &str) -> Result<Self, IoError> {
        let reader = IoError::load_in_buf_reader(&manifest_path(dir, name))?;
        let manifest: GoldenManifest = serde_json::from_reader(reader).map_err(IoError::JsonError)?;

        let mut bytes = Vec::new();
        IoError::load_in_buf_reader(&data_path(dir, name))?
            .read_to_end(&mut bytes)
            .map_err(IoError::StdIoError)?;

        let mut values = Vec::with_capacity(manifest.sections.len());
        let mut offset = 0usize;
        for section in &manifest.sections {
            let end = offset + section.len * 4;
            if end > bytes.len() {
                return Err(IoError::StdIoError(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!(
                        "golden stream for '{}' ends inside section '{}'",
                        manifest.name, section.label
                    ),
                )));
            }
            let section_values = bytes[offset..end]
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect();
            values.push(section_values);
            offset = end;
        }
        Ok(Self { manifest, values })
    }

    /// Prints a per-section summary of the artifact, a debugging aid for
    /// eyeballing freshly generated goldens.
    pub fn inspect(&self) {
        println!(
            "golden '{}': {} iterations, {} sections",
            self.manifest.name,
            self.manifest.iterations,
            self.manifest.sections.len()
        );
        for (section, values) in self.manifest.sections.iter().zip(&self.values) {
            let (mut min, mut max, mut sum) = (f32::INFINITY, f32::NEG_INFINITY, 0.0f32);
            for &v in values {
                min = min.min(v);
                max = max.max(v);
                sum += v;
            }
            let mean = if values.is_empty() {
                0.0
            } else {
                sum / values.len() as f32
            };
            println!(
                "  [iter {}] {:?} {} ({} values) min={:.6} max={:.6} mean={:.6}",
                section.iteration, section.kind, section.label, section.len, min, max, mean
            );
        }
    }
}
