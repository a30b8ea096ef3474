pub use crate::cell::{GruCell, Linear, LstmCell, RnnCell, ZoneoutLstmCell};
pub use crate::error::{IoError, ModelError, RecordError};
pub use crate::golden::{GoldenFile, GoldenManifest, GoldenWriter, SectionKind};
pub use crate::loss::{Identity, Loss, MeanSquaredError};
pub use crate::model::{
    FcUnroll, GruCellStacked, LstmStacked, RecurrentModel, RnnCellStacked, Tensor,
    ZoneoutLstmStacked,
};
pub use crate::recorder::{RecordOptions, global_grad_norm, record};
