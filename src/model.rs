mod fc_unroll;
mod gru_stacked;
mod lstm_stacked;
mod rnn_stacked;
mod zoneout_lstm_stacked;

pub use fc_unroll::FcUnroll;
pub use gru_stacked::GruCellStacked;
pub use lstm_stacked::LstmStacked;
pub use rnn_stacked::RnnCellStacked;
pub use zoneout_lstm_stacked::ZoneoutLstmStacked;

use crate::ModelError;
use ndarray::ArrayD;

/// Type alias for the n-dimensional arrays flowing across model boundaries.
pub type Tensor = ArrayD<f32>;

/// Input/hidden width shared by the LSTM, zoneout LSTM and GRU fixtures.
pub(crate) const NARROW_WIDTH: usize = 2;

/// Interface the recorder drives a fixture model through.
///
/// One training iteration is `forward` followed by `backward` followed by
/// `apply_gradients`; `parameters` and `gradients` enumerate named tensors in
/// a fixed order so recorded artifacts are stable across runs.
pub trait RecurrentModel {
    /// Runs the unrolled forward pass over one batch of synthetic inputs and
    /// labels, returning the output tensor and the scalar loss.
    fn forward(&mut self, inputs: &[Tensor], labels: &[Tensor]) -> (Tensor, f32);

    /// Backpropagates through the cached forward pass, accumulating parameter
    /// gradients. Fails if no forward pass has been run since the last
    /// `zero_gradients`.
    fn backward(&mut self) -> Result<(), ModelError>;

    /// Named parameter snapshots, in recording order.
    fn parameters(&self) -> Vec<(String, Tensor)>;

    /// Named gradient snapshots, in the same order as `parameters`.
    fn gradients(&self) -> Vec<(String, Tensor)>;

    /// Clears gradient accumulators and forward caches.
    fn zero_gradients(&mut self);

    /// Rescales all gradient accumulators, used for global-norm clipping.
    fn scale_gradients(&mut self, factor: f32);

    /// Applies one SGD step with the given learning rate.
    fn apply_gradients(&mut self, learning_rate: f32);
}
