/// Module `error` contains the error types used across the crate.
///
/// - `ModelError` - errors raised while running a fixture model (validation, sequencing)
/// - `IoError` - errors raised while writing or reading golden artifacts
/// - `RecordError` - combination of the two, returned by a full recording run
pub mod error;

pub use error::{IoError, ModelError, RecordError};

/// Module `cell` contains the per-step recurrent cells the fixture variants
/// are built from.
///
/// Each cell owns its weights and gradient accumulators and exposes a
/// per-timestep `step` / `backprop_step` pair, caching whatever the backward
/// pass needs. Available cells:
///
/// - `Linear` - affine map, the building block of the FC unroll variant
/// - `RnnCell` - vanilla tanh recurrent cell
/// - `LstmCell` - four-gate LSTM cell with explicit hidden/cell state
/// - `ZoneoutLstmCell` - LSTM cell with pre-sampled zoneout retention masks
/// - `GruCell` - three-gate GRU cell
pub mod cell;

/// Module `loss` contains the loss functions wired into the fixture models.
///
/// - `MeanSquaredError` - mean over all elements, used by the recurrent variants
/// - `Identity` - pass-through loss with sum reduction, used by the FC unroll variant
pub mod loss;

/// Module `model` contains the five fixture model variants and the
/// `RecurrentModel` trait the recorder drives them through.
///
/// All recurrent variants share the same unroll topology: a stack of cells is
/// stepped `unroll_for` times, the top cell's hidden state is collected per
/// step and also fed back as the next step's bottom input, and the collected
/// states are stacked into the output tensor `(batch, unroll_for, hidden)`.
///
/// # Example
/// ```rust
/// use recurrent_goldens::prelude::*;
/// use ndarray::Array;
/// use ndarray_rand::rand::{SeedableRng, rngs::StdRng};
///
/// let mut rng = StdRng::seed_from_u64(42);
/// let mut model = LstmStacked::new(2, 1, &mut rng);
///
/// let inputs = vec![Array::zeros((3, 2)).into_dyn()];
/// let labels = vec![Array::zeros((3, 2, 2)).into_dyn()];
/// let (output, loss) = model.forward(&inputs, &labels);
/// assert_eq!(output.shape(), &[3, 2, 2]);
/// assert!(loss >= 0.0);
/// ```
pub mod model;

/// Module `recorder` runs a fixture model for a fixed number of training
/// iterations and records inputs, labels, weights, outputs, gradients and
/// losses into a golden artifact pair (`<name>.nnmodelgolden` +
/// `<name>.json`) consumed by an external numerical-validation harness.
pub mod recorder;

/// Module `golden` contains the on-disk golden artifact format: a raw
/// little-endian f32 stream plus a JSON manifest describing its sections.
pub mod golden;

/// A convenience module that re-exports the most commonly used types of this
/// crate, enabling quick access with a single `use` statement.
pub mod prelude;

#[cfg(test)]
mod test;
