mod gru_cell;
mod linear;
mod lstm_cell;
mod rnn_cell;
mod zoneout_lstm_cell;

pub use gru_cell::GruCell;
pub use linear::Linear;
pub use lstm_cell::LstmCell;
pub use rnn_cell::RnnCell;
pub use zoneout_lstm_cell::ZoneoutLstmCell;

use crate::model::Tensor;
use ndarray::{Array, Array2};
use ndarray_rand::RandomExt;
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::Uniform;

/// Half-width of the uniform interval kernels are drawn from.
pub const INIT_SCALE: f32 = 0.05;

/// Random kernel initialization shared by all cells: Uniform(-0.05, 0.05)
/// drawn from the caller's seeded RNG so fixture runs are reproducible.
pub(crate) fn init_kernel<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Array2<f32> {
    Array::random_using((rows, cols), Uniform::new(-INIT_SCALE, INIT_SCALE), rng)
}

/// One parameter group of a recurrent cell: an input kernel, a recurrent
/// kernel, a bias, and the matching gradient accumulators.
///
/// The gradient buffers are zero-initialized and accumulated across unroll
/// steps during `backprop_step`, so a cell must call `zero_grad` between
/// training iterations.
#[derive(Debug)]
pub(crate) struct Gate {
    pub kernel: Array2<f32>,           // (input_dim, units)
    pub recurrent_kernel: Array2<f32>, // (units, units)
    pub bias: Array2<f32>,             // (1, units)
    pub grad_kernel: Array2<f32>,
    pub grad_recurrent_kernel: Array2<f32>,
    pub grad_bias: Array2<f32>,
}

impl Gate {
    pub fn new<R: Rng + ?Sized>(input_dim: usize, units: usize, rng: &mut R) -> Self {
        Self {
            kernel: init_kernel(input_dim, units, rng),
            recurrent_kernel: init_kernel(units, units, rng),
            bias: Array2::zeros((1, units)),
            grad_kernel: Array2::zeros((input_dim, units)),
            grad_recurrent_kernel: Array2::zeros((units, units)),
            grad_bias: Array2::zeros((1, units)),
        }
    }

    pub fn zero_grad(&mut self) {
        self.grad_kernel.fill(0.0);
        self.grad_recurrent_kernel.fill(0.0);
        self.grad_bias.fill(0.0);
    }

    pub fn scale_grad(&mut self, factor: f32) {
        self.grad_kernel *= factor;
        self.grad_recurrent_kernel *= factor;
        self.grad_bias *= factor;
    }

    /// SGD step over the three parameter sets, updated in parallel.
    pub fn apply_sgd(&mut self, lr: f32) {
        let Gate {
            kernel,
            recurrent_kernel,
            bias,
            grad_kernel,
            grad_recurrent_kernel,
            grad_bias,
        } = self;
        rayon::join(
            || {
                rayon::join(
                    || kernel.scaled_add(-lr, &*grad_kernel),
                    || recurrent_kernel.scaled_add(-lr, &*grad_recurrent_kernel),
                )
            },
            || bias.scaled_add(-lr, &*grad_bias),
        );
    }

    /// Appends `(name, value)` pairs for this gate's parameters in the fixed
    /// recording order: kernel, recurrent kernel, bias.
    pub fn collect_params(&self, prefix: &str, out: &mut Vec<(String, Tensor)>) {
        out.push((format!("{}:kernel", prefix), self.kernel.clone().into_dyn()));
        out.push((
            format!("{}:recurrent_kernel", prefix),
            self.recurrent_kernel.clone().into_dyn(),
        ));
        out.push((format!("{}:bias", prefix), self.bias.clone().into_dyn()));
    }

    /// Same order as `collect_params`, for the gradient accumulators.
    pub fn collect_grads(&self, prefix: &str, out: &mut Vec<(String, Tensor)>) {
        out.push((
            format!("{}:kernel", prefix),
            self.grad_kernel.clone().into_dyn(),
        ));
        out.push((
            format!("{}:recurrent_kernel", prefix),
            self.grad_recurrent_kernel.clone().into_dyn(),
        ));
        out.push((format!("{}:bias", prefix), self.grad_bias.clone().into_dyn()));
    }
}

pub(crate) fn sigmoid(z: &Array2<f32>) -> Array2<f32> {
    z.mapv(|x| 1.0 / (1.0 + (-x).exp()))
}

pub(crate) fn tanh(z: &Array2<f32>) -> Array2<f32> {
    z.mapv(f32::tanh)
}
