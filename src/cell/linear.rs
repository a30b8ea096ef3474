use super::init_kernel;
use crate::ModelError;
use crate::model::Tensor;
use ndarray::{Array2, Axis};
use ndarray_rand::rand::Rng;

/// Affine map `y = xW + b` used as the per-step building block of the FC
/// unroll fixture variant.
///
/// Inputs are cached in application order; `backprop_step` pops them in
/// reverse, so the backward pass must mirror the forward pass step for step.
pub struct Linear {
    input_dim: usize,
    units: usize,
    kernel: Array2<f32>, // (input_dim, units)
    bias: Array2<f32>,   // (1, units)
    grad_kernel: Array2<f32>,
    grad_bias: Array2<f32>,
    input_cache: Vec<Array2<f32>>,
}

impl Linear {
    pub fn new<R: Rng + ?Sized>(input_dim: usize, units: usize, rng: &mut R) -> Self {
        Self {
            input_dim,
            units,
            kernel: init_kernel(input_dim, units, rng),
            bias: Array2::zeros((1, units)),
            grad_kernel: Array2::zeros((input_dim, units)),
            grad_bias: Array2::zeros((1, units)),
            input_cache: Vec::new(),
        }
    }

    pub fn units(&self) -> usize {
        self.units
    }

    /// Applies the affine map to one step's input, caching it for backward.
    pub fn step(&mut self, x: &Array2<f32>) -> Array2<f32> {
        debug_assert_eq!(x.ncols(), self.input_dim);
        self.input_cache.push(x.clone());
        x.dot(&self.kernel) + &self.bias
    }

    /// Accumulates parameter gradients for the most recent un-backpropped
    /// application and returns the gradient w.r.t. its input.
    pub fn backprop_step(&mut self, d_y: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
        let x = self.input_cache.pop().ok_or_else(|| {
            ModelError::ProcessingError("Forward pass has not been run".to_string())
        })?;
        self.grad_kernel += &x.t().dot(d_y);
        self.grad_bias += &d_y.sum_axis(Axis(0)).insert_axis(Axis(0));
        Ok(d_y.dot(&self.kernel.t()))
    }

    pub fn zero_grad(&mut self) {
        self.grad_kernel.fill(0.0);
        self.grad_bias.fill(0.0);
        self.input_cache.clear();
    }

    pub fn scale_grad(&mut self, factor: f32) {
        self.grad_kernel *= factor;
        self.grad_bias *= factor;
    }

    pub fn apply_sgd(&mut self, lr: f32) {
        let Linear {
            kernel,
            bias,
            grad_kernel,
            grad_bias,
            ..
        } = self;
        rayon::join(
            || kernel.scaled_add(-lr, &*grad_kernel),
            || bias.scaled_add(-lr, &*grad_bias),
        );
    }

    pub fn collect_params(&self, prefix: &str, out: &mut Vec<(String, Tensor)>) {
        out.push((format!("{}:kernel", prefix), self.kernel.clone().into_dyn()));
        out.push((format!("{}:bias", prefix), self.bias.clone().into_dyn()));
    }

    pub fn collect_grads(&self, prefix: &str, out: &mut Vec<(String, Tensor)>) {
        out.push((
            format!("{}:kernel", prefix),
            self.grad_kernel.clone().into_dyn(),
        ));
        out.push((format!("{}:bias", prefix), self.grad_bias.clone().into_dyn()));
    }
}
