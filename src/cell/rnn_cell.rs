use super::{Gate, tanh};
use crate::ModelError;
use crate::model::Tensor;
use ndarray::{Array2, Axis};
use ndarray_rand::rand::Rng;

/// Cached values for one forward step, consumed by the matching backward step.
struct StepCache {
    x: Array2<f32>,
    h_prev: Array2<f32>,
    h_new: Array2<f32>,
}

/// Vanilla recurrent cell: `h' = tanh(xW + hU + b)`.
///
/// Unlike the full-sequence layers of a training framework, this cell advances
/// one timestep per call with the caller holding the state, which is what the
/// stacked-unroll fixture topology needs.
pub struct RnnCell {
    input_dim: usize,
    units: usize,
    gate: Gate,
    cache: Vec<StepCache>,
}

impl RnnCell {
    pub fn new<R: Rng + ?Sized>(input_dim: usize, units: usize, rng: &mut R) -> Self {
        Self {
            input_dim,
            units,
            gate: Gate::new(input_dim, units, rng),
            cache: Vec::new(),
        }
    }

    pub fn units(&self) -> usize {
        self.units
    }

    /// Advances the cell one timestep and returns the new hidden state.
    pub fn step(&mut self, x: &Array2<f32>, h_prev: &Array2<f32>) -> Array2<f32> {
        debug_assert_eq!(x.ncols(), self.input_dim);
        let pre = x.dot(&self.gate.kernel) + h_prev.dot(&self.gate.recurrent_kernel) + &self.gate.bias;
        let h_new = tanh(&pre);
        self.cache.push(StepCache {
            x: x.clone(),
            h_prev: h_prev.clone(),
            h_new: h_new.clone(),
        });
        h_new
    }

    /// Backpropagates through the most recent un-backpropped step, given the
    /// total gradient w.r.t. its hidden output (per-step loss contribution
    /// plus recurrent carry). Returns `(d_x, d_h_prev)`.
    pub fn backprop_step(
        &mut self,
        d_h: &Array2<f32>,
    ) -> Result<(Array2<f32>, Array2<f32>), ModelError> {
        let StepCache { x, h_prev, h_new } = self.cache.pop().ok_or_else(|| {
            ModelError::ProcessingError("Forward pass has not been run".to_string())
        })?;

        // tanh'(pre) = 1 - h^2
        let d_pre = d_h * &h_new.mapv(|a| 1.0 - a * a);

        self.gate.grad_kernel += &x.t().dot(&d_pre);
        self.gate.grad_recurrent_kernel += &h_prev.t().dot(&d_pre);
        self.gate.grad_bias += &d_pre.sum_axis(Axis(0)).insert_axis(Axis(0));

        let d_x = d_pre.dot(&self.gate.kernel.t());
        let d_h_prev = d_pre.dot(&self.gate.recurrent_kernel.t());
        Ok((d_x, d_h_prev))
    }

    pub fn zero_grad(&mut self) {
        self.gate.zero_grad();
        self.cache.clear();
    }

    pub fn scale_grad(&mut self, factor: f32) {
        self.gate.scale_grad(factor);
    }

    pub fn apply_sgd(&mut self, lr: f32) {
        self.gate.apply_sgd(lr);
    }

    pub fn collect_params(&self, prefix: &str, out: &mut Vec<(String, Tensor)>) {
        self.gate.collect_params(prefix, out);
    }

    pub fn collect_grads(&self, prefix: &str, out: &mut Vec<(String, Tensor)>) {
        self.gate.collect_grads(prefix, out);
    }
}
