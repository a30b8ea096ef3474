use super::{Gate, sigmoid, tanh};
use crate::ModelError;
use crate::model::Tensor;
use ndarray::{Array2, Axis};
use ndarray_rand::rand::Rng;

/// Cached values for one forward step, consumed by the matching backward step.
struct StepCache {
    x: Array2<f32>,
    h_prev: Array2<f32>,
    z: Array2<f32>,
    r: Array2<f32>,
    n: Array2<f32>,
    /// Recurrent candidate contribution `h_prev . Un`, needed for the reset
    /// gate's gradient.
    rec_n: Array2<f32>,
}

/// Three-gate GRU cell.
///
/// Gate equations, with the reset gate applied after the recurrent matmul:
/// - `z = sigmoid(xWz + hUz + bz)` (update gate)
/// - `r = sigmoid(xWr + hUr + br)` (reset gate)
/// - `n = tanh(xWn + bn + r * (hUn))` (candidate)
/// - `h' = (1 - z) * n + z * h`
///
/// The candidate's recurrent side carries no bias; the fixtures this cell
/// reproduces pin that bias to zero and freeze it.
pub struct GruCell {
    input_dim: usize,
    units: usize,
    gate_z: Gate,
    gate_r: Gate,
    gate_n: Gate,
    cache: Vec<StepCache>,
}

impl GruCell {
    pub fn new<R: Rng + ?Sized>(input_dim: usize, units: usize, rng: &mut R) -> Self {
        Self {
            input_dim,
            units,
            gate_z: Gate::new(input_dim, units, rng),
            gate_r: Gate::new(input_dim, units, rng),
            gate_n: Gate::new(input_dim, units, rng),
            cache: Vec::new(),
        }
    }

    pub fn units(&self) -> usize {
        self.units
    }

    /// Advances the cell one timestep and returns the new hidden state.
    pub fn step(&mut self, x: &Array2<f32>, h_prev: &Array2<f32>) -> Array2<f32> {
        debug_assert_eq!(x.ncols(), self.input_dim);

        let z = sigmoid(
            &(x.dot(&self.gate_z.kernel) + h_prev.dot(&self.gate_z.recurrent_kernel) + &self.gate_z.bias),
        );
        let r = sigmoid(
            &(x.dot(&self.gate_r.kernel) + h_prev.dot(&self.gate_r.recurrent_kernel) + &self.gate_r.bias),
        );
        let rec_n = h_prev.dot(&self.gate_n.recurrent_kernel);
        let n = tanh(&(x.dot(&self.gate_n.kernel) + &self.gate_n.bias + &r * &rec_n));

        let h_new = z.mapv(|a| 1.0 - a) * &n + &z * h_prev;

        self.cache.push(StepCache {
            x: x.clone(),
            h_prev: h_prev.clone(),
            z,
            r,
            n,
            rec_n,
        });

        h_new
    }

    /// Backpropagates through the most recent un-backpropped step, given the
    /// total gradient w.r.t. its hidden output. Returns `(d_x, d_h_prev)`.
    pub fn backprop_step(
        &mut self,
        d_h: &Array2<f32>,
    ) -> Result<(Array2<f32>, Array2<f32>), ModelError> {
        let StepCache {
            x,
            h_prev,
            z,
            r,
            n,
            rec_n,
        } = self.cache.pop().ok_or_else(|| {
            ModelError::ProcessingError("Forward pass has not been run".to_string())
        })?;

        // Candidate pre-activation and its split into direct / reset-gated parts.
        let d_n_pre = d_h * &z.mapv(|a| 1.0 - a) * &n.mapv(|a| 1.0 - a * a);
        let d_rec_n = &d_n_pre * &r;
        let d_r_pre = &d_n_pre * &rec_n * &r.mapv(|a| a * (1.0 - a));
        let d_z_pre = d_h * &(&h_prev - &n) * &z.mapv(|a| a * (1.0 - a));

        self.gate_n.grad_kernel += &x.t().dot(&d_n_pre);
        self.gate_n.grad_recurrent_kernel += &h_prev.t().dot(&d_rec_n);
        self.gate_n.grad_bias += &d_n_pre.sum_axis(Axis(0)).insert_axis(Axis(0));

        for (gate, d_pre) in [(&mut self.gate_z, &d_z_pre), (&mut self.gate_r, &d_r_pre)] {
            gate.grad_kernel += &x.t().dot(d_pre);
            gate.grad_recurrent_kernel += &h_prev.t().dot(d_pre);
            gate.grad_bias += &d_pre.sum_axis(Axis(0)).insert_axis(Axis(0));
        }

        let d_x = d_n_pre.dot(&self.gate_n.kernel.t())
            + d_z_pre.dot(&self.gate_z.kernel.t())
            + d_r_pre.dot(&self.gate_r.kernel.t());
        let d_h_prev = d_h * &z
            + d_rec_n.dot(&self.gate_n.recurrent_kernel.t())
            + d_z_pre.dot(&self.gate_z.recurrent_kernel.t())
            + d_r_pre.dot(&self.gate_r.recurrent_kernel.t());

        Ok((d_x, d_h_prev))
    }

    pub fn zero_grad(&mut self) {
        self.gate_z.zero_grad();
        self.gate_r.zero_grad();
        self.gate_n.zero_grad();
        self.cache.clear();
    }

    pub fn scale_grad(&mut self, factor: f32) {
        self.gate_z.scale_grad(factor);
        self.gate_r.scale_grad(factor);
        self.gate_n.scale_grad(factor);
    }

    pub fn apply_sgd(&mut self, lr: f32) {
        self.gate_z.apply_sgd(lr);
        self.gate_r.apply_sgd(lr);
        self.gate_n.apply_sgd(lr);
    }

    pub fn collect_params(&self, prefix: &str, out: &mut Vec<(String, Tensor)>) {
        self.gate_z.collect_params(&format!("{}:z", prefix), out);
        self.gate_r.collect_params(&format!("{}:r", prefix), out);
        self.gate_n.collect_params(&format!("{}:n", prefix), out);
    }

    pub fn collect_grads(&self, prefix: &str, out: &mut Vec<(String, Tensor)>) {
        self.gate_z.collect_grads(&format!("{}:z", prefix), out);
        self.gate_r.collect_grads(&format!("{}:r", prefix), out);
        self.gate_n.collect_grads(&format!("{}:n", prefix), out);
    }
}
