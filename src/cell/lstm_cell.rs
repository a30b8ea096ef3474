use super::{Gate, sigmoid, tanh};
use crate::ModelError;
use crate::model::Tensor;
use ndarray::{Array2, Axis};
use ndarray_rand::rand::Rng;

/// Cached values for one forward step, consumed by the matching backward step.
#[derive(Debug)]
struct StepCache {
    x: Array2<f32>,
    h_prev: Array2<f32>,
    c_prev: Array2<f32>,
    i: Array2<f32>,
    f: Array2<f32>,
    g: Array2<f32>,
    o: Array2<f32>,
    tanh_c: Array2<f32>,
}

/// Four-gate LSTM cell with explicit per-step hidden and cell state.
///
/// Gate equations:
/// - `i = sigmoid(xWi + hUi + bi)` (input gate)
/// - `f = sigmoid(xWf + hUf + bf)` (forget gate)
/// - `g = tanh(xWg + hUg + bg)` (cell candidate)
/// - `o = sigmoid(xWo + hUo + bo)` (output gate)
/// - `c' = f * c + i * g`, `h' = o * tanh(c')`
#[derive(Debug)]
pub struct LstmCell {
    input_dim: usize,
    units: usize,
    gate_i: Gate,
    gate_f: Gate,
    gate_g: Gate,
    gate_o: Gate,
    cache: Vec<StepCache>,
}

impl LstmCell {
    pub fn new<R: Rng + ?Sized>(input_dim: usize, units: usize, rng: &mut R) -> Self {
        Self {
            input_dim,
            units,
            gate_i: Gate::new(input_dim, units, rng),
            gate_f: Gate::new(input_dim, units, rng),
            gate_g: Gate::new(input_dim, units, rng),
            gate_o: Gate::new(input_dim, units, rng),
            cache: Vec::new(),
        }
    }

    pub fn units(&self) -> usize {
        self.units
    }

    /// Advances the cell one timestep, returning `(h', c')`.
    pub fn step(
        &mut self,
        x: &Array2<f32>,
        h_prev: &Array2<f32>,
        c_prev: &Array2<f32>,
    ) -> (Array2<f32>, Array2<f32>) {
        debug_assert_eq!(x.ncols(), self.input_dim);

        let i = sigmoid(
            &(x.dot(&self.gate_i.kernel) + h_prev.dot(&self.gate_i.recurrent_kernel) + &self.gate_i.bias),
        );
        let f = sigmoid(
            &(x.dot(&self.gate_f.kernel) + h_prev.dot(&self.gate_f.recurrent_kernel) + &self.gate_f.bias),
        );
        let g = tanh(
            &(x.dot(&self.gate_g.kernel) + h_prev.dot(&self.gate_g.recurrent_kernel) + &self.gate_g.bias),
        );
        let o = sigmoid(
            &(x.dot(&self.gate_o.kernel) + h_prev.dot(&self.gate_o.recurrent_kernel) + &self.gate_o.bias),
        );

        let c_new = &f * c_prev + &i * &g;
        let tanh_c = tanh(&c_new);
        let h_new = &o * &tanh_c;

        self.cache.push(StepCache {
            x: x.clone(),
            h_prev: h_prev.clone(),
            c_prev: c_prev.clone(),
            i,
            f,
            g,
            o,
            tanh_c,
        });

        (h_new, c_new)
    }

    /// Backpropagates through the most recent un-backpropped step.
    ///
    /// `d_h` / `d_c` are the total gradients w.r.t. this step's hidden and
    /// cell outputs. Returns `(d_x, d_h_prev, d_c_prev)`.
    pub fn backprop_step(
        &mut self,
        d_h: &Array2<f32>,
        d_c: &Array2<f32>,
    ) -> Result<(Array2<f32>, Array2<f32>, Array2<f32>), ModelError> {
        let StepCache {
            x,
            h_prev,
            c_prev,
            i,
            f,
            g,
            o,
            tanh_c,
        } = self.cache.pop().ok_or_else(|| {
            ModelError::ProcessingError("Forward pass has not been run".to_string())
        })?;

        // Gradient reaching the cell state: direct carry plus the h = o * tanh(c) path.
        let d_c_total = d_c + &(d_h * &o * &tanh_c.mapv(|a| 1.0 - a * a));

        let d_o = d_h * &tanh_c * &o.mapv(|a| a * (1.0 - a));
        let d_f = &d_c_total * &c_prev * &f.mapv(|a| a * (1.0 - a));
        let d_i = &d_c_total * &g * &i.mapv(|a| a * (1.0 - a));
        let d_g = &d_c_total * &i * &g.mapv(|a| 1.0 - a * a);

        for (gate, d_pre) in [
            (&mut self.gate_i, &d_i),
            (&mut self.gate_f, &d_f),
            (&mut self.gate_g, &d_g),
            (&mut self.gate_o, &d_o),
        ] {
            gate.grad_kernel += &x.t().dot(d_pre);
            gate.grad_recurrent_kernel += &h_prev.t().dot(d_pre);
            gate.grad_bias += &d_pre.sum_axis(Axis(0)).insert_axis(Axis(0));
        }

        let d_x = d_i.dot(&self.gate_i.kernel.t())
            + d_f.dot(&self.gate_f.kernel.t())
            + d_g.dot(&self.gate_g.kernel.t())
            + d_o.dot(&self.gate_o.kernel.t());
        let d_h_prev = d_i.dot(&self.gate_i.recurrent_kernel.t())
            + d_f.dot(&self.gate_f.recurrent_kernel.t())
            + d_g.dot(&self.gate_g.recurrent_kernel.t())
            + d_o.dot(&self.gate_o.recurrent_kernel.t());
        let d_c_prev = &d_c_total * &f;

        Ok((d_x, d_h_prev, d_c_prev))
    }

    pub fn zero_grad(&mut self) {
        self.gate_i.zero_grad();
        self.gate_f.zero_grad();
        self.gate_g.zero_grad();
        self.gate_o.zero_grad();
        self.cache.clear();
    }

    pub fn scale_grad(&mut self, factor: f32) {
        self.gate_i.scale_grad(factor);
        self.gate_f.scale_grad(factor);
        self.gate_g.scale_grad(factor);
        self.gate_o.scale_grad(factor);
    }

    pub fn apply_sgd(&mut self, lr: f32) {
        self.gate_i.apply_sgd(lr);
        self.gate_f.apply_sgd(lr);
        self.gate_g.apply_sgd(lr);
        self.gate_o.apply_sgd(lr);
    }

    pub fn collect_params(&self, prefix: &str, out: &mut Vec<(String, Tensor)>) {
        self.gate_i.collect_params(&format!("{}:i", prefix), out);
        self.gate_f.collect_params(&format!("{}:f", prefix), out);
        self.gate_g.collect_params(&format!("{}:g", prefix), out);
        self.gate_o.collect_params(&format!("{}:o", prefix), out);
    }

    pub fn collect_grads(&self, prefix: &str, out: &mut Vec<(String, Tensor)>) {
        self.gate_i.collect_grads(&format!("{}:i", prefix), out);
        self.gate_f.collect_grads(&format!("{}:f", prefix), out);
        self.gate_g.collect_grads(&format!("{}:g", prefix), out);
        self.gate_o.collect_grads(&format!("{}:o", prefix), out);
    }
}
