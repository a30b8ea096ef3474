use super::LstmCell;
use crate::ModelError;
use crate::model::Tensor;
use ndarray::{Array, Array2};
use ndarray_rand::RandomExt;
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::Bernoulli;

/// Zoneout-regularized LSTM cell.
///
/// Zoneout stochastically retains entries of the previous hidden/cell state
/// instead of the freshly computed one:
/// `state = mask * prev + (1 - mask) * new`, `mask ~ Bernoulli(rate)`.
///
/// The per-entry retention masks are pre-sampled at construction, one pair per
/// unroll index, so a whole training iteration (forward plus backward) sees a
/// fixed masking pattern and the recorded gradients stay consistent with the
/// recorded activations. A rate of 0.0 degenerates to the plain LSTM cell; a
/// rate of 1.0 freezes the state.
#[derive(Debug)]
pub struct ZoneoutLstmCell {
    inner: LstmCell,
    hidden_masks: Vec<Array2<f32>>, // unroll_for masks of shape (batch, units)
    cell_masks: Vec<Array2<f32>>,
}

fn sample_masks<R: Rng + ?Sized>(
    batch: usize,
    units: usize,
    unroll_for: usize,
    rate: f64,
    rng: &mut R,
) -> Result<Vec<Array2<f32>>, ModelError> {
    let dist = Bernoulli::new(rate).map_err(|_| {
        ModelError::InputValidationError(format!(
            "zoneout rate must be within [0, 1], got {}",
            rate
        ))
    })?;
    Ok((0..unroll_for)
        .map(|_| {
            Array::random_using((batch, units), dist, rng).mapv(|keep| if keep { 1.0 } else { 0.0 })
        })
        .collect())
}

impl ZoneoutLstmCell {
    pub fn new<R: Rng + ?Sized>(
        batch: usize,
        input_dim: usize,
        units: usize,
        unroll_for: usize,
        hidden_zoneout_rate: f64,
        cell_zoneout_rate: f64,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        let inner = LstmCell::new(input_dim, units, rng);
        let hidden_masks = sample_masks(batch, units, unroll_for, hidden_zoneout_rate, rng)?;
        let cell_masks = sample_masks(batch, units, unroll_for, cell_zoneout_rate, rng)?;
        Ok(Self {
            inner,
            hidden_masks,
            cell_masks,
        })
    }

    pub fn units(&self) -> usize {
        self.inner.units()
    }

    /// Advances one timestep at unroll index `t`, returning the zoneout-mixed
    /// `(h', c')`.
    pub fn step(
        &mut self,
        x: &Array2<f32>,
        h_prev: &Array2<f32>,
        c_prev: &Array2<f32>,
        t: usize,
    ) -> (Array2<f32>, Array2<f32>) {
        let (h_hat, c_hat) = self.inner.step(x, h_prev, c_prev);
        let m_h = &self.hidden_masks[t];
        let m_c = &self.cell_masks[t];
        let h_new = m_h * h_prev + &(m_h.mapv(|m| 1.0 - m) * &h_hat);
        let c_new = m_c * c_prev + &(m_c.mapv(|m| 1.0 - m) * &c_hat);
        (h_new, c_new)
    }

    /// Backpropagates through the zoneout mix at unroll index `t` and the
    /// wrapped LSTM step beneath it. Returns `(d_x, d_h_prev, d_c_prev)`.
    pub fn backprop_step(
        &mut self,
        d_h: &Array2<f32>,
        d_c: &Array2<f32>,
        t: usize,
    ) -> Result<(Array2<f32>, Array2<f32>, Array2<f32>), ModelError> {
        let m_h = self.hidden_masks[t].clone();
        let m_c = self.cell_masks[t].clone();

        let d_h_hat = d_h * &m_h.mapv(|m| 1.0 - m);
        let d_c_hat = d_c * &m_c.mapv(|m| 1.0 - m);
        let (d_x, mut d_h_prev, mut d_c_prev) = self.inner.backprop_step(&d_h_hat, &d_c_hat)?;

        // The retained entries pass gradient straight to the previous state.
        d_h_prev += &(d_h * &m_h);
        d_c_prev += &(d_c * &m_c);
        Ok((d_x, d_h_prev, d_c_prev))
    }

    pub fn zero_grad(&mut self) {
        self.inner.zero_grad();
    }

    pub fn scale_grad(&mut self, factor: f32) {
        self.inner.scale_grad(factor);
    }

    pub fn apply_sgd(&mut self, lr: f32) {
        self.inner.apply_sgd(lr);
    }

    pub fn collect_params(&self, prefix: &str, out: &mut Vec<(String, Tensor)>) {
        self.inner.collect_params(prefix, out);
    }

    pub fn collect_grads(&self, prefix: &str, out: &mut Vec<(String, Tensor)>) {
        self.inner.collect_grads(prefix, out);
    }
}
