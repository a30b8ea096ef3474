use super::{RecurrentModel, Tensor};
use crate::ModelError;
use crate::cell::Linear;
use crate::loss::{Identity, Loss};
use ndarray::{Array2, Ix2};
use ndarray_rand::rand::Rng;

/// Stacked fully-connected unroll fixture: `num_fc` 1x1 affine layers applied
/// `unroll_for` times in sequence to the input, with a pass-through loss.
///
/// The whole chain is linear, so this variant mostly pins down parameter
/// bookkeeping and gradient accumulation across repeated applications of the
/// same layer.
pub struct FcUnroll {
    fcs: Vec<Linear>,
    unroll_for: usize,
    loss: Identity,
    output_cache: Option<Tensor>,
    labels_cache: Option<Tensor>,
}

impl FcUnroll {
    pub fn new<R: Rng + ?Sized>(unroll_for: usize, num_fc: usize, rng: &mut R) -> Self {
        Self {
            fcs: (0..num_fc).map(|_| Linear::new(1, 1, rng)).collect(),
            unroll_for,
            loss: Identity::new(),
            output_cache: None,
            labels_cache: None,
        }
    }
}

impl RecurrentModel for FcUnroll {
    fn forward(&mut self, inputs: &[Tensor], labels: &[Tensor]) -> (Tensor, f32) {
        let mut out: Array2<f32> = inputs[0]
            .clone()
            .into_dimensionality::<Ix2>()
            .unwrap();
        for _ in 0..self.unroll_for {
            for fc in self.fcs.iter_mut() {
                out = fc.step(&out);
            }
        }
        let output = out.into_dyn();
        let loss = self.loss.compute_loss(&labels[0], &output);
        self.output_cache = Some(output.clone());
        self.labels_cache = Some(labels[0].clone());
        (output, loss)
    }

    fn backward(&mut self) -> Result<(), ModelError> {
        let output = self.output_cache.take().ok_or_else(|| {
            ModelError::ProcessingError("Forward pass has not been run".to_string())
        })?;
        let labels = self.labels_cache.take().ok_or_else(|| {
            ModelError::ProcessingError("Forward pass has not been run".to_string())
        })?;

        let mut d_out = self
            .loss
            .compute_grad(&labels, &output)
            .into_dimensionality::<Ix2>()
            .unwrap();
        for _ in 0..self.unroll_for {
            for fc in self.fcs.iter_mut().rev() {
                d_out = fc.backprop_step(&d_out)?;
            }
        }
        Ok(())
    }

    fn parameters(&self) -> Vec<(String, Tensor)> {
        let mut out = Vec::new();
        for (i, fc) in self.fcs.iter().enumerate() {
            fc.collect_params(&format!("fc{}", i), &mut out);
        }
        out
    }

    fn gradients(&self) -> Vec<(String, Tensor)> {
        let mut out = Vec::new();
        for (i, fc) in self.fcs.iter().enumerate() {
            fc.collect_grads(&format!("fc{}", i), &mut out);
        }
        out
    }

    fn zero_gradients(&mut self) {
        for fc in self.fcs.iter_mut() {
            fc.zero_grad();
        }
        self.output_cache = None;
        self.labels_cache = None;
    }

    fn scale_gradients(&mut self, factor: f32) {
        for fc in self.fcs.iter_mut() {
            fc.scale_grad(factor);
        }
    }

    fn apply_gradients(&mut self, learning_rate: f32) {
        for fc in self.fcs.iter_mut() {
            fc.apply_sgd(learning_rate);
        }
    }
}
