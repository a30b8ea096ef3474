use super::{NARROW_WIDTH, RecurrentModel, Tensor};
use crate::ModelError;
use crate::cell::GruCell;
use crate::loss::{Loss, MeanSquaredError};
use ndarray::{Array2, Axis, Ix2, Ix3, stack};
use ndarray_rand::rand::Rng;

/// Stack of GRU cells unrolled over a synthetic time axis, with the same
/// feedback topology as [`RnnCellStacked`](super::RnnCellStacked) and
/// input/hidden width fixed at 2.
pub struct GruCellStacked {
    cells: Vec<GruCell>,
    unroll_for: usize,
    loss: MeanSquaredError,
    output_cache: Option<Tensor>,
    labels_cache: Option<Tensor>,
}

impl GruCellStacked {
    pub fn new<R: Rng + ?Sized>(unroll_for: usize, num_cells: usize, rng: &mut R) -> Self {
        Self {
            cells: (0..num_cells)
                .map(|_| GruCell::new(NARROW_WIDTH, NARROW_WIDTH, rng))
                .collect(),
            unroll_for,
            loss: MeanSquaredError::new(),
            output_cache: None,
            labels_cache: None,
        }
    }
}

impl RecurrentModel for GruCellStacked {
    fn forward(&mut self, inputs: &[Tensor], labels: &[Tensor]) -> (Tensor, f32) {
        let x = inputs[0].clone().into_dimensionality::<Ix2>().unwrap();
        let batch = x.nrows();

        let mut hs: Vec<Array2<f32>> = self
            .cells
            .iter()
            .map(|_| Array2::zeros((batch, NARROW_WIDTH)))
            .collect();
        let mut out = x;
        let mut steps: Vec<Array2<f32>> = Vec::with_capacity(self.unroll_for);

        for _ in 0..self.unroll_for {
            for (i, cell) in self.cells.iter_mut().enumerate() {
                let h = cell.step(&out, &hs[i]);
                hs[i] = h.clone();
                out = h;
            }
            steps.push(out.clone());
        }

        let views: Vec<_> = steps.iter().map(|s| s.view()).collect();
        let output = stack(Axis(1), &views).unwrap().into_dyn();
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

        let d_out3 = self
            .loss
            .compute_grad(&labels, &output)
            .into_dimensionality::<Ix3>()
            .unwrap();
        let batch = d_out3.shape()[0];

        let mut d_h_next: Vec<Array2<f32>> = self
            .cells
            .iter()
            .map(|_| Array2::zeros((batch, NARROW_WIDTH)))
            .collect();
        let mut d_carry = Array2::<f32>::zeros((batch, NARROW_WIDTH));

        for t in (0..self.unroll_for).rev() {
            let mut d_in = d_out3.index_axis(Axis(1), t).to_owned() + &d_carry;
            for i in (0..self.cells.len()).rev() {
                let d_h = &d_in + &d_h_next[i];
                let (d_x, d_h_prev) = self.cells[i].backprop_step(&d_h)?;
                d_h_next[i] = d_h_prev;
                d_in = d_x;
            }
            d_carry = d_in;
        }
        Ok(())
    }

    fn parameters(&self) -> Vec<(String, Tensor)> {
        let mut out = Vec::new();
        for (i, cell) in self.cells.iter().enumerate() {
            cell.collect_params(&format!("gru{}", i), &mut out);
        }
        out
    }

    fn gradients(&self) -> Vec<(String, Tensor)> {
        let mut out = Vec::new();
        for (i, cell) in self.cells.iter().enumerate() {
            cell.collect_grads(&format!("gru{}", i), &mut out);
        }
        out
    }

    fn zero_gradients(&mut self) {
        for cell in self.cells.iter_mut() {
            cell.zero_grad();
        }
        self.output_cache = None;
        self.labels_cache = None;
    }

    fn scale_gradients(&mut self, factor: f32) {
        for cell in self.cells.iter_mut() {
            cell.scale_grad(factor);
        }
    }

    fn apply_gradients(&mut self, learning_rate: f32) {
        for cell in self.cells.iter_mut() {
            cell.apply_sgd(learning_rate);
        }
    }
}
