use crate::model::Tensor;

/// Interface of the loss functions wired into the fixture models.
pub trait Loss {
    /// Computes the scalar loss value for a prediction against its target.
    fn compute_loss(&self, y_true: &Tensor, y_pred: &Tensor) -> f32;

    /// Computes the gradient of the loss w.r.t. the prediction.
    fn compute_grad(&self, y_true: &Tensor, y_pred: &Tensor) -> Tensor;
}

/// Mean Squared Error loss: mean of squared differences over all elements.
pub struct MeanSquaredError;

impl MeanSquaredError {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for MeanSquaredError {
    fn default() -> Self {
        Self::new()
    }
}

impl Loss for MeanSquaredError {
    fn compute_loss(&self, y_true: &Tensor, y_pred: &Tensor) -> f32 {
        let squared_diff = (y_pred - y_true).mapv(|x| x * x);
        let n = squared_diff.len() as f32;
        squared_diff.sum() / n
    }

    fn compute_grad(&self, y_true: &Tensor, y_pred: &Tensor) -> Tensor {
        // Gradient is 2 times the difference divided by element count
        let n = y_pred.len() as f32;
        let mut result = y_pred - y_true;
        result.par_mapv_inplace(|x| 2.0 * x / n);
        result
    }
}

/// Pass-through loss used by the FC unroll fixtures: the prediction itself is
/// the loss, reduced by summation where a scalar is required. Its gradient is
/// a tensor of ones. The target is ignored.
pub struct Identity;

impl Identity {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}

impl Loss for Identity {
    fn compute_loss(&self, _y_true: &Tensor, y_pred: &Tensor) -> f32 {
        y_pred.sum()
    }

    fn compute_grad(&self, _y_true: &Tensor, y_pred: &Tensor) -> Tensor {
        Tensor::ones(y_pred.raw_dim())
    }
}
