use super::test_rng;
use crate::ModelError;
use crate::cell::{GruCell, Linear, LstmCell, RnnCell, ZoneoutLstmCell};
use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::{Array2, array};

#[test]
fn test_linear_zero_input_gives_zero_output() {
    // Biases start at zero, so the affine map sends zero to zero.
    let mut fc = Linear::new(2, 2, &mut test_rng(0));
    let y = fc.step(&Array2::zeros((3, 2)));
    assert_eq!(y.shape(), &[3, 2]);
    for v in y.iter() {
        assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn test_linear_is_affine() {
    // y(2x) - y(x) must equal y(x) - y(0) for an affine map.
    let mut fc = Linear::new(2, 2, &mut test_rng(1));
    let x = array![[0.3, -1.2], [2.0, 0.7]];
    let y0 = fc.step(&Array2::zeros((2, 2)));
    let y1 = fc.step(&x);
    let y2 = fc.step(&(&x * 2.0));
    let lhs = &y2 - &y1;
    let rhs = &y1 - &y0;
    for (a, b) in lhs.iter().zip(rhs.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
    }
}

#[test]
fn test_linear_backprop_without_forward_fails() {
    let mut fc = Linear::new(1, 1, &mut test_rng(2));
    let err = fc.backprop_step(&array![[1.0]]).unwrap_err();
    assert!(matches!(err, ModelError::ProcessingError(_)));
}

#[test]
fn test_rnn_cell_zero_state_zero_input() {
    // tanh(0 + 0 + 0) = 0 regardless of the weights.
    let mut cell = RnnCell::new(2, 2, &mut test_rng(3));
    let h = cell.step(&Array2::zeros((3, 2)), &Array2::zeros((3, 2)));
    assert_eq!(h.shape(), &[3, 2]);
    for v in h.iter() {
        assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn test_lstm_cell_zero_state_zero_input() {
    // Gates halve at zero but the candidate is zero, so (h, c) stay zero.
    let mut cell = LstmCell::new(2, 2, &mut test_rng(4));
    let zeros = Array2::zeros((3, 2));
    let (h, c) = cell.step(&zeros, &zeros, &zeros);
    for v in h.iter().chain(c.iter()) {
        assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn test_gru_cell_zero_state_zero_input() {
    let mut cell = GruCell::new(2, 2, &mut test_rng(5));
    let zeros = Array2::zeros((3, 2));
    let h = cell.step(&zeros, &zeros);
    for v in h.iter() {
        assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-12);
    }
}

/// Central-difference check of the input gradient a cell reports: perturb one
/// input entry, compare the change of `sum(h)` against the analytic `d_x`.
fn check_input_gradient<F>(mut f: F, analytic: &Array2<f32>, x: &Array2<f32>)
where
    F: FnMut(&Array2<f32>) -> f32,
{
    let eps = 1e-2f32;
    for idx in 0..x.len() {
        let (row, col) = (idx / x.ncols(), idx % x.ncols());
        let mut x_plus = x.clone();
        x_plus[[row, col]] += eps;
        let mut x_minus = x.clone();
        x_minus[[row, col]] -= eps;
        let numeric = (f(&x_plus) - f(&x_minus)) / (2.0 * eps);
        assert_abs_diff_eq!(analytic[[row, col]], numeric, epsilon = 1e-3);
    }
}

#[test]
fn test_rnn_cell_input_gradient_matches_finite_difference() {
    let mut cell = RnnCell::new(2, 2, &mut test_rng(6));
    let x = array![[0.4, -0.9], [1.3, 0.2]];
    let h_prev = array![[0.1, -0.2], [0.0, 0.5]];

    cell.step(&x, &h_prev);
    let d_h = Array2::ones((2, 2));
    let (d_x, _) = cell.backprop_step(&d_h).unwrap();

    check_input_gradient(|x| cell.step(x, &h_prev).sum(), &d_x, &x);
}

#[test]
fn test_lstm_cell_input_gradient_matches_finite_difference() {
    let mut cell = LstmCell::new(2, 2, &mut test_rng(7));
    let x = array![[0.4, -0.9], [1.3, 0.2]];
    let h_prev = array![[0.1, -0.2], [0.0, 0.5]];
    let c_prev = array![[0.3, 0.0], [-0.4, 0.2]];

    cell.step(&x, &h_prev, &c_prev);
    let ones = Array2::ones((2, 2));
    let zeros = Array2::zeros((2, 2));
    let (d_x, _, _) = cell.backprop_step(&ones, &zeros).unwrap();

    check_input_gradient(|x| cell.step(x, &h_prev, &c_prev).0.sum(), &d_x, &x);
}

#[test]
fn test_gru_cell_input_gradient_matches_finite_difference() {
    let mut cell = GruCell::new(2, 2, &mut test_rng(8));
    let x = array![[0.4, -0.9], [1.3, 0.2]];
    let h_prev = array![[0.1, -0.2], [0.0, 0.5]];

    cell.step(&x, &h_prev);
    let d_h = Array2::ones((2, 2));
    let (d_x, _) = cell.backprop_step(&d_h).unwrap();

    check_input_gradient(|x| cell.step(x, &h_prev).sum(), &d_x, &x);
}

#[test]
fn test_zoneout_rate_validation() {
    let err = ZoneoutLstmCell::new(1, 2, 2, 2, 1.5, 0.0, &mut test_rng(9)).unwrap_err();
    assert!(matches!(err, ModelError::InputValidationError(_)));
    let err = ZoneoutLstmCell::new(1, 2, 2, 2, 0.0, -0.1, &mut test_rng(9)).unwrap_err();
    assert!(matches!(err, ModelError::InputValidationError(_)));
}

#[test]
fn test_zoneout_rate_zero_matches_plain_lstm() {
    // Same seed, same draw order for the LSTM weights, so rate 0.0 must
    // reproduce the wrapped cell exactly.
    let mut plain = LstmCell::new(2, 2, &mut test_rng(10));
    let mut zoneout = ZoneoutLstmCell::new(3, 2, 2, 2, 0.0, 0.0, &mut test_rng(10)).unwrap();

    let x = array![[0.4, -0.9], [1.3, 0.2], [-0.5, 0.8]];
    let zeros = Array2::zeros((3, 2));
    let (h_a, c_a) = plain.step(&x, &zeros, &zeros);
    let (h_b, c_b) = zoneout.step(&x, &zeros, &zeros, 0);
    for (a, b) in h_a.iter().zip(h_b.iter()).chain(c_a.iter().zip(c_b.iter())) {
        assert_relative_eq!(*a, *b, max_relative = 1e-6);
    }
}

#[test]
fn test_zoneout_rate_one_freezes_state() {
    let mut cell = ZoneoutLstmCell::new(2, 2, 2, 3, 1.0, 1.0, &mut test_rng(11)).unwrap();
    let x = array![[0.4, -0.9], [1.3, 0.2]];
    let h_prev = array![[0.1, -0.2], [0.0, 0.5]];
    let c_prev = array![[0.3, 0.0], [-0.4, 0.2]];

    for t in 0..3 {
        let (h, c) = cell.step(&x, &h_prev, &c_prev, t);
        for (a, b) in h.iter().zip(h_prev.iter()).chain(c.iter().zip(c_prev.iter())) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
    }
}
