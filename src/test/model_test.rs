use super::test_rng;
use crate::ModelError;
use crate::model::{
    FcUnroll, GruCellStacked, LstmStacked, RecurrentModel, RnnCellStacked, Tensor,
    ZoneoutLstmStacked,
};
use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::{Array, array};

fn wide_inputs() -> (Vec<Tensor>, Vec<Tensor>) {
    let inputs = vec![array![[0.4, -0.9], [1.3, 0.2], [-0.5, 0.8]].into_dyn()];
    let labels = vec![
        Array::from_shape_vec(
            (3, 2, 2),
            vec![
                0.5, -0.2, 0.8, 0.1, -1.1, 0.4, 0.3, -0.7, 0.9, 0.0, -0.3, 0.6,
            ],
        )
        .unwrap()
        .into_dyn(),
    ];
    (inputs, labels)
}

/// First-order consistency of forward and backward: after one SGD step of
/// size `lr`, the loss must drop by about `lr * ||g||^2`.
fn check_descent_step(model: &mut dyn RecurrentModel, inputs: &[Tensor], labels: &[Tensor]) {
    model.zero_gradients();
    let (_, loss_before) = model.forward(inputs, labels);
    model.backward().unwrap();

    let grad_norm_sq: f32 = model
        .gradients()
        .iter()
        .map(|(_, g)| g.iter().map(|v| v * v).sum::<f32>())
        .sum();
    assert!(grad_norm_sq > 0.0, "gradients vanished unexpectedly");

    let lr = 1e-2f32;
    model.apply_gradients(lr);
    model.zero_gradients();
    let (_, loss_after) = model.forward(inputs, labels);

    assert_relative_eq!(
        loss_before - loss_after,
        lr * grad_norm_sq,
        max_relative = 0.15
    );
}

#[test]
fn test_fc_unroll_output_shape_and_loss() {
    let mut model = FcUnroll::new(5, 1, &mut test_rng(20));
    let inputs = vec![array![[0.7]].into_dyn()];
    let labels = vec![array![[0.0]].into_dyn()];
    let (output, loss) = model.forward(&inputs, &labels);
    assert_eq!(output.shape(), &[1, 1]);
    // Pass-through loss reduces by summation.
    assert_abs_diff_eq!(loss, output.sum(), epsilon = 1e-12);
}

#[test]
fn test_fc_unroll_single_layer_exact_gradients() {
    // One layer applied once: y = w x + b, loss = y, so dL/dw = x, dL/db = 1.
    let mut model = FcUnroll::new(1, 1, &mut test_rng(21));
    let x = 0.7f32;
    let inputs = vec![array![[x]].into_dyn()];
    let labels = vec![array![[0.0]].into_dyn()];

    model.forward(&inputs, &labels);
    model.backward().unwrap();

    let grads = model.gradients();
    assert_eq!(grads.len(), 2);
    assert_eq!(grads[0].0, "fc0:kernel");
    assert_abs_diff_eq!(grads[0].1[[0, 0]], x, epsilon = 1e-6);
    assert_eq!(grads[1].0, "fc0:bias");
    assert_abs_diff_eq!(grads[1].1[[0, 0]], 1.0, epsilon = 1e-6);
}

#[test]
fn test_fc_unroll_descends() {
    let mut model = FcUnroll::new(2, 2, &mut test_rng(22));
    let inputs = vec![array![[0.7]].into_dyn()];
    let labels = vec![array![[0.0]].into_dyn()];

    model.zero_gradients();
    let (_, loss_before) = model.forward(&inputs, &labels);
    model.backward().unwrap();
    model.apply_gradients(0.5);
    model.zero_gradients();
    let (_, loss_after) = model.forward(&inputs, &labels);

    // The pass-through loss always decreases along the negative gradient.
    assert!(loss_after < loss_before);
}

#[test]
fn test_rnn_stacked_output_shape() {
    let (inputs, labels) = wide_inputs();
    let mut model = RnnCellStacked::new(2, 2, 2, 2, &mut test_rng(23));
    let (output, loss) = model.forward(&inputs, &labels);
    assert_eq!(output.shape(), &[3, 2, 2]);
    assert!(loss >= 0.0);
}

#[test]
fn test_rnn_stacked_descent_step() {
    let (inputs, labels) = wide_inputs();
    let mut model = RnnCellStacked::new(2, 2, 2, 2, &mut test_rng(24));
    check_descent_step(&mut model, &inputs, &labels);
}

#[test]
fn test_lstm_stacked_output_shape() {
    let (inputs, labels) = wide_inputs();
    let mut model = LstmStacked::new(2, 2, &mut test_rng(25));
    let (output, _) = model.forward(&inputs, &labels);
    assert_eq!(output.shape(), &[3, 2, 2]);
}

#[test]
fn test_lstm_stacked_descent_step() {
    let (inputs, labels) = wide_inputs();
    let mut model = LstmStacked::new(2, 2, &mut test_rng(26));
    check_descent_step(&mut model, &inputs, &labels);
}

#[test]
fn test_gru_stacked_descent_step() {
    let (inputs, labels) = wide_inputs();
    let mut model = GruCellStacked::new(2, 2, &mut test_rng(27));
    check_descent_step(&mut model, &inputs, &labels);
}

#[test]
fn test_zoneout_stacked_descent_step() {
    let (inputs, labels) = wide_inputs();
    let mut model = ZoneoutLstmStacked::new(3, 2, 2, 0.5, 0.5, &mut test_rng(28)).unwrap();
    check_descent_step(&mut model, &inputs, &labels);
}

#[test]
fn test_zoneout_stacked_rate_one_freezes_output() {
    // With both rates at 1.0 the state never leaves zero, so the output is
    // zero and no gradient reaches the parameters.
    let (inputs, labels) = wide_inputs();
    let mut model = ZoneoutLstmStacked::new(3, 2, 1, 1.0, 1.0, &mut test_rng(29)).unwrap();
    let (output, _) = model.forward(&inputs, &labels);
    for v in output.iter() {
        assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-12);
    }
    model.backward().unwrap();
    for (_, grad) in model.gradients() {
        for v in grad.iter() {
            assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_zoneout_stacked_rate_zero_matches_plain_lstm() {
    let (inputs, labels) = wide_inputs();
    let mut plain = LstmStacked::new(2, 1, &mut test_rng(30));
    let mut zoneout = ZoneoutLstmStacked::new(3, 2, 1, 0.0, 0.0, &mut test_rng(30)).unwrap();

    let (out_a, loss_a) = plain.forward(&inputs, &labels);
    let (out_b, loss_b) = zoneout.forward(&inputs, &labels);
    assert_abs_diff_eq!(loss_a, loss_b, epsilon = 1e-9);
    for (a, b) in out_a.iter().zip(out_b.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
    }
}

#[test]
fn test_backward_before_forward_fails() {
    let mut model = LstmStacked::new(2, 1, &mut test_rng(31));
    let err = model.backward().unwrap_err();
    assert!(matches!(err, ModelError::ProcessingError(_)));
}

#[test]
fn test_parameter_and_gradient_order_match() {
    let (inputs, labels) = wide_inputs();
    let mut model = GruCellStacked::new(2, 2, &mut test_rng(32));
    model.forward(&inputs, &labels);
    model.backward().unwrap();

    let params = model.parameters();
    let grads = model.gradients();
    assert_eq!(params.len(), grads.len());
    for ((pn, pv), (gn, gv)) in params.iter().zip(grads.iter()) {
        assert_eq!(pn, gn);
        assert_eq!(pv.shape(), gv.shape());
    }
}
