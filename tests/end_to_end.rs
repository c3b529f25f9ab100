use mlp_core::{
    CrossEntropyLoss, Init, InitConfig, InitHyper, LayerSpec, Matrix, Mlp, ModelConfig,
};

fn small_config() -> ModelConfig {
    ModelConfig::new(
        vec![
            LayerSpec::Linear {
                in_features: 4,
                out_features: 3,
            },
            LayerSpec::ReLU,
            LayerSpec::Linear {
                in_features: 3,
                out_features: 2,
            },
        ],
        InitConfig {
            strategy: Init::Normal,
            hyper: InitHyper {
                mu: 0.0,
                sigma: 0.5,
                epsilon: 0.01,
            },
            zero_bias: true,
        },
    )
}

fn batch_of_3() -> Vec<f32> {
    (0..12).map(|i| (i as f32) * 0.1 - 0.5).collect()
}

#[test]
fn eval_forward_produces_expected_output_shape() {
    let mut mlp = Mlp::new_with_seed(&small_config(), 7).unwrap();
    mlp.eval();

    let out = mlp.forward(&batch_of_3(), 3).unwrap();
    assert_eq!(out.shape(), (3, 2));
}

#[test]
fn train_forward_then_backward_flows_to_the_input() {
    let mut mlp = Mlp::new_with_seed(&small_config(), 7).unwrap();
    mlp.train();

    let out = mlp.forward(&batch_of_3(), 3).unwrap();
    let d_output = out.map(|_| 1.0);
    let d_input = mlp.backward(&d_output).unwrap();
    assert_eq!(d_input.shape(), (3, 4));

    // Both linear layers now hold gradients; the activation holds none.
    let grads = mlp.grads();
    assert_eq!(grads.len(), 3);
    assert_eq!(grads[0].len(), 2);
    assert!(grads[1].is_empty());
    assert_eq!(grads[2].len(), 2);
    assert_eq!(grads[0][0].value.shape(), (3, 4));
    assert_eq!(grads[0][1].value.shape(), (1, 3));
}

#[test]
fn backward_in_eval_mode_is_a_state_error() {
    let mut mlp = Mlp::new_with_seed(&small_config(), 7).unwrap();
    mlp.eval();
    let out = mlp.forward(&batch_of_3(), 3).unwrap();

    let err = mlp.backward(&out.map(|_| 1.0)).unwrap_err();
    assert!(err.to_string().contains("not in training mode"), "{err}");
}

#[test]
fn mode_toggle_invalidates_caches_until_the_next_forward() {
    let mut mlp = Mlp::new_with_seed(&small_config(), 7).unwrap();

    mlp.train();
    let out = mlp.forward(&batch_of_3(), 3).unwrap();
    let d_output = out.map(|_| 1.0);

    // A toggle after the forward pass drops every cache, so backward must
    // fail even though the model is back in train mode.
    mlp.eval();
    mlp.train();
    assert!(mlp.backward(&d_output).is_err());

    // A fresh forward repopulates the caches.
    mlp.forward(&batch_of_3(), 3).unwrap();
    assert!(mlp.backward(&d_output).is_ok());
}

#[test]
fn params_round_trip_reproduces_the_model() {
    let mut source = Mlp::new_with_seed(&small_config(), 1).unwrap();
    let mut target = Mlp::new_with_seed(&small_config(), 2).unwrap();
    source.eval();
    target.eval();

    let input = batch_of_3();
    let out_source = source.forward(&input, 3).unwrap();
    assert_ne!(out_source, target.forward(&input, 3).unwrap());

    target.load_params(&source.params()).unwrap();
    assert_eq!(out_source, target.forward(&input, 3).unwrap());
}

#[test]
fn load_params_with_wrong_layer_count_fails() {
    let mut mlp = Mlp::new_with_seed(&small_config(), 1).unwrap();
    let params = mlp.params();
    assert!(mlp.load_params(&params[..1]).is_err());
    assert!(mlp.load_params(&params).is_ok());
}

#[test]
fn one_training_step_decreases_the_loss() {
    // Hand-rolled gradient-descent step through the public checkpoint
    // interface; the crate itself ships no optimizer.
    let mut mlp = Mlp::new_with_seed(&small_config(), 42).unwrap();
    mlp.train();

    let input = batch_of_3();
    let targets = Matrix::from_rows(&[&[1.0, 0.0], &[0.0, 1.0], &[1.0, 0.0]]).unwrap();
    let loss_fn = CrossEntropyLoss::new();

    let logits = mlp.forward(&input, 3).unwrap();
    let loss_before = loss_fn.loss(&targets, &logits);
    mlp.backward(&loss_fn.backward(&targets, &logits)).unwrap();

    let lr = 0.1;
    let mut params = mlp.params();
    let grads = mlp.grads();
    for (p_layer, g_layer) in params.iter_mut().zip(&grads) {
        for (p, g) in p_layer.iter_mut().zip(g_layer) {
            let step = g.value.map(|x| x * lr);
            p.value = p.value.zip_map(&step, |a, b| a - b);
        }
    }
    mlp.load_params(&params).unwrap();

    let logits = mlp.forward(&input, 3).unwrap();
    let loss_after = loss_fn.loss(&targets, &logits);
    assert!(
        loss_after < loss_before,
        "loss did not decrease: {loss_before} -> {loss_after}"
    );
}
