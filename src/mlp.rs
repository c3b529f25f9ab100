//! The MLP model: an ordered sequence of layers behind one forward/backward
//! surface.
//!
//! Construction is config-driven: each [`LayerSpec`](crate::LayerSpec) is
//! instantiated in order, and trainable layers get their starting values from
//! the configured initializer. Layers are exclusively owned by the model.
//!
//! The backward pass is a reverse iteration: the loss gradient enters at the
//! last layer, and each layer's returned input-gradient becomes the upstream
//! gradient of the layer before it.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::activation::ActivationLayer;
use crate::layer::{Layer, Linear, Mode, Param};
use crate::{Error, LayerSpec, Matrix, ModelConfig, Result};

pub struct Mlp {
    layers: Vec<Box<dyn Layer>>,
}

impl Mlp {
    /// Build a model from `config` with entropy-seeded initialization.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let mut rng = StdRng::from_entropy();
        Self::new_with_rng(config, &mut rng)
    }

    /// Build a model from `config` with deterministic initialization.
    pub fn new_with_seed(config: &ModelConfig, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new_with_rng(config, &mut rng)
    }

    /// Build a model from `config` using the provided RNG.
    pub fn new_with_rng<R: Rng + ?Sized>(config: &ModelConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;

        let mut layers: Vec<Box<dyn Layer>> = Vec::with_capacity(config.layers.len());
        for spec in &config.layers {
            let layer: Box<dyn Layer> = match *spec {
                LayerSpec::Linear {
                    in_features,
                    out_features,
                } => Box::new(Linear::new(in_features, out_features, &config.init, rng)?),
                other => {
                    let kind = other
                        .activation()
                        .ok_or_else(|| Error::InvalidConfig(format!("unsupported layer {other:?}")))?;
                    Box::new(ActivationLayer::new(kind)?)
                }
            };
            layers.push(layer);
        }

        debug!(
            "built mlp: {} layers, init {}",
            layers.len(),
            config.init.strategy.name()
        );
        Ok(Self { layers })
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Feature count expected by the first shape-bearing layer, if any.
    pub fn input_features(&self) -> Option<usize> {
        self.layers.iter().find_map(|l| l.in_features())
    }

    /// Feature count produced by the last shape-bearing layer, if any.
    pub fn output_features(&self) -> Option<usize> {
        self.layers.iter().rev().find_map(|l| l.out_features())
    }

    /// Switch every layer to train mode (and drop any cached inputs).
    pub fn train(&mut self) {
        for layer in &mut self.layers {
            layer.set_mode(Mode::Train);
        }
    }

    /// Switch every layer to eval mode (and drop any cached inputs).
    pub fn eval(&mut self) {
        for layer in &mut self.layers {
            layer.set_mode(Mode::Eval);
        }
    }

    /// Forward pass over a flat row-major batch buffer.
    ///
    /// The buffer is reshaped to `(batch_size, features)` with
    /// `features = input.len() / batch_size` — this is where inputs with
    /// extra dimensions (e.g. image batches) get flattened.
    pub fn forward(&mut self, input: &[f32], batch_size: usize) -> Result<Matrix> {
        if batch_size == 0 {
            return Err(Error::InvalidShape("batch_size must be > 0".to_owned()));
        }
        if input.len() % batch_size != 0 {
            return Err(Error::InvalidShape(format!(
                "input len {} is not divisible by batch_size {batch_size}",
                input.len()
            )));
        }
        let features = input.len() / batch_size;
        if let Some(expected) = self.input_features() {
            if features != expected {
                return Err(Error::InvalidShape(format!(
                    "input has {features} features per sample, model expects {expected}"
                )));
            }
        }
        let batch = Matrix::from_vec(input.to_vec(), batch_size, features)?;
        Ok(self.forward_matrix(&batch))
    }

    /// Forward pass over an already-2D batch.
    pub fn forward_matrix(&mut self, input: &Matrix) -> Matrix {
        let mut out = input.clone();
        for layer in &mut self.layers {
            out = layer.forward(&out);
        }
        out
    }

    /// Backward pass: propagate `dL/d(output)` through all layers in reverse
    /// and return `dL/d(input)`.
    ///
    /// Every layer must have seen a forward pass in train mode since the
    /// last mode switch, otherwise the layer's state error is surfaced.
    pub fn backward(&mut self, d_output: &Matrix) -> Result<Matrix> {
        let mut grad = d_output.clone();
        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(&grad)?;
        }
        Ok(grad)
    }

    /// Per-layer parameter snapshots, position-indexed (empty entries for
    /// parameter-free layers).
    pub fn params(&self) -> Vec<Vec<Param>> {
        self.layers.iter().map(|l| l.params()).collect()
    }

    /// Per-layer gradient snapshots from the most recent backward pass,
    /// position-indexed.
    pub fn grads(&self) -> Vec<Vec<Param>> {
        self.layers.iter().map(|l| l.grads()).collect()
    }

    /// Overwrite all layer parameters from position-indexed snapshots.
    ///
    /// All-or-nothing: the full list is validated against every layer before
    /// any parameter is touched.
    pub fn load_params(&mut self, params: &[Vec<Param>]) -> Result<()> {
        if params.len() != self.layers.len() {
            return Err(Error::InvalidData(format!(
                "parameter list has {} entries, model has {} layers",
                params.len(),
                self.layers.len()
            )));
        }
        for (i, (layer, entry)) in self.layers.iter().zip(params).enumerate() {
            layer
                .validate_params(entry)
                .map_err(|e| Error::InvalidData(format!("layer {i}: {e}")))?;
        }
        for (layer, entry) in self.layers.iter_mut().zip(params) {
            layer.load_params(entry)?;
        }
        debug!("loaded parameters for {} layers", params.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Init, InitConfig, InitHyper};

    fn config() -> ModelConfig {
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

    #[test]
    fn seeded_init_is_deterministic() {
        let mut a = Mlp::new_with_seed(&config(), 123).unwrap();
        let mut b = Mlp::new_with_seed(&config(), 123).unwrap();

        let input = [0.3, -0.7, 0.1, 0.9, 0.2, 0.0, -0.1, 0.4];
        let out_a = a.forward(&input, 2).unwrap();
        let out_b = b.forward(&input, 2).unwrap();
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn forward_reshapes_flat_input() {
        let mut mlp = Mlp::new_with_seed(&config(), 0).unwrap();
        // 2 samples of 4 features each, passed flat.
        let input = [0.0_f32; 8];
        let out = mlp.forward(&input, 2).unwrap();
        assert_eq!(out.shape(), (2, 2));
    }

    #[test]
    fn forward_rejects_bad_flat_shapes() {
        let mut mlp = Mlp::new_with_seed(&config(), 0).unwrap();
        assert!(mlp.forward(&[0.0; 8], 0).is_err());
        assert!(mlp.forward(&[0.0; 7], 2).is_err());
        // Divisible, but wrong per-sample feature count.
        assert!(mlp.forward(&[0.0; 6], 2).is_err());
    }

    #[test]
    fn input_and_output_features_come_from_shape_bearing_layers() {
        let mlp = Mlp::new_with_seed(&config(), 0).unwrap();
        assert_eq!(mlp.input_features(), Some(4));
        assert_eq!(mlp.output_features(), Some(2));
        assert_eq!(mlp.num_layers(), 3);
    }

    #[test]
    fn load_params_rejects_wrong_layer_count_without_mutation() {
        let mut mlp = Mlp::new_with_seed(&config(), 0).unwrap();
        let before = mlp.params();

        assert!(mlp.load_params(&before[..2]).is_err());

        // A bad entry deep in the list must leave earlier layers untouched.
        let mut bad = before.clone();
        bad[2][0].value = Matrix::zeros(5, 5);
        assert!(mlp.load_params(&bad).is_err());
        assert_eq!(mlp.params(), before);
    }
}
