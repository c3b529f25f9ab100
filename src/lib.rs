//! A from-scratch MLP training core.
//!
//! `mlp-core` implements the forward/backward machinery of a multilayer
//! perceptron: layers, activations, softmax cross-entropy, and parameter
//! initialization, composed behind a single model type. It is designed to be
//! easy to read while staying honest about the chain-rule math.
//!
//! What it deliberately does **not** contain: optimizers, dataset loading,
//! and the training loop driver. The model produces parameter gradients and
//! exposes parameter get/load; stepping the parameters is the caller's job.
//!
//! # Design goals
//!
//! - Clear contracts: shapes are explicit and validated at the API boundary.
//! - Explicit state: each layer's train/eval mode and forward-input cache are
//!   first-class, and misuse (backward without a train-mode forward) is an
//!   error, never a silent zero gradient.
//! - Deterministic construction: every constructor has a `*_with_seed` /
//!   `*_with_rng` form.
//!
//! # Panics vs `Result`
//!
//! This crate intentionally exposes two layers of API:
//!
//! - Low-level hot path (panics on misuse): [`Matrix`] products and the layer
//!   `forward`/`backward` shape contracts. Shape mismatches there are
//!   programmer error and panic via `assert!`.
//! - Validated surfaces (return [`Result`]): configuration
//!   ([`ModelConfig::validate`]), construction, [`Mlp::forward`]'s flat-input
//!   reshape, and the checkpoint interface ([`Mlp::params`] /
//!   [`Mlp::load_params`]).
//!
//! # Data layout and shapes
//!
//! - Scalars are `f32`.
//! - [`Matrix`] is flat row-major: batches are `(batch_size, features)`,
//!   weights `(out_features, in_features)`, biases `(1, out_features)`.
//! - [`Mlp::forward`] accepts a flat buffer plus a batch size and reshapes,
//!   flattening any extra per-sample dimensions.
//!
//! # Quick start
//!
//! ```rust
//! use mlp_core::{CrossEntropyLoss, InitConfig, LayerSpec, Matrix, Mlp, ModelConfig};
//!
//! # fn main() -> mlp_core::Result<()> {
//! let config = ModelConfig::new(
//!     vec![
//!         LayerSpec::Linear { in_features: 4, out_features: 8 },
//!         LayerSpec::ReLU,
//!         LayerSpec::Linear { in_features: 8, out_features: 3 },
//!     ],
//!     InitConfig::default(),
//! );
//! let mut mlp = Mlp::new_with_seed(&config, 0)?;
//!
//! // One training step's worth of plumbing; the optimizer consuming
//! // `mlp.grads()` is external.
//! mlp.train();
//! let logits = mlp.forward(&[0.1, -0.2, 0.3, 0.4], 1)?;
//! let targets = Matrix::from_vec(vec![1.0, 0.0, 0.0], 1, 3)?;
//!
//! let loss_fn = CrossEntropyLoss::new();
//! let loss = loss_fn.loss(&targets, &logits);
//! assert!(loss.is_finite());
//!
//! let d_logits = loss_fn.backward(&targets, &logits);
//! mlp.backward(&d_logits)?;
//! let grads = mlp.grads();
//! assert_eq!(grads.len(), mlp.num_layers());
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod config;
pub mod error;
pub mod init;
pub mod layer;
pub mod loss;
pub mod matrix;
pub mod mlp;

pub use activation::{Activation, ActivationLayer};
pub use config::{LayerSpec, ModelConfig};
pub use error::{Error, Result};
pub use init::{Init, InitConfig, InitHyper};
pub use layer::{Layer, Linear, Mode, Param};
pub use loss::CrossEntropyLoss;
pub use matrix::Matrix;
pub use mlp::Mlp;
