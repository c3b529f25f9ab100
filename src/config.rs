//! Model configuration.
//!
//! A model is described by an ordered list of layer specs plus an
//! initializer config. The [`Mlp`](crate::Mlp) consumes this structure once
//! at construction; with the `serde` feature enabled the whole thing
//! round-trips through tagged snake_case representations, so configs can be
//! written by name in JSON/YAML/TOML front ends.

use crate::{Activation, Error, InitConfig, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One layer in the model, by kind.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerSpec {
    Linear {
        in_features: usize,
        out_features: usize,
    },
    ReLU,
    LeakyReLU {
        alpha: f32,
    },
    Sigmoid,
    Tanh,
}

impl LayerSpec {
    pub(crate) fn activation(self) -> Option<Activation> {
        match self {
            LayerSpec::Linear { .. } => None,
            LayerSpec::ReLU => Some(Activation::ReLU),
            LayerSpec::LeakyReLU { alpha } => Some(Activation::LeakyReLU { alpha }),
            LayerSpec::Sigmoid => Some(Activation::Sigmoid),
            LayerSpec::Tanh => Some(Activation::Tanh),
        }
    }
}

/// Full model description: layers in order plus parameter initialization.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub layers: Vec<LayerSpec>,
    pub init: InitConfig,
}

impl ModelConfig {
    pub fn new(layers: Vec<LayerSpec>, init: InitConfig) -> Self {
        Self { layers, init }
    }

    /// Check the configuration as a whole.
    ///
    /// Beyond per-layer validity (positive dimensions, finite alpha), this
    /// enforces the chain invariant: every shape-bearing layer must accept
    /// the feature count produced by the previous shape-bearing layer, with
    /// shape-preserving activations allowed anywhere in between.
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::InvalidConfig(
                "model must have at least one layer".to_owned(),
            ));
        }

        let mut features: Option<usize> = None;
        for (i, spec) in self.layers.iter().enumerate() {
            match *spec {
                LayerSpec::Linear {
                    in_features,
                    out_features,
                } => {
                    if in_features == 0 || out_features == 0 {
                        return Err(Error::InvalidConfig(format!(
                            "layer {i}: linear dimensions must be > 0, got {in_features} -> {out_features}"
                        )));
                    }
                    if let Some(f) = features {
                        if f != in_features {
                            return Err(Error::InvalidConfig(format!(
                                "layer {i}: expects {in_features} input features, previous layer produces {f}"
                            )));
                        }
                    }
                    features = Some(out_features);
                }
                other => {
                    if let Some(act) = other.activation() {
                        act.validate()
                            .map_err(|e| Error::InvalidConfig(format!("layer {i}: {e}")))?;
                    }
                }
            }
        }
        Ok(())
    }
}
