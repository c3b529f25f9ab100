//! Activation functions and activation layers.
//!
//! [`Activation`] is the elementwise nonlinearity itself; [`ActivationLayer`]
//! adapts it to the [`Layer`](crate::Layer) contract by caching the raw
//! pre-activation input while in train mode, so the backward pass can evaluate
//! the local derivative where the forward pass saw it.

use crate::layer::{Layer, Mode, Param};
use crate::{Error, Matrix, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq)]
/// Element-wise activation function.
pub enum Activation {
    ReLU,
    LeakyReLU { alpha: f32 },
    Sigmoid,
    Tanh,
}

impl Activation {
    /// Validate activation parameters.
    pub fn validate(self) -> Result<()> {
        match self {
            Activation::LeakyReLU { alpha } => {
                if !(alpha.is_finite() && alpha >= 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "leaky ReLU alpha must be finite and >= 0, got {alpha}"
                    )));
                }
            }
            Activation::ReLU | Activation::Sigmoid | Activation::Tanh => {}
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn forward(self, x: f32) -> f32 {
        match self {
            Activation::ReLU => x.max(0.0),
            Activation::LeakyReLU { alpha } => {
                if x > 0.0 {
                    x
                } else {
                    alpha * x
                }
            }
            Activation::Sigmoid => sigmoid(x),
            Activation::Tanh => x.tanh(),
        }
    }

    /// Derivative with respect to the pre-activation input, evaluated at `x`.
    ///
    /// The ReLU-family boundary at exactly 0 counts as non-positive: no
    /// gradient flows through a ReLU unit whose input was 0.
    #[inline]
    pub(crate) fn grad(self, x: f32) -> f32 {
        match self {
            Activation::ReLU => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::LeakyReLU { alpha } => {
                if x > 0.0 {
                    1.0
                } else {
                    alpha
                }
            }
            Activation::Sigmoid => {
                let s = sigmoid(x);
                s * (1.0 - s)
            }
            Activation::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Activation::ReLU => "relu",
            Activation::LeakyReLU { .. } => "leaky_relu",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
        }
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    // Numerically stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

/// A parameter-free, shape-preserving layer applying an [`Activation`].
#[derive(Debug, Clone)]
pub struct ActivationLayer {
    kind: Activation,
    cache: Option<Matrix>,
    mode: Mode,
}

impl ActivationLayer {
    pub fn new(kind: Activation) -> Result<Self> {
        kind.validate()?;
        Ok(Self {
            kind,
            cache: None,
            mode: Mode::Train,
        })
    }

    #[inline]
    pub fn kind(&self) -> Activation {
        self.kind
    }
}

impl Layer for ActivationLayer {
    fn forward(&mut self, input: &Matrix) -> Matrix {
        if self.mode == Mode::Train {
            self.cache = Some(input.clone());
        }
        input.map(|x| self.kind.forward(x))
    }

    fn backward(&mut self, upstream: &Matrix) -> Result<Matrix> {
        let cache = self.cache.as_ref().ok_or_else(|| {
            Error::InvalidState(format!(
                "{} backward called without a cached input; layer is not in training mode",
                self.kind.name()
            ))
        })?;
        assert_eq!(
            upstream.shape(),
            cache.shape(),
            "{} backward: upstream is {}x{}, cached input is {}x{}",
            self.kind.name(),
            upstream.rows(),
            upstream.cols(),
            cache.rows(),
            cache.cols()
        );
        Ok(upstream.zip_map(cache, |g, x| g * self.kind.grad(x)))
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.cache = None;
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn params(&self) -> Vec<Param> {
        Vec::new()
    }

    fn validate_params(&self, params: &[Param]) -> Result<()> {
        if params.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidData(format!(
                "{} layer has no trainable parameters, got {}",
                self.kind.name(),
                params.len()
            )))
        }
    }

    fn load_params(&mut self, params: &[Param]) -> Result<()> {
        self.validate_params(params)
    }

    fn grads(&self) -> Vec<Param> {
        Vec::new()
    }

    fn in_features(&self) -> Option<usize> {
        None
    }

    fn out_features(&self) -> Option<usize> {
        None
    }
}
