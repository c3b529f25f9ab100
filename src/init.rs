//! Parameter initialization strategies.
//!
//! Every strategy is a pure function of the target shape (plus the configured
//! hyperparameters): `fan_in` is the number of rows, `fan_out` the number of
//! columns. Bias vectors of length `n` are drawn as a 1-D shape, i.e. with
//! `fan_in = n` and `fan_out = 1`, unless [`InitConfig::zero_bias`] forces
//! them to zero.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::{Error, Matrix, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Weight initialization strategy.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Init {
    /// All zeros.
    Zeros,
    /// `N(mu, sigma)` draws.
    Normal,
    /// Uniform over `[-epsilon, epsilon]`.
    Uniform,
    /// `N(0, sqrt(2 / fan_in))`; intended for ReLU-family layers.
    He,
    /// Uniform over `[-e, e]` with `e = sqrt(1 / fan_in)`.
    Xavier,
    /// Uniform over `[-e, e]` with `e = sqrt(6 / (fan_in + fan_out))`.
    XavierNormalized,
}

impl Init {
    /// Look a strategy up by its configuration name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "zeros" => Ok(Init::Zeros),
            "normal" => Ok(Init::Normal),
            "uniform" => Ok(Init::Uniform),
            "he" => Ok(Init::He),
            "xavier" => Ok(Init::Xavier),
            "xavier_normalized" => Ok(Init::XavierNormalized),
            other => Err(Error::InvalidConfig(format!(
                "unknown init strategy {other:?}"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Init::Zeros => "zeros",
            Init::Normal => "normal",
            Init::Uniform => "uniform",
            Init::He => "he",
            Init::Xavier => "xavier",
            Init::XavierNormalized => "xavier_normalized",
        }
    }
}

/// Numeric hyperparameters for the strategies that need them.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitHyper {
    /// Mean for [`Init::Normal`].
    pub mu: f32,
    /// Standard deviation for [`Init::Normal`].
    pub sigma: f32,
    /// Bound for [`Init::Uniform`].
    pub epsilon: f32,
}

impl Default for InitHyper {
    fn default() -> Self {
        Self {
            mu: 0.0,
            sigma: 0.01,
            epsilon: 0.01,
        }
    }
}

/// How to populate a model's trainable parameters at construction.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitConfig {
    pub strategy: Init,
    pub hyper: InitHyper,
    /// Force bias vectors to zero regardless of `strategy`.
    pub zero_bias: bool,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            strategy: Init::He,
            hyper: InitHyper::default(),
            zero_bias: true,
        }
    }
}

impl InitConfig {
    /// Draw a `(rows, cols)` weight matrix.
    pub fn sample<R: Rng + ?Sized>(&self, rows: usize, cols: usize, rng: &mut R) -> Result<Matrix> {
        draw(self.strategy, rows, cols, rows, cols, self.hyper, rng)
    }

    /// Draw a bias of length `len`, as a `(1, len)` matrix.
    ///
    /// Respects `zero_bias`; otherwise the bias is drawn with the configured
    /// strategy under the 1-D fan convention (`fan_in = len, fan_out = 1`).
    pub fn sample_bias<R: Rng + ?Sized>(&self, len: usize, rng: &mut R) -> Result<Matrix> {
        if self.zero_bias {
            if len == 0 {
                return Err(Error::InvalidShape("bias len must be > 0".to_owned()));
            }
            return Ok(Matrix::zeros(1, len));
        }
        draw(self.strategy, 1, len, len, 1, self.hyper, rng)
    }
}

fn draw<R: Rng + ?Sized>(
    strategy: Init,
    rows: usize,
    cols: usize,
    fan_in: usize,
    fan_out: usize,
    hyper: InitHyper,
    rng: &mut R,
) -> Result<Matrix> {
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidShape(format!(
            "init shape must have positive dimensions, got {rows}x{cols}"
        )));
    }

    let matrix = match strategy {
        Init::Zeros => Matrix::zeros(rows, cols),
        Init::Normal => {
            let dist = normal(hyper.mu, hyper.sigma)?;
            Matrix::from_fn(rows, cols, || dist.sample(rng))
        }
        Init::Uniform => {
            if !(hyper.epsilon.is_finite() && hyper.epsilon > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "uniform init epsilon must be finite and > 0, got {}",
                    hyper.epsilon
                )));
            }
            let e = hyper.epsilon;
            Matrix::from_fn(rows, cols, || rng.gen_range(-e..=e))
        }
        Init::He => {
            let std = (2.0 / fan_in as f32).sqrt();
            let dist = normal(0.0, std)?;
            Matrix::from_fn(rows, cols, || dist.sample(rng))
        }
        Init::Xavier => {
            let e = (1.0 / fan_in as f32).sqrt();
            Matrix::from_fn(rows, cols, || rng.gen_range(-e..=e))
        }
        Init::XavierNormalized => {
            let e = (6.0 / (fan_in + fan_out) as f32).sqrt();
            Matrix::from_fn(rows, cols, || rng.gen_range(-e..=e))
        }
    };
    Ok(matrix)
}

fn normal(mu: f32, sigma: f32) -> Result<Normal<f32>> {
    // Normal::new only rejects non-finite std_dev; negative sigma would be
    // silently accepted, so the range check is ours.
    if !mu.is_finite() || !sigma.is_finite() || sigma < 0.0 {
        return Err(Error::InvalidConfig(format!(
            "normal init requires finite mu and sigma >= 0, got mu={mu} sigma={sigma}"
        )));
    }
    Normal::new(mu, sigma).map_err(|_| {
        Error::InvalidConfig(format!(
            "normal init requires finite mu and sigma >= 0, got mu={mu} sigma={sigma}"
        ))
    })
}
