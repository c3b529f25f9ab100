//! The layer contract and the fully connected layer.
//!
//! Every layer in a model is polymorphic over the same capability set:
//! forward, backward, mode switching, and parameter get/load. Trainable
//! layers additionally keep the gradient of their most recent backward call
//! (overwrite semantics — gradients are never accumulated across calls).
//!
//! The train-mode input cache is the one piece of mutable state the contract
//! allows: `forward` populates it while in [`Mode::Train`], `backward` reads
//! it, and any mode switch clears it so a stale cache can never silently feed
//! gradient computation.

use rand::Rng;

use crate::{Error, InitConfig, Matrix, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-layer execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Forward passes cache their input for a later backward pass.
    Train,
    /// Forward passes are pure; backward is unavailable.
    Eval,
}

/// A named parameter snapshot, as returned by [`Layer::params`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: Matrix,
}

impl Param {
    pub fn new(name: impl Into<String>, value: Matrix) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Common contract for all layer kinds.
///
/// Shape contract: inputs and upstream gradients are `(batch_size, features)`
/// matrices. Shape misuse inside `forward`/`backward` is programmer error and
/// panics; calling `backward` without a cached train-mode input is surfaced
/// as [`Error::InvalidState`].
pub trait Layer {
    /// Transform a batch. Caches the input iff the layer is in train mode.
    fn forward(&mut self, input: &Matrix) -> Matrix;

    /// Given `dL/d(output)`, return `dL/d(input)` and store parameter
    /// gradients (for trainable layers).
    fn backward(&mut self, upstream: &Matrix) -> Result<Matrix>;

    /// Switch mode. Always invalidates the cached input.
    fn set_mode(&mut self, mode: Mode);

    fn mode(&self) -> Mode;

    /// Current parameter values, in a stable order. Empty for parameter-free
    /// layers.
    fn params(&self) -> Vec<Param>;

    /// Check that `params` could be loaded into this layer, without mutating
    /// anything.
    fn validate_params(&self, params: &[Param]) -> Result<()>;

    /// Overwrite parameter values. `params` must match [`Layer::params`] in
    /// names and shapes.
    fn load_params(&mut self, params: &[Param]) -> Result<()>;

    /// Gradients from the most recent backward call, in the same order as
    /// [`Layer::params`]. Empty if no backward pass has run yet.
    fn grads(&self) -> Vec<Param>;

    /// Input feature count, or `None` for shape-preserving layers.
    fn in_features(&self) -> Option<usize>;

    /// Output feature count, or `None` for shape-preserving layers.
    fn out_features(&self) -> Option<usize>;
}

/// Fully connected layer: `output = input · Wᵀ + b`.
///
/// Weights are row-major `(out_features, in_features)`; the bias is a single
/// row `(1, out_features)` broadcast across the batch.
#[derive(Debug, Clone)]
pub struct Linear {
    weights: Matrix,
    bias: Matrix,
    grad_weights: Option<Matrix>,
    grad_bias: Option<Matrix>,
    cache: Option<Matrix>,
    mode: Mode,
}

impl Linear {
    /// Create a layer with parameters drawn from `init`.
    pub fn new<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        init: &InitConfig,
        rng: &mut R,
    ) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(Error::InvalidConfig(format!(
                "linear dimensions must be > 0, got {in_features} -> {out_features}"
            )));
        }
        Ok(Self {
            weights: init.sample(out_features, in_features, rng)?,
            bias: init.sample_bias(out_features, rng)?,
            grad_weights: None,
            grad_bias: None,
            cache: None,
            mode: Mode::Train,
        })
    }

    #[inline]
    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    #[inline]
    pub fn bias(&self) -> &Matrix {
        &self.bias
    }

    /// Weight gradient from the most recent backward call.
    #[inline]
    pub fn grad_weights(&self) -> Option<&Matrix> {
        self.grad_weights.as_ref()
    }

    /// Bias gradient from the most recent backward call.
    #[inline]
    pub fn grad_bias(&self) -> Option<&Matrix> {
        self.grad_bias.as_ref()
    }
}

impl Layer for Linear {
    fn forward(&mut self, input: &Matrix) -> Matrix {
        assert_eq!(
            input.cols(),
            self.weights.cols(),
            "linear forward: input has {} features, layer expects {}",
            input.cols(),
            self.weights.cols()
        );
        if self.mode == Mode::Train {
            self.cache = Some(input.clone());
        }
        let mut out = input.matmul_rhs_t(&self.weights);
        out.add_row_assign(&self.bias);
        out
    }

    fn backward(&mut self, upstream: &Matrix) -> Result<Matrix> {
        let cache = self.cache.as_ref().ok_or_else(|| {
            Error::InvalidState(
                "linear backward called without a cached input; layer is not in training mode"
                    .to_owned(),
            )
        })?;
        assert_eq!(
            upstream.shape(),
            (cache.rows(), self.weights.rows()),
            "linear backward: upstream is {}x{}, expected {}x{}",
            upstream.rows(),
            upstream.cols(),
            cache.rows(),
            self.weights.rows()
        );

        // d_b = column sums of G; d_W = Gᵀ·Z; returned d_Z = G·W.
        self.grad_bias = Some(upstream.column_sums());
        self.grad_weights = Some(upstream.matmul_lhs_t(cache));
        Ok(upstream.matmul(&self.weights))
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.cache = None;
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn params(&self) -> Vec<Param> {
        vec![
            Param::new("weights", self.weights.clone()),
            Param::new("bias", self.bias.clone()),
        ]
    }

    fn validate_params(&self, params: &[Param]) -> Result<()> {
        if params.len() != 2 {
            return Err(Error::InvalidData(format!(
                "linear layer expects 2 parameters (weights, bias), got {}",
                params.len()
            )));
        }
        for (param, (name, shape)) in params.iter().zip([
            ("weights", self.weights.shape()),
            ("bias", self.bias.shape()),
        ]) {
            if param.name != name {
                return Err(Error::InvalidData(format!(
                    "expected parameter {name:?}, got {:?}",
                    param.name
                )));
            }
            if param.value.shape() != shape {
                return Err(Error::InvalidShape(format!(
                    "parameter {name:?} has shape {}x{}, expected {}x{}",
                    param.value.rows(),
                    param.value.cols(),
                    shape.0,
                    shape.1
                )));
            }
        }
        Ok(())
    }

    fn load_params(&mut self, params: &[Param]) -> Result<()> {
        self.validate_params(params)?;
        self.weights = params[0].value.clone();
        self.bias = params[1].value.clone();
        Ok(())
    }

    fn grads(&self) -> Vec<Param> {
        match (&self.grad_weights, &self.grad_bias) {
            (Some(w), Some(b)) => vec![
                Param::new("weights", w.clone()),
                Param::new("bias", b.clone()),
            ],
            _ => Vec::new(),
        }
    }

    fn in_features(&self) -> Option<usize> {
        Some(self.weights.cols())
    }

    fn out_features(&self) -> Option<usize> {
        Some(self.weights.rows())
    }
}
