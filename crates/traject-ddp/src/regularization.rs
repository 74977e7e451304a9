//! Adaptive regularization control.
//!
//! The backward pass shifts a Hessian-like matrix by `lambda` to keep the
//! stage factorizations positive definite. `lambda` is steered by a
//! multiplicative factor `dlambda` that accelerates in whichever direction
//! the solve is currently pushing: repeated failures grow `lambda` faster
//! and faster, repeated successes shrink it back toward zero.

use crate::config::DdpConfig;

/// Regularization state `(lambda, dlambda)`.
///
/// Maintains the invariant `lambda == 0 || lambda_min <= lambda <= lambda_max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regularization {
    lambda: f64,
    dlambda: f64,
}

impl Regularization {
    /// Start from the configured initial coefficients.
    pub const fn new(lambda: f64, dlambda: f64) -> Self {
        Self { lambda, dlambda }
    }

    /// Current regularization coefficient.
    pub const fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Current scaling factor.
    pub const fn dlambda(&self) -> f64 {
        self.dlambda
    }

    /// Raise `lambda` after a failed backward pass or a rejected line
    /// search.
    ///
    /// Returns `false` when the raised coefficient exceeds
    /// `config.lambda_max`; in that case `lambda` is clamped to the maximum
    /// and the caller must abandon the solve.
    #[must_use]
    pub fn increase(&mut self, config: &DdpConfig) -> bool {
        self.dlambda = (self.dlambda * config.lambda_factor).max(config.lambda_factor);
        self.lambda = (self.lambda * self.dlambda).max(config.lambda_min);
        if self.lambda > config.lambda_max {
            self.lambda = config.lambda_max;
            return false;
        }
        true
    }

    /// Lower `lambda` after an accepted iteration. Values that fall below
    /// `config.lambda_min` are clamped to exactly zero.
    pub fn decrease(&mut self, config: &DdpConfig) {
        self.dlambda = (self.dlambda / config.lambda_factor).min(1.0 / config.lambda_factor);
        self.lambda *= self.dlambda;
        if self.lambda < config.lambda_min {
            self.lambda = 0.0;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
