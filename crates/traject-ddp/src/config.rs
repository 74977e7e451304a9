//! Solver configuration.

use serde::{Deserialize, Serialize};

use crate::error::DdpError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_verbose_print() -> bool {
    true
}
const fn default_max_iter() -> usize {
    500
}
const fn default_horizon_steps() -> usize {
    100
}
const fn default_reg_type() -> RegType {
    RegType::Quu
}
const fn default_initial_lambda() -> f64 {
    1e-6
}
const fn default_initial_dlambda() -> f64 {
    1.0
}
const fn default_lambda_factor() -> f64 {
    1.6
}
const fn default_lambda_min() -> f64 {
    1e-6
}
const fn default_lambda_max() -> f64 {
    1e10
}
const fn default_k_rel_norm_thre() -> f64 {
    1e-4
}
const fn default_lambda_thre() -> f64 {
    1e-5
}
const fn default_cost_update_ratio_thre() -> f64 {
    0.0
}
const fn default_cost_update_thre() -> f64 {
    1e-7
}
fn default_alpha_list() -> Vec<f64> {
    geometric_alpha_list(11, 1e-3)
}

// ---------------------------------------------------------------------------
// RegType
// ---------------------------------------------------------------------------

/// Which Hessian-like matrix the regularization shift `lambda` is applied to
/// in the backward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegType {
    /// Shift the input-space Hessian: `Quu + lambda * I`.
    Quu,
    /// Shift the value Hessian before forming the Q blocks:
    /// `Vxx + lambda * I`.
    Vxx,
}

// ---------------------------------------------------------------------------
// DdpConfig
// ---------------------------------------------------------------------------

/// DDP solver configuration.
///
/// Immutable for the duration of a solve. All thresholds follow the
/// conventions of Tassa et al., "Synthesis and stabilization of complex
/// behaviors through online trajectory optimization" (IROS 2012).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DdpConfig {
    /// Emit per-iteration diagnostics through `tracing` (default: true).
    #[serde(default = "default_verbose_print")]
    pub verbose_print: bool,

    /// Include the second-order dynamics tensors (`Fxx`, `Fuu`, `Fxu`) in the
    /// backward-pass Q terms. Requires the problem to override
    /// [`DdpProblem::state_eq_second_deriv`](crate::problem::DdpProblem::state_eq_second_deriv)
    /// (default: false).
    #[serde(default)]
    pub use_state_eq_second_derivative: bool,

    /// Maximum number of outer iterations (default: 500).
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,

    /// Number of input decision stages in the horizon; the state sequence has
    /// one more entry (default: 100).
    #[serde(default = "default_horizon_steps")]
    pub horizon_steps: usize,

    /// Regularization type (default: [`RegType::Quu`]).
    #[serde(default = "default_reg_type")]
    pub reg_type: RegType,

    /// Initial regularization coefficient (default: 1e-6).
    #[serde(default = "default_initial_lambda")]
    pub initial_lambda: f64,

    /// Initial scaling factor of the regularization coefficient
    /// (default: 1.0).
    #[serde(default = "default_initial_dlambda")]
    pub initial_dlambda: f64,

    /// Multiplicative step applied to `dlambda` on increase/decrease
    /// (default: 1.6). Must be greater than 1.
    #[serde(default = "default_lambda_factor")]
    pub lambda_factor: f64,

    /// Below this value `lambda` is clamped to exactly zero on decrease
    /// (default: 1e-6).
    #[serde(default = "default_lambda_min")]
    pub lambda_min: f64,

    /// Above this value the solve is abandoned with
    /// [`Termination::RegularizationOverflow`](crate::types::Termination)
    /// (default: 1e10).
    #[serde(default = "default_lambda_max")]
    pub lambda_max: f64,

    /// Convergence threshold on the relative feedforward norm
    /// `max_t |k[t]| / (|u[t]| + 1)` (default: 1e-4).
    #[serde(default = "default_k_rel_norm_thre")]
    pub k_rel_norm_thre: f64,

    /// `lambda` must be below this for convergence by feedforward norm
    /// (default: 1e-5).
    #[serde(default = "default_lambda_thre")]
    pub lambda_thre: f64,

    /// Line-search schedule for the feedforward scaling `alpha`, searched in
    /// the given order. Every entry must lie in `(0, 1]`
    /// (default: 11 values geometric from 1 down to 1e-3).
    #[serde(default = "default_alpha_list")]
    pub alpha_list: Vec<f64>,

    /// Minimum acceptance ratio of actual to expected cost decrease
    /// (default: 0, i.e. any improvement passes when the expected decrease
    /// is positive).
    #[serde(default = "default_cost_update_ratio_thre")]
    pub cost_update_ratio_thre: f64,

    /// Convergence threshold on the magnitude of the actual cost update
    /// (default: 1e-7).
    #[serde(default = "default_cost_update_thre")]
    pub cost_update_thre: f64,
}

impl Default for DdpConfig {
    fn default() -> Self {
        Self {
            verbose_print: default_verbose_print(),
            use_state_eq_second_derivative: false,
            max_iter: default_max_iter(),
            horizon_steps: default_horizon_steps(),
            reg_type: default_reg_type(),
            initial_lambda: default_initial_lambda(),
            initial_dlambda: default_initial_dlambda(),
            lambda_factor: default_lambda_factor(),
            lambda_min: default_lambda_min(),
            lambda_max: default_lambda_max(),
            k_rel_norm_thre: default_k_rel_norm_thre(),
            lambda_thre: default_lambda_thre(),
            alpha_list: default_alpha_list(),
            cost_update_ratio_thre: default_cost_update_ratio_thre(),
            cost_update_thre: default_cost_update_thre(),
        }
    }
}

impl DdpConfig {
    /// Check the configuration for values the solver cannot work with.
    pub fn validate(&self) -> Result<(), DdpError> {
        if self.horizon_steps == 0 {
            return Err(DdpError::EmptyHorizon);
        }
        if self.max_iter == 0 {
            return Err(DdpError::InvalidConfig {
                field: "max_iter",
                message: "must be at least 1",
            });
        }
        if self.lambda_factor <= 1.0 {
            return Err(DdpError::InvalidConfig {
                field: "lambda_factor",
                message: "must be greater than 1",
            });
        }
        if self.lambda_min <= 0.0 {
            return Err(DdpError::InvalidConfig {
                field: "lambda_min",
                message: "must be positive",
            });
        }
        if self.lambda_max < self.lambda_min {
            return Err(DdpError::InvalidConfig {
                field: "lambda_max",
                message: "must be at least lambda_min",
            });
        }
        if self.alpha_list.is_empty() {
            return Err(DdpError::InvalidConfig {
                field: "alpha_list",
                message: "must contain at least one entry",
            });
        }
        if self.alpha_list.iter().any(|&a| !(a > 0.0 && a <= 1.0)) {
            return Err(DdpError::InvalidConfig {
                field: "alpha_list",
                message: "entries must lie in (0, 1]",
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Alpha schedule
// ---------------------------------------------------------------------------

/// Build a geometric line-search schedule of `count` values from 1 down to
/// `alpha_min`, inclusive on both ends.
pub fn geometric_alpha_list(count: usize, alpha_min: f64) -> Vec<f64> {
    if count <= 1 {
        return vec![1.0];
    }
    let exp_min = alpha_min.log10();
    (0..count)
        .map(|i| 10f64.powf(exp_min * i as f64 / (count - 1) as f64))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
