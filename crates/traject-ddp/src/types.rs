//! Core data types: the per-stage derivatives cache, the iteration trace,
//! and the solution returned by a solve.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// StageDerivatives
// ---------------------------------------------------------------------------

/// Derivatives of the problem at one stage, refreshed in full before every
/// backward pass.
///
/// Buffers are allocated once per solver and filled by the problem's
/// derivative methods. The second-order dynamics tensors are stored
/// slice-wise (one slice per state component) and are only allocated when
/// the solver is configured to use them.
#[derive(Debug, Clone)]
pub struct StageDerivatives {
    /// First-order derivative of the state equation w.r.t. state (`n x n`).
    pub fx: DMatrix<f64>,
    /// First-order derivative of the state equation w.r.t. input (`n x m`).
    pub fu: DMatrix<f64>,
    /// Second-order derivative of the state equation w.r.t. state
    /// (`n` slices of `n x n`).
    pub fxx: Vec<DMatrix<f64>>,
    /// Second-order derivative of the state equation w.r.t. input
    /// (`n` slices of `m x m`).
    pub fuu: Vec<DMatrix<f64>>,
    /// Second-order derivative of the state equation w.r.t. state and input
    /// (`n` slices of `n x m`).
    pub fxu: Vec<DMatrix<f64>>,
    /// First-order derivative of the running cost w.r.t. state (`n`).
    pub lx: DVector<f64>,
    /// First-order derivative of the running cost w.r.t. input (`m`).
    pub lu: DVector<f64>,
    /// Second-order derivative of the running cost w.r.t. state (`n x n`).
    pub lxx: DMatrix<f64>,
    /// Second-order derivative of the running cost w.r.t. input (`m x m`).
    pub luu: DMatrix<f64>,
    /// Second-order derivative of the running cost w.r.t. state and input
    /// (`n x m`).
    pub lxu: DMatrix<f64>,
}

impl StageDerivatives {
    /// Allocate zeroed buffers for the given dimensions. Tensor slices are
    /// only allocated when `second_order` is set.
    pub fn new(state_dim: usize, input_dim: usize, second_order: bool) -> Self {
        let tensor = |rows: usize, cols: usize| {
            if second_order {
                vec![DMatrix::zeros(rows, cols); state_dim]
            } else {
                Vec::new()
            }
        };
        Self {
            fx: DMatrix::zeros(state_dim, state_dim),
            fu: DMatrix::zeros(state_dim, input_dim),
            fxx: tensor(state_dim, state_dim),
            fuu: tensor(input_dim, input_dim),
            fxu: tensor(state_dim, input_dim),
            lx: DVector::zeros(state_dim),
            lu: DVector::zeros(input_dim),
            lxx: DMatrix::zeros(state_dim, state_dim),
            luu: DMatrix::zeros(input_dim, input_dim),
            lxu: DMatrix::zeros(state_dim, input_dim),
        }
    }

    /// Whether second-order tensor storage is allocated.
    pub fn has_second_order(&self) -> bool {
        !self.fxx.is_empty()
    }
}

// ---------------------------------------------------------------------------
// TraceEntry
// ---------------------------------------------------------------------------

/// Per-iteration diagnostic record.
///
/// One entry is appended for the seed rollout (iteration 0) and for every
/// iteration after that, including rejected ones — a rejected iteration
/// carries `alpha == 0.0` as a sentinel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Iteration of the optimization loop (0 for the seed rollout).
    pub iter: usize,
    /// Total trajectory cost after this iteration.
    pub cost: f64,
    /// Regularization coefficient after this iteration.
    pub lambda: f64,
    /// Scaling factor of the regularization coefficient.
    pub dlambda: f64,
    /// Accepted feedforward scaling, or 0.0 if no step was accepted.
    pub alpha: f64,
    /// Relative feedforward norm `max_t |k[t]| / (|u[t]| + 1)`.
    pub k_rel_norm: f64,
    /// Actual cost decrease achieved by the accepted step.
    pub cost_update_actual: f64,
    /// Cost decrease predicted by the quadratic model.
    pub cost_update_expected: f64,
    /// Ratio of actual to expected cost decrease.
    pub cost_update_ratio: f64,
    /// Time spent evaluating problem derivatives, in microseconds.
    pub duration_derivative_us: u64,
    /// Time spent in the backward pass, in microseconds.
    pub duration_backward_us: u64,
    /// Time spent in forward passes (all line-search candidates), in
    /// microseconds.
    pub duration_forward_us: u64,
}

// ---------------------------------------------------------------------------
// Termination
// ---------------------------------------------------------------------------

/// Why the solve stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The relative feedforward norm dropped below `k_rel_norm_thre` with
    /// `lambda` below `lambda_thre`.
    FeedforwardNorm,
    /// The magnitude of the actual cost update dropped below
    /// `cost_update_thre`.
    CostUpdate,
    /// The iteration budget was exhausted; the best trajectory found is
    /// returned.
    MaxIterations,
    /// `lambda` exceeded `lambda_max`; the solve failed.
    RegularizationOverflow,
}

impl Termination {
    /// Whether this cause counts as a successful solve.
    pub const fn is_success(self) -> bool {
        !matches!(self, Self::RegularizationOverflow)
    }
}

// ---------------------------------------------------------------------------
// DdpSolution
// ---------------------------------------------------------------------------

/// Result of a DDP solve.
///
/// The trajectory satisfies `states[t + 1] = f(states[t], inputs[t])` for the
/// committed (accepted) rollout, and `states[0]` equals the initial state
/// passed to [`solve`](crate::solver::DdpSolver::solve).
#[derive(Debug, Clone)]
pub struct DdpSolution {
    /// State sequence `x[0..=N]` (`N + 1` entries).
    pub states: Vec<DVector<f64>>,
    /// Input sequence `u[0..N]` (`N` entries).
    pub inputs: Vec<DVector<f64>>,
    /// Feedforward terms `k[0..N]` from the final backward pass.
    pub feedforward: Vec<DVector<f64>>,
    /// Feedback gains `K[0..N]` (`m x n` each) from the final backward pass.
    pub feedback: Vec<DMatrix<f64>>,
    /// Per-stage costs `l[0..N-1]` followed by the terminal cost (`N + 1`
    /// entries).
    pub stage_costs: DVector<f64>,
    /// Total trajectory cost.
    pub cost: f64,
    /// Whether the solve terminated successfully.
    pub converged: bool,
    /// Cause of termination.
    pub termination: Termination,
    /// Number of iterations executed.
    pub iterations: usize,
    /// Full per-iteration trace.
    pub trace: Vec<TraceEntry>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_derivatives_shapes() {
        let derivs = StageDerivatives::new(3, 2, false);
        assert_eq!(derivs.fx.shape(), (3, 3));
        assert_eq!(derivs.fu.shape(), (3, 2));
        assert_eq!(derivs.lxu.shape(), (3, 2));
        assert_eq!(derivs.luu.shape(), (2, 2));
        assert!(!derivs.has_second_order());
        assert!(derivs.fxx.is_empty());
    }

    #[test]
    fn stage_derivatives_second_order_slices() {
        let derivs = StageDerivatives::new(3, 2, true);
        assert!(derivs.has_second_order());
        assert_eq!(derivs.fxx.len(), 3);
        assert_eq!(derivs.fuu.len(), 3);
        assert_eq!(derivs.fxu.len(), 3);
        assert_eq!(derivs.fxx[0].shape(), (3, 3));
        assert_eq!(derivs.fuu[0].shape(), (2, 2));
        assert_eq!(derivs.fxu[0].shape(), (3, 2));
    }

    #[test]
    fn trace_entry_roundtrip() {
        let entry = TraceEntry {
            iter: 4,
            cost: 12.5,
            lambda: 1e-6,
            dlambda: 1.0,
            alpha: 0.5,
            k_rel_norm: 3e-3,
            cost_update_actual: 0.25,
            cost_update_expected: 0.3,
            cost_update_ratio: 0.25 / 0.3,
            duration_derivative_us: 120,
            duration_backward_us: 340,
            duration_forward_us: 80,
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: TraceEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn rejected_iteration_sentinel_is_default_alpha() {
        let entry = TraceEntry {
            iter: 2,
            ..TraceEntry::default()
        };
        assert_eq!(entry.alpha, 0.0);
    }

    #[test]
    fn termination_success_classification() {
        assert!(Termination::FeedforwardNorm.is_success());
        assert!(Termination::CostUpdate.is_success());
        assert!(Termination::MaxIterations.is_success());
        assert!(!Termination::RegularizationOverflow.is_success());
    }
}
