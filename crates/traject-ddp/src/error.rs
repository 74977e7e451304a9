//! Error types for the DDP solver.
//!
//! Only conditions that make a solve ill-posed at entry surface as errors.
//! Recoverable numerical events (indefinite `Quu`, rejected line searches)
//! are handled inside the iteration loop and reported through the trace and
//! the solution's termination cause.

use thiserror::Error;

/// Errors returned by [`DdpSolver::solve`](crate::solver::DdpSolver::solve).
///
/// Copy + static messages for cheap propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DdpError {
    #[error("Horizon must contain at least one step")]
    EmptyHorizon,

    #[error("State and input dimensions must be at least 1")]
    ZeroDimension,

    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid value for {field}: {message}")]
    InvalidConfig {
        field: &'static str,
        message: &'static str,
    },

    #[error("Initial rollout diverged to a non-finite cost")]
    DivergedRollout,
}
