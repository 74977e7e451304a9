//! Shared test fixtures for traject crates.
//!
//! Provides small, analytically tractable optimal-control problems
//! (regulators, a pendulum swing-up, and deliberately degenerate cases)
//! plus a finite-horizon Riccati reference solution for checking feedback
//! gains on linear-quadratic problems.

pub mod problems;
pub mod riccati;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use problems::{DoubleIntegrator, NegativeCurvature, Pendulum, ScalarLqr, ZeroCost};
pub use riccati::scalar_lqr_gains;
