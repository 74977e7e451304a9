//! Differential Dynamic Programming (DDP) trajectory optimization.
//!
//! Solves finite-horizon discrete-time optimal control problems: given
//! discrete dynamics, running and terminal costs, and their derivatives
//! (supplied through the [`DdpProblem`] trait), an initial state, and a seed
//! input sequence, the solver returns a locally optimal state/input
//! trajectory together with per-stage feedback gains.
//!
//! Each outer iteration runs:
//!
//! 1. **Derivatives** — refresh first (and optionally second) order
//!    derivatives of dynamics and costs along the current trajectory.
//! 2. **Backward pass** — Bellman recursion producing a feedforward
//!    correction `k[t]` and feedback gain `K[t]` per stage, with Hessian
//!    regularization and indefiniteness detection.
//! 3. **Line search** — forward rollouts of the corrected policy over a
//!    geometric `alpha` schedule, accepted against the predicted cost
//!    decrease.
//! 4. **Regularization control** — a scalar `lambda` adapted
//!    multiplicatively on success and failure.
//!
//! # Quick Start
//!
//! ```
//! use nalgebra::{DMatrix, DVector};
//! use traject_ddp::prelude::*;
//!
//! /// Scalar regulator: x' = 0.9 x + u, l = x^2 + u^2, phi = 10 x^2.
//! struct Regulator;
//!
//! impl DdpProblem for Regulator {
//!     fn state_dim(&self) -> usize {
//!         1
//!     }
//!     fn input_dim(&self) -> usize {
//!         1
//!     }
//!     fn state_eq(&self, x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64> {
//!         DVector::from_element(1, 0.9 * x[0] + u[0])
//!     }
//!     fn running_cost(&self, x: &DVector<f64>, u: &DVector<f64>) -> f64 {
//!         x[0] * x[0] + u[0] * u[0]
//!     }
//!     fn terminal_cost(&self, x: &DVector<f64>) -> f64 {
//!         10.0 * x[0] * x[0]
//!     }
//!     # fn state_eq_deriv(
//!     #     &self,
//!     #     _x: &DVector<f64>,
//!     #     _u: &DVector<f64>,
//!     #     fx: &mut DMatrix<f64>,
//!     #     fu: &mut DMatrix<f64>,
//!     # ) {
//!     #     fx[(0, 0)] = 0.9;
//!     #     fu[(0, 0)] = 1.0;
//!     # }
//!     # fn running_cost_deriv(
//!     #     &self,
//!     #     x: &DVector<f64>,
//!     #     u: &DVector<f64>,
//!     #     lx: &mut DVector<f64>,
//!     #     lu: &mut DVector<f64>,
//!     #     lxx: &mut DMatrix<f64>,
//!     #     luu: &mut DMatrix<f64>,
//!     #     lxu: &mut DMatrix<f64>,
//!     # ) {
//!     #     lx[0] = 2.0 * x[0];
//!     #     lu[0] = 2.0 * u[0];
//!     #     lxx[(0, 0)] = 2.0;
//!     #     luu[(0, 0)] = 2.0;
//!     #     lxu[(0, 0)] = 0.0;
//!     # }
//!     # fn terminal_cost_deriv(
//!     #     &self,
//!     #     x: &DVector<f64>,
//!     #     vx: &mut DVector<f64>,
//!     #     vxx: &mut DMatrix<f64>,
//!     # ) {
//!     #     vx[0] = 20.0 * x[0];
//!     #     vxx[(0, 0)] = 20.0;
//!     # }
//!     // ... derivative methods fill solver-owned buffers ...
//! }
//!
//! let config = DdpConfig {
//!     horizon_steps: 30,
//!     verbose_print: false,
//!     ..DdpConfig::default()
//! };
//! let mut solver = DdpSolver::new(config, Regulator);
//!
//! let x0 = DVector::from_element(1, 1.0);
//! let seed = vec![DVector::zeros(1); 30];
//! let solution = solver.solve(&x0, &seed).unwrap();
//!
//! assert!(solution.converged);
//! assert!(solution.cost < solution.trace[0].cost);
//! ```
//!
//! # References
//!
//! - Y. Tassa, T. Erez, E. Todorov. Synthesis and stabilization of complex
//!   behaviors through online trajectory optimization. IROS 2012.
//! - Y. Tassa, N. Mansard, E. Todorov. Control-limited differential dynamic
//!   programming. ICRA 2014.

pub mod config;
pub mod error;
pub mod problem;
pub mod regularization;
pub mod solver;
pub mod types;

pub use config::{geometric_alpha_list, DdpConfig, RegType};
pub use error::DdpError;
pub use problem::DdpProblem;
pub use regularization::Regularization;
pub use solver::DdpSolver;
pub use types::{DdpSolution, StageDerivatives, Termination, TraceEntry};

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::{DdpConfig, RegType};
    pub use crate::error::DdpError;
    pub use crate::problem::DdpProblem;
    pub use crate::solver::DdpSolver;
    pub use crate::types::{DdpSolution, Termination, TraceEntry};
}
