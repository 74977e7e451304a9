//! Optimal-control problem description.
//!
//! [`DdpProblem`] is the sole boundary through which the solver queries its
//! environment: discrete dynamics, running and terminal costs, and their
//! derivatives. Any integrator, body model, or learned dynamics sits behind
//! this trait.

use nalgebra::{DMatrix, DVector};

/// A finite-horizon discrete-time optimal control problem.
///
/// The solver minimizes the total cost
///
/// ```text
/// J = sum_{t=0}^{N-1} l(x[t], u[t]) + phi(x[N])
/// ```
///
/// subject to `x[t+1] = f(x[t], u[t])`.
///
/// Derivative methods write into solver-owned buffers that are pre-sized to
/// `state_dim` / `input_dim`, so evaluation allocates nothing. Every entry of
/// every output buffer must be written on each call; the solver does not
/// clear buffers between iterations. Derivatives must be consistent with the
/// finite-difference limit of the corresponding function — the solver does
/// not verify this, but its convergence depends on it.
///
/// `state_dim` and `input_dim` must be constant through a solve.
pub trait DdpProblem: Send + Sync + 'static {
    /// State dimension `n`.
    fn state_dim(&self) -> usize;

    /// Input dimension `m`.
    fn input_dim(&self) -> usize;

    /// Discrete state equation: next state `x[t+1] = f(x[t], u[t])`.
    ///
    /// Must be deterministic and total over the domain visited by the solve.
    fn state_eq(&self, x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64>;

    /// Running cost `l(x, u)`.
    fn running_cost(&self, x: &DVector<f64>, u: &DVector<f64>) -> f64;

    /// Terminal cost `phi(x)`.
    fn terminal_cost(&self, x: &DVector<f64>) -> f64;

    /// First-order derivatives of the state equation.
    ///
    /// `fx` is `n x n`, `fu` is `n x m`.
    fn state_eq_deriv(
        &self,
        x: &DVector<f64>,
        u: &DVector<f64>,
        fx: &mut DMatrix<f64>,
        fu: &mut DMatrix<f64>,
    );

    /// Second-order derivatives of the state equation, as rank-3 tensors
    /// stored slice-wise: `fxx[i]`, `fuu[i]`, `fxu[i]` hold the Hessian of
    /// the i-th state component (`n x n`, `m x m`, and `n x m` respectively,
    /// one slice per state component).
    ///
    /// Only called when
    /// [`use_state_eq_second_derivative`](crate::config::DdpConfig::use_state_eq_second_derivative)
    /// is set. The default body leaves the slices untouched; problems that
    /// enable the flag must override this and write every slice in full.
    fn state_eq_second_deriv(
        &self,
        x: &DVector<f64>,
        u: &DVector<f64>,
        fxx: &mut [DMatrix<f64>],
        fuu: &mut [DMatrix<f64>],
        fxu: &mut [DMatrix<f64>],
    ) {
        let _ = (x, u, fxx, fuu, fxu);
    }

    /// First- and second-order derivatives of the running cost.
    ///
    /// `lx` is `n`, `lu` is `m`, `lxx` is `n x n`, `luu` is `m x m`,
    /// `lxu` is `n x m`.
    #[allow(clippy::too_many_arguments)]
    fn running_cost_deriv(
        &self,
        x: &DVector<f64>,
        u: &DVector<f64>,
        lx: &mut DVector<f64>,
        lu: &mut DVector<f64>,
        lxx: &mut DMatrix<f64>,
        luu: &mut DMatrix<f64>,
        lxu: &mut DMatrix<f64>,
    );

    /// First- and second-order derivatives of the terminal cost.
    ///
    /// `vx` is `n`, `vxx` is `n x n`.
    fn terminal_cost_deriv(&self, x: &DVector<f64>, vx: &mut DVector<f64>, vxx: &mut DMatrix<f64>);

    /// Human-readable name for this problem.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
