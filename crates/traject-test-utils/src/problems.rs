//! Optimal-control problem fixtures.
//!
//! Each fixture implements [`DdpProblem`] with hand-written derivatives.
//! The finite-difference tests at the bottom keep the analytic derivatives
//! honest.

use nalgebra::{DMatrix, DVector};
use traject_ddp::DdpProblem;

// ---------------------------------------------------------------------------
// ScalarLqr
// ---------------------------------------------------------------------------

/// Scalar linear-quadratic regulator: `x' = a x + b u`,
/// `l = q x^2 + r u^2`, `phi = qf x^2`.
///
/// Has a closed-form optimum via the discrete Riccati recursion
/// (see [`scalar_lqr_gains`](crate::riccati::scalar_lqr_gains)).
#[derive(Debug, Clone)]
pub struct ScalarLqr {
    /// State transition coefficient.
    pub a: f64,
    /// Input coefficient.
    pub b: f64,
    /// Running state cost weight.
    pub q: f64,
    /// Running input cost weight.
    pub r: f64,
    /// Terminal state cost weight.
    pub qf: f64,
}

impl Default for ScalarLqr {
    fn default() -> Self {
        Self {
            a: 0.9,
            b: 1.0,
            q: 1.0,
            r: 1.0,
            qf: 10.0,
        }
    }
}

impl DdpProblem for ScalarLqr {
    fn state_dim(&self) -> usize {
        1
    }

    fn input_dim(&self) -> usize {
        1
    }

    fn state_eq(&self, x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64> {
        DVector::from_element(1, self.a * x[0] + self.b * u[0])
    }

    fn running_cost(&self, x: &DVector<f64>, u: &DVector<f64>) -> f64 {
        self.q * x[0] * x[0] + self.r * u[0] * u[0]
    }

    fn terminal_cost(&self, x: &DVector<f64>) -> f64 {
        self.qf * x[0] * x[0]
    }

    fn state_eq_deriv(
        &self,
        _x: &DVector<f64>,
        _u: &DVector<f64>,
        fx: &mut DMatrix<f64>,
        fu: &mut DMatrix<f64>,
    ) {
        fx[(0, 0)] = self.a;
        fu[(0, 0)] = self.b;
    }

    fn running_cost_deriv(
        &self,
        x: &DVector<f64>,
        u: &DVector<f64>,
        lx: &mut DVector<f64>,
        lu: &mut DVector<f64>,
        lxx: &mut DMatrix<f64>,
        luu: &mut DMatrix<f64>,
        lxu: &mut DMatrix<f64>,
    ) {
        lx[0] = 2.0 * self.q * x[0];
        lu[0] = 2.0 * self.r * u[0];
        lxx[(0, 0)] = 2.0 * self.q;
        luu[(0, 0)] = 2.0 * self.r;
        lxu[(0, 0)] = 0.0;
    }

    fn terminal_cost_deriv(&self, x: &DVector<f64>, vx: &mut DVector<f64>, vxx: &mut DMatrix<f64>) {
        vx[0] = 2.0 * self.qf * x[0];
        vxx[(0, 0)] = 2.0 * self.qf;
    }

    fn name(&self) -> &str {
        "scalar_lqr"
    }
}

// ---------------------------------------------------------------------------
// DoubleIntegrator
// ---------------------------------------------------------------------------

/// Double integrator with Euler discretization:
/// `x1' = x1 + dt x2`, `x2' = x2 + dt u`,
/// `l = q1 x1^2 + q2 x2^2 + r u^2`, `phi = qf (x1^2 + x2^2)`.
#[derive(Debug, Clone)]
pub struct DoubleIntegrator {
    /// Timestep in seconds.
    pub dt: f64,
    /// Running cost weight on position.
    pub q1: f64,
    /// Running cost weight on velocity.
    pub q2: f64,
    /// Running cost weight on input.
    pub r: f64,
    /// Terminal cost weight on both states.
    pub qf: f64,
}

impl Default for DoubleIntegrator {
    fn default() -> Self {
        Self {
            dt: 0.05,
            q1: 1.0,
            q2: 0.1,
            r: 0.01,
            qf: 100.0,
        }
    }
}

impl DdpProblem for DoubleIntegrator {
    fn state_dim(&self) -> usize {
        2
    }

    fn input_dim(&self) -> usize {
        1
    }

    fn state_eq(&self, x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64> {
        DVector::from_vec(vec![x[0] + self.dt * x[1], x[1] + self.dt * u[0]])
    }

    fn running_cost(&self, x: &DVector<f64>, u: &DVector<f64>) -> f64 {
        self.q1 * x[0] * x[0] + self.q2 * x[1] * x[1] + self.r * u[0] * u[0]
    }

    fn terminal_cost(&self, x: &DVector<f64>) -> f64 {
        self.qf * (x[0] * x[0] + x[1] * x[1])
    }

    fn state_eq_deriv(
        &self,
        _x: &DVector<f64>,
        _u: &DVector<f64>,
        fx: &mut DMatrix<f64>,
        fu: &mut DMatrix<f64>,
    ) {
        fx[(0, 0)] = 1.0;
        fx[(0, 1)] = self.dt;
        fx[(1, 0)] = 0.0;
        fx[(1, 1)] = 1.0;
        fu[(0, 0)] = 0.0;
        fu[(1, 0)] = self.dt;
    }

    fn running_cost_deriv(
        &self,
        x: &DVector<f64>,
        u: &DVector<f64>,
        lx: &mut DVector<f64>,
        lu: &mut DVector<f64>,
        lxx: &mut DMatrix<f64>,
        luu: &mut DMatrix<f64>,
        lxu: &mut DMatrix<f64>,
    ) {
        lx[0] = 2.0 * self.q1 * x[0];
        lx[1] = 2.0 * self.q2 * x[1];
        lu[0] = 2.0 * self.r * u[0];
        lxx.fill(0.0);
        lxx[(0, 0)] = 2.0 * self.q1;
        lxx[(1, 1)] = 2.0 * self.q2;
        luu[(0, 0)] = 2.0 * self.r;
        lxu.fill(0.0);
    }

    fn terminal_cost_deriv(&self, x: &DVector<f64>, vx: &mut DVector<f64>, vxx: &mut DMatrix<f64>) {
        vx[0] = 2.0 * self.qf * x[0];
        vx[1] = 2.0 * self.qf * x[1];
        vxx.fill(0.0);
        vxx[(0, 0)] = 2.0 * self.qf;
        vxx[(1, 1)] = 2.0 * self.qf;
    }

    fn name(&self) -> &str {
        "double_integrator"
    }
}

// ---------------------------------------------------------------------------
// Pendulum
// ---------------------------------------------------------------------------

/// Torque-driven pendulum, angle measured from the upright equilibrium:
///
/// ```text
/// theta' = theta + dt * omega
/// omega' = omega + dt * ((g / l) sin(theta) + u / (m l^2))
/// ```
///
/// Quadratic cost about the upright. The swing-up from the hanging state
/// `(pi, 0)` is non-convex, which makes this the fixture of choice for
/// exercising regularization and the second-order dynamics terms — the
/// dynamics Hessian is non-zero and supplied exactly.
#[derive(Debug, Clone)]
pub struct Pendulum {
    /// Timestep in seconds.
    pub dt: f64,
    /// Gravitational acceleration (m/s^2).
    pub gravity: f64,
    /// Rod length (m).
    pub length: f64,
    /// Point mass (kg).
    pub mass: f64,
    /// Running cost weight on angle.
    pub w_angle: f64,
    /// Running cost weight on angular rate.
    pub w_rate: f64,
    /// Running cost weight on torque.
    pub r_torque: f64,
    /// Terminal cost weight on angle.
    pub wf_angle: f64,
    /// Terminal cost weight on angular rate.
    pub wf_rate: f64,
}

impl Default for Pendulum {
    fn default() -> Self {
        Self {
            dt: 0.05,
            gravity: 9.81,
            length: 1.0,
            mass: 1.0,
            w_angle: 1.0,
            w_rate: 0.1,
            r_torque: 0.01,
            wf_angle: 10.0,
            wf_rate: 1.0,
        }
    }
}

impl Pendulum {
    fn angular_gain(&self) -> f64 {
        self.gravity / self.length
    }

    fn torque_gain(&self) -> f64 {
        1.0 / (self.mass * self.length * self.length)
    }
}

impl DdpProblem for Pendulum {
    fn state_dim(&self) -> usize {
        2
    }

    fn input_dim(&self) -> usize {
        1
    }

    fn state_eq(&self, x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64> {
        let accel = self.angular_gain() * x[0].sin() + self.torque_gain() * u[0];
        DVector::from_vec(vec![x[0] + self.dt * x[1], x[1] + self.dt * accel])
    }

    fn running_cost(&self, x: &DVector<f64>, u: &DVector<f64>) -> f64 {
        self.w_angle * x[0] * x[0] + self.w_rate * x[1] * x[1] + self.r_torque * u[0] * u[0]
    }

    fn terminal_cost(&self, x: &DVector<f64>) -> f64 {
        self.wf_angle * x[0] * x[0] + self.wf_rate * x[1] * x[1]
    }

    fn state_eq_deriv(
        &self,
        x: &DVector<f64>,
        _u: &DVector<f64>,
        fx: &mut DMatrix<f64>,
        fu: &mut DMatrix<f64>,
    ) {
        fx[(0, 0)] = 1.0;
        fx[(0, 1)] = self.dt;
        fx[(1, 0)] = self.dt * self.angular_gain() * x[0].cos();
        fx[(1, 1)] = 1.0;
        fu[(0, 0)] = 0.0;
        fu[(1, 0)] = self.dt * self.torque_gain();
    }

    fn state_eq_second_deriv(
        &self,
        x: &DVector<f64>,
        _u: &DVector<f64>,
        fxx: &mut [DMatrix<f64>],
        fuu: &mut [DMatrix<f64>],
        fxu: &mut [DMatrix<f64>],
    ) {
        for slice in fxx.iter_mut() {
            slice.fill(0.0);
        }
        for slice in fuu.iter_mut() {
            slice.fill(0.0);
        }
        for slice in fxu.iter_mut() {
            slice.fill(0.0);
        }
        // Only the angular acceleration row has curvature:
        // d^2 f2 / d theta^2 = -dt (g / l) sin(theta).
        fxx[1][(0, 0)] = -self.dt * self.angular_gain() * x[0].sin();
    }

    fn running_cost_deriv(
        &self,
        x: &DVector<f64>,
        u: &DVector<f64>,
        lx: &mut DVector<f64>,
        lu: &mut DVector<f64>,
        lxx: &mut DMatrix<f64>,
        luu: &mut DMatrix<f64>,
        lxu: &mut DMatrix<f64>,
    ) {
        lx[0] = 2.0 * self.w_angle * x[0];
        lx[1] = 2.0 * self.w_rate * x[1];
        lu[0] = 2.0 * self.r_torque * u[0];
        lxx.fill(0.0);
        lxx[(0, 0)] = 2.0 * self.w_angle;
        lxx[(1, 1)] = 2.0 * self.w_rate;
        luu[(0, 0)] = 2.0 * self.r_torque;
        lxu.fill(0.0);
    }

    fn terminal_cost_deriv(&self, x: &DVector<f64>, vx: &mut DVector<f64>, vxx: &mut DMatrix<f64>) {
        vx[0] = 2.0 * self.wf_angle * x[0];
        vx[1] = 2.0 * self.wf_rate * x[1];
        vxx.fill(0.0);
        vxx[(0, 0)] = 2.0 * self.wf_angle;
        vxx[(1, 1)] = 2.0 * self.wf_rate;
    }

    fn name(&self) -> &str {
        "pendulum"
    }
}

// ---------------------------------------------------------------------------
// ZeroCost
// ---------------------------------------------------------------------------

/// Single integrator with identically zero cost. Any trajectory is optimal;
/// the solver should accept a zero-change step immediately and terminate on
/// the cost-update threshold.
#[derive(Debug, Clone, Default)]
pub struct ZeroCost;

impl DdpProblem for ZeroCost {
    fn state_dim(&self) -> usize {
        1
    }

    fn input_dim(&self) -> usize {
        1
    }

    fn state_eq(&self, x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64> {
        DVector::from_element(1, x[0] + u[0])
    }

    fn running_cost(&self, _x: &DVector<f64>, _u: &DVector<f64>) -> f64 {
        0.0
    }

    fn terminal_cost(&self, _x: &DVector<f64>) -> f64 {
        0.0
    }

    fn state_eq_deriv(
        &self,
        _x: &DVector<f64>,
        _u: &DVector<f64>,
        fx: &mut DMatrix<f64>,
        fu: &mut DMatrix<f64>,
    ) {
        fx[(0, 0)] = 1.0;
        fu[(0, 0)] = 1.0;
    }

    fn running_cost_deriv(
        &self,
        _x: &DVector<f64>,
        _u: &DVector<f64>,
        lx: &mut DVector<f64>,
        lu: &mut DVector<f64>,
        lxx: &mut DMatrix<f64>,
        luu: &mut DMatrix<f64>,
        lxu: &mut DMatrix<f64>,
    ) {
        lx[0] = 0.0;
        lu[0] = 0.0;
        lxx[(0, 0)] = 0.0;
        luu[(0, 0)] = 0.0;
        lxu[(0, 0)] = 0.0;
    }

    fn terminal_cost_deriv(
        &self,
        _x: &DVector<f64>,
        vx: &mut DVector<f64>,
        vxx: &mut DMatrix<f64>,
    ) {
        vx[0] = 0.0;
        vxx[(0, 0)] = 0.0;
    }

    fn name(&self) -> &str {
        "zero_cost"
    }
}

// ---------------------------------------------------------------------------
// NegativeCurvature
// ---------------------------------------------------------------------------

/// Single integrator whose running cost is concave in the input
/// (`l = x^2 - u^2`, `phi = 0`), so the input-space Hessian of the stage
/// model is negative at every point. The backward pass can only succeed once
/// `lambda` exceeds that curvature, which makes regularization growth — and,
/// with a lowered `lambda_max`, overflow — fully deterministic.
#[derive(Debug, Clone, Default)]
pub struct NegativeCurvature;

impl DdpProblem for NegativeCurvature {
    fn state_dim(&self) -> usize {
        1
    }

    fn input_dim(&self) -> usize {
        1
    }

    fn state_eq(&self, x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64> {
        DVector::from_element(1, x[0] + u[0])
    }

    fn running_cost(&self, x: &DVector<f64>, u: &DVector<f64>) -> f64 {
        x[0] * x[0] - u[0] * u[0]
    }

    fn terminal_cost(&self, _x: &DVector<f64>) -> f64 {
        0.0
    }

    fn state_eq_deriv(
        &self,
        _x: &DVector<f64>,
        _u: &DVector<f64>,
        fx: &mut DMatrix<f64>,
        fu: &mut DMatrix<f64>,
    ) {
        fx[(0, 0)] = 1.0;
        fu[(0, 0)] = 1.0;
    }

    fn running_cost_deriv(
        &self,
        x: &DVector<f64>,
        u: &DVector<f64>,
        lx: &mut DVector<f64>,
        lu: &mut DVector<f64>,
        lxx: &mut DMatrix<f64>,
        luu: &mut DMatrix<f64>,
        lxu: &mut DMatrix<f64>,
    ) {
        lx[0] = 2.0 * x[0];
        lu[0] = -2.0 * u[0];
        lxx[(0, 0)] = 2.0;
        luu[(0, 0)] = -2.0;
        lxu[(0, 0)] = 0.0;
    }

    fn terminal_cost_deriv(
        &self,
        _x: &DVector<f64>,
        vx: &mut DVector<f64>,
        vxx: &mut DMatrix<f64>,
    ) {
        vx[0] = 0.0;
        vxx[(0, 0)] = 0.0;
    }

    fn name(&self) -> &str {
        "negative_curvature"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPS: f64 = 1e-6;

    /// Check `fx`/`fu` against central finite differences of `state_eq`.
    fn check_first_order(problem: &dyn DdpProblem, x: &DVector<f64>, u: &DVector<f64>) {
        let n = problem.state_dim();
        let m = problem.input_dim();
        let mut fx = DMatrix::zeros(n, n);
        let mut fu = DMatrix::zeros(n, m);
        problem.state_eq_deriv(x, u, &mut fx, &mut fu);

        for j in 0..n {
            let mut hi = x.clone();
            let mut lo = x.clone();
            hi[j] += EPS;
            lo[j] -= EPS;
            let diff = (problem.state_eq(&hi, u) - problem.state_eq(&lo, u)) / (2.0 * EPS);
            for i in 0..n {
                assert_relative_eq!(fx[(i, j)], diff[i], epsilon = 1e-6);
            }
        }
        for j in 0..m {
            let mut hi = u.clone();
            let mut lo = u.clone();
            hi[j] += EPS;
            lo[j] -= EPS;
            let diff = (problem.state_eq(x, &hi) - problem.state_eq(x, &lo)) / (2.0 * EPS);
            for i in 0..n {
                assert_relative_eq!(fu[(i, j)], diff[i], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn scalar_lqr_first_order_matches_finite_difference() {
        let problem = ScalarLqr::default();
        check_first_order(
            &problem,
            &DVector::from_element(1, 0.8),
            &DVector::from_element(1, -0.3),
        );
    }

    #[test]
    fn double_integrator_first_order_matches_finite_difference() {
        let problem = DoubleIntegrator::default();
        check_first_order(
            &problem,
            &DVector::from_vec(vec![1.0, -0.5]),
            &DVector::from_element(1, 2.0),
        );
    }

    #[test]
    fn pendulum_first_order_matches_finite_difference() {
        let problem = Pendulum::default();
        check_first_order(
            &problem,
            &DVector::from_vec(vec![2.2, 0.4]),
            &DVector::from_element(1, -1.5),
        );
    }

    #[test]
    fn pendulum_second_order_matches_finite_difference_of_jacobian() {
        let problem = Pendulum::default();
        let x = DVector::from_vec(vec![1.3, -0.7]);
        let u = DVector::from_element(1, 0.5);

        let mut fxx = vec![DMatrix::zeros(2, 2); 2];
        let mut fuu = vec![DMatrix::zeros(1, 1); 2];
        let mut fxu = vec![DMatrix::zeros(2, 1); 2];
        problem.state_eq_second_deriv(&x, &u, &mut fxx, &mut fuu, &mut fxu);

        // d fx / d theta via central differences.
        let mut fx_hi = DMatrix::zeros(2, 2);
        let mut fx_lo = DMatrix::zeros(2, 2);
        let mut fu_scratch = DMatrix::zeros(2, 1);
        let mut hi = x.clone();
        let mut lo = x.clone();
        hi[0] += EPS;
        lo[0] -= EPS;
        problem.state_eq_deriv(&hi, &u, &mut fx_hi, &mut fu_scratch);
        problem.state_eq_deriv(&lo, &u, &mut fx_lo, &mut fu_scratch);
        let dfx = (fx_hi - fx_lo) / (2.0 * EPS);

        // Slice i holds the Hessian of state component i; entry (0, 0) is
        // d^2 f_i / d theta^2 = d (fx[(i, 0)]) / d theta.
        assert_relative_eq!(fxx[0][(0, 0)], dfx[(0, 0)], epsilon = 1e-5);
        assert_relative_eq!(fxx[1][(0, 0)], dfx[(1, 0)], epsilon = 1e-5);
        assert_eq!(fuu[0][(0, 0)], 0.0);
        assert_eq!(fxu[1][(0, 0)], 0.0);
    }

    #[test]
    fn pendulum_upright_is_cost_free() {
        let problem = Pendulum::default();
        let upright = DVector::zeros(2);
        let no_torque = DVector::zeros(1);
        assert_eq!(problem.running_cost(&upright, &no_torque), 0.0);
        assert_eq!(problem.terminal_cost(&upright), 0.0);

        // Upright is an equilibrium of the dynamics.
        let next = problem.state_eq(&upright, &no_torque);
        assert_eq!(next[0], 0.0);
        assert_eq!(next[1], 0.0);
    }

    #[test]
    fn negative_curvature_hessian_is_concave_in_input() {
        let problem = NegativeCurvature;
        let x = DVector::from_element(1, 1.0);
        let u = DVector::from_element(1, 0.5);
        let mut lx = DVector::zeros(1);
        let mut lu = DVector::zeros(1);
        let mut lxx = DMatrix::zeros(1, 1);
        let mut luu = DMatrix::zeros(1, 1);
        let mut lxu = DMatrix::zeros(1, 1);
        problem.running_cost_deriv(&x, &u, &mut lx, &mut lu, &mut lxx, &mut luu, &mut lxu);
        assert!(luu[(0, 0)] < 0.0);
    }
}
