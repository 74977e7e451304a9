//! Finite-horizon discrete Riccati reference solution.
//!
//! For the scalar plant `x' = a x + b u` with stage cost `q x^2 + r u^2`
//! and terminal cost `qf x^2`, the optimal feedback is `u[t] = K[t] x[t]`
//! with gains given by the backward recursion below. Linear-quadratic
//! fixtures use this as the ground truth for the solver's feedback gains.

/// Gain sequence `K[0..horizon]` of the scalar finite-horizon LQR.
pub fn scalar_lqr_gains(a: f64, b: f64, q: f64, r: f64, qf: f64, horizon: usize) -> Vec<f64> {
    let mut gains = vec![0.0; horizon];
    let mut p = qf;
    for t in (0..horizon).rev() {
        let denom = r + b * b * p;
        gains[t] = -(a * b * p) / denom;
        p = q + a * a * p - (a * b * p) * (a * b * p) / denom;
    }
    gains
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
