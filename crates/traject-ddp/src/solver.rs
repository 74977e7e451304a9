//! DDP solver: backward Bellman recursion with adaptive regularization and
//! an Armijo-style forward line search.
//!
//! Each outer iteration runs the pipeline
//!
//! ```text
//! derivatives -> backward pass -> line search over alpha -> accept/reject
//! ```
//!
//! The backward pass rolls a quadratic model of the value function from the
//! end of the horizon to the start, producing a feedforward correction `k[t]`
//! and a feedback gain `K[t]` per stage. The forward pass rolls the corrected
//! policy `u[t] + alpha * k[t] + K[t] * (x~[t] - x[t])` out from the initial
//! state into candidate buffers, which are committed only when the achieved
//! cost decrease passes the acceptance ratio test.
//!
//! See the following for the detailed algorithm:
//! - Y. Tassa, T. Erez, E. Todorov. Synthesis and stabilization of complex
//!   behaviors through online trajectory optimization. IROS 2012.
//! - Y. Tassa, N. Mansard, E. Todorov. Control-limited differential dynamic
//!   programming. ICRA 2014.

use std::time::Instant;

use nalgebra::{Cholesky, DMatrix, DVector, Vector2};
use tracing::{info, warn};

use crate::config::{DdpConfig, RegType};
use crate::error::DdpError;
use crate::problem::DdpProblem;
use crate::regularization::Regularization;
use crate::types::{DdpSolution, StageDerivatives, Termination, TraceEntry};

// ---------------------------------------------------------------------------
// DdpSolver
// ---------------------------------------------------------------------------

/// Differential Dynamic Programming solver.
///
/// Owns all working memory for a solve: trajectory and candidate buffers,
/// per-stage gains, the derivatives cache, and the value model. Buffers are
/// sized once at construction from the configuration and the problem's
/// dimensions and reused across iterations and across repeated calls to
/// [`solve`](Self::solve).
pub struct DdpSolver<P: DdpProblem> {
    config: DdpConfig,
    problem: P,
    reg: Regularization,

    // Committed trajectory: x[0..=N], u[0..N], per-stage costs.
    states: Vec<DVector<f64>>,
    inputs: Vec<DVector<f64>>,
    stage_costs: DVector<f64>,

    // Candidate buffers for the tentative rollout, committed on acceptance.
    states_cand: Vec<DVector<f64>>,
    inputs_cand: Vec<DVector<f64>>,
    stage_costs_cand: DVector<f64>,

    // Policy correction from the most recent backward pass.
    feedforward: Vec<DVector<f64>>,
    feedback: Vec<DMatrix<f64>>,

    // Derivatives cache, refreshed in full each iteration.
    derivs: Vec<StageDerivatives>,

    // Value model rolled back through the horizon.
    vx: DVector<f64>,
    vxx: DMatrix<f64>,

    // Expected descent: dv[0] first-order, dv[1] second-order component.
    dv: Vector2<f64>,

    trace: Vec<TraceEntry>,
}

/// What the driver should do after one iteration.
enum StepOutcome {
    Continue,
    Terminate(Termination),
}

/// Accepted line-search step.
struct LineSearch {
    alpha: f64,
    cost: f64,
    actual: f64,
    expected: f64,
    ratio: f64,
}

impl<P: DdpProblem> DdpSolver<P> {
    /// Create a solver for `problem`, allocating all working buffers for the
    /// configured horizon.
    pub fn new(config: DdpConfig, problem: P) -> Self {
        let n = config.horizon_steps;
        let state_dim = problem.state_dim();
        let input_dim = problem.input_dim();
        let second_order = config.use_state_eq_second_derivative;

        Self {
            reg: Regularization::new(config.initial_lambda, config.initial_dlambda),
            states: vec![DVector::zeros(state_dim); n + 1],
            inputs: vec![DVector::zeros(input_dim); n],
            stage_costs: DVector::zeros(n + 1),
            states_cand: vec![DVector::zeros(state_dim); n + 1],
            inputs_cand: vec![DVector::zeros(input_dim); n],
            stage_costs_cand: DVector::zeros(n + 1),
            feedforward: vec![DVector::zeros(input_dim); n],
            feedback: vec![DMatrix::zeros(input_dim, state_dim); n],
            derivs: (0..n)
                .map(|_| StageDerivatives::new(state_dim, input_dim, second_order))
                .collect(),
            vx: DVector::zeros(state_dim),
            vxx: DMatrix::zeros(state_dim, state_dim),
            dv: Vector2::zeros(),
            trace: Vec::new(),
            config,
            problem,
        }
    }

    /// Access the solver configuration.
    pub const fn config(&self) -> &DdpConfig {
        &self.config
    }

    /// Access the problem.
    pub const fn problem(&self) -> &P {
        &self.problem
    }

    /// Trace of the most recent solve.
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// Solve the optimal control problem from `current_x` with the seed
    /// input sequence `initial_u` (one entry per horizon step).
    ///
    /// Returns `Err` only for ill-posed inputs; numerical failure
    /// (regularization overflow) is reported through
    /// [`DdpSolution::converged`] and the termination cause, with the trace
    /// preserved.
    pub fn solve(
        &mut self,
        current_x: &DVector<f64>,
        initial_u: &[DVector<f64>],
    ) -> Result<DdpSolution, DdpError> {
        self.config.validate()?;
        let n = self.config.horizon_steps;
        let state_dim = self.problem.state_dim();
        let input_dim = self.problem.input_dim();

        if state_dim == 0 || input_dim == 0 {
            return Err(DdpError::ZeroDimension);
        }
        if current_x.len() != state_dim {
            return Err(DdpError::DimensionMismatch {
                what: "initial state",
                expected: state_dim,
                got: current_x.len(),
            });
        }
        if initial_u.len() != n {
            return Err(DdpError::DimensionMismatch {
                what: "initial input sequence",
                expected: n,
                got: initial_u.len(),
            });
        }
        for u in initial_u {
            if u.len() != input_dim {
                return Err(DdpError::DimensionMismatch {
                    what: "initial input",
                    expected: input_dim,
                    got: u.len(),
                });
            }
        }

        self.reg = Regularization::new(self.config.initial_lambda, self.config.initial_dlambda);
        self.trace.clear();
        self.states[0].copy_from(current_x);
        for (dst, src) in self.inputs.iter_mut().zip(initial_u) {
            dst.copy_from(src);
        }

        let cost = self.rollout_nominal()?;
        self.trace.push(TraceEntry {
            iter: 0,
            cost,
            lambda: self.reg.lambda(),
            dlambda: self.reg.dlambda(),
            ..TraceEntry::default()
        });
        if self.config.verbose_print {
            info!(
                cost,
                horizon = n,
                problem = self.problem.name(),
                "Starting DDP solve"
            );
        }

        let mut termination = Termination::MaxIterations;
        let mut iterations = self.config.max_iter;
        for iter in 1..=self.config.max_iter {
            if let StepOutcome::Terminate(cause) = self.iterate(iter) {
                termination = cause;
                iterations = iter;
                break;
            }
        }

        let final_cost = self.stage_costs.sum();
        if self.config.verbose_print {
            info!(
                iterations,
                cost = final_cost,
                termination = ?termination,
                "DDP solve finished"
            );
        }

        Ok(DdpSolution {
            states: self.states.clone(),
            inputs: self.inputs.clone(),
            feedforward: self.feedforward.clone(),
            feedback: self.feedback.clone(),
            stage_costs: self.stage_costs.clone(),
            cost: final_cost,
            converged: termination.is_success(),
            termination,
            iterations,
            trace: self.trace.clone(),
        })
    }

    /// One outer iteration: derivatives, backward pass, line search, and the
    /// accept/reject bookkeeping.
    fn iterate(&mut self, iter: usize) -> StepOutcome {
        let cost_prev = self.stage_costs.sum();
        let mut entry = TraceEntry {
            iter,
            cost: cost_prev,
            lambda: self.reg.lambda(),
            dlambda: self.reg.dlambda(),
            ..TraceEntry::default()
        };

        let started = Instant::now();
        self.compute_derivatives();
        entry.duration_derivative_us = elapsed_us(started);

        let started = Instant::now();
        let backward_ok = self.backward_pass();
        entry.duration_backward_us = elapsed_us(started);

        if !backward_ok {
            // No forward pass: raise lambda and re-enter the backward pass
            // on the next iteration.
            let within_bounds = self.reg.increase(&self.config);
            entry.lambda = self.reg.lambda();
            entry.dlambda = self.reg.dlambda();
            self.trace.push(entry);
            if !within_bounds {
                warn!(
                    lambda_max = self.config.lambda_max,
                    "Regularization exceeded maximum in backward pass; aborting"
                );
                return StepOutcome::Terminate(Termination::RegularizationOverflow);
            }
            if self.config.verbose_print {
                info!(
                    iter,
                    lambda = self.reg.lambda(),
                    "Indefinite Quu in backward pass; raising regularization"
                );
            }
            return StepOutcome::Continue;
        }

        // Small-gradient termination, checked before the line search: once
        // the correction is negligible and regularization is inactive, a
        // forward pass could only differ from the current trajectory by
        // round-off and no step would pass the ratio gate.
        let k_rel_norm = relative_feedforward_norm(&self.feedforward, &self.inputs);
        entry.k_rel_norm = k_rel_norm;
        if k_rel_norm < self.config.k_rel_norm_thre && self.reg.lambda() < self.config.lambda_thre
        {
            self.trace.push(entry);
            if self.config.verbose_print {
                info!(iter, k_rel_norm, "Feedforward correction negligible; converged");
            }
            return StepOutcome::Terminate(Termination::FeedforwardNorm);
        }

        let started = Instant::now();
        let search = self.line_search(cost_prev);
        entry.duration_forward_us = elapsed_us(started);

        let Some(step) = search else {
            let within_bounds = self.reg.increase(&self.config);
            entry.lambda = self.reg.lambda();
            entry.dlambda = self.reg.dlambda();
            self.trace.push(entry);
            if !within_bounds {
                warn!(
                    lambda_max = self.config.lambda_max,
                    "Regularization exceeded maximum in line search; aborting"
                );
                return StepOutcome::Terminate(Termination::RegularizationOverflow);
            }
            if self.config.verbose_print {
                info!(
                    iter,
                    lambda = self.reg.lambda(),
                    "No acceptable step; raising regularization"
                );
            }
            return StepOutcome::Continue;
        };

        // Accept: commit the candidate trajectory and relax regularization.
        self.commit_candidate();
        self.reg.decrease(&self.config);

        let k_rel_norm = relative_feedforward_norm(&self.feedforward, &self.inputs);
        entry.cost = step.cost;
        entry.lambda = self.reg.lambda();
        entry.dlambda = self.reg.dlambda();
        entry.alpha = step.alpha;
        entry.k_rel_norm = k_rel_norm;
        entry.cost_update_actual = step.actual;
        entry.cost_update_expected = step.expected;
        entry.cost_update_ratio = step.ratio;
        self.trace.push(entry);

        if self.config.verbose_print {
            info!(
                iter,
                cost = step.cost,
                alpha = step.alpha,
                lambda = self.reg.lambda(),
                "Iteration accepted"
            );
        }

        if k_rel_norm < self.config.k_rel_norm_thre && self.reg.lambda() < self.config.lambda_thre
        {
            return StepOutcome::Terminate(Termination::FeedforwardNorm);
        }
        if step.actual.abs() < self.config.cost_update_thre {
            return StepOutcome::Terminate(Termination::CostUpdate);
        }
        StepOutcome::Continue
    }

    /// Roll the committed inputs out from `states[0]`, filling the committed
    /// state and cost buffers.
    fn rollout_nominal(&mut self) -> Result<f64, DdpError> {
        let n = self.config.horizon_steps;
        for t in 0..n {
            self.stage_costs[t] = self
                .problem
                .running_cost(&self.states[t], &self.inputs[t]);
            let x_next = self.problem.state_eq(&self.states[t], &self.inputs[t]);
            self.states[t + 1].copy_from(&x_next);
        }
        self.stage_costs[n] = self.problem.terminal_cost(&self.states[n]);

        let cost = self.stage_costs.sum();
        if !cost.is_finite() {
            return Err(DdpError::DivergedRollout);
        }
        Ok(cost)
    }

    /// Refresh the derivatives cache at every stage of the committed
    /// trajectory.
    fn compute_derivatives(&mut self) {
        let use_second = self.config.use_state_eq_second_derivative;
        for t in 0..self.config.horizon_steps {
            let d = &mut self.derivs[t];
            self.problem
                .state_eq_deriv(&self.states[t], &self.inputs[t], &mut d.fx, &mut d.fu);
            if use_second {
                self.problem.state_eq_second_deriv(
                    &self.states[t],
                    &self.inputs[t],
                    &mut d.fxx,
                    &mut d.fuu,
                    &mut d.fxu,
                );
            }
            self.problem.running_cost_deriv(
                &self.states[t],
                &self.inputs[t],
                &mut d.lx,
                &mut d.lu,
                &mut d.lxx,
                &mut d.luu,
                &mut d.lxu,
            );
        }
    }

    /// Roll the value-function quadratic model back through the horizon,
    /// producing `feedforward[t]`, `feedback[t]`, and the expected descent.
    ///
    /// Returns `false` when the regularized `Quu` is not positive definite
    /// at some stage; the caller then raises `lambda` and retries.
    fn backward_pass(&mut self) -> bool {
        let n = self.config.horizon_steps;
        let state_dim = self.problem.state_dim();
        let input_dim = self.problem.input_dim();
        let lambda = self.reg.lambda();
        let use_second = self.config.use_state_eq_second_derivative;

        self.problem
            .terminal_cost_deriv(&self.states[n], &mut self.vx, &mut self.vxx);
        self.dv = Vector2::zeros();

        for t in (0..n).rev() {
            let d = &self.derivs[t];

            // Stage action-value quadratic model.
            let qx = &d.lx + d.fx.tr_mul(&self.vx);
            let qu = &d.lu + d.fu.tr_mul(&self.vx);
            let vxx_fx = &self.vxx * &d.fx;
            let vxx_fu = &self.vxx * &d.fu;
            let mut qxx = &d.lxx + d.fx.tr_mul(&vxx_fx);
            let mut quu = &d.luu + d.fu.tr_mul(&vxx_fu);
            let mut qxu = &d.lxu + d.fx.tr_mul(&vxx_fu);

            if use_second {
                // Contract the rank-3 dynamics tensors with the value
                // gradient: a weighted sum of slices.
                for i in 0..state_dim {
                    let w = self.vx[i];
                    qxx += &d.fxx[i] * w;
                    quu += &d.fuu[i] * w;
                    qxu += &d.fxu[i] * w;
                }
            }
            symmetrize(&mut qxx);
            symmetrize(&mut quu);

            // Regularized blocks used for the factorization and the gains;
            // the unregularized Quu feeds the value update and dV.
            let (quu_reg, qxu_reg) = match self.config.reg_type {
                RegType::Quu => {
                    let mut quu_reg = quu.clone();
                    for i in 0..input_dim {
                        quu_reg[(i, i)] += lambda;
                    }
                    (quu_reg, qxu.clone())
                }
                RegType::Vxx => {
                    let mut vxx_reg = self.vxx.clone();
                    for i in 0..state_dim {
                        vxx_reg[(i, i)] += lambda;
                    }
                    let vxx_reg_fu = &vxx_reg * &d.fu;
                    let mut quu_reg = &d.luu + d.fu.tr_mul(&vxx_reg_fu);
                    let mut qxu_reg = &d.lxu + d.fx.tr_mul(&vxx_reg_fu);
                    if use_second {
                        for i in 0..state_dim {
                            let w = self.vx[i];
                            quu_reg += &d.fuu[i] * w;
                            qxu_reg += &d.fxu[i] * w;
                        }
                    }
                    symmetrize(&mut quu_reg);
                    (quu_reg, qxu_reg)
                }
            };

            let Some(chol) = Cholesky::new(quu_reg) else {
                return false;
            };
            let k = -chol.solve(&qu);
            let kk = -chol.solve(&qxu_reg.transpose());

            self.dv[0] += k.dot(&qu);
            self.dv[1] += 0.5 * k.dot(&(&quu * &k));

            // Value model update, most-grouped form to limit round-off:
            // Vx = Qx + K^T (Quu k + Qu) + Qxu k.
            let quu_k_plus_qu = &quu * &k + &qu;
            let vx_new = &qx + kk.tr_mul(&quu_k_plus_qu) + &qxu * &k;

            let quu_kk = &quu * &kk;
            let qxu_kk = &qxu * &kk;
            let mut vxx_new = &qxx + kk.tr_mul(&quu_kk) + &qxu_kk + qxu_kk.transpose();
            symmetrize(&mut vxx_new);

            self.vx.copy_from(&vx_new);
            self.vxx.copy_from(&vxx_new);
            self.feedforward[t].copy_from(&k);
            self.feedback[t].copy_from(&kk);
        }
        true
    }

    /// Search the configured alpha schedule in order, returning the first
    /// step that passes the acceptance ratio test.
    fn line_search(&mut self, cost_prev: f64) -> Option<LineSearch> {
        for i in 0..self.config.alpha_list.len() {
            let alpha = self.config.alpha_list[i];
            let cost = self.forward_pass(alpha);
            if !cost.is_finite() {
                // Diverged rollout: reject this alpha and keep shrinking.
                continue;
            }
            let actual = cost_prev - cost;
            let expected = -(alpha * self.dv[0] + alpha * alpha * self.dv[1]);
            let ratio = if expected > 0.0 {
                actual / expected
            } else {
                // Degenerate model prediction: fall back to the sign of the
                // raw decrease (an exact zero counts as an improvement).
                actual.signum()
            };
            if ratio > self.config.cost_update_ratio_thre {
                return Some(LineSearch {
                    alpha,
                    cost,
                    actual,
                    expected,
                    ratio,
                });
            }
        }
        None
    }

    /// Roll the corrected policy out into the candidate buffers and return
    /// the candidate cost.
    fn forward_pass(&mut self, alpha: f64) -> f64 {
        let n = self.config.horizon_steps;
        self.states_cand[0].copy_from(&self.states[0]);
        for t in 0..n {
            let dx = &self.states_cand[t] - &self.states[t];
            let u_new =
                &self.inputs[t] + &self.feedforward[t] * alpha + &self.feedback[t] * dx;
            self.stage_costs_cand[t] = self.problem.running_cost(&self.states_cand[t], &u_new);
            let x_next = self.problem.state_eq(&self.states_cand[t], &u_new);
            self.states_cand[t + 1].copy_from(&x_next);
            self.inputs_cand[t].copy_from(&u_new);
        }
        self.stage_costs_cand[n] = self.problem.terminal_cost(&self.states_cand[n]);
        self.stage_costs_cand.sum()
    }

    /// Swap the candidate buffers into the committed trajectory.
    fn commit_candidate(&mut self) {
        std::mem::swap(&mut self.states, &mut self.states_cand);
        std::mem::swap(&mut self.inputs, &mut self.inputs_cand);
        std::mem::swap(&mut self.stage_costs, &mut self.stage_costs_cand);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Force exact symmetry: `m <- (m + m^T) / 2`.
fn symmetrize(mat: &mut DMatrix<f64>) {
    let transposed = mat.transpose();
    *mat += transposed;
    *mat *= 0.5;
}

/// Relative feedforward norm `max_t |k[t]| / (|u[t]| + 1)`.
fn relative_feedforward_norm(feedforward: &[DVector<f64>], inputs: &[DVector<f64>]) -> f64 {
    feedforward
        .iter()
        .zip(inputs)
        .map(|(k, u)| k.norm() / (u.norm() + 1.0))
        .fold(0.0, f64::max)
}

fn elapsed_us(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
