//! Convergence tests on linear-quadratic problems, where the optimum is
//! known in closed form.

use nalgebra::DVector;
use traject_ddp::prelude::*;
use traject_test_utils::{scalar_lqr_gains, DoubleIntegrator, ScalarLqr};

fn quiet_config(horizon: usize) -> DdpConfig {
    DdpConfig {
        verbose_print: false,
        horizon_steps: horizon,
        ..DdpConfig::default()
    }
}

fn zero_seed(input_dim: usize, horizon: usize) -> Vec<DVector<f64>> {
    vec![DVector::zeros(input_dim); horizon]
}

#[test]
fn scalar_lqr_feedback_matches_riccati() {
    let horizon = 50;
    let problem = ScalarLqr::default();
    let reference = scalar_lqr_gains(problem.a, problem.b, problem.q, problem.r, problem.qf, horizon);

    let mut solver = DdpSolver::new(quiet_config(horizon), problem);
    let x0 = DVector::from_element(1, 1.0);
    let solution = solver.solve(&x0, &zero_seed(1, horizon)).unwrap();

    assert!(solution.converged, "termination: {:?}", solution.termination);
    // Linear dynamics + quadratic cost: the quadratic model is exact, so the
    // solve settles almost immediately.
    assert!(
        solution.iterations <= 5,
        "took {} iterations on an exactly-quadratic problem",
        solution.iterations
    );

    for (t, expected) in reference.iter().enumerate() {
        let gain = solution.feedback[t][(0, 0)];
        assert!(
            (gain - expected).abs() < 1e-6,
            "gain mismatch at stage {t}: {gain} vs Riccati {expected}"
        );
    }
}

#[test]
fn scalar_lqr_converges_from_any_seed() {
    let horizon = 50;
    let mut solver = DdpSolver::new(quiet_config(horizon), ScalarLqr::default());
    let x0 = DVector::from_element(1, 1.0);

    let cold = solver
        .solve(&x0, &zero_seed(1, horizon))
        .unwrap();
    let biased = solver
        .solve(&x0, &vec![DVector::from_element(1, 5.0); horizon])
        .unwrap();

    assert!(cold.converged);
    assert!(biased.converged);
    assert!(
        (cold.cost - biased.cost).abs() < 1e-6,
        "seed changed the optimum: {} vs {}",
        cold.cost,
        biased.cost
    );
}

#[test]
fn double_integrator_drives_state_to_origin() {
    let horizon = 50;
    let mut solver = DdpSolver::new(quiet_config(horizon), DoubleIntegrator::default());
    let x0 = DVector::from_vec(vec![1.0, 0.0]);
    let solution = solver.solve(&x0, &zero_seed(1, horizon)).unwrap();

    assert!(solution.converged);
    assert!(
        solution.iterations <= 20,
        "took {} iterations",
        solution.iterations
    );

    let terminal = &solution.states[horizon];
    assert!(
        terminal.norm() < 1e-2,
        "terminal state too far from origin: {terminal}"
    );

    let last = solution.trace.last().unwrap();
    assert!(
        last.k_rel_norm < 1e-4,
        "feedforward norm did not settle: {}",
        last.k_rel_norm
    );
}

#[test]
fn trajectory_invariants_hold() {
    let horizon = 50;
    let problem = DoubleIntegrator::default();
    let mut solver = DdpSolver::new(quiet_config(horizon), problem.clone());
    let x0 = DVector::from_vec(vec![1.0, 0.0]);
    let solution = solver.solve(&x0, &zero_seed(1, horizon)).unwrap();

    assert_eq!(solution.states.len(), horizon + 1);
    assert_eq!(solution.inputs.len(), horizon);
    assert_eq!(solution.feedforward.len(), horizon);
    assert_eq!(solution.feedback.len(), horizon);
    assert_eq!(solution.stage_costs.len(), horizon + 1);
    assert_eq!(solution.states[0], x0);
    for gain in &solution.feedback {
        assert_eq!(gain.shape(), (1, 2));
    }

    // Committed trajectory is dynamically consistent.
    for t in 0..horizon {
        let x_next = problem.state_eq(&solution.states[t], &solution.inputs[t]);
        let err = (&x_next - &solution.states[t + 1]).norm();
        assert!(
            err < 1e-9 * (1.0 + x_next.norm()),
            "dynamics violated at stage {t}: error {err}"
        );
    }
}

#[test]
fn cost_is_monotone_over_accepted_iterations() {
    let horizon = 50;
    let mut solver = DdpSolver::new(quiet_config(horizon), DoubleIntegrator::default());
    let x0 = DVector::from_vec(vec![1.0, 0.5]);
    let solution = solver
        .solve(&x0, &vec![DVector::from_element(1, 3.0); horizon])
        .unwrap();

    let mut last_cost = solution.trace[0].cost;
    for entry in &solution.trace[1..] {
        if entry.alpha > 0.0 {
            assert!(
                entry.cost <= last_cost,
                "accepted iteration {} raised the cost: {} -> {}",
                entry.iter,
                last_cost,
                entry.cost
            );
            last_cost = entry.cost;
        }
    }
}

#[test]
fn regularization_types_reach_the_same_optimum() {
    let horizon = 50;
    let x0 = DVector::from_vec(vec![1.0, 0.0]);
    let seed = zero_seed(1, horizon);

    let mut quu_solver = DdpSolver::new(
        DdpConfig {
            reg_type: RegType::Quu,
            ..quiet_config(horizon)
        },
        DoubleIntegrator::default(),
    );
    let mut vxx_solver = DdpSolver::new(
        DdpConfig {
            reg_type: RegType::Vxx,
            ..quiet_config(horizon)
        },
        DoubleIntegrator::default(),
    );

    let quu = quu_solver.solve(&x0, &seed).unwrap();
    let vxx = vxx_solver.solve(&x0, &seed).unwrap();

    assert!(quu.converged);
    assert!(vxx.converged);
    assert!(
        (quu.cost - vxx.cost).abs() < 1e-6,
        "regularization types disagree: {} vs {}",
        quu.cost,
        vxx.cost
    );
}

#[test]
fn warm_start_is_stable() {
    let horizon = 50;
    let mut solver = DdpSolver::new(quiet_config(horizon), DoubleIntegrator::default());
    let x0 = DVector::from_vec(vec![1.0, 0.0]);

    let cold = solver.solve(&x0, &zero_seed(1, horizon)).unwrap();
    assert!(cold.converged);

    let warm = solver.solve(&x0, &cold.inputs).unwrap();
    assert!(warm.converged);
    assert!(warm.iterations <= cold.iterations);

    // Re-solving from the optimum leaves essentially no correction.
    let k_rel_norm = warm
        .feedforward
        .iter()
        .zip(&warm.inputs)
        .map(|(k, u)| k.norm() / (u.norm() + 1.0))
        .fold(0.0, f64::max);
    assert!(
        k_rel_norm < 1e-4,
        "warm start left a large feedforward: {k_rel_norm}"
    );
}
