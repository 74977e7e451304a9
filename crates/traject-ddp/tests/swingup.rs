//! Pendulum swing-up: a non-convex problem exercising regularization and
//! the optional second-order dynamics terms.

use nalgebra::DVector;
use traject_ddp::prelude::*;
use traject_test_utils::Pendulum;

const HORIZON: usize = 50;

fn quiet_config() -> DdpConfig {
    DdpConfig {
        verbose_print: false,
        horizon_steps: HORIZON,
        ..DdpConfig::default()
    }
}

fn hanging_state() -> DVector<f64> {
    DVector::from_vec(vec![std::f64::consts::PI, 0.0])
}

fn zero_seed() -> Vec<DVector<f64>> {
    vec![DVector::zeros(1); HORIZON]
}

#[test]
fn swingup_improves_monotonically() {
    let mut solver = DdpSolver::new(quiet_config(), Pendulum::default());
    let solution = solver.solve(&hanging_state(), &zero_seed()).unwrap();

    assert!(solution.converged, "termination: {:?}", solution.termination);
    assert!(
        solution.cost < solution.trace[0].cost,
        "no improvement over the passive seed: {} vs {}",
        solution.cost,
        solution.trace[0].cost
    );

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

    // The swing-up actually leaves the hanging neighborhood.
    let final_angle = solution.states[HORIZON][0].abs();
    assert!(
        final_angle < 0.5,
        "pendulum stayed near hanging: final angle {final_angle}"
    );
}

#[test]
fn second_order_dynamics_changes_the_search() {
    let x0 = hanging_state();
    let seed = zero_seed();

    let mut first_order = DdpSolver::new(quiet_config(), Pendulum::default());
    let mut second_order = DdpSolver::new(
        DdpConfig {
            use_state_eq_second_derivative: true,
            ..quiet_config()
        },
        Pendulum::default(),
    );

    let plain = first_order.solve(&x0, &seed).unwrap();
    let full = second_order.solve(&x0, &seed).unwrap();

    assert!(plain.converged);
    assert!(full.converged);
    assert!(plain.cost < plain.trace[0].cost);
    assert!(full.cost < full.trace[0].cost);

    // The augmented Q terms steer the search differently; the per-iteration
    // records cannot coincide.
    let plain_path: Vec<(f64, f64)> = plain.trace.iter().map(|e| (e.cost, e.lambda)).collect();
    let full_path: Vec<(f64, f64)> = full.trace.iter().map(|e| (e.cost, e.lambda)).collect();
    assert_ne!(plain_path, full_path, "traces are identical");
}

#[test]
fn lambda_stays_within_bounds_during_swingup() {
    let mut solver = DdpSolver::new(quiet_config(), Pendulum::default());
    let solution = solver.solve(&hanging_state(), &zero_seed()).unwrap();

    let config = quiet_config();
    for entry in &solution.trace {
        assert!(
            entry.lambda == 0.0
                || (config.lambda_min..=config.lambda_max).contains(&entry.lambda),
            "lambda {} escaped its bounds at iteration {}",
            entry.lambda,
            entry.iter
        );
    }
}
