use assert_float_eq::*;

use super::*;

fn config() -> BisectionConfig {
    BisectionConfig {
        interval: 0.0..=10.0,
        tolerance: 1e-6,
        min_width: 1e-9,
        max_steps: 100,
    }
}

#[test]
fn finds_linear_root() {
    let outcome = bisect(&config(), |value| value - 7.25);
    assert!(outcome.converged);
    assert_float_absolute_eq!(7.25, outcome.optimal_value, 1e-5);
    assert!(outcome.optimal_residual.abs() <= 1e-6);
}

#[test]
fn finds_sqrt() {
    // x² is monotone over the positive interval
    let outcome = bisect(&config(), |value| value * value - 2.0);
    assert!(outcome.converged);
    assert_float_absolute_eq!(std::f64::consts::SQRT_2, outcome.optimal_value, 1e-4);
}

#[test]
fn budget_exhaustion_returns_best_candidate() {
    let config = BisectionConfig {
        max_steps: 3,
        tolerance: 0.0,
        ..config()
    };
    let outcome = bisect(&config, |value| value - 7.25);
    assert!(!outcome.converged);
    assert_eq!(3, outcome.steps);
    // best of the three midpoints probed: 5.0, 7.5, 6.25
    assert_float_absolute_eq!(7.5, outcome.optimal_value, 1e-9);
}

#[test]
fn interval_collapse_stops_the_search() {
    let config = BisectionConfig {
        min_width: 1.0,
        tolerance: 0.0,
        ..config()
    };
    let outcome = bisect(&config, |value| value - 7.25);
    assert!(!outcome.converged);
    assert!(outcome.steps < 10);
}

#[test]
fn rejects_degenerate_interval() {
    let config = BisectionConfig {
        interval: 1.0..=1.0,
        ..config()
    };
    assert!(config.validate().is_err());
}

#[test]
fn rejects_zero_steps() {
    let config = BisectionConfig {
        max_steps: 0,
        ..config()
    };
    assert!(config.validate().is_err());
}
