//! Derivative-free scalar search primitives used by the calibration engine.

use std::ops::RangeInclusive;

use anyhow::bail;

#[derive(Clone, Debug)]
pub struct BisectionConfig {
    pub interval: RangeInclusive<f64>,
    pub tolerance: f64,
    pub min_width: f64,
    pub max_steps: u64,
}
impl BisectionConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.interval.start() >= self.interval.end() {
            bail!("search interval must be non-degenerate");
        }
        if self.tolerance < 0.0 {
            bail!("tolerance must be non-negative");
        }
        if self.min_width <= 0.0 {
            bail!("minimum interval width must be positive");
        }
        if self.max_steps == 0 {
            bail!("at least one step must be allowed");
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct BisectionOutcome {
    pub steps: u64,
    pub optimal_value: f64,
    pub optimal_residual: f64,
    pub converged: bool,
}

/// Bisects over the configured interval for a root of `sample_f`, assumed
/// monotonically increasing in expectation. `sample_f` returns the signed
/// residual (estimate − target) at the probed value; it may be noisy — the
/// lowest-magnitude residual seen is tracked and always returned, whether or
/// not the search converges within tolerance.
pub fn bisect(
    config: &BisectionConfig,
    mut sample_f: impl FnMut(f64) -> f64,
) -> BisectionOutcome {
    config.validate().unwrap();

    let (mut low, mut high) = (*config.interval.start(), *config.interval.end());
    let mut steps = 0;
    let mut optimal_value = (low + high) / 2.0;
    let mut optimal_residual = f64::MAX;
    let mut converged = false;

    while steps < config.max_steps && high - low >= config.min_width {
        steps += 1;
        let midpoint = (low + high) / 2.0;
        let residual = sample_f(midpoint);
        if residual.abs() < optimal_residual.abs() {
            optimal_value = midpoint;
            optimal_residual = residual;
        }
        if residual.abs() <= config.tolerance {
            converged = true;
            break;
        }
        if residual < 0.0 {
            low = midpoint;
        } else {
            high = midpoint;
        }
    }

    BisectionOutcome {
        steps,
        optimal_value,
        optimal_residual,
        converged,
    }
}

#[cfg(test)]
mod tests;
