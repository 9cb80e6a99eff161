//! Calibration of point-level service/return parameters to a target match-win
//! probability. A single "advantage" scalar is bisected; each candidate maps
//! to a parameter pair, is estimated over a quick Monte Carlo batch, and the
//! lowest-error candidate is always returned — with its achieved error — even
//! when the iteration budget runs out.

use std::ops::RangeInclusive;

use anyhow::bail;
use thiserror::Error;
use tinyrand::Rand;
use tracing::debug;

use crate::domain::{MatchFormat, PlayerPointParams, Side, Surface};
use crate::factors::FactorProvider;
use crate::market::{BettingMarket, MarketError};
use crate::mc::{MonteCarloEngine, DEFAULT_SEED};
use crate::model::PointInputs;
use crate::opt::{bisect, BisectionConfig};
use crate::tuning::{
    self, clamp_to, AdvantageScaling, RETURN_PROB_BAND, SERVE_PROB_BAND,
};

pub const VALIDATION_TOLERANCE: f64 = 0.03;
pub const MIN_VALIDATION_SAMPLES: u64 = 1_000;

#[derive(Clone, Debug)]
pub struct Config {
    pub tolerance: f64,
    pub quick_samples: u64,
    pub max_steps: u64,
    pub advantage_interval: RangeInclusive<f64>,
    pub min_interval_width: f64,
    pub symmetric_band: f64,
    pub format: MatchFormat,
    pub seed: u64,
}
impl Config {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.tolerance <= 0.0 {
            bail!("tolerance must be positive");
        }
        const MIN_QUICK_SAMPLES: u64 = 50;
        if self.quick_samples < MIN_QUICK_SAMPLES {
            bail!("at least {MIN_QUICK_SAMPLES} quick samples are needed per estimate");
        }
        if self.max_steps == 0 {
            bail!("at least one calibration step must be allowed");
        }
        if self.advantage_interval.start() >= self.advantage_interval.end() {
            bail!("advantage interval must be non-degenerate");
        }
        if self.min_interval_width <= 0.0 {
            bail!("minimum interval width must be positive");
        }
        if self.symmetric_band < 0.0 {
            bail!("symmetric band must be non-negative");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tolerance: 0.02,
            quick_samples: 200,
            max_steps: 75,
            advantage_interval: -0.20..=0.20,
            min_interval_width: 5e-4,
            symmetric_band: 0.01,
            format: MatchFormat::BestOfThree,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("target probability {0} is outside the open interval (0, 1)")]
    InvalidTargetProbability(f64),

    #[error("no observed service/return baseline for {0}")]
    DataUnavailable(String),

    #[error("{0}")]
    Market(#[from] MarketError),
}

/// Whether the market-driven mode may substitute estimated defaults for
/// players missing from the factor provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataPolicy {
    AllowDefaults,
    RequireObserved,
}

/// Output of one calibration request: the parameter pair, the achieved
/// probability over the quick sampler, and whether the search converged
/// within tolerance. Non-convergence is reported, never raised.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibratedParams {
    pub p1: PlayerPointParams,
    pub p2: PlayerPointParams,
    pub surface: Surface,
    pub format: MatchFormat,
    pub target: f64,
    pub achieved: f64,
    pub error: f64,
    pub steps: u64,
    pub converged: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidationReport {
    pub target: f64,
    pub achieved: f64,
    pub error: f64,
    pub error_pct: f64,
    pub within_tolerance: bool,
}

#[derive(Debug)]
pub struct Calibrator {
    config: Config,
    engine: MonteCarloEngine,
}
impl Calibrator {
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Calibrates two synthetic players from the surface baseline so that
    /// player 1 wins with probability `target`.
    pub fn calibrate(
        &mut self,
        target: f64,
        surface: Surface,
    ) -> Result<CalibratedParams, CalibrationError> {
        let tuning = tuning::surface_tuning(surface);
        let baseline = PlayerPointParams {
            service: tuning.serve_baseline,
            returning: tuning.return_baseline,
        };
        let format = self.config.format;
        self.calibrate_from_baseline(target, surface, format, baseline)
    }

    /// Market-driven calibration: the target comes from the vig-free
    /// moneyline and the search baseline from the players' observed
    /// service/return rates. Under [`DataPolicy::RequireObserved`], a player
    /// missing from the provider is an error rather than a silent default.
    pub fn calibrate_market(
        &mut self,
        market: &BettingMarket,
        factors: &dyn FactorProvider,
        policy: DataPolicy,
    ) -> Result<CalibratedParams, CalibrationError> {
        let analysis = market.analyse()?;
        let tuning = tuning::surface_tuning(market.surface);

        let mut baselines = Vec::with_capacity(2);
        for player in [&market.player1, &market.player2] {
            match factors.service_return_baseline(player, market.surface) {
                Some(baseline) => baselines.push((baseline.service, baseline.returning)),
                None if policy == DataPolicy::RequireObserved => {
                    return Err(CalibrationError::DataUnavailable(player.clone()));
                }
                None => baselines.push((tuning.serve_baseline, tuning.return_baseline)),
            }
        }
        let baseline = PlayerPointParams {
            service: (baselines[0].0 + baselines[1].0) / 2.0,
            returning: (baselines[0].1 + baselines[1].1) / 2.0,
        };

        debug!(
            "market {} vs {}: target {:.4} (vig {:.4})",
            market.player1, market.player2, analysis.p1_probability, analysis.vig
        );
        self.calibrate_from_baseline(
            analysis.p1_probability,
            market.surface,
            market.format,
            baseline,
        )
    }

    fn calibrate_from_baseline(
        &mut self,
        target: f64,
        surface: Surface,
        format: MatchFormat,
        baseline: PlayerPointParams,
    ) -> Result<CalibratedParams, CalibrationError> {
        if !(target > 0.0 && target < 1.0) {
            return Err(CalibrationError::InvalidTargetProbability(target));
        }

        // an effectively even match needs no search at all
        if (target - 0.5).abs() < self.config.symmetric_band {
            return Ok(CalibratedParams {
                p1: baseline,
                p2: baseline,
                surface,
                format,
                target,
                achieved: 0.5,
                error: (target - 0.5).abs(),
                steps: 0,
                converged: true,
            });
        }

        let scaling = tuning::advantage_scaling(target);
        self.engine.reset_rand();
        let engine = &mut self.engine;
        let outcome = bisect(
            &BisectionConfig {
                interval: self.config.advantage_interval.clone(),
                tolerance: self.config.tolerance,
                min_width: self.config.min_interval_width,
                max_steps: self.config.max_steps,
            },
            |advantage| {
                let (p1, p2) = params_for(&baseline, advantage, scaling);
                let estimate =
                    engine.estimate(|rand| quick_match(&p1, &p2, surface, format, rand) == Side::P1);
                estimate - target
            },
        );

        let (p1, p2) = params_for(&baseline, outcome.optimal_value, scaling);
        debug!(
            "calibrated advantage {:.4} in {} steps, residual {:.4}, converged: {}",
            outcome.optimal_value, outcome.steps, outcome.optimal_residual, outcome.converged
        );
        Ok(CalibratedParams {
            p1,
            p2,
            surface,
            format,
            target,
            achieved: target + outcome.optimal_residual,
            error: outcome.optimal_residual.abs(),
            steps: outcome.steps,
            converged: outcome.converged,
        })
    }

    /// Re-estimates the achieved probability over a much larger sample. The
    /// sample count is floored at [`MIN_VALIDATION_SAMPLES`] and drawn from a
    /// stream independent of the calibration batches.
    pub fn validate(&self, params: &CalibratedParams, samples: u64) -> ValidationReport {
        let mut engine = MonteCarloEngine::new(self.config.seed.wrapping_add(1))
            .with_iterations(samples.max(MIN_VALIDATION_SAMPLES));
        let achieved = engine.estimate(|rand| {
            quick_match(&params.p1, &params.p2, params.surface, params.format, rand) == Side::P1
        });
        let error = (achieved - params.target).abs();
        ValidationReport {
            target: params.target,
            achieved,
            error,
            error_pct: error * 100.0,
            within_tolerance: error < VALIDATION_TOLERANCE,
        }
    }
}

impl TryFrom<Config> for Calibrator {
    type Error = anyhow::Error;

    fn try_from(config: Config) -> Result<Self, Self::Error> {
        config.validate()?;
        let engine =
            MonteCarloEngine::new(config.seed).with_iterations(config.quick_samples);
        Ok(Self { config, engine })
    }
}

/// Maps an advantage scalar to a clamped parameter pair; player 2 carries the
/// mirror-image disadvantage.
fn params_for(
    baseline: &PlayerPointParams,
    advantage: f64,
    scaling: &AdvantageScaling,
) -> (PlayerPointParams, PlayerPointParams) {
    let params = |direction: f64| PlayerPointParams {
        service: clamp_to(
            baseline.service + direction * advantage * scaling.serve,
            &SERVE_PROB_BAND,
        ),
        returning: clamp_to(
            baseline.returning + direction * advantage * scaling.returning,
            &RETURN_PROB_BAND,
        ),
    };
    (params(1.0), params(-1.0))
}

// The quick sampler: full tennis scoring — deuce/win-by-2 games, tiebreak at
// six-all, best-of-3/5 — and the serve pre-step, but none of the
// pressure/clutch/fatigue/rally layering of the full model.

pub fn quick_match(
    p1: &PlayerPointParams,
    p2: &PlayerPointParams,
    surface: Surface,
    format: MatchFormat,
    rand: &mut impl Rand,
) -> Side {
    let needed = format.sets_to_win();
    let mut sets = [0u8; 2];
    while sets[0] < needed && sets[1] < needed {
        let winner = quick_set(p1, p2, surface, rand);
        sets[winner.index()] += 1;
    }
    if sets[Side::P1.index()] >= needed {
        Side::P1
    } else {
        Side::P2
    }
}

fn quick_set(
    p1: &PlayerPointParams,
    p2: &PlayerPointParams,
    surface: Surface,
    rand: &mut impl Rand,
) -> Side {
    let mut games = [0u8; 2];
    loop {
        let server = if (games[0] + games[1]) % 2 == 0 {
            Side::P1
        } else {
            Side::P2
        };
        let winner = quick_game(p1, p2, server, surface, rand);
        games[winner.index()] += 1;

        for side in [Side::P1, Side::P2] {
            if games[side.index()] >= 6 && games[side.index()] - games[side.flip().index()] >= 2 {
                return side;
            }
        }
        if games == [6, 6] {
            return quick_tiebreak(p1, p2, surface, rand);
        }
    }
}

fn quick_game(
    p1: &PlayerPointParams,
    p2: &PlayerPointParams,
    server: Side,
    surface: Surface,
    rand: &mut impl Rand,
) -> Side {
    let (server_params, returner_params) = match server {
        Side::P1 => (p1, p2),
        Side::P2 => (p2, p1),
    };
    let inputs = PointInputs::raw(server_params, returner_params, surface);
    let mut server_points = 0u8;
    let mut returner_points = 0u8;
    loop {
        if inputs.simulate(rand).server_won {
            server_points += 1;
        } else {
            returner_points += 1;
        }
        if server_points >= 4 && server_points - returner_points >= 2 {
            return server;
        }
        if returner_points >= 4 && returner_points - server_points >= 2 {
            return server.flip();
        }
    }
}

fn quick_tiebreak(
    p1: &PlayerPointParams,
    p2: &PlayerPointParams,
    surface: Surface,
    rand: &mut impl Rand,
) -> Side {
    let mut points = [0u8; 2];
    let mut index = 0u32;
    loop {
        let server = if ((index + 1) / 2) % 2 == 0 {
            Side::P1
        } else {
            Side::P2
        };
        let (server_params, returner_params) = match server {
            Side::P1 => (p1, p2),
            Side::P2 => (p2, p1),
        };
        let inputs = PointInputs::raw(server_params, returner_params, surface);
        let winner = if inputs.simulate(rand).server_won {
            server
        } else {
            server.flip()
        };
        points[winner.index()] += 1;
        index += 1;

        for side in [Side::P1, Side::P2] {
            if points[side.index()] >= 7 && points[side.index()] - points[side.flip().index()] >= 2
            {
                return side;
            }
        }
    }
}
