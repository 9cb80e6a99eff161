//! Empirically tuned constants, kept together as configuration data rather than
//! literals buried in logic. The numbers originate from historical match data
//! and should be revised as one table.

use std::ops::RangeInclusive;

use tinyrand::Rand;

use crate::domain::{Situation, Surface};
use crate::mc::random_f64;

/// Per-surface baselines and multipliers. `variance` is the surface's
/// point-outcome randomness coefficient: hard > clay > grass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceTuning {
    pub serve_baseline: f64,
    pub return_baseline: f64,
    pub ace_multiplier: f64,
    pub fault_multiplier: f64,
    pub rally_multiplier: f64,
    pub variance: f64,
}

pub const fn surface_tuning(surface: Surface) -> SurfaceTuning {
    match surface {
        Surface::Hard => SurfaceTuning {
            serve_baseline: 0.62,
            return_baseline: 0.38,
            ace_multiplier: 1.0,
            fault_multiplier: 1.0,
            rally_multiplier: 1.0,
            variance: 0.35,
        },
        Surface::Clay => SurfaceTuning {
            serve_baseline: 0.60,
            return_baseline: 0.40,
            ace_multiplier: 0.7,
            fault_multiplier: 1.8,
            rally_multiplier: 1.2,
            variance: 0.30,
        },
        Surface::Grass => SurfaceTuning {
            serve_baseline: 0.65,
            return_baseline: 0.35,
            ace_multiplier: 1.3,
            fault_multiplier: 3.2,
            rally_multiplier: 1.5,
            variance: 0.25,
        },
    }
}

// ELO blend: fixed weights, with the logistic scale damped well beyond the
// standard 400 points to keep mismatches from becoming near-certainties.
pub const SKILL_WEIGHT: f64 = 0.4;
pub const STAT_WEIGHT: f64 = 0.6;
pub const ELO_SCALE: f64 = 1000.0;
pub const MATCH_ESTIMATE_BAND: RangeInclusive<f64> = 0.15..=0.85;
pub const POINT_PROB_BAND: RangeInclusive<f64> = 0.01..=0.99;

// Serve mechanics.
pub const NEUTRAL_FIRST_SERVE_RATE: f64 = 0.62;
pub const NEUTRAL_ACE_RATE: f64 = 0.06;
pub const NEUTRAL_DOUBLE_FAULT_RATE: f64 = 0.04;
pub const FIRST_SERVE_BONUS: f64 = 0.14;
pub const FIRST_SERVE_STRENGTH_CAP: f64 = 0.85;
pub const SECOND_SERVE_PENALTY: f64 = 0.10;
pub const SECOND_SERVE_STRENGTH_FLOOR: f64 = 0.35;
pub const FIRST_SERVE_ACE_MULTIPLIER: f64 = 1.3;
pub const SECOND_SERVE_ACE_MULTIPLIER: f64 = 0.4;

// Contextual multiplier bands.
pub const CLUTCH_BAND: RangeInclusive<f64> = 0.7..=1.3;
pub const FATIGUE_BAND: RangeInclusive<f64> = 0.8..=1.2;
pub const RALLY_BAND: RangeInclusive<f64> = 0.7..=1.3;
pub const FATIGUE_PER_SET: f64 = 0.05;
pub const FATIGUE_FREE_SETS: u8 = 2;

// Skill-preserving match-to-match variance spreads on a hard court; other
// surfaces scale by their variance coefficient.
pub const RATE_VARIANCE_SPREAD: f64 = 0.10;
pub const SERVE_EFFECT_VARIANCE_SPREAD: f64 = 0.12;

pub fn variance_spreads(surface: Surface) -> (f64, f64) {
    let scale = surface_tuning(surface).variance / surface_tuning(Surface::Hard).variance;
    (
        RATE_VARIANCE_SPREAD * scale,
        SERVE_EFFECT_VARIANCE_SPREAD * scale,
    )
}

/// How strongly a player's clutch factor engages in each situation.
pub fn pressure_weight(situation: Situation) -> f64 {
    match situation {
        Situation::None => 0.0,
        Situation::Deuce => 0.5,
        Situation::BreakPoint => 1.0,
        Situation::GamePoint => 0.7,
        Situation::SetPoint => 1.2,
        Situation::MatchPoint => 1.5,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RallyArchetype {
    QuickPoints,
    Balanced,
    Grinder,
}

/// The factor provider exposes rally style as a single multiplier; the
/// archetype is derived from it.
pub fn rally_archetype(style_multiplier: f64) -> RallyArchetype {
    if style_multiplier >= 1.05 {
        RallyArchetype::Grinder
    } else if style_multiplier <= 0.95 {
        RallyArchetype::QuickPoints
    } else {
        RallyArchetype::Balanced
    }
}

/// Length-dependent adjustment on top of the player's base style multiplier.
/// Short rallies favour quick-points players, long rallies favour grinders.
pub fn rally_adjustment(archetype: RallyArchetype, rally_length: u8) -> f64 {
    if rally_length <= 3 {
        match archetype {
            RallyArchetype::QuickPoints => 1.1,
            RallyArchetype::Grinder => 0.95,
            RallyArchetype::Balanced => 1.0,
        }
    } else if rally_length <= 6 {
        1.0
    } else {
        match archetype {
            RallyArchetype::Grinder => 1.15,
            RallyArchetype::Balanced => 1.05,
            RallyArchetype::QuickPoints => 0.85,
        }
    }
}

// Rally-length distribution buckets: (cumulative probability, range).
const RALLY_BUCKETS: [(f64, RangeInclusive<u8>); 4] = [
    (0.19, 1..=3),
    (0.26, 4..=6),
    (0.29, 7..=9),
    (0.32, 10..=12),
];
const RALLY_TAIL: RangeInclusive<u8> = 13..=25;

pub fn draw_rally_length(rand: &mut impl Rand) -> u8 {
    let draw = random_f64(rand);
    for (cumulative, range) in &RALLY_BUCKETS {
        if draw < *cumulative {
            return sample_range(range, rand);
        }
    }
    sample_range(&RALLY_TAIL, rand)
}

fn sample_range(range: &RangeInclusive<u8>, rand: &mut impl Rand) -> u8 {
    let span = (range.end() - range.start() + 1) as u64;
    *range.start() + (rand.next_u64() % span) as u8
}

/// Calibration advantage scalings, tiered by the target's distance from an even
/// match; closer matches need more aggressive deltas to move the needle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdvantageScaling {
    pub band: f64,
    pub serve: f64,
    pub returning: f64,
}

pub const ADVANTAGE_SCALINGS: [AdvantageScaling; 4] = [
    AdvantageScaling {
        band: 0.08,
        serve: 2.0,
        returning: 1.6,
    },
    AdvantageScaling {
        band: 0.15,
        serve: 1.7,
        returning: 1.3,
    },
    AdvantageScaling {
        band: 0.25,
        serve: 1.4,
        returning: 1.0,
    },
    AdvantageScaling {
        band: f64::INFINITY,
        serve: 1.1,
        returning: 0.8,
    },
];

pub fn advantage_scaling(target: f64) -> &'static AdvantageScaling {
    let distance = (target - 0.5).abs();
    ADVANTAGE_SCALINGS
        .iter()
        .find(|scaling| distance < scaling.band)
        .unwrap_or(&ADVANTAGE_SCALINGS[ADVANTAGE_SCALINGS.len() - 1])
}

// Safety bands for calibrated point parameters.
pub const SERVE_PROB_BAND: RangeInclusive<f64> = 0.40..=0.90;
pub const RETURN_PROB_BAND: RangeInclusive<f64> = 0.10..=0.60;

#[inline]
pub fn clamp_to(value: f64, band: &RangeInclusive<f64>) -> f64 {
    value.clamp(*band.start(), *band.end())
}
