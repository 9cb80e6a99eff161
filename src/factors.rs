//! Player factor lookup as an injected, read-only capability — no global
//! tables. Missing entries are a first-class condition; the probability model
//! falls back to documented neutral defaults, while the calibration engine's
//! market mode may refuse to.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::domain::{PlayerPointParams, Surface};
use crate::tuning;

/// Baseline point-win rates on serve and return.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceReturn {
    pub service: f64,
    pub returning: f64,
}

/// Read-only per-player factor lookup. `None` means the player (or the
/// surface-specific figure) is not covered by the underlying data.
pub trait FactorProvider {
    fn service_return_baseline(&self, player: &str, surface: Surface) -> Option<ServiceReturn>;
    fn elo_rating(&self, player: &str, surface: Surface) -> Option<f64>;
    fn clutch_factor(&self, player: &str) -> Option<f64>;
    fn rally_style(&self, player: &str) -> Option<f64>;
    fn endurance_factor(&self, player: &str) -> Option<f64>;
}

/// The empty provider: every lookup misses and neutral defaults apply.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFactors;
impl FactorProvider for NoFactors {
    fn service_return_baseline(&self, _: &str, _: Surface) -> Option<ServiceReturn> {
        None
    }

    fn elo_rating(&self, _: &str, _: Surface) -> Option<f64> {
        None
    }

    fn clutch_factor(&self, _: &str) -> Option<f64> {
        None
    }

    fn rally_style(&self, _: &str) -> Option<f64> {
        None
    }

    fn endurance_factor(&self, _: &str) -> Option<f64> {
        None
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerEntry {
    #[serde(default)]
    pub baselines: FxHashMap<Surface, ServiceReturn>,
    #[serde(default)]
    pub elo: FxHashMap<Surface, f64>,
    #[serde(default)]
    pub clutch: Option<f64>,
    #[serde(default)]
    pub rally_style: Option<f64>,
    #[serde(default)]
    pub endurance: Option<f64>,
}

/// In-memory provider backed by a player-keyed table; loadable from JSON and
/// handy for assembling synthetic providers in tests.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticFactors {
    pub players: FxHashMap<String, PlayerEntry>,
}
impl StaticFactors {
    pub fn with_player(mut self, name: impl Into<String>, entry: PlayerEntry) -> Self {
        self.players.insert(name.into(), entry);
        self
    }
}
impl FactorProvider for StaticFactors {
    fn service_return_baseline(&self, player: &str, surface: Surface) -> Option<ServiceReturn> {
        self.players
            .get(player)
            .and_then(|entry| entry.baselines.get(&surface))
            .copied()
    }

    fn elo_rating(&self, player: &str, surface: Surface) -> Option<f64> {
        self.players
            .get(player)
            .and_then(|entry| entry.elo.get(&surface))
            .copied()
    }

    fn clutch_factor(&self, player: &str) -> Option<f64> {
        self.players.get(player).and_then(|entry| entry.clutch)
    }

    fn rally_style(&self, player: &str) -> Option<f64> {
        self.players.get(player).and_then(|entry| entry.rally_style)
    }

    fn endurance_factor(&self, player: &str) -> Option<f64> {
        self.players.get(player).and_then(|entry| entry.endurance)
    }
}

/// A player's factors resolved against a provider, with neutral defaults in
/// place of every miss. This is the view the probability model consumes.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerProfile {
    pub name: String,
    pub service: f64,
    pub returning: f64,
    pub ace_rate: f64,
    pub double_fault_rate: f64,
    pub first_serve_rate: f64,
    pub elo: Option<f64>,
    pub clutch: f64,
    pub rally_style: f64,
    pub endurance: f64,
}
impl PlayerProfile {
    /// Resolves a named player. Missing baselines fall back to the surface
    /// table; missing scalar factors fall back to 1.0; a missing ELO stays
    /// absent (the model then skips the skill blend).
    pub fn resolve(provider: &dyn FactorProvider, name: &str, surface: Surface) -> Self {
        let tuning = tuning::surface_tuning(surface);
        let baseline = provider
            .service_return_baseline(name, surface)
            .unwrap_or(ServiceReturn {
                service: tuning.serve_baseline,
                returning: tuning.return_baseline,
            });
        Self {
            name: name.into(),
            service: baseline.service,
            returning: baseline.returning,
            ace_rate: tuning::NEUTRAL_ACE_RATE,
            double_fault_rate: tuning::NEUTRAL_DOUBLE_FAULT_RATE,
            first_serve_rate: tuning::NEUTRAL_FIRST_SERVE_RATE,
            elo: provider.elo_rating(name, surface),
            clutch: provider.clutch_factor(name).unwrap_or(1.0),
            rally_style: provider.rally_style(name).unwrap_or(1.0),
            endurance: provider.endurance_factor(name).unwrap_or(1.0),
        }
    }

    /// A synthetic player carrying calibrated point parameters and neutral
    /// everything else.
    pub fn from_params(name: impl Into<String>, params: PlayerPointParams) -> Self {
        Self {
            name: name.into(),
            service: params.service,
            returning: params.returning,
            ace_rate: tuning::NEUTRAL_ACE_RATE,
            double_fault_rate: tuning::NEUTRAL_DOUBLE_FAULT_RATE,
            first_serve_rate: tuning::NEUTRAL_FIRST_SERVE_RATE,
            elo: None,
            clutch: 1.0,
            rally_style: 1.0,
            endurance: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;

    use super::*;

    fn sample_factors() -> StaticFactors {
        StaticFactors::default().with_player(
            "Carlos Alcaraz",
            PlayerEntry {
                baselines: [(
                    Surface::Clay,
                    ServiceReturn {
                        service: 0.68,
                        returning: 0.45,
                    },
                )]
                .into_iter()
                .collect(),
                elo: [(Surface::Clay, 2150.0)].into_iter().collect(),
                clutch: Some(1.12),
                rally_style: Some(1.1),
                endurance: Some(1.15),
            },
        )
    }

    #[test]
    fn resolves_known_player() {
        let factors = sample_factors();
        let profile = PlayerProfile::resolve(&factors, "Carlos Alcaraz", Surface::Clay);
        assert_float_absolute_eq!(0.68, profile.service, 1e-9);
        assert_float_absolute_eq!(0.45, profile.returning, 1e-9);
        assert_eq!(Some(2150.0), profile.elo);
        assert_float_absolute_eq!(1.12, profile.clutch, 1e-9);
    }

    #[test]
    fn missing_player_gets_neutral_defaults() {
        let factors = sample_factors();
        let profile = PlayerProfile::resolve(&factors, "Damir Dzumhur", Surface::Clay);
        let tuning = tuning::surface_tuning(Surface::Clay);
        assert_float_absolute_eq!(tuning.serve_baseline, profile.service, 1e-9);
        assert_float_absolute_eq!(tuning.return_baseline, profile.returning, 1e-9);
        assert_eq!(None, profile.elo);
        assert_float_absolute_eq!(1.0, profile.clutch, 1e-9);
        assert_float_absolute_eq!(1.0, profile.endurance, 1e-9);
    }

    #[test]
    fn off_surface_baseline_misses() {
        let factors = sample_factors();
        assert!(factors
            .service_return_baseline("Carlos Alcaraz", Surface::Grass)
            .is_none());
        assert!(factors
            .service_return_baseline("Carlos Alcaraz", Surface::Clay)
            .is_some());
    }

    #[test]
    fn entries_round_trip_through_json() {
        let factors = sample_factors();
        let encoded = serde_json::to_string(&factors).unwrap();
        let decoded: StaticFactors = serde_json::from_str(&encoded).unwrap();
        assert_eq!(factors, decoded);
    }
}
