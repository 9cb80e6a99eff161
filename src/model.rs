//! Point-level probability model. Combines baseline service/return rates with
//! a damped ELO skill blend and situational multipliers (rally style, fatigue,
//! surface variance, clutch), and resolves the serve itself — aces and double
//! faults short-circuit the point before the rally formula is consulted.

use tinyrand::Rand;

use crate::domain::{PlayerPointParams, PressureContext, Side, Surface};
use crate::factors::{FactorProvider, PlayerProfile};
use crate::mc::random_f64;
use crate::tuning::{
    self, clamp_to, CLUTCH_BAND, ELO_SCALE, FATIGUE_BAND, FATIGUE_FREE_SETS, FATIGUE_PER_SET,
    FIRST_SERVE_ACE_MULTIPLIER, FIRST_SERVE_BONUS, FIRST_SERVE_STRENGTH_CAP,
    MATCH_ESTIMATE_BAND, POINT_PROB_BAND, RALLY_BAND, SECOND_SERVE_ACE_MULTIPLIER,
    SECOND_SERVE_PENALTY, SECOND_SERVE_STRENGTH_FLOOR, SKILL_WEIGHT, STAT_WEIGHT,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServeOutcome {
    Ace,
    DoubleFault,
    Rally,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointOutcome {
    pub server_won: bool,
    pub serve: ServeOutcome,
}

/// Skill-preserving match-to-match variance, drawn once per match and applied
/// on every point. The spread scales with the surface's variance coefficient.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchVariance {
    rates: [f64; 2],
    serve_effects: [f64; 2],
}
impl MatchVariance {
    pub fn neutral() -> Self {
        Self {
            rates: [1.0; 2],
            serve_effects: [1.0; 2],
        }
    }

    pub fn draw(surface: Surface, rand: &mut impl Rand) -> Self {
        let (rate_spread, effect_spread) = tuning::variance_spreads(surface);
        let mut factor = |spread: f64| 1.0 - spread + 2.0 * spread * random_f64(rand);
        Self {
            rates: [factor(rate_spread), factor(rate_spread)],
            serve_effects: [factor(effect_spread), factor(effect_spread)],
        }
    }

    fn rates(&self, side: Side) -> f64 {
        self.rates[side.index()]
    }

    fn serve_effects(&self, side: Side) -> f64 {
        self.serve_effects[side.index()]
    }
}

/// Everything needed to decide one point, after all contextual layering has
/// been folded in. Shared between the full model and the calibration sampler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PointInputs {
    pub service_strength: f64,
    pub return_strength: f64,
    pub ace_rate: f64,
    pub double_fault_rate: f64,
    pub first_serve_rate: f64,
    pub skill_estimate: Option<f64>,
}
impl PointInputs {
    /// Unlayered inputs for a pair of raw point parameters: surface serve
    /// effects apply, pressure/fatigue/rally/variance do not.
    pub(crate) fn raw(
        server: &PlayerPointParams,
        returner: &PlayerPointParams,
        surface: Surface,
    ) -> Self {
        let tuning = tuning::surface_tuning(surface);
        Self {
            service_strength: server.service,
            return_strength: returner.returning,
            ace_rate: tuning::NEUTRAL_ACE_RATE * tuning.ace_multiplier,
            double_fault_rate: tuning::NEUTRAL_DOUBLE_FAULT_RATE * tuning.fault_multiplier,
            first_serve_rate: tuning::NEUTRAL_FIRST_SERVE_RATE,
            skill_estimate: None,
        }
    }

    /// Probability of the server winning the rally phase, given the serve's
    /// strength contribution.
    fn rally_probability(&self, service_strength: f64) -> f64 {
        let combined = service_strength + self.return_strength;
        let stat_estimate = if combined > 0.0 {
            service_strength / combined
        } else {
            0.5
        };
        let blended = match self.skill_estimate {
            Some(skill) => SKILL_WEIGHT * skill + STAT_WEIGHT * stat_estimate,
            None => stat_estimate,
        };
        clamp_to(blended, &POINT_PROB_BAND)
    }

    /// Expected rally-phase probability with the base service strength; the
    /// serve split is applied only when a point is actually simulated.
    pub(crate) fn win_probability(&self) -> f64 {
        self.rally_probability(self.service_strength)
    }

    pub(crate) fn simulate(&self, rand: &mut impl Rand) -> PointOutcome {
        let first_serve = random_f64(rand) < self.first_serve_rate;

        // double faults occur only on second serve
        if !first_serve && random_f64(rand) < self.double_fault_rate {
            return PointOutcome {
                server_won: false,
                serve: ServeOutcome::DoubleFault,
            };
        }

        let ace_rate = self.ace_rate
            * if first_serve {
                FIRST_SERVE_ACE_MULTIPLIER
            } else {
                SECOND_SERVE_ACE_MULTIPLIER
            };
        if random_f64(rand) < ace_rate {
            return PointOutcome {
                server_won: true,
                serve: ServeOutcome::Ace,
            };
        }

        let service_strength = if first_serve {
            f64::min(
                FIRST_SERVE_STRENGTH_CAP,
                self.service_strength + FIRST_SERVE_BONUS,
            )
        } else {
            f64::max(
                SECOND_SERVE_STRENGTH_FLOOR,
                self.service_strength - SECOND_SERVE_PENALTY,
            )
        };
        PointOutcome {
            server_won: random_f64(rand) < self.rally_probability(service_strength),
            serve: ServeOutcome::Rally,
        }
    }
}

/// The point oracle for a specific pairing on a specific surface.
#[derive(Clone, Debug)]
pub struct PointModel {
    surface: Surface,
    profiles: [PlayerProfile; 2],
}
impl PointModel {
    /// Resolves both players through the injected factor provider; players the
    /// provider does not cover get neutral baselines rather than failing the
    /// match.
    pub fn resolve(
        provider: &dyn FactorProvider,
        player1: &str,
        player2: &str,
        surface: Surface,
    ) -> Self {
        Self {
            surface,
            profiles: [
                PlayerProfile::resolve(provider, player1, surface),
                PlayerProfile::resolve(provider, player2, surface),
            ],
        }
    }

    /// Builds the oracle directly from calibrated point parameters.
    pub fn from_params(p1: PlayerPointParams, p2: PlayerPointParams, surface: Surface) -> Self {
        Self {
            surface,
            profiles: [
                PlayerProfile::from_params("P1", p1),
                PlayerProfile::from_params("P2", p2),
            ],
        }
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn profile(&self, side: Side) -> &PlayerProfile {
        &self.profiles[side.index()]
    }

    /// Instantaneous probability that the serving player wins the current
    /// point, in [0.01, 0.99].
    pub fn point_win_probability(
        &self,
        server: Side,
        ctx: &PressureContext,
        variance: &MatchVariance,
    ) -> f64 {
        self.point_inputs(server, ctx, variance).win_probability()
    }

    /// Plays out one point: the serve pre-step (double fault, ace) may
    /// short-circuit before the rally probability is consulted.
    pub fn simulate_point(
        &self,
        server: Side,
        ctx: &PressureContext,
        variance: &MatchVariance,
        rand: &mut impl Rand,
    ) -> PointOutcome {
        self.point_inputs(server, ctx, variance).simulate(rand)
    }

    fn point_inputs(
        &self,
        server: Side,
        ctx: &PressureContext,
        variance: &MatchVariance,
    ) -> PointInputs {
        let tuning = tuning::surface_tuning(self.surface);
        let server_profile = self.profile(server);
        let returner_profile = self.profile(server.flip());

        let service_strength = contextual_strength(
            server_profile.service,
            server_profile,
            server,
            ctx,
            variance,
        );
        let return_strength = contextual_strength(
            returner_profile.returning,
            returner_profile,
            server.flip(),
            ctx,
            variance,
        );

        PointInputs {
            service_strength,
            return_strength,
            ace_rate: server_profile.ace_rate
                * tuning.ace_multiplier
                * variance.serve_effects(server),
            double_fault_rate: server_profile.double_fault_rate
                * tuning.fault_multiplier
                * variance.serve_effects(server),
            first_serve_rate: server_profile.first_serve_rate,
            skill_estimate: self.skill_estimate(server),
        }
    }

    /// Damped logistic ELO estimate of the server beating the returner,
    /// clamped at the match level. Absent when either rating is missing.
    fn skill_estimate(&self, server: Side) -> Option<f64> {
        let server_elo = self.profile(server).elo?;
        let returner_elo = self.profile(server.flip()).elo?;
        let estimate = 1.0 / (1.0 + 10f64.powf((returner_elo - server_elo) / ELO_SCALE));
        Some(clamp_to(estimate, &MATCH_ESTIMATE_BAND))
    }
}

/// Applies the contextual multiplier chain — rally style, fatigue, surface
/// variance, clutch — to one player's base strength, each factor clamped to
/// its band before application.
fn contextual_strength(
    base: f64,
    profile: &PlayerProfile,
    side: Side,
    ctx: &PressureContext,
    variance: &MatchVariance,
) -> f64 {
    let rally = clamp_to(
        profile.rally_style
            * tuning::rally_adjustment(
                tuning::rally_archetype(profile.rally_style),
                ctx.rally_length,
            ),
        &RALLY_BAND,
    );
    let fatigue = clamp_to(fatigue_multiplier(ctx.set_number, profile.endurance), &FATIGUE_BAND);
    let mut strength = base * rally * fatigue * variance.rates(side);
    let situation = ctx.situation();
    if situation.is_pressure() {
        let clutch = clamp_to(
            1.0 + (profile.clutch - 1.0) * tuning::pressure_weight(situation),
            &CLUTCH_BAND,
        );
        strength *= clutch;
    }
    strength
}

/// No fatigue in the first two sets; afterwards a per-set penalty moderated by
/// the player's endurance factor.
fn fatigue_multiplier(set_number: u8, endurance: f64) -> f64 {
    if set_number <= FATIGUE_FREE_SETS {
        return 1.0;
    }
    let sets_beyond = (set_number - FATIGUE_FREE_SETS) as f64;
    1.0 - sets_beyond * FATIGUE_PER_SET / f64::max(endurance, f64::MIN_POSITIVE)
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;
    use tinyrand::{Seeded, StdRand};

    use crate::domain::{GameStakes, PlayerPointParams, PressureContext};
    use crate::factors::{NoFactors, PlayerEntry, StaticFactors};

    use super::*;

    fn plain_ctx() -> PressureContext {
        PressureContext::classify_game(1, 1, 1, 4, &GameStakes::default())
    }

    fn symmetric_model() -> PointModel {
        PointModel::resolve(&NoFactors, "A", "B", Surface::Hard)
    }

    #[test]
    fn symmetric_profiles_hold_serve_at_baseline() {
        let model = symmetric_model();
        let prob =
            model.point_win_probability(Side::P1, &plain_ctx(), &MatchVariance::neutral());
        // 0.62 / (0.62 + 0.38) with neutral multipliers
        assert_float_absolute_eq!(0.62, prob, 1e-9);
    }

    #[test]
    fn probability_stays_in_point_band() {
        let model = PointModel::from_params(
            PlayerPointParams {
                service: 0.99,
                returning: 0.99,
            },
            PlayerPointParams {
                service: 0.01,
                returning: 0.01,
            },
            Surface::Grass,
        );
        let prob =
            model.point_win_probability(Side::P1, &plain_ctx(), &MatchVariance::neutral());
        assert!(prob <= 0.99 && prob >= 0.01, "prob {prob}");
    }

    #[test]
    fn clutch_server_gains_on_break_point() {
        let factors = StaticFactors::default().with_player(
            "Clutch",
            PlayerEntry {
                clutch: Some(1.3),
                ..Default::default()
            },
        );
        let model = PointModel::resolve(&factors, "Clutch", "Other", Surface::Hard);
        let neutral = MatchVariance::neutral();
        let calm = model.point_win_probability(Side::P1, &plain_ctx(), &neutral);
        let bp_ctx = PressureContext::classify_game(2, 3, 1, 4, &GameStakes::default());
        let pressured = model.point_win_probability(Side::P1, &bp_ctx, &neutral);
        assert!(pressured > calm, "{pressured} vs {calm}");
    }

    #[test]
    fn fatigue_only_beyond_second_set() {
        assert_float_absolute_eq!(1.0, fatigue_multiplier(1, 1.0), 1e-9);
        assert_float_absolute_eq!(1.0, fatigue_multiplier(2, 1.0), 1e-9);
        assert_float_absolute_eq!(0.95, fatigue_multiplier(3, 1.0), 1e-9);
        // endurance moderates the penalty
        assert!(fatigue_multiplier(4, 1.25) > fatigue_multiplier(4, 1.0));
    }

    #[test]
    fn elo_gap_shifts_the_blend() {
        let factors = StaticFactors::default()
            .with_player(
                "Strong",
                PlayerEntry {
                    elo: [(Surface::Hard, 2100.0)].into_iter().collect(),
                    ..Default::default()
                },
            )
            .with_player(
                "Weak",
                PlayerEntry {
                    elo: [(Surface::Hard, 1700.0)].into_iter().collect(),
                    ..Default::default()
                },
            );
        let model = PointModel::resolve(&factors, "Strong", "Weak", Surface::Hard);
        let neutral = MatchVariance::neutral();
        let prob = model.point_win_probability(Side::P1, &plain_ctx(), &neutral);
        let baseline = symmetric_model().point_win_probability(Side::P1, &plain_ctx(), &neutral);
        assert!(prob > baseline, "{prob} vs {baseline}");
        // the damped scale keeps even a 400-point gap modest
        assert!(prob < 0.75, "prob {prob}");
    }

    #[test]
    fn serve_outcomes_tally() {
        let model = symmetric_model();
        let mut rand = StdRand::seed(42);
        let neutral = MatchVariance::neutral();
        let ctx = plain_ctx();
        let (mut aces, mut faults, mut rallies) = (0, 0, 0);
        for _ in 0..10_000 {
            match model.simulate_point(Side::P1, &ctx, &neutral, &mut rand) {
                PointOutcome {
                    serve: ServeOutcome::Ace,
                    server_won,
                } => {
                    assert!(server_won);
                    aces += 1;
                }
                PointOutcome {
                    serve: ServeOutcome::DoubleFault,
                    server_won,
                } => {
                    assert!(!server_won);
                    faults += 1;
                }
                _ => rallies += 1,
            }
        }
        assert!(aces > 200 && aces < 1500, "aces {aces}");
        assert!(faults > 30 && faults < 500, "faults {faults}");
        assert!(rallies > 8_000, "rallies {rallies}");
    }

    #[test]
    fn variance_draw_stays_near_unity() {
        let mut rand = StdRand::seed(9);
        for _ in 0..100 {
            let variance = MatchVariance::draw(Surface::Hard, &mut rand);
            for side in [Side::P1, Side::P2] {
                assert!((0.9..=1.1).contains(&variance.rates(side)));
                assert!((0.88..=1.12).contains(&variance.serve_effects(side)));
            }
        }
    }
}
