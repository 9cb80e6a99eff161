//! Core domain types: surfaces, match formats, scores and pressure situations.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

#[derive(
    Clone,
    Copy,
    Debug,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
pub enum Surface {
    Hard,
    Clay,
    Grass,
}

#[derive(
    Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum MatchFormat {
    #[default]
    BestOfThree,
    BestOfFive,
}
impl MatchFormat {
    pub fn sets_to_win(&self) -> u8 {
        match self {
            MatchFormat::BestOfThree => 2,
            MatchFormat::BestOfFive => 3,
        }
    }
}

/// One of the two players in a match. `P1` is the player the market's moneyline
/// and the calibration target refer to.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    P1,
    P2,
}
impl Side {
    pub fn flip(&self) -> Side {
        match self {
            Side::P1 => Side::P2,
            Side::P2 => Side::P1,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Side::P1 => 0,
            Side::P2 => 1,
        }
    }
}

/// Point-level win rates for one player, kept inside the safety band so that no
/// point is ever deterministic.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerPointParams {
    pub service: f64,
    pub returning: f64,
}

/// Situation tag for the current point. Derived from the score, never stored
/// independently of it.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Situation {
    #[default]
    None,
    Deuce,
    BreakPoint,
    GamePoint,
    SetPoint,
    MatchPoint,
}
impl Situation {
    pub fn is_pressure(&self) -> bool {
        !matches!(self, Situation::None)
    }
}

/// What winning the current game (or tiebreak) would clinch for either player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GameStakes {
    pub server_set_point: bool,
    pub server_match_point: bool,
    pub returner_set_point: bool,
    pub returner_match_point: bool,
}

/// Situational context of a single point, fed into the probability model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PressureContext {
    pub server_points: u8,
    pub returner_points: u8,
    pub set_number: u8,
    pub rally_length: u8,
    situation: Situation,
}
impl PressureContext {
    /// Classifies a point inside an ordinary service game.
    ///
    /// Thresholds: game point when the server has ≥3 points and leads, break
    /// point symmetrically for the returner, deuce when both have ≥3 points and
    /// are within one. A game or break point escalates to a set or match point
    /// according to `stakes`. Precedence: match > set > break/game > deuce.
    pub fn classify_game(
        server_points: u8,
        returner_points: u8,
        set_number: u8,
        rally_length: u8,
        stakes: &GameStakes,
    ) -> Self {
        let situation = if returner_points >= 3 && returner_points > server_points {
            if stakes.returner_match_point {
                Situation::MatchPoint
            } else if stakes.returner_set_point {
                Situation::SetPoint
            } else {
                Situation::BreakPoint
            }
        } else if server_points >= 3 && server_points > returner_points {
            if stakes.server_match_point {
                Situation::MatchPoint
            } else if stakes.server_set_point {
                Situation::SetPoint
            } else {
                Situation::GamePoint
            }
        } else if server_points >= 3
            && returner_points >= 3
            && server_points.abs_diff(returner_points) <= 1
        {
            Situation::Deuce
        } else {
            Situation::None
        };

        Self {
            server_points,
            returner_points,
            set_number,
            rally_length,
            situation,
        }
    }

    /// Classifies a tiebreak point. A leader at ≥6 points is one point from the
    /// set (or the match, per `stakes`); break/game/deuce tags do not apply.
    pub fn classify_tiebreak(
        server_points: u8,
        returner_points: u8,
        set_number: u8,
        rally_length: u8,
        stakes: &GameStakes,
    ) -> Self {
        let situation = if server_points >= 6 && server_points > returner_points {
            if stakes.server_match_point {
                Situation::MatchPoint
            } else {
                Situation::SetPoint
            }
        } else if returner_points >= 6 && returner_points > server_points {
            if stakes.returner_match_point {
                Situation::MatchPoint
            } else {
                Situation::SetPoint
            }
        } else {
            Situation::None
        };

        Self {
            server_points,
            returner_points,
            set_number,
            rally_length,
            situation,
        }
    }

    pub fn situation(&self) -> Situation {
        self.situation
    }
}

/// Outcome of a single game, points tallied from the server's perspective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub winner: Side,
    pub server: Side,
    pub server_points: u8,
    pub returner_points: u8,
    pub aces: u8,
    pub double_faults: u8,
}
impl GameResult {
    pub fn was_break(&self) -> bool {
        self.winner != self.server
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiebreakScore {
    pub winner_points: u8,
    pub loser_points: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetResult {
    pub winner: Side,
    pub winner_games: u8,
    pub loser_games: u8,
    pub tiebreak: Option<TiebreakScore>,
}
impl SetResult {
    /// A completed set is won by two clear games, or 7–6 via tiebreak.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match &self.tiebreak {
            Some(tiebreak) => {
                if (self.winner_games, self.loser_games) != (7, 6) {
                    anyhow::bail!(
                        "tiebreak set must finish 7-6, not {}-{}",
                        self.winner_games,
                        self.loser_games
                    );
                }
                if tiebreak.winner_points < 7
                    || tiebreak.winner_points - tiebreak.loser_points < 2
                {
                    anyhow::bail!(
                        "tiebreak must be won by two clear points from seven, not {}-{}",
                        tiebreak.winner_points,
                        tiebreak.loser_points
                    );
                }
            }
            None => {
                if self.winner_games < 6 || self.winner_games - self.loser_games < 2 {
                    anyhow::bail!(
                        "set must be won by two clear games from six, not {}-{}",
                        self.winner_games,
                        self.loser_games
                    );
                }
            }
        }
        Ok(())
    }
}

/// Per-player aggregate counters over one match, consumable by an external
/// fantasy-scoring formula.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerTotals {
    pub sets_won: u8,
    pub games_won: u16,
    pub points_won: u16,
    pub aces: u16,
    pub double_faults: u16,
    pub breaks: u16,
    pub service_points_won: u16,
    pub service_points_played: u16,
    pub return_points_won: u16,
    pub return_points_played: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub winner: Side,
    pub sets: Vec<SetResult>,
    pub totals: [PlayerTotals; 2],
}
impl MatchOutcome {
    pub fn totals(&self, side: Side) -> &PlayerTotals {
        &self.totals[side.index()]
    }

    pub fn sets_won(&self, side: Side) -> u8 {
        self.totals[side.index()].sets_won
    }

    pub fn validate(&self, format: MatchFormat) -> Result<(), anyhow::Error> {
        let needed = format.sets_to_win();
        if self.sets_won(self.winner) != needed {
            anyhow::bail!(
                "winner must take exactly {needed} sets, took {}",
                self.sets_won(self.winner)
            );
        }
        if self.sets_won(self.winner.flip()) >= needed {
            anyhow::bail!("loser cannot reach the required set count");
        }
        for set in &self.sets {
            set.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_sets_to_win() {
        assert_eq!(2, MatchFormat::BestOfThree.sets_to_win());
        assert_eq!(3, MatchFormat::BestOfFive.sets_to_win());
    }

    #[test]
    fn side_flip() {
        assert_eq!(Side::P2, Side::P1.flip());
        assert_eq!(Side::P1, Side::P2.flip());
        assert_eq!(0, Side::P1.index());
        assert_eq!(1, Side::P2.index());
    }

    #[test]
    fn surface_from_str() {
        use std::str::FromStr;
        assert_eq!(Surface::Clay, Surface::from_str("Clay").unwrap());
        assert!(Surface::from_str("Carpet").is_err());
    }

    #[test]
    fn classify_plain_points() {
        let stakes = GameStakes::default();
        assert_eq!(
            Situation::None,
            PressureContext::classify_game(0, 0, 1, 4, &stakes).situation()
        );
        assert_eq!(
            Situation::None,
            PressureContext::classify_game(2, 1, 1, 4, &stakes).situation()
        );
    }

    #[test]
    fn classify_game_and_break_points() {
        let stakes = GameStakes::default();
        // 40-0 through ad-in
        assert_eq!(
            Situation::GamePoint,
            PressureContext::classify_game(3, 0, 1, 4, &stakes).situation()
        );
        assert_eq!(
            Situation::GamePoint,
            PressureContext::classify_game(4, 3, 1, 4, &stakes).situation()
        );
        // 0-40 through ad-out
        assert_eq!(
            Situation::BreakPoint,
            PressureContext::classify_game(0, 3, 1, 4, &stakes).situation()
        );
        assert_eq!(
            Situation::BreakPoint,
            PressureContext::classify_game(3, 4, 1, 4, &stakes).situation()
        );
    }

    #[test]
    fn classify_deuce() {
        let stakes = GameStakes::default();
        assert_eq!(
            Situation::Deuce,
            PressureContext::classify_game(3, 3, 1, 4, &stakes).situation()
        );
        assert_eq!(
            Situation::Deuce,
            PressureContext::classify_game(5, 5, 1, 4, &stakes).situation()
        );
    }

    #[test]
    fn classify_escalation() {
        let stakes = GameStakes {
            server_set_point: true,
            server_match_point: false,
            returner_set_point: true,
            returner_match_point: true,
        };
        assert_eq!(
            Situation::SetPoint,
            PressureContext::classify_game(3, 1, 2, 4, &stakes).situation()
        );
        assert_eq!(
            Situation::MatchPoint,
            PressureContext::classify_game(2, 3, 2, 4, &stakes).situation()
        );
    }

    #[test]
    fn classify_tiebreak_points() {
        let stakes = GameStakes {
            server_set_point: true,
            ..Default::default()
        };
        assert_eq!(
            Situation::SetPoint,
            PressureContext::classify_tiebreak(6, 3, 1, 4, &stakes).situation()
        );
        assert_eq!(
            Situation::None,
            PressureContext::classify_tiebreak(6, 6, 1, 4, &stakes).situation()
        );
        assert_eq!(
            Situation::None,
            PressureContext::classify_tiebreak(3, 1, 1, 4, &stakes).situation()
        );
    }

    #[test]
    fn set_result_invariants() {
        assert!(SetResult {
            winner: Side::P1,
            winner_games: 6,
            loser_games: 4,
            tiebreak: None
        }
        .validate()
        .is_ok());
        assert!(SetResult {
            winner: Side::P1,
            winner_games: 7,
            loser_games: 6,
            tiebreak: Some(TiebreakScore {
                winner_points: 9,
                loser_points: 7
            })
        }
        .validate()
        .is_ok());
        assert!(SetResult {
            winner: Side::P1,
            winner_games: 6,
            loser_games: 5,
            tiebreak: None
        }
        .validate()
        .is_err());
        assert!(SetResult {
            winner: Side::P1,
            winner_games: 7,
            loser_games: 6,
            tiebreak: Some(TiebreakScore {
                winner_points: 7,
                loser_points: 6
            })
        }
        .validate()
        .is_err());
    }
}
