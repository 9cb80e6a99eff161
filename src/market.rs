//! Betting-market records and the conversion of American-odds moneylines to
//! outcome probabilities, including removal of the bookmaker margin (vig).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{MatchFormat, Surface};

/// Converts American odds to the implied probability. Positive odds quote the
/// underdog (`+150` → 0.4), non-positive odds the favourite (`-200` → 2/3).
pub fn american_to_probability(odds: i32) -> f64 {
    if odds > 0 {
        100.0 / (odds as f64 + 100.0)
    } else {
        let staked = odds.unsigned_abs() as f64;
        staked / (staked + 100.0)
    }
}

/// Converts a probability back to American odds, truncating toward zero.
/// Round-trips [`american_to_probability`] within ±2.
pub fn probability_to_american(probability: f64) -> i32 {
    if probability >= 0.5 {
        (-100.0 * probability / (1.0 - probability)) as i32
    } else {
        (100.0 * (1.0 - probability) / probability) as i32
    }
}

/// Removes the vig by proportional normalisation; the results always sum to
/// one, whatever the booksum of the inputs.
pub fn remove_vig(prob1: f64, prob2: f64) -> (f64, f64) {
    let booksum = prob1 + prob2;
    (prob1 / booksum, prob2 / booksum)
}

#[derive(Clone, Debug, PartialEq)]
pub struct MoneylineAnalysis {
    pub p1_implied: f64,
    pub p2_implied: f64,
    pub p1_probability: f64,
    pub p2_probability: f64,
    pub vig: f64,
}

/// Derives fair win probabilities from a two-way moneyline.
pub fn analyse_moneyline(ml1: i32, ml2: i32) -> MoneylineAnalysis {
    let p1_implied = american_to_probability(ml1);
    let p2_implied = american_to_probability(ml2);
    let (p1_probability, p2_probability) = remove_vig(p1_implied, p2_implied);
    MoneylineAnalysis {
        p1_implied,
        p2_implied,
        p1_probability,
        p2_probability,
        vig: p1_implied + p2_implied - 1.0,
    }
}

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("market is missing a moneyline for one or both players")]
    MissingMoneyline,
}

/// A two-way tennis match market as sourced from a bookmaker. Spread fields
/// are carried for completeness but only the moneyline drives calibration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BettingMarket {
    pub player1: String,
    pub player2: String,
    #[serde(default)]
    pub player1_ml: Option<i32>,
    #[serde(default)]
    pub player2_ml: Option<i32>,
    #[serde(default)]
    pub set_spread: Option<f64>,
    #[serde(default)]
    pub set_spread_odds: Option<i32>,
    #[serde(default)]
    pub games_spread: Option<f64>,
    #[serde(default)]
    pub games_spread_odds: Option<i32>,
    pub surface: Surface,
    #[serde(default)]
    pub format: MatchFormat,
}
impl BettingMarket {
    pub fn analyse(&self) -> Result<MoneylineAnalysis, MarketError> {
        match (self.player1_ml, self.player2_ml) {
            (Some(ml1), Some(ml2)) => Ok(analyse_moneyline(ml1, ml2)),
            _ => Err(MarketError::MissingMoneyline),
        }
    }
}
