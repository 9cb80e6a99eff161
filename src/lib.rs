//! A point-by-point Monte Carlo model of professional tennis matches.
//! Calibrates service/return point parameters so that repeated simulation
//! reproduces a target match-win probability — typically the vig-free
//! probability implied by a betting market — while modelling surface, fatigue,
//! clutch and rally-style effects at the point level.

pub mod calibrate;
pub mod domain;
pub mod factors;
pub mod file;
pub mod market;
pub mod mc;
pub mod model;
pub mod opt;
pub mod sim;
pub mod tuning;

#[doc = include_str!("../README.md")]
#[cfg(doc)]
fn readme() {}
