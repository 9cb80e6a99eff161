use std::env;
use std::error::Error;
use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use stanza::style::{HAlign, Header, MinWidth, Styles};
use stanza::table::{Col, Row, Table};
use tracing::{debug, info};

use topspin::calibrate::{Calibrator, Config, DataPolicy, MIN_VALIDATION_SAMPLES};
use topspin::domain::{MatchFormat, MatchOutcome, Side, Surface};
use topspin::factors::NoFactors;
use topspin::file::read_json;
use topspin::market::{probability_to_american, BettingMarket};
use topspin::model::PointModel;
use topspin::sim::MatchSim;
use topspin::tuning::clamp_to;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// file to source the market data from
    #[clap(short = 'f', long)]
    file: Option<PathBuf>,

    /// moneyline for player 1 (American odds)
    #[clap(long)]
    ml1: Option<i32>,

    /// moneyline for player 2 (American odds)
    #[clap(long)]
    ml2: Option<i32>,

    /// court surface
    #[clap(short, long, default_value = "Hard")]
    surface: Surface,

    /// best-of-5 format
    #[clap(long)]
    best_of_5: bool,

    /// number of full match simulations
    #[clap(short = 'n', long, default_value_t = 1_000)]
    simulations: u64,

    /// randomness seed
    #[clap(long, default_value_t = 42)]
    seed: u64,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.file.is_none() && (self.ml1.is_none() || self.ml2.is_none())
            || self.file.is_some() && (self.ml1.is_some() || self.ml2.is_some())
        {
            bail!("either the -f flag or both --ml1 and --ml2 must be specified");
        }
        if self.simulations == 0 {
            bail!("at least one simulation must be requested");
        }
        Ok(())
    }

    fn market(&self) -> Result<BettingMarket, Box<dyn Error>> {
        match &self.file {
            Some(path) => Ok(read_json(path)?),
            None => Ok(BettingMarket {
                player1: "Player 1".into(),
                player2: "Player 2".into(),
                player1_ml: self.ml1,
                player2_ml: self.ml2,
                set_spread: None,
                set_spread_odds: None,
                games_spread: None,
                games_spread_odds: None,
                surface: self.surface,
                format: if self.best_of_5 {
                    MatchFormat::BestOfFive
                } else {
                    MatchFormat::BestOfThree
                },
            }),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    args.validate()?;
    debug!("args: {args:?}");

    let market = args.market()?;
    let analysis = market.analyse()?;
    info!(
        "{} vs {} on {}: implied {:.3}/{:.3}, vig {:.3}",
        market.player1,
        market.player2,
        market.surface,
        analysis.p1_implied,
        analysis.p2_implied,
        analysis.vig
    );

    let mut calibrator = Calibrator::try_from(Config {
        format: market.format,
        seed: args.seed,
        ..Config::default()
    })?;
    let params = calibrator.calibrate_market(&market, &NoFactors, DataPolicy::AllowDefaults)?;
    if !params.converged {
        info!(
            "calibration exhausted its budget; best error {:.4} after {} steps",
            params.error, params.steps
        );
    }
    let report = calibrator.validate(&params, MIN_VALIDATION_SAMPLES);

    let model = PointModel::from_params(params.p1, params.p2, market.surface);
    let sim = MatchSim::new(&model, market.format);
    let mut engine = topspin::mc::MonteCarloEngine::new(args.seed.wrapping_add(2))
        .with_iterations(args.simulations);
    let mut aggregates = Aggregates::default();
    let p1_rate = engine.estimate(|rand| {
        let outcome = sim.simulate(rand);
        aggregates.absorb(&outcome);
        outcome.winner == Side::P1
    });

    let table = tabulate(&market, &params, &report, p1_rate, &aggregates);
    println!("{}", Console::default().render(&table));
    Ok(())
}

#[derive(Debug, Default)]
struct Aggregates {
    matches: u64,
    games: u64,
    aces: [u64; 2],
    double_faults: [u64; 2],
    breaks: [u64; 2],
    straight_sets: u64,
}
impl Aggregates {
    fn absorb(&mut self, outcome: &MatchOutcome) {
        self.matches += 1;
        for side in [Side::P1, Side::P2] {
            let totals = outcome.totals(side);
            self.games += totals.games_won as u64;
            self.aces[side.index()] += totals.aces as u64;
            self.double_faults[side.index()] += totals.double_faults as u64;
            self.breaks[side.index()] += totals.breaks as u64;
        }
        if outcome.sets_won(outcome.winner.flip()) == 0 {
            self.straight_sets += 1;
        }
    }

    fn per_match(&self, counts: &[u64; 2], side: Side) -> f64 {
        counts[side.index()] as f64 / self.matches as f64
    }
}

fn tabulate(
    market: &BettingMarket,
    params: &topspin::calibrate::CalibratedParams,
    report: &topspin::calibrate::ValidationReport,
    p1_rate: f64,
    aggregates: &Aggregates,
) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(24))),
            Col::new(Styles::default().with(MinWidth(14)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(14)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "".into(),
                market.player1.as_str().into(),
                market.player2.as_str().into(),
            ],
        ));

    let fair = |probability: f64| {
        probability_to_american(clamp_to(probability, &(0.01..=0.99)))
    };
    let rows: Vec<(String, String, String)> = vec![
        (
            "Target probability".into(),
            format!("{:.3}", params.target),
            format!("{:.3}", 1.0 - params.target),
        ),
        (
            "Validated probability".into(),
            format!("{:.3}", report.achieved),
            format!("{:.3}", 1.0 - report.achieved),
        ),
        (
            "Validation error".into(),
            format!("{:.1}pp", report.error_pct),
            if report.within_tolerance {
                "ok".into()
            } else {
                "out of tolerance".into()
            },
        ),
        (
            "Fair price".into(),
            format!("{:+}", fair(report.achieved)),
            format!("{:+}", fair(1.0 - report.achieved)),
        ),
        (
            "Calibrated serve/return".into(),
            format!("{:.3}/{:.3}", params.p1.service, params.p1.returning),
            format!("{:.3}/{:.3}", params.p2.service, params.p2.returning),
        ),
        (
            "Full-sim win rate".into(),
            format!("{:.3}", p1_rate),
            format!("{:.3}", 1.0 - p1_rate),
        ),
        (
            "Aces per match".into(),
            format!("{:.1}", aggregates.per_match(&aggregates.aces, Side::P1)),
            format!("{:.1}", aggregates.per_match(&aggregates.aces, Side::P2)),
        ),
        (
            "Double faults per match".into(),
            format!(
                "{:.1}",
                aggregates.per_match(&aggregates.double_faults, Side::P1)
            ),
            format!(
                "{:.1}",
                aggregates.per_match(&aggregates.double_faults, Side::P2)
            ),
        ),
        (
            "Breaks per match".into(),
            format!("{:.1}", aggregates.per_match(&aggregates.breaks, Side::P1)),
            format!("{:.1}", aggregates.per_match(&aggregates.breaks, Side::P2)),
        ),
        (
            "Games per match".into(),
            format!("{:.1}", aggregates.games as f64 / aggregates.matches as f64),
            "".into(),
        ),
        (
            "Straight-sets rate".into(),
            format!(
                "{:.3}",
                aggregates.straight_sets as f64 / aggregates.matches as f64
            ),
            "".into(),
        ),
    ];
    for (label, p1, p2) in rows {
        table.push_row(Row::new(
            Styles::default(),
            vec![label.into(), p1.into(), p2.into()],
        ));
    }
    table
}
