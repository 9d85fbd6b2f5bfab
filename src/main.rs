#![warn(clippy::pedantic, rust_2018_idioms)]

mod audit;
mod bases;
mod config;
mod gamelog;
mod inning;
mod matrix;
mod neutral;
mod outcome;
mod play;
mod re24;
mod read_dir;
mod season;

use crate::config::Config;
use crate::gamelog::Gamelog;
use crate::matrix::MatrixStore;
use crate::season::Context;
use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::parse();
    let cache_dir = config.cache_dir()?;
    let gamelog = Gamelog::load(
        &config.gamelogs,
        cache_dir.as_deref(),
        config.occupancy_layout,
    )?;

    let context = Context {
        store: MatrixStore::new(&config.out),
        legacy: config.legacy_seasons.iter().copied().collect(),
        current: config.current_season.or_else(|| gamelog.latest_season()),
    };
    info!(current = ?context.current, legacy = ?context.legacy, "processing seasons");

    for report in season::process_all(&gamelog, &context) {
        report.export(&config.out)?;
        println!(
            "{}: {} plays, league nERA {:.2}, {}",
            report.season,
            report.plays.len(),
            report.league_neutral_era,
            report.audit
        );
    }
    Ok(())
}
