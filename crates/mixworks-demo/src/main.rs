//! Run with: `cargo run --package mixworks-demo -- --pots 8 --temperature 4 --weather "light rain"`

use anyhow::Context;
use clap::Parser;
use mixworks_demo::script::{ScriptOptions, run_script};
use mixworks_demo::{DemoError, logging};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mixworks", about = "Run a scripted mixing session")]
struct Cli {
    /// Directory holding session.{ron,toml,json}; defaults apply without one.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hall to run in.
    #[arg(long, default_value_t = 1)]
    hall: u32,

    #[arg(long, default_value_t = 6)]
    pots: usize,

    #[arg(long, default_value_t = 3)]
    ingredients: usize,

    /// Temperature in °C reported by the fixed weather source.
    #[arg(long, default_value_t = 18.0, allow_negative_numbers = true)]
    temperature: f64,

    #[arg(long, default_value = "clear sky")]
    weather: String,

    /// Side length of the color grid, at most 64.
    #[arg(long, default_value_t = 6)]
    grid: usize,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let settings = match &cli.config {
        Some(dir) => mixworks_data::load_session_config(dir).map_err(|source| DemoError::Config {
            dir: dir.clone(),
            source,
        })?,
        None => Default::default(),
    };

    let options = ScriptOptions {
        hall: cli.hall,
        pots: cli.pots,
        ingredients_per_pot: cli.ingredients,
        temperature_c: cli.temperature,
        description: cli.weather,
        grid_size: cli.grid,
    };
    let report = run_script(settings, &options).context("scripted session failed")?;
    print!("{report}");
    Ok(())
}
