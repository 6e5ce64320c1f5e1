//! LeverLab CLI — run and sweep commands.
//!
//! Commands:
//! - `run` — execute one backtest from a TOML config file
//! - `sweep` — optimize the config's hyperparameter table in parallel

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use leverlab_core::data::InMemorySource;
use leverlab_runner::{
    load_csv_dir, run_once, run_sweep, synthetic_source, write_result_files, RunConfig,
    SweepConfig, SweepOutcome,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "leverlab",
    about = "LeverLab CLI — leveraged backtesting and parameter sweeps"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Directory of <symbol>-<timeframe>.csv bar files.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Use seeded synthetic data instead of CSV files.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Seed for synthetic data.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output directory for trades/equity CSV and report JSON.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Optimize the config's hyperparameter table in parallel.
    Sweep {
        /// Path to a TOML config file with a [params] table.
        #[arg(long)]
        config: PathBuf,

        /// Directory of <symbol>-<timeframe>.csv bar files.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Use seeded synthetic data instead of CSV files.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Seed for synthetic data.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Per-combination time budget in seconds.
        #[arg(long, default_value_t = 300)]
        timeout_secs: u64,

        /// Worker thread count. Defaults to available cores minus one.
        #[arg(long)]
        threads: Option<usize>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            data_dir,
            synthetic,
            seed,
            output_dir,
        } => run_cmd(&config, data_dir.as_deref(), synthetic, seed, &output_dir),
        Commands::Sweep {
            config,
            data_dir,
            synthetic,
            seed,
            timeout_secs,
            threads,
        } => sweep_cmd(
            &config,
            data_dir.as_deref(),
            synthetic,
            seed,
            timeout_secs,
            threads,
        ),
    }
}

fn load_source(
    config: &RunConfig,
    data_dir: Option<&Path>,
    synthetic: bool,
    seed: u64,
) -> Result<InMemorySource> {
    match (data_dir, synthetic) {
        (Some(_), true) => bail!("--data-dir and --synthetic are mutually exclusive"),
        (Some(dir), false) => {
            load_csv_dir(dir, config).with_context(|| format!("loading bars from {}", dir.display()))
        }
        (None, true) => Ok(synthetic_source(config, seed)),
        (None, false) => bail!("one of --data-dir or --synthetic is required"),
    }
}

fn run_cmd(
    config_path: &Path,
    data_dir: Option<&Path>,
    synthetic: bool,
    seed: u64,
    output_dir: &Path,
) -> Result<()> {
    let config = RunConfig::from_toml_file(config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let source = load_source(&config, data_dir, synthetic, seed)?;

    tracing::info!(run_id = %config.run_id(), "starting backtest");
    let result = run_once(&config, &source)?;
    print_report(&result.report);
    println!("Trades: {}", result.trades.len());

    write_result_files(output_dir, &result)?;
    println!(
        "Artifacts saved to {} (run {})",
        output_dir.display(),
        &result.run_id[..12]
    );
    Ok(())
}

fn sweep_cmd(
    config_path: &Path,
    data_dir: Option<&Path>,
    synthetic: bool,
    seed: u64,
    timeout_secs: u64,
    threads: Option<usize>,
) -> Result<()> {
    let config = RunConfig::from_toml_file(config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let source = load_source(&config, data_dir, synthetic, seed)?;

    let sweep = SweepConfig {
        worker_timeout: Duration::from_secs(timeout_secs),
        threads,
        ..SweepConfig::default()
    };
    let outcome = run_sweep(&config, &source, &sweep)?;
    print_outcome(&outcome);
    Ok(())
}

fn print_report(report: &leverlab_core::engine::StrategyReport) {
    println!("=== Backtest Report ===");
    println!("Initial balance:  {:>14.2}", report.initial_balance);
    println!("Final balance:    {:>14.2}", report.final_balance);
    println!("ROI:              {:>13.2}%", report.roi * 100.0);
    println!("Net profit:       {:>14.2}", report.total_net_profit);
    println!("Fees paid:        {:>14.2}", report.total_fees);
    println!(
        "Trades:           {:>8} ({} wins / {} losses, {} liquidations)",
        report.total_trades, report.total_wins, report.total_losses, report.total_liquidations
    );
    println!("Win rate:         {:>13.2}%", report.win_rate * 100.0);
    println!("Profit factor:    {:>14.3}", report.profit_factor);
    println!(
        "Max drawdown:     {:>13.2}%",
        report.max_relative_drawdown * 100.0
    );
}

fn print_outcome(outcome: &SweepOutcome) {
    println!("=== Sweep Result ===");
    println!(
        "Evaluated: {} combinations ({} discarded)",
        outcome.evaluated, outcome.failed
    );
    match &outcome.best {
        None => println!("No combination produced a result."),
        Some(best) => {
            println!("Best score: {:.4}", best.score);
            for (name, value) in &best.params {
                println!("  {name} = {value}");
            }
            print_report(&best.report);
        }
    }
}
