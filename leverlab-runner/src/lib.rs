//! LeverLab Runner — backtest orchestration and hyperparameter sweeps.
//!
//! This crate builds on `leverlab-core` to provide:
//! - TOML run configuration with a hyperparameter table
//! - CSV bar loading with a seeded synthetic fallback
//! - Single-backtest entry point with a content-addressed run id
//! - Lazy hyperparameter grid iteration
//! - Parallel sweep with per-worker panic isolation and deadlines
//! - CSV/JSON result export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod grid;
pub mod result;
pub mod score;
pub mod sweep;

pub use config::{ConfigError, ParamRange, ParamSpec, RunConfig, RunId, SymbolSettings};
pub use data_loader::{load_csv_dir, synthetic_source, LoadError};
pub use export::{write_equity_csv, write_result_files, write_trades_csv, ExportError};
pub use grid::{GridIter, ParamSet};
pub use result::BacktestResult;
pub use score::{is_better, score};
pub use sweep::{run_sweep, BestResult, SweepConfig, SweepError, SweepOutcome};

use leverlab_core::data::BarSource;
use leverlab_core::engine::run_simulation;
use leverlab_core::error::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Run one backtest with the config's base parameters.
pub fn run_once(config: &RunConfig, source: &dyn BarSource) -> Result<BacktestResult, RunError> {
    let strategy = config.strategy.build();
    let engine_config = config.to_engine_config();
    let output = run_simulation(&engine_config, source, strategy.as_ref(), None)?;
    Ok(BacktestResult::new(
        config,
        output.report,
        output.trades,
        output.equity_curve,
    ))
}
