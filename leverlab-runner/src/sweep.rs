//! Parallel hyperparameter sweep.
//!
//! Combinations stream out of the lazy grid in batches and fan out across a
//! rayon pool sized to leave one core for the host. Each worker runs one
//! full backtest under `catch_unwind` with a cooperative deadline, so a
//! panicking or runaway combination costs only its own result. Only the
//! current best result is retained.

use crate::config::RunConfig;
use crate::grid::{GridIter, ParamSet};
use crate::score::{is_better, score};
use leverlab_core::data::BarSource;
use leverlab_core::engine::{run_simulation, StrategyReport};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("hyperparameter grid is empty")]
    EmptyGrid,
}

/// Sweep tuning knobs, independent of the backtest itself.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Per-combination wall-clock budget; exceeding it discards the result.
    pub worker_timeout: Duration,
    /// Batch sizing aims for batches of roughly this duration.
    pub target_batch_duration: Duration,
    pub max_batch: usize,
    /// Worker count; None derives cores - 1 (min 1).
    pub threads: Option<usize>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            worker_timeout: Duration::from_secs(300),
            target_batch_duration: Duration::from_secs(10),
            max_batch: 4096,
            threads: None,
        }
    }
}

impl SweepConfig {
    fn thread_count(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1))
                .unwrap_or(1)
                .max(1)
        })
    }
}

/// The winning combination at sweep end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestResult {
    pub params: ParamSet,
    pub report: StrategyReport,
    pub score: f64,
}

/// Summary of a completed sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub best: Option<BestResult>,
    /// Combinations that produced a report.
    pub evaluated: usize,
    /// Combinations discarded for panicking, timing out, or failing.
    pub failed: usize,
}

/// Grow batches while they finish fast, shrink them when they drag,
/// keeping at least one combination per worker in flight.
fn next_batch_size(
    current: usize,
    elapsed: Duration,
    target: Duration,
    floor: usize,
    cap: usize,
) -> usize {
    if elapsed < target / 2 {
        (current * 2).min(cap)
    } else if elapsed > target * 2 {
        (current / 2).max(floor)
    } else {
        current
    }
}

/// Evaluate one combination. Panics and engine errors are absorbed here so
/// the pool never unwinds.
fn evaluate(
    base: &RunConfig,
    source: &dyn BarSource,
    params: &ParamSet,
    deadline: Instant,
) -> Option<StrategyReport> {
    let strategy_config = base.strategy_with_overrides(params);
    let engine_config = base.to_engine_config();
    let result = catch_unwind(AssertUnwindSafe(|| {
        let strategy = strategy_config.build();
        run_simulation(&engine_config, source, strategy.as_ref(), Some(deadline))
    }));
    match result {
        Ok(Ok(output)) => Some(output.report),
        Ok(Err(err)) => {
            tracing::warn!(?params, error = %err, "combination failed, discarding");
            None
        }
        Err(_) => {
            tracing::warn!(?params, "combination panicked, discarding");
            None
        }
    }
}

/// Run the full sweep over `base.params`, returning the best surviving
/// combination.
pub fn run_sweep(
    base: &RunConfig,
    source: &dyn BarSource,
    sweep: &SweepConfig,
) -> Result<SweepOutcome, SweepError> {
    let mut grid = GridIter::new(&base.params);
    let total = grid.total();
    if total == 0 {
        return Err(SweepError::EmptyGrid);
    }

    let threads = sweep.thread_count();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    tracing::info!(total, threads, "starting sweep");

    let mut best: Option<BestResult> = None;
    let mut evaluated = 0usize;
    let mut failed = 0usize;
    let mut batch_size = threads;
    let sweep_start = Instant::now();

    loop {
        let batch = grid.take_batch(batch_size);
        if batch.is_empty() {
            break;
        }
        let batch_len = batch.len();
        let batch_start = Instant::now();

        let reports: Vec<(ParamSet, Option<StrategyReport>)> = pool.install(|| {
            batch
                .into_par_iter()
                .map(|params| {
                    let deadline = Instant::now() + sweep.worker_timeout;
                    let report = evaluate(base, source, &params, deadline);
                    (params, report)
                })
                .collect()
        });

        for (params, report) in reports {
            match report {
                Some(report) => {
                    evaluated += 1;
                    let replace = match &best {
                        None => true,
                        Some(incumbent) => is_better(&report, &incumbent.report),
                    };
                    if replace {
                        let best_score = score(&report);
                        tracing::debug!(?params, score = best_score, "new best");
                        best = Some(BestResult {
                            params,
                            report,
                            score: best_score,
                        });
                    }
                }
                None => failed += 1,
            }
        }

        let elapsed = batch_start.elapsed();
        batch_size = next_batch_size(
            batch_size,
            elapsed,
            sweep.target_batch_duration,
            threads,
            sweep.max_batch,
        );
        tracing::debug!(
            batch_len,
            batch_ms = elapsed.as_millis() as u64,
            evaluated,
            failed,
            "batch done"
        );
    }

    tracing::info!(
        evaluated,
        failed,
        elapsed_s = sweep_start.elapsed().as_secs(),
        "sweep finished"
    );
    Ok(SweepOutcome {
        best,
        evaluated,
        failed,
    })
}
