//! Single-backtest result bundle.

use crate::config::{RunConfig, RunId};
use leverlab_core::domain::TradeRecord;
use leverlab_core::engine::{EquitySample, StrategyReport};
use serde::{Deserialize, Serialize};

/// Everything a finished backtest produces, tagged with the config hash so
/// results can be matched back to the exact configuration that made them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub run_id: RunId,
    pub report: StrategyReport,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquitySample>,
}

impl BacktestResult {
    pub fn new(
        config: &RunConfig,
        report: StrategyReport,
        trades: Vec<TradeRecord>,
        equity_curve: Vec<EquitySample>,
    ) -> Self {
        Self {
            run_id: config.run_id(),
            report,
            trades,
            equity_curve,
        }
    }
}
