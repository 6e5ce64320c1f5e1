//! Engine configuration and the explicit per-run state struct.

use crate::domain::{SymbolMeta, Timeframe, TradeRecord, Wallet};
use crate::engine::ledger::FeeSchedule;
use crate::engine::liquidation::DEFAULT_MAINTENANCE_RATE;
use crate::engine::matching::{MatchingEngine, TieBreak};
use crate::engine::stats::StatsAggregator;
use crate::engine::window::{Window, DEFAULT_MAX_WINDOW};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-symbol run settings.
#[derive(Debug, Clone)]
pub struct SymbolConfig {
    pub meta: SymbolMeta,
    /// Timeframes to maintain windows for. Must contain `trading_timeframe`.
    pub timeframes: Vec<Timeframe>,
    /// Timeframe on which the strategy callbacks fire.
    pub trading_timeframe: Timeframe,
    pub leverage: f64,
}

impl SymbolConfig {
    pub fn new(meta: SymbolMeta, trading_timeframe: Timeframe, leverage: f64) -> Self {
        Self {
            meta,
            timeframes: vec![trading_timeframe],
            trading_timeframe,
            leverage,
        }
    }

    /// Finest timeframe this symbol maintains; drives matching and pricing.
    pub fn price_timeframe(&self) -> Timeframe {
        self.timeframes
            .iter()
            .copied()
            .min()
            .unwrap_or(self.trading_timeframe)
    }
}

/// Full engine configuration for one run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub initial_balance: f64,
    pub start: DateTime<Utc>,
    /// Inclusive end of the simulated clock.
    pub end: DateTime<Utc>,
    pub fees: FeeSchedule,
    pub maintenance_rate: f64,
    /// Window indexer page size.
    pub max_window: usize,
    pub tie_break: TieBreak,
    /// Force-close a position held longer than this many trading-timeframe
    /// ticks. None disables the time stop.
    pub max_holding_bars: Option<u32>,
    pub symbols: Vec<SymbolConfig>,
}

impl EngineConfig {
    pub fn new(initial_balance: f64, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            initial_balance,
            start,
            end,
            fees: FeeSchedule::default(),
            maintenance_rate: DEFAULT_MAINTENANCE_RATE,
            max_window: DEFAULT_MAX_WINDOW,
            tie_break: TieBreak::default(),
            max_holding_bars: None,
            symbols: Vec::new(),
        }
    }

    /// Smallest timeframe across all symbols — the clock's tick step.
    pub fn tick_timeframe(&self) -> Option<Timeframe> {
        self.symbols
            .iter()
            .flat_map(|s| s.timeframes.iter().copied())
            .min()
    }
}

/// One equity curve sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquitySample {
    pub time: DateTime<Utc>,
    pub total_balance: f64,
    pub unrealized_pnl: f64,
}

/// All mutable state of one simulation run, owned exclusively by the loop —
/// nothing here is shared between concurrent runs.
#[derive(Debug)]
pub struct EngineState {
    pub clock: DateTime<Utc>,
    pub wallet: Wallet,
    pub matching: MatchingEngine,
    pub stats: StatsAggregator,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquitySample>,
    /// Sliding window per (symbol, timeframe).
    pub windows: HashMap<(String, Timeframe), Window>,
    /// Index into each symbol's price-timeframe series up to which pending
    /// orders have already been matched.
    pub matched_through: HashMap<String, usize>,
    /// Remaining trading-timeframe ticks before the time stop fires.
    pub holding_counters: HashMap<String, u32>,
    /// Realized PnL accumulated since the position was last opened; reported
    /// to the aggregator as one closed trade when the position flattens.
    pub episode_pnl: HashMap<String, f64>,
    next_order_id: u64,
    pub ticks: u64,
}

impl EngineState {
    pub fn new(config: &EngineConfig) -> Self {
        let mut windows = HashMap::new();
        for symbol in &config.symbols {
            for &timeframe in &symbol.timeframes {
                windows.insert(
                    (symbol.meta.symbol.clone(), timeframe),
                    Window::new(config.max_window),
                );
            }
        }
        Self {
            clock: config.start,
            wallet: Wallet::new(config.initial_balance),
            matching: MatchingEngine::new(config.tie_break),
            stats: StatsAggregator::new(config.initial_balance),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            windows,
            matched_through: HashMap::new(),
            holding_counters: HashMap::new(),
            episode_pnl: HashMap::new(),
            next_order_id: 0,
            ticks: 0,
        }
    }

    pub fn next_order_id(&mut self) -> u64 {
        self.next_order_id += 1;
        self.next_order_id
    }
}

/// Output of a completed run, including the final wallet snapshot for
/// inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub report: crate::engine::stats::StrategyReport,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquitySample>,
    pub wallet: Wallet,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn tick_timeframe_is_smallest_across_symbols() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut config = EngineConfig::new(10_000.0, start, start);
        let mut btc = SymbolConfig::new(SymbolMeta::new("BTC-USDT", 2, 3), Timeframe::H1, 1.0);
        btc.timeframes = vec![Timeframe::M15, Timeframe::H1];
        btc.trading_timeframe = Timeframe::H1;
        config.symbols.push(btc);
        config.symbols.push(SymbolConfig::new(
            SymbolMeta::new("ETH-USDT", 2, 3),
            Timeframe::H4,
            1.0,
        ));

        assert_eq!(config.tick_timeframe(), Some(Timeframe::M15));
    }

    #[test]
    fn state_initializes_windows_per_timeframe() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut config = EngineConfig::new(10_000.0, start, start);
        let mut btc = SymbolConfig::new(SymbolMeta::new("BTC-USDT", 2, 3), Timeframe::H1, 1.0);
        btc.timeframes = vec![Timeframe::M15, Timeframe::H1];
        config.symbols.push(btc);

        let state = EngineState::new(&config);
        assert_eq!(state.windows.len(), 2);
        assert_eq!(state.wallet.total, 10_000.0);
    }

    #[test]
    fn order_ids_are_monotonic() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let config = EngineConfig::new(10_000.0, start, start);
        let mut state = EngineState::new(&config);
        let a = state.next_order_id();
        let b = state.next_order_id();
        assert!(b > a);
    }
}
