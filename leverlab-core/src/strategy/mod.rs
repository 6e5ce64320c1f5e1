//! Strategy seam — the closed capability set the simulation loop calls.
//!
//! A strategy is four pure functions of the bar window and context: entry
//! signals, a trend filter, an exit plan, and risk sizing. The engine knows
//! nothing about their internals; concrete families are selected at
//! configuration time from `StrategyConfig`.

pub mod indicators;

mod breakout;
mod ma_cross;

pub use breakout::Breakout;
pub use ma_cross::MaCross;

use crate::domain::{Bar, Side, SymbolMeta};
use serde::{Deserialize, Serialize};

/// Trend filter output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Long,
    Short,
    Neutral,
}

/// Exit orders derived from an entry fill: take-profit levels plus an
/// optional protective stop.
#[derive(Debug, Clone, Default)]
pub struct ExitPlan {
    pub take_profits: Vec<f64>,
    pub stop_loss: Option<f64>,
}

/// Account context handed to risk sizing.
#[derive(Debug, Clone, Copy)]
pub struct RiskContext {
    pub available_balance: f64,
    pub total_balance: f64,
    pub price: f64,
    pub leverage: f64,
}

/// The strategy capability set. All methods are pure functions of their
/// arguments; the window slice is the bar history the indexer exposes.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Bars of history required before signals are meaningful.
    fn warmup(&self) -> usize;

    fn should_buy(&self, bars: &[Bar]) -> bool;

    fn should_sell(&self, bars: &[Bar]) -> bool;

    fn trend(&self, bars: &[Bar]) -> Trend;

    /// Take-profit/stop levels for a fresh entry at `entry_price`. Prices
    /// are rounded by the caller with the symbol's metadata.
    fn exit_plan(&self, entry_price: f64, bars: &[Bar], meta: &SymbolMeta, side: Side) -> ExitPlan;

    /// Unsigned order quantity for a new entry.
    fn position_size(&self, ctx: &RiskContext) -> f64;
}

/// Serializable strategy selector, the configuration-time entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyConfig {
    /// SMA crossover with an EMA trend filter.
    MaCross {
        short_period: usize,
        long_period: usize,
        trend_period: usize,
        take_profit_pct: f64,
        stop_loss_pct: f64,
        risk_fraction: f64,
    },
    /// Donchian-style channel breakout with ATR exits.
    Breakout {
        channel_period: usize,
        atr_period: usize,
        stop_atr: f64,
        take_profit_atr: f64,
        risk_fraction: f64,
    },
}

impl StrategyConfig {
    pub fn build(&self) -> Box<dyn Strategy> {
        match self {
            StrategyConfig::MaCross {
                short_period,
                long_period,
                trend_period,
                take_profit_pct,
                stop_loss_pct,
                risk_fraction,
            } => Box::new(MaCross::new(
                *short_period,
                *long_period,
                *trend_period,
                *take_profit_pct,
                *stop_loss_pct,
                *risk_fraction,
            )),
            StrategyConfig::Breakout {
                channel_period,
                atr_period,
                stop_atr,
                take_profit_atr,
                risk_fraction,
            } => Box::new(Breakout::new(
                *channel_period,
                *atr_period,
                *stop_atr,
                *take_profit_atr,
                *risk_fraction,
            )),
        }
    }
}

/// Fraction-of-balance sizing shared by the built-in families:
/// `risk_fraction · available · leverage / price`, floored at zero.
pub(crate) fn fraction_size(ctx: &RiskContext, risk_fraction: f64) -> f64 {
    if ctx.price <= 0.0 {
        return 0.0;
    }
    (risk_fraction * ctx.available_balance * ctx.leverage / ctx.price).max(0.0)
}
