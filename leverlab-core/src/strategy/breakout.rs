//! Donchian-style channel breakout with ATR-scaled exits.

use super::indicators::{atr, highest_high, lowest_low};
use super::{fraction_size, ExitPlan, RiskContext, Strategy, Trend};
use crate::domain::{Bar, Side, SymbolMeta};

/// Breakout entry: the latest close pierces the channel formed by the
/// previous `channel_period` bars. Exits are placed `stop_atr` / `take_profit_atr`
/// true ranges away from the entry.
#[derive(Debug, Clone)]
pub struct Breakout {
    channel_period: usize,
    atr_period: usize,
    stop_atr: f64,
    take_profit_atr: f64,
    risk_fraction: f64,
}

impl Breakout {
    pub fn new(
        channel_period: usize,
        atr_period: usize,
        stop_atr: f64,
        take_profit_atr: f64,
        risk_fraction: f64,
    ) -> Self {
        Self {
            channel_period,
            atr_period,
            stop_atr,
            take_profit_atr,
            risk_fraction,
        }
    }
}

impl Strategy for Breakout {
    fn name(&self) -> &'static str {
        "breakout"
    }

    fn warmup(&self) -> usize {
        self.channel_period.max(self.atr_period) + 1
    }

    fn should_buy(&self, bars: &[Bar]) -> bool {
        match (highest_high(bars, self.channel_period), bars.last()) {
            (Some(ceiling), Some(last)) => last.close > ceiling,
            _ => false,
        }
    }

    fn should_sell(&self, bars: &[Bar]) -> bool {
        match (lowest_low(bars, self.channel_period), bars.last()) {
            (Some(floor), Some(last)) => last.close < floor,
            _ => false,
        }
    }

    // Breakouts are their own trend confirmation.
    fn trend(&self, _bars: &[Bar]) -> Trend {
        Trend::Neutral
    }

    fn exit_plan(&self, entry_price: f64, bars: &[Bar], meta: &SymbolMeta, side: Side) -> ExitPlan {
        let Some(range) = atr(bars, self.atr_period) else {
            return ExitPlan::default();
        };
        let sign = side.sign();
        ExitPlan {
            take_profits: vec![
                meta.round_price(entry_price + sign * self.take_profit_atr * range),
            ],
            stop_loss: Some(meta.round_price(entry_price - sign * self.stop_atr * range)),
        }
    }

    fn position_size(&self, ctx: &RiskContext) -> f64 {
        fraction_size(ctx, self.risk_fraction)
    }
}
