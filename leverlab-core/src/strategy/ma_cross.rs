//! SMA crossover strategy with an EMA trend filter.

use super::indicators::{ema, sma};
use super::{fraction_size, ExitPlan, RiskContext, Strategy, Trend};
use crate::domain::{Bar, Side, SymbolMeta};

/// Classic crossover: buy when the short SMA crosses above the long SMA on
/// the latest bar, sell on the opposite cross. Entries against the EMA trend
/// are filtered out by the loop via `trend()`.
#[derive(Debug, Clone)]
pub struct MaCross {
    short_period: usize,
    long_period: usize,
    trend_period: usize,
    take_profit_pct: f64,
    stop_loss_pct: f64,
    risk_fraction: f64,
}

impl MaCross {
    pub fn new(
        short_period: usize,
        long_period: usize,
        trend_period: usize,
        take_profit_pct: f64,
        stop_loss_pct: f64,
        risk_fraction: f64,
    ) -> Self {
        assert!(short_period < long_period, "short period must be < long");
        Self {
            short_period,
            long_period,
            trend_period,
            take_profit_pct,
            stop_loss_pct,
            risk_fraction,
        }
    }

    /// (short, long) SMA pair on the window ending at `bars[..len]`.
    fn cross_state(&self, bars: &[Bar]) -> Option<(f64, f64)> {
        Some((sma(bars, self.short_period)?, sma(bars, self.long_period)?))
    }
}

impl Strategy for MaCross {
    fn name(&self) -> &'static str {
        "ma_cross"
    }

    fn warmup(&self) -> usize {
        self.long_period.max(self.trend_period) + 1
    }

    fn should_buy(&self, bars: &[Bar]) -> bool {
        if bars.len() < 2 {
            return false;
        }
        let (Some((prev_s, prev_l)), Some((cur_s, cur_l))) = (
            self.cross_state(&bars[..bars.len() - 1]),
            self.cross_state(bars),
        ) else {
            return false;
        };
        prev_s <= prev_l && cur_s > cur_l
    }

    fn should_sell(&self, bars: &[Bar]) -> bool {
        if bars.len() < 2 {
            return false;
        }
        let (Some((prev_s, prev_l)), Some((cur_s, cur_l))) = (
            self.cross_state(&bars[..bars.len() - 1]),
            self.cross_state(bars),
        ) else {
            return false;
        };
        prev_s >= prev_l && cur_s < cur_l
    }

    fn trend(&self, bars: &[Bar]) -> Trend {
        let (Some(trend_ema), Some(last)) = (ema(bars, self.trend_period), bars.last()) else {
            return Trend::Neutral;
        };
        if last.close > trend_ema {
            Trend::Long
        } else if last.close < trend_ema {
            Trend::Short
        } else {
            Trend::Neutral
        }
    }

    fn exit_plan(&self, entry_price: f64, _bars: &[Bar], meta: &SymbolMeta, side: Side) -> ExitPlan {
        let sign = side.sign();
        ExitPlan {
            take_profits: vec![meta.round_price(entry_price * (1.0 + sign * self.take_profit_pct))],
            stop_loss: Some(meta.round_price(entry_price * (1.0 - sign * self.stop_loss_pct))),
        }
    }

    fn position_size(&self, ctx: &RiskContext) -> f64 {
        fraction_size(ctx, self.risk_fraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timeframe;
    use chrono::{TimeZone, Utc};

    fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let open_time = start + Timeframe::H1.duration() * i as i32;
                Bar {
                    symbol: "T".into(),
                    timeframe: Timeframe::H1,
                    open: c,
                    high: c,
                    low: c,
                    close: c,
                    volume: 1.0,
                    open_time,
                    close_time: open_time + Timeframe::H1.duration(),
                }
            })
            .collect()
    }

    fn strategy() -> MaCross {
        MaCross::new(2, 4, 4, 0.03, 0.015, 0.1)
    }

    #[test]
    fn detects_upward_cross() {
        // Downtrend then a sharp reversal: short SMA crosses above long on
        // the final bar only.
        let bars = bars_from_closes(&[10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 14.0]);
        assert!(strategy().should_buy(&bars));
        assert!(!strategy().should_sell(&bars));
    }

    #[test]
    fn detects_downward_cross() {
        let bars = bars_from_closes(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 6.0]);
        assert!(strategy().should_sell(&bars));
        assert!(!strategy().should_buy(&bars));
    }

    #[test]
    fn no_signal_without_history() {
        let bars = bars_from_closes(&[10.0, 11.0]);
        assert!(!strategy().should_buy(&bars));
        assert!(!strategy().should_sell(&bars));
    }

    #[test]
    fn exit_plan_brackets_entry() {
        let meta = SymbolMeta::new("T", 2, 3);
        let plan = strategy().exit_plan(100.0, &[], &meta, Side::Long);
        assert_eq!(plan.take_profits, vec![103.0]);
        assert_eq!(plan.stop_loss, Some(98.5));

        let short_plan = strategy().exit_plan(100.0, &[], &meta, Side::Short);
        assert_eq!(short_plan.take_profits, vec![97.0]);
        assert_eq!(short_plan.stop_loss, Some(101.5));
    }
}
