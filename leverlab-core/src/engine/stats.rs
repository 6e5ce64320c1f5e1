//! Statistics aggregator — incremental drawdown/streak tracking and the
//! final strategy report.
//!
//! Updated after every balance-affecting event; `finalize()` derives the
//! ratios, guarding every division against a zero denominator (zero trades
//! degrade to zeroed metrics, never to an error).

use serde::{Deserialize, Serialize};

/// Flat record of run metrics, recomputed at run end from the wallet plus
/// the aggregated counters. Not authoritative until finalized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyReport {
    pub initial_balance: f64,
    pub final_balance: f64,
    pub roi: f64,
    pub total_net_profit: f64,
    pub total_fees: f64,
    pub total_trades: usize,
    pub total_wins: usize,
    pub total_losses: usize,
    pub total_liquidations: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_profit: f64,
    pub avg_loss: f64,
    pub max_profit_trade: f64,
    pub max_loss_trade: f64,
    /// Lowest balance/peak ratio observed (1.0 = never under water).
    pub max_absolute_drawdown: f64,
    /// Most negative (balance - peak)/peak observed.
    pub max_relative_drawdown: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub max_consecutive_profit: f64,
    pub max_consecutive_loss: f64,
}

/// Running accumulator fed by the simulation loop.
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    initial_balance: f64,
    peak_balance: f64,
    max_absolute_drawdown: f64,
    max_relative_drawdown: f64,

    total_profit: f64,
    total_loss: f64,
    total_fees: f64,
    wins: usize,
    losses: usize,
    liquidations: usize,
    max_profit_trade: f64,
    max_loss_trade: f64,

    // Current streak: positive count = winning, negative = losing.
    streak_count: i64,
    streak_pnl: f64,
    max_win_streak: usize,
    max_loss_streak: usize,
    max_streak_profit: f64,
    max_streak_loss: f64,
}

impl StatsAggregator {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            initial_balance,
            peak_balance: initial_balance,
            max_absolute_drawdown: 1.0,
            max_relative_drawdown: 0.0,
            total_profit: 0.0,
            total_loss: 0.0,
            total_fees: 0.0,
            wins: 0,
            losses: 0,
            liquidations: 0,
            max_profit_trade: 0.0,
            max_loss_trade: 0.0,
            streak_count: 0,
            streak_pnl: 0.0,
            max_win_streak: 0,
            max_loss_streak: 0,
            max_streak_profit: 0.0,
            max_streak_loss: 0.0,
        }
    }

    /// Record the total balance after any balance-affecting event.
    pub fn on_balance(&mut self, balance: f64) {
        if balance > self.peak_balance {
            self.peak_balance = balance;
        }
        if self.peak_balance > 0.0 {
            let absolute = balance / self.peak_balance;
            if absolute < self.max_absolute_drawdown {
                self.max_absolute_drawdown = absolute;
            }
            let relative = (balance - self.peak_balance) / self.peak_balance;
            if relative < self.max_relative_drawdown {
                self.max_relative_drawdown = relative;
            }
        }
    }

    pub fn on_fee(&mut self, fee: f64) {
        self.total_fees += fee;
    }

    /// Record one closed trade's realized PnL.
    ///
    /// The streak resets whenever the sign of the next PnL differs from the
    /// running streak's sign.
    pub fn on_closed_trade(&mut self, realized_pnl: f64, liquidated: bool) {
        if liquidated {
            self.liquidations += 1;
        }

        if realized_pnl >= 0.0 {
            self.wins += 1;
            self.total_profit += realized_pnl;
            if realized_pnl > self.max_profit_trade {
                self.max_profit_trade = realized_pnl;
            }
            if self.streak_count < 0 {
                self.streak_count = 0;
                self.streak_pnl = 0.0;
            }
            self.streak_count += 1;
            self.streak_pnl += realized_pnl;
            self.max_win_streak = self.max_win_streak.max(self.streak_count as usize);
            self.max_streak_profit = self.max_streak_profit.max(self.streak_pnl);
        } else {
            self.losses += 1;
            self.total_loss += realized_pnl;
            if realized_pnl < self.max_loss_trade {
                self.max_loss_trade = realized_pnl;
            }
            if self.streak_count > 0 {
                self.streak_count = 0;
                self.streak_pnl = 0.0;
            }
            self.streak_count -= 1;
            self.streak_pnl += realized_pnl;
            self.max_loss_streak = self.max_loss_streak.max((-self.streak_count) as usize);
            self.max_streak_loss = self.max_streak_loss.min(self.streak_pnl);
        }
    }

    /// Derive the final report from the accumulated counters.
    pub fn finalize(&self, final_balance: f64) -> StrategyReport {
        let total_trades = self.wins + self.losses;
        let gross_loss = self.total_loss.abs();

        let win_rate = if total_trades > 0 {
            self.wins as f64 / total_trades as f64
        } else {
            0.0
        };
        let profit_denominator = gross_loss + self.total_fees;
        let profit_factor = if profit_denominator > 0.0 {
            self.total_profit / profit_denominator
        } else {
            0.0
        };
        let avg_profit = if self.wins > 0 {
            self.total_profit / self.wins as f64
        } else {
            0.0
        };
        let avg_loss = if self.losses > 0 {
            self.total_loss / self.losses as f64
        } else {
            0.0
        };
        let roi = if self.initial_balance > 0.0 {
            (final_balance - self.initial_balance) / self.initial_balance
        } else {
            0.0
        };

        StrategyReport {
            initial_balance: self.initial_balance,
            final_balance,
            roi,
            total_net_profit: final_balance - self.initial_balance,
            total_fees: self.total_fees,
            total_trades,
            total_wins: self.wins,
            total_losses: self.losses,
            total_liquidations: self.liquidations,
            win_rate,
            profit_factor,
            avg_profit,
            avg_loss,
            max_profit_trade: self.max_profit_trade,
            max_loss_trade: self.max_loss_trade,
            max_absolute_drawdown: self.max_absolute_drawdown,
            max_relative_drawdown: self.max_relative_drawdown,
            max_consecutive_wins: self.max_win_streak,
            max_consecutive_losses: self.max_loss_streak,
            max_consecutive_profit: self.max_streak_profit,
            max_consecutive_loss: self.max_streak_loss,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawdown_tracks_peak() {
        let mut stats = StatsAggregator::new(10_000.0);
        stats.on_balance(12_000.0);
        stats.on_balance(9_000.0);
        stats.on_balance(11_000.0);

        let report = stats.finalize(11_000.0);
        assert!((report.max_absolute_drawdown - 0.75).abs() < 1e-10);
        assert!((report.max_relative_drawdown + 0.25).abs() < 1e-10);
    }

    #[test]
    fn streaks_reset_on_sign_change() {
        let mut stats = StatsAggregator::new(10_000.0);
        stats.on_closed_trade(100.0, false);
        stats.on_closed_trade(50.0, false);
        stats.on_closed_trade(-30.0, false);
        stats.on_closed_trade(-30.0, false);
        stats.on_closed_trade(-30.0, false);
        stats.on_closed_trade(200.0, false);

        let report = stats.finalize(10_260.0);
        assert_eq!(report.max_consecutive_wins, 2);
        assert_eq!(report.max_consecutive_losses, 3);
        assert!((report.max_consecutive_profit - 150.0).abs() < 1e-10);
        assert!((report.max_consecutive_loss + 90.0).abs() < 1e-10);
    }

    #[test]
    fn zero_trades_degrade_to_zero_metrics() {
        let stats = StatsAggregator::new(10_000.0);
        let report = stats.finalize(10_000.0);
        assert_eq!(report.win_rate, 0.0);
        assert_eq!(report.profit_factor, 0.0);
        assert_eq!(report.avg_profit, 0.0);
        assert_eq!(report.avg_loss, 0.0);
        assert_eq!(report.roi, 0.0);
    }

    #[test]
    fn profit_factor_includes_fees_in_denominator() {
        let mut stats = StatsAggregator::new(10_000.0);
        stats.on_closed_trade(300.0, false);
        stats.on_closed_trade(-100.0, false);
        stats.on_fee(50.0);

        let report = stats.finalize(10_150.0);
        assert!((report.profit_factor - 300.0 / 150.0).abs() < 1e-10);
    }

    #[test]
    fn liquidations_are_counted() {
        let mut stats = StatsAggregator::new(10_000.0);
        stats.on_closed_trade(-5_000.0, true);
        let report = stats.finalize(5_000.0);
        assert_eq!(report.total_liquidations, 1);
        assert_eq!(report.total_losses, 1);
    }
}
