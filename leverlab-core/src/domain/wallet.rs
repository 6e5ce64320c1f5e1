//! Wallet — the simulated exchange account.

use super::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Simulated account: balances plus one position record per symbol.
///
/// Mutated only by the margin ledger. Invariant: `available <= total` at all
/// times; `total` changes only via realized PnL and fees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    /// Balance not locked as margin.
    pub available: f64,
    /// Full account value excluding unrealized PnL.
    pub total: f64,
    /// Sum of unrealized PnL across all open positions.
    pub total_unrealized: f64,
    pub positions: HashMap<String, Position>,
}

impl Wallet {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            available: initial_balance,
            total: initial_balance,
            total_unrealized: 0.0,
            positions: HashMap::new(),
        }
    }

    /// Position for `symbol`, created flat on first access.
    pub fn position_mut(&mut self, symbol: &str, leverage: f64) -> &mut Position {
        self.positions
            .entry(symbol.to_string())
            .or_insert_with(|| Position::flat(symbol, leverage))
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// Recompute `total_unrealized` from per-position records.
    pub fn refresh_unrealized(&mut self) {
        self.total_unrealized = self.positions.values().map(|p| p.unrealized_pnl).sum();
    }

    /// Account value marked to market.
    pub fn equity(&self) -> f64 {
        self.total + self.total_unrealized
    }
}
