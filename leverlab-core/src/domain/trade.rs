//! TradeRecord — append-only audit trail, one row per fill.

use super::order::OrderKind;
use super::position::Side;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a fill did to the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    /// Opened a position from flat.
    Open,
    /// Added to an existing same-side position (pyramiding).
    Add,
    /// Partially reduced an open position.
    Reduce,
    /// Fully closed the position.
    Close,
    /// Force-closed by the liquidation checker.
    Liquidate,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Open => "open",
            TradeAction::Add => "add",
            TradeAction::Reduce => "reduce",
            TradeAction::Close => "close",
            TradeAction::Liquidate => "liquidate",
        }
    }

    /// Whether this action realized PnL and closed the position.
    pub fn is_closing(&self) -> bool {
        matches!(self, TradeAction::Close | TradeAction::Liquidate)
    }
}

/// One executed fill. Never mutated after append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub date: DateTime<Utc>,
    pub symbol: String,
    pub side: Side,
    pub kind: OrderKind,
    pub action: TradeAction,
    /// Unsigned filled quantity.
    pub quantity: f64,
    pub price: f64,
    pub fee: f64,
    pub realized_pnl: f64,
    /// Total balance after this fill was applied.
    pub balance: f64,
}
