//! Order types and lifecycle states.

use super::ids::OrderId;
use super::position::Side;
use serde::{Deserialize, Serialize};

/// What kind of order and how it fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Fill immediately at the current simulated price (taker fee).
    Market,
    /// Fill when the bar range touches the limit price (maker fee).
    Limit,
    /// Fill when the bar range touches the trigger price (maker fee).
    Stop,
    /// Triggers at the stop price, fills as market (taker fee).
    StopMarket,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Market => "market",
            OrderKind::Limit => "limit",
            OrderKind::Stop => "stop",
            OrderKind::StopMarket => "stop_market",
        }
    }

    /// Whether fills of this kind pay the taker rate.
    pub fn is_taker(&self) -> bool {
        matches!(self, OrderKind::Market | OrderKind::StopMarket)
    }
}

/// Order lifecycle: `Pending → Filled | Cancelled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Filled,
    Cancelled { reason: String },
}

/// A pending or executed order.
///
/// Orders are scoped per run and per symbol: created when a strategy decision
/// is acted on, destroyed when filled, cancelled, or superseded by a newer
/// exit plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub kind: OrderKind,
    pub side: Side,
    /// Limit price or stop trigger price. Market orders carry the price they
    /// were priced at when placed, for the audit trail only.
    pub price: f64,
    /// Signed quantity: positive adds long exposure, negative adds short.
    pub quantity: f64,
    pub status: OrderStatus,
}

impl Order {
    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}
