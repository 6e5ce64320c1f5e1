//! Order matching engine — resolves pending orders against each bar's range.
//!
//! Market orders never enter the book; the simulation loop executes them
//! immediately. Everything price-contingent (limit, stop, stop-market) waits
//! here and fills when a bar's `[low, high]` range contains its price.
//!
//! Same-bar collisions between a take-profit and a stop are resolved by a
//! deterministic evaluation order (the configurable tie-break): orders are
//! processed sorted by price, and the first fill that brings the position
//! back to flat cancels every remaining pending order for that symbol. A
//! stop and a take-profit can therefore never both fill on one bar.

use crate::domain::{Bar, Order, OrderKind, OrderStatus, Wallet};
use crate::engine::ledger::{Ledger, LedgerEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Evaluation order for pending orders within one bar.
///
/// Price-descending is the historical default; the precedence between a
/// same-bar take-profit and stop is an artifact of time-compressed
/// backtesting, so the rule is configurable rather than baked in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TieBreak {
    #[default]
    PriceDescending,
    PriceAscending,
}

/// A pending order that filled, with the ledger events it produced.
#[derive(Debug, Clone)]
pub struct FillOutcome {
    pub order: Order,
    pub events: Vec<LedgerEvent>,
}

/// Pending-order registry and per-bar matcher.
#[derive(Debug, Default)]
pub struct MatchingEngine {
    pending: HashMap<String, Vec<Order>>,
    tie_break: TieBreak,
}

impl MatchingEngine {
    pub fn new(tie_break: TieBreak) -> Self {
        Self {
            pending: HashMap::new(),
            tie_break,
        }
    }

    /// Register a price-contingent order. Market orders do not belong here.
    pub fn place(&mut self, order: Order) {
        debug_assert!(order.kind != OrderKind::Market, "market orders fill immediately");
        debug_assert!(order.is_pending());
        self.pending.entry(order.symbol.clone()).or_default().push(order);
    }

    pub fn pending(&self, symbol: &str) -> &[Order] {
        self.pending.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_pending(&self, symbol: &str) -> bool {
        !self.pending(symbol).is_empty()
    }

    /// Cancel every pending order for `symbol`, returning them for the audit
    /// trail.
    pub fn cancel_all(&mut self, symbol: &str, reason: &str) -> Vec<Order> {
        let mut cancelled = self.pending.remove(symbol).unwrap_or_default();
        for order in &mut cancelled {
            order.status = OrderStatus::Cancelled {
                reason: reason.to_string(),
            };
            debug!(symbol, id = %order.id, reason, "order cancelled");
        }
        cancelled
    }

    /// Resolve the symbol's pending orders against one bar.
    ///
    /// Each order is evaluated at most once. The moment a fill flattens the
    /// position, all remaining pending orders for the symbol are cancelled —
    /// nothing else fills on this bar.
    pub fn match_bar(
        &mut self,
        bar: &Bar,
        wallet: &mut Wallet,
        ledger: &Ledger,
        leverage: f64,
    ) -> Vec<FillOutcome> {
        let Some(mut orders) = self.pending.remove(&bar.symbol) else {
            return Vec::new();
        };

        match self.tie_break {
            TieBreak::PriceDescending => {
                orders.sort_by(|a, b| b.price.total_cmp(&a.price));
            }
            TieBreak::PriceAscending => {
                orders.sort_by(|a, b| a.price.total_cmp(&b.price));
            }
        }

        let mut outcomes = Vec::new();
        let mut survivors = Vec::new();
        let mut flattened = false;
        let mut queue = orders.into_iter();

        for mut order in queue.by_ref() {
            if !bar.contains_price(order.price) {
                survivors.push(order);
                continue;
            }

            let events = ledger.apply(
                wallet,
                &bar.symbol,
                leverage,
                order.quantity,
                order.price,
                order.kind.is_taker(),
            );

            if events.is_empty() {
                // Ledger rejected the fill (insufficient balance); the order
                // is dropped rather than retried forever.
                order.status = OrderStatus::Cancelled {
                    reason: "rejected by ledger".into(),
                };
                continue;
            }

            flattened = events.iter().any(|e| e.position_flat);
            order.status = OrderStatus::Filled;
            outcomes.push(FillOutcome { order, events });

            if flattened {
                break;
            }
        }

        if flattened {
            let symbol = bar.symbol.clone();
            for mut order in survivors.into_iter().chain(queue) {
                order.status = OrderStatus::Cancelled {
                    reason: "position flat".into(),
                };
                debug!(symbol = %symbol, id = %order.id, "order cancelled: position flat");
            }
        } else if !survivors.is_empty() {
            self.pending.insert(bar.symbol.clone(), survivors);
        }

        outcomes
    }
}
