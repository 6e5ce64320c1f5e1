//! Liquidation checker — force-closes under-margined positions.

use crate::domain::Wallet;
use crate::engine::ledger::{Ledger, LedgerEvent};
use tracing::warn;

/// Default maintenance margin rate (0.5% of position notional at market).
pub const DEFAULT_MAINTENANCE_RATE: f64 = 0.005;

/// Check one symbol's position against the maintenance threshold.
///
/// Liquidates when `margin + unrealizedPnL <= |size · price| · rate`,
/// closing at the current price with a taker fee. Pending-order cancellation
/// is the caller's job (the matching engine owns the book).
pub fn check_liquidation(
    wallet: &mut Wallet,
    ledger: &Ledger,
    symbol: &str,
    price: f64,
    maintenance_rate: f64,
) -> Option<LedgerEvent> {
    let position = wallet.position(symbol)?;
    if position.is_flat() {
        return None;
    }

    let maintenance_margin = (position.size * price).abs() * maintenance_rate;
    let equity = position.margin + position.pnl_at(price);
    if equity > maintenance_margin {
        return None;
    }

    warn!(
        symbol,
        price,
        margin = position.margin,
        unrealized = position.pnl_at(price),
        maintenance_margin,
        "position liquidated"
    );
    ledger.force_close(wallet, symbol, price)
}
