//! Position & margin ledger — the only code that mutates the wallet.
//!
//! All balance arithmetic lives here: volume-weighted entry averaging on
//! adds, margin lock/release, fee debits, and realized PnL on reduces.
//! Margin is always `|size · entry| / leverage`, never a function of the
//! current market price.

use crate::domain::{Side, TradeAction, Wallet};
use tracing::warn;

/// Maker/taker fee rates applied to fill notional.
#[derive(Debug, Clone, Copy)]
pub struct FeeSchedule {
    pub maker_rate: f64,
    pub taker_rate: f64,
}

impl FeeSchedule {
    pub fn rate(&self, taker: bool) -> f64 {
        if taker {
            self.taker_rate
        } else {
            self.maker_rate
        }
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            maker_rate: 0.0002,
            taker_rate: 0.0005,
        }
    }
}

/// One balance-affecting fill produced by the ledger.
#[derive(Debug, Clone)]
pub struct LedgerEvent {
    pub action: TradeAction,
    pub side: Side,
    /// Unsigned filled quantity.
    pub quantity: f64,
    pub price: f64,
    pub fee: f64,
    pub realized_pnl: f64,
    /// True when the fill brought the position back to flat.
    pub position_flat: bool,
    /// Total balance immediately after this fill, before any later fill in
    /// the same apply (a side flip settles in two steps).
    pub balance_after: f64,
}

/// Quantities below this are treated as a full close, absorbing float dust
/// from repeated adds and reduces.
const SIZE_EPSILON: f64 = 1e-12;

/// The ledger itself is stateless; all mutable state lives in the wallet.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ledger {
    pub fees: FeeSchedule,
}

impl Ledger {
    pub fn new(fees: FeeSchedule) -> Self {
        Self { fees }
    }

    /// Apply a signed fill quantity at `price`.
    ///
    /// Same-side (or from-flat) quantity opens or adds. Opposite-side
    /// quantity reduces, and if it crosses zero the old side is fully closed
    /// first, then the remainder opens the new side at the fill price — two
    /// events, counted as separate trades.
    ///
    /// Returns the events actually applied; an insufficient-balance open is
    /// rejected with a warning and produces no event.
    pub fn apply(
        &self,
        wallet: &mut Wallet,
        symbol: &str,
        leverage: f64,
        signed_quantity: f64,
        price: f64,
        taker: bool,
    ) -> Vec<LedgerEvent> {
        if signed_quantity == 0.0 || price <= 0.0 {
            return Vec::new();
        }

        let position = wallet.position_mut(symbol, leverage);
        let same_side = position.is_flat() || position.size.signum() == signed_quantity.signum();

        if same_side {
            return self
                .open_or_add(wallet, symbol, leverage, signed_quantity, price, taker)
                .into_iter()
                .collect();
        }

        let open_size = wallet.position(symbol).map(|p| p.size).unwrap_or(0.0);
        let reduce_qty = signed_quantity.abs().min(open_size.abs());
        let mut events = vec![self.reduce(wallet, symbol, reduce_qty, price, taker, false)];

        // Side flip: whatever quantity remains opens the new side.
        let remainder = signed_quantity.abs() - reduce_qty;
        if remainder > SIZE_EPSILON {
            let reopen = remainder * signed_quantity.signum();
            events.extend(self.open_or_add(wallet, symbol, leverage, reopen, price, taker));
        }
        events
    }

    /// Open from flat or pyramid onto an existing same-side position.
    ///
    /// Entry price becomes the volume-weighted average of old and new fills;
    /// the margin debit equals the notional of the new fill over leverage.
    fn open_or_add(
        &self,
        wallet: &mut Wallet,
        symbol: &str,
        leverage: f64,
        signed_quantity: f64,
        price: f64,
        taker: bool,
    ) -> Option<LedgerEvent> {
        let quantity = signed_quantity.abs();
        let required_margin = quantity * price / leverage;
        let fee = quantity * price * self.fees.rate(taker);

        if wallet.available < required_margin + fee {
            warn!(
                symbol,
                required = required_margin + fee,
                available = wallet.available,
                "order rejected: insufficient available balance"
            );
            return None;
        }

        let position = wallet.position_mut(symbol, leverage);
        let was_flat = position.is_flat();
        let old_abs = position.size.abs();

        position.entry_price =
            (price * quantity + position.entry_price * old_abs) / (quantity + old_abs);
        position.size += signed_quantity;
        position.margin = position.entry_notional() / leverage;
        position.leverage = leverage;

        wallet.available -= required_margin + fee;
        wallet.total -= fee;

        Some(LedgerEvent {
            action: if was_flat {
                TradeAction::Open
            } else {
                TradeAction::Add
            },
            side: Side::from_quantity(signed_quantity),
            quantity,
            price,
            fee,
            realized_pnl: 0.0,
            position_flat: false,
            balance_after: wallet.total,
        })
    }

    /// Reduce or fully close the open position, realizing PnL.
    ///
    /// `quantity` is unsigned and must not exceed the open size. Released
    /// margin plus realized PnL minus the fee is credited back to the
    /// available balance; total moves by PnL minus fee only.
    fn reduce(
        &self,
        wallet: &mut Wallet,
        symbol: &str,
        quantity: f64,
        price: f64,
        taker: bool,
        liquidation: bool,
    ) -> LedgerEvent {
        let position = wallet.position_mut(symbol, 1.0);
        debug_assert!(!position.is_flat(), "reduce on a flat position");
        debug_assert!(quantity <= position.size.abs() + SIZE_EPSILON);

        let side = position.side();
        let entry = position.entry_price;
        let closed_notional = quantity * entry;
        let realized_pnl = side.sign() * closed_notional * (price - entry) / entry;
        let released_margin = closed_notional / position.leverage;
        let fee = quantity * price * self.fees.rate(taker);

        position.size -= side.sign() * quantity;
        position.margin -= released_margin;

        let full_close = position.size.abs() < SIZE_EPSILON;
        if full_close {
            position.zero();
        } else {
            position.unrealized_pnl = position.pnl_at(price);
        }

        wallet.available += released_margin + realized_pnl - fee;
        wallet.total += realized_pnl - fee;

        LedgerEvent {
            action: match (liquidation, full_close) {
                (true, _) => TradeAction::Liquidate,
                (false, true) => TradeAction::Close,
                (false, false) => TradeAction::Reduce,
            },
            // A reduce executes opposite to the position side.
            side: side.opposite(),
            quantity,
            price,
            fee,
            realized_pnl,
            position_flat: full_close,
            balance_after: wallet.total,
        }
    }

    /// Force-close the full position at `price` with a taker fee, as the
    /// liquidation checker does. No-op on a flat position.
    pub fn force_close(
        &self,
        wallet: &mut Wallet,
        symbol: &str,
        price: f64,
    ) -> Option<LedgerEvent> {
        let open_size = wallet.position(symbol).map(|p| p.size).unwrap_or(0.0);
        if open_size.abs() < SIZE_EPSILON {
            return None;
        }
        Some(self.reduce(wallet, symbol, open_size.abs(), price, true, true))
    }

    /// Mark the position to `price`, refreshing its unrealized PnL.
    pub fn mark(&self, wallet: &mut Wallet, symbol: &str, price: f64) {
        if let Some(position) = wallet.positions.get_mut(symbol) {
            position.unrealized_pnl = position.pnl_at(price);
        }
    }
}
