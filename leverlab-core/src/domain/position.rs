//! Position — one per symbol for the lifetime of a run, zeroed when flat.

use serde::{Deserialize, Serialize};

/// Direction of an order or position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }

    pub fn from_quantity(quantity: f64) -> Side {
        if quantity >= 0.0 {
            Side::Long
        } else {
            Side::Short
        }
    }
}

/// Leveraged position record. Exactly one exists per traded symbol; it is
/// never destroyed, only zeroed when the position returns to flat.
///
/// `margin` is always derived from entry price and size, never from the
/// current market price — unrealized PnL is tracked separately so margin is
/// not inflated by favorable price moves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub leverage: f64,
    pub entry_price: f64,
    /// Collateral currently locked against this position.
    pub margin: f64,
    /// Signed size: positive = long, negative = short.
    pub size: f64,
    pub unrealized_pnl: f64,
}

impl Position {
    pub fn flat(symbol: &str, leverage: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            leverage,
            entry_price: 0.0,
            margin: 0.0,
            size: 0.0,
            unrealized_pnl: 0.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.size == 0.0
    }

    pub fn side(&self) -> Side {
        Side::from_quantity(self.size)
    }

    /// Notional value at entry, `|size · entry_price|`.
    pub fn entry_notional(&self) -> f64 {
        (self.size * self.entry_price).abs()
    }

    /// Unrealized profit at `price`; zero when flat.
    pub fn pnl_at(&self, price: f64) -> f64 {
        if self.is_flat() || self.entry_price == 0.0 {
            return 0.0;
        }
        self.side().sign() * self.entry_notional() * (price - self.entry_price) / self.entry_price
    }

    /// Reset to flat state, clearing entry price, margin, and unrealized PnL.
    pub fn zero(&mut self) {
        self.entry_price = 0.0;
        self.margin = 0.0;
        self.size = 0.0;
        self.unrealized_pnl = 0.0;
    }
}
