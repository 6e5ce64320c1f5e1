//! Symbol metadata — decimal precision used to round quantities and prices
//! before any order reaches the matching engine.

use serde::{Deserialize, Serialize};

/// Exchange-declared precision for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolMeta {
    pub symbol: String,
    pub price_decimals: u32,
    pub quantity_decimals: u32,
}

impl SymbolMeta {
    pub fn new(symbol: &str, price_decimals: u32, quantity_decimals: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            price_decimals,
            quantity_decimals,
        }
    }

    pub fn round_price(&self, price: f64) -> f64 {
        round_to(price, self.price_decimals)
    }

    pub fn round_quantity(&self, quantity: f64) -> f64 {
        round_to(quantity, self.quantity_decimals)
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_price_and_quantity() {
        let meta = SymbolMeta::new("BTC-USDT", 2, 3);
        assert_eq!(meta.round_price(100.126), 100.13);
        assert_eq!(meta.round_quantity(0.123456), 0.123);
    }

    #[test]
    fn zero_decimals_rounds_to_integers() {
        let meta = SymbolMeta::new("XRP-USDT", 4, 0);
        assert_eq!(meta.round_quantity(12.7), 13.0);
    }
}
