//! Seeded random-walk bar generator for tests, benches, and demo runs.

use crate::domain::{Bar, Timeframe};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generate `n` contiguous bars following a multiplicative random walk.
///
/// The same seed always produces the same series, independent of call site,
/// so parallel sweep workers can regenerate identical data.
pub fn random_walk(
    symbol: &str,
    timeframe: Timeframe,
    start: DateTime<Utc>,
    n: usize,
    seed: u64,
    start_price: f64,
    volatility: f64,
) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let step = timeframe.duration();
    let mut price = start_price;
    let mut bars = Vec::with_capacity(n);

    for i in 0..n {
        let open = price;
        let drift: f64 = rng.gen_range(-volatility..volatility);
        let close = (open * (1.0 + drift)).max(f64::MIN_POSITIVE);
        let wick_up: f64 = rng.gen_range(0.0..volatility / 2.0);
        let wick_down: f64 = rng.gen_range(0.0..volatility / 2.0);
        let high = open.max(close) * (1.0 + wick_up);
        let low = open.min(close) * (1.0 - wick_down);
        let open_time = start + step * i as i32;

        bars.push(Bar {
            symbol: symbol.to_string(),
            timeframe,
            open,
            high,
            low,
            close,
            volume: rng.gen_range(10.0..1_000.0),
            open_time,
            close_time: open_time + step,
        });
        price = close;
    }
    bars
}
