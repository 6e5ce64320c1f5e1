//! Indicator helpers used by the built-in strategy families.
//!
//! All functions are pure over a bar slice and return the latest value only;
//! strategies are re-evaluated per window, so there is no need to
//! materialize full indicator series.

use crate::domain::Bar;

/// Simple moving average of the last `period` closes. None if the window is
/// too short.
pub fn sma(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let sum: f64 = bars[bars.len() - period..].iter().map(|b| b.close).sum();
    Some(sum / period as f64)
}

/// Exponential moving average over all provided closes, seeded with the
/// first close. None on an empty slice.
pub fn ema(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.is_empty() {
        return None;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut value = bars[0].close;
    for bar in &bars[1..] {
        value = alpha * bar.close + (1.0 - alpha) * value;
    }
    Some(value)
}

/// Average True Range with Wilder smoothing (alpha = 1/period).
///
/// TR[t] = max(high-low, |high-prev_close|, |low-prev_close|); the first
/// bar's TR is its plain range. Needs at least `period + 1` bars.
pub fn atr(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    let alpha = 1.0 / period as f64;
    let mut value = bars[0].high - bars[0].low;
    for i in 1..bars.len() {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        let tr = (h - l).max((h - pc).abs()).max((l - pc).abs());
        value = alpha * tr + (1.0 - alpha) * value;
    }
    Some(value)
}

/// Highest high over the last `period` bars, excluding the final bar.
pub fn highest_high(bars: &[Bar], period: usize) -> Option<f64> {
    channel_bars(bars, period)?
        .iter()
        .map(|b| b.high)
        .fold(None, |acc: Option<f64>, h| {
            Some(acc.map_or(h, |a| a.max(h)))
        })
}

/// Lowest low over the last `period` bars, excluding the final bar.
pub fn lowest_low(bars: &[Bar], period: usize) -> Option<f64> {
    channel_bars(bars, period)?
        .iter()
        .map(|b| b.low)
        .fold(None, |acc: Option<f64>, l| {
            Some(acc.map_or(l, |a| a.min(l)))
        })
}

fn channel_bars(bars: &[Bar], period: usize) -> Option<&[Bar]> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    let end = bars.len() - 1;
    Some(&bars[end - period..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::random_walk;
    use crate::domain::Timeframe;
    use chrono::{TimeZone, Utc};

    fn flat_bars(closes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let open_time = start + Timeframe::H1.duration() * i as i32;
                Bar {
                    symbol: "T".into(),
                    timeframe: Timeframe::H1,
                    open: c,
                    high: c + 1.0,
                    low: c - 1.0,
                    close: c,
                    volume: 1.0,
                    open_time,
                    close_time: open_time + Timeframe::H1.duration(),
                }
            })
            .collect()
    }

    #[test]
    fn sma_of_last_period() {
        let bars = flat_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(sma(&bars, 3), Some(4.0));
        assert_eq!(sma(&bars, 6), None);
    }

    #[test]
    fn ema_converges_to_constant() {
        let bars = flat_bars(&[10.0; 50]);
        let value = ema(&bars, 5).unwrap();
        assert!((value - 10.0).abs() < 1e-9);
    }

    #[test]
    fn atr_positive_on_random_walk() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = random_walk("T", Timeframe::H1, start, 60, 3, 100.0, 0.02);
        let value = atr(&bars, 14).unwrap();
        assert!(value > 0.0);
    }

    #[test]
    fn channel_excludes_current_bar() {
        let bars = flat_bars(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        // Highs are close + 1; last bar excluded.
        assert_eq!(highest_high(&bars, 4), Some(5.0));
        assert_eq!(lowest_low(&bars, 4), Some(0.0));
    }
}
