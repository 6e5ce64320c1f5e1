//! Window indexer — sliding `[start, end)` view into a bar series.
//!
//! Stands in for the paginated history the live system would fetch from the
//! exchange: as the simulated clock advances, `end` tracks the last bar whose
//! close time is not after the clock, and `start` trails so the window never
//! exceeds the configured page size.

use crate::domain::Bar;
use chrono::{DateTime, Utc};

/// Default window width, matching the API page size of the live system.
pub const DEFAULT_MAX_WINDOW: usize = 200;

/// Sliding index pair over one (symbol, timeframe) bar series.
///
/// Monotonic within a run: neither `start` nor `end` ever decreases.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub start: usize,
    pub end: usize,
    max_len: usize,
}

impl Window {
    pub fn new(max_len: usize) -> Self {
        Self {
            start: 0,
            end: 0,
            max_len,
        }
    }

    /// Advance the window so `end` indexes one past the last bar whose close
    /// time is not after `now`. If no new bar qualifies, the window is
    /// unchanged.
    pub fn advance(&mut self, bars: &[Bar], now: DateTime<Utc>) {
        while self.end < bars.len() && bars[self.end].close_time <= now {
            self.end += 1;
        }
        if self.end - self.start > self.max_len {
            self.start = self.end - self.max_len;
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The in-window slice of `bars`.
    pub fn slice<'a>(&self, bars: &'a [Bar]) -> &'a [Bar] {
        &bars[self.start..self.end]
    }

    /// Latest bar inside the window, if any.
    pub fn latest<'a>(&self, bars: &'a [Bar]) -> Option<&'a Bar> {
        if self.is_empty() {
            None
        } else {
            Some(&bars[self.end - 1])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timeframe;
    use chrono::{Duration, TimeZone};

    fn hourly_bars(n: usize) -> Vec<Bar> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let open_time = t0 + Duration::hours(i as i64);
                let close = 100.0 + i as f64;
                Bar {
                    symbol: "BTC-USDT".into(),
                    timeframe: Timeframe::H1,
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 10.0,
                    open_time,
                    close_time: open_time + Duration::hours(1),
                }
            })
            .collect()
    }

    #[test]
    fn end_tracks_clock() {
        let bars = hourly_bars(10);
        let mut window = Window::new(100);

        window.advance(&bars, bars[2].close_time);
        assert_eq!(window.end, 3);

        // A timestamp mid-bar does not include the unfinished bar.
        window.advance(&bars, bars[3].close_time - Duration::minutes(1));
        assert_eq!(window.end, 3);
    }

    #[test]
    fn window_width_is_capped() {
        let bars = hourly_bars(50);
        let mut window = Window::new(10);
        window.advance(&bars, bars[49].close_time);
        assert_eq!(window.end, 50);
        assert_eq!(window.start, 40);
        assert_eq!(window.len(), 10);
    }

    #[test]
    fn indices_are_monotonic() {
        let bars = hourly_bars(20);
        let mut window = Window::new(5);
        let mut prev = (0usize, 0usize);
        for bar in &bars {
            window.advance(&bars, bar.close_time);
            assert!(window.start >= prev.0);
            assert!(window.end >= prev.1);
            prev = (window.start, window.end);
        }
    }

    #[test]
    fn no_bar_before_clock_leaves_window_empty() {
        let bars = hourly_bars(5);
        let mut window = Window::new(10);
        window.advance(&bars, bars[0].open_time);
        assert!(window.is_empty());
        assert!(window.latest(&bars).is_none());
    }
}
