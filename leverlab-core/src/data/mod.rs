//! Data repository — the seam where historical bars enter the engine.
//!
//! The engine never performs I/O itself: it receives a read-only `BarSource`
//! populated once before the run and never mutated afterwards. This makes
//! the source shareable across concurrent sweep workers.

mod synthetic;

pub use synthetic::random_walk;

use crate::domain::{Bar, Timeframe};
use crate::error::EngineError;
use std::collections::HashMap;

/// Price history provider contract.
///
/// Must return a non-empty series for every requested (symbol, timeframe)
/// or the run aborts — missing history is fatal, never retried.
pub trait BarSource: Send + Sync {
    fn series(&self, symbol: &str, timeframe: Timeframe) -> Option<&[Bar]>;

    /// Fetch a required series, mapping absence or emptiness to the fatal
    /// error the simulation loop propagates.
    fn required(&self, symbol: &str, timeframe: Timeframe) -> Result<&[Bar], EngineError> {
        match self.series(symbol, timeframe) {
            Some(bars) if !bars.is_empty() => Ok(bars),
            Some(_) => Err(EngineError::EmptyHistory {
                symbol: symbol.to_string(),
                timeframe,
            }),
            None => Err(EngineError::MissingHistory {
                symbol: symbol.to_string(),
                timeframe,
            }),
        }
    }
}

/// In-memory bar repository, keyed by (symbol, timeframe).
#[derive(Debug, Default, Clone)]
pub struct InMemorySource {
    series: HashMap<(String, Timeframe), Vec<Bar>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a series. Bars must already be ordered by close time.
    pub fn insert(&mut self, symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) {
        debug_assert!(
            bars.windows(2).all(|w| w[0].close_time <= w[1].close_time),
            "bar series must be time-ordered"
        );
        self.series.insert((symbol.to_string(), timeframe), bars);
    }
}

impl BarSource for InMemorySource {
    fn series(&self, symbol: &str, timeframe: Timeframe) -> Option<&[Bar]> {
        self.series
            .get(&(symbol.to_string(), timeframe))
            .map(Vec::as_slice)
    }
}
