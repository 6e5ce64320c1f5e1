//! Engine error taxonomy.
//!
//! Fatal conditions abort a run through these variants. Recoverable
//! conditions (rejected orders, zero-trade statistics) never surface as
//! errors — they are log lines and guarded defaults per the accounting
//! rules.

use crate::domain::Timeframe;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// No bar series was loaded for a required (symbol, timeframe).
    #[error("no price history for {symbol} {timeframe:?}: run aborted")]
    MissingHistory { symbol: String, timeframe: Timeframe },

    /// A series was loaded but contained no bars.
    #[error("empty price history for {symbol} {timeframe:?}: run aborted")]
    EmptyHistory { symbol: String, timeframe: Timeframe },

    /// The cooperative worker deadline expired mid-run.
    #[error("simulation exceeded its deadline after {ticks} ticks")]
    DeadlineExceeded { ticks: u64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
