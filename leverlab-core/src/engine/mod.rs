//! The simulation engine: window indexing, margin accounting, order
//! matching, liquidation, statistics, and the tick loop that drives them.

pub mod ledger;
pub mod liquidation;
pub mod loop_runner;
pub mod matching;
pub mod state;
pub mod stats;
pub mod window;

pub use ledger::{FeeSchedule, Ledger, LedgerEvent};
pub use liquidation::{check_liquidation, DEFAULT_MAINTENANCE_RATE};
pub use loop_runner::run_simulation;
pub use matching::{FillOutcome, MatchingEngine, TieBreak};
pub use state::{EngineConfig, EngineState, EquitySample, RunOutput, SymbolConfig};
pub use stats::{StatsAggregator, StrategyReport};
pub use window::Window;
