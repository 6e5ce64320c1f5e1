//! LeverLab Core — deterministic backtest engine for leveraged positions.
//!
//! This crate contains the heart of the simulator:
//! - Domain types (bars, orders, positions, wallet, trades, symbol metadata)
//! - Window indexer replaying pre-loaded history as a sliding page
//! - Position & margin ledger (VWAP entry averaging, fees, realized PnL)
//! - Order matching engine with a configurable same-bar tie-break
//! - Liquidation checker for under-margined positions
//! - Incremental statistics aggregator and the final strategy report
//! - The single-threaded tick loop wiring it all together
//! - Strategy trait with the built-in crossover/breakout families

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod strategy;

pub use error::EngineError;
