//! Domain types: bars, orders, positions, wallet, trades, symbol metadata.

mod bar;
mod ids;
mod order;
mod position;
mod symbol;
mod trade;
mod wallet;

pub use bar::{Bar, Timeframe};
pub use ids::OrderId;
pub use order::{Order, OrderKind, OrderStatus};
pub use position::{Position, Side};
pub use symbol::SymbolMeta;
pub use trade::{TradeAction, TradeRecord};
pub use wallet::Wallet;
