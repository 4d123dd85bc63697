//! Core data types for the spot exchange
//!
//! Stored values implement SSZ serialization for deterministic encoding.
//! Amounts are plain `u128` integers in the smallest unit of a denom.
//!
//! ## Types
//!
//! - [`Price`]: canonical decimal price with an order-preserving encoding
//! - [`Coin`]: amount of one denom
//! - [`Order`]: a placement request and the query view of a resting order
//! - [`OrderBookRecord`]: resting order inside one side of one book
//! - [`Trade`] / [`CloseResult`]: outcome of matching two records
//! - [`Event`]: emitted after state changes
//! - [`Params`]: module parameters
//! - [`BlockReceipt`]: block processing summary

mod coin;
mod event;
mod params;
mod receipt;
mod record;
mod trade;
pub mod order;
pub mod price;

// Re-export all types at module level
pub use coin::Coin;
pub use event::Event;
pub use order::{GoodTil, Order, OrderData, OrderType, Side, TimeInForce};
pub use params::Params;
pub use price::{Price, PriceError};
pub use receipt::{BlockInfo, BlockReceipt};
pub use record::{OrderBookData, OrderBookInfo, OrderBookRecord, OrderBookRecordData};
pub use trade::{CloseResult, Trade};
