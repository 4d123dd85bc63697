//! # Spot DEX
//!
//! Deterministic on-chain spot exchange: persistent limit order books and
//! exact price-time matching between any two denoms.
//!
//! ## Architecture
//!
//! - **Types**: prices, orders, records, events, params and receipts
//! - **Store**: ordered key/value storage with a per-placement write cache
//! - **OrderBook**: persistent book layout, iteration and the price grid
//! - **Engine**: matching across the direct and the inverted book, then settlement
//! - **Host**: ledger, account directory, good-til scheduler and event sink
//! - **Dex**: the facade tying it together
//!
//! ## Design Principles
//!
//! 1. **Determinism**: identical inputs produce identical state roots
//! 2. **No Floating Point**: prices are `mantissa · 10^exponent`, math is rational
//! 3. **All-or-nothing**: a placement commits store, ledger and scheduler together or not at all
//! 4. **Synchronous Execution**: no async anywhere, one placement at a time

// ============================================================================
// Module declarations
// ============================================================================

/// Error type and classification
pub mod error;

/// Core data types: Price, Order, OrderBookRecord, Event
pub mod types;

/// Ordered key/value storage
pub mod store;

/// Persistent order books and price grid
pub mod orderbook;

/// Matching engine and settlement
pub mod engine;

/// Host capabilities: ledger, accounts, scheduler, events
pub mod host;

/// Exchange facade
pub mod dex;

mod math;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use dex::{Dex, MemDex, Placement, PlacementState};
pub use error::{DexError, ErrorKind, Result};
pub use types::{
    BlockReceipt, Coin, Event, GoodTil, Order, OrderType, Params, Price, Side, TimeInForce, Trade,
};
