//! Matching engine of the spot exchange.
//!
//! ## Design Principles
//!
//! 1. **Determinism**: same store and same input, same result
//! 2. **Exact Math**: rationals over arbitrary precision integers, no floats
//! 3. **Read-only Matching**: matching only reads the store, effects are
//!    collected in a [`MatchingResult`]
//! 4. **Price-Time Priority**: best price first, then lowest sequence,
//!    across the direct and the inverted book
//!
//! ## Pipeline
//!
//! ```text
//! MatchingFinder ──> MatchingEngine ──> MatchingResult ──> Settlement
//!  (candidates)      (trades, closes)    (effects)          (ledger + store)
//! ```
//!
//! ## Example
//!
//! ```
//! use spot_dex::engine::MatchingEngine;
//! use spot_dex::orderbook::OrderBookStore;
//! use spot_dex::store::MemStore;
//! use spot_dex::types::{Order, OrderBookRecord, Side};
//!
//! let mut store = MemStore::new();
//! let (book, inverted) = store.get_or_create_order_book_ids("ubtc", "uusd").unwrap();
//!
//! let order = Order::limit("alice", "bid-1", "ubtc", "uusd", Side::Buy, "4e-1".parse().unwrap(), 100);
//! let taker = OrderBookRecord {
//!     order_book_id: book,
//!     side: Side::Buy,
//!     price: order.price,
//!     order_sequence: 1,
//!     order_id: order.id.clone(),
//!     account_number: 1,
//!     remaining_base_quantity: 100,
//!     remaining_spendable_balance: 40,
//! };
//!
//! // nothing rests yet
//! let result = MatchingEngine::new(&store).match_order(inverted, &order, taker).unwrap();
//! assert!(!result.taker_closed);
//! assert!(result.trades.is_empty());
//! ```

pub mod finder;
pub mod matcher;
pub mod result;
pub mod settlement;

pub use finder::MatchingFinder;
pub use matcher::{compute_trade, is_executable_as_maker, MatchingEngine, MatchingRecord};
pub use result::{AccountNumberCoin, MatchingResult, OrderReduction};
pub use settlement::Settlement;
