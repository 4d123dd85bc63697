//! Order book storage for the spot exchange.
//!
//! ## Architecture
//!
//! Order books live in an ordered key/value store rather than in memory:
//!
//! - **Two books per pair**: `(base, quote)` and `(quote, base)` get
//!   consecutive ids on first use
//! - **Byte-sorted records**: `book ‖ side ‖ price ‖ sequence` keys make a
//!   prefix scan return price-time priority
//! - **Price grid**: every pair has a price tick and a quantity step
//!
//! ## Components
//!
//! - [`OrderBookStore`]: typed accessors over any [`KvStore`](crate::store::KvStore)
//! - [`OrderBookIterator`]: best-first iteration over one side
//! - [`PriceGrid`]: price tick / quantity step admissibility
//!
//! ## Complexity
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | Save / remove record | O(log n) |
//! | Best record of a side | O(log n + r)* |
//! | Next record | O(1) amortized |
//!
//! *`r` is the number of records sharing the best buy price.
//!
//! ## Example
//!
//! ```
//! use spot_dex::orderbook::OrderBookStore;
//! use spot_dex::store::MemStore;
//! use spot_dex::types::{OrderBookRecord, Side};
//!
//! let mut store = MemStore::new();
//! let (book, inverted) = store.get_or_create_order_book_ids("ubtc", "uusd").unwrap();
//! assert_eq!((book, inverted), (0, 1));
//!
//! store.save_order_book_record(&OrderBookRecord {
//!     order_book_id: book,
//!     side: Side::Sell,
//!     price: Some("375e-3".parse().unwrap()),
//!     order_sequence: 1,
//!     order_id: "ask-1".into(),
//!     account_number: 7,
//!     remaining_base_quantity: 1000,
//!     remaining_spendable_balance: 1000,
//! }).unwrap();
//!
//! let best = store.order_book_side_iterator(book, Side::Sell).next().unwrap().unwrap();
//! assert_eq!(best.order_id, "ask-1");
//! ```

pub(crate) mod book;
pub mod grid;
mod iterator;

pub use book::OrderBookStore;
pub use grid::PriceGrid;
pub use iterator::OrderBookIterator;
