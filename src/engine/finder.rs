//! Best candidate selection across the direct and the inverted book.
//!
//! A taker in book `(B, Q)` can trade with:
//!
//! - **self** records: the opposite side of `(B, Q)` itself
//! - **opposite** records: the *same* side of the reciprocal book `(Q, B)`,
//!   read at price `1/p`
//!
//! ```text
//! taker: buy B/Q @ 0.40
//!
//! self (sell B/Q):      0.38  0.39  0.41 ...
//! opposite (buy Q/B):   2.70  2.60  2.50 ...   -> 1/p: 0.370 0.385 0.400
//! merged:               0.370 0.38 0.385 0.39 0.40
//! ```
//!
//! One candidate per source is cached. On each call the better matching
//! candidate is consumed and the other stays cached.

use num_rational::BigRational;

use crate::error::{DexError, Result};
use crate::orderbook::{OrderBookIterator, OrderBookStore};
use crate::store::KvStore;
use crate::types::{OrderBookRecord, Price, Side};

/// Merged best-price-first stream of maker candidates for one taker.
pub struct MatchingFinder<'a> {
    self_iterator: OrderBookIterator<'a>,
    opposite_iterator: OrderBookIterator<'a>,
    taker_side: Side,
    /// `None` for market takers.
    taker_price: Option<BigRational>,
    self_record: Option<OrderBookRecord>,
    opposite_record: Option<OrderBookRecord>,
}

impl<'a> MatchingFinder<'a> {
    pub fn new<S: KvStore + ?Sized>(
        store: &'a S,
        order_book_id: u32,
        inverted_order_book_id: u32,
        taker_side: Side,
        taker_price: Option<&Price>,
    ) -> Self {
        Self {
            self_iterator: store.order_book_side_iterator(order_book_id, taker_side.opposite()),
            opposite_iterator: store.order_book_side_iterator(inverted_order_book_id, taker_side),
            taker_side,
            taker_price: taker_price.map(Price::to_rational),
            self_record: None,
            opposite_record: None,
        }
    }

    /// Next best maker record that crosses the taker's price, or `None`.
    pub fn next_match(&mut self) -> Result<Option<OrderBookRecord>> {
        self.load()?;

        let self_price = self.self_record.as_ref().map(record_price).transpose()?;
        let opposite_price = self
            .opposite_record
            .as_ref()
            .map(record_price)
            .transpose()?
            .map(|p| p.recip());

        let self_matches = self_price.as_ref().is_some_and(|p| self.crosses(p));
        let opposite_matches = opposite_price.as_ref().is_some_and(|p| self.crosses(p));

        let take_self = match (self_matches, opposite_matches) {
            (false, false) => {
                tracing::debug!(
                    self_exhausted = self.self_record.is_none(),
                    opposite_exhausted = self.opposite_record.is_none(),
                    "no maker record crosses the taker"
                );
                return Ok(None);
            }
            (true, false) => true,
            (false, true) => false,
            (true, true) => match (&self_price, &opposite_price) {
                (Some(direct), Some(inverted)) => match self.taker_side {
                    // lowest ask wins
                    Side::Buy => inverted >= direct,
                    // highest bid wins
                    Side::Sell => direct >= inverted,
                },
                _ => true,
            },
        };

        let record = if take_self {
            self.self_record.take()
        } else {
            self.opposite_record.take()
        };
        if let Some(record) = &record {
            tracing::debug!(
                source = if take_self { "self" } else { "opposite" },
                maker_sequence = record.order_sequence,
                maker_id = %record.order_id,
                "best maker record"
            );
        }
        Ok(record)
    }

    fn load(&mut self) -> Result<()> {
        if self.self_record.is_none() {
            self.self_record = self.self_iterator.next_record()?;
        }
        if self.opposite_record.is_none() {
            self.opposite_record = self.opposite_iterator.next_record()?;
        }
        Ok(())
    }

    /// Whether a maker price in the taker's frame is acceptable.
    fn crosses(&self, maker_price: &BigRational) -> bool {
        match &self.taker_price {
            None => true,
            Some(taker_price) => match self.taker_side {
                Side::Buy => taker_price >= maker_price,
                Side::Sell => taker_price <= maker_price,
            },
        }
    }
}

fn record_price(record: &OrderBookRecord) -> Result<BigRational> {
    record.price.as_ref().map(Price::to_rational).ok_or_else(|| {
        DexError::invalid_state(format!(
            "stored record {} has no price",
            record.order_sequence
        ))
    })
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    const BOOK: u32 = 0;
    const INVERTED: u32 = 1;

    fn put(store: &mut MemStore, book: u32, side: Side, price: &str, seq: u64) {
        store
            .save_order_book_record(&OrderBookRecord {
                order_book_id: book,
                side,
                price: Some(price.parse().unwrap()),
                order_sequence: seq,
                order_id: format!("o{}", seq),
                account_number: 1,
                remaining_base_quantity: 100,
                remaining_spendable_balance: 100,
            })
            .unwrap();
    }

    fn drain(finder: &mut MatchingFinder<'_>) -> Vec<u64> {
        let mut out = Vec::new();
        while let Some(record) = finder.next_match().unwrap() {
            out.push(record.order_sequence);
        }
        out
    }

    fn price(s: &str) -> Price {
        s.parse().unwrap()
    }

    #[test]
    fn test_self_only() {
        let mut store = MemStore::new();
        put(&mut store, BOOK, Side::Sell, "38e-2", 1);
        put(&mut store, BOOK, Side::Sell, "39e-2", 2);
        put(&mut store, BOOK, Side::Sell, "41e-2", 3);
        let mut finder = MatchingFinder::new(&store, BOOK, INVERTED, Side::Buy, Some(&price("4e-1")));
        assert_eq!(drain(&mut finder), vec![1, 2]);
    }

    #[test]
    fn test_merges_inverted_book() {
        let mut store = MemStore::new();
        put(&mut store, BOOK, Side::Sell, "38e-2", 1);
        put(&mut store, BOOK, Side::Sell, "39e-2", 2);
        // 1/2.7 = 0.370, 1/2.6 = 0.385, 1/2.5 = 0.4, 1/2.4 = 0.416
        put(&mut store, INVERTED, Side::Buy, "27e-1", 3);
        put(&mut store, INVERTED, Side::Buy, "26e-1", 4);
        put(&mut store, INVERTED, Side::Buy, "25e-1", 5);
        put(&mut store, INVERTED, Side::Buy, "24e-1", 6);
        // the inverted sell side is not a candidate for a buy taker
        put(&mut store, INVERTED, Side::Sell, "1", 7);

        let mut finder = MatchingFinder::new(&store, BOOK, INVERTED, Side::Buy, Some(&price("4e-1")));
        assert_eq!(drain(&mut finder), vec![3, 1, 4, 2, 5]);
    }

    #[test]
    fn test_sell_taker_prefers_highest_bid() {
        let mut store = MemStore::new();
        put(&mut store, BOOK, Side::Buy, "2", 1);
        put(&mut store, BOOK, Side::Buy, "1", 2);
        // 1/25e-2 = 4, 1/5e-1 = 2
        put(&mut store, INVERTED, Side::Sell, "25e-2", 3);
        put(&mut store, INVERTED, Side::Sell, "5e-1", 4);

        let mut finder = MatchingFinder::new(&store, BOOK, INVERTED, Side::Sell, Some(&price("15e-1")));
        assert_eq!(drain(&mut finder), vec![3, 1, 4]);
    }

    #[test]
    fn test_equal_prices_prefer_self() {
        let mut store = MemStore::new();
        put(&mut store, BOOK, Side::Sell, "5e-1", 2);
        put(&mut store, INVERTED, Side::Buy, "2", 1);
        let mut finder = MatchingFinder::new(&store, BOOK, INVERTED, Side::Buy, Some(&price("5e-1")));
        assert_eq!(drain(&mut finder), vec![2, 1]);
    }

    #[test]
    fn test_market_taker_takes_everything() {
        let mut store = MemStore::new();
        put(&mut store, BOOK, Side::Sell, "1e2", 1);
        put(&mut store, INVERTED, Side::Buy, "1e-3", 2);
        let mut finder = MatchingFinder::new(&store, BOOK, INVERTED, Side::Buy, None);
        assert_eq!(drain(&mut finder), vec![1, 2]);
    }

    #[test]
    fn test_empty_books() {
        let store = MemStore::new();
        let mut finder = MatchingFinder::new(&store, BOOK, INVERTED, Side::Sell, None);
        assert_eq!(finder.next_match().unwrap(), None);
    }
}
