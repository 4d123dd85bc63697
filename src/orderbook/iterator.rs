//! Best-first iteration over one side of one order book.
//!
//! ## Ordering
//!
//! Record keys sort by `(price, sequence)` ascending. Best-first means:
//!
//! - **Sell side**: lowest price first, lowest sequence first. A plain
//!   forward scan.
//! - **Buy side**: highest price first, *lowest* sequence first. A reverse
//!   scan yields the right price order but descending sequences, so
//!   records are re-grouped per price.
//!
//! ## Run Buffer
//!
//! On reverse scans the iterator buffers one run of equal-price records.
//! The scan delivers the run in descending sequence order, so popping
//! from the end of the buffer yields ascending sequences. The first
//! record of the next run is held as a one-record lookahead:
//!
//! ```text
//! scan:   [p=5 s=9] [p=5 s=4] [p=5 s=1] [p=3 s=7] ...
//! run:    [s=9, s=4, s=1]   -> pops s=1, s=4, s=9
//! ahead:  [p=3 s=7]
//! ```
//!
//! Memory is bounded by the number of orders sharing one price.

use crate::error::{DexError, Result};
use crate::orderbook::book::decode;
use crate::store::keys::decode_order_book_record_key;
use crate::store::{KvPair, ScanDirection};
use crate::types::{OrderBookRecord, OrderBookRecordData, Side};

/// Lazy best-first record stream. A fresh iterator is a fresh cursor.
pub struct OrderBookIterator<'a> {
    inner: Box<dyn Iterator<Item = KvPair> + 'a>,
    order_book_id: u32,
    side: Side,
    direction: ScanDirection,
    /// Current equal-price run, in scan order.
    run: Vec<OrderBookRecord>,
    /// First record of the next run.
    lookahead: Option<OrderBookRecord>,
}

impl<'a> OrderBookIterator<'a> {
    pub(crate) fn new(
        inner: Box<dyn Iterator<Item = KvPair> + 'a>,
        order_book_id: u32,
        side: Side,
        direction: ScanDirection,
    ) -> Self {
        Self {
            inner,
            order_book_id,
            side,
            direction,
            run: Vec::new(),
            lookahead: None,
        }
    }

    pub fn order_book_id(&self) -> u32 {
        self.order_book_id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Next best record, `None` when the side is exhausted.
    pub fn next_record(&mut self) -> Result<Option<OrderBookRecord>> {
        match self.direction {
            ScanDirection::Forward => self.next_from_store(),
            ScanDirection::Reverse => self.next_from_tail(),
        }
    }

    fn next_from_tail(&mut self) -> Result<Option<OrderBookRecord>> {
        if let Some(record) = self.run.pop() {
            return Ok(Some(record));
        }

        let first = match self.lookahead.take() {
            Some(record) => record,
            None => match self.next_from_store()? {
                Some(record) => record,
                None => return Ok(None),
            },
        };
        let price = first.price;
        self.run.push(first);

        while let Some(record) = self.next_from_store()? {
            if record.price == price {
                self.run.push(record);
            } else {
                self.lookahead = Some(record);
                break;
            }
        }

        Ok(self.run.pop())
    }

    fn next_from_store(&mut self) -> Result<Option<OrderBookRecord>> {
        let (key, value) = match self.inner.next() {
            Some(pair) => pair,
            None => return Ok(None),
        };
        let (price, order_sequence) = decode_order_book_record_key(&key)?;
        let data: OrderBookRecordData = decode(&value, "order book record")
            .map_err(|e| DexError::invalid_state(format!("record {}: {}", order_sequence, e)))?;
        data.into_record(self.order_book_id, self.side, price, order_sequence)
            .map(Some)
    }
}

impl<'a> Iterator for OrderBookIterator<'a> {
    type Item = Result<OrderBookRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
