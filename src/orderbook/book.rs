//! Persistent order book state on top of any [`KvStore`].
//!
//! [`OrderBookStore`] is a blanket extension trait: every key/value store,
//! committed or cached, gets typed accessors for records, order data,
//! the order ID index, per-denom counters and the order book registry.
//! Undecodable stored bytes are reported as `InvalidState`.

use ssz_rs::prelude::*;

use crate::error::{DexError, Result};
use crate::orderbook::OrderBookIterator;
use crate::store::keys::{
    self, account_orders_prefix, decode_order_book_data_key, decode_u32, decode_u64,
    order_book_data_key, order_book_key, order_book_record_key, order_book_side_key,
    order_data_key, order_id_key, orders_count_key,
};
use crate::store::{KvStore, ScanDirection};
use crate::types::{
    OrderBookData, OrderBookInfo, OrderBookRecord, OrderBookRecordData, OrderData, Price, Side,
};

pub(crate) fn encode<T: SimpleSerialize>(value: &T, what: &str) -> Result<Vec<u8>> {
    ssz_rs::serialize(value)
        .map_err(|e| DexError::invalid_state(format!("failed to encode {}: {:?}", what, e)))
}

pub(crate) fn decode<T: SimpleSerialize>(bytes: &[u8], what: &str) -> Result<T> {
    ssz_rs::deserialize(bytes)
        .map_err(|e| DexError::invalid_state(format!("failed to decode {}: {:?}", what, e)))
}

/// Typed order book accessors over a byte store.
pub trait OrderBookStore: KvStore {
    // ------------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------------

    fn save_order_book_record(&mut self, record: &OrderBookRecord) -> Result<()> {
        let price = record
            .price
            .as_ref()
            .ok_or_else(|| DexError::invalid_state("cannot store a record without price"))?;
        let key = order_book_record_key(
            record.order_book_id,
            record.side,
            price,
            record.order_sequence,
        );
        let value = encode(&record.to_data()?, "order book record")?;
        self.set(key, value);
        Ok(())
    }

    fn remove_order_book_record(
        &mut self,
        order_book_id: u32,
        side: Side,
        price: &Price,
        order_sequence: u64,
    ) {
        self.delete(&order_book_record_key(order_book_id, side, price, order_sequence));
    }

    fn get_order_book_record(
        &self,
        order_book_id: u32,
        side: Side,
        price: &Price,
        order_sequence: u64,
    ) -> Result<Option<OrderBookRecord>> {
        let key = order_book_record_key(order_book_id, side, price, order_sequence);
        match self.get(&key) {
            None => Ok(None),
            Some(bytes) => {
                let data: OrderBookRecordData = decode(&bytes, "order book record")?;
                data.into_record(order_book_id, side, *price, order_sequence)
                    .map(Some)
            }
        }
    }

    /// Best-first iterator over one side of one book.
    fn order_book_side_iterator(&self, order_book_id: u32, side: Side) -> OrderBookIterator<'_> {
        let direction = match side {
            Side::Sell => ScanDirection::Forward,
            Side::Buy => ScanDirection::Reverse,
        };
        let prefix = order_book_side_key(order_book_id, side);
        OrderBookIterator::new(
            self.iter_prefix(&prefix, direction),
            order_book_id,
            side,
            direction,
        )
    }

    // ------------------------------------------------------------------------
    // Sequences
    // ------------------------------------------------------------------------

    /// Next order sequence, starting at 1. Never reused.
    fn next_order_sequence(&mut self) -> Result<u64> {
        let current = match self.get(keys::ORDER_SEQUENCE_KEY) {
            Some(bytes) => decode_u64(&bytes)?,
            None => 0,
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| DexError::invalid_state("order sequence overflow"))?;
        self.set(keys::ORDER_SEQUENCE_KEY.to_vec(), next.to_be_bytes().to_vec());
        Ok(next)
    }

    // ------------------------------------------------------------------------
    // Order book registry
    // ------------------------------------------------------------------------

    fn get_order_book_id(&self, base_denom: &str, quote_denom: &str) -> Result<Option<u32>> {
        match self.get(&order_book_key(base_denom, quote_denom)?) {
            Some(bytes) => decode_u32(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Ids of `(base, quote)` and of its inverse `(quote, base)`.
    fn get_order_book_ids(&self, base_denom: &str, quote_denom: &str) -> Result<Option<(u32, u32)>> {
        let id = self.get_order_book_id(base_denom, quote_denom)?;
        let inverted = self.get_order_book_id(quote_denom, base_denom)?;
        match (id, inverted) {
            (Some(id), Some(inverted)) => Ok(Some((id, inverted))),
            (None, None) => Ok(None),
            _ => Err(DexError::invalid_state(format!(
                "order book {}/{} is registered in one direction only",
                base_denom, quote_denom
            ))),
        }
    }

    /// Registers both directions on first use, as ids `n` and `n + 1`.
    fn get_or_create_order_book_ids(
        &mut self,
        base_denom: &str,
        quote_denom: &str,
    ) -> Result<(u32, u32)> {
        if let Some(ids) = self.get_order_book_ids(base_denom, quote_denom)? {
            return Ok(ids);
        }

        let next = match self.get(keys::ORDER_BOOK_SEQUENCE_KEY) {
            Some(bytes) => decode_u32(&bytes)?,
            None => 0,
        };
        let id = next;
        let inverted = next
            .checked_add(1)
            .ok_or_else(|| DexError::invalid_state("order book id overflow"))?;
        let following = inverted
            .checked_add(1)
            .ok_or_else(|| DexError::invalid_state("order book id overflow"))?;
        self.set(
            keys::ORDER_BOOK_SEQUENCE_KEY.to_vec(),
            following.to_be_bytes().to_vec(),
        );

        self.set(
            order_book_key(base_denom, quote_denom)?,
            id.to_be_bytes().to_vec(),
        );
        self.set(
            order_book_key(quote_denom, base_denom)?,
            inverted.to_be_bytes().to_vec(),
        );
        self.set(
            order_book_data_key(id),
            encode(&OrderBookData::new(base_denom, quote_denom)?, "order book data")?,
        );
        self.set(
            order_book_data_key(inverted),
            encode(&OrderBookData::new(quote_denom, base_denom)?, "order book data")?,
        );

        tracing::debug!(base_denom, quote_denom, id, inverted, "registered order books");
        Ok((id, inverted))
    }

    fn get_order_book_data(&self, order_book_id: u32) -> Result<OrderBookData> {
        let bytes = self.get(&order_book_data_key(order_book_id)).ok_or_else(|| {
            DexError::invalid_state(format!("order book {} is not registered", order_book_id))
        })?;
        decode(&bytes, "order book data")
    }

    fn order_books(&self) -> Result<Vec<OrderBookInfo>> {
        self.iter_prefix(&[keys::ORDER_BOOK_DATA_PREFIX], ScanDirection::Forward)
            .map(|(key, value)| {
                let id = decode_order_book_data_key(&key)?;
                let data: OrderBookData = decode(&value, "order book data")?;
                Ok(OrderBookInfo {
                    id,
                    base_denom: data.base_denom()?,
                    quote_denom: data.quote_denom()?,
                })
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Order data and ID index
    // ------------------------------------------------------------------------

    fn save_order_data(&mut self, order_sequence: u64, data: &OrderData) -> Result<()> {
        let value = encode(data, "order data")?;
        self.set(order_data_key(order_sequence), value);
        Ok(())
    }

    fn get_order_data(&self, order_sequence: u64) -> Result<Option<OrderData>> {
        match self.get(&order_data_key(order_sequence)) {
            Some(bytes) => decode(&bytes, "order data").map(Some),
            None => Ok(None),
        }
    }

    fn remove_order_data(&mut self, order_sequence: u64) {
        self.delete(&order_data_key(order_sequence));
    }

    fn save_order_id(&mut self, account_number: u64, order_id: &str, order_sequence: u64) -> Result<()> {
        self.set(
            order_id_key(account_number, order_id)?,
            order_sequence.to_be_bytes().to_vec(),
        );
        Ok(())
    }

    fn get_order_sequence(&self, account_number: u64, order_id: &str) -> Result<Option<u64>> {
        match self.get(&order_id_key(account_number, order_id)?) {
            Some(bytes) => decode_u64(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn remove_order_id(&mut self, account_number: u64, order_id: &str) -> Result<()> {
        self.delete(&order_id_key(account_number, order_id)?);
        Ok(())
    }

    /// Sequences of all resting orders of an account, ordered by order ID.
    fn account_order_sequences(&self, account_number: u64) -> Result<Vec<u64>> {
        self.iter_prefix(&account_orders_prefix(account_number), ScanDirection::Forward)
            .map(|(_, value)| decode_u64(&value))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Per-denom counters
    // ------------------------------------------------------------------------

    fn orders_count(&self, account_number: u64, denom: &str) -> Result<u64> {
        match self.get(&orders_count_key(account_number, denom)?) {
            Some(bytes) => decode_u64(&bytes),
            None => Ok(0),
        }
    }

    /// Count one more resting order, failing above `max`.
    fn increment_orders_count(&mut self, account_number: u64, denom: &str, max: u64) -> Result<u64> {
        let count = self.orders_count(account_number, denom)? + 1;
        if count > max {
            return Err(DexError::TooManyOrders {
                account: account_number.to_string(),
                denom: denom.to_string(),
                max,
            });
        }
        self.set(
            orders_count_key(account_number, denom)?,
            count.to_be_bytes().to_vec(),
        );
        Ok(count)
    }

    fn decrement_orders_count(&mut self, account_number: u64, denom: &str) -> Result<u64> {
        let count = self.orders_count(account_number, denom)?.checked_sub(1).ok_or_else(|| {
            DexError::invalid_state(format!(
                "orders count of account {} for {} is already zero",
                account_number, denom
            ))
        })?;
        let key = orders_count_key(account_number, denom)?;
        if count == 0 {
            self.delete(&key);
        } else {
            self.set(key, count.to_be_bytes().to_vec());
        }
        Ok(count)
    }
}

impl<S: KvStore + ?std::marker::Sized> OrderBookStore for S {}

// ============================================================================
// Unit Tests
// ============================================================================
