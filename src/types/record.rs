//! Order book record: the resting representation of an order.
//!
//! The key part (book, side, price, sequence) lives in the store key, the
//! value part is SSZ-encoded as [`OrderBookRecordData`].

use std::fmt;

use ssz_rs::prelude::*;

use crate::error;
use crate::types::order::{bytes_list, list_to_string};
use crate::types::{Price, Side};

/// One resting order inside one side of one order book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBookRecord {
    pub order_book_id: u32,
    pub side: Side,
    /// `None` only for a market taker during matching; stored records always have a price.
    pub price: Option<Price>,
    pub order_sequence: u64,
    pub order_id: String,
    pub account_number: u64,
    pub remaining_base_quantity: u128,
    pub remaining_spendable_balance: u128,
}

impl OrderBookRecord {
    pub(crate) fn to_data(&self) -> error::Result<OrderBookRecordData> {
        Ok(OrderBookRecordData {
            order_id: bytes_list(self.order_id.as_bytes())?,
            account_number: self.account_number,
            remaining_base_quantity: self.remaining_base_quantity,
            remaining_spendable_balance: self.remaining_spendable_balance,
        })
    }
}

impl fmt::Display for OrderBookRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let price = self
            .price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "market".to_string());
        write!(
            f,
            "book={} side={:?} price={} seq={} id={} acc={} base={} balance={}",
            self.order_book_id,
            self.side,
            price,
            self.order_sequence,
            self.order_id,
            self.account_number,
            self.remaining_base_quantity,
            self.remaining_spendable_balance
        )
    }
}

/// Stored value of an order book record.
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct OrderBookRecordData {
    pub order_id: List<u8, 40>,
    pub account_number: u64,
    pub remaining_base_quantity: u128,
    pub remaining_spendable_balance: u128,
}

impl OrderBookRecordData {
    pub(crate) fn into_record(
        self,
        order_book_id: u32,
        side: Side,
        price: Price,
        order_sequence: u64,
    ) -> error::Result<OrderBookRecord> {
        Ok(OrderBookRecord {
            order_book_id,
            side,
            price: Some(price),
            order_sequence,
            order_id: list_to_string(&self.order_id)?,
            account_number: self.account_number,
            remaining_base_quantity: self.remaining_base_quantity,
            remaining_spendable_balance: self.remaining_spendable_balance,
        })
    }
}

/// Denoms of one order book direction.
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct OrderBookData {
    pub base_denom: List<u8, 128>,
    pub quote_denom: List<u8, 128>,
}

impl OrderBookData {
    pub fn new(base_denom: &str, quote_denom: &str) -> error::Result<Self> {
        Ok(Self {
            base_denom: bytes_list(base_denom.as_bytes())?,
            quote_denom: bytes_list(quote_denom.as_bytes())?,
        })
    }

    pub fn base_denom(&self) -> error::Result<String> {
        list_to_string(&self.base_denom)
    }

    pub fn quote_denom(&self) -> error::Result<String> {
        list_to_string(&self.quote_denom)
    }
}

/// Query view of an order book direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBookInfo {
    pub id: u32,
    pub base_denom: String,
    pub quote_denom: String,
}
