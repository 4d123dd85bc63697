//! Ordered key encoding.
//!
//! Multi-part keys are built so that unsigned lexicographic byte order
//! equals the logical order of their parts: fixed-width integers are
//! big-endian, prices use [`Price::to_ordered_bytes`], variable-length
//! strings are length-prefixed.
//!
//! ## Layout
//!
//! | Prefix | Key | Value |
//! |--------|-----|-------|
//! | `0x01` | - | next order sequence (u64 BE) |
//! | `0x02` | - | next order book id (u32 BE) |
//! | `0x03` | len‖base ‖ len‖quote | order book id (u32 BE) |
//! | `0x04` | book id | `OrderBookData` |
//! | `0x05` | book id ‖ side ‖ price(9) ‖ sequence | `OrderBookRecordData` |
//! | `0x06` | account ‖ len‖order id | order sequence (u64 BE) |
//! | `0x07` | sequence | `OrderData` |
//! | `0x08` | account ‖ len‖denom | resting orders count (u64 BE) |

use crate::error::{DexError, Result};
use crate::types::price::ORDERED_BYTES_LEN;
use crate::types::{Price, Side};

pub const ORDER_SEQUENCE_KEY: &[u8] = &[0x01];
pub const ORDER_BOOK_SEQUENCE_KEY: &[u8] = &[0x02];
pub const ORDER_BOOK_ID_PREFIX: u8 = 0x03;
pub const ORDER_BOOK_DATA_PREFIX: u8 = 0x04;
pub const ORDER_BOOK_RECORD_PREFIX: u8 = 0x05;
pub const ORDER_ID_PREFIX: u8 = 0x06;
pub const ORDER_DATA_PREFIX: u8 = 0x07;
pub const ORDERS_COUNT_PREFIX: u8 = 0x08;

/// Length of a record key after its side key.
const RECORD_SUFFIX_LEN: usize = ORDERED_BYTES_LEN + 8;

fn push_len_prefixed(buf: &mut Vec<u8>, part: &[u8]) -> Result<()> {
    let len = u8::try_from(part.len()).map_err(|_| {
        DexError::invalid_input(format!("key part of {} bytes is too long", part.len()))
    })?;
    buf.push(len);
    buf.extend_from_slice(part);
    Ok(())
}

/// `(base, quote)` to order book id mapping key.
pub fn order_book_key(base_denom: &str, quote_denom: &str) -> Result<Vec<u8>> {
    let mut key = Vec::with_capacity(3 + base_denom.len() + quote_denom.len());
    key.push(ORDER_BOOK_ID_PREFIX);
    push_len_prefixed(&mut key, base_denom.as_bytes())?;
    push_len_prefixed(&mut key, quote_denom.as_bytes())?;
    Ok(key)
}

pub fn order_book_data_key(order_book_id: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(5);
    key.push(ORDER_BOOK_DATA_PREFIX);
    key.extend_from_slice(&order_book_id.to_be_bytes());
    key
}

/// Prefix shared by all records of one side of one book.
pub fn order_book_side_key(order_book_id: u32, side: Side) -> Vec<u8> {
    let mut key = Vec::with_capacity(6 + RECORD_SUFFIX_LEN);
    key.push(ORDER_BOOK_RECORD_PREFIX);
    key.extend_from_slice(&order_book_id.to_be_bytes());
    key.push(side.to_u8());
    key
}

pub fn order_book_record_key(
    order_book_id: u32,
    side: Side,
    price: &Price,
    order_sequence: u64,
) -> Vec<u8> {
    let mut key = order_book_side_key(order_book_id, side);
    key.extend_from_slice(&price.to_ordered_bytes());
    key.extend_from_slice(&order_sequence.to_be_bytes());
    key
}

/// Decode `price ‖ sequence` from a full record key.
pub fn decode_order_book_record_key(key: &[u8]) -> Result<(Price, u64)> {
    let side_key_len = 6;
    if key.len() != side_key_len + RECORD_SUFFIX_LEN {
        return Err(DexError::invalid_state(format!(
            "order book record key has length {}",
            key.len()
        )));
    }
    let suffix = &key[side_key_len..];
    let price = Price::from_ordered_bytes(&suffix[..ORDERED_BYTES_LEN])
        .map_err(|e| DexError::invalid_state(format!("record key price: {}", e)))?;
    let sequence = decode_u64(&suffix[ORDERED_BYTES_LEN..])?;
    Ok((price, sequence))
}

pub fn account_orders_prefix(account_number: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(ORDER_ID_PREFIX);
    key.extend_from_slice(&account_number.to_be_bytes());
    key
}

pub fn order_id_key(account_number: u64, order_id: &str) -> Result<Vec<u8>> {
    let mut key = account_orders_prefix(account_number);
    push_len_prefixed(&mut key, order_id.as_bytes())?;
    Ok(key)
}

pub fn order_data_key(order_sequence: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(ORDER_DATA_PREFIX);
    key.extend_from_slice(&order_sequence.to_be_bytes());
    key
}

pub fn orders_count_key(account_number: u64, denom: &str) -> Result<Vec<u8>> {
    let mut key = Vec::with_capacity(10 + denom.len());
    key.push(ORDERS_COUNT_PREFIX);
    key.extend_from_slice(&account_number.to_be_bytes());
    push_len_prefixed(&mut key, denom.as_bytes())?;
    Ok(key)
}

/// Order book id from an `order_book_data_key`.
pub fn decode_order_book_data_key(key: &[u8]) -> Result<u32> {
    if key.len() != 5 || key[0] != ORDER_BOOK_DATA_PREFIX {
        return Err(DexError::invalid_state("malformed order book data key"));
    }
    decode_u32(&key[1..])
}

pub fn decode_u64(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| DexError::invalid_state(format!("expected 8 bytes, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

pub fn decode_u32(bytes: &[u8]) -> Result<u32> {
    let raw: [u8; 4] = bytes
        .try_into()
        .map_err(|_| DexError::invalid_state(format!("expected 4 bytes, got {}", bytes.len())))?;
    Ok(u32::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(s: &str) -> Price {
        s.parse().unwrap()
    }

    #[test]
    fn test_record_key_roundtrip() {
        let key = order_book_record_key(7, Side::Sell, &price("375e-3"), 42);
        assert_eq!(key.len(), 6 + 9 + 8);
        assert!(key.starts_with(&order_book_side_key(7, Side::Sell)));
        let (p, seq) = decode_order_book_record_key(&key).unwrap();
        assert_eq!(p, price("375e-3"));
        assert_eq!(seq, 42);
    }

    #[test]
    fn test_record_keys_sort_by_price_then_sequence() {
        let keys = [
            order_book_record_key(1, Side::Sell, &price("1e-3"), 9),
            order_book_record_key(1, Side::Sell, &price("375e-3"), 2),
            order_book_record_key(1, Side::Sell, &price("375e-3"), 3),
            order_book_record_key(1, Side::Sell, &price("376e-3"), 1),
            order_book_record_key(1, Side::Sell, &price("1"), 1),
            order_book_record_key(1, Side::Sell, &price("1e1"), 0),
            order_book_record_key(1, Side::Sell, &price("256"), 0),
        ];
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_sides_and_books_do_not_interleave() {
        let buy_high = order_book_record_key(1, Side::Buy, &price("1e100"), u64::MAX);
        let sell_low = order_book_record_key(1, Side::Sell, &price("1e-100"), 0);
        let next_book = order_book_record_key(2, Side::Buy, &price("1e-100"), 0);
        assert!(buy_high < sell_low);
        assert!(sell_low < next_book);
    }

    #[test]
    fn test_corrupt_record_key() {
        assert!(decode_order_book_record_key(&[0x05, 0, 0, 0, 1, 1]).is_err());
        let mut key = order_book_record_key(1, Side::Buy, &price("5"), 1);
        key[6 + 1] = 0;
        assert_eq!(
            decode_order_book_record_key(&key).unwrap_err().kind(),
            crate::error::ErrorKind::InternalState
        );
    }

    #[test]
    fn test_length_prefix_separates_denoms() {
        assert_ne!(
            order_book_key("ab", "c").unwrap(),
            order_book_key("a", "bc").unwrap()
        );
        assert!(order_book_key(&"x".repeat(256), "y").is_err());
    }

    #[test]
    fn test_account_keys() {
        let key = order_id_key(5, "id").unwrap();
        assert!(key.starts_with(&account_orders_prefix(5)));
        assert!(!key.starts_with(&account_orders_prefix(6)));
        assert_eq!(decode_order_book_data_key(&order_book_data_key(77)).unwrap(), 77);
    }
}
