//! Taker/maker matching with exact rational arithmetic.
//!
//! ## Algorithm
//!
//! For every candidate returned by the [`MatchingFinder`]:
//!
//! 1. Bring the maker into the taker's market. A maker from the reciprocal
//!    book (same side as the taker) is *inverted*: opposite side, price
//!    `1/p`, base quantity `remaining * p`.
//! 2. Compare the maximum base quantity each side can execute at the
//!    maker's price, as rationals. The smaller side closes, equal closes
//!    both.
//! 3. Clamp the executed base quantity to a multiple of the price
//!    denominator, so that `quote = base * price` is an integer:
//!
//! ```text
//! price = num / den
//! n     = floor(floor(max_base) / den)
//! base  = n * den
//! quote = n * num
//! ```
//!
//! 4. Reduce both records. A maker that closes, or whose remainder can no
//!    longer execute at its own price, is removed and its residual lock
//!    (plus reserve) refunded.
//!
//! Nothing is written here: every effect is appended to a
//! [`MatchingResult`] and applied by the settlement step.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;

use crate::engine::{MatchingFinder, MatchingResult};
use crate::error::{DexError, Result};
use crate::math::{floor_int, int_quo, rational_from_u128, to_u128};
use crate::orderbook::OrderBookStore;
use crate::store::KvStore;
use crate::types::{CloseResult, Coin, Order, OrderBookRecord, Price, Side, Trade};

// ============================================================================
// MatchingRecord
// ============================================================================

/// A record expressed in the taker's market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingRecord {
    pub side: Side,
    /// `None` for market takers.
    pub price: Option<BigRational>,
    pub base_quantity: BigRational,
    pub spend_balance: BigRational,
}

impl MatchingRecord {
    /// Record as-is, or inverted when it comes from the reciprocal book.
    pub fn from_record(record: &OrderBookRecord, inverted: bool) -> Result<Self> {
        let price = record.price.as_ref().map(Price::to_rational);
        let base_quantity = rational_from_u128(record.remaining_base_quantity);
        let spend_balance = rational_from_u128(record.remaining_spendable_balance);

        if !inverted {
            return Ok(Self {
                side: record.side,
                price,
                base_quantity,
                spend_balance,
            });
        }

        let price = price.ok_or_else(|| {
            DexError::invalid_state(format!(
                "inverted record {} has no price",
                record.order_sequence
            ))
        })?;
        Ok(Self {
            side: record.side.opposite(),
            base_quantity: base_quantity * &price,
            price: Some(price.recip()),
            spend_balance,
        })
    }

    pub fn is_limit(&self) -> bool {
        self.price.is_some()
    }

    /// Maximum base quantity executable at `price`.
    ///
    /// Limit records execute their base quantity. Market sells are also
    /// bounded by the balance, market buys by `balance / price`.
    pub fn max_base_quantity_for_price(&self, price: &BigRational) -> BigRational {
        if self.is_limit() {
            return self.base_quantity.clone();
        }
        let from_balance = match self.side {
            Side::Sell => self.spend_balance.clone(),
            Side::Buy => &self.spend_balance / price,
        };
        if from_balance < self.base_quantity {
            from_balance
        } else {
            self.base_quantity.clone()
        }
    }
}

// ============================================================================
// Trade computation
// ============================================================================

/// Largest integer `(base, quote)` pair at `price` with `base <= max_base`.
pub fn max_int_execution_quantity(price: &BigRational, max_base: &BigInt) -> (BigInt, BigInt) {
    let n = int_quo(max_base, price.denom());
    let base = &n * price.denom();
    let quote = &n * price.numer();
    (base, quote)
}

/// Trade between a taker and a maker already expressed in the taker's market.
pub fn compute_trade(taker: &MatchingRecord, maker: &MatchingRecord) -> Result<(Trade, CloseResult)> {
    if taker.side == maker.side {
        return Ok((Trade::default(), CloseResult::NoMatch));
    }
    let price = maker
        .price
        .clone()
        .ok_or_else(|| DexError::invalid_state("maker record has no price"))?;
    if price.is_zero() {
        return Err(DexError::invalid_state("maker record has a zero price"));
    }

    let taker_max = taker.max_base_quantity_for_price(&price);
    let maker_max = maker.max_base_quantity_for_price(&price);

    // Rational comparison: an integer one could hide which side is the
    // limiting one after rounding.
    let (close, max_base) = match taker_max.cmp(&maker_max) {
        std::cmp::Ordering::Less => (CloseResult::CloseTaker, taker_max),
        std::cmp::Ordering::Equal => (CloseResult::CloseBoth, taker_max),
        std::cmp::Ordering::Greater => (CloseResult::CloseMaker, maker_max),
    };

    let (base, quote) = max_int_execution_quantity(&price, &floor_int(&max_base));
    let base_quantity = u128_of(&base, "trade base quantity")?;
    let quote_quantity = u128_of(&quote, "trade quote quantity")?;

    let (taker_spends, taker_receives) = match taker.side {
        Side::Sell => (base_quantity, quote_quantity),
        Side::Buy => (quote_quantity, base_quantity),
    };

    Ok((
        Trade {
            base_quantity,
            quote_quantity,
            price: Some(price),
            taker_spends,
            taker_receives,
        },
        close,
    ))
}

/// Whether the record's remaining base quantity executes at its own price.
///
/// `101` at `0.397` is not executable: `floor(101 / 1000) * 1000 = 0`.
/// `101` at `0.39` is: `floor(101 / 100) * 100 = 100`.
pub fn is_executable_as_maker(record: &OrderBookRecord) -> Result<bool> {
    let price = record.price.as_ref().ok_or_else(|| {
        DexError::invalid_state(format!("record {} has no price", record.order_sequence))
    })?;
    let (base, _) = max_int_execution_quantity(
        &price.to_rational(),
        &BigInt::from(record.remaining_base_quantity),
    );
    Ok(!base.is_zero())
}

fn u128_of(value: &BigInt, what: &str) -> Result<u128> {
    to_u128(value).ok_or_else(|| DexError::invalid_state(format!("{} {} is out of range", what, value)))
}

fn checked_sub(value: u128, by: u128, what: &str, record: &OrderBookRecord) -> Result<u128> {
    value.checked_sub(by).ok_or_else(|| {
        DexError::invalid_state(format!(
            "{} of order {} underflows: {} - {}",
            what, record.order_sequence, value, by
        ))
    })
}

// ============================================================================
// MatchingEngine
// ============================================================================

/// Runs one taker against the books of a pair.
///
/// The engine only reads the store; the returned [`MatchingResult`] holds
/// every effect to apply.
pub struct MatchingEngine<'s, S: KvStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: KvStore + ?Sized> MatchingEngine<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Match `taker_record` (the record form of `taker_order`) until it is
    /// filled or nothing crosses its price.
    pub fn match_order(
        &self,
        inverted_order_book_id: u32,
        taker_order: &Order,
        taker_record: OrderBookRecord,
    ) -> Result<MatchingResult> {
        let mut finder = MatchingFinder::new(
            self.store,
            taker_record.order_book_id,
            inverted_order_book_id,
            taker_record.side,
            taker_record.price.as_ref(),
        );
        let mut result = MatchingResult::new(taker_order.clone(), taker_record);

        tracing::debug!(taker = %result.taker_record, "matching order");

        while let Some(mut maker_record) = finder.next_match()? {
            if self.match_records(&mut result, &mut maker_record, taker_order)? {
                result.taker_closed = true;
                break;
            }
        }

        tracing::debug!(
            taker = %result.taker_record,
            closed = result.taker_closed,
            trades = result.trades.len(),
            "matching finished"
        );
        Ok(result)
    }

    /// One taker/maker step. Returns whether the taker is closed.
    fn match_records(
        &self,
        result: &mut MatchingResult,
        maker_record: &mut OrderBookRecord,
        taker_order: &Order,
    ) -> Result<bool> {
        let taker_spends_denom = taker_order.spend_denom().to_string();
        let taker_receives_denom = taker_order.receive_denom().to_string();
        let inverted = result.taker_record.side == maker_record.side;

        let taker = MatchingRecord::from_record(&result.taker_record, false)?;
        let maker = MatchingRecord::from_record(maker_record, inverted)?;
        let (trade, close) = compute_trade(&taker, &maker)?;

        tracing::debug!(
            maker = %maker_record,
            inverted,
            %close,
            base = trade.base_quantity,
            quote = trade.quote_quantity,
            "matched records"
        );

        let executed = trade.base_quantity > 0;
        if !executed && close == CloseResult::CloseTaker {
            // the taker is too small to execute at this maker's price
            return Ok(true);
        }
        if executed {
            result.register_trade(
                maker_record,
                Coin::new(taker_spends_denom, trade.taker_spends),
                Coin::new(taker_receives_denom.clone(), trade.taker_receives),
            );
        }

        // reduce taker
        let taker_record = &mut result.taker_record;
        taker_record.remaining_base_quantity = checked_sub(
            taker_record.remaining_base_quantity,
            trade.base_quantity,
            "remaining base quantity",
            taker_record,
        )?;
        taker_record.remaining_spendable_balance = checked_sub(
            taker_record.remaining_spendable_balance,
            trade.taker_spends,
            "remaining spendable balance",
            taker_record,
        )?;

        // reduce maker
        let maker_base_reduction = if inverted {
            trade.quote_quantity
        } else {
            trade.base_quantity
        };
        maker_record.remaining_base_quantity = checked_sub(
            maker_record.remaining_base_quantity,
            maker_base_reduction,
            "remaining base quantity",
            maker_record,
        )?;
        maker_record.remaining_spendable_balance = checked_sub(
            maker_record.remaining_spendable_balance,
            trade.taker_receives,
            "remaining spendable balance",
            maker_record,
        )?;

        if close.closes_maker() || !is_executable_as_maker(maker_record)? {
            // the maker spends what the taker receives
            result.register_maker_unlock(
                maker_record.account_number,
                Coin::new(taker_receives_denom, maker_record.remaining_spendable_balance),
            );
            let data = self
                .store
                .get_order_data(maker_record.order_sequence)?
                .ok_or_else(|| {
                    DexError::invalid_state(format!(
                        "order data of maker {} not found",
                        maker_record.order_sequence
                    ))
                })?;
            if let Some(reserve) = data.reserve()? {
                result.register_maker_unlock(maker_record.account_number, reserve);
            }
            result.register_removed_record(maker_record.clone());
        } else {
            result.register_updated_record(maker_record.clone());
        }
        if executed {
            result.trades.push(trade);
        }

        Ok(close.closes_taker())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
