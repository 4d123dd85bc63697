//! Price tick and quantity step of a pair.
//!
//! Both are powers of ten derived from the reference amounts of the two
//! denoms, so that a tick is economically meaningful whatever the
//! magnitude of the denoms:
//!
//! ```text
//! price_tick    = 10^(tick_exp + ceil(log10(quote_ref / base_ref)))
//! quantity_step = max(1, 10^(step_exp + ceil(log10(base_ref))))
//! ```
//!
//! `ceil(log10(..))` is exact over rationals, see [`crate::math::ceil_log10`].

use num_bigint::BigInt;
use num_rational::BigRational;

use crate::error::{DexError, Result};
use crate::math::{ceil_log10, is_integer, rational_from_decimal};
use crate::types::{Order, Params, Price};

/// Admissible price/quantity grid of one `(base, quote)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceGrid {
    pub price_tick: Price,
    pub quantity_step: u128,
}

impl PriceGrid {
    /// Grid from module params.
    pub fn for_pair(params: &Params, base_denom: &str, quote_denom: &str) -> Result<Self> {
        let base_ref = rational_from_decimal(params.unified_ref_amount(base_denom));
        let quote_ref = rational_from_decimal(params.unified_ref_amount(quote_denom));
        Ok(Self {
            price_tick: price_tick(&base_ref, &quote_ref, params.price_tick_exponent)?,
            quantity_step: quantity_step(&base_ref, params.quantity_step_exponent)?,
        })
    }

    /// Checks the limit price (if any) and the quantity of an order.
    pub fn validate_order(&self, order: &Order) -> Result<()> {
        if let Some(price) = &order.price {
            validate_price(price, &self.price_tick)?;
        }
        validate_quantity(order.quantity, self.quantity_step)
    }
}

/// `10^(exponent + ceil(log10(quote_ref / base_ref)))`.
pub fn price_tick(base_ref: &BigRational, quote_ref: &BigRational, exponent: i32) -> Result<Price> {
    if *base_ref <= BigRational::from_integer(BigInt::from(0)) {
        return Err(DexError::invalid_input("base reference amount must be positive"));
    }
    let ratio = quote_ref / base_ref;
    let log = ceil_log10(&ratio)
        .ok_or_else(|| DexError::invalid_input("quote reference amount must be positive"))?;
    let tick_exponent = exponent
        .checked_add(log)
        .ok_or_else(|| DexError::invalid_input("price tick exponent overflow"))?;
    Ok(Price::new(1, tick_exponent)?)
}

/// `max(1, 10^(exponent + ceil(log10(base_ref))))`.
pub fn quantity_step(base_ref: &BigRational, exponent: i32) -> Result<u128> {
    let log = ceil_log10(base_ref)
        .ok_or_else(|| DexError::invalid_input("base reference amount must be positive"))?;
    let step_exponent = exponent
        .checked_add(log)
        .ok_or_else(|| DexError::invalid_input("quantity step exponent overflow"))?;
    if step_exponent <= 0 {
        return Ok(1);
    }
    10u128
        .checked_pow(step_exponent as u32)
        .ok_or_else(|| DexError::invalid_input(format!("quantity step 10^{} is out of range", step_exponent)))
}

/// The price must be an integer multiple of the tick.
pub fn validate_price(price: &Price, tick: &Price) -> Result<()> {
    if is_integer(&(price.to_rational() / tick.to_rational())) {
        Ok(())
    } else {
        Err(DexError::PriceTick {
            price: price.to_string(),
            tick: tick.to_string(),
        })
    }
}

/// The quantity must be an integer multiple of the step.
pub fn validate_quantity(quantity: u128, step: u128) -> Result<()> {
    if step != 0 && quantity % step == 0 {
        Ok(())
    } else {
        Err(DexError::QuantityStep { quantity, step })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
