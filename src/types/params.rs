//! Module parameters.
//!
//! Reference amounts are decimals: the amount of a denom that is worth
//! roughly one common unit. They drive the price tick and quantity step
//! of every pair (see `orderbook::grid`).

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::error::{DexError, Result};
use crate::types::Coin;

/// Default reference amount for denoms without an override.
pub const DEFAULT_UNIFIED_REF_AMOUNT: u64 = 1_000_000;
pub const DEFAULT_PRICE_TICK_EXPONENT: i32 = -6;
pub const DEFAULT_QUANTITY_STEP_EXPONENT: i32 = -2;
pub const DEFAULT_MAX_ORDERS_PER_DENOM: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Params {
    pub default_unified_ref_amount: Decimal,
    /// Per-denom overrides of the reference amount.
    pub unified_ref_amounts: BTreeMap<String, Decimal>,
    pub price_tick_exponent: i32,
    pub quantity_step_exponent: i32,
    /// Resting orders per creator and denom.
    pub max_orders_per_denom: u64,
    /// Locked per resting order, if set.
    pub order_reserve: Option<Coin>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            default_unified_ref_amount: Decimal::from(DEFAULT_UNIFIED_REF_AMOUNT),
            unified_ref_amounts: BTreeMap::new(),
            price_tick_exponent: DEFAULT_PRICE_TICK_EXPONENT,
            quantity_step_exponent: DEFAULT_QUANTITY_STEP_EXPONENT,
            max_orders_per_denom: DEFAULT_MAX_ORDERS_PER_DENOM,
            order_reserve: None,
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<()> {
        if self.default_unified_ref_amount <= Decimal::ZERO {
            return Err(DexError::invalid_input(
                "default unified ref amount must be positive",
            ));
        }
        for (denom, amount) in &self.unified_ref_amounts {
            if *amount <= Decimal::ZERO {
                return Err(DexError::invalid_input(format!(
                    "unified ref amount of {} must be positive",
                    denom
                )));
            }
        }
        if self.max_orders_per_denom == 0 {
            return Err(DexError::invalid_input("max orders per denom must be positive"));
        }
        if let Some(reserve) = &self.order_reserve {
            if reserve.denom.is_empty() {
                return Err(DexError::invalid_input("order reserve denom must not be empty"));
            }
        }
        Ok(())
    }

    /// Reference amount of a denom.
    pub fn unified_ref_amount(&self, denom: &str) -> Decimal {
        self.unified_ref_amounts
            .get(denom)
            .copied()
            .unwrap_or(self.default_unified_ref_amount)
    }

    pub fn with_unified_ref_amount(mut self, denom: impl Into<String>, amount: Decimal) -> Self {
        self.unified_ref_amounts.insert(denom.into(), amount);
        self
    }

    /// Reserve to lock, `None` when unset or zero.
    pub fn reserve(&self) -> Option<&Coin> {
        self.order_reserve.as_ref().filter(|c| c.is_positive())
    }
}
