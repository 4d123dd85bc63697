//! Order types for the spot exchange.
//!
//! ## Order Lifecycle
//!
//! An [`Order`] enters through `Dex::place_order`, is validated here
//! ([`Order::validate`]), matched, and, for GTC limit orders with an
//! executable remainder, stored as a resting order. Resting orders are
//! persisted as [`OrderData`] (immutable attributes) plus an
//! `OrderBookRecord` (mutable remaining counters).
//!
//! ## SSZ Serialization
//!
//! [`OrderData`] derives `SimpleSerialize` from ssz_rs for deterministic
//! encoding. Enums are stored as `u8`, the price as its 9 ordered bytes,
//! absent options as `0`.

use ssz_rs::prelude::*;

use crate::error::{self, DexError};
use crate::math::{ceil_int, rational_from_u128, to_u128};
use crate::types::{Coin, Price};

/// Maximum length of an order ID.
pub const MAX_ORDER_ID_LEN: usize = 40;

/// Maximum length of a denom accepted by the exchange.
pub const MAX_DENOM_LEN: usize = 128;

// ============================================================================
// Side enum
// ============================================================================

/// Order side: Buy or Sell
///
/// Represented as u8 in keys and stored values:
/// - Buy = 1
/// - Sell = 2
///
/// Zero is left for "unspecified" so a zeroed byte never decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Side {
    #[default]
    Buy,
    Sell,
}

impl Side {
    /// Convert to u8 for serialization
    pub fn to_u8(self) -> u8 {
        match self {
            Side::Buy => 1,
            Side::Sell => 2,
        }
    }

    /// Convert from u8 for deserialization
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Side::Buy),
            2 => Some(Side::Sell),
            _ => None,
        }
    }

    /// Returns the opposite side
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

// ============================================================================
// OrderType / TimeInForce
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrderType {
    /// Executes at the given price or better.
    #[default]
    Limit,
    /// Executes against whatever the book offers, never rests.
    Market,
}

/// How long the unfilled part of an order stays alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeInForce {
    /// Good till cancelled: the remainder rests in the book.
    #[default]
    Gtc,
    /// Immediate or cancel: the remainder is dropped.
    Ioc,
    /// Fill or kill: nothing is executed unless everything is.
    Fok,
}

/// Optional expiry of a resting order. At least one field must be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GoodTil {
    /// Cancel once the chain reaches this height.
    pub block_height: Option<u64>,
    /// Cancel once the block time (unix seconds) reaches this value.
    pub block_time: Option<u64>,
}

impl GoodTil {
    pub fn height(height: u64) -> Self {
        Self {
            block_height: Some(height),
            block_time: None,
        }
    }

    pub fn time(time: u64) -> Self {
        Self {
            block_height: None,
            block_time: Some(time),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.block_height.is_none() && self.block_time.is_none()
    }
}

// ============================================================================
// Order struct
// ============================================================================

/// A trade intent, and the query projection of a resting order.
///
/// ## Example
///
/// ```
/// use spot_dex::types::{Order, Side};
///
/// let order = Order::limit("alice", "order-1", "ubtc", "uusd", Side::Sell, "375e-3".parse().unwrap(), 1000);
/// assert!(order.validate().is_ok());
/// assert_eq!(order.spend_denom(), "ubtc");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Order {
    pub creator: String,
    pub order_type: OrderType,
    pub id: String,
    /// Assigned on placement; must be zero on input.
    pub sequence: u64,
    pub base_denom: String,
    pub quote_denom: String,
    /// Required for limit orders, absent for market orders.
    pub price: Option<Price>,
    /// Base quantity.
    pub quantity: u128,
    pub side: Side,
    /// Output only.
    pub remaining_base_quantity: u128,
    /// Output only.
    pub remaining_spendable_balance: u128,
    pub good_til: Option<GoodTil>,
    pub time_in_force: TimeInForce,
    /// Output only.
    pub reserve: Option<Coin>,
}

impl Order {
    /// New GTC limit order.
    pub fn limit(
        creator: impl Into<String>,
        id: impl Into<String>,
        base_denom: impl Into<String>,
        quote_denom: impl Into<String>,
        side: Side,
        price: Price,
        quantity: u128,
    ) -> Self {
        Self {
            creator: creator.into(),
            order_type: OrderType::Limit,
            id: id.into(),
            base_denom: base_denom.into(),
            quote_denom: quote_denom.into(),
            price: Some(price),
            quantity,
            side,
            time_in_force: TimeInForce::Gtc,
            ..Default::default()
        }
    }

    /// New market order (always IOC).
    pub fn market(
        creator: impl Into<String>,
        id: impl Into<String>,
        base_denom: impl Into<String>,
        quote_denom: impl Into<String>,
        side: Side,
        quantity: u128,
    ) -> Self {
        Self {
            creator: creator.into(),
            order_type: OrderType::Market,
            id: id.into(),
            base_denom: base_denom.into(),
            quote_denom: quote_denom.into(),
            price: None,
            quantity,
            side,
            time_in_force: TimeInForce::Ioc,
            ..Default::default()
        }
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }

    pub fn with_good_til(mut self, good_til: GoodTil) -> Self {
        self.good_til = Some(good_til);
        self
    }

    /// Denom the order pays with.
    pub fn spend_denom(&self) -> &str {
        match self.side {
            Side::Buy => &self.quote_denom,
            Side::Sell => &self.base_denom,
        }
    }

    /// Denom the order acquires.
    pub fn receive_denom(&self) -> &str {
        match self.side {
            Side::Buy => &self.base_denom,
            Side::Sell => &self.quote_denom,
        }
    }

    /// Stateless validation of a placement request.
    pub fn validate(&self) -> error::Result<()> {
        if self.creator.is_empty() {
            return Err(DexError::invalid_input("creator must not be empty"));
        }
        validate_order_id(&self.id)?;
        if self.sequence != 0 {
            return Err(DexError::invalid_input("order sequence must be zero on placement"));
        }
        validate_denom("base denom", &self.base_denom)?;
        validate_denom("quote denom", &self.quote_denom)?;
        if self.base_denom == self.quote_denom {
            return Err(DexError::invalid_input("base and quote denoms must differ"));
        }
        if self.quantity == 0 {
            return Err(DexError::invalid_input("quantity must be positive"));
        }
        if self.remaining_base_quantity != 0 || self.remaining_spendable_balance != 0 {
            return Err(DexError::invalid_input("remaining counters must be zero on placement"));
        }
        if self.reserve.is_some() {
            return Err(DexError::invalid_input("reserve must not be set on placement"));
        }
        if let Some(good_til) = &self.good_til {
            if good_til.is_empty() {
                return Err(DexError::invalid_input(
                    "good til must set a block height or a block time",
                ));
            }
        }

        match self.order_type {
            OrderType::Limit => {
                if self.price.is_none() {
                    return Err(DexError::invalid_input("limit order requires a price"));
                }
                if self.good_til.is_some() && self.time_in_force != TimeInForce::Gtc {
                    return Err(DexError::invalid_input("good til is allowed only with GTC"));
                }
                // both amounts must be representable
                self.compute_limit_order_locked_balance()?;
                self.compute_limit_order_expected_to_receive()?;
            }
            OrderType::Market => {
                if self.price.is_some() {
                    return Err(DexError::invalid_input("market order must not have a price"));
                }
                if self.good_til.is_some() {
                    return Err(DexError::invalid_input("market order must not have good til"));
                }
                if self.time_in_force != TimeInForce::Ioc {
                    return Err(DexError::invalid_input("market order must be IOC"));
                }
            }
        }

        Ok(())
    }

    /// Amount locked by a limit order: `ceil(q * p)` quote for buys, `q` base for sells.
    pub fn compute_limit_order_locked_balance(&self) -> error::Result<Coin> {
        let price = self.limit_price()?;
        match self.side {
            Side::Buy => {
                let amount = ceil_mul(self.quantity, price)?;
                Ok(Coin::new(self.quote_denom.clone(), amount))
            }
            Side::Sell => Ok(Coin::new(self.base_denom.clone(), self.quantity)),
        }
    }

    /// Amount a fully executed limit order receives.
    pub fn compute_limit_order_expected_to_receive(&self) -> error::Result<Coin> {
        let price = self.limit_price()?;
        match self.side {
            Side::Buy => Ok(Coin::new(self.base_denom.clone(), self.quantity)),
            Side::Sell => {
                let amount = ceil_mul(self.quantity, price)?;
                Ok(Coin::new(self.quote_denom.clone(), amount))
            }
        }
    }

    fn limit_price(&self) -> error::Result<&Price> {
        self.price
            .as_ref()
            .ok_or_else(|| DexError::invalid_input("limit order requires a price"))
    }
}

fn ceil_mul(quantity: u128, price: &Price) -> error::Result<u128> {
    let value = ceil_int(&(rational_from_u128(quantity) * price.to_rational()));
    to_u128(&value).ok_or_else(|| {
        DexError::invalid_input(format!(
            "amount {} * {} is out of range",
            quantity, price
        ))
    })
}

fn validate_order_id(id: &str) -> error::Result<()> {
    if id.is_empty() || id.len() > MAX_ORDER_ID_LEN {
        return Err(DexError::invalid_input(format!(
            "order id must be 1 to {} characters long",
            MAX_ORDER_ID_LEN
        )));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '+' | ':' | '.' | '_' | '-');
    if !id.chars().all(allowed) {
        return Err(DexError::invalid_input(format!(
            "order id {} contains prohibited characters",
            id
        )));
    }
    Ok(())
}

fn validate_denom(what: &str, denom: &str) -> error::Result<()> {
    if denom.is_empty() {
        return Err(DexError::invalid_input(format!("{} must not be empty", what)));
    }
    if denom.len() > MAX_DENOM_LEN {
        return Err(DexError::invalid_input(format!(
            "{} {} is longer than {} bytes",
            what, denom, MAX_DENOM_LEN
        )));
    }
    Ok(())
}

// ============================================================================
// OrderData (stored)
// ============================================================================

/// Immutable attributes of a resting order, keyed by order sequence.
///
/// ## SSZ Layout
///
/// Variable-size container: fixed fields plus offsets for the three lists.
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct OrderData {
    pub order_id: List<u8, 40>,
    pub account_number: u64,
    pub order_book_id: u32,
    pub side: u8,
    /// Ordered price bytes.
    pub price: [u8; 9],
    pub quantity: u128,
    /// 0 means unset.
    pub good_til_block_height: u64,
    /// 0 means unset.
    pub good_til_block_time: u64,
    pub reserve_denom: List<u8, 128>,
    pub reserve_amount: u128,
}

impl OrderData {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: &str,
        account_number: u64,
        order_book_id: u32,
        side: Side,
        price: &Price,
        quantity: u128,
        good_til: Option<GoodTil>,
        reserve: Option<&Coin>,
    ) -> error::Result<Self> {
        let good_til = good_til.unwrap_or_default();
        Ok(Self {
            order_id: bytes_list(order_id.as_bytes())?,
            account_number,
            order_book_id,
            side: side.to_u8(),
            price: price.to_ordered_bytes(),
            quantity,
            good_til_block_height: good_til.block_height.unwrap_or(0),
            good_til_block_time: good_til.block_time.unwrap_or(0),
            reserve_denom: bytes_list(reserve.map(|c| c.denom.as_bytes()).unwrap_or(&[]))?,
            reserve_amount: reserve.map(|c| c.amount).unwrap_or(0),
        })
    }

    pub fn order_id(&self) -> error::Result<String> {
        list_to_string(&self.order_id)
    }

    pub fn side(&self) -> error::Result<Side> {
        Side::from_u8(self.side)
            .ok_or_else(|| DexError::invalid_state(format!("invalid stored side {}", self.side)))
    }

    pub fn price(&self) -> error::Result<Price> {
        Price::from_ordered_bytes(&self.price)
            .map_err(|e| DexError::invalid_state(format!("invalid stored price: {}", e)))
    }

    pub fn good_til(&self) -> Option<GoodTil> {
        let good_til = GoodTil {
            block_height: (self.good_til_block_height > 0).then_some(self.good_til_block_height),
            block_time: (self.good_til_block_time > 0).then_some(self.good_til_block_time),
        };
        (!good_til.is_empty()).then_some(good_til)
    }

    pub fn reserve(&self) -> error::Result<Option<Coin>> {
        if self.reserve_amount == 0 {
            return Ok(None);
        }
        Ok(Some(Coin::new(list_to_string(&self.reserve_denom)?, self.reserve_amount)))
    }
}

pub(crate) fn bytes_list<const N: usize>(bytes: &[u8]) -> error::Result<List<u8, N>> {
    List::try_from(bytes.to_vec())
        .map_err(|_| DexError::invalid_input(format!("value longer than {} bytes", N)))
}

pub(crate) fn list_to_string<const N: usize>(list: &List<u8, N>) -> error::Result<String> {
    String::from_utf8(list.iter().copied().collect())
        .map_err(|e| DexError::invalid_state(format!("stored string is not utf-8: {}", e)))
}

// ============================================================================
// Unit Tests
// ============================================================================
