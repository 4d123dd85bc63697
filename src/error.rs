//! Error types for the spot exchange.
//!
//! Every failure is classified into one of four kinds (see [`ErrorKind`]):
//!
//! | Kind | Meaning | State mutated? |
//! |------|---------|----------------|
//! | `InvalidInput` | malformed price, off-grid order, duplicate ID | no |
//! | `Capability` | ledger/account/scheduler refused an operation | no, placement aborted |
//! | `InternalState` | undecodable stored bytes, missing mapping | fatal corruption |
//! | `NotFound` | order does not exist (any more) | no |

use thiserror::Error;

use crate::host::{AccountError, LedgerError, SchedulerError};
use crate::types::price::PriceError;

/// Coarse error classification used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected synchronously, nothing was mutated.
    InvalidInput,
    /// An external collaborator refused the operation; the placement was aborted.
    Capability,
    /// Stored state is corrupt. Not retryable.
    InternalState,
    /// The order does not exist. Benign for scheduler callbacks.
    NotFound,
}

/// Umbrella error of the exchange.
#[derive(Debug, Error)]
pub enum DexError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid price: {0}")]
    Price(#[from] PriceError),

    #[error("price {price} is not a multiple of price tick {tick}")]
    PriceTick { price: String, tick: String },

    #[error("quantity {quantity} is not a multiple of quantity step {step}")]
    QuantityStep { quantity: u128, step: u128 },

    #[error("order with id {id} already exists for account {account}")]
    DuplicateOrderId { account: String, id: String },

    #[error("account {account} exceeded the limit of {max} orders for denom {denom}")]
    TooManyOrders { account: String, denom: String, max: u64 },

    #[error("order not found: {0}")]
    NotFound(String),

    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("account directory: {0}")]
    Account(#[from] AccountError),

    #[error("good-til scheduler: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl DexError {
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        DexError::InvalidInput(msg.into())
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        DexError::InvalidState(msg.into())
    }

    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DexError::InvalidInput(_)
            | DexError::Price(_)
            | DexError::PriceTick { .. }
            | DexError::QuantityStep { .. }
            | DexError::DuplicateOrderId { .. }
            | DexError::TooManyOrders { .. } => ErrorKind::InvalidInput,
            DexError::Ledger(_) | DexError::Account(_) | DexError::Scheduler(_) => {
                ErrorKind::Capability
            }
            DexError::InvalidState(_) => ErrorKind::InternalState,
            DexError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Shorthand for `kind() == ErrorKind::NotFound`.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, DexError>;
