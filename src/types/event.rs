//! Domain events emitted after a successful state change.

use crate::types::Coin;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A placement request passed validation and got a sequence.
    OrderPlaced {
        creator: String,
        id: String,
        sequence: u64,
    },
    /// An order exchanged funds during matching.
    OrderReduced {
        creator: String,
        id: String,
        sequence: u64,
        sent_coin: Coin,
        received_coin: Coin,
    },
    /// The unfilled remainder was stored as a resting order.
    OrderCreated {
        creator: String,
        id: String,
        sequence: u64,
        remaining_base_quantity: u128,
        remaining_spendable_balance: u128,
    },
    /// A resting order left the book: filled, cancelled or expired.
    OrderClosed {
        creator: String,
        id: String,
        sequence: u64,
        remaining_base_quantity: u128,
        remaining_spendable_balance: u128,
    },
}

impl Event {
    pub fn sequence(&self) -> u64 {
        match self {
            Event::OrderPlaced { sequence, .. }
            | Event::OrderReduced { sequence, .. }
            | Event::OrderCreated { sequence, .. }
            | Event::OrderClosed { sequence, .. } => *sequence,
        }
    }
}
