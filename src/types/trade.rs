//! Trade between a taker and one maker.
//!
//! ## Terminology
//!
//! - **Maker**: the resting order that was already in the book
//! - **Taker**: the incoming order that triggered the match
//!
//! ## Price Discovery
//!
//! The trade always executes at the maker's price, expressed in the
//! taker's market (inverted makers use `1/p`). Trades are ephemeral: they
//! are consumed by the matching result and never stored.

use std::fmt;

use num_rational::BigRational;

/// Which side(s) a trade exhausts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseResult {
    /// Sides cannot trade with each other.
    NoMatch,
    CloseTaker,
    CloseMaker,
    CloseBoth,
}

impl CloseResult {
    pub fn closes_taker(self) -> bool {
        matches!(self, CloseResult::CloseTaker | CloseResult::CloseBoth)
    }

    pub fn closes_maker(self) -> bool {
        matches!(self, CloseResult::CloseMaker | CloseResult::CloseBoth)
    }
}

impl fmt::Display for CloseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CloseResult::NoMatch => "NoMatch",
            CloseResult::CloseTaker => "CloseTaker",
            CloseResult::CloseMaker => "CloseMaker",
            CloseResult::CloseBoth => "CloseBoth",
        };
        f.write_str(s)
    }
}

/// Integer result of matching two records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Trade {
    /// Base quantity in the taker's market.
    pub base_quantity: u128,
    /// Quote quantity in the taker's market.
    pub quote_quantity: u128,
    /// Execution price in the taker's market.
    pub price: Option<BigRational>,
    pub taker_spends: u128,
    pub taker_receives: u128,
}

impl Trade {
    pub fn is_empty(&self) -> bool {
        self.base_quantity == 0 && self.quote_quantity == 0
    }
}
