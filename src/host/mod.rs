//! Capabilities the exchange consumes from its host chain.
//!
//! The engine never owns balances, accounts or timers. It talks to them
//! through four narrow traits:
//!
//! | Trait | Responsibility | In-memory impl |
//! |-------|----------------|----------------|
//! | [`Ledger`] | balances, locks, transfers | [`MemLedger`] |
//! | [`AccountDirectory`] | address <-> account number | [`MemAccounts`] |
//! | [`GoodTilScheduler`] | deferred cancellation | [`DelayQueue`] |
//! | [`EventSink`] | event delivery | `Vec<Event>` |
//!
//! The in-memory implementations are deterministic and are what the tests,
//! benches and the demo binary run on.

mod accounts;
mod events;
mod ledger;
mod scheduler;

pub use accounts::{AccountDirectory, AccountError, MemAccounts};
pub use events::EventSink;
pub use ledger::{AccountCoin, Ledger, LedgerActions, LedgerError, MemLedger, Transfer};
pub use scheduler::{Deadline, DelayQueue, GoodTilScheduler, GoodTilTask, SchedulerError, TaskHandle};
