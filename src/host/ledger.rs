//! Token custody: balances, locks and transfers.
//!
//! ## Batched Execution
//!
//! A placement produces one [`LedgerActions`] batch. [`Ledger::execute`]
//! applies it all-or-nothing, in this order:
//!
//! 1. `sends`: taker payments, checked against the spendable balance
//! 2. `unlock_and_sends`: maker payments out of their locked balance
//! 3. `unlocks`: maker refunds of residual locks and reserves
//! 4. `locks`: the resting taker's balance and reserve
//!
//! Spendable balance is `balance - locked`.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::types::Coin;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{address} has {available}{denom} spendable, {required}{denom} required")]
    InsufficientFunds {
        address: String,
        denom: String,
        required: u128,
        available: u128,
    },

    #[error("{address} has {available}{denom} locked, {required}{denom} required")]
    InsufficientLocked {
        address: String,
        denom: String,
        required: u128,
        available: u128,
    },

    #[error("balance overflow for {address} in {denom}")]
    Overflow { address: String, denom: String },
}

/// Coin moving between two addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    pub coin: Coin,
}

/// Coin attached to one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCoin {
    pub address: String,
    pub coin: Coin,
}

/// Fund movements of one placement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerActions {
    pub sends: Vec<Transfer>,
    pub unlock_and_sends: Vec<Transfer>,
    pub unlocks: Vec<AccountCoin>,
    pub locks: Vec<AccountCoin>,
}

impl LedgerActions {
    pub fn is_empty(&self) -> bool {
        self.sends.is_empty()
            && self.unlock_and_sends.is_empty()
            && self.unlocks.is_empty()
            && self.locks.is_empty()
    }
}

pub trait Ledger {
    /// Balance not locked by resting orders.
    fn spendable_balance(&self, address: &str, denom: &str) -> Result<u128, LedgerError>;

    /// Apply a batch atomically: on error nothing is applied.
    fn execute(&mut self, actions: &LedgerActions) -> Result<(), LedgerError>;
}

type Key = (String, String);

/// Deterministic in-memory ledger.
#[derive(Debug, Default, Clone)]
pub struct MemLedger {
    balances: BTreeMap<Key, u128>,
    locked: BTreeMap<Key, u128>,
}

impl MemLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit new coins to an address.
    pub fn mint(&mut self, address: &str, coin: &Coin) -> Result<(), LedgerError> {
        credit(&mut self.balances, address, coin)
    }

    /// Total balance, locked included.
    pub fn balance(&self, address: &str, denom: &str) -> u128 {
        get(&self.balances, address, denom)
    }

    pub fn locked_balance(&self, address: &str, denom: &str) -> u128 {
        get(&self.locked, address, denom)
    }

    /// Sum of all balances of a denom.
    pub fn supply(&self, denom: &str) -> u128 {
        self.balances
            .iter()
            .filter(|((_, d), _)| d == denom)
            .map(|(_, amount)| *amount)
            .sum()
    }

    /// Sum of all locked balances of a denom.
    pub fn locked_supply(&self, denom: &str) -> u128 {
        self.locked
            .iter()
            .filter(|((_, d), _)| d == denom)
            .map(|(_, amount)| *amount)
            .sum()
    }

    fn spendable(&self, address: &str, denom: &str) -> u128 {
        self.balance(address, denom)
            .saturating_sub(self.locked_balance(address, denom))
    }

    fn apply(&mut self, actions: &LedgerActions) -> Result<(), LedgerError> {
        for transfer in &actions.sends {
            let available = self.spendable(&transfer.from, &transfer.coin.denom);
            if available < transfer.coin.amount {
                return Err(LedgerError::InsufficientFunds {
                    address: transfer.from.clone(),
                    denom: transfer.coin.denom.clone(),
                    required: transfer.coin.amount,
                    available,
                });
            }
            debit(&mut self.balances, &transfer.from, &transfer.coin)?;
            credit(&mut self.balances, &transfer.to, &transfer.coin)?;
        }

        for transfer in &actions.unlock_and_sends {
            unlock(&mut self.locked, &transfer.from, &transfer.coin)?;
            debit(&mut self.balances, &transfer.from, &transfer.coin)?;
            credit(&mut self.balances, &transfer.to, &transfer.coin)?;
        }

        for entry in &actions.unlocks {
            unlock(&mut self.locked, &entry.address, &entry.coin)?;
        }

        for entry in &actions.locks {
            let available = self.spendable(&entry.address, &entry.coin.denom);
            if available < entry.coin.amount {
                return Err(LedgerError::InsufficientFunds {
                    address: entry.address.clone(),
                    denom: entry.coin.denom.clone(),
                    required: entry.coin.amount,
                    available,
                });
            }
            credit(&mut self.locked, &entry.address, &entry.coin)?;
        }

        Ok(())
    }
}

impl Ledger for MemLedger {
    fn spendable_balance(&self, address: &str, denom: &str) -> Result<u128, LedgerError> {
        Ok(self.spendable(address, denom))
    }

    fn execute(&mut self, actions: &LedgerActions) -> Result<(), LedgerError> {
        let mut next = self.clone();
        next.apply(actions)?;
        *self = next;
        Ok(())
    }
}

fn get(map: &BTreeMap<Key, u128>, address: &str, denom: &str) -> u128 {
    map.get(&(address.to_string(), denom.to_string()))
        .copied()
        .unwrap_or(0)
}

fn credit(map: &mut BTreeMap<Key, u128>, address: &str, coin: &Coin) -> Result<(), LedgerError> {
    let entry = map
        .entry((address.to_string(), coin.denom.clone()))
        .or_insert(0);
    *entry = entry.checked_add(coin.amount).ok_or_else(|| LedgerError::Overflow {
        address: address.to_string(),
        denom: coin.denom.clone(),
    })?;
    Ok(())
}

fn debit(map: &mut BTreeMap<Key, u128>, address: &str, coin: &Coin) -> Result<(), LedgerError> {
    let key = (address.to_string(), coin.denom.clone());
    let available = map.get(&key).copied().unwrap_or(0);
    let rest = available
        .checked_sub(coin.amount)
        .ok_or_else(|| LedgerError::InsufficientFunds {
            address: address.to_string(),
            denom: coin.denom.clone(),
            required: coin.amount,
            available,
        })?;
    if rest == 0 {
        map.remove(&key);
    } else {
        map.insert(key, rest);
    }
    Ok(())
}

fn unlock(locked: &mut BTreeMap<Key, u128>, address: &str, coin: &Coin) -> Result<(), LedgerError> {
    let key = (address.to_string(), coin.denom.clone());
    let available = locked.get(&key).copied().unwrap_or(0);
    let rest = available
        .checked_sub(coin.amount)
        .ok_or_else(|| LedgerError::InsufficientLocked {
            address: address.to_string(),
            denom: coin.denom.clone(),
            required: coin.amount,
            available,
        })?;
    if rest == 0 {
        locked.remove(&key);
    } else {
        locked.insert(key, rest);
    }
    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================
