//! Account directory: address <-> account number.
//!
//! Order book records store the compact account number; settlement needs
//! the address again to move funds.

use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("unknown account number {0}")]
    UnknownAccountNumber(u64),

    #[error("unknown address {0}")]
    UnknownAddress(String),
}

pub trait AccountDirectory {
    fn address_of(&self, account_number: u64) -> Result<String, AccountError>;

    fn account_number_of(&self, address: &str) -> Result<u64, AccountError>;
}

/// Accounts numbered in registration order, starting at 1.
#[derive(Debug, Default, Clone)]
pub struct MemAccounts {
    addresses: Vec<String>,
    numbers: HashMap<String, u64>,
}

impl MemAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an address, returning its account number. Idempotent.
    pub fn register(&mut self, address: impl Into<String>) -> u64 {
        let address = address.into();
        if let Some(number) = self.numbers.get(&address) {
            return *number;
        }
        self.addresses.push(address.clone());
        let number = self.addresses.len() as u64;
        self.numbers.insert(address, number);
        number
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl AccountDirectory for MemAccounts {
    fn address_of(&self, account_number: u64) -> Result<String, AccountError> {
        account_number
            .checked_sub(1)
            .and_then(|index| self.addresses.get(index as usize))
            .cloned()
            .ok_or(AccountError::UnknownAccountNumber(account_number))
    }

    fn account_number_of(&self, address: &str) -> Result<u64, AccountError> {
        self.numbers
            .get(address)
            .copied()
            .ok_or_else(|| AccountError::UnknownAddress(address.to_string()))
    }
}
