//! Ordered key/value storage.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                CacheStore                    │
//! │   write overlay for one placement            │
//! │   (BTreeMap<key, Option<value>>)             │
//! ├──────────────────────────────────────────────┤
//! │          MemStore (or any KvStore)           │
//! │   committed state, byte-sorted keys          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Every placement runs against a [`CacheStore`] layered over the committed
//! store. The overlay is written back with [`KvStore::write`] only after the
//! ledger accepted the fund movements; on any error it is simply dropped.
//!
//! Iteration is always over a key prefix, forward or reverse, in unsigned
//! lexicographic key order. Keys are built by [`keys`] so that this byte
//! order is the logical order.

mod cache;
mod memory;
pub mod keys;

pub use cache::CacheStore;
pub use memory::MemStore;

use sha2::{Digest, Sha256};

/// Scan direction of [`KvStore::iter_prefix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    /// Ascending key order.
    Forward,
    /// Descending key order.
    Reverse,
}

/// Pending mutations: `Some(value)` sets, `None` deletes.
pub type WriteBatch = Vec<(Vec<u8>, Option<Vec<u8>>)>;

/// Owned key/value pair yielded by iterators.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Byte-ordered key/value store.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>);

    fn delete(&mut self, key: &[u8]);

    /// All pairs whose key starts with `prefix`, in `direction` order.
    fn iter_prefix<'a>(
        &'a self,
        prefix: &[u8],
        direction: ScanDirection,
    ) -> Box<dyn Iterator<Item = KvPair> + 'a>;

    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Apply a batch of mutations in order.
    fn write(&mut self, batch: WriteBatch) {
        for (key, value) in batch {
            match value {
                Some(value) => self.set(key, value),
                None => self.delete(&key),
            }
        }
    }

    /// SHA-256 over every pair in key order, each part length-prefixed.
    fn state_root(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for (key, value) in self.iter_prefix(&[], ScanDirection::Forward) {
            hasher.update((key.len() as u64).to_be_bytes());
            hasher.update(&key);
            hasher.update((value.len() as u64).to_be_bytes());
            hasher.update(&value);
        }
        let mut root = [0u8; 32];
        root.copy_from_slice(&hasher.finalize());
        root
    }
}

/// Smallest key greater than every key starting with `prefix`.
///
/// `None` when no such key exists (empty prefix or all `0xff`).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
