//! In-memory committed store.

use std::collections::BTreeMap;
use std::ops::Bound;

use super::{prefix_end, KvPair, KvStore, ScanDirection};

/// Byte-sorted map, the committed state of the exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.data.insert(key, value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.data.remove(key);
    }

    fn iter_prefix<'a>(
        &'a self,
        prefix: &[u8],
        direction: ScanDirection,
    ) -> Box<dyn Iterator<Item = KvPair> + 'a> {
        let start = Bound::Included(prefix.to_vec());
        let end = match prefix_end(prefix) {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        let range = self
            .data
            .range::<Vec<u8>, _>((start, end))
            .map(|(k, v)| (k.clone(), v.clone()));
        match direction {
            ScanDirection::Forward => Box::new(range),
            ScanDirection::Reverse => Box::new(range.rev()),
        }
    }
}
