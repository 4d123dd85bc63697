//! Transactional write overlay.
//!
//! Reads fall through to the parent unless the overlay holds the key;
//! a `None` entry in the overlay hides the parent's value. Iteration merges
//! both sorted streams, the overlay winning on equal keys.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::ops::Bound;

use super::{prefix_end, KvPair, KvStore, ScanDirection, WriteBatch};

type OverlayItem = (Vec<u8>, Option<Vec<u8>>);

/// Write overlay over a parent store.
pub struct CacheStore<'a, S: KvStore + ?Sized> {
    parent: &'a S,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a, S: KvStore + ?Sized> CacheStore<'a, S> {
    pub fn new(parent: &'a S) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Number of pending mutations.
    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    /// Consume the overlay, yielding the batch to commit.
    pub fn into_writes(self) -> WriteBatch {
        self.writes.into_iter().collect()
    }
}

impl<'a, S: KvStore + ?Sized> KvStore for CacheStore<'a, S> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(value) => value.clone(),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }

    fn iter_prefix<'b>(
        &'b self,
        prefix: &[u8],
        direction: ScanDirection,
    ) -> Box<dyn Iterator<Item = KvPair> + 'b> {
        let start = Bound::Included(prefix.to_vec());
        let end = match prefix_end(prefix) {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        let range = self
            .writes
            .range::<Vec<u8>, _>((start, end))
            .map(|(k, v)| (k.clone(), v.clone()));
        let overlay: Box<dyn Iterator<Item = OverlayItem> + 'b> = match direction {
            ScanDirection::Forward => Box::new(range),
            ScanDirection::Reverse => Box::new(range.rev()),
        };

        Box::new(MergeIter {
            parent: self.parent.iter_prefix(prefix, direction).peekable(),
            overlay: overlay.peekable(),
            direction,
        })
    }
}

struct MergeIter<'b> {
    parent: Peekable<Box<dyn Iterator<Item = KvPair> + 'b>>,
    overlay: Peekable<Box<dyn Iterator<Item = OverlayItem> + 'b>>,
    direction: ScanDirection,
}

enum Pick {
    Parent,
    Overlay,
    /// Same key in both: overlay wins, parent entry is skipped.
    Both,
}

impl<'b> MergeIter<'b> {
    fn pick(&mut self) -> Option<Pick> {
        match (self.parent.peek(), self.overlay.peek()) {
            (None, None) => None,
            (Some(_), None) => Some(Pick::Parent),
            (None, Some(_)) => Some(Pick::Overlay),
            (Some((pk, _)), Some((ok, _))) => {
                let ord = match self.direction {
                    ScanDirection::Forward => pk.cmp(ok),
                    ScanDirection::Reverse => ok.cmp(pk),
                };
                Some(match ord {
                    Ordering::Less => Pick::Parent,
                    Ordering::Greater => Pick::Overlay,
                    Ordering::Equal => Pick::Both,
                })
            }
        }
    }
}

impl<'b> Iterator for MergeIter<'b> {
    type Item = KvPair;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let overlay_item = match self.pick()? {
                Pick::Parent => return self.parent.next(),
                Pick::Overlay => self.overlay.next(),
                Pick::Both => {
                    self.parent.next();
                    self.overlay.next()
                }
            };
            match overlay_item {
                Some((key, Some(value))) => return Some((key, value)),
                // deleted in the overlay
                Some((_, None)) => continue,
                None => return None,
            }
        }
    }
}
