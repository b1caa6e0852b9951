use crate::target::CachedSeries;
use ahash::AHashMap;
use std::{collections::BTreeMap, fmt, sync::Arc};

/// Identity of a simulation: the grid indices of the expensive coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(Box<[u64]>);

impl Fingerprint {
    pub fn new(index: &[u64]) -> Self {
        Self(index.into())
    }

    pub fn index(&self) -> &[u64] {
        &self.0
    }
}

impl From<Vec<u64>> for Fingerprint {
    fn from(index: Vec<u64>) -> Self {
        Self(index.into_boxed_slice())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes: Vec<u8> = self.0.iter().flat_map(|word| word.to_be_bytes()).collect();
        write!(f, "{}", hex::encode(bytes))
    }
}

struct Entry {
    data: Arc<CachedSeries>,
    stamp: u64,
}

/// Least-recently-used store of simulated series.
///
/// Not synchronized; only the thread driving a batch touches it.
pub struct Cache {
    capacity: usize,
    clock: u64,
    entries: AHashMap<Fingerprint, Entry>,
    order: BTreeMap<u64, Fingerprint>,
    hits: usize,
    misses: usize,
}

impl Cache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            clock: 0,
            entries: AHashMap::with_capacity(capacity.min(1 << 16)),
            order: BTreeMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn contains(&self, key: &Fingerprint) -> bool {
        self.entries.contains_key(key)
    }

    /// Looks up a series and marks it as most recently used.
    pub fn get(&mut self, key: &Fingerprint) -> Option<Arc<CachedSeries>> {
        let stamp = self.tick();
        match self.entries.get_mut(key) {
            Some(entry) => {
                self.order.remove(&entry.stamp);
                self.order.insert(stamp, key.clone());
                entry.stamp = stamp;
                self.hits += 1;
                Some(entry.data.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Stores a series, evicting the least recently used entries beyond
    /// capacity. An existing entry keeps its data and is only refreshed.
    pub fn set(&mut self, key: Fingerprint, data: Arc<CachedSeries>) {
        let stamp = self.tick();
        if let Some(entry) = self.entries.get_mut(&key) {
            self.order.remove(&entry.stamp);
            entry.stamp = stamp;
            self.order.insert(stamp, key);
            return;
        }
        self.order.insert(stamp, key.clone());
        self.entries.insert(key, Entry { data, stamp });
        while self.entries.len() > self.capacity {
            match self.order.pop_first() {
                Some((_, oldest)) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}
