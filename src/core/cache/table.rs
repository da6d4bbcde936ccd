//! Sharded hash table with a fixed entry budget
//!
//! Each shard is a `parking_lot::RwLock<HashMap>` hashed with `ahash`.
//! Operations touch exactly one shard lock. Once the budget is spent new
//! keys are dropped; existing keys can still be overwritten.

use ahash::RandomState;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Result of [`ShardedTable::insert`]
#[derive(Debug, PartialEq, Eq)]
pub enum Insert<V> {
    Inserted,
    Replaced(V),
    /// Table at capacity; value dropped
    Full,
}

pub struct ShardedTable<K, V> {
    shards: Box<[RwLock<HashMap<K, V, RandomState>>]>,
    hasher: RandomState,
    capacity: usize,
    len: AtomicUsize,
}

impl<K: Hash + Eq, V: Clone> ShardedTable<K, V> {
    pub fn new(shards: usize, capacity: usize) -> Self {
        let shards = (0..shards.max(1))
            .map(|_| RwLock::new(HashMap::default()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        ShardedTable {
            shards,
            hasher: RandomState::new(),
            capacity,
            len: AtomicUsize::new(0),
        }
    }

    fn shard(&self, key: &K) -> &RwLock<HashMap<K, V, RandomState>> {
        let hash = self.hasher.hash_one(key);
        &self.shards[(hash % self.shards.len() as u64) as usize]
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.shard(key).read().get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) -> Insert<V> {
        let mut shard = self.shard(&key).write();
        if let Some(slot) = shard.get_mut(&key) {
            return Insert::Replaced(std::mem::replace(slot, value));
        }
        // Reserve a slot before inserting
        if self.len.fetch_add(1, Ordering::AcqRel) >= self.capacity {
            self.len.fetch_sub(1, Ordering::AcqRel);
            return Insert::Full;
        }
        shard.insert(key, value);
        Insert::Inserted
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let removed = self.shard(key).write().remove(key);
        if removed.is_some() {
            self.len.fetch_sub(1, Ordering::AcqRel);
        }
        removed
    }

    /// Take every entry out of the table
    pub fn drain(&self) -> Vec<(K, V)> {
        let mut out = Vec::with_capacity(self.len());
        for shard in self.shards.iter() {
            let mut shard = shard.write();
            self.len.fetch_sub(shard.len(), Ordering::AcqRel);
            out.extend(shard.drain());
        }
        out
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
