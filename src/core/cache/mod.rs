//! Per-generation decision cache
//!
//! Four independent tables, all owned by one generation:
//! - resource → applicable ACE list
//! - term memo: (resource, term, requester) → verdict
//! - decisions: (resource, right, list, requester) → decision
//! - cookie pool: term → evaluator cookie
//!
//! Nothing is evicted. The whole cache goes away with its generation.

mod table;

pub use table::{Insert, ShardedTable};

use crate::config::CacheConfig;
use crate::engine::Decision;
use crate::las::{Cookie, Verdict};
use crate::policy::{Right, TermId};
use serde::Serialize;
use std::sync::Arc;
use xxhash_rust::xxh3::Xxh3;

/// Identity of an ordered ACE list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListId(u64);

impl ListId {
    pub fn of(entries: &[usize]) -> Self {
        let mut hasher = Xxh3::new();
        for index in entries {
            hasher.update(&(*index as u64).to_le_bytes());
        }
        ListId(hasher.digest())
    }
}

/// The entries that apply to one resource
#[derive(Debug, Clone)]
pub struct CompiledList {
    pub id: ListId,
    pub entries: Arc<[usize]>,
}

impl CompiledList {
    pub fn new(entries: Vec<usize>) -> Self {
        CompiledList {
            id: ListId::of(&entries),
            entries: entries.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecisionKey {
    pub resource: String,
    pub right: Right,
    pub list: ListId,
    pub fingerprint: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermKey {
    pub resource: String,
    pub term: TermId,
    pub fingerprint: u128,
}

#[derive(Debug, Clone)]
pub struct CachedDecision {
    pub decision: Decision,
    /// Terms consulted to reach the decision
    pub consulted: Arc<[TermId]>,
}

/// Entry counts per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableSizes {
    pub lists: usize,
    pub terms: usize,
    pub decisions: usize,
    pub cookies: usize,
}

pub struct DecisionCache {
    lists: ShardedTable<String, CompiledList>,
    terms: ShardedTable<TermKey, Verdict>,
    decisions: ShardedTable<DecisionKey, CachedDecision>,
    cookies: ShardedTable<TermId, Cookie>,
}

impl DecisionCache {
    /// Empty cache sized for a model with `term_count` distinct terms
    pub fn new(config: &CacheConfig, term_count: usize) -> Self {
        DecisionCache {
            lists: ShardedTable::new(config.shards, config.list_capacity),
            terms: ShardedTable::new(config.shards, config.term_capacity),
            decisions: ShardedTable::new(config.shards, config.decision_capacity),
            cookies: ShardedTable::new(config.shards, term_count),
        }
    }

    /// Applicable entries for `resource`, resolving and storing them on a miss
    pub fn list_for<F>(&self, resource: &str, resolve: F) -> CompiledList
    where
        F: FnOnce() -> Vec<usize>,
    {
        let key = resource.to_string();
        if let Some(list) = self.lists.get(&key) {
            return list;
        }
        let list = CompiledList::new(resolve());
        self.lists.insert(key, list.clone());
        list
    }

    pub fn get(&self, key: &DecisionKey) -> Option<CachedDecision> {
        self.decisions.get(key)
    }

    /// Store a decision; non-cacheable decisions are ignored
    ///
    /// Returns whether the decision was stored.
    pub fn put(
        &self,
        key: DecisionKey,
        decision: Decision,
        consulted: Vec<TermId>,
        cacheable: bool,
    ) -> bool {
        if !cacheable {
            return false;
        }
        let entry = CachedDecision {
            decision,
            consulted: consulted.into(),
        };
        !matches!(self.decisions.insert(key, entry), Insert::Full)
    }

    pub fn term(&self, key: &TermKey) -> Option<Verdict> {
        self.terms.get(key)
    }

    /// Memoize a definite term verdict
    pub fn put_term(&self, key: TermKey, verdict: Verdict) {
        if verdict != Verdict::Indeterminate {
            self.terms.insert(key, verdict);
        }
    }

    pub fn cookie(&self, term: TermId) -> Option<Cookie> {
        self.cookies.get(&term)
    }

    /// Store a cookie; returns the cookie displaced (or rejected), if any
    pub fn store_cookie(&self, term: TermId, cookie: Cookie) -> Option<Cookie> {
        match self.cookies.insert(term, cookie.clone()) {
            Insert::Inserted => None,
            Insert::Replaced(old) => Some(old),
            Insert::Full => Some(cookie),
        }
    }

    pub fn clear_cookie(&self, term: TermId) -> Option<Cookie> {
        self.cookies.remove(&term)
    }

    /// Empty the cookie pool
    pub fn drain_cookies(&self) -> Vec<(TermId, Cookie)> {
        self.cookies.drain()
    }

    pub fn decision_count(&self) -> usize {
        self.decisions.len()
    }

    pub fn sizes(&self) -> TableSizes {
        TableSizes {
            lists: self.lists.len(),
            terms: self.terms.len(),
            decisions: self.decisions.len(),
            cookies: self.cookies.len(),
        }
    }
}

impl std::fmt::Debug for DecisionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionCache")
            .field("sizes", &self.sizes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Decision, Reason};

    fn cache() -> DecisionCache {
        DecisionCache::new(&CacheConfig::default(), 4)
    }

    fn key(resource: &str) -> DecisionKey {
        DecisionKey {
            resource: resource.to_string(),
            right: Right::Read,
            list: ListId::of(&[0, 1]),
            fingerprint: 7,
        }
    }

    #[test]
    fn test_list_id_depends_on_order() {
        assert_eq!(ListId::of(&[0, 2]), ListId::of(&[0, 2]));
        assert_ne!(ListId::of(&[0, 2]), ListId::of(&[2, 0]));
    }

    #[test]
    fn test_list_resolved_once() {
        let cache = cache();
        let first = cache.list_for("/secret", || vec![0, 3]);
        let second = cache.list_for("/secret", || panic!("list should be cached"));
        assert_eq!(first.id, second.id);
        assert_eq!(&*second.entries, &[0, 3]);
        assert_eq!(cache.sizes().lists, 1);
    }

    #[test]
    fn test_decisions() {
        let cache = cache();
        let decision = Decision::deny(Reason::NoMatchingAce);

        assert!(!cache.put(key("/a"), decision.clone(), vec![], false));
        assert!(cache.get(&key("/a")).is_none());

        assert!(cache.put(key("/a"), decision.clone(), vec![], true));
        assert_eq!(cache.get(&key("/a")).unwrap().decision, decision);
        assert_eq!(cache.decision_count(), 1);

        let mut other = key("/a");
        other.fingerprint = 8;
        assert!(cache.get(&other).is_none());
    }

    #[test]
    fn test_term_memo_skips_indeterminate() {
        let cache = cache();
        let term_key = |fp| TermKey {
            resource: "/a".to_string(),
            term: crate::policy::TermId::default(),
            fingerprint: fp,
        };
        cache.put_term(term_key(1), Verdict::True);
        cache.put_term(term_key(2), Verdict::Indeterminate);
        assert_eq!(cache.term(&term_key(1)), Some(Verdict::True));
        assert_eq!(cache.term(&term_key(2)), None);
    }

    #[test]
    fn test_cookie_pool() {
        let cache = cache();
        let id = crate::policy::TermId::default();
        let first: Cookie = Arc::new(1u32);
        let second: Cookie = Arc::new(2u32);

        assert!(cache.store_cookie(id, first).is_none());
        let displaced = cache.store_cookie(id, second).unwrap();
        assert_eq!(displaced.downcast_ref::<u32>(), Some(&1));

        let drained = cache.drain_cookies();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].1.downcast_ref::<u32>(), Some(&2));
        assert_eq!(cache.sizes().cookies, 0);
    }
}
