//! Evaluation cache.
//!
//! Memoizes resolved signals keyed by [`NodeId`]. There is no dependency
//! tracking: invalidation always clears every entry.

use crate::arena::NodeId;
use crate::signal_ir::Signal;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No memoized entries
    Cold,
    /// At least one memoized entry
    Warm,
}

/// Counters accumulated over the lifetime of a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from memory
    pub hits: u64,
    /// Nodes actually computed (one per operator application or literal)
    pub evaluations: u64,
    /// Entries currently memoized
    pub entries: usize,
    /// Number of clears that dropped at least one entry
    pub invalidations: u64,
}

#[derive(Debug, Default)]
pub struct EvalCache {
    entries: HashMap<NodeId, Signal>,
    hits: u64,
    evaluations: u64,
    invalidations: u64,
}

impl EvalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&mut self, id: NodeId) -> Option<Signal> {
        let value = self.entries.get(&id).copied();
        if value.is_some() {
            self.hits += 1;
        }
        value
    }

    /// Reads an entry without counting a hit.
    pub fn peek(&self, id: NodeId) -> Option<Signal> {
        self.entries.get(&id).copied()
    }

    pub fn store(&mut self, id: NodeId, value: Signal) {
        self.evaluations += 1;
        self.entries.insert(id, value);
    }

    /// Drops every entry. Returns false when the cache was already cold.
    pub fn clear(&mut self) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        self.entries.clear();
        self.invalidations += 1;
        true
    }

    pub fn state(&self) -> CacheState {
        if self.entries.is_empty() {
            CacheState::Cold
        } else {
            CacheState::Warm
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            evaluations: self.evaluations,
            entries: self.entries.len(),
            invalidations: self.invalidations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_to_warm_and_back() {
        let mut cache = EvalCache::new();
        assert_eq!(cache.state(), CacheState::Cold);
        assert_eq!(cache.lookup(NodeId(0)), None);

        cache.store(NodeId(0), 42);
        assert_eq!(cache.state(), CacheState::Warm);
        assert_eq!(cache.lookup(NodeId(0)), Some(42));

        assert!(cache.clear());
        assert_eq!(cache.state(), CacheState::Cold);
        assert_eq!(cache.lookup(NodeId(0)), None);
    }

    #[test]
    fn clearing_cold_cache_is_noop() {
        let mut cache = EvalCache::new();
        assert!(!cache.clear());
        cache.store(NodeId(1), 1);
        assert!(cache.clear());
        assert!(!cache.clear());
        let stats = cache.stats();
        assert_eq!(stats.invalidations, 1);
        assert_eq!(stats.entries, 0);
    }

    #[test]
    fn stats_count_hits_and_evaluations() {
        let mut cache = EvalCache::new();
        cache.store(NodeId(0), 5);
        cache.store(NodeId(1), 6);
        cache.lookup(NodeId(0));
        cache.lookup(NodeId(0));
        cache.lookup(NodeId(9));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 2,
                evaluations: 2,
                entries: 2,
                invalidations: 0,
            }
        );
    }
}
