//! Entity-lookup cache around any `GraphStore`.
//!
//! Traversals look the same entity up many times (every edge endpoint is
//! resolved to check its kind). The cache is an explicit component with a
//! bounded capacity and a TTL; it never changes query results, only how
//! often the inner store is asked.

use std::collections::HashMap;

use moka::sync::Cache;

use super::GraphStore;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::types::{Degree, Entity, EntityId, EntityKind, GraphStats, Relation, RelationKind};

/// Wraps a store and memoizes `entity` lookups, misses included.
///
/// Store errors are never cached.
pub struct CachedStore<S> {
    inner: S,
    entities: Cache<EntityId, Option<Entity>>,
}

impl<S: GraphStore> CachedStore<S> {
    /// Wrap `inner` with a cache sized by `config`.
    pub fn new(inner: S, config: &CacheConfig) -> Self {
        let entities = Cache::builder()
            .max_capacity(config.capacity)
            .time_to_live(config.ttl())
            .build();

        Self { inner, entities }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Approximate number of cached lookups.
    pub fn cached_entries(&self) -> u64 {
        self.entities.run_pending_tasks();
        self.entities.entry_count()
    }

    /// Drop every cached lookup.
    pub fn invalidate_all(&self) {
        self.entities.invalidate_all();
    }
}

impl<S: GraphStore> GraphStore for CachedStore<S> {
    fn entity(&self, id: &EntityId) -> Result<Option<Entity>> {
        if let Some(cached) = self.entities.get(id) {
            return Ok(cached);
        }
        let entity = self.inner.entity(id)?;
        self.entities.insert(id.clone(), entity.clone());
        Ok(entity)
    }

    fn entities_by_name(&self, name: &str) -> Result<Vec<Entity>> {
        self.inner.entities_by_name(name)
    }

    fn entities_by_qualified_suffix(&self, suffix: &str) -> Result<Vec<Entity>> {
        self.inner.entities_by_qualified_suffix(suffix)
    }

    fn entities_in_file(&self, file: &str) -> Result<Vec<Entity>> {
        self.inner.entities_in_file(file)
    }

    fn entities_in_file_matching(&self, fragment: &str) -> Result<Vec<Entity>> {
        self.inner.entities_in_file_matching(fragment)
    }

    fn entities_of_kind(&self, kind: &EntityKind) -> Result<Vec<Entity>> {
        self.inner.entities_of_kind(kind)
    }

    fn search(
        &self,
        pattern: &str,
        kind: Option<&EntityKind>,
        limit: usize,
    ) -> Result<Vec<Entity>> {
        self.inner.search(pattern, kind, limit)
    }

    fn relations_from(&self, id: &EntityId, kinds: &[RelationKind]) -> Result<Vec<Relation>> {
        self.inner.relations_from(id, kinds)
    }

    fn relations_to(&self, id: &EntityId, kinds: &[RelationKind]) -> Result<Vec<Relation>> {
        self.inner.relations_to(id, kinds)
    }

    fn all_entities(&self) -> Result<Vec<Entity>> {
        self.inner.all_entities()
    }

    fn all_relations(&self) -> Result<Vec<Relation>> {
        self.inner.all_relations()
    }

    fn degree_counts(&self) -> Result<HashMap<EntityId, Degree>> {
        self.inner.degree_counts()
    }

    fn stats(&self) -> Result<GraphStats> {
        self.inner.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::GraphSnapshot;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that counts `entity` calls and delegates everything else.
    struct CountingStore {
        inner: MemoryStore,
        lookups: AtomicUsize,
    }

    impl GraphStore for CountingStore {
        fn entity(&self, id: &EntityId) -> Result<Option<Entity>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.entity(id)
        }
        fn entities_by_name(&self, name: &str) -> Result<Vec<Entity>> {
            self.inner.entities_by_name(name)
        }
        fn entities_by_qualified_suffix(&self, suffix: &str) -> Result<Vec<Entity>> {
            self.inner.entities_by_qualified_suffix(suffix)
        }
        fn entities_in_file(&self, file: &str) -> Result<Vec<Entity>> {
            self.inner.entities_in_file(file)
        }
        fn entities_in_file_matching(&self, fragment: &str) -> Result<Vec<Entity>> {
            self.inner.entities_in_file_matching(fragment)
        }
        fn entities_of_kind(&self, kind: &EntityKind) -> Result<Vec<Entity>> {
            self.inner.entities_of_kind(kind)
        }
        fn search(
            &self,
            pattern: &str,
            kind: Option<&EntityKind>,
            limit: usize,
        ) -> Result<Vec<Entity>> {
            self.inner.search(pattern, kind, limit)
        }
        fn relations_from(&self, id: &EntityId, kinds: &[RelationKind]) -> Result<Vec<Relation>> {
            self.inner.relations_from(id, kinds)
        }
        fn relations_to(&self, id: &EntityId, kinds: &[RelationKind]) -> Result<Vec<Relation>> {
            self.inner.relations_to(id, kinds)
        }
        fn all_entities(&self) -> Result<Vec<Entity>> {
            self.inner.all_entities()
        }
        fn all_relations(&self) -> Result<Vec<Relation>> {
            self.inner.all_relations()
        }
    }

    fn counting_store() -> CountingStore {
        let snapshot = GraphSnapshot::new(
            vec![Entity::new("f", "f", EntityKind::Function, "f.go")],
            vec![],
        );
        CountingStore {
            inner: MemoryStore::new(snapshot).unwrap(),
            lookups: AtomicUsize::new(0),
        }
    }

    #[test]
    fn repeated_lookups_hit_the_cache() {
        let cached = CachedStore::new(counting_store(), &CacheConfig::default());

        for _ in 0..5 {
            assert!(cached.entity(&"f".into()).unwrap().is_some());
        }

        assert_eq!(cached.inner().lookups.load(Ordering::SeqCst), 1);
        assert_eq!(cached.cached_entries(), 1);
    }

    #[test]
    fn misses_are_cached_too() {
        let cached = CachedStore::new(counting_store(), &CacheConfig::default());

        assert!(cached.entity(&"nope".into()).unwrap().is_none());
        assert!(cached.entity(&"nope".into()).unwrap().is_none());

        assert_eq!(cached.inner().lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalidate_all_forces_reload() {
        let cached = CachedStore::new(counting_store(), &CacheConfig::default());

        cached.entity(&"f".into()).unwrap();
        cached.invalidate_all();
        cached.entity(&"f".into()).unwrap();

        assert_eq!(cached.inner().lookups.load(Ordering::SeqCst), 2);
    }
}
