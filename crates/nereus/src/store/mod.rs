//! Read-only query surface over the entity/relation graph.
//!
//! The indexer that produces the graph is an external collaborator; this
//! module only defines what the analyses need to ask of it.
//!
//! ## Module Structure
//!
//! - `memory` - `MemoryStore`, hash-indexed store over a `GraphSnapshot`
//! - `sqlite` - `SqliteStore`, read-only store over the SQLite tables
//! - `schema` - table contract the SQLite store reads
//! - `cached` - `CachedStore`, explicit entity-lookup cache around any store
//!
//! ## Ordering
//!
//! Every list a store returns is in canonical order (`Entity::canonical_cmp`,
//! `Relation::canonical_cmp`) so analyses are deterministic regardless of the
//! backend.

mod cached;
mod memory;
mod schema;
mod sqlite;

pub use cached::CachedStore;
pub use memory::MemoryStore;
pub use schema::SCHEMA;
pub use sqlite::SqliteStore;

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::Result;
use crate::types::{Degree, Entity, EntityId, EntityKind, GraphStats, Relation, RelationKind};

/// Operations every graph backend provides.
///
/// Relation filters take a slice of kinds; an empty slice means "all kinds".
/// Not-found is `Ok(None)` / an empty list; `Err` is reserved for store
/// failures.
pub trait GraphStore: Send + Sync {
    /// Get an entity by id.
    fn entity(&self, id: &EntityId) -> Result<Option<Entity>>;

    /// Entities whose `name` equals `name` exactly.
    fn entities_by_name(&self, name: &str) -> Result<Vec<Entity>>;

    /// Entities whose `qualified_name` ends with `suffix`.
    fn entities_by_qualified_suffix(&self, suffix: &str) -> Result<Vec<Entity>>;

    /// Entities defined in exactly this file.
    fn entities_in_file(&self, file: &str) -> Result<Vec<Entity>>;

    /// Entities whose file path contains `fragment`.
    fn entities_in_file_matching(&self, fragment: &str) -> Result<Vec<Entity>>;

    /// Entities of one kind.
    fn entities_of_kind(&self, kind: &EntityKind) -> Result<Vec<Entity>>;

    /// Case-insensitive substring search over name and qualified name.
    ///
    /// Exact name matches sort first, then canonical order.
    fn search(&self, pattern: &str, kind: Option<&EntityKind>, limit: usize)
        -> Result<Vec<Entity>>;

    /// Relations starting at `id`, optionally restricted to `kinds`.
    fn relations_from(&self, id: &EntityId, kinds: &[RelationKind]) -> Result<Vec<Relation>>;

    /// Relations ending at `id`, optionally restricted to `kinds`.
    fn relations_to(&self, id: &EntityId, kinds: &[RelationKind]) -> Result<Vec<Relation>>;

    /// Every entity in the snapshot.
    fn all_entities(&self) -> Result<Vec<Entity>>;

    /// Every relation in the snapshot, dangling ones included.
    fn all_relations(&self) -> Result<Vec<Relation>>;

    /// Distinct in/out neighbor counts for every entity.
    ///
    /// Relations with a missing endpoint are not counted.
    fn degree_counts(&self) -> Result<HashMap<EntityId, Degree>> {
        let entities = self.all_entities()?;
        let relations = self.all_relations()?;
        Ok(count_degrees(&entities, &relations))
    }

    /// Summary counts of the snapshot.
    fn stats(&self) -> Result<GraphStats> {
        let entities = self.all_entities()?;
        let relations = self.all_relations()?;
        Ok(compute_stats(&entities, &relations))
    }
}

/// Count distinct neighbors per entity, skipping dangling relations.
pub(crate) fn count_degrees(
    entities: &[Entity],
    relations: &[Relation],
) -> HashMap<EntityId, Degree> {
    let known: HashSet<&EntityId> = entities.iter().map(|e| &e.id).collect();
    let mut incoming: HashMap<&EntityId, HashSet<&EntityId>> = HashMap::new();
    let mut outgoing: HashMap<&EntityId, HashSet<&EntityId>> = HashMap::new();

    for relation in relations {
        if !known.contains(&relation.source_id) || !known.contains(&relation.target_id) {
            continue;
        }
        incoming
            .entry(&relation.target_id)
            .or_default()
            .insert(&relation.source_id);
        outgoing
            .entry(&relation.source_id)
            .or_default()
            .insert(&relation.target_id);
    }

    entities
        .iter()
        .map(|entity| {
            let degree = Degree {
                incoming: incoming.get(&entity.id).map_or(0, HashSet::len),
                outgoing: outgoing.get(&entity.id).map_or(0, HashSet::len),
            };
            (entity.id.clone(), degree)
        })
        .collect()
}

/// Compute summary counts from a full entity/relation listing.
pub(crate) fn compute_stats(entities: &[Entity], relations: &[Relation]) -> GraphStats {
    let known: HashSet<&EntityId> = entities.iter().map(|e| &e.id).collect();
    let files: HashSet<&str> = entities.iter().map(|e| e.file.as_str()).collect();

    let mut entities_by_kind: BTreeMap<String, usize> = BTreeMap::new();
    for entity in entities {
        *entities_by_kind
            .entry(entity.kind.as_str().to_string())
            .or_default() += 1;
    }

    let mut relations_by_kind: BTreeMap<String, usize> = BTreeMap::new();
    let mut dangling_relations = 0;
    for relation in relations {
        *relations_by_kind
            .entry(relation.kind.as_str().to_string())
            .or_default() += 1;
        if !known.contains(&relation.source_id) || !known.contains(&relation.target_id) {
            dangling_relations += 1;
        }
    }

    GraphStats {
        entity_count: entities.len(),
        relation_count: relations.len(),
        file_count: files.len(),
        dangling_relations,
        entities_by_kind,
        relations_by_kind,
    }
}

/// Whether `kind` passes a relation-kind filter (empty filter passes all).
pub(crate) fn kind_matches(kinds: &[RelationKind], kind: RelationKind) -> bool {
    kinds.is_empty() || kinds.contains(&kind)
}
