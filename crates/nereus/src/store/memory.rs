//! In-memory graph store over a `GraphSnapshot`.
//!
//! Entities and relations are kept in canonical order, so every index below
//! holds positions in ascending order and lookups return canonical lists
//! without re-sorting.

use std::collections::HashMap;

use super::{GraphStore, count_degrees, kind_matches};
use crate::error::Result;
use crate::types::{Degree, Entity, EntityId, EntityKind, GraphSnapshot, Relation, RelationKind};

/// Hash-indexed, immutable store built from one snapshot.
///
/// Dangling relations are kept; they are part of the snapshot and the
/// analyses decide how to skip them.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    /// Entities in canonical order
    entities: Vec<Entity>,

    /// Relations in canonical order
    relations: Vec<Relation>,

    /// Entity position by id
    by_id: HashMap<EntityId, usize>,

    /// Entity positions by exact name
    by_name: HashMap<String, Vec<usize>>,

    /// Entity positions by exact file path
    by_file: HashMap<String, Vec<usize>>,

    /// Relation positions by source id
    outgoing: HashMap<EntityId, Vec<usize>>,

    /// Relation positions by target id
    incoming: HashMap<EntityId, Vec<usize>>,

    /// Degrees are computed once; the snapshot never changes
    degrees: HashMap<EntityId, Degree>,
}

impl MemoryStore {
    /// Build a store from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidData` if entity ids are not unique.
    pub fn new(snapshot: GraphSnapshot) -> Result<Self> {
        snapshot.validate()?;

        let GraphSnapshot {
            mut entities,
            mut relations,
        } = snapshot;
        entities.sort_by(Entity::canonical_cmp);
        relations.sort_by(Relation::canonical_cmp);
        relations.dedup();

        let mut by_id = HashMap::with_capacity(entities.len());
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_file: HashMap<String, Vec<usize>> = HashMap::new();
        for (pos, entity) in entities.iter().enumerate() {
            by_id.insert(entity.id.clone(), pos);
            by_name.entry(entity.name.clone()).or_default().push(pos);
            by_file.entry(entity.file.clone()).or_default().push(pos);
        }

        let mut outgoing: HashMap<EntityId, Vec<usize>> = HashMap::new();
        let mut incoming: HashMap<EntityId, Vec<usize>> = HashMap::new();
        for (pos, relation) in relations.iter().enumerate() {
            outgoing
                .entry(relation.source_id.clone())
                .or_default()
                .push(pos);
            incoming
                .entry(relation.target_id.clone())
                .or_default()
                .push(pos);
        }

        let degrees = count_degrees(&entities, &relations);

        tracing::debug!(
            entities = entities.len(),
            relations = relations.len(),
            "Built in-memory graph store"
        );

        Ok(Self {
            entities,
            relations,
            by_id,
            by_name,
            by_file,
            outgoing,
            incoming,
            degrees,
        })
    }

    /// Number of entities in the store.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of relations in the store.
    #[must_use]
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    fn collect_entities(&self, positions: Option<&Vec<usize>>) -> Vec<Entity> {
        positions
            .map(|list| list.iter().map(|&pos| self.entities[pos].clone()).collect())
            .unwrap_or_default()
    }

    fn collect_relations(
        &self,
        positions: Option<&Vec<usize>>,
        kinds: &[RelationKind],
    ) -> Vec<Relation> {
        positions
            .map(|list| {
                list.iter()
                    .map(|&pos| &self.relations[pos])
                    .filter(|relation| kind_matches(kinds, relation.kind))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl GraphStore for MemoryStore {
    fn entity(&self, id: &EntityId) -> Result<Option<Entity>> {
        Ok(self.by_id.get(id).map(|&pos| self.entities[pos].clone()))
    }

    fn entities_by_name(&self, name: &str) -> Result<Vec<Entity>> {
        Ok(self.collect_entities(self.by_name.get(name)))
    }

    fn entities_by_qualified_suffix(&self, suffix: &str) -> Result<Vec<Entity>> {
        if suffix.is_empty() {
            return Ok(vec![]);
        }
        Ok(self
            .entities
            .iter()
            .filter(|e| {
                e.qualified_name
                    .as_deref()
                    .is_some_and(|qn| qn.ends_with(suffix))
            })
            .cloned()
            .collect())
    }

    fn entities_in_file(&self, file: &str) -> Result<Vec<Entity>> {
        Ok(self.collect_entities(self.by_file.get(file)))
    }

    fn entities_in_file_matching(&self, fragment: &str) -> Result<Vec<Entity>> {
        Ok(self
            .entities
            .iter()
            .filter(|e| e.file.contains(fragment))
            .cloned()
            .collect())
    }

    fn entities_of_kind(&self, kind: &EntityKind) -> Result<Vec<Entity>> {
        Ok(self
            .entities
            .iter()
            .filter(|e| &e.kind == kind)
            .cloned()
            .collect())
    }

    fn search(
        &self,
        pattern: &str,
        kind: Option<&EntityKind>,
        limit: usize,
    ) -> Result<Vec<Entity>> {
        if pattern.is_empty() || limit == 0 {
            return Ok(vec![]);
        }

        let needle = pattern.to_lowercase();
        let mut matches: Vec<&Entity> = self
            .entities
            .iter()
            .filter(|e| kind.is_none_or(|k| &e.kind == k))
            .filter(|e| {
                e.name.to_lowercase().contains(&needle)
                    || e.qualified_name
                        .as_deref()
                        .is_some_and(|qn| qn.to_lowercase().contains(&needle))
            })
            .collect();

        // Stable sort keeps canonical order within each group
        matches.sort_by_key(|e| e.name != pattern);

        Ok(matches.into_iter().take(limit).cloned().collect())
    }

    fn relations_from(&self, id: &EntityId, kinds: &[RelationKind]) -> Result<Vec<Relation>> {
        Ok(self.collect_relations(self.outgoing.get(id), kinds))
    }

    fn relations_to(&self, id: &EntityId, kinds: &[RelationKind]) -> Result<Vec<Relation>> {
        Ok(self.collect_relations(self.incoming.get(id), kinds))
    }

    fn all_entities(&self) -> Result<Vec<Entity>> {
        Ok(self.entities.clone())
    }

    fn all_relations(&self) -> Result<Vec<Relation>> {
        Ok(self.relations.clone())
    }

    fn degree_counts(&self) -> Result<HashMap<EntityId, Degree>> {
        Ok(self.degrees.clone())
    }
}
