//! Connectivity and size rankings for refactoring triage.
//!
//! Scores count distinct neighbors over all relation kinds; relations with a
//! missing endpoint do not count. Every ranking has an explicit tie-break so
//! results do not depend on store iteration order.

use std::cmp::Reverse;
use std::collections::HashSet;

use serde::Serialize;

use crate::config::RankingConfig;
use crate::error::Result;
use crate::store::GraphStore;
use crate::types::{Degree, Entity, EntityId};

/// An entity with its connectivity score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntity {
    /// The entity.
    pub entity: Entity,
    /// Distinct incoming sources plus distinct outgoing targets.
    pub score: usize,
    /// Distinct incoming sources.
    pub incoming: usize,
    /// Distinct outgoing targets.
    pub outgoing: usize,
}

/// A function with its line span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizedEntity {
    /// The function.
    pub entity: Entity,
    /// `end_line - start_line`.
    pub line_span: u32,
}

/// Kind of refactoring suggested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    /// Split a long body into smaller functions.
    ExtractMethod,
    /// Too many dependents.
    ReduceCoupling,
    /// Too many dependencies.
    SingleResponsibility,
}

/// How urgent a suggestion is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Address soon.
    High,
    /// Worth a look.
    Medium,
}

/// One refactoring suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    /// What to do.
    pub kind: SuggestionKind,
    /// How urgent.
    pub priority: Priority,
    /// Human-readable reason.
    pub message: String,
}

/// Size and coupling numbers behind the suggestions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefactoringMetrics {
    /// Line span, if the entity has a valid one.
    pub line_span: Option<u32>,
    /// Distinct incoming sources.
    pub incoming: usize,
    /// Distinct outgoing targets.
    pub outgoing: usize,
}

/// Metrics and suggestions for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefactoringReport {
    /// The entity analyzed.
    pub entity: Entity,
    /// Its numbers.
    pub metrics: RefactoringMetrics,
    /// Suggestions, highest priority first.
    pub suggestions: Vec<Suggestion>,
}

/// Outcome of `suggest_refactoring`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefactoringResult {
    /// The entity exists.
    Found(RefactoringReport),
    /// No entity has this id.
    NotFound {
        /// The requested id.
        id: EntityId,
    },
}

/// Ranks entities over a borrowed store.
pub struct ConnectivityRanker<'a, S: ?Sized> {
    store: &'a S,
    config: RankingConfig,
}

impl<'a, S: GraphStore + ?Sized> ConnectivityRanker<'a, S> {
    /// Create a ranker with default thresholds.
    pub fn new(store: &'a S) -> Self {
        Self::with_config(store, RankingConfig::default())
    }

    /// Create a ranker with explicit thresholds.
    pub fn with_config(store: &'a S, config: RankingConfig) -> Self {
        Self { store, config }
    }

    /// The `limit` entities with the highest connectivity score.
    ///
    /// Sorted by score descending, then name, then id. Entities without any
    /// counted relation are omitted.
    pub fn most_connected(&self, limit: usize) -> Result<Vec<RankedEntity>> {
        let degrees = self.store.degree_counts()?;

        let mut ranked: Vec<RankedEntity> = self
            .store
            .all_entities()?
            .into_iter()
            .filter_map(|entity| {
                let degree = degrees.get(&entity.id).copied().unwrap_or_default();
                (degree.score() > 0).then(|| RankedEntity {
                    entity,
                    score: degree.score(),
                    incoming: degree.incoming,
                    outgoing: degree.outgoing,
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.entity.name.cmp(&b.entity.name))
                .then_with(|| a.entity.id.cmp(&b.entity.id))
        });
        ranked.truncate(limit);

        tracing::debug!(limit, returned = ranked.len(), "Ranked most connected entities");
        Ok(ranked)
    }

    /// The `limit` longest functions with a non-empty span.
    ///
    /// Sorted by line span descending, then name, then id.
    pub fn largest_functions(&self, limit: usize) -> Result<Vec<SizedEntity>> {
        let mut sized: Vec<SizedEntity> = self
            .store
            .all_entities()?
            .into_iter()
            .filter(Entity::is_callable)
            .filter_map(|entity| {
                let line_span = entity.line_span().filter(|&span| span > 0)?;
                Some(SizedEntity { entity, line_span })
            })
            .collect();

        sized.sort_by(|a, b| {
            (Reverse(a.line_span), &a.entity.name, &a.entity.id).cmp(&(
                Reverse(b.line_span),
                &b.entity.name,
                &b.entity.id,
            ))
        });
        sized.truncate(limit);
        Ok(sized)
    }

    /// Metrics and refactoring suggestions for one entity.
    pub fn suggest_refactoring(&self, id: &EntityId) -> Result<RefactoringResult> {
        let Some(entity) = self.store.entity(id)? else {
            return Ok(RefactoringResult::NotFound { id: id.clone() });
        };

        let degree = self.degree_of(id)?;
        let metrics = RefactoringMetrics {
            line_span: entity.line_span(),
            incoming: degree.incoming,
            outgoing: degree.outgoing,
        };

        let mut suggestions = Vec::new();
        if let Some(span) = metrics
            .line_span
            .filter(|&span| span > self.config.extract_method_lines)
        {
            suggestions.push(Suggestion {
                kind: SuggestionKind::ExtractMethod,
                priority: Priority::High,
                message: format!(
                    "spans {span} lines (threshold {}); extract smaller functions",
                    self.config.extract_method_lines
                ),
            });
        }
        if metrics.incoming > self.config.max_incoming {
            suggestions.push(Suggestion {
                kind: SuggestionKind::ReduceCoupling,
                priority: Priority::Medium,
                message: format!(
                    "{} dependents (threshold {}); consider an interface or facade",
                    metrics.incoming, self.config.max_incoming
                ),
            });
        }
        if metrics.outgoing > self.config.max_outgoing {
            suggestions.push(Suggestion {
                kind: SuggestionKind::SingleResponsibility,
                priority: Priority::Medium,
                message: format!(
                    "{} dependencies (threshold {}); split responsibilities",
                    metrics.outgoing, self.config.max_outgoing
                ),
            });
        }

        tracing::debug!(
            entity_id = %id,
            suggestions = suggestions.len(),
            "Computed refactoring suggestions"
        );

        Ok(RefactoringResult::Found(RefactoringReport {
            entity,
            metrics,
            suggestions,
        }))
    }

    /// Distinct existing neighbors of one entity.
    fn degree_of(&self, id: &EntityId) -> Result<Degree> {
        let sources = self.store.relations_to(id, &[])?;
        let targets = self.store.relations_from(id, &[])?;
        Ok(Degree {
            incoming: self.count_existing(sources.into_iter().map(|r| r.source_id))?,
            outgoing: self.count_existing(targets.into_iter().map(|r| r.target_id))?,
        })
    }

    fn count_existing(&self, ids: impl IntoIterator<Item = EntityId>) -> Result<usize> {
        let mut distinct: HashSet<EntityId> = HashSet::new();
        for other in ids {
            if !distinct.contains(&other) && self.store.entity(&other)?.is_some() {
                distinct.insert(other);
            }
        }
        Ok(distinct.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{EntityKind, GraphSnapshot, Relation, RelationKind};

    fn func(id: &str, start: u32, end: u32) -> Entity {
        Entity::new(id, id, EntityKind::Function, format!("{id}.rb")).with_lines(start, end)
    }

    #[test]
    fn ties_break_on_name_then_id() {
        let store = MemoryStore::new(GraphSnapshot::new(
            vec![
                Entity::new("2", "beta", EntityKind::Function, "x.rb"),
                Entity::new("1", "alpha", EntityKind::Function, "y.rb"),
                Entity::new("0", "lonely", EntityKind::Function, "z.rb"),
            ],
            vec![Relation::new("2", "1", RelationKind::Calls)],
        ))
        .unwrap();

        let ranked = ConnectivityRanker::new(&store).most_connected(10).unwrap();
        let names: Vec<&str> = ranked.iter().map(|r| r.entity.name.as_str()).collect();

        assert_eq!(names, vec!["alpha", "beta"], "zero-score entities are omitted");
    }

    #[test]
    fn largest_functions_skip_empty_and_inverted_spans() {
        let store = MemoryStore::new(GraphSnapshot::new(
            vec![
                func("big", 1, 200),
                func("small", 10, 20),
                func("one_line", 5, 5),
                func("inverted", 50, 40),
                Entity::new("Cls", "Cls", EntityKind::Class, "c.rb").with_lines(1, 900),
            ],
            vec![],
        ))
        .unwrap();

        let sized = ConnectivityRanker::new(&store).largest_functions(10).unwrap();
        let spans: Vec<(&str, u32)> = sized
            .iter()
            .map(|s| (s.entity.name.as_str(), s.line_span))
            .collect();

        assert_eq!(spans, vec![("big", 199), ("small", 10)]);
    }

    #[test]
    fn suggestions_follow_thresholds() {
        let mut entities = vec![func("hub", 1, 80)];
        let mut relations = Vec::new();
        for i in 0..11 {
            let caller = format!("caller{i}");
            entities.push(func(&caller, 1, 2));
            relations.push(Relation::new(caller, "hub", RelationKind::Calls));
        }
        relations.push(Relation::new("ghost", "hub", RelationKind::Calls));
        let store = MemoryStore::new(GraphSnapshot::new(entities, relations)).unwrap();

        let RefactoringResult::Found(report) = ConnectivityRanker::new(&store)
            .suggest_refactoring(&"hub".into())
            .unwrap()
        else {
            panic!("hub exists");
        };

        assert_eq!(report.metrics.incoming, 11, "dangling source is not counted");
        assert_eq!(report.metrics.line_span, Some(79));
        let kinds: Vec<SuggestionKind> = report.suggestions.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SuggestionKind::ExtractMethod, SuggestionKind::ReduceCoupling]
        );
        assert_eq!(report.suggestions[0].priority, Priority::High);
    }

    #[test]
    fn custom_thresholds_apply() {
        let store = MemoryStore::new(GraphSnapshot::new(
            vec![func("f", 1, 30), func("g", 1, 2)],
            vec![Relation::new("f", "g", RelationKind::Calls)],
        ))
        .unwrap();
        let config = RankingConfig {
            extract_method_lines: 20,
            max_incoming: 10,
            max_outgoing: 0,
        };

        let RefactoringResult::Found(report) = ConnectivityRanker::with_config(&store, config)
            .suggest_refactoring(&"f".into())
            .unwrap()
        else {
            panic!("f exists");
        };

        let kinds: Vec<SuggestionKind> = report.suggestions.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SuggestionKind::ExtractMethod,
                SuggestionKind::SingleResponsibility
            ]
        );
    }

    #[test]
    fn unknown_id_is_not_found() {
        let store = MemoryStore::new(GraphSnapshot::default()).unwrap();
        let result = ConnectivityRanker::new(&store)
            .suggest_refactoring(&"nope".into())
            .unwrap();
        assert_eq!(
            result,
            RefactoringResult::NotFound {
                id: "nope".into()
            }
        );
    }
}
