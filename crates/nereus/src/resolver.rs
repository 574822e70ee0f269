//! Turns a loosely specified identifier into one concrete entity.
//!
//! Resolution runs an ordered list of strategies and stops at the first one
//! that matches anything:
//!
//! 1. `IdExact` - the identifier is an entity id
//! 2. `NameExact` - the identifier is an entity name
//! 3. `QualifiedSuffix` - a qualified name ends with the identifier
//! 4. `FileAndName` - `path::name`, split at the last `::`
//!
//! `FileAndName` splits at the *last* `::`, so `src/a.rs::Foo::bar` looks for
//! an entity named `bar` in a file containing `src/a.rs::Foo` and finds none.
//! Qualified names that themselves contain `::` resolve through
//! `QualifiedSuffix` instead (`Foo::bar`).
//!
//! An id match always wins over a name match. When one strategy matches
//! several entities, the smallest by (file, start line, name, id) wins, so the
//! same identifier resolves to the same entity on every call.

use serde::Serialize;

use crate::error::Result;
use crate::store::GraphStore;
use crate::types::{Entity, EntityId};

/// Separator between the file and name parts of a `FileAndName` identifier.
const FILE_NAME_SEPARATOR: &str = "::";

/// One way of matching an identifier against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveStrategy {
    /// Exact match on `id`.
    IdExact,
    /// Exact match on `name`.
    NameExact,
    /// `qualified_name` ends with the identifier.
    QualifiedSuffix,
    /// `file::name`: file contains the path part, name equals the name part.
    FileAndName,
}

impl ResolveStrategy {
    /// The order `EntityResolver::resolve` tries strategies in.
    pub const DEFAULT_ORDER: [ResolveStrategy; 4] = [
        Self::IdExact,
        Self::NameExact,
        Self::QualifiedSuffix,
        Self::FileAndName,
    ];

    /// All entities this strategy matches, in store order.
    fn candidates<S: GraphStore + ?Sized>(self, store: &S, identifier: &str) -> Result<Vec<Entity>> {
        match self {
            Self::IdExact => Ok(store
                .entity(&EntityId::from(identifier))?
                .into_iter()
                .collect()),
            Self::NameExact => store.entities_by_name(identifier),
            Self::QualifiedSuffix => store.entities_by_qualified_suffix(identifier),
            Self::FileAndName => {
                let Some((file, name)) = identifier.rsplit_once(FILE_NAME_SEPARATOR) else {
                    return Ok(vec![]);
                };
                if file.is_empty() || name.is_empty() {
                    return Ok(vec![]);
                }
                Ok(store
                    .entities_in_file_matching(file)?
                    .into_iter()
                    .filter(|e| e.name == name)
                    .collect())
            }
        }
    }
}

/// Outcome of resolving an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    /// The identifier matched an entity.
    Found {
        /// The winning entity.
        entity: Entity,
        /// The strategy that produced it.
        strategy: ResolveStrategy,
    },
    /// No strategy matched.
    NotFound {
        /// The identifier as given.
        identifier: String,
    },
}

impl Resolution {
    /// The resolved entity, if any.
    #[must_use]
    pub fn entity(&self) -> Option<&Entity> {
        match self {
            Self::Found { entity, .. } => Some(entity),
            Self::NotFound { .. } => None,
        }
    }

    /// Consume the resolution, keeping only the entity.
    #[must_use]
    pub fn into_entity(self) -> Option<Entity> {
        match self {
            Self::Found { entity, .. } => Some(entity),
            Self::NotFound { .. } => None,
        }
    }

    /// Whether an entity was found.
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Resolves identifiers against a borrowed store.
pub struct EntityResolver<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: GraphStore + ?Sized> EntityResolver<'a, S> {
    /// Create a resolver over `store`.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolve with the default strategy order.
    ///
    /// # Errors
    ///
    /// Only store failures are errors; an unknown identifier is
    /// `Resolution::NotFound`.
    pub fn resolve(&self, identifier: &str) -> Result<Resolution> {
        self.resolve_with(identifier, &ResolveStrategy::DEFAULT_ORDER)
    }

    /// Resolve trying only `strategies`, in the given order.
    pub fn resolve_with(
        &self,
        identifier: &str,
        strategies: &[ResolveStrategy],
    ) -> Result<Resolution> {
        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            return Ok(Resolution::NotFound {
                identifier: identifier.to_string(),
            });
        }

        for &strategy in strategies {
            let winner = strategy
                .candidates(self.store, trimmed)?
                .into_iter()
                .min_by(Entity::canonical_cmp);

            if let Some(entity) = winner {
                tracing::trace!(
                    identifier = trimmed,
                    entity_id = %entity.id,
                    ?strategy,
                    "Resolved identifier"
                );
                return Ok(Resolution::Found { entity, strategy });
            }
        }

        tracing::debug!(identifier = trimmed, "Identifier did not resolve");
        Ok(Resolution::NotFound {
            identifier: identifier.to_string(),
        })
    }

    /// First function-typed entity with exactly this name.
    pub fn resolve_function(&self, name: &str) -> Result<Option<Entity>> {
        Ok(self
            .store
            .entities_by_name(name.trim())?
            .into_iter()
            .filter(Entity::is_callable)
            .min_by(Entity::canonical_cmp))
    }
}
