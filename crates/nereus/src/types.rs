//! Domain types for the code-relationship graph.
//!
//! These types represent the graph as the indexer produced it:
//! - **Nodes**: `Entity` (function, class, module, ...)
//! - **Edges**: `Relation` (calls, imports, inherits, ...)
//! - **Interchange**: `GraphSnapshot` (one indexing pass, serde-serializable)
//! - **Counts**: `Degree`, `GraphStats`
//!
//! ## Design Decisions
//!
//! | Decision | Choice | Rationale |
//! |----------|--------|-----------|
//! | Entity id | `String` newtype | Ids come from an external indexer; opaque and stable |
//! | Entity kind | Enum with `Other` | Sixteen indexed languages produce kinds we don't model |
//! | Relation kind | Closed enum | Analyses select edges by kind; unknown kinds are data errors |
//! | Lines | Optional | Not every construct has a known span |

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Strongly-typed ID wrapper
// ============================================================================

/// A strongly-typed entity ID.
///
/// Ids are unique within a store snapshot and stable across queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create an id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Entity kinds, normalized across indexed languages.
///
/// Kinds the indexer emits that Nereus does not model are kept verbatim in
/// `Other` so no entity is dropped on read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityKind {
    /// File-level module, namespace or package
    Module,
    /// Class
    Class,
    /// Interface or protocol
    Interface,
    /// Struct or record
    Struct,
    /// Enum type
    Enum,
    /// Trait
    Trait,
    /// Free function
    Function,
    /// Method (function associated with a type)
    Method,
    /// Constructor
    Constructor,
    /// Variable or field
    Variable,
    /// Constant value
    Constant,
    /// Type alias
    TypeAlias,
    /// Any kind not listed above
    Other(String),
}

impl EntityKind {
    /// Convert to the string representation used by stores.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Module => "module",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Trait => "trait",
            Self::Function => "function",
            Self::Method => "method",
            Self::Constructor => "constructor",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::TypeAlias => "type_alias",
            Self::Other(kind) => kind,
        }
    }

    /// Parse a kind string. Never fails; unknown kinds become `Other`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "module" => Self::Module,
            "class" => Self::Class,
            "interface" => Self::Interface,
            "struct" => Self::Struct,
            "enum" => Self::Enum,
            "trait" => Self::Trait,
            "function" => Self::Function,
            "method" => Self::Method,
            "constructor" => Self::Constructor,
            "variable" => Self::Variable,
            "constant" => Self::Constant,
            "type_alias" => Self::TypeAlias,
            _ => Self::Other(s.to_string()),
        }
    }

    /// Whether entities of this kind take part in call graphs.
    #[must_use]
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function | Self::Method | Self::Constructor)
    }

    /// Whether entities of this kind take part in import graphs.
    #[must_use]
    pub fn is_module(&self) -> bool {
        matches!(self, Self::Module)
    }
}

impl From<String> for EntityKind {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<EntityKind> for String {
    fn from(kind: EntityKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relation kinds between entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    /// Direct function call
    Calls,
    /// Indirect invocation (callbacks, dynamic dispatch)
    Invokes,
    /// Any other use of a symbol
    References,
    /// Module import
    Imports,
    /// Textual include (`#include` and friends)
    Includes,
    /// Runtime require
    Requires,
    /// Interface implementation
    Implements,
    /// Class extension
    Extends,
    /// Inheritance
    Inherits,
}

/// Relation kinds followed by call-graph traversal.
pub const CALL_KINDS: &[RelationKind] = &[
    RelationKind::Calls,
    RelationKind::Invokes,
    RelationKind::References,
];

/// Relation kinds followed by cycle detection.
pub const IMPORT_KINDS: &[RelationKind] = &[
    RelationKind::Imports,
    RelationKind::Includes,
    RelationKind::Requires,
];

impl RelationKind {
    /// All relation kinds, in declaration order.
    pub const ALL: [RelationKind; 9] = [
        Self::Calls,
        Self::Invokes,
        Self::References,
        Self::Imports,
        Self::Includes,
        Self::Requires,
        Self::Implements,
        Self::Extends,
        Self::Inherits,
    ];

    /// Convert to the string representation used by stores.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calls => "calls",
            Self::Invokes => "invokes",
            Self::References => "references",
            Self::Imports => "imports",
            Self::Includes => "includes",
            Self::Requires => "requires",
            Self::Implements => "implements",
            Self::Extends => "extends",
            Self::Inherits => "inherits",
        }
    }
}

impl FromStr for RelationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidData(format!("unknown relation type '{s}'")))
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Core entities
// ============================================================================

/// A named, typed, source-located node of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique, stable id.
    pub id: EntityId,
    /// Short name (`authenticate`).
    pub name: String,
    /// Dotted/hierarchical name (`auth.Service.authenticate`), if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
    /// Construct kind.
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// Path relative to the repository root.
    pub file: String,
    /// First line of the construct (1-indexed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    /// Last line of the construct (1-indexed, inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    /// Cluster label from an external community-detection pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_id: Option<i64>,
}

impl Entity {
    /// Create an entity with no qualified name, span or community.
    #[must_use]
    pub fn new(
        id: impl Into<EntityId>,
        name: impl Into<String>,
        kind: EntityKind,
        file: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            qualified_name: None,
            kind,
            file: file.into(),
            start_line: None,
            end_line: None,
            community_id: None,
        }
    }

    /// Set the line span.
    #[must_use]
    pub fn with_lines(mut self, start_line: u32, end_line: u32) -> Self {
        self.start_line = Some(start_line);
        self.end_line = Some(end_line);
        self
    }

    /// Set the qualified name.
    #[must_use]
    pub fn with_qualified_name(mut self, qualified_name: impl Into<String>) -> Self {
        self.qualified_name = Some(qualified_name.into());
        self
    }

    /// Whether this entity takes part in call graphs.
    #[must_use]
    pub fn is_callable(&self) -> bool {
        self.kind.is_callable()
    }

    /// Number of lines between start and end (`end_line - start_line`).
    ///
    /// Returns `None` when either bound is missing or the span is inverted.
    #[must_use]
    pub fn line_span(&self) -> Option<u32> {
        let (start, end) = self.start_line.zip(self.end_line)?;
        end.checked_sub(start)
    }

    /// Canonical ordering used for every list Nereus returns:
    /// file, start line, name, id.
    #[must_use]
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.file
            .cmp(&other.file)
            .then_with(|| self.start_line.cmp(&other.start_line))
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// A directed, typed edge between two entities.
///
/// Either endpoint may be missing from the store after a partial reindex;
/// analyses skip such dangling relations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    /// The entity the edge starts at.
    pub source_id: EntityId,
    /// The entity the edge points to.
    pub target_id: EntityId,
    /// Relation kind.
    #[serde(rename = "type")]
    pub kind: RelationKind,
}

impl Relation {
    /// Create a relation.
    #[must_use]
    pub fn new(
        source_id: impl Into<EntityId>,
        target_id: impl Into<EntityId>,
        kind: RelationKind,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            kind,
        }
    }

    /// Canonical ordering: source, target, kind.
    #[must_use]
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.source_id
            .cmp(&other.source_id)
            .then_with(|| self.target_id.cmp(&other.target_id))
            .then_with(|| self.kind.as_str().cmp(other.kind.as_str()))
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// All entities and relations of one indexing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Graph nodes.
    #[serde(default)]
    pub entities: Vec<Entity>,
    /// Graph edges.
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl GraphSnapshot {
    /// Create a snapshot from entities and relations.
    #[must_use]
    pub fn new(entities: Vec<Entity>, relations: Vec<Relation>) -> Self {
        Self {
            entities,
            relations,
        }
    }

    /// Parse a snapshot from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a snapshot from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read snapshot {}: {e}", path.display()),
            ))
        })?;
        Self::from_json(&content)
    }

    /// Check the snapshot invariants: entity ids are unique.
    ///
    /// Inverted spans and dangling relations are tolerated; they are
    /// handled at query time.
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<&EntityId> = HashSet::with_capacity(self.entities.len());
        for entity in &self.entities {
            if !seen.insert(&entity.id) {
                return Err(Error::InvalidData(format!(
                    "duplicate entity id '{}'",
                    entity.id
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Counts
// ============================================================================

/// Distinct neighbor counts of one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degree {
    /// Number of distinct entities with an edge into this one.
    pub incoming: usize,
    /// Number of distinct entities this one has an edge to.
    pub outgoing: usize,
}

impl Degree {
    /// Connectivity score: `incoming + outgoing`.
    #[must_use]
    pub fn score(&self) -> usize {
        self.incoming + self.outgoing
    }
}

/// Summary counts of a store snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Number of entities.
    pub entity_count: usize,
    /// Number of relations, dangling ones included.
    pub relation_count: usize,
    /// Number of distinct files.
    pub file_count: usize,
    /// Relations whose source or target entity is missing.
    pub dangling_relations: usize,
    /// Entity counts keyed by kind string.
    pub entities_by_kind: BTreeMap<String, usize>,
    /// Relation counts keyed by kind string.
    pub relations_by_kind: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::both_present(Some(10), Some(25), Some(15))]
    #[case::single_line(Some(7), Some(7), Some(0))]
    #[case::inverted(Some(30), Some(20), None)]
    #[case::missing_end(Some(3), None, None)]
    #[case::missing_start(None, Some(3), None)]
    fn line_span_cases(
        #[case] start: Option<u32>,
        #[case] end: Option<u32>,
        #[case] expected: Option<u32>,
    ) {
        let mut entity = Entity::new("f", "f", EntityKind::Function, "a.js");
        entity.start_line = start;
        entity.end_line = end;
        assert_eq!(entity.line_span(), expected);
    }

    #[test]
    fn unknown_entity_kind_is_preserved() {
        let kind = EntityKind::parse("decorator");
        assert_eq!(kind, EntityKind::Other("decorator".to_string()));
        assert_eq!(kind.as_str(), "decorator");
        assert!(!kind.is_callable());
    }

    #[test]
    fn callable_kinds() {
        assert!(EntityKind::Function.is_callable());
        assert!(EntityKind::Method.is_callable());
        assert!(EntityKind::Constructor.is_callable());
        assert!(!EntityKind::Class.is_callable());
        assert!(!EntityKind::Module.is_callable());
    }

    #[test]
    fn unknown_relation_kind_is_rejected() {
        let err = "depends_on".parse::<RelationKind>().unwrap_err();
        assert!(err.to_string().contains("depends_on"));
        assert_eq!("imports".parse::<RelationKind>().unwrap(), RelationKind::Imports);
    }

    #[test]
    fn snapshot_json_uses_type_field() {
        let json = r#"{
            "entities": [
                {"id": "m1", "name": "auth", "type": "module", "file": "src/auth.js"},
                {"id": "f1", "name": "login", "type": "function", "file": "src/auth.js",
                 "qualified_name": "auth.login", "start_line": 3, "end_line": 9}
            ],
            "relations": [
                {"source_id": "m1", "target_id": "f1", "type": "references"}
            ]
        }"#;

        let snapshot = GraphSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.entities.len(), 2);
        assert_eq!(snapshot.entities[1].kind, EntityKind::Function);
        assert_eq!(snapshot.entities[1].line_span(), Some(6));
        assert_eq!(snapshot.relations[0].kind, RelationKind::References);
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let snapshot = GraphSnapshot::new(
            vec![
                Entity::new("x", "Foo", EntityKind::Class, "a.py"),
                Entity::new("x", "Foo", EntityKind::Function, "b.py"),
            ],
            vec![],
        );

        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn canonical_order_is_file_then_line_then_name() {
        let a = Entity::new("2", "b", EntityKind::Function, "a.rs").with_lines(5, 6);
        let b = Entity::new("1", "a", EntityKind::Function, "a.rs").with_lines(9, 10);
        let c = Entity::new("0", "a", EntityKind::Function, "b.rs").with_lines(1, 2);

        let mut entities = vec![c.clone(), b.clone(), a.clone()];
        entities.sort_by(Entity::canonical_cmp);
        assert_eq!(entities, vec![a, b, c]);
    }
}
