//! `SQLite`-backed graph store.
//!
//! Opens an existing database read-only; the engine never writes to the
//! graph it analyzes. `SqliteStore::import` is the one write path, used to
//! load a `GraphSnapshot` into the table contract (tests and `nereus import`).

// SQLite uses i64 for all integer storage. Line numbers and counts fit.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params, params_from_iter};

use super::{GraphStore, SCHEMA};
use crate::error::{Error, Result};
use crate::types::{Degree, Entity, EntityId, EntityKind, GraphSnapshot, Relation, RelationKind};

/// SQL column list for the entities table.
///
/// Use with `row_to_entity` for consistent column ordering.
const ENTITY_COLUMNS: &str =
    "id, name, qualified_name, type, file, start_line, end_line, community_id";

/// Canonical entity ordering; NULL start lines sort first like `Option::None`.
const ENTITY_ORDER: &str = "ORDER BY file, start_line, name, id";

/// Read-only store over the `entities`/`relations` tables.
///
/// The connection is wrapped in a `Mutex` to satisfy the `Send + Sync`
/// bounds of `GraphStore`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteStore {
    /// Open an existing graph database read-only.
    ///
    /// # Errors
    ///
    /// - `Error::StoreUnavailable` if the file does not exist or lacks the
    ///   `entities`/`relations` tables
    /// - `Error::Database` if `SQLite` cannot open it (corrupt file, permissions)
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::StoreUnavailable(format!(
                "no graph database at {}",
                path.display()
            )));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let tables: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type = 'table' AND name IN ('entities', 'relations')",
            [],
            |row| row.get(0),
        )?;
        if tables != 2 {
            return Err(Error::StoreUnavailable(format!(
                "{} is missing the entities/relations tables",
                path.display()
            )));
        }

        tracing::debug!(path = %path.display(), "Opened graph store");

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    /// Create (or replace the contents of) a graph database from a snapshot,
    /// then open it read-only.
    ///
    /// Runs in a single transaction: either the whole snapshot is loaded or
    /// the database is unchanged.
    pub fn import(path: &Path, snapshot: &GraphSnapshot) -> Result<Self> {
        snapshot.validate()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        {
            let mut conn = Connection::open(path)?;
            conn.execute_batch(SCHEMA)?;

            let tx = conn.transaction()?;
            tx.execute("DELETE FROM relations", [])?;
            tx.execute("DELETE FROM entities", [])?;
            {
                let mut insert_entity = tx.prepare(&format!(
                    "INSERT INTO entities ({ENTITY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ))?;
                for entity in &snapshot.entities {
                    insert_entity.execute(params![
                        entity.id.as_str(),
                        entity.name,
                        entity.qualified_name,
                        entity.kind.as_str(),
                        entity.file,
                        entity.start_line,
                        entity.end_line,
                        entity.community_id,
                    ])?;
                }

                let mut insert_relation = tx.prepare(
                    "INSERT OR IGNORE INTO relations (source_id, target_id, type)
                     VALUES (?1, ?2, ?3)",
                )?;
                for relation in &snapshot.relations {
                    insert_relation.execute(params![
                        relation.source_id.as_str(),
                        relation.target_id.as_str(),
                        relation.kind.as_str(),
                    ])?;
                }
            }
            tx.commit()?;
        }

        tracing::info!(
            path = %path.display(),
            entities = snapshot.entities.len(),
            relations = snapshot.relations.len(),
            "Imported graph snapshot"
        );

        Self::open(path)
    }

    /// Path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the connection lock, converting poison errors to our error type.
    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            Error::Internal(format!(
                "graph store mutex poisoned (a thread panicked while holding the lock): {e}"
            ))
        })
    }

    /// Run an entity query with positional parameters.
    fn query_entities<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Entity>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql)?;
        let entities = stmt
            .query_map(params, row_to_entity)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    /// Relations where `column = id`, optionally filtered by kind.
    fn query_relations(
        &self,
        column: &str,
        id: &EntityId,
        kinds: &[RelationKind],
    ) -> Result<Vec<Relation>> {
        let mut sql = format!("SELECT source_id, target_id, type FROM relations WHERE {column} = ?1");
        if !kinds.is_empty() {
            let placeholders: Vec<String> = (0..kinds.len()).map(|i| format!("?{}", i + 2)).collect();
            sql.push_str(&format!(" AND type IN ({})", placeholders.join(", ")));
        }
        sql.push_str(" ORDER BY source_id, target_id, type");

        let values: Vec<&str> = std::iter::once(id.as_str())
            .chain(kinds.iter().map(|kind| kind.as_str()))
            .collect();

        let conn = self.connection()?;
        let mut stmt = conn.prepare(&sql)?;
        let relations = stmt
            .query_map(params_from_iter(values), row_to_relation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(relations)
    }
}

impl GraphStore for SqliteStore {
    fn entity(&self, id: &EntityId) -> Result<Option<Entity>> {
        tracing::trace!(entity_id = %id, "Looking up entity by id");
        let conn = self.connection()?;
        conn.query_row(
            &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = ?1"),
            [id.as_str()],
            row_to_entity,
        )
        .optional()
        .map_err(Into::into)
    }

    fn entities_by_name(&self, name: &str) -> Result<Vec<Entity>> {
        self.query_entities(
            &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE name = ?1 {ENTITY_ORDER}"),
            [name],
        )
    }

    fn entities_by_qualified_suffix(&self, suffix: &str) -> Result<Vec<Entity>> {
        if suffix.is_empty() {
            return Ok(vec![]);
        }
        // substr/length count characters, so this is an exact suffix test
        self.query_entities(
            &format!(
                "SELECT {ENTITY_COLUMNS} FROM entities
                 WHERE qualified_name IS NOT NULL
                   AND length(qualified_name) >= length(?1)
                   AND substr(qualified_name, -length(?1)) = ?1
                 {ENTITY_ORDER}"
            ),
            [suffix],
        )
    }

    fn entities_in_file(&self, file: &str) -> Result<Vec<Entity>> {
        self.query_entities(
            &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE file = ?1 {ENTITY_ORDER}"),
            [file],
        )
    }

    fn entities_in_file_matching(&self, fragment: &str) -> Result<Vec<Entity>> {
        self.query_entities(
            &format!(
                "SELECT {ENTITY_COLUMNS} FROM entities WHERE instr(file, ?1) > 0 {ENTITY_ORDER}"
            ),
            [fragment],
        )
    }

    fn entities_of_kind(&self, kind: &EntityKind) -> Result<Vec<Entity>> {
        let column = kind_column(kind);
        self.query_entities(
            &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE {column} = ?1 {ENTITY_ORDER}"),
            [kind.as_str()],
        )
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

        let like = format!("%{}%", escape_like(pattern));
        let column = kind.map_or("type", kind_column);
        self.query_entities(
            &format!(
                "SELECT {ENTITY_COLUMNS} FROM entities
                 WHERE (name LIKE ?1 ESCAPE '\\' OR qualified_name LIKE ?1 ESCAPE '\\')
                   AND (?2 IS NULL OR {column} = ?2)
                 ORDER BY CASE WHEN name = ?3 THEN 0 ELSE 1 END, file, start_line, name, id
                 LIMIT ?4"
            ),
            params![like, kind.map(EntityKind::as_str), pattern, limit as i64],
        )
    }

    fn relations_from(&self, id: &EntityId, kinds: &[RelationKind]) -> Result<Vec<Relation>> {
        self.query_relations("source_id", id, kinds)
    }

    fn relations_to(&self, id: &EntityId, kinds: &[RelationKind]) -> Result<Vec<Relation>> {
        self.query_relations("target_id", id, kinds)
    }

    fn all_entities(&self) -> Result<Vec<Entity>> {
        self.query_entities(
            &format!("SELECT {ENTITY_COLUMNS} FROM entities {ENTITY_ORDER}"),
            [],
        )
    }

    fn all_relations(&self) -> Result<Vec<Relation>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT source_id, target_id, type FROM relations ORDER BY source_id, target_id, type",
        )?;
        let relations = stmt
            .query_map([], row_to_relation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(relations)
    }

    fn degree_counts(&self) -> Result<HashMap<EntityId, Degree>> {
        let conn = self.connection()?;

        // Only relations whose both endpoints exist are counted
        let mut stmt = conn.prepare(
            "SELECT e.id,
                (SELECT COUNT(DISTINCT r.source_id) FROM relations r
                   JOIN entities s ON s.id = r.source_id
                  WHERE r.target_id = e.id),
                (SELECT COUNT(DISTINCT r.target_id) FROM relations r
                   JOIN entities t ON t.id = r.target_id
                  WHERE r.source_id = e.id)
             FROM entities e",
        )?;

        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let incoming: i64 = row.get(1)?;
            let outgoing: i64 = row.get(2)?;
            Ok((
                EntityId::from(id),
                Degree {
                    incoming: incoming as usize,
                    outgoing: outgoing as usize,
                },
            ))
        })?;

        let mut degrees = HashMap::new();
        for row in rows {
            let (id, degree) = row?;
            degrees.insert(id, degree);
        }
        Ok(degrees)
    }
}

/// Convert an entities row (in `ENTITY_COLUMNS` order) to an `Entity`.
fn row_to_entity(row: &Row<'_>) -> rusqlite::Result<Entity> {
    let id: String = row.get(0)?;
    let kind: String = row.get(3)?;
    let start_line: Option<i64> = row.get(5)?;
    let end_line: Option<i64> = row.get(6)?;

    Ok(Entity {
        id: EntityId::from(id),
        name: row.get(1)?,
        qualified_name: row.get(2)?,
        kind: EntityKind::parse(&kind),
        file: row.get(4)?,
        // Negative or oversized lines read as unknown
        start_line: start_line.and_then(|l| u32::try_from(l).ok()),
        end_line: end_line.and_then(|l| u32::try_from(l).ok()),
        community_id: row.get(7)?,
    })
}

/// Convert a relations row (`source_id, target_id, type`) to a `Relation`.
///
/// Unknown relation types indicate a newer or corrupted database.
fn row_to_relation(row: &Row<'_>) -> rusqlite::Result<Relation> {
    let source: String = row.get(0)?;
    let target: String = row.get(1)?;
    let kind_str: String = row.get(2)?;
    let kind = kind_str.parse::<RelationKind>().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("Unknown relation type '{kind_str}' in database. Database may be corrupted or from a newer version.").into(),
        )
    })?;

    Ok(Relation {
        source_id: EntityId::from(source),
        target_id: EntityId::from(target),
        kind,
    })
}

/// SQL expression a kind filter compares against.
///
/// Known kinds are read through `EntityKind::parse`, which ignores case and
/// surrounding spaces, so the filter has to fold the column the same way.
/// Unrecognized kinds keep the stored text verbatim.
fn kind_column(kind: &EntityKind) -> &'static str {
    match kind {
        EntityKind::Other(_) => "type",
        _ => "lower(trim(type))",
    }
}

/// Escape `LIKE` wildcards so the pattern matches literally.
fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
