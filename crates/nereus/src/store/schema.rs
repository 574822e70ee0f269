//! Table contract for the SQLite graph store.

/// Tables the SQLite store reads.
///
/// The indexer owns these tables; Nereus only creates them when loading a
/// snapshot. Relations carry no foreign keys because a partial reindex can
/// leave dangling edges, which the analyses skip.
pub const SCHEMA: &str = r"
-- Graph nodes: functions, classes, modules, ...
CREATE TABLE IF NOT EXISTS entities (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    qualified_name TEXT,
    type TEXT NOT NULL,
    file TEXT NOT NULL,
    start_line INTEGER,
    end_line INTEGER,
    community_id INTEGER
);

CREATE INDEX IF NOT EXISTS idx_entities_name ON entities(name);
CREATE INDEX IF NOT EXISTS idx_entities_qualified ON entities(qualified_name);
CREATE INDEX IF NOT EXISTS idx_entities_file ON entities(file);
CREATE INDEX IF NOT EXISTS idx_entities_type ON entities(type);

-- Graph edges: calls, imports, inherits, ...
CREATE TABLE IF NOT EXISTS relations (
    source_id TEXT NOT NULL,
    target_id TEXT NOT NULL,
    type TEXT NOT NULL,
    PRIMARY KEY (source_id, target_id, type)
);

CREATE INDEX IF NOT EXISTS idx_relations_target ON relations(target_id, type);
CREATE INDEX IF NOT EXISTS idx_relations_source ON relations(source_id, type);
";
