//! Shared fixtures for integration tests.

// Each test binary uses a different subset of these helpers
#![allow(dead_code)]

use nereus::{
    Entity, EntityKind, GraphSnapshot, GraphStore, MemoryStore, Relation, RelationKind,
    SqliteStore,
};
use proptest::prelude::*;
use tempfile::TempDir;

/// Which backend a test runs against.
#[derive(Debug, Clone, Copy)]
pub enum Backend {
    Memory,
    Sqlite,
}

/// A store of either backend, plus the temp dir keeping a SQLite file alive.
pub struct TestStore {
    pub store: Box<dyn GraphStore>,
    _dir: Option<TempDir>,
}

impl std::ops::Deref for TestStore {
    type Target = dyn GraphStore;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}

/// Build a store over `snapshot` on the chosen backend.
pub fn build(backend: Backend, snapshot: GraphSnapshot) -> TestStore {
    match backend {
        Backend::Memory => TestStore {
            store: Box::new(MemoryStore::new(snapshot).expect("valid snapshot")),
            _dir: None,
        },
        Backend::Sqlite => {
            let (dir, store) = sqlite(&snapshot);
            TestStore {
                store: Box::new(store),
                _dir: Some(dir),
            }
        }
    }
}

/// Import `snapshot` into a fresh SQLite database.
pub fn sqlite(snapshot: &GraphSnapshot) -> (TempDir, SqliteStore) {
    let dir = TempDir::new().expect("create temp dir");
    let store =
        SqliteStore::import(&dir.path().join("graph.db"), snapshot).expect("import snapshot");
    (dir, store)
}

pub fn memory(entities: Vec<Entity>, relations: Vec<Relation>) -> MemoryStore {
    MemoryStore::new(GraphSnapshot::new(entities, relations)).expect("valid snapshot")
}

pub fn func(id: &str, file: &str) -> Entity {
    Entity::new(id, id, EntityKind::Function, file)
}

pub fn module(id: &str, file: &str) -> Entity {
    Entity::new(id, id, EntityKind::Module, file)
}

pub fn calls(from: &str, to: &str) -> Relation {
    Relation::new(from, to, RelationKind::Calls)
}

pub fn imports(from: &str, to: &str) -> Relation {
    Relation::new(from, to, RelationKind::Imports)
}

/// Entity kinds random graphs draw from.
const ARB_KINDS: [EntityKind; 4] = [
    EntityKind::Function,
    EntityKind::Method,
    EntityKind::Module,
    EntityKind::Class,
];

/// Random graphs with cycles, self loops, parallel edges, shared files and
/// dangling relations (index `n` maps to an id with no entity).
pub fn arb_snapshot() -> impl Strategy<Value = GraphSnapshot> {
    (1usize..12)
        .prop_flat_map(|n| {
            (
                prop::collection::vec((0..ARB_KINDS.len(), 0..n.div_ceil(2).max(1)), n),
                prop::collection::vec((0..=n, 0..=n, 0..RelationKind::ALL.len()), 0..40),
            )
        })
        .prop_map(|(nodes, edges)| {
            let n = nodes.len();
            let id = |i: usize| {
                if i == n {
                    "ghost".to_string()
                } else {
                    format!("e{i}")
                }
            };

            let entities = nodes
                .iter()
                .enumerate()
                .map(|(i, &(kind, file))| {
                    Entity::new(
                        id(i),
                        format!("n{}", i % 3),
                        ARB_KINDS[kind].clone(),
                        format!("src/f{file}.rs"),
                    )
                    .with_lines(1, u32::try_from(i * 7 + 1).unwrap_or(1))
                })
                .collect();
            let relations = edges
                .into_iter()
                .map(|(s, t, k)| Relation::new(id(s), id(t), RelationKind::ALL[k]))
                .collect();

            GraphSnapshot::new(entities, relations)
        })
}
