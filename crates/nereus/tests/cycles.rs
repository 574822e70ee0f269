//! Integration tests for circular import detection.

mod common;

use std::collections::HashSet;

use nereus::{
    CycleConfig, CycleDetector, CycleStrategy, GraphSnapshot, GraphStore, IMPORT_KINDS,
};
use proptest::prelude::*;
use rstest::rstest;

use common::{Backend, arb_snapshot, build, imports, module};

fn triangle() -> GraphSnapshot {
    GraphSnapshot::new(
        vec![
            module("mod_a", "a.py"),
            module("mod_b", "b.py"),
            module("mod_c", "c.py"),
        ],
        vec![
            imports("mod_a", "mod_b"),
            imports("mod_b", "mod_c"),
            imports("mod_c", "mod_a"),
        ],
    )
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn triangle_needs_three_edges(#[case] backend: Backend) {
    let store = build(backend, triangle());
    let detector = CycleDetector::new(&*store);

    let shallow = detector.find_circular_dependencies(1).expect("search");
    assert!(shallow.cycles.is_empty());

    let full = detector.find_circular_dependencies(3).expect("search");
    assert_eq!(full.cycles.len(), 1);
    assert_eq!(full.cycles[0].files, vec!["a.py", "b.py", "c.py", "a.py"]);
    assert!(!full.truncated);
}

#[rstest]
#[case::path_tracking(CycleStrategy::PathTracking)]
#[case::three_color(CycleStrategy::ThreeColor)]
fn strategies_agree_on_a_simple_cycle(#[case] strategy: CycleStrategy) {
    let store = build(Backend::Memory, triangle());
    let report = CycleDetector::new(&*store)
        .find_cycles(10, strategy)
        .expect("search");

    assert_eq!(report.strategy, strategy);
    assert_eq!(report.cycles.len(), 1);
    assert_eq!(report.cycles[0].edge_count(), 3);
}

#[test]
fn function_level_imports_are_ignored() {
    let store = common::memory(
        vec![common::func("f", "a.py"), common::func("g", "b.py")],
        vec![imports("f", "g"), imports("g", "f")],
    );

    let report = CycleDetector::new(&store)
        .find_circular_dependencies(5)
        .expect("search");
    assert!(report.cycles.is_empty());
    assert_eq!(report.roots_examined, 0);
}

#[test]
fn scc_groups_match_cycles() {
    let store = build(Backend::Sqlite, triangle());
    let groups = CycleDetector::new(&*store)
        .strongly_connected_modules()
        .expect("scc");
    assert_eq!(groups, vec![vec!["a.py", "b.py", "c.py"]]);
}

#[test]
fn capitalized_module_kinds_still_form_cycles() {
    let (dir, store) = common::sqlite(&GraphSnapshot::default());
    drop(store);
    let path = dir.path().join("graph.db");

    rusqlite::Connection::open(&path)
        .expect("open writer")
        .execute_batch(
            "INSERT INTO entities (id, name, type, file) VALUES ('a', 'a', 'Module', 'a.py');
             INSERT INTO entities (id, name, type, file) VALUES ('b', 'b', 'Module', 'b.py');
             INSERT INTO relations (source_id, target_id, type) VALUES ('a', 'b', 'imports');
             INSERT INTO relations (source_id, target_id, type) VALUES ('b', 'a', 'imports');",
        )
        .expect("insert indexer rows");

    let store = nereus::SqliteStore::open(&path).expect("reopen");
    let report = CycleDetector::new(&store)
        .find_circular_dependencies(5)
        .expect("search");

    assert_eq!(report.roots_examined, 2);
    assert_eq!(report.cycles.len(), 1);
    assert_eq!(report.cycles[0].files, vec!["a.py", "b.py", "a.py"]);
}

/// Checks that every consecutive file pair of `files` is backed by an import
/// between module entities of those files.
fn assert_cycle_is_real(store: &dyn GraphStore, files: &[String]) {
    assert_eq!(files.first(), files.last(), "cycle must be closed");
    for pair in files.windows(2) {
        let sources = store.entities_in_file(&pair[0]).expect("query");
        let targets: HashSet<_> = store
            .entities_in_file(&pair[1])
            .expect("query")
            .into_iter()
            .filter(|e| e.kind.is_module())
            .map(|e| e.id)
            .collect();

        let backed = sources.iter().filter(|e| e.kind.is_module()).any(|e| {
            store
                .relations_from(&e.id, IMPORT_KINDS)
                .expect("query")
                .iter()
                .any(|r| targets.contains(&r.target_id))
        });
        assert!(backed, "no import behind {} -> {}", pair[0], pair[1]);
    }
}

proptest! {
    #[test]
    fn reported_cycles_are_real_and_bounded(
        snapshot in arb_snapshot(),
        max_depth in 1u32..6,
        three_color in any::<bool>(),
    ) {
        let store = common::memory(snapshot.entities, snapshot.relations);
        let strategy = if three_color {
            CycleStrategy::ThreeColor
        } else {
            CycleStrategy::PathTracking
        };

        let report = CycleDetector::new(&store)
            .find_cycles(max_depth, strategy)
            .expect("search");

        let mut signatures = HashSet::new();
        for cycle in &report.cycles {
            prop_assert!(cycle.edge_count() >= 1);
            prop_assert!(cycle.edge_count() <= max_depth as usize);
            prop_assert!(signatures.insert(cycle.signature()), "duplicate cycle {}", cycle);
            assert_cycle_is_real(&store, &cycle.files);
        }
    }

    #[test]
    fn tiny_step_budget_still_terminates(snapshot in arb_snapshot()) {
        let store = common::memory(snapshot.entities, snapshot.relations);
        let config = CycleConfig {
            max_steps: 3,
            ..CycleConfig::default()
        };

        let report = CycleDetector::with_config(&store, config)
            .find_circular_dependencies(8)
            .expect("search");
        prop_assert!(report.cycles.len() <= 3);
    }
}
