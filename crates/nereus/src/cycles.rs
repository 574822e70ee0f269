//! Import cycles among module entities.
//!
//! Only `IMPORT_KINDS` edges between module entities are followed, and a
//! cycle is reported as the closed list of files along it
//! (`f0, f1, ..., f0`).
//!
//! Two search strategies are available:
//!
//! - **Path tracking** (default): from each module root in id order, a
//!   depth-bounded DFS enumerates simple paths of files. When the next file
//!   is already on the path, the sub-path from its first occurrence is a
//!   cycle. A root is marked done once its search finishes and later searches
//!   never enter it, so every cycle within the depth bound is found from its
//!   first member in root order. The same cycle may still be reached as a
//!   sub-path from several roots; rotation-normalized signatures collapse
//!   those unless deduplication is turned off.
//! - **Three-color**: one DFS forest with unvisited/in-progress/done coloring.
//!   Every back edge yields a cycle exactly once. With a depth bound this is a
//!   heuristic: a node finished under the bound is not revisited from a
//!   shorter path, so some bounded cycles can be missed.
//!
//! Both searches run on an explicit frame stack and stop on the configured
//! step budget, which bounds the exponential worst case of path enumeration.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::config::CycleConfig;
use crate::error::{Error, Result};
use crate::store::GraphStore;
use crate::types::{Entity, EntityId, EntityKind, IMPORT_KINDS};

/// Cycle search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CycleStrategy {
    /// Per-root path enumeration; finds every cycle within the depth bound.
    #[default]
    PathTracking,
    /// Single DFS forest with node coloring; one report per back edge.
    ThreeColor,
}

impl CycleStrategy {
    /// Kebab-case name, as accepted by `FromStr` and the config file.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PathTracking => "path-tracking",
            Self::ThreeColor => "three-color",
        }
    }
}

impl fmt::Display for CycleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CycleStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "path-tracking" => Ok(Self::PathTracking),
            "three-color" => Ok(Self::ThreeColor),
            other => Err(Error::Config(format!(
                "unknown cycle strategy '{other}' (expected path-tracking or three-color)"
            ))),
        }
    }
}

/// A closed path of files: the first and last entries are the same file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Cycle {
    /// `f0, f1, ..., fn = f0`.
    pub files: Vec<String>,
}

impl Cycle {
    /// Number of import edges in the cycle.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// The open path rotated so the smallest file comes first.
    ///
    /// Rotations of the same cycle share a signature. Direction is kept:
    /// `a -> b -> a` and `b -> a -> b` match, `a -> b -> c` and `a -> c -> b`
    /// do not.
    #[must_use]
    pub fn signature(&self) -> Vec<String> {
        let open = &self.files[..self.edge_count()];
        let start = open
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.cmp(b))
            .map_or(0, |(index, _)| index);

        open[start..]
            .iter()
            .chain(open[..start].iter())
            .cloned()
            .collect()
    }

    /// The same cycle, rotated to its signature and closed again.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut files = self.signature();
        if let Some(first) = files.first().cloned() {
            files.push(first);
        }
        Self { files }
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.files.join(" -> "))
    }
}

/// Result of a cycle search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Cycles found, in discovery order.
    pub cycles: Vec<Cycle>,
    /// The search stopped on the step or root budget.
    pub truncated: bool,
    /// Number of roots a search was started from.
    pub roots_examined: usize,
    /// Strategy used.
    pub strategy: CycleStrategy,
    /// Maximum cycle length in edges.
    pub max_depth: u32,
}

/// Module entities and their import successors, loaded lazily.
struct ModuleGraph<'a, S: ?Sized> {
    store: &'a S,
    /// Module entities ordered by id
    modules: Vec<Entity>,
    index: HashMap<EntityId, usize>,
    successors: Vec<Option<Vec<usize>>>,
}

impl<'a, S: GraphStore + ?Sized> ModuleGraph<'a, S> {
    fn load(store: &'a S) -> Result<Self> {
        let mut modules = store.entities_of_kind(&EntityKind::Module)?;
        modules.sort_by(|a, b| a.id.cmp(&b.id));

        let index = modules
            .iter()
            .enumerate()
            .map(|(i, module)| (module.id.clone(), i))
            .collect();
        let successors = vec![None; modules.len()];

        Ok(Self {
            store,
            modules,
            index,
            successors,
        })
    }

    fn len(&self) -> usize {
        self.modules.len()
    }

    fn file(&self, node: usize) -> &str {
        &self.modules[node].file
    }

    /// Distinct module targets of `node`'s import edges, in store order.
    fn successors(&mut self, node: usize) -> Result<Vec<usize>> {
        if let Some(cached) = &self.successors[node] {
            return Ok(cached.clone());
        }

        let source = &self.modules[node].id;
        let mut targets = Vec::new();
        let mut seen = HashSet::new();
        for relation in self.store.relations_from(source, IMPORT_KINDS)? {
            match self.index.get(&relation.target_id) {
                Some(&target) => {
                    if seen.insert(target) {
                        targets.push(target);
                    }
                }
                None => {
                    tracing::trace!(
                        source = %source,
                        target = %relation.target_id,
                        "Skipping import of a missing or non-module entity"
                    );
                }
            }
        }

        self.successors[node] = Some(targets.clone());
        Ok(targets)
    }
}

/// One level of the explicit DFS stack.
struct Frame {
    node: usize,
    successors: Vec<usize>,
    next: usize,
}

/// Cycle bookkeeping shared by both strategies.
struct CycleSink {
    cycles: Vec<Cycle>,
    seen: HashSet<Vec<String>>,
    dedupe: bool,
    max_depth: usize,
}

impl CycleSink {
    fn emit(&mut self, files: Vec<String>) {
        let cycle = Cycle { files };
        if cycle.edge_count() == 0 || cycle.edge_count() > self.max_depth {
            return;
        }
        if self.dedupe {
            if self.seen.insert(cycle.signature()) {
                self.cycles.push(cycle.normalized());
            }
        } else {
            self.cycles.push(cycle);
        }
    }
}

/// Finds import cycles over a borrowed store.
pub struct CycleDetector<'a, S: ?Sized> {
    store: &'a S,
    config: CycleConfig,
}

impl<'a, S: GraphStore + ?Sized> CycleDetector<'a, S> {
    /// Create a detector with default budgets and strategy.
    pub fn new(store: &'a S) -> Self {
        Self::with_config(store, CycleConfig::default())
    }

    /// Create a detector with explicit settings.
    pub fn with_config(store: &'a S, config: CycleConfig) -> Self {
        Self { store, config }
    }

    /// Find cycles of at most `max_depth` edges with the configured strategy.
    ///
    /// # Errors
    ///
    /// Only store failures are errors. Hitting a budget sets `truncated`.
    pub fn find_circular_dependencies(&self, max_depth: u32) -> Result<CycleReport> {
        self.find_cycles(max_depth, self.config.strategy)
    }

    /// Find cycles of at most `max_depth` edges with an explicit strategy.
    pub fn find_cycles(&self, max_depth: u32, strategy: CycleStrategy) -> Result<CycleReport> {
        let mut graph = ModuleGraph::load(self.store)?;
        let root_count = graph.len().min(self.config.max_roots);
        let mut truncated = graph.len() > self.config.max_roots;

        let mut sink = CycleSink {
            cycles: Vec::new(),
            seen: HashSet::new(),
            dedupe: self.config.dedupe,
            max_depth: max_depth as usize,
        };

        tracing::debug!(
            modules = graph.len(),
            roots = root_count,
            max_depth,
            %strategy,
            "Searching for import cycles"
        );

        let search = Search {
            max_depth: max_depth as usize,
            max_steps: self.config.max_steps,
        };
        let (roots_examined, out_of_steps) = match strategy {
            CycleStrategy::PathTracking => search.path_tracking(&mut graph, root_count, &mut sink)?,
            CycleStrategy::ThreeColor => search.three_color(&mut graph, root_count, &mut sink)?,
        };

        if out_of_steps {
            tracing::warn!(
                max_steps = self.config.max_steps,
                roots_examined,
                "Cycle search stopped on step budget"
            );
        }
        truncated |= out_of_steps;

        tracing::info!(
            cycles = sink.cycles.len(),
            roots_examined,
            truncated,
            "Cycle search complete"
        );

        Ok(CycleReport {
            cycles: sink.cycles,
            truncated,
            roots_examined,
            strategy,
            max_depth,
        })
    }

    /// Groups of files whose modules import each other, with no depth bound.
    ///
    /// Each group is a strongly connected component of the module import
    /// graph with more than one module, or a single module importing itself.
    /// Files within a group are sorted, and groups are sorted.
    pub fn strongly_connected_modules(&self) -> Result<Vec<Vec<String>>> {
        let mut modules = ModuleGraph::load(self.store)?;
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(modules.len(), 0);
        let nodes: Vec<NodeIndex> = (0..modules.len()).map(|i| graph.add_node(i)).collect();

        for source in 0..modules.len() {
            for target in modules.successors(source)? {
                graph.add_edge(nodes[source], nodes[target], ());
            }
        }

        let mut groups: Vec<Vec<String>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&node| graph.find_edge(node, node).is_some())
            })
            .map(|component| {
                let mut files: Vec<String> = component
                    .iter()
                    .map(|&node| modules.file(graph[node]).to_string())
                    .collect();
                files.sort();
                files.dedup();
                files
            })
            .collect();
        groups.sort();

        tracing::debug!(groups = groups.len(), "Computed strongly connected modules");
        Ok(groups)
    }
}

/// Budgets of one search run.
struct Search {
    max_depth: usize,
    max_steps: u64,
}

impl Search {
    /// Returns `(roots_examined, out_of_steps)`.
    fn path_tracking<S: GraphStore + ?Sized>(
        &self,
        graph: &mut ModuleGraph<'_, S>,
        root_count: usize,
        sink: &mut CycleSink,
    ) -> Result<(usize, bool)> {
        let mut done = vec![false; graph.len()];
        let mut steps: u64 = 0;
        let mut roots_examined = 0;

        for root in 0..root_count {
            roots_examined += 1;
            let mut path: Vec<String> = vec![graph.file(root).to_string()];
            let mut frames = vec![Frame {
                node: root,
                successors: graph.successors(root)?,
                next: 0,
            }];

            while let Some(frame) = frames.last_mut() {
                let Some(&next) = frame.successors.get(frame.next) else {
                    frames.pop();
                    path.pop();
                    continue;
                };
                frame.next += 1;

                steps += 1;
                if steps > self.max_steps {
                    return Ok((roots_examined, true));
                }

                if done[next] {
                    continue;
                }

                let next_file = graph.file(next);
                if let Some(start) = path.iter().position(|file| file == next_file) {
                    let mut files = path[start..].to_vec();
                    files.push(next_file.to_string());
                    sink.emit(files);
                } else if path.len() < self.max_depth {
                    path.push(next_file.to_string());
                    frames.push(Frame {
                        node: next,
                        successors: graph.successors(next)?,
                        next: 0,
                    });
                }
            }

            done[root] = true;
        }

        Ok((roots_examined, false))
    }

    /// Returns `(roots_examined, out_of_steps)`.
    fn three_color<S: GraphStore + ?Sized>(
        &self,
        graph: &mut ModuleGraph<'_, S>,
        root_count: usize,
        sink: &mut CycleSink,
    ) -> Result<(usize, bool)> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut color = vec![Color::White; graph.len()];
        let mut steps: u64 = 0;
        let mut roots_examined = 0;

        for root in 0..root_count {
            if color[root] != Color::White {
                continue;
            }
            roots_examined += 1;
            color[root] = Color::Gray;
            let mut frames = vec![Frame {
                node: root,
                successors: graph.successors(root)?,
                next: 0,
            }];

            while let Some(frame) = frames.last_mut() {
                let Some(&next) = frame.successors.get(frame.next) else {
                    color[frame.node] = Color::Black;
                    frames.pop();
                    continue;
                };
                frame.next += 1;

                steps += 1;
                if steps > self.max_steps {
                    return Ok((roots_examined, true));
                }

                match color[next] {
                    Color::Gray => {
                        if let Some(start) = frames.iter().position(|f| f.node == next) {
                            let mut files: Vec<String> = frames[start..]
                                .iter()
                                .map(|f| graph.file(f.node).to_string())
                                .collect();
                            files.push(graph.file(next).to_string());
                            sink.emit(files);
                        }
                    }
                    Color::White if frames.len() < self.max_depth => {
                        color[next] = Color::Gray;
                        frames.push(Frame {
                            node: next,
                            successors: graph.successors(next)?,
                            next: 0,
                        });
                    }
                    Color::White | Color::Black => {}
                }
            }
        }

        Ok((roots_examined, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{GraphSnapshot, Relation, RelationKind};
    use rstest::rstest;

    fn module(id: &str) -> Entity {
        Entity::new(id, id, EntityKind::Module, format!("{id}.py"))
    }

    fn imports(from: &str, to: &str) -> Relation {
        Relation::new(from, to, RelationKind::Imports)
    }

    fn triangle() -> MemoryStore {
        MemoryStore::new(GraphSnapshot::new(
            vec![module("a"), module("b"), module("c")],
            vec![imports("a", "b"), imports("b", "c"), imports("c", "a")],
        ))
        .unwrap()
    }

    #[test]
    fn signature_is_rotation_invariant() {
        let a = Cycle {
            files: vec!["b".into(), "c".into(), "a".into(), "b".into()],
        };
        let b = Cycle {
            files: vec!["a".into(), "b".into(), "c".into(), "a".into()],
        };
        assert_eq!(a.signature(), b.signature());
        assert_eq!(a.normalized(), b);
        assert_eq!(a.edge_count(), 3);
    }

    #[test]
    fn signature_keeps_direction() {
        let forward = Cycle {
            files: vec!["a".into(), "b".into(), "c".into(), "a".into()],
        };
        let backward = Cycle {
            files: vec!["a".into(), "c".into(), "b".into(), "a".into()],
        };
        assert_ne!(forward.signature(), backward.signature());
    }

    #[rstest]
    #[case::too_shallow(1, 0)]
    #[case::still_too_shallow(2, 0)]
    #[case::exact(3, 1)]
    #[case::generous(10, 1)]
    fn triangle_needs_depth_three(#[case] max_depth: u32, #[case] expected: usize) {
        let store = triangle();
        let report = CycleDetector::new(&store)
            .find_circular_dependencies(max_depth)
            .unwrap();

        assert_eq!(report.cycles.len(), expected);
        if expected == 1 {
            assert_eq!(report.cycles[0].files, vec!["a.py", "b.py", "c.py", "a.py"]);
        }
    }

    #[test]
    fn without_dedupe_duplicates_are_kept() {
        // b <-> c is found as a sub-path from root a, then again from root b
        let store = MemoryStore::new(GraphSnapshot::new(
            vec![module("a"), module("b"), module("c")],
            vec![
                imports("a", "b"),
                imports("b", "a"),
                imports("c", "b"),
                imports("b", "c"),
            ],
        ))
        .unwrap();

        let raw = CycleDetector::with_config(
            &store,
            CycleConfig {
                dedupe: false,
                ..CycleConfig::default()
            },
        )
        .find_circular_dependencies(5)
        .unwrap();
        let deduped = CycleDetector::new(&store)
            .find_circular_dependencies(5)
            .unwrap();

        assert!(raw.cycles.len() > deduped.cycles.len());
        let signatures: HashSet<Vec<String>> =
            deduped.cycles.iter().map(Cycle::signature).collect();
        assert_eq!(signatures.len(), deduped.cycles.len());
    }

    #[test]
    fn self_import_is_a_one_edge_cycle() {
        let store = MemoryStore::new(GraphSnapshot::new(
            vec![module("a")],
            vec![imports("a", "a")],
        ))
        .unwrap();

        let report = CycleDetector::new(&store)
            .find_circular_dependencies(1)
            .unwrap();
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(report.cycles[0].files, vec!["a.py", "a.py"]);

        let none = CycleDetector::new(&store)
            .find_circular_dependencies(0)
            .unwrap();
        assert!(none.cycles.is_empty());
    }

    #[test]
    fn non_module_and_non_import_edges_are_ignored() {
        let store = MemoryStore::new(GraphSnapshot::new(
            vec![
                module("a"),
                module("b"),
                Entity::new("f", "f", EntityKind::Function, "b.py"),
            ],
            vec![
                imports("a", "b"),
                Relation::new("b", "a", RelationKind::Calls),
                imports("b", "f"),
                imports("b", "gone"),
            ],
        ))
        .unwrap();

        let report = CycleDetector::new(&store)
            .find_circular_dependencies(5)
            .unwrap();
        assert!(report.cycles.is_empty());
    }

    #[test]
    fn three_color_reports_back_edges_once() {
        let store = triangle();
        let report = CycleDetector::new(&store)
            .find_cycles(5, CycleStrategy::ThreeColor)
            .unwrap();

        assert_eq!(report.strategy, CycleStrategy::ThreeColor);
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(report.roots_examined, 1);
    }

    #[test]
    fn step_budget_truncates() {
        let store = triangle();
        let report = CycleDetector::with_config(
            &store,
            CycleConfig {
                max_steps: 1,
                ..CycleConfig::default()
            },
        )
        .find_circular_dependencies(5)
        .unwrap();

        assert!(report.truncated);
        assert!(report.cycles.is_empty());
    }

    #[test]
    fn root_budget_truncates() {
        let store = triangle();
        let report = CycleDetector::with_config(
            &store,
            CycleConfig {
                max_roots: 2,
                ..CycleConfig::default()
            },
        )
        .find_circular_dependencies(5)
        .unwrap();

        assert!(report.truncated);
        assert_eq!(report.roots_examined, 2);
        assert_eq!(report.cycles.len(), 1, "root a still finds the triangle");
    }

    #[test]
    fn strongly_connected_groups() {
        let store = MemoryStore::new(GraphSnapshot::new(
            vec![module("a"), module("b"), module("c"), module("d"), module("e")],
            vec![
                imports("a", "b"),
                imports("b", "a"),
                imports("c", "d"),
                imports("e", "e"),
            ],
        ))
        .unwrap();

        let groups = CycleDetector::new(&store)
            .strongly_connected_modules()
            .unwrap();
        assert_eq!(
            groups,
            vec![
                vec!["a.py".to_string(), "b.py".to_string()],
                vec!["e.py".to_string()],
            ]
        );
    }

    #[rstest]
    #[case("path-tracking", CycleStrategy::PathTracking)]
    #[case("three-color", CycleStrategy::ThreeColor)]
    fn strategy_parses(#[case] input: &str, #[case] expected: CycleStrategy) {
        assert_eq!(input.parse::<CycleStrategy>().unwrap(), expected);
        assert_eq!(expected.to_string(), input);
    }
}
