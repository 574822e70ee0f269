//! Bounded, cycle-safe callee/caller trees.
//!
//! Only `CALL_KINDS` edges between function-typed entities are followed.
//! One visited-set spans the whole traversal: an entity is marked the moment
//! it is placed in the tree and is never placed or expanded again, so the
//! result is a tree even on cyclic graphs. A shared descendant shows up once,
//! under whichever parent reached it first.
//!
//! Trees are built with an explicit work stack over a node arena, so an
//! adversarial depth cannot exhaust the call stack.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::DEFAULT_CALL_DEPTH;
use crate::error::{Error, Result};
use crate::resolver::EntityResolver;
use crate::store::GraphStore;
use crate::types::{CALL_KINDS, Entity, EntityId};

/// Which trees `call_graph` builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    /// Only the caller tree.
    Callers,
    /// Only the callee tree.
    Callees,
    /// Both trees.
    #[default]
    Both,
}

impl CallDirection {
    fn includes_callers(self) -> bool {
        matches!(self, Self::Callers | Self::Both)
    }

    fn includes_callees(self) -> bool {
        matches!(self, Self::Callees | Self::Both)
    }
}

/// Options for `CallGraphTraversal::call_graph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallGraphOptions {
    /// Maximum tree depth (0 = root only).
    pub depth: u32,
    /// Which trees to build.
    pub direction: CallDirection,
}

impl Default for CallGraphOptions {
    fn default() -> Self {
        Self {
            depth: DEFAULT_CALL_DEPTH,
            direction: CallDirection::default(),
        }
    }
}

/// One entity in a call tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallNode {
    /// The function at this position.
    pub entity: Entity,
    /// Callees (or callers) placed under it.
    pub children: Vec<CallNode>,
}

/// A callee or caller tree rooted at one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallTree {
    /// The root function.
    pub root: CallNode,
    /// A node at the depth limit still had unvisited callable neighbors.
    pub truncated: bool,
    /// Number of nodes in the tree, root included.
    pub node_count: usize,
}

impl CallTree {
    /// All entities in the tree, in pre-order.
    #[must_use]
    pub fn entities(&self) -> Vec<&Entity> {
        let mut out = Vec::with_capacity(self.node_count);
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            out.push(&node.entity);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Whether `id` appears anywhere in the tree.
    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities().iter().any(|e| &e.id == id)
    }
}

/// Both trees around one function, as returned by `call_graph`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallGraph {
    /// The resolved function.
    pub entity: Entity,
    /// Caller tree, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callers: Option<CallTree>,
    /// Callee tree, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callees: Option<CallTree>,
}

/// Outcome of `call_graph`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallGraphResult {
    /// A function with that name exists.
    Found(CallGraph),
    /// No function-typed entity has that exact name.
    NotFound {
        /// The requested name.
        name: String,
    },
}

/// Edge direction for one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    Callees,
    Callers,
}

/// Arena slot while a tree is being built.
struct PendingNode {
    entity: Entity,
    depth: u32,
    children: Vec<usize>,
}

/// Builds call trees over a borrowed store.
pub struct CallGraphTraversal<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: GraphStore + ?Sized> CallGraphTraversal<'a, S> {
    /// Create a traversal over `store`.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Functions reachable from `id` over outgoing call edges.
    ///
    /// Returns `Ok(None)` if `id` is not in the store.
    pub fn callees(&self, id: &EntityId, depth: u32) -> Result<Option<CallTree>> {
        self.tree_for(id, depth, Walk::Callees)
    }

    /// Functions reaching `id` over incoming call edges.
    ///
    /// Returns `Ok(None)` if `id` is not in the store.
    pub fn callers(&self, id: &EntityId, depth: u32) -> Result<Option<CallTree>> {
        self.tree_for(id, depth, Walk::Callers)
    }

    /// Resolve the first function named `name` and build the requested trees.
    pub fn call_graph(&self, name: &str, options: CallGraphOptions) -> Result<CallGraphResult> {
        let Some(entity) = EntityResolver::new(self.store).resolve_function(name)? else {
            tracing::debug!(name, "No function with this name");
            return Ok(CallGraphResult::NotFound {
                name: name.to_string(),
            });
        };

        let callers = if options.direction.includes_callers() {
            Some(self.build(entity.clone(), options.depth, Walk::Callers)?)
        } else {
            None
        };
        let callees = if options.direction.includes_callees() {
            Some(self.build(entity.clone(), options.depth, Walk::Callees)?)
        } else {
            None
        };

        Ok(CallGraphResult::Found(CallGraph {
            entity,
            callers,
            callees,
        }))
    }

    fn tree_for(&self, id: &EntityId, depth: u32, walk: Walk) -> Result<Option<CallTree>> {
        match self.store.entity(id)? {
            Some(root) => Ok(Some(self.build(root, depth, walk)?)),
            None => Ok(None),
        }
    }

    /// Callable neighbors of `id` in walk direction, in store order.
    ///
    /// Dangling endpoints and non-callable entities are skipped.
    fn neighbors(&self, id: &EntityId, walk: Walk) -> Result<Vec<Entity>> {
        let relations = match walk {
            Walk::Callees => self.store.relations_from(id, CALL_KINDS)?,
            Walk::Callers => self.store.relations_to(id, CALL_KINDS)?,
        };

        let mut neighbors = Vec::with_capacity(relations.len());
        let mut seen: HashSet<EntityId> = HashSet::new();
        for relation in relations {
            let other = match walk {
                Walk::Callees => relation.target_id,
                Walk::Callers => relation.source_id,
            };
            if !seen.insert(other.clone()) {
                continue;
            }
            match self.store.entity(&other)? {
                Some(entity) if entity.is_callable() => neighbors.push(entity),
                Some(_) => {}
                None => {
                    tracing::debug!(from = %id, missing = %other, "Skipping dangling call edge");
                }
            }
        }
        Ok(neighbors)
    }

    fn build(&self, root: Entity, max_depth: u32, walk: Walk) -> Result<CallTree> {
        let mut visited: HashSet<EntityId> = HashSet::from([root.id.clone()]);
        let mut arena = vec![PendingNode {
            entity: root,
            depth: 0,
            children: Vec::new(),
        }];
        let mut stack = vec![0usize];
        let mut truncated = false;

        while let Some(index) = stack.pop() {
            let id = arena[index].entity.id.clone();
            let depth = arena[index].depth;
            let neighbors = self.neighbors(&id, walk)?;

            if depth >= max_depth {
                if neighbors.iter().any(|n| !visited.contains(&n.id)) {
                    truncated = true;
                }
                continue;
            }

            let mut children = Vec::new();
            for neighbor in neighbors {
                if !visited.insert(neighbor.id.clone()) {
                    continue;
                }
                children.push(arena.len());
                arena.push(PendingNode {
                    entity: neighbor,
                    depth: depth + 1,
                    children: Vec::new(),
                });
            }

            // Reverse so the first child is expanded first
            stack.extend(children.iter().rev());
            arena[index].children = children;
        }

        let node_count = arena.len();
        if truncated {
            tracing::debug!(?walk, max_depth, node_count, "Call tree truncated at depth limit");
        }

        let root = assemble(arena)
            .ok_or_else(|| Error::Internal("call tree arena lost its root".to_string()))?;

        Ok(CallTree {
            root,
            truncated,
            node_count,
        })
    }
}

/// Turn the arena into a nested tree.
///
/// Children always sit at higher indices than their parent, so walking the
/// arena backwards finishes every subtree before its parent needs it.
fn assemble(arena: Vec<PendingNode>) -> Option<CallNode> {
    let mut child_lists: Vec<Vec<usize>> = Vec::with_capacity(arena.len());
    let mut built: Vec<Option<CallNode>> = Vec::with_capacity(arena.len());
    for node in arena {
        child_lists.push(node.children);
        built.push(Some(CallNode {
            entity: node.entity,
            children: Vec::new(),
        }));
    }

    for index in (0..built.len()).rev() {
        let children: Vec<CallNode> = child_lists[index]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        if let Some(node) = built[index].as_mut() {
            node.children = children;
        }
    }

    built.into_iter().next().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{EntityKind, GraphSnapshot, Relation, RelationKind};

    fn func(id: &str) -> Entity {
        Entity::new(id, id, EntityKind::Function, format!("src/{id}.ts"))
    }

    fn calls(from: &str, to: &str) -> Relation {
        Relation::new(from, to, RelationKind::Calls)
    }

    fn ids(node: &CallNode) -> Vec<&str> {
        node.children.iter().map(|c| c.entity.id.as_str()).collect()
    }

    #[test]
    fn mutual_recursion_is_not_re_expanded() {
        let store = MemoryStore::new(GraphSnapshot::new(
            vec![func("A"), func("B")],
            vec![calls("A", "B"), calls("B", "A")],
        ))
        .unwrap();

        let tree = CallGraphTraversal::new(&store)
            .callees(&"A".into(), 5)
            .unwrap()
            .unwrap();

        assert_eq!(ids(&tree.root), vec!["B"]);
        assert!(tree.root.children[0].children.is_empty());
        assert_eq!(tree.node_count, 2);
        assert!(!tree.truncated);
    }

    #[test]
    fn depth_zero_is_root_only() {
        let store = MemoryStore::new(GraphSnapshot::new(
            vec![func("A"), func("B")],
            vec![calls("A", "B")],
        ))
        .unwrap();

        let tree = CallGraphTraversal::new(&store)
            .callees(&"A".into(), 0)
            .unwrap()
            .unwrap();

        assert!(tree.root.children.is_empty());
        assert!(tree.truncated, "B was cut off by the depth limit");
    }

    #[test]
    fn unknown_root_is_none() {
        let store = MemoryStore::new(GraphSnapshot::default()).unwrap();
        let traversal = CallGraphTraversal::new(&store);
        assert!(traversal.callees(&"ghost".into(), 3).unwrap().is_none());
        assert!(traversal.callers(&"ghost".into(), 3).unwrap().is_none());
    }

    #[test]
    fn non_call_edges_and_non_functions_are_ignored() {
        let store = MemoryStore::new(GraphSnapshot::new(
            vec![
                func("main"),
                func("helper"),
                Entity::new("Config", "Config", EntityKind::Class, "src/config.ts"),
            ],
            vec![
                calls("main", "Config"),
                Relation::new("main", "helper", RelationKind::Imports),
                calls("main", "vanished"),
            ],
        ))
        .unwrap();

        let tree = CallGraphTraversal::new(&store)
            .callees(&"main".into(), 3)
            .unwrap()
            .unwrap();

        assert!(tree.root.children.is_empty());
        assert_eq!(tree.node_count, 1);
    }

    #[test]
    fn callers_follow_incoming_edges() {
        let store = MemoryStore::new(GraphSnapshot::new(
            vec![func("a"), func("b"), func("c")],
            vec![
                calls("a", "c"),
                Relation::new("b", "c", RelationKind::Invokes),
            ],
        ))
        .unwrap();

        let tree = CallGraphTraversal::new(&store)
            .callers(&"c".into(), 1)
            .unwrap()
            .unwrap();

        assert_eq!(ids(&tree.root), vec!["a", "b"]);
    }

    #[test]
    fn call_graph_by_name() {
        let store = MemoryStore::new(GraphSnapshot::new(
            vec![
                Entity::new("cls", "handle", EntityKind::Class, "src/a.ts"),
                func("handle"),
                func("caller"),
            ],
            vec![calls("caller", "handle")],
        ))
        .unwrap();
        let traversal = CallGraphTraversal::new(&store);

        let CallGraphResult::Found(graph) = traversal
            .call_graph("handle", CallGraphOptions::default())
            .unwrap()
        else {
            panic!("handle should resolve to the function");
        };
        assert_eq!(graph.entity.id.as_str(), "handle");
        assert!(graph.callers.as_ref().unwrap().contains(&"caller".into()));
        assert_eq!(graph.callees.as_ref().unwrap().node_count, 1);

        let only_callers = traversal
            .call_graph(
                "handle",
                CallGraphOptions {
                    depth: 2,
                    direction: CallDirection::Callers,
                },
            )
            .unwrap();
        let CallGraphResult::Found(graph) = only_callers else {
            panic!("expected a match");
        };
        assert!(graph.callees.is_none());

        assert_eq!(
            traversal
                .call_graph("nope", CallGraphOptions::default())
                .unwrap(),
            CallGraphResult::NotFound {
                name: "nope".to_string()
            }
        );
    }
}
