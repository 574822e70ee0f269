//! # Nereus: Code-Relationship Graph Analysis
//!
//! Nereus answers structural questions about a codebase from a persisted
//! entity/relation graph produced by an external indexer:
//!
//! - **Call graphs** - what does X call, what calls X
//! - **Impact** - which files are affected if file Y changes
//! - **Cycles** - where modules import each other in a loop
//! - **Rankings** - what is over-coupled or too large
//!
//! ## Design Philosophy
//!
//! - **Read-only** - the graph is never mutated by an analysis
//! - **Bounded** - every traversal has a depth, limit or step budget, and
//!   reports `truncated` instead of silently returning partial output
//! - **Deterministic** - every ordering has an explicit tie-break
//! - **Honest failures** - "not found" is a value; "couldn't check" is an error
//!
//! ## Quick Start
//!
//! ```no_run
//! use nereus::{AnalysisConfig, Nereus};
//! use std::path::Path;
//!
//! let nereus = Nereus::open(Path::new(".nereus/graph.db"), AnalysisConfig::default())?;
//!
//! // Resolve a loosely specified identifier
//! let resolution = nereus.resolve("auth.Service.login")?;
//!
//! // What breaks if this file changes?
//! let impact = nereus.analyze_impact(["src/auth.js"])?;
//! println!("{} files affected, risk {}", impact.summary.total, impact.risk_level);
//!
//! // Import cycles of up to five files
//! let cycles = nereus.find_circular_dependencies(5)?;
//! # Ok::<(), nereus::Error>(())
//! ```

mod callgraph;
mod config;
mod cycles;
mod error;
mod impact;
mod ranking;
mod resolver;
pub mod store;
mod types;

pub use callgraph::{
    CallDirection, CallGraph, CallGraphOptions, CallGraphResult, CallGraphTraversal, CallNode,
    CallTree,
};
pub use config::{
    AnalysisConfig, CacheConfig, CycleConfig, DEFAULT_CALL_DEPTH, DEFAULT_CYCLE_DEPTH,
    ImpactConfig, MAX_CACHE_TTL_SECS, RankingConfig, RiskThresholds, TraversalConfig,
};
pub use cycles::{Cycle, CycleDetector, CycleReport, CycleStrategy};
pub use error::{Error, Result};
pub use impact::{ImpactAnalyzer, ImpactReport, ImpactSummary, RiskLevel};
pub use ranking::{
    ConnectivityRanker, Priority, RankedEntity, RefactoringMetrics, RefactoringReport,
    RefactoringResult, SizedEntity, Suggestion, SuggestionKind,
};
pub use resolver::{EntityResolver, Resolution, ResolveStrategy};
pub use store::{CachedStore, GraphStore, MemoryStore, SqliteStore};
pub use types::{
    CALL_KINDS, Degree, Entity, EntityId, EntityKind, GraphSnapshot, GraphStats, IMPORT_KINDS,
    Relation, RelationKind,
};

use std::path::Path;

/// Entry point owning a graph store and the analysis configuration.
///
/// Every analysis borrows the store; dropping `Nereus` releases it.
pub struct Nereus<S = CachedStore<SqliteStore>> {
    store: S,
    config: AnalysisConfig,
}

impl Nereus<CachedStore<SqliteStore>> {
    /// Open an existing graph database read-only, with an entity cache sized
    /// by `config.cache`.
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreUnavailable` if the database is missing or lacks
    /// the graph tables, `Error::Config` if `config` is invalid.
    pub fn open(db_path: &Path, config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let store = CachedStore::new(SqliteStore::open(db_path)?, &config.cache);
        Ok(Self { store, config })
    }
}

impl Nereus<MemoryStore> {
    /// Analyze an in-memory snapshot.
    pub fn from_snapshot(snapshot: GraphSnapshot, config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: MemoryStore::new(snapshot)?,
            config,
        })
    }
}

// Errors are store failures throughout; see `error` module docs.
#[allow(clippy::missing_errors_doc)]
impl<S: GraphStore> Nereus<S> {
    /// Wrap an already-open store.
    pub fn with_store(store: S, config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The active configuration.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    // === Components ===

    /// Identifier resolver over this store.
    pub fn resolver(&self) -> EntityResolver<'_, S> {
        EntityResolver::new(&self.store)
    }

    /// Call-tree builder over this store.
    pub fn call_graph_traversal(&self) -> CallGraphTraversal<'_, S> {
        CallGraphTraversal::new(&self.store)
    }

    /// Impact analyzer configured from `config.impact`.
    pub fn impact_analyzer(&self) -> ImpactAnalyzer<'_, S> {
        ImpactAnalyzer::with_config(&self.store, self.config.impact.clone())
    }

    /// Cycle detector configured from `config.cycles`.
    pub fn cycle_detector(&self) -> CycleDetector<'_, S> {
        CycleDetector::with_config(&self.store, self.config.cycles.clone())
    }

    /// Ranker configured from `config.ranking`.
    pub fn ranker(&self) -> ConnectivityRanker<'_, S> {
        ConnectivityRanker::with_config(&self.store, self.config.ranking)
    }

    // === Queries ===

    /// Resolve a loosely specified identifier to one entity.
    pub fn resolve(&self, identifier: &str) -> Result<Resolution> {
        self.resolver().resolve(identifier)
    }

    /// Case-insensitive substring search over entity names.
    pub fn search(
        &self,
        pattern: &str,
        kind: Option<&EntityKind>,
        limit: usize,
    ) -> Result<Vec<Entity>> {
        self.store.search(pattern, kind, limit)
    }

    /// Callee tree of an entity.
    pub fn callees(&self, id: &EntityId, depth: u32) -> Result<Option<CallTree>> {
        self.call_graph_traversal().callees(id, depth)
    }

    /// Caller tree of an entity.
    pub fn callers(&self, id: &EntityId, depth: u32) -> Result<Option<CallTree>> {
        self.call_graph_traversal().callers(id, depth)
    }

    /// Caller/callee trees of the first function named `name`.
    pub fn call_graph(&self, name: &str, options: CallGraphOptions) -> Result<CallGraphResult> {
        self.call_graph_traversal().call_graph(name, options)
    }

    /// Call-graph options with the configured default depth.
    pub fn default_call_graph_options(&self) -> CallGraphOptions {
        CallGraphOptions {
            depth: self.config.traversal.default_depth,
            direction: CallDirection::Both,
        }
    }

    /// Files affected by changing `changed_files`.
    pub fn analyze_impact<I, P>(&self, changed_files: I) -> Result<ImpactReport>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        self.impact_analyzer().analyze(changed_files)
    }

    /// Import cycles of at most `max_depth` files.
    pub fn find_circular_dependencies(&self, max_depth: u32) -> Result<CycleReport> {
        self.cycle_detector().find_circular_dependencies(max_depth)
    }

    /// Groups of mutually importing files, unbounded.
    pub fn strongly_connected_modules(&self) -> Result<Vec<Vec<String>>> {
        self.cycle_detector().strongly_connected_modules()
    }

    /// Entities with the most distinct neighbors.
    pub fn most_connected(&self, limit: usize) -> Result<Vec<RankedEntity>> {
        self.ranker().most_connected(limit)
    }

    /// Functions with the longest line span.
    pub fn largest_functions(&self, limit: usize) -> Result<Vec<SizedEntity>> {
        self.ranker().largest_functions(limit)
    }

    /// Metrics and refactoring suggestions for one entity.
    pub fn suggest_refactoring(&self, id: &EntityId) -> Result<RefactoringResult> {
        self.ranker().suggest_refactoring(id)
    }

    /// Summary counts of the graph.
    pub fn stats(&self) -> Result<GraphStats> {
        self.store.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> GraphSnapshot {
        GraphSnapshot::new(
            vec![
                Entity::new("f", "f", EntityKind::Function, "a.js").with_lines(1, 10),
                Entity::new("g", "g", EntityKind::Function, "b.js").with_lines(1, 4),
            ],
            vec![Relation::new("g", "f", RelationKind::References)],
        )
    }

    #[test]
    fn facade_wires_config_into_components() {
        let mut config = AnalysisConfig::default();
        config.impact.risk.low_max = 0;
        config.impact.risk.medium_max = 1;
        config.impact.risk.high_max = 2;

        let nereus = Nereus::from_snapshot(snapshot(), config).unwrap();
        let report = nereus.analyze_impact(["a.js"]).unwrap();

        assert_eq!(report.summary.total, 1);
        assert_eq!(report.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let mut config = AnalysisConfig::default();
        config.cache.capacity = 0;
        assert!(matches!(
            Nereus::from_snapshot(snapshot(), config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn open_missing_database_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Nereus::open(&dir.path().join("graph.db"), AnalysisConfig::default());
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
    }

    #[test]
    fn open_rejects_cache_ttl_beyond_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        SqliteStore::import(&path, &snapshot()).unwrap();

        let mut config = AnalysisConfig::default();
        config.cache.ttl_secs = u64::MAX;
        assert!(matches!(Nereus::open(&path, config), Err(Error::Config(_))));
    }

    #[test]
    fn open_uses_cached_sqlite_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        SqliteStore::import(&path, &snapshot()).unwrap();

        let nereus = Nereus::open(&path, AnalysisConfig::default()).unwrap();
        let tree = nereus.callers(&"f".into(), 3).unwrap().unwrap();

        assert!(tree.contains(&"g".into()));
        assert!(nereus.store().cached_entries() > 0);
        assert_eq!(nereus.store().inner().path(), path.as_path());
    }
}
