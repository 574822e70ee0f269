//! File-level impact analysis.
//!
//! Given a set of changed files, finds every file that depends on them:
//!
//! 1. **Direct**: files holding an entity with any relation into an entity of
//!    a changed file.
//! 2. **Transitive**: a worklist fixed point over the same reverse-dependency
//!    step, seeded with the direct files.
//!
//! The visited-set only grows and the file universe is finite, so the
//! worklist always drains. Changed files are never reported as affected.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;

use serde::Serialize;

use crate::config::ImpactConfig;
use crate::error::Result;
use crate::store::GraphStore;

/// Coarse blast-radius bucket of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Few dependents.
    Low,
    /// A noticeable number of dependents.
    Medium,
    /// Many dependents.
    High,
    /// More dependents than the high bucket allows.
    Critical,
}

impl RiskLevel {
    /// Lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts of an impact report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImpactSummary {
    /// Changed files analyzed.
    pub changed: usize,
    /// Directly affected files.
    pub direct: usize,
    /// Transitively affected files.
    pub transitive: usize,
    /// Affected files that look like tests.
    pub tests: usize,
    /// `direct + transitive`.
    pub total: usize,
}

/// Files affected by a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpactReport {
    /// The normalized input set.
    pub changed_files: BTreeSet<String>,
    /// Files with a relation into a changed file.
    pub directly_affected: BTreeSet<String>,
    /// Files reached only through other affected files.
    pub transitively_affected: BTreeSet<String>,
    /// Affected files whose path contains a test marker.
    pub affected_tests: BTreeSet<String>,
    /// Bucket of `direct + transitive`.
    pub risk_level: RiskLevel,
    /// Set sizes.
    pub summary: ImpactSummary,
    /// The transitive phase stopped on the file budget.
    pub truncated: bool,
}

impl ImpactReport {
    /// Every affected file, direct and transitive.
    pub fn all_affected(&self) -> impl Iterator<Item = &String> {
        self.directly_affected
            .iter()
            .chain(self.transitively_affected.iter())
    }
}

/// Computes impact reports over a borrowed store.
pub struct ImpactAnalyzer<'a, S: ?Sized> {
    store: &'a S,
    config: ImpactConfig,
}

impl<'a, S: GraphStore + ?Sized> ImpactAnalyzer<'a, S> {
    /// Create an analyzer with default thresholds and markers.
    pub fn new(store: &'a S) -> Self {
        Self::with_config(store, ImpactConfig::default())
    }

    /// Create an analyzer with explicit settings.
    pub fn with_config(store: &'a S, config: ImpactConfig) -> Self {
        Self { store, config }
    }

    /// Compute the files affected by changing `changed_files`.
    ///
    /// Paths are repo-relative; leading `./` and backslashes are normalized.
    ///
    /// # Errors
    ///
    /// Store failures abort the analysis. An unknown file is not an error, it
    /// simply affects nothing.
    pub fn analyze<I, P>(&self, changed_files: I) -> Result<ImpactReport>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let changed: BTreeSet<String> = changed_files
            .into_iter()
            .filter_map(|path| normalize_path(path.as_ref()))
            .collect();

        tracing::debug!(changed = changed.len(), "Starting impact analysis");

        let mut directly_affected = BTreeSet::new();
        for file in &changed {
            for dependent in self.dependent_files(file)? {
                if !changed.contains(&dependent) {
                    directly_affected.insert(dependent);
                }
            }
        }

        let mut visited: HashSet<String> = changed.iter().cloned().collect();
        visited.extend(directly_affected.iter().cloned());

        let mut transitively_affected = BTreeSet::new();
        let mut worklist: VecDeque<String> = directly_affected.iter().cloned().collect();
        let mut truncated = false;

        while let Some(file) = worklist.pop_front() {
            if self.budget_reached(directly_affected.len() + transitively_affected.len()) {
                tracing::warn!(
                    max_files = ?self.config.max_files,
                    pending = worklist.len() + 1,
                    "Impact analysis stopped on file budget"
                );
                truncated = true;
                break;
            }

            for dependent in self.dependent_files(&file)? {
                if visited.insert(dependent.clone()) {
                    transitively_affected.insert(dependent.clone());
                    worklist.push_back(dependent);
                }
            }
        }

        let affected_tests: BTreeSet<String> = directly_affected
            .iter()
            .chain(transitively_affected.iter())
            .filter(|path| self.is_test_path(path))
            .cloned()
            .collect();

        let total = directly_affected.len() + transitively_affected.len();
        let risk_level = self.config.risk.classify(total);
        let summary = ImpactSummary {
            changed: changed.len(),
            direct: directly_affected.len(),
            transitive: transitively_affected.len(),
            tests: affected_tests.len(),
            total,
        };

        tracing::info!(
            changed = summary.changed,
            direct = summary.direct,
            transitive = summary.transitive,
            risk = %risk_level,
            truncated,
            "Impact analysis complete"
        );

        Ok(ImpactReport {
            changed_files: changed,
            directly_affected,
            transitively_affected,
            affected_tests,
            risk_level,
            summary,
            truncated,
        })
    }

    /// Files holding an entity with a relation into an entity of `file`.
    ///
    /// May include `file` itself; callers filter through their visited-set.
    fn dependent_files(&self, file: &str) -> Result<BTreeSet<String>> {
        let mut files = BTreeSet::new();
        for entity in self.store.entities_in_file(file)? {
            for relation in self.store.relations_to(&entity.id, &[])? {
                match self.store.entity(&relation.source_id)? {
                    Some(source) => {
                        files.insert(source.file);
                    }
                    None => {
                        tracing::debug!(
                            target_id = %entity.id,
                            missing = %relation.source_id,
                            "Skipping dangling relation"
                        );
                    }
                }
            }
        }
        tracing::trace!(file, dependents = files.len(), "Collected dependent files");
        Ok(files)
    }

    fn budget_reached(&self, affected: usize) -> bool {
        self.config.max_files.is_some_and(|max| affected >= max)
    }

    fn is_test_path(&self, path: &str) -> bool {
        let lower = path.to_lowercase();
        self.config
            .test_markers
            .iter()
            .any(|marker| lower.contains(&marker.to_lowercase()))
    }
}

/// Normalize a changed-file path: trim, forward slashes, no leading `./`.
///
/// Returns `None` for paths that are empty after normalization.
fn normalize_path(path: &str) -> Option<String> {
    let unified = path.trim().replace('\\', "/");
    let mut rest = unified.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    (!rest.is_empty()).then(|| rest.to_string())
}
