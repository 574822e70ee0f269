//! Analysis configuration.
//!
//! Every threshold the analyses apply is a policy constant, not law, so all of
//! them live here and can be overridden from a YAML file:
//!
//! ```yaml
//! traversal:
//!   default-depth: 3
//! impact:
//!   risk:
//!     low-max: 20
//!     medium-max: 50
//!     high-max: 100
//!   test-markers: [test, spec, __tests__]
//! cycles:
//!   default-max-depth: 5
//!   strategy: path-tracking
//! ranking:
//!   extract-method-lines: 50
//! cache:
//!   capacity: 10000
//!   ttl-secs: 300
//! ```
//!
//! Missing sections and fields fall back to their defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cycles::CycleStrategy;
use crate::error::{Error, Result};
use crate::impact::RiskLevel;

/// Default depth for callee/caller trees.
pub const DEFAULT_CALL_DEPTH: u32 = 3;

/// Default hop bound for cycle detection.
pub const DEFAULT_CYCLE_DEPTH: u32 = 5;

/// Longest accepted cache time-to-live (one year).
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Top-level configuration for all analyses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AnalysisConfig {
    /// Call-graph traversal settings.
    pub traversal: TraversalConfig,
    /// Impact analysis settings.
    pub impact: ImpactConfig,
    /// Cycle detection settings.
    pub cycles: CycleConfig,
    /// Connectivity ranking settings.
    pub ranking: RankingConfig,
    /// Entity cache settings.
    pub cache: CacheConfig,
}

/// Call-graph traversal settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TraversalConfig {
    /// Depth used when the caller does not give one.
    pub default_depth: u32,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            default_depth: DEFAULT_CALL_DEPTH,
        }
    }
}

/// Impact analysis settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ImpactConfig {
    /// Buckets mapping affected-file counts to a risk level.
    pub risk: RiskThresholds,
    /// Path fragments (case-insensitive) marking a file as a test.
    pub test_markers: Vec<String>,
    /// Stop the transitive phase once this many files are affected.
    pub max_files: Option<usize>,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            risk: RiskThresholds::default(),
            test_markers: vec![
                "test".to_string(),
                "spec".to_string(),
                "__tests__".to_string(),
            ],
            max_files: None,
        }
    }
}

/// Inclusive upper bounds of the low/medium/high risk buckets.
///
/// Anything above `high_max` is critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RiskThresholds {
    /// Largest count still rated low.
    pub low_max: usize,
    /// Largest count still rated medium.
    pub medium_max: usize,
    /// Largest count still rated high.
    pub high_max: usize,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low_max: 20,
            medium_max: 50,
            high_max: 100,
        }
    }
}

impl RiskThresholds {
    /// Bucket an affected-file count.
    #[must_use]
    pub fn classify(&self, affected: usize) -> RiskLevel {
        if affected <= self.low_max {
            RiskLevel::Low
        } else if affected <= self.medium_max {
            RiskLevel::Medium
        } else if affected <= self.high_max {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }
}

/// Cycle detection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CycleConfig {
    /// Hop bound used when the caller does not give one.
    pub default_max_depth: u32,
    /// Maximum number of module entities used as DFS roots.
    pub max_roots: usize,
    /// Maximum number of edges examined in one detection run.
    pub max_steps: u64,
    /// Collapse rotations of the same cycle into one report.
    pub dedupe: bool,
    /// Search strategy.
    pub strategy: CycleStrategy,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            default_max_depth: DEFAULT_CYCLE_DEPTH,
            max_roots: 1_000,
            max_steps: 1_000_000,
            dedupe: true,
            strategy: CycleStrategy::default(),
        }
    }
}

/// Refactoring suggestion thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RankingConfig {
    /// Line span above which "extract method" is suggested.
    pub extract_method_lines: u32,
    /// Incoming degree above which "reduce coupling" is suggested.
    pub max_incoming: usize,
    /// Outgoing degree above which "single responsibility" is suggested.
    pub max_outgoing: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            extract_method_lines: 50,
            max_incoming: 10,
            max_outgoing: 15,
        }
    }
}

/// Entity cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Maximum number of cached entity lookups.
    pub capacity: u64,
    /// Seconds a cached lookup stays valid.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            ttl_secs: 300,
        }
    }
}

impl CacheConfig {
    /// Time-to-live as a `Duration`, capped at `MAX_CACHE_TTL_SECS`.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs.min(MAX_CACHE_TTL_SECS))
    }
}

impl AnalysisConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read config {}: {e}", path.display()),
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a YAML file, using defaults if it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let risk = &self.impact.risk;
        if !(risk.low_max < risk.medium_max && risk.medium_max < risk.high_max) {
            return Err(Error::Config(format!(
                "risk thresholds must be strictly increasing (got low {}, medium {}, high {})",
                risk.low_max, risk.medium_max, risk.high_max
            )));
        }

        if self.cache.capacity == 0 {
            return Err(Error::Config("cache capacity must be at least 1".to_string()));
        }

        if self.cache.ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(Error::Config(format!(
                "cache.ttl-secs must be at most {MAX_CACHE_TTL_SECS} (got {})",
                self.cache.ttl_secs
            )));
        }

        if self.cycles.max_roots == 0 {
            return Err(Error::Config("cycles.max-roots must be at least 1".to_string()));
        }

        if self.impact.max_files == Some(0) {
            return Err(Error::Config("impact.max-files must be at least 1".to_string()));
        }

        Ok(())
    }
}
