//! CLI command implementations.

mod display;

pub mod callgraph;
pub mod cycles;
pub mod impact;
pub mod import;
pub mod ranking;
pub mod resolve;
pub mod search;
pub mod stats;

use std::path::PathBuf;

use nereus::{AnalysisConfig, Nereus};

/// Options shared by every command.
pub struct Context {
    /// Graph database path.
    pub db: PathBuf,
    /// Configuration file path (missing file means defaults).
    pub config: PathBuf,
    /// Print results as JSON instead of colored text.
    pub json: bool,
}

impl Context {
    /// Load the configuration, falling back to defaults if the file is absent.
    pub fn load_config(&self) -> Result<AnalysisConfig, nereus::Error> {
        AnalysisConfig::load_or_default(&self.config)
    }

    /// Open the graph database with the loaded configuration.
    pub fn open(&self) -> Result<Nereus, nereus::Error> {
        Nereus::open(&self.db, self.load_config()?)
    }
}
