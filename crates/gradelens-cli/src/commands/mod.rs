//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use gradelens_core::engine::Analyzer;
use gradelens_core::scoring::{Jitter, SeededJitter};
use gradelens_providers::{create_client, load_config_from, GradelensConfig};

pub mod analyze;
pub mod compare;
pub mod ingest;
pub mod init;
pub mod stats;
pub mod validate;

/// Flags shared by the commands that run the analysis pipeline.
pub struct PipelineOptions {
    pub config: Option<PathBuf>,
    pub seed: Option<u64>,
    pub offline: bool,
}

impl PipelineOptions {
    /// Load config and build the analyzer it describes.
    pub fn build(&self) -> Result<(Analyzer, GradelensConfig)> {
        let config = load_config_from(self.config.as_deref())?;

        let jitter: Arc<dyn Jitter> = match self.seed.or(config.analysis.seed) {
            Some(seed) => Arc::new(SeededJitter::with_seed(seed)),
            None => Arc::new(SeededJitter::from_entropy()),
        };
        let client = if self.offline {
            None
        } else {
            create_client(&config)
        };

        let analyzer = Analyzer::new(client, config.remote_settings(), jitter);
        Ok((analyzer, config))
    }
}

pub(crate) fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
