//! Configuration for feature computation

use lidarfeat_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for [`crate::compute_features`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Maximum number of neighborhoods handed to a vectorized extractor at
    /// once. Bounds the size of the packed neighborhood arrays.
    pub batch_chunk_size: usize,
    /// Evaluate targets (serial extractors) or chunks (vectorized
    /// extractors) on the rayon thread pool
    pub parallel: bool,
    /// Recompute features already present on the target cloud
    pub overwrite: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            batch_chunk_size: 10_000,
            parallel: true,
            overwrite: false,
        }
    }
}

impl ExtractionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_chunk_size == 0 {
            return Err(Error::invalid_argument("batch_chunk_size must be positive"));
        }
        Ok(())
    }
}
