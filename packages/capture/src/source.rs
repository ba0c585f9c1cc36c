//! Where the base selector list comes from

use crate::{CaptureError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Selector config file format. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default)]
    pub selectors: Vec<String>,
}

/// Origin of the base selector list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectorSource {
    /// JSON file with a `selectors` array
    Config(PathBuf),

    /// Selectors passed in directly
    Direct(Vec<String>),

    #[default]
    None,
}

impl SelectorSource {
    /// Resolve the base list.
    ///
    /// An unreadable or malformed config is logged and yields an empty list.
    pub fn base_selectors(&self) -> Vec<String> {
        match self {
            SelectorSource::Config(path) => match load_config_selectors(path) {
                Ok(selectors) => {
                    info!(path = %path.display(), count = selectors.len(), "Loaded selectors from config");
                    selectors
                }
                Err(e) => {
                    error!(error = %e, "Continuing with no base selectors");
                    Vec::new()
                }
            },
            SelectorSource::Direct(selectors) => selectors.clone(),
            SelectorSource::None => Vec::new(),
        }
    }
}

/// Read the `selectors` field of a JSON config file
pub fn load_config_selectors(path: &Path) -> Result<Vec<String>> {
    let config_read = |reason: String| CaptureError::ConfigRead {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| config_read(e.to_string()))?;
    let config: SelectorConfig =
        serde_json::from_str(&content).map_err(|e| config_read(e.to_string()))?;

    Ok(config.selectors)
}
