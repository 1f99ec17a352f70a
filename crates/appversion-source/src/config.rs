use appversion_schema::{VersionError, DEFAULT_SERVICE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default upper bound on descriptor size: 1 MiB.
pub const DEFAULT_MAX_DESCRIPTOR_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Service name used when the descriptor names neither `service` nor `module`.
    pub default_service: String,
    /// Descriptors larger than this are rejected as unreadable.
    pub max_descriptor_bytes: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            default_service: DEFAULT_SERVICE.to_owned(),
            max_descriptor_bytes: DEFAULT_MAX_DESCRIPTOR_BYTES,
        }
    }
}

impl LoaderConfig {
    #[must_use]
    pub fn with_default_service(mut self, service: &str) -> Self {
        service.clone_into(&mut self.default_service);
        self
    }

    #[must_use]
    pub fn with_max_descriptor_bytes(mut self, limit: u64) -> Self {
        self.max_descriptor_bytes = limit;
        self
    }

    /// Load a config from a JSON file.
    pub fn load(path: &Path) -> Result<Self, VersionError> {
        let location = path.display().to_string();
        let content =
            std::fs::read_to_string(path).map_err(|e| VersionError::unreadable(&location, e))?;
        serde_json::from_str(&content)
            .map_err(|e| VersionError::unreadable(location, format!("invalid loader config: {e}")))
    }
}
