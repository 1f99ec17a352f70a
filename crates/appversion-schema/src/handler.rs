//! Seam for the handler-parsing collaborator.
//!
//! Route syntax is not interpreted here; a [`Handler`] only carries the raw
//! `app.yaml` entry forward to whatever deploys the version.

use crate::VersionError;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Opaque handler descriptor taken from an `app.yaml` `handlers` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Handler(Value);

impl Handler {
    pub fn new(entry: Value) -> Self {
        Self(entry)
    }

    /// The `url` pattern, if the entry has one.
    pub fn url(&self) -> Option<&str> {
        self.0.get("url").and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

/// Turns one `handlers` entry into a [`Handler`].
pub trait HandlerParser {
    fn parse(&self, entry: &Value) -> Result<Handler, VersionError>;
}

/// Accepts any mapping entry unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueHandlerParser;

impl HandlerParser for OpaqueHandlerParser {
    fn parse(&self, entry: &Value) -> Result<Handler, VersionError> {
        if !entry.is_mapping() {
            return Err(VersionError::invalid(
                "app.yaml",
                "handlers",
                "entries must be mappings",
            ));
        }
        Ok(Handler::new(entry.clone()))
    }
}
