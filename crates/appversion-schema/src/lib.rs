//! Canonical app version model and descriptor translation.
//!
//! This crate defines the schema layer: the canonical `CanonicalVersion`
//! produced from either an `app.yaml` key/value document or an
//! `appengine-web.xml` namespaced XML document, scaling normalization
//! (`scaling`), the handler collaborator seam (`handler`), and the two
//! format translators (`yaml`, `xml`). Locating descriptors on disk or in
//! archives lives in `appversion-source`.

pub mod handler;
pub mod scaling;
pub mod version;
pub mod xml;
pub mod yaml;

pub use handler::{Handler, HandlerParser, OpaqueHandlerParser};
pub use scaling::{AutomaticScaling, ManualScaling};
pub use version::{
    CanonicalVersion, ConfigFormat, DEFAULT_SERVICE, LEGACY_JAVA_RUNTIME, THREADSAFE_RUNTIMES,
};
pub use xml::{from_element_tree, XML_NAMESPACE};
pub use yaml::from_document;

use thiserror::Error;

/// Every way loading an app version can fail.
///
/// `file` is the recognized descriptor name the failure relates to
/// (`app.yaml` or `appengine-web.xml`).
#[derive(Debug, Error)]
pub enum VersionError {
    #[error("invalid {file}: missing required element '{field}'")]
    MissingField { file: &'static str, field: String },
    #[error("invalid {file}: if '{first}' is defined, '{second}' cannot be defined")]
    ConflictingFields {
        file: &'static str,
        first: String,
        second: String,
    },
    #[error("invalid {file}: '{field}' {reason}")]
    InvalidConfig {
        file: &'static str,
        field: String,
        reason: String,
    },
    #[error("unable to find app.yaml or appengine-web.xml in {location}")]
    ConfigNotFound { location: String },
    #[error("unable to read {location}: {reason}")]
    UnreadableSource { location: String, reason: String },
}

impl VersionError {
    pub(crate) fn missing(file: &'static str, field: &str) -> Self {
        Self::MissingField {
            file,
            field: field.to_owned(),
        }
    }

    pub(crate) fn conflicting(file: &'static str, first: &str, second: &str) -> Self {
        Self::ConflictingFields {
            file,
            first: first.to_owned(),
            second: second.to_owned(),
        }
    }

    pub(crate) fn invalid(file: &'static str, field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            file,
            field: field.to_owned(),
            reason: reason.into(),
        }
    }

    /// Wrap a read or top-level syntax failure for `location`.
    pub fn unreadable(location: impl Into<String>, reason: impl ToString) -> Self {
        Self::UnreadableSource {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_names_file_and_field() {
        let e = VersionError::missing("app.yaml", "runtime");
        let msg = e.to_string();
        assert!(msg.contains("app.yaml"));
        assert!(msg.contains("runtime"));
    }

    #[test]
    fn conflicting_fields_names_both() {
        let e = VersionError::conflicting("appengine-web.xml", "service", "module");
        let msg = e.to_string();
        assert!(msg.contains("service"));
        assert!(msg.contains("module"));
        assert!(msg.contains("appengine-web.xml"));
    }

    #[test]
    fn invalid_config_carries_reason() {
        let e = VersionError::invalid("app.yaml", "threadsafe", "must be a boolean");
        assert!(e.to_string().contains("must be a boolean"));
    }

    #[test]
    fn unreadable_keeps_lower_level_message() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let e = VersionError::unreadable("/srv/app.yaml", io);
        let msg = e.to_string();
        assert!(msg.contains("/srv/app.yaml"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn config_not_found_names_location() {
        let e = VersionError::ConfigNotFound {
            location: "bundle.zip".to_owned(),
        };
        assert!(e.to_string().contains("bundle.zip"));
    }
}
