use crate::handler::Handler;
use crate::scaling::{AutomaticScaling, ManualScaling};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Service name used when a descriptor names neither `service` nor `module`.
pub const DEFAULT_SERVICE: &str = "default";

/// Runtime identifier that older descriptors use for Java; rewritten to `java`.
pub const LEGACY_JAVA_RUNTIME: &str = "java7";

/// Runtimes whose descriptors must state `threadsafe` explicitly.
pub const THREADSAFE_RUNTIMES: &[&str] = &["python27", "java"];

/// Which descriptor format a version was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigFormat {
    #[serde(rename = "app.yaml")]
    AppYaml,
    #[serde(rename = "appengine-web.xml")]
    AppEngineWebXml,
}

impl ConfigFormat {
    /// Search order used for directories and archives.
    pub const SEARCH_ORDER: [Self; 2] = [Self::AppYaml, Self::AppEngineWebXml];

    /// The literal file name matched during directory and archive search.
    pub fn file_name(self) -> &'static str {
        match self {
            ConfigFormat::AppYaml => "app.yaml",
            ConfigFormat::AppEngineWebXml => "appengine-web.xml",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::SEARCH_ORDER
            .into_iter()
            .find(|format| format.file_name() == name)
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Canonical, format-independent representation of an app version.
///
/// Built once by a translator and handed to the caller. Either both scaling
/// fields are `None` or exactly one is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalVersion {
    pub runtime: String,
    pub config_format: ConfigFormat,
    pub project_id: Option<String>,
    pub service_id: String,
    /// Reserved; never set by the translators.
    pub id: Option<String>,
    pub env_variables: BTreeMap<String, String>,
    pub inbound_services: Vec<String>,
    pub threadsafe: Option<bool>,
    pub handlers: Vec<Handler>,
    pub manual_scaling: Option<ManualScaling>,
    pub automatic_scaling: Option<AutomaticScaling>,
    /// Reserved; never set by the translators.
    pub serving_status: Option<String>,
}

impl CanonicalVersion {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn requires_threadsafe(&self) -> bool {
        requires_threadsafe(&self.runtime)
    }
}

/// Rewrite legacy runtime identifiers to their modern equivalent.
pub(crate) fn normalize_runtime(runtime: &str) -> String {
    if runtime == LEGACY_JAVA_RUNTIME {
        "java".to_owned()
    } else {
        runtime.to_owned()
    }
}

pub(crate) fn requires_threadsafe(runtime: &str) -> bool {
    THREADSAFE_RUNTIMES.contains(&runtime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_java_runtime_is_rewritten() {
        assert_eq!(normalize_runtime("java7"), "java");
        assert_eq!(normalize_runtime("java8"), "java8");
        assert_eq!(normalize_runtime("python27"), "python27");
    }

    #[test]
    fn threadsafe_required_after_rewrite() {
        assert!(requires_threadsafe(&normalize_runtime("java7")));
        assert!(requires_threadsafe("python27"));
        assert!(!requires_threadsafe("go"));
    }

    #[test]
    fn config_format_file_names_are_stable() {
        assert_eq!(ConfigFormat::AppYaml.file_name(), "app.yaml");
        assert_eq!(ConfigFormat::AppEngineWebXml.file_name(), "appengine-web.xml");
        assert_eq!(
            ConfigFormat::from_file_name("appengine-web.xml"),
            Some(ConfigFormat::AppEngineWebXml)
        );
        assert_eq!(ConfigFormat::from_file_name("app.yml"), None);
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let version = CanonicalVersion {
            runtime: "go".to_owned(),
            config_format: ConfigFormat::AppYaml,
            project_id: Some("guestbook".to_owned()),
            service_id: DEFAULT_SERVICE.to_owned(),
            id: None,
            env_variables: BTreeMap::new(),
            inbound_services: Vec::new(),
            threadsafe: None,
            handlers: Vec::new(),
            manual_scaling: Some(ManualScaling { instances: 2 }),
            automatic_scaling: None,
            serving_status: None,
        };
        let json = version.to_json().unwrap();
        assert!(json.contains("\"configFormat\": \"app.yaml\""));
        assert!(json.contains("\"serviceId\": \"default\""));
        assert!(json.contains("\"manualScaling\""));

        let back: CanonicalVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, version);
    }
}
