//! `app.yaml` translation into a [`CanonicalVersion`].

use crate::handler::HandlerParser;
use crate::scaling::{normalize_automatic, normalize_manual, YAML_KEYS};
use crate::version::{normalize_runtime, requires_threadsafe, CanonicalVersion, ConfigFormat};
use crate::VersionError;
use serde_yaml::Value;
use std::collections::BTreeMap;
use tracing::debug;

const FILE: &str = "app.yaml";

/// Build a version from a parsed `app.yaml` document.
pub fn from_document(
    doc: &Value,
    handler_parser: &dyn HandlerParser,
    default_service: &str,
) -> Result<CanonicalVersion, VersionError> {
    if !doc.is_mapping() {
        return Err(VersionError::invalid(FILE, "document", "must be a mapping"));
    }

    let runtime = required_str(doc, "runtime")?;
    let runtime = normalize_runtime(runtime);

    let entries = doc
        .get("handlers")
        .filter(|v| !v.is_null())
        .ok_or_else(|| VersionError::missing(FILE, "handlers"))?;
    let entries = entries
        .as_sequence()
        .ok_or_else(|| VersionError::invalid(FILE, "handlers", "must be a sequence"))?;
    let handlers = entries
        .iter()
        .map(|entry| handler_parser.parse(entry))
        .collect::<Result<Vec<_>, _>>()?;

    let project_id = optional_str(doc, "application")?.map(str::to_owned);

    let service = optional_str(doc, "service")?;
    let module = optional_str(doc, "module")?;
    if service.is_some() && module.is_some() {
        return Err(VersionError::conflicting(FILE, "service", "module"));
    }
    let service_id = service
        .or(module)
        .filter(|name| !name.is_empty())
        .unwrap_or(default_service)
        .to_owned();

    let env_variables = env_variables(doc)?;
    let inbound_services = inbound_services(doc)?;

    let manual = present(doc, YAML_KEYS.manual);
    let automatic = present(doc, YAML_KEYS.automatic);
    let (manual_scaling, automatic_scaling) = match (manual, automatic) {
        (Some(_), Some(_)) => {
            return Err(VersionError::conflicting(
                FILE,
                YAML_KEYS.automatic,
                YAML_KEYS.manual,
            ))
        }
        (Some(block), None) => (Some(normalize_manual(&YAML_KEYS, block)?), None),
        (None, Some(block)) => (None, Some(normalize_automatic(&YAML_KEYS, block, block)?)),
        (None, None) => (None, None),
    };

    let threadsafe = if requires_threadsafe(&runtime) {
        let value = present(doc, "threadsafe").ok_or_else(|| VersionError::MissingField {
            file: FILE,
            field: format!("threadsafe (required by runtime {runtime})"),
        })?;
        let flag = value
            .as_bool()
            .ok_or_else(|| VersionError::invalid(FILE, "threadsafe", "must be a boolean"))?;
        Some(flag)
    } else {
        None
    };

    debug!("translated {FILE}: runtime={runtime} service={service_id}");

    Ok(CanonicalVersion {
        runtime,
        config_format: ConfigFormat::AppYaml,
        project_id,
        service_id,
        id: None,
        env_variables,
        inbound_services,
        threadsafe,
        handlers,
        manual_scaling,
        automatic_scaling,
        serving_status: None,
    })
}

fn present<'a>(doc: &'a Value, key: &str) -> Option<&'a Value> {
    doc.get(key).filter(|v| !v.is_null())
}

fn required_str<'a>(doc: &'a Value, key: &str) -> Result<&'a str, VersionError> {
    optional_str(doc, key)?.ok_or_else(|| VersionError::missing(FILE, key))
}

fn optional_str<'a>(doc: &'a Value, key: &str) -> Result<Option<&'a str>, VersionError> {
    match present(doc, key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| VersionError::invalid(FILE, key, "must be a string")),
    }
}

fn env_variables(doc: &Value) -> Result<BTreeMap<String, String>, VersionError> {
    let Some(value) = present(doc, "env_variables") else {
        return Ok(BTreeMap::new());
    };
    let mapping = value
        .as_mapping()
        .ok_or_else(|| VersionError::invalid(FILE, "env_variables", "must be a mapping"))?;

    let mut vars = BTreeMap::new();
    for (key, value) in mapping {
        let name = key
            .as_str()
            .ok_or_else(|| VersionError::invalid(FILE, "env_variables", "names must be strings"))?;
        let text = scalar_text(value).ok_or_else(|| {
            VersionError::invalid(
                FILE,
                &format!("env_variables.{name}"),
                "must be a scalar value",
            )
        })?;
        vars.insert(name.to_owned(), text);
    }
    Ok(vars)
}

fn inbound_services(doc: &Value) -> Result<Vec<String>, VersionError> {
    let Some(value) = present(doc, "inbound_services") else {
        return Ok(Vec::new());
    };
    let entries = value
        .as_sequence()
        .ok_or_else(|| VersionError::invalid(FILE, "inbound_services", "must be a sequence"))?;
    entries
        .iter()
        .map(|entry| {
            entry.as_str().map(str::to_owned).ok_or_else(|| {
                VersionError::invalid(FILE, "inbound_services", "entries must be strings")
            })
        })
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::OpaqueHandlerParser;
    use crate::version::DEFAULT_SERVICE;

    fn translate(input: &str) -> Result<CanonicalVersion, VersionError> {
        let doc: Value = serde_yaml::from_str(input).unwrap();
        from_document(&doc, &OpaqueHandlerParser, DEFAULT_SERVICE)
    }

    #[test]
    fn minimal_document_uses_defaults() {
        let version = translate("runtime: python27\nhandlers: []\nthreadsafe: true\n").unwrap();
        assert_eq!(version.runtime, "python27");
        assert_eq!(version.config_format, ConfigFormat::AppYaml);
        assert_eq!(version.service_id, DEFAULT_SERVICE);
        assert!(version.env_variables.is_empty());
        assert!(version.inbound_services.is_empty());
        assert!(version.handlers.is_empty());
        assert_eq!(version.threadsafe, Some(true));
        assert_eq!(version.project_id, None);
        assert_eq!(version.id, None);
        assert_eq!(version.serving_status, None);
    }

    #[test]
    fn full_document() {
        let version = translate(
            r"
runtime: go
application: guestbook
service: api
env_variables:
  MODE: production
  PORT: 8080
inbound_services:
  - warmup
  - mail
handlers:
  - url: /static
    static_dir: static
  - url: /.*
    script: auto
automatic_scaling:
  min_instances: 1
  max_instances: 4
  max_concurrent_requests: 20
",
        )
        .unwrap();
        assert_eq!(version.project_id.as_deref(), Some("guestbook"));
        assert_eq!(version.service_id, "api");
        assert_eq!(version.env_variables["PORT"], "8080");
        assert_eq!(version.env_variables["MODE"], "production");
        assert_eq!(version.inbound_services, vec!["warmup", "mail"]);
        assert_eq!(version.handlers.len(), 2);
        assert_eq!(version.handlers[1].url(), Some("/.*"));
        let auto = version.automatic_scaling.unwrap();
        assert_eq!((auto.min_instances, auto.max_instances), (1, 4));
        assert_eq!(auto.max_concurrent_requests, Some(20));
        assert_eq!(auto.min_idle_instances, None);
        assert_eq!(version.manual_scaling, None);
        assert_eq!(version.threadsafe, None);
    }

    #[test]
    fn module_is_a_service_synonym() {
        let version = translate("runtime: go\nhandlers: []\nmodule: worker\n").unwrap();
        assert_eq!(version.service_id, "worker");
    }

    #[test]
    fn service_and_module_conflict() {
        let err = translate("runtime: go\nhandlers: []\nservice: a\nmodule: b\n").unwrap_err();
        assert!(matches!(err, VersionError::ConflictingFields { .. }));
    }

    #[test]
    fn missing_runtime_or_handlers() {
        let err = translate("handlers: []\n").unwrap_err();
        assert!(matches!(err, VersionError::MissingField { ref field, .. } if field == "runtime"));
        let err = translate("runtime: go\n").unwrap_err();
        assert!(matches!(err, VersionError::MissingField { ref field, .. } if field == "handlers"));
    }

    #[test]
    fn both_scaling_blocks_conflict() {
        let err = translate(
            "runtime: go\nhandlers: []\nmanual_scaling:\n  instances: 1\nautomatic_scaling:\n  min_instances: 1\n  max_instances: 2\n",
        )
        .unwrap_err();
        assert!(matches!(err, VersionError::ConflictingFields { .. }));
    }

    #[test]
    fn manual_scaling_is_normalized() {
        let version =
            translate("runtime: go\nhandlers: []\nmanual_scaling:\n  instances: '5'\n").unwrap();
        assert_eq!(version.manual_scaling.unwrap().instances, 5);
        assert_eq!(version.automatic_scaling, None);
    }

    #[test]
    fn automatic_scaling_bad_max_instances() {
        let err = translate(
            "runtime: go\nhandlers: []\nautomatic_scaling:\n  min_instances: 1\n  max_instances: x\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_instances"));
        assert!(matches!(err, VersionError::InvalidConfig { .. }));
    }

    #[test]
    fn threadsafe_required_for_python27() {
        let err = translate("runtime: python27\nhandlers: []\n").unwrap_err();
        assert!(matches!(err, VersionError::MissingField { .. }));
        let err = translate("runtime: python27\nhandlers: []\nthreadsafe: 'yes'\n").unwrap_err();
        assert!(matches!(err, VersionError::InvalidConfig { .. }));
        let err = translate("runtime: python27\nhandlers: []\nthreadsafe: 1\n").unwrap_err();
        assert!(matches!(err, VersionError::InvalidConfig { .. }));
    }

    #[test]
    fn legacy_java_runtime_requires_threadsafe() {
        let version = translate("runtime: java7\nhandlers: []\nthreadsafe: false\n").unwrap();
        assert_eq!(version.runtime, "java");
        assert_eq!(version.threadsafe, Some(false));
    }

    #[test]
    fn threadsafe_ignored_for_other_runtimes() {
        let version = translate("runtime: go\nhandlers: []\nthreadsafe: true\n").unwrap();
        assert_eq!(version.threadsafe, None);
    }

    #[test]
    fn non_mapping_document_rejected() {
        let err = translate("- runtime\n").unwrap_err();
        assert!(matches!(err, VersionError::InvalidConfig { .. }));
    }

    #[test]
    fn custom_default_service() {
        let doc: Value = serde_yaml::from_str("runtime: go\nhandlers: []\n").unwrap();
        let version = from_document(&doc, &OpaqueHandlerParser, "frontend").unwrap();
        assert_eq!(version.service_id, "frontend");
    }
}
