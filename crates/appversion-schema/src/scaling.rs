//! Manual and automatic scaling normalization shared by both translators.

use crate::VersionError;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManualScaling {
    pub instances: u32,
}

/// Automatic scaling bounds. `min_instances` and `max_instances` are always
/// present; the optional bounds only when the descriptor supplied them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AutomaticScaling {
    pub min_instances: u32,
    pub max_instances: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_idle_instances: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_idle_instances: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_requests: Option<u32>,
}

/// A scalar as it appears in a descriptor, before coercion.
#[derive(Debug, Clone, Copy)]
pub enum RawValue<'a> {
    Yaml(&'a Value),
    Text(&'a str),
}

/// Anything scaling values can be looked up in by key.
pub trait ScalingSource {
    fn value(&self, key: &str) -> Option<RawValue<'_>>;
}

impl ScalingSource for Value {
    fn value(&self, key: &str) -> Option<RawValue<'_>> {
        self.get(key)
            .filter(|v| !v.is_null())
            .map(RawValue::Yaml)
    }
}

/// Spelling of each scaling key in one descriptor format.
#[derive(Debug, Clone, Copy)]
pub struct ScalingKeys {
    pub file: &'static str,
    pub manual: &'static str,
    pub automatic: &'static str,
    pub instances: &'static str,
    pub min_instances: &'static str,
    pub max_instances: &'static str,
    pub min_idle_instances: &'static str,
    pub max_idle_instances: &'static str,
    pub max_concurrent_requests: &'static str,
}

pub const YAML_KEYS: ScalingKeys = ScalingKeys {
    file: "app.yaml",
    manual: "manual_scaling",
    automatic: "automatic_scaling",
    instances: "instances",
    min_instances: "min_instances",
    max_instances: "max_instances",
    min_idle_instances: "min_idle_instances",
    max_idle_instances: "max_idle_instances",
    max_concurrent_requests: "max_concurrent_requests",
};

pub const XML_KEYS: ScalingKeys = ScalingKeys {
    file: "appengine-web.xml",
    manual: "manual-scaling",
    automatic: "automatic-scaling",
    instances: "instances",
    min_instances: "min-instances",
    max_instances: "max-instances",
    min_idle_instances: "min-idle-instances",
    max_idle_instances: "max-idle-instances",
    max_concurrent_requests: "max-concurrent-requests",
};

pub fn normalize_manual(
    keys: &ScalingKeys,
    block: &impl ScalingSource,
) -> Result<ManualScaling, VersionError> {
    let instances = required(keys, keys.manual, keys.instances, block)?;
    Ok(ManualScaling { instances })
}

/// Normalize automatic scaling. `block` holds the instance bounds and
/// `options` the idle/concurrency bounds; for `app.yaml` both are the
/// `automatic_scaling` mapping, for `appengine-web.xml` `options` is the
/// document root.
pub fn normalize_automatic(
    keys: &ScalingKeys,
    block: &impl ScalingSource,
    options: &impl ScalingSource,
) -> Result<AutomaticScaling, VersionError> {
    let min_instances = required(keys, keys.automatic, keys.min_instances, block)?;
    let max_instances = required(keys, keys.automatic, keys.max_instances, block)?;
    Ok(AutomaticScaling {
        min_instances,
        max_instances,
        min_idle_instances: optional(keys, keys.min_idle_instances, options)?,
        max_idle_instances: optional(keys, keys.max_idle_instances, options)?,
        max_concurrent_requests: optional(keys, keys.max_concurrent_requests, options)?,
    })
}

fn required(
    keys: &ScalingKeys,
    section: &str,
    key: &str,
    source: &impl ScalingSource,
) -> Result<u32, VersionError> {
    let field = format!("{section}.{key}");
    let raw = source
        .value(key)
        .ok_or_else(|| VersionError::invalid(keys.file, &field, "is required"))?;
    coerce_count(raw).map_err(|reason| VersionError::invalid(keys.file, &field, reason))
}

fn optional(
    keys: &ScalingKeys,
    key: &str,
    source: &impl ScalingSource,
) -> Result<Option<u32>, VersionError> {
    let Some(raw) = source.value(key) else {
        return Ok(None);
    };
    coerce_count(raw).map(Some).map_err(|reason| {
        VersionError::invalid(
            keys.file,
            key,
            format!("automatic scaling option {reason}"),
        )
    })
}

/// Coerce a raw scalar to a non-negative instance count.
fn coerce_count(raw: RawValue<'_>) -> Result<u32, String> {
    match raw {
        RawValue::Text(text) => parse_count(text),
        RawValue::Yaml(Value::String(text)) => parse_count(text),
        RawValue::Yaml(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                u32::try_from(v).map_err(|_| format!("value {v} is out of range"))
            } else if let Some(v) = n.as_i64() {
                Err(format!("value {v} must not be negative"))
            } else {
                let v = n.as_f64().unwrap_or(f64::NAN);
                if v.fract().abs() < f64::EPSILON && (0.0..=f64::from(u32::MAX)).contains(&v) {
                    Ok(v as u32)
                } else {
                    Err(format!("value {v} is not an integer"))
                }
            }
        }
        RawValue::Yaml(other) => Err(format!("is not an integer (found {})", kind_of(other))),
    }
}

fn parse_count(text: &str) -> Result<u32, String> {
    let trimmed = text.trim();
    trimmed
        .parse::<u32>()
        .map_err(|_| format!("value '{trimmed}' is not an integer"))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
