//! `appengine-web.xml` translation into a [`CanonicalVersion`].
//!
//! Every element is looked up as a direct child under [`XML_NAMESPACE`].
//! Routing for this format is handled outside this crate, so the resulting
//! version never carries handlers.

use crate::scaling::{normalize_automatic, normalize_manual, RawValue, ScalingSource, XML_KEYS};
use crate::version::{normalize_runtime, CanonicalVersion, ConfigFormat, LEGACY_JAVA_RUNTIME};
use crate::VersionError;
use roxmltree::Node;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// The namespace `appengine-web.xml` elements live in.
pub const XML_NAMESPACE: &str = "http://appengine.google.com/ns/1.0";

const FILE: &str = "appengine-web.xml";

/// An element whose namespaced children are scaling values.
struct Element<'a, 'input>(Node<'a, 'input>);

impl ScalingSource for Element<'_, '_> {
    fn value(&self, key: &str) -> Option<RawValue<'_>> {
        child(self.0, key).map(|node| RawValue::Text(node.text().unwrap_or_default()))
    }
}

/// Build a version from the root element of a parsed `appengine-web.xml`.
pub fn from_element_tree(
    root: Node<'_, '_>,
    default_service: &str,
) -> Result<CanonicalVersion, VersionError> {
    let runtime = match child(root, "runtime") {
        Some(node) => non_empty_text(node, "runtime")?,
        None => LEGACY_JAVA_RUNTIME,
    };
    let runtime = normalize_runtime(runtime);

    let project_id = child(root, "application")
        .map(text)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    let service = child(root, "service");
    let module = child(root, "module");
    if service.is_some() && module.is_some() {
        return Err(VersionError::conflicting(FILE, "service", "module"));
    }
    let service_id = service
        .or(module)
        .map(text)
        .filter(|s| !s.is_empty())
        .unwrap_or(default_service)
        .to_owned();

    let env_variables = env_variables(root)?;
    let inbound_services = inbound_services(root)?;

    let manual = child(root, XML_KEYS.manual);
    let automatic = child(root, XML_KEYS.automatic);
    let (manual_scaling, automatic_scaling) = match (manual, automatic) {
        (Some(_), Some(_)) => {
            return Err(VersionError::conflicting(
                FILE,
                XML_KEYS.automatic,
                XML_KEYS.manual,
            ))
        }
        (Some(node), None) => (Some(normalize_manual(&XML_KEYS, &Element(node))?), None),
        (None, Some(node)) => (
            None,
            // Idle and concurrency bounds are siblings of automatic-scaling,
            // not children of it.
            Some(normalize_automatic(&XML_KEYS, &Element(node), &Element(root))?),
        ),
        (None, None) => {
            warn_orphan_options(root);
            (None, None)
        }
    };

    let threadsafe_node =
        child(root, "threadsafe").ok_or_else(|| VersionError::missing(FILE, "threadsafe"))?;
    let threadsafe = match text(threadsafe_node).to_lowercase().as_str() {
        "true" => true,
        "false" => false,
        _ => {
            return Err(VersionError::invalid(
                FILE,
                "threadsafe",
                "must be either \"true\" or \"false\"",
            ))
        }
    };

    debug!("translated {FILE}: runtime={runtime} service={service_id}");

    Ok(CanonicalVersion {
        runtime,
        config_format: ConfigFormat::AppEngineWebXml,
        project_id,
        service_id,
        id: None,
        env_variables,
        inbound_services,
        threadsafe: Some(threadsafe),
        handlers: Vec::new(),
        manual_scaling,
        automatic_scaling,
        serving_status: None,
    })
}

/// Build the namespace-qualified lookup for `name` and find it among `parent`'s children.
fn child<'a, 'input>(parent: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    parent
        .children()
        .find(|node| node.has_tag_name((XML_NAMESPACE, name)))
}

fn text<'a>(node: Node<'a, '_>) -> &'a str {
    node.text().unwrap_or_default().trim()
}

fn non_empty_text<'a>(node: Node<'a, '_>, field: &str) -> Result<&'a str, VersionError> {
    let value = text(node);
    if value.is_empty() {
        return Err(VersionError::invalid(FILE, field, "must not be empty"));
    }
    Ok(value)
}

fn env_variables(root: Node<'_, '_>) -> Result<BTreeMap<String, String>, VersionError> {
    let mut vars = BTreeMap::new();
    let Some(parent) = child(root, "env-variables") else {
        return Ok(vars);
    };
    for var in parent.children().filter(Node::is_element) {
        let (Some(name), Some(value)) = (var.attribute("name"), var.attribute("value")) else {
            return Err(VersionError::invalid(
                FILE,
                "env-variables",
                "entries need both 'name' and 'value' attributes",
            ));
        };
        vars.insert(name.to_owned(), value.to_owned());
    }
    Ok(vars)
}

fn inbound_services(root: Node<'_, '_>) -> Result<Vec<String>, VersionError> {
    let Some(parent) = child(root, "inbound-services") else {
        return Ok(Vec::new());
    };
    parent
        .children()
        .filter(Node::is_element)
        .map(|service| non_empty_text(service, "inbound-services").map(str::to_owned))
        .collect()
}

fn warn_orphan_options(root: Node<'_, '_>) {
    for key in [
        XML_KEYS.min_idle_instances,
        XML_KEYS.max_idle_instances,
        XML_KEYS.max_concurrent_requests,
    ] {
        if child(root, key).is_some() {
            warn!("ignoring <{key}> in {FILE}: no <automatic-scaling> element");
        }
    }
}
