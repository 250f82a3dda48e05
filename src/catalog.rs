//! Dataset-catalog (CKAN action API) package resolution.
//!
//! A `ckan-package:<id>` descriptor is a two-stage lookup: fetch the package
//! metadata, then optionally pick one of its resources and resolve that to
//! row-level data. Resource selection is an ordered preference chain kept as
//! an explicit policy table so each rule is inspectable on its own.

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::{CatalogConfig, Config};
use crate::error::{Error, Result};
use crate::source;

/// The subset of a catalog resource the selection policy looks at. Every
/// field is optional; catalogs are inconsistent about what they publish.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub datastore_active: Option<bool>,
}

type SelectionRule = fn(&Resource, &CatalogConfig) -> bool;

/// Ordered preference chain for picking one resource out of a package.
/// The first rule with any match wins; when none matches, the first
/// resource is used as a fallback.
const SELECTION_RULES: &[(&str, SelectionRule)] = &[
    ("configured resource id", rule_configured_id),
    ("configured resource name", rule_configured_name),
    ("declared json format", rule_json_format),
    ("json file url", rule_json_url),
    ("active datastore", rule_active_datastore),
];

fn rule_configured_id(resource: &Resource, catalog: &CatalogConfig) -> bool {
    match (&catalog.resource_id, &resource.id) {
        (Some(want), Some(id)) => want == id,
        _ => false,
    }
}

fn rule_configured_name(resource: &Resource, catalog: &CatalogConfig) -> bool {
    match (&catalog.resource_name, &resource.name) {
        (Some(want), Some(name)) => name.to_lowercase().contains(&want.to_lowercase()),
        _ => false,
    }
}

fn rule_json_format(resource: &Resource, _catalog: &CatalogConfig) -> bool {
    resource
        .format
        .as_deref()
        .is_some_and(|f| f.eq_ignore_ascii_case("json"))
}

fn rule_json_url(resource: &Resource, _catalog: &CatalogConfig) -> bool {
    resource
        .url
        .as_deref()
        .is_some_and(|u| u.to_lowercase().ends_with(".json"))
}

fn rule_active_datastore(resource: &Resource, _catalog: &CatalogConfig) -> bool {
    resource.datastore_active == Some(true)
}

pub fn pick_resource<'a>(
    resources: &'a [Resource],
    catalog: &CatalogConfig,
) -> Option<&'a Resource> {
    for (_label, rule) in SELECTION_RULES {
        if let Some(found) = resources.iter().find(|r| rule(r, catalog)) {
            return Some(found);
        }
    }
    resources.first()
}

/// Resolves a package id into a raw JSON document per the configured mode:
/// the package metadata itself, or one resource's row-level data.
pub async fn fetch_package(config: &Config, client: &Client, package_id: &str) -> Result<Value> {
    let pkg = package_show(config, client, package_id).await?;

    if !config.catalog.fetch_resource {
        return Ok(pkg);
    }

    let resources: Vec<Resource> = pkg
        .get("resources")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| Error::Protocol(format!("malformed resource list: {}", e)))?
        .unwrap_or_default();

    let resource = pick_resource(&resources, &config.catalog).ok_or_else(|| {
        Error::Protocol(format!("no resources found for package {}", package_id))
    })?;

    if let Some(url) = resource.url.as_deref() {
        if source::is_http_url(url) && is_likely_json_url(url) {
            return source::fetch_json_url(client, url).await;
        }
    }

    if resource.datastore_active == Some(true) {
        if let Some(resource_id) = resource.id.as_deref() {
            return datastore_search(config, client, resource_id).await;
        }
    }

    Err(Error::Protocol(format!(
        "selected resource for package {} is not JSON; disable catalog.fetch_resource to sync package metadata only",
        package_id
    )))
}

/// Stage one: package metadata by id, with envelope validation.
pub async fn package_show(config: &Config, client: &Client, package_id: &str) -> Result<Value> {
    let url = format!(
        "{}/api/3/action/package_show?id={}",
        config.catalog.base_url.trim_end_matches('/'),
        package_id
    );
    let response = source::fetch_json_url(client, &url).await?;
    unwrap_envelope(&url, response)
}

/// Tabular search against a resource's datastore, bounded by the configured
/// row limit.
async fn datastore_search(config: &Config, client: &Client, resource_id: &str) -> Result<Value> {
    let url = format!(
        "{}/api/3/action/datastore_search?resource_id={}&limit={}",
        config.catalog.base_url.trim_end_matches('/'),
        resource_id,
        config.catalog.datastore_limit
    );
    let response = source::fetch_json_url(client, &url).await?;
    unwrap_envelope(&url, response)
}

/// Catalog action responses wrap their payload in `{success, result}`;
/// anything else is a protocol failure.
fn unwrap_envelope(url: &str, mut response: Value) -> Result<Value> {
    let success = response
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    match response.get_mut("result") {
        Some(result) if success && !result.is_null() => Ok(result.take()),
        _ => Err(Error::Protocol(format!(
            "unexpected catalog response from {}",
            url
        ))),
    }
}

/// A URL counts as JSON-looking when its path ends in `.json` or it carries
/// an explicit `format=json` parameter.
fn is_likely_json_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    let path = lower.split('?').next().unwrap_or(&lower);
    path.ends_with(".json") || lower.contains("format=json")
}
