//! Source resolution: an opaque descriptor string into a raw JSON document.
//!
//! Three descriptor variants are supported: direct http(s) URLs, filesystem
//! paths (relative paths resolve against `source.base_dir`), and
//! `ckan-package:<id>` catalog references handled by [`crate::catalog`].

use reqwest::Client;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use crate::catalog;
use crate::config::Config;
use crate::error::{Error, Result};

/// Distinguished prefix marking a dataset-catalog package reference.
pub const CATALOG_PREFIX: &str = "ckan-package:";

/// Classified form of a source descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind<'a> {
    Url(&'a str),
    File(&'a str),
    CatalogPackage(String),
}

/// Classifies a descriptor without touching the network or filesystem.
pub fn classify(descriptor: &str) -> Result<SourceKind<'_>> {
    let trimmed = descriptor.trim();
    if trimmed.is_empty() {
        return Err(Error::Config("JSON source is required".to_string()));
    }

    if let Some(rest) = trimmed.strip_prefix(CATALOG_PREFIX) {
        let package_id = rest.trim();
        if package_id.is_empty() {
            return Err(Error::Config(
                "missing package id in catalog source".to_string(),
            ));
        }
        return Ok(SourceKind::CatalogPackage(package_id.to_string()));
    }

    if is_http_url(trimmed) {
        return Ok(SourceKind::Url(trimmed));
    }

    Ok(SourceKind::File(trimmed))
}

pub fn is_http_url(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Builds the HTTP client used for all source fetches, with the configured
/// request timeout (expiry surfaces as a fetch failure).
pub fn build_client(config: &Config) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.source.fetch_timeout_secs))
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))
}

/// Resolves a descriptor into a raw JSON document.
pub async fn resolve(config: &Config, client: &Client, descriptor: &str) -> Result<Value> {
    match classify(descriptor)? {
        SourceKind::Url(url) => fetch_json_url(client, url).await,
        SourceKind::File(path) => read_json_file(&config.source.base_dir, path),
        SourceKind::CatalogPackage(package_id) => {
            catalog::fetch_package(config, client, &package_id).await
        }
    }
}

/// GET a URL and parse the body strictly as JSON. Status >= 400 is a fetch
/// failure carrying the code; a body that is not JSON is a distinct parse
/// failure, never silently swallowed.
pub async fn fetch_json_url(client: &Client, url: &str) -> Result<Value> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::fetch(url, e))?;

    let status = response.status();
    if status.as_u16() >= 400 {
        return Err(Error::fetch(url, format!("HTTP {}", status.as_u16())));
    }

    let body = response.text().await.map_err(|e| Error::fetch(url, e))?;
    serde_json::from_str(&body).map_err(|e| Error::parse(url, e))
}

fn read_json_file(base_dir: &Path, path: &str) -> Result<Value> {
    let candidate = Path::new(path);
    let resolved = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base_dir.join(candidate)
    };

    let display = resolved.display().to_string();
    let content =
        std::fs::read_to_string(&resolved).map_err(|e| Error::fetch(display.clone(), e))?;
    serde_json::from_str(&content).map_err(|e| Error::parse(display, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_urls() {
        assert_eq!(
            classify("https://example.org/feed.json").unwrap(),
            SourceKind::Url("https://example.org/feed.json")
        );
        assert_eq!(
            classify("HTTP://example.org/feed").unwrap(),
            SourceKind::Url("HTTP://example.org/feed")
        );
    }

    #[test]
    fn test_classify_files() {
        assert_eq!(
            classify("./data/source.json").unwrap(),
            SourceKind::File("./data/source.json")
        );
        assert_eq!(
            classify("/var/feeds/latest.json").unwrap(),
            SourceKind::File("/var/feeds/latest.json")
        );
    }

    #[test]
    fn test_classify_catalog_package() {
        assert_eq!(
            classify("ckan-package: ttc-routes ").unwrap(),
            SourceKind::CatalogPackage("ttc-routes".to_string())
        );
    }

    #[test]
    fn test_classify_rejects_empty() {
        assert!(matches!(classify(""), Err(Error::Config(_))));
        assert!(matches!(classify("   "), Err(Error::Config(_))));
        assert!(matches!(classify("ckan-package:"), Err(Error::Config(_))));
        assert!(matches!(classify("ckan-package:  "), Err(Error::Config(_))));
    }

    #[test]
    fn test_read_json_file_relative_to_base_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("feed.json"), r#"{"records": []}"#).unwrap();

        let value = read_json_file(tmp.path(), "feed.json").unwrap();
        assert!(value.get("records").is_some());
    }

    #[test]
    fn test_read_json_file_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            read_json_file(tmp.path(), "missing.json"),
            Err(Error::Fetch { .. })
        ));

        std::fs::write(tmp.path().join("bad.json"), "{not json").unwrap();
        assert!(matches!(
            read_json_file(tmp.path(), "bad.json"),
            Err(Error::Parse { .. })
        ));
    }
}
