//! Registry resolution: package name to normalized repository URL
//!
//! Every lookup is best-effort. A transport error, a non-success status or
//! metadata without a usable URL all resolve to "no repository" for that
//! dependency and never fail the batch.

mod normalize;

pub use normalize::normalize_repository_url;

use crate::config::RegistryConfig;
use crate::error::{PeripheryError, Result};
use crate::model::{DeclaredDependency, ResolvedDependency};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;

/// Source of package metadata documents
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Fetch the full metadata document of a package
    async fn fetch_metadata(&self, package: &str) -> Result<Value>;
}

/// npm-compatible registry over HTTP
pub struct NpmRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl NpmRegistry {
    pub fn new(client: reqwest::Client, config: &RegistryConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn package_url(&self, package: &str) -> String {
        // Scoped names keep their '@' and '/' only when encoded
        let encoded: String = url::form_urlencoded::byte_serialize(package.as_bytes()).collect();
        format!("{}/{}", self.base_url, encoded)
    }
}

#[async_trait]
impl PackageRegistry for NpmRegistry {
    async fn fetch_metadata(&self, package: &str) -> Result<Value> {
        let response = self.client.get(self.package_url(package)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PeripheryError::Other(anyhow::anyhow!(
                "registry returned {} for {}",
                status,
                package
            )));
        }

        Ok(response.json::<Value>().await?)
    }
}

/// A `repository` field is either a URL string or an object with a `url`
fn repository_field_url(field: Option<&Value>) -> Option<&str> {
    let url = match field? {
        Value::String(s) => s.as_str(),
        Value::Object(obj) => obj.get("url")?.as_str()?,
        _ => return None,
    };
    (!url.trim().is_empty()).then_some(url)
}

/// Raw repository URL from registry metadata.
///
/// Prefers the version tagged `latest`, then the document-level field.
pub fn repository_from_metadata(metadata: &Value) -> Option<&str> {
    let latest = metadata
        .get("dist-tags")
        .and_then(|tags| tags.get("latest"))
        .and_then(Value::as_str)
        .and_then(|tag| metadata.get("versions")?.get(tag));

    latest
        .and_then(|version| repository_field_url(version.get("repository")))
        .or_else(|| repository_field_url(metadata.get("repository")))
}

/// Resolve one package to its normalized repository URL, if any
pub async fn resolve_repository(registry: &dyn PackageRegistry, package: &str) -> Option<String> {
    match registry.fetch_metadata(package).await {
        Ok(metadata) => {
            let url = repository_from_metadata(&metadata).map(normalize_repository_url);
            if url.is_none() {
                tracing::debug!("No repository URL in metadata for {}", package);
            }
            url
        }
        Err(e) => {
            tracing::debug!("Registry lookup failed for {}: {}", package, e);
            None
        }
    }
}

/// Resolve every dependency with at most `concurrency` lookups in flight.
///
/// Output order matches input order.
pub async fn resolve_dependencies(
    registry: &dyn PackageRegistry,
    deps: Vec<DeclaredDependency>,
    concurrency: usize,
) -> Vec<ResolvedDependency> {
    let resolved: Vec<ResolvedDependency> = stream::iter(deps)
        .map(|dep| async move {
            let repository_url = resolve_repository(registry, &dep.package_name).await;
            ResolvedDependency {
                package_name: dep.package_name,
                version_spec: dep.version_spec,
                repository_url,
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let with_repo = resolved
        .iter()
        .filter(|d| d.repository_url.is_some())
        .count();
    tracing::info!(
        "Resolved {}/{} dependencies to a repository",
        with_repo,
        resolved.len()
    );

    resolved
}
