//! Manifest aggregation: union of declared dependencies across manifests

use crate::model::DeclaredDependency;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// The parts of a package manifest that declare dependencies
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageManifest {
    #[serde(default)]
    dependencies: Option<Map<String, Value>>,
    #[serde(default)]
    dev_dependencies: Option<Map<String, Value>>,
}

/// Union the dependencies of every manifest in order.
///
/// On a name collision the first version seen wins, across manifests and
/// across the `dependencies`/`devDependencies` split alike. Manifests that
/// fail to parse are skipped. Output order is first-seen order.
pub fn aggregate_manifests<'a, I>(manifests: I) -> Vec<DeclaredDependency>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut deps = Vec::new();

    for (index, content) in manifests.into_iter().enumerate() {
        let manifest: PackageManifest = match serde_json::from_str(content) {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::debug!("Skipping unparseable manifest #{}: {}", index, e);
                continue;
            }
        };

        let declared = manifest
            .dependencies
            .unwrap_or_default()
            .into_iter()
            .chain(manifest.dev_dependencies.unwrap_or_default());

        for (name, version) in declared {
            if !seen.insert(name.clone()) {
                continue;
            }
            deps.push(DeclaredDependency {
                package_name: name,
                version_spec: version_spec(version),
            });
        }
    }

    deps
}

/// Version specs are strings in practice; anything else is kept as its JSON text
fn version_spec(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
