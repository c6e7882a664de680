//! Addon manifest types and the merge that presents many upstreams as one addon.
//!
//! Merging is the producing side of [`crate::id`]: every catalog id and id
//! prefix an upstream declares is re-issued to the client in encoded form, so
//! any id a client builds from the merged manifest decodes back to the
//! upstream that declared it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ManifestConfig;
use crate::id::{self, CompositeId};
use crate::userdata::UserData;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: String,
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    /// Either a bare resource name or a `{name, types, idPrefixes}` object.
    #[serde(default)]
    pub resources: Vec<Value>,
    #[serde(default)]
    pub catalogs: Vec<CatalogDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addon_catalogs: Vec<CatalogDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_prefixes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior_hints: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDescriptor {
    #[serde(rename = "type")]
    pub content_type: String,
    pub id: String,
    /// `name`, `extra`, and anything else the upstream declared.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Merge upstream manifests, given in upstream order, into one manifest.
pub fn merge(identity: &ManifestConfig, user_data: &UserData, upstreams: Vec<Manifest>) -> Manifest {
    let multiplexed = user_data.upstreams().len() > 1;
    let mut merged = Manifest {
        id: identity.id.clone(),
        version: identity.version.clone(),
        name: identity.name.clone(),
        description: identity.description.clone(),
        logo: identity.logo.clone(),
        types: Vec::new(),
        resources: Vec::new(),
        catalogs: Vec::new(),
        addon_catalogs: Vec::new(),
        id_prefixes: Some(Vec::new()),
        behavior_hints: Some(serde_json::json!({ "configurable": true })),
    };

    for (index, upstream) in upstreams.into_iter().enumerate() {
        let encode_prefix = |prefix: String| id::encode(&CompositeId::new(index, prefix), user_data);

        for content_type in upstream.types {
            push_unique(&mut merged.types, content_type);
        }
        for mut resource in upstream.resources {
            if multiplexed {
                reissue_resource_prefixes(&mut resource, encode_prefix);
            }
            push_unique(&mut merged.resources, resource);
        }

        merged.id_prefixes = match (merged.id_prefixes.take(), upstream.id_prefixes) {
            (Some(mut acc), Some(prefixes)) => {
                for prefix in prefixes {
                    push_unique(&mut acc, encode_prefix(prefix));
                }
                Some(acc)
            }
            // An upstream without prefixes accepts every id. Behind the
            // multiplexer that is every id carrying its index.
            (Some(mut acc), None) if multiplexed => {
                push_unique(&mut acc, encode_prefix(String::new()));
                Some(acc)
            }
            _ => None,
        };

        let reissue = |catalog: CatalogDescriptor| CatalogDescriptor {
            id: id::encode(&CompositeId::new(index, catalog.id), user_data),
            ..catalog
        };
        merged
            .catalogs
            .extend(upstream.catalogs.into_iter().map(reissue));
        merged
            .addon_catalogs
            .extend(upstream.addon_catalogs.into_iter().map(reissue));
    }

    merged
}

/// Encode the `idPrefixes` of a `{name, types, idPrefixes}` resource object.
fn reissue_resource_prefixes(resource: &mut Value, encode_prefix: impl Fn(String) -> String) {
    if let Some(Value::Array(prefixes)) = resource.get_mut("idPrefixes") {
        for prefix in prefixes.iter_mut() {
            if let Value::String(prefix) = prefix {
                *prefix = encode_prefix(std::mem::take(prefix));
            }
        }
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}
