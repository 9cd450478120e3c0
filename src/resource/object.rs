//! Typed view over a raw resource document.

use crate::error::Error;
use crate::resource::gknn::{Gknn, GroupKind};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A resource as handed over by the acquisition layer: identity and common
/// metadata are parsed up front, the body stays as raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    gknn: Gknn,
    pub api_version: String,
    pub creation_timestamp: Option<DateTime<Utc>>,
    pub labels: BTreeMap<String, String>,
    raw: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHeader {
    #[serde(default)]
    api_version: String,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    metadata: RawMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetadata {
    #[serde(default)]
    name: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    creation_timestamp: Option<String>,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

impl Object {
    /// Parse a decoded document. `origin` names the file (or source) for error
    /// messages.
    pub fn from_value(raw: Value, origin: &str) -> Result<Self, Error> {
        let invalid = |message: String| Error::InvalidObject {
            origin: origin.to_string(),
            message,
        };

        let header = RawHeader::deserialize(&raw).map_err(|e| invalid(e.to_string()))?;
        if header.api_version.is_empty() {
            return Err(invalid("missing apiVersion".to_string()));
        }
        if header.kind.is_empty() {
            return Err(invalid("missing kind".to_string()));
        }
        if header.metadata.name.is_empty() {
            return Err(invalid(format!("{} without metadata.name", header.kind)));
        }

        let creation_timestamp = match header.metadata.creation_timestamp.as_deref() {
            Some(ts) => Some(
                DateTime::parse_from_rfc3339(ts)
                    .map_err(|e| invalid(format!("bad creationTimestamp {:?}: {}", ts, e)))?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        let group_kind = GroupKind::from_api_version(&header.api_version, &header.kind);
        let gknn = Gknn::new(
            &group_kind,
            header.metadata.namespace.unwrap_or_default(),
            header.metadata.name,
        );

        Ok(Self {
            gknn,
            api_version: header.api_version,
            creation_timestamp,
            labels: header.metadata.labels,
            raw,
        })
    }

    /// A bare Namespace object, used when a manifest set references a
    /// namespace it never declares.
    pub fn namespace_object(name: &str) -> Self {
        Self {
            gknn: Gknn::new(&crate::resource::gknn::NAMESPACE, "", name),
            api_version: "v1".to_string(),
            creation_timestamp: None,
            labels: BTreeMap::new(),
            raw: serde_json::json!({
                "apiVersion": "v1",
                "kind": "Namespace",
                "metadata": { "name": name },
            }),
        }
    }

    pub fn gknn(&self) -> &Gknn {
        &self.gknn
    }

    pub fn group_kind(&self) -> GroupKind {
        self.gknn.group_kind()
    }

    pub fn namespace(&self) -> &str {
        &self.gknn.namespace
    }

    pub fn name(&self) -> &str {
        &self.gknn.name
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn spec(&self) -> Option<&Value> {
        self.raw.get("spec")
    }

    /// Look up a nested field with a JSON pointer such as `/spec/gatewayClassName`.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.raw.pointer(pointer)
    }
}

#[cfg(test)]
pub(crate) fn object_from_yaml(text: &str) -> Object {
    let value: Value = serde_yaml::from_str(text).expect("valid yaml");
    Object::from_value(value, "test").expect("valid object")
}
