//! Parsing of policy CRDs and policy instances from raw objects.
//!
//! Parse failures are returned as plain messages; the manager reports them as
//! warnings and skips the offending object.

use crate::config::Config;
use crate::policy::{AncestorStatus, Condition, Policy, PolicyCrd, PolicyScope};
use crate::resource::gknn::GATEWAY_GROUP;
use crate::resource::{Gknn, GroupKind, Object};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CrdSpec {
    #[serde(default)]
    group: String,
    #[serde(default)]
    names: CrdNames,
    #[serde(default)]
    scope: String,
}

#[derive(Debug, Default, Deserialize)]
struct CrdNames {
    #[serde(default)]
    kind: String,
}

/// Returns `Ok(None)` when the CRD does not carry the policy label at all.
pub fn parse_crd(object: &Object, config: &Config) -> Result<Option<PolicyCrd>, String> {
    let Some(value) = object.labels.get(&config.policy_label) else {
        return Ok(None);
    };
    let inheritable = match value.to_ascii_lowercase().as_str() {
        "inherited" => true,
        "direct" => false,
        other => {
            return Err(format!(
                "label {}={:?} is neither Inherited nor Direct",
                config.policy_label, other
            ));
        }
    };

    let spec = object.spec().ok_or_else(|| "missing spec".to_string())?;
    let spec = CrdSpec::deserialize(spec).map_err(|e| e.to_string())?;
    if spec.group.is_empty() || spec.names.kind.is_empty() {
        return Err("spec.group and spec.names.kind are required".to_string());
    }
    let scope = match spec.scope.as_str() {
        "Namespaced" => PolicyScope::Namespaced,
        "Cluster" => PolicyScope::Cluster,
        other => return Err(format!("unknown scope {:?}", other)),
    };

    Ok(Some(PolicyCrd::new(
        object.clone(),
        GroupKind::new(spec.group, spec.names.kind),
        inheritable,
        scope,
    )))
}

#[derive(Debug, Deserialize)]
struct RawTargetRef {
    #[serde(default)]
    group: String,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAncestor {
    ancestor_ref: RawAncestorRef,
    #[serde(default)]
    conditions: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct RawAncestorRef {
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    namespace: Option<String>,
    name: String,
}

pub fn parse_policy(object: &Object, crd: &PolicyCrd, config: &Config) -> Result<Policy, String> {
    let raw_refs = match (
        object.pointer("/spec/targetRefs"),
        object.pointer("/spec/targetRef"),
    ) {
        (Some(refs), _) => Vec::<RawTargetRef>::deserialize(refs).map_err(|e| e.to_string())?,
        (None, Some(single)) => {
            vec![RawTargetRef::deserialize(single).map_err(|e| e.to_string())?]
        }
        (None, None) => Vec::new(),
    };

    let mut target_refs = Vec::with_capacity(raw_refs.len());
    for raw in raw_refs {
        if raw.kind.is_empty() || raw.name.is_empty() {
            return Err("target ref without kind or name".to_string());
        }
        let group_kind = GroupKind::new(raw.group, raw.kind);
        let namespace = if config.is_cluster_scoped(&group_kind) {
            String::new()
        } else {
            raw.namespace
                .filter(|ns| !ns.is_empty())
                .unwrap_or_else(|| object.namespace().to_string())
        };
        if namespace.is_empty() && !config.is_cluster_scoped(&group_kind) {
            return Err(format!(
                "{} policy targets namespaced {} {:?} without a namespace",
                crd.scope, group_kind, raw.name
            ));
        }
        target_refs.push(Gknn::new(&group_kind, namespace, raw.name));
    }

    let ancestors = match object.pointer("/status/ancestors") {
        Some(value) => Vec::<RawAncestor>::deserialize(value)
            .map_err(|e| format!("status.ancestors: {}", e))?
            .into_iter()
            .map(|a| AncestorStatus {
                ancestor_ref: Gknn::new(
                    &GroupKind::new(
                        a.ancestor_ref.group.unwrap_or_else(|| GATEWAY_GROUP.to_string()),
                        a.ancestor_ref.kind.unwrap_or_else(|| "Gateway".to_string()),
                    ),
                    a.ancestor_ref
                        .namespace
                        .unwrap_or_else(|| object.namespace().to_string()),
                    a.ancestor_ref.name,
                ),
                conditions: a.conditions,
            })
            .collect(),
        None => Vec::new(),
    };

    Ok(Policy::new(object.clone(), target_refs, crd.inheritable, ancestors))
}

/// Policy type column value.
pub fn policy_type(inheritable: bool) -> &'static str {
    if inheritable { "Inherited" } else { "Direct" }
}
