//! Relation registry for gateway API resources.
//!
//! A relation is a named, directed edge type with a pure extraction rule from
//! an object to the identities it references:
//! - GatewayClass: Gateway -> GatewayClass (`spec.gatewayClassName`)
//! - ParentRef: HTTPRoute/GRPCRoute -> Gateway (`spec.parentRefs[]`)
//! - BackendRef: HTTPRoute/GRPCRoute -> Service (`spec.rules[].backendRefs[]`)
//! - Namespace: any namespaced object -> its Namespace

use crate::resource::gknn::{
    GATEWAY, GATEWAY_CLASS, GATEWAY_GROUP, GRPC_ROUTE, HTTP_ROUTE, NAMESPACE, SERVICE,
};
use crate::resource::{Gknn, GroupKind, Object};
use serde::Deserialize;
use serde_json::Value;

pub type ExtractFn = fn(&Object) -> Extracted;

/// References read from one object. Entries that cannot be read are kept as
/// messages so the caller can report them; they never hide their siblings.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Extracted {
    pub targets: Vec<Gknn>,
    pub malformed: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Relation {
    pub name: &'static str,
    /// Kind the relation starts from; `None` applies to every namespaced object.
    pub from: Option<GroupKind>,
    /// Kind the extracted references usually point at. Used to discover
    /// referrers of an existing node.
    pub to: GroupKind,
    pub extractor: ExtractFn,
}

impl Relation {
    pub fn applies_to(&self, group_kind: &GroupKind) -> bool {
        match &self.from {
            Some(from) => from == group_kind,
            None => true,
        }
    }

    /// References of `object`, or nothing if the relation does not start
    /// from the object's kind.
    pub fn extract(&self, object: &Object) -> Extracted {
        if self.applies_to(&object.group_kind()) {
            (self.extractor)(object)
        } else {
            Extracted::default()
        }
    }

    /// Well-formed targets only.
    pub fn targets(&self, object: &Object) -> Vec<Gknn> {
        self.extract(object).targets
    }
}

pub static GATEWAY_RELATIONS: &[Relation] = &[
    Relation {
        name: "GatewayClass",
        from: Some(GATEWAY),
        to: GATEWAY_CLASS,
        extractor: gateway_class_of,
    },
    Relation {
        name: "ParentRef",
        from: Some(HTTP_ROUTE),
        to: GATEWAY,
        extractor: parent_refs_of,
    },
    Relation {
        name: "ParentRef",
        from: Some(GRPC_ROUTE),
        to: GATEWAY,
        extractor: parent_refs_of,
    },
    Relation {
        name: "BackendRef",
        from: Some(HTTP_ROUTE),
        to: SERVICE,
        extractor: backend_refs_of,
    },
    Relation {
        name: "BackendRef",
        from: Some(GRPC_ROUTE),
        to: SERVICE,
        extractor: backend_refs_of,
    },
    Relation {
        name: "Namespace",
        from: None,
        to: NAMESPACE,
        extractor: namespace_of,
    },
];

/// Object reference as written in parentRefs/backendRefs. Absent group and
/// kind fall back to per-relation defaults; an explicit empty group means core.
#[derive(Debug, Deserialize)]
struct RawRef {
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    name: String,
}

impl RawRef {
    fn resolve(self, default_group: &str, default_kind: &str, default_namespace: &str) -> Gknn {
        let group_kind = GroupKind::new(
            self.group.unwrap_or_else(|| default_group.to_string()),
            self.kind.unwrap_or_else(|| default_kind.to_string()),
        );
        let namespace = self
            .namespace
            .unwrap_or_else(|| default_namespace.to_string());
        Gknn::new(&group_kind, namespace, self.name)
    }
}

/// Decode a reference list entry by entry. `path` names the list in messages.
fn refs_at(value: Option<&Value>, path: &str) -> Vec<Result<RawRef, String>> {
    let items = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => return vec![Err(format!("{}: expected a list", path))],
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match RawRef::deserialize(item) {
            Ok(r) if r.name.is_empty() => Err(format!("{}[{}]: missing name", path, i)),
            Ok(r) => Ok(r),
            Err(e) => Err(format!("{}[{}]: {}", path, i, e)),
        })
        .collect()
}

fn collect_refs(
    out: &mut Extracted,
    entries: Vec<Result<RawRef, String>>,
    default_group: &str,
    default_kind: &str,
    default_namespace: &str,
) {
    for entry in entries {
        match entry {
            Ok(r) => out
                .targets
                .push(r.resolve(default_group, default_kind, default_namespace)),
            Err(message) => out.malformed.push(message),
        }
    }
}

fn gateway_class_of(object: &Object) -> Extracted {
    let mut out = Extracted::default();
    match object.pointer("/spec/gatewayClassName") {
        None | Some(Value::Null) => {}
        Some(Value::String(name)) if !name.is_empty() => {
            out.targets.push(Gknn::new(&GATEWAY_CLASS, "", name.as_str()));
        }
        Some(_) => out
            .malformed
            .push("spec.gatewayClassName: expected a non-empty string".to_string()),
    }
    out
}

fn parent_refs_of(object: &Object) -> Extracted {
    let mut out = Extracted::default();
    let entries = refs_at(object.pointer("/spec/parentRefs"), "spec.parentRefs");
    collect_refs(&mut out, entries, GATEWAY_GROUP, "Gateway", object.namespace());
    out
}

fn backend_refs_of(object: &Object) -> Extracted {
    let mut out = Extracted::default();
    let rules = match object.pointer("/spec/rules") {
        None | Some(Value::Null) => return out,
        Some(Value::Array(rules)) => rules,
        Some(_) => {
            out.malformed.push("spec.rules: expected a list".to_string());
            return out;
        }
    };
    for (i, rule) in rules.iter().enumerate() {
        let path = format!("spec.rules[{}].backendRefs", i);
        let entries = refs_at(rule.get("backendRefs"), &path);
        collect_refs(&mut out, entries, "", "Service", object.namespace());
    }
    out
}

fn namespace_of(object: &Object) -> Extracted {
    let mut out = Extracted::default();
    if object.gknn().is_namespaced() {
        out.targets.push(Gknn::new(&NAMESPACE, "", object.namespace()));
    }
    out
}
