//! Describe printer: `Key: value` blocks, nested values as indented YAML.

use crate::policy::parse::policy_type;
use crate::policy::{Policy, PolicyCrd, PolicyOrigin};
use crate::topology::{Neighbors, Node};
use serde_json::{Map, Value, json};

/// Render `pairs` in order. Scalars stay on the key's line, empty values
/// print as `<none>`, everything else goes below the key as YAML.
pub fn describe(pairs: &[(&str, Value)]) -> anyhow::Result<String> {
    let mut out = String::new();
    for (key, value) in pairs {
        match value {
            Value::Null => out.push_str(&format!("{}: <none>\n", key)),
            Value::String(s) => out.push_str(&format!("{}: {}\n", key, s)),
            Value::Bool(_) | Value::Number(_) => out.push_str(&format!("{}: {}\n", key, value)),
            Value::Array(items) if items.is_empty() => out.push_str(&format!("{}: <none>\n", key)),
            Value::Object(fields) if fields.is_empty() => {
                out.push_str(&format!("{}: <none>\n", key))
            }
            _ => {
                out.push_str(&format!("{}:\n", key));
                for line in serde_yaml::to_string(value)?.lines() {
                    out.push_str("  ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
    }
    Ok(out)
}

fn neighbors_value(neighbors: &Neighbors) -> Value {
    let map: Map<String, Value> = neighbors
        .iter()
        .map(|(relation, targets)| {
            let targets = targets.iter().map(|t| Value::String(t.to_string())).collect();
            (relation.to_string(), Value::Array(targets))
        })
        .collect();
    Value::Object(map)
}

/// A resource node with its relations and pipeline annotations.
pub fn describe_node(node: &Node) -> anyhow::Result<String> {
    let gknn = node.gknn();
    let mut pairs: Vec<(&str, Value)> = vec![("Name", json!(gknn.name))];
    if gknn.is_namespaced() {
        pairs.push(("Namespace", json!(gknn.namespace)));
    }
    pairs.push(("Kind", json!(gknn.group_kind().to_string())));
    pairs.push(("Labels", json!(node.object.labels)));
    pairs.push((
        "Spec",
        node.object.spec().cloned().unwrap_or(Value::Null),
    ));
    pairs.push(("References", neighbors_value(&node.out_neighbors)));
    pairs.push(("ReferencedBy", neighbors_value(&node.in_neighbors)));

    let attached: Vec<String> = node
        .metadata
        .attached_policies
        .keys()
        .map(|k| k.to_string())
        .collect();
    pairs.push(("DirectlyAttachedPolicies", json!(attached)));

    if let Some(effective) = &node.metadata.effective_policies {
        let map: Map<String, Value> = effective
            .iter()
            .map(|(kind, e)| {
                let source = match &e.origin {
                    PolicyOrigin::Direct => "Direct".to_string(),
                    PolicyOrigin::Inherited { from, distance } => {
                        format!("Inherited from {} (distance {})", from, distance)
                    }
                };
                let entry = json!({
                    "Name": e.policy.gknn().to_string(),
                    "Source": source,
                    "Spec": e.policy.spec().cloned().unwrap_or(Value::Null),
                });
                (kind.to_string(), entry)
            })
            .collect();
        pairs.push(("EffectivePolicies", Value::Object(map)));
    }

    let issues: Vec<String> = node.metadata.issues.iter().map(|i| i.to_string()).collect();
    if issues.is_empty() {
        pairs.push(("Analysis", json!("No issues found")));
    } else {
        pairs.push(("Analysis", json!(issues)));
    }
    describe(&pairs)
}

pub fn describe_policy(policy: &Policy) -> anyhow::Result<String> {
    let gknn = policy.gknn();
    let targets: Vec<String> = policy.target_refs.iter().map(|t| t.to_string()).collect();
    describe(&[
        ("Name", json!(gknn.name)),
        ("Namespace", json!(gknn.namespace)),
        ("Group", json!(gknn.group)),
        ("Kind", json!(gknn.kind)),
        ("PolicyType", json!(policy_type(policy.inheritable))),
        ("Accepted", json!(policy.accepted_status().to_string())),
        ("TargetRefs", json!(targets)),
        ("Spec", policy.spec().cloned().unwrap_or(Value::Null)),
    ])
}

pub fn describe_policy_crd(crd: &PolicyCrd) -> anyhow::Result<String> {
    let object = crd.object();
    describe(&[
        ("Name", json!(crd.name())),
        ("APIVersion", json!(object.api_version)),
        ("Kind", json!(crd.gknn().kind)),
        ("PolicyKind", json!(crd.policy_kind.to_string())),
        ("PolicyType", json!(policy_type(crd.inheritable))),
        ("Scope", json!(crd.scope.to_string())),
        ("Labels", json!(object.labels)),
        ("Spec", object.spec().cloned().unwrap_or(Value::Null)),
    ])
}
