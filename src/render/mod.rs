//! Output for `get` and `describe`: tables, descriptions, dot and raw dumps.

pub mod describe;
pub mod dot;
pub mod table;

pub use dot::to_dot;

use crate::resource::GroupKind;
use crate::topology::{Node, sorted_nodes};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Table,
    Wide,
    Describe,
}

/// Group nodes by kind (in first-seen order), sort each group by identity and
/// print every group with the printer matching its payload.
pub fn render_nodes(nodes: &[&Node], view: View, now: DateTime<Utc>) -> anyhow::Result<String> {
    let mut groups: Vec<(GroupKind, Vec<&Node>)> = Vec::new();
    for node in nodes {
        let group_kind = node.gknn().group_kind();
        match groups.iter_mut().find(|(gk, _)| *gk == group_kind) {
            Some((_, members)) => members.push(*node),
            None => groups.push((group_kind, vec![*node])),
        }
    }

    let mut blocks = Vec::new();
    for (_, members) in groups {
        let members = sorted_nodes(members);
        match view {
            View::Describe => {
                for node in members {
                    blocks.push(describe_one(node)?);
                }
            }
            View::Table | View::Wide => {
                let policies: Vec<_> = members
                    .iter()
                    .filter_map(|n| n.metadata.policy.as_ref())
                    .collect();
                let crds: Vec<_> = members
                    .iter()
                    .filter_map(|n| n.metadata.policy_crd.as_ref())
                    .collect();
                let table = if !policies.is_empty() {
                    table::policy_table(policies, now)
                } else if !crds.is_empty() {
                    table::policy_crd_table(crds, now)
                } else {
                    table::resource_table(&members, view == View::Wide, now)
                };
                if !table.is_empty() {
                    blocks.push(format!("{}\n", table.render()));
                }
            }
        }
    }
    Ok(blocks.join("\n"))
}

fn describe_one(node: &Node) -> anyhow::Result<String> {
    if let Some(policy) = &node.metadata.policy {
        describe::describe_policy(policy)
    } else if let Some(crd) = &node.metadata.policy_crd {
        describe::describe_policy_crd(crd)
    } else {
        describe::describe_node(node)
    }
}

/// Raw objects of `nodes` wrapped in a `List`, as JSON or YAML.
pub fn render_objects(nodes: &[&Node], as_json: bool) -> anyhow::Result<String> {
    let items: Vec<Value> = sorted_nodes(nodes.iter().copied())
        .into_iter()
        .map(|n| n.object.raw().clone())
        .collect();
    let list = json!({
        "apiVersion": "v1",
        "kind": "List",
        "items": items,
    });
    if as_json {
        Ok(format!("{}\n", serde_json::to_string_pretty(&list)?))
    } else {
        Ok(serde_yaml::to_string(&list)?)
    }
}
