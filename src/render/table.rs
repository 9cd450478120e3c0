//! Table printer for `get`.
//!
//! Rows are built as plain strings first (that is what tests look at) and laid
//! out with `tabled` only at the end.

use crate::policy::parse::policy_type;
use crate::policy::{Policy, PolicyCrd};
use crate::resource::Gknn;
use crate::topology::Node;
use chrono::{DateTime, Duration, Utc};
use std::rc::Rc;
use tabled::builder::Builder;
use tabled::settings::Style;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn new(header: &[&str]) -> Self {
        Self {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.header.clone());
        for row in &self.rows {
            builder.push_record(row.clone());
        }
        let mut table = builder.build();
        table.with(Style::blank());
        table.to_string()
    }
}

/// Rows for plain resources. The NAMESPACE column is shown when any node is
/// namespaced; `wide` adds effective policies and reference issues.
pub fn resource_table(nodes: &[&Node], wide: bool, now: DateTime<Utc>) -> Table {
    let namespaced = nodes.iter().any(|n| n.gknn().is_namespaced());
    let mut header = Vec::new();
    if namespaced {
        header.push("NAMESPACE");
    }
    header.extend(["NAME", "AGE"]);
    if wide {
        header.extend(["POLICIES", "ISSUES"]);
    }

    let mut table = Table::new(&header);
    for node in nodes {
        let mut row = Vec::new();
        if namespaced {
            row.push(node.gknn().namespace.clone());
        }
        row.push(node.gknn().name.clone());
        row.push(age(node.object.creation_timestamp, now));
        if wide {
            row.push(effective_policy_summary(node));
            row.push(node.metadata.issues.len().to_string());
        }
        table.rows.push(row);
    }
    table
}

pub fn policy_table<'a>(
    policies: impl IntoIterator<Item = &'a Rc<Policy>>,
    now: DateTime<Utc>,
) -> Table {
    let mut table = Table::new(&[
        "NAMESPACE",
        "NAME",
        "KIND",
        "TARGET(S)",
        "POLICY TYPE",
        "ACCEPTED",
        "AGE",
    ]);
    for policy in policies {
        table.rows.push(vec![
            policy.gknn().namespace.clone(),
            policy.gknn().name.clone(),
            policy.gknn().group_kind().to_string(),
            targets(&policy.target_refs),
            policy_type(policy.inheritable).to_string(),
            policy.accepted_status().to_string(),
            age(policy.object().creation_timestamp, now),
        ]);
    }
    table
}

pub fn policy_crd_table<'a>(
    crds: impl IntoIterator<Item = &'a Rc<PolicyCrd>>,
    now: DateTime<Utc>,
) -> Table {
    let mut table = Table::new(&["NAME", "POLICY TYPE", "SCOPE", "AGE"]);
    for crd in crds {
        table.rows.push(vec![
            crd.name().to_string(),
            policy_type(crd.inheritable).to_string(),
            crd.scope.to_string(),
            age(crd.object().creation_timestamp, now),
        ]);
    }
    table
}

fn effective_policy_summary(node: &Node) -> String {
    match &node.metadata.effective_policies {
        Some(effective) if !effective.is_empty() => effective
            .values()
            .map(|e| format!("{}/{}", e.policy.gknn().kind, e.policy.gknn().name))
            .collect::<Vec<_>>()
            .join(", "),
        _ => "None".to_string(),
    }
}

/// At most two targets, then `...`.
fn targets(refs: &[Gknn]) -> String {
    let shown: Vec<String> = refs.iter().take(2).map(|r| r.to_string()).collect();
    let mut out = shown.join(", ");
    if refs.len() > 2 {
        out.push_str(", ...");
    }
    out
}

fn age(created: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match created {
        Some(created) => human_duration(now - created),
        None => "<unknown>".to_string(),
    }
}

/// kubectl-style short duration: `45s`, `3m20s`, `5h`, `2d3h`, `1y20d`.
fn human_duration(d: Duration) -> String {
    if d < Duration::seconds(-1) {
        return "<invalid>".to_string();
    }
    if d < Duration::zero() {
        return "0s".to_string();
    }

    let seconds = d.num_seconds();
    let minutes = d.num_minutes();
    let hours = d.num_hours();
    let days = d.num_days();

    if seconds < 60 * 2 {
        format!("{}s", seconds)
    } else if minutes < 10 {
        match seconds % 60 {
            0 => format!("{}m", minutes),
            s => format!("{}m{}s", minutes, s),
        }
    } else if minutes < 60 * 3 {
        format!("{}m", minutes)
    } else if hours < 8 {
        match minutes % 60 {
            0 => format!("{}h", hours),
            m => format!("{}h{}m", hours, m),
        }
    } else if hours < 48 {
        format!("{}h", hours)
    } else if hours < 24 * 8 {
        match hours % 24 {
            0 => format!("{}d", days),
            h => format!("{}d{}h", days, h),
        }
    } else if hours < 24 * 365 * 2 {
        format!("{}d", days)
    } else if hours < 24 * 365 * 8 {
        match days % 365 {
            0 => format!("{}y", days / 365),
            dy => format!("{}y{}d", days / 365, dy),
        }
    } else {
        format!("{}y", days / 365)
    }
}
