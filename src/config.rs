//! Tool configuration, loaded from an optional YAML file.

use crate::resource::GroupKind;
use crate::resource::gknn::{GATEWAY_CLASS, NAMESPACE};
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_POLICY_LABEL: &str = "gateway.networking.k8s.io/policy";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// CRD label whose value (`Inherited` or `Direct`) marks a policy CRD.
    pub policy_label: String,
    /// Links walked, in order, when collecting inherited policies.
    pub inheritance: Vec<InheritanceLink>,
    /// Relations whose cross-namespace edges must be allowed by a ReferenceGrant.
    pub grant_required_relations: Vec<String>,
    /// Kinds resolved without a namespace when a policy targets them.
    pub cluster_scoped_kinds: Vec<GroupKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InheritanceLink {
    pub relation: String,
    pub direction: Direction,
}

/// Which side of a relation is the ancestor. `Outgoing` means the target of
/// `node -[relation]-> target` is the ancestor (a route's gateway);
/// `Incoming` means the source is (a service's routes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

impl InheritanceLink {
    fn new(relation: &str, direction: Direction) -> Self {
        Self {
            relation: relation.to_string(),
            direction,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy_label: DEFAULT_POLICY_LABEL.to_string(),
            inheritance: vec![
                InheritanceLink::new("GatewayClass", Direction::Outgoing),
                InheritanceLink::new("ParentRef", Direction::Outgoing),
                InheritanceLink::new("BackendRef", Direction::Incoming),
                InheritanceLink::new("Namespace", Direction::Outgoing),
            ],
            grant_required_relations: vec!["BackendRef".to_string()],
            cluster_scoped_kinds: vec![GATEWAY_CLASS, NAMESPACE],
        }
    }
}

impl Config {
    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(text).context("failed to parse config")
    }

    /// Load `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::from_yaml_str(&text)
                    .with_context(|| format!("invalid config {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn is_cluster_scoped(&self, group_kind: &GroupKind) -> bool {
        self.cluster_scoped_kinds.contains(group_kind)
    }

    pub fn requires_grant(&self, relation: &str) -> bool {
        self.grant_required_relations.iter().any(|r| r == relation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_fields_use_defaults() {
        let config = Config::from_yaml_str("policy_label: example.com/policy\n").unwrap();
        assert_eq!(config.policy_label, "example.com/policy");
        assert_eq!(config.inheritance, Config::default().inheritance);
        assert!(config.requires_grant("BackendRef"));
        assert!(config.is_cluster_scoped(&GATEWAY_CLASS));
    }

    #[test]
    fn inheritance_can_be_replaced() {
        let config = Config::from_yaml_str(
            r#"
inheritance:
  - relation: ParentRef
    direction: outgoing
grant_required_relations: []
cluster_scoped_kinds:
  - group: gateway.networking.k8s.io
    kind: GatewayClass
"#,
        )
        .unwrap();
        assert_eq!(
            config.inheritance,
            vec![InheritanceLink::new("ParentRef", Direction::Outgoing)]
        );
        assert!(!config.requires_grant("BackendRef"));
        assert!(!config.is_cluster_scoped(&NAMESPACE));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Config::from_yaml_str("inheritence: []\n").is_err());
    }
}
