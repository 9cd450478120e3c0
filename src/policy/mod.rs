//! Policy model: policy CRDs, policy instances and their acceptance status.

pub mod manager;
pub mod parse;

pub use manager::PolicyManager;

use crate::resource::{Gknn, GroupKind, Object};
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// A policy instance with its resolved targets.
#[derive(Debug, Clone)]
pub struct Policy {
    object: Object,
    pub target_refs: Vec<Gknn>,
    /// Copied from the policy's CRD classification.
    pub inheritable: bool,
    pub ancestors: Vec<AncestorStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorStatus {
    pub ancestor_ref: Gknn,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
}

impl Policy {
    pub fn new(
        object: Object,
        target_refs: Vec<Gknn>,
        inheritable: bool,
        ancestors: Vec<AncestorStatus>,
    ) -> Self {
        Self {
            object,
            target_refs,
            inheritable,
            ancestors,
        }
    }

    pub fn gknn(&self) -> &Gknn {
        self.object.gknn()
    }

    pub fn object(&self) -> &Object {
        &self.object
    }

    pub fn spec(&self) -> Option<&Value> {
        self.object.spec()
    }

    pub fn accepted_status(&self) -> AcceptedStatus {
        AcceptedStatus::aggregate(&self.ancestors)
    }

    /// Conflict order between two policies of the same kind at the same
    /// hierarchy distance: the oldest wins, then identity order. Policies
    /// without a creation timestamp sort last.
    pub fn precedence(&self, other: &Policy) -> Ordering {
        let created = |p: &Policy| (p.object.creation_timestamp.is_none(), p.object.creation_timestamp);
        created(self)
            .cmp(&created(other))
            .then_with(|| self.gknn().cmp(other.gknn()))
    }
}

/// Aggregated acceptance over all ancestors of a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptedStatus {
    Unknown,
    True,
    Partial,
    False,
}

impl AcceptedStatus {
    pub fn aggregate(ancestors: &[AncestorStatus]) -> Self {
        let total = ancestors.len();
        let accepted = ancestors
            .iter()
            .filter(|a| {
                a.conditions
                    .iter()
                    .any(|c| c.type_ == "Accepted" && c.status == "True")
            })
            .count();

        if total == 0 {
            Self::Unknown
        } else if accepted == total {
            Self::True
        } else if accepted > 0 {
            Self::Partial
        } else {
            Self::False
        }
    }
}

impl fmt::Display for AcceptedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "Unknown",
            Self::True => "True",
            Self::Partial => "Partial",
            Self::False => "False",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyScope {
    Namespaced,
    Cluster,
}

impl fmt::Display for PolicyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Namespaced => f.write_str("Namespaced"),
            Self::Cluster => f.write_str("Cluster"),
        }
    }
}

/// A CRD that defines a policy kind.
#[derive(Debug, Clone)]
pub struct PolicyCrd {
    object: Object,
    /// Group and kind of the policy instances this CRD defines.
    pub policy_kind: GroupKind,
    pub inheritable: bool,
    pub scope: PolicyScope,
}

impl PolicyCrd {
    pub fn new(object: Object, policy_kind: GroupKind, inheritable: bool, scope: PolicyScope) -> Self {
        Self {
            object,
            policy_kind,
            inheritable,
            scope,
        }
    }

    pub fn gknn(&self) -> &Gknn {
        self.object.gknn()
    }

    pub fn name(&self) -> &str {
        self.object.name()
    }

    pub fn object(&self) -> &Object {
        &self.object
    }
}

/// Where a node's effective policy comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOrigin {
    Direct,
    Inherited { from: Gknn, distance: usize },
}

#[derive(Debug, Clone)]
pub struct EffectivePolicy {
    pub policy: Rc<Policy>,
    pub origin: PolicyOrigin,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::gknn::GATEWAY;
    use pretty_assertions::assert_eq;

    fn ancestor(name: &str, accepted: Option<&str>) -> AncestorStatus {
        AncestorStatus {
            ancestor_ref: Gknn::new(&GATEWAY, "default", name),
            conditions: accepted
                .map(|status| {
                    vec![
                        Condition {
                            type_: "ResolvedRefs".to_string(),
                            status: "True".to_string(),
                        },
                        Condition {
                            type_: "Accepted".to_string(),
                            status: status.to_string(),
                        },
                    ]
                })
                .unwrap_or_default(),
        }
    }

    #[test]
    fn no_ancestors_is_unknown() {
        assert_eq!(AcceptedStatus::aggregate(&[]), AcceptedStatus::Unknown);
    }

    #[test]
    fn all_accepted_is_true() {
        let ancestors = vec![ancestor("a", Some("True")), ancestor("b", Some("True"))];
        assert_eq!(AcceptedStatus::aggregate(&ancestors), AcceptedStatus::True);
    }

    #[test]
    fn some_accepted_is_partial() {
        let ancestors = vec![
            ancestor("a", Some("True")),
            ancestor("b", Some("False")),
            ancestor("c", None),
        ];
        assert_eq!(AcceptedStatus::aggregate(&ancestors), AcceptedStatus::Partial);
    }

    #[test]
    fn none_accepted_is_false() {
        let ancestors = vec![ancestor("a", Some("False")), ancestor("b", None)];
        assert_eq!(AcceptedStatus::aggregate(&ancestors), AcceptedStatus::False);
        assert_eq!(AcceptedStatus::False.to_string(), "False");
    }
}
