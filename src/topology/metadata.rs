//! Typed per-node annotations written by the extension pipeline.

use crate::policy::{EffectivePolicy, Policy, PolicyCrd};
use crate::resource::{Gknn, GroupKind};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub struct NodeMetadata {
    /// Set when the node itself stands for a policy instance.
    pub policy: Option<Rc<Policy>>,
    /// Set when the node itself stands for a policy CRD.
    pub policy_crd: Option<Rc<PolicyCrd>>,
    /// Policies whose target refs name this node, keyed by policy identity.
    pub attached_policies: BTreeMap<Gknn, Rc<Policy>>,
    /// Winning policy per policy kind after inheritance. `None` until the
    /// effective-policy extension has run.
    pub effective_policies: Option<BTreeMap<GroupKind, EffectivePolicy>>,
    pub issues: Vec<ReferenceIssue>,
}

impl NodeMetadata {
    pub fn add_issue(&mut self, issue: ReferenceIssue) {
        if !self.issues.contains(&issue) {
            self.issues.push(issue);
        }
    }
}

/// A problem with one outgoing reference of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceIssue {
    /// The referenced object does not exist.
    NotFound {
        relation: &'static str,
        target: Gknn,
    },
    /// The reference crosses namespaces and no ReferenceGrant allows it.
    NotPermitted {
        relation: &'static str,
        target: Gknn,
    },
}

impl fmt::Display for ReferenceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { relation, target } => {
                write!(f, "{} {} not found", relation, target)
            }
            Self::NotPermitted { relation, target } => write!(
                f,
                "{} {} is not permitted by any ReferenceGrant",
                relation, target
            ),
        }
    }
}
