//! Identity types for cluster resources.
//!
//! A resource is identified by its API group, kind, namespace and name (GKNN).
//! Cluster-scoped resources carry an empty namespace.
//!
//! All identity types derive `Ord` with fields in identity order so they can be
//! used as `BTreeMap`/`BTreeSet` keys and enumerate deterministically.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// API group of the gateway API resources. Labels drop this group in renderings.
pub const GATEWAY_GROUP: &str = "gateway.networking.k8s.io";

pub const GATEWAY_CLASS: GroupKind = GroupKind::from_static(GATEWAY_GROUP, "GatewayClass");
pub const GATEWAY: GroupKind = GroupKind::from_static(GATEWAY_GROUP, "Gateway");
pub const HTTP_ROUTE: GroupKind = GroupKind::from_static(GATEWAY_GROUP, "HTTPRoute");
pub const GRPC_ROUTE: GroupKind = GroupKind::from_static(GATEWAY_GROUP, "GRPCRoute");
pub const REFERENCE_GRANT: GroupKind = GroupKind::from_static(GATEWAY_GROUP, "ReferenceGrant");
pub const SERVICE: GroupKind = GroupKind::from_static("", "Service");
pub const NAMESPACE: GroupKind = GroupKind::from_static("", "Namespace");
pub const CUSTOM_RESOURCE_DEFINITION: GroupKind =
    GroupKind::from_static("apiextensions.k8s.io", "CustomResourceDefinition");

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKind {
    #[serde(default)]
    pub group: Cow<'static, str>,
    pub kind: Cow<'static, str>,
}

impl GroupKind {
    pub const fn from_static(group: &'static str, kind: &'static str) -> Self {
        Self {
            group: Cow::Borrowed(group),
            kind: Cow::Borrowed(kind),
        }
    }

    pub fn new(group: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: Cow::Owned(group.into()),
            kind: Cow::Owned(kind.into()),
        }
    }

    /// Extract the group from an `apiVersion` such as `gateway.networking.k8s.io/v1`.
    /// Core resources (`v1`) have an empty group.
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        let group = match api_version.split_once('/') {
            Some((group, _version)) => group,
            None => "",
        };
        Self::new(group, kind)
    }
}

/// `Kind.group`, or just `Kind` for the core group.
impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Gknn {
    pub group: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl Gknn {
    pub fn new(
        group_kind: &GroupKind,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            group: group_kind.group.to_string(),
            kind: group_kind.kind.to_string(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn group_kind(&self) -> GroupKind {
        GroupKind::new(self.group.clone(), self.kind.clone())
    }

    pub fn namespaced_name(&self) -> NamespacedName {
        NamespacedName {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }

    pub fn is(&self, group_kind: &GroupKind) -> bool {
        self.group == group_kind.group && self.kind == group_kind.kind
    }

    pub fn is_namespaced(&self) -> bool {
        !self.namespace.is_empty()
    }
}

/// `Kind.group/namespace/name`, omitting the namespace for cluster-scoped resources.
impl fmt::Display for Gknn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gk = GroupKind::new(self.group.clone(), self.kind.clone());
        if self.namespace.is_empty() {
            write!(f, "{}/{}", gk, self.name)
        } else {
            write!(f, "{}/{}/{}", gk, self.namespace, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn group_from_api_version() {
        assert_eq!(
            GroupKind::from_api_version("gateway.networking.k8s.io/v1", "Gateway"),
            GATEWAY
        );
        assert_eq!(GroupKind::from_api_version("v1", "Service"), SERVICE);
    }

    #[test]
    fn display_omits_empty_parts() {
        let gw = Gknn::new(&GATEWAY, "default", "demo-gateway");
        assert_eq!(
            gw.to_string(),
            "Gateway.gateway.networking.k8s.io/default/demo-gateway"
        );

        let class = Gknn::new(&GATEWAY_CLASS, "", "demo-gateway-class");
        assert_eq!(
            class.to_string(),
            "GatewayClass.gateway.networking.k8s.io/demo-gateway-class"
        );

        let svc = Gknn::new(&SERVICE, "default", "demo-svc");
        assert_eq!(svc.to_string(), "Service/default/demo-svc");
    }

    #[test]
    fn ordering_is_group_kind_namespace_name() {
        let mut ids = vec![
            Gknn::new(&HTTP_ROUTE, "default", "b"),
            Gknn::new(&GATEWAY, "z", "a"),
            Gknn::new(&SERVICE, "default", "svc"),
            Gknn::new(&GATEWAY, "a", "z"),
        ];
        ids.sort();
        let rendered: Vec<String> = ids.iter().map(|g| g.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "Service/default/svc",
                "Gateway.gateway.networking.k8s.io/a/z",
                "Gateway.gateway.networking.k8s.io/z/a",
                "HTTPRoute.gateway.networking.k8s.io/default/b",
            ]
        );
    }

    #[test]
    fn borrowed_and_owned_group_kinds_compare_equal() {
        assert_eq!(GroupKind::new(GATEWAY_GROUP, "Gateway"), GATEWAY);
        assert!(Gknn::new(&GATEWAY, "ns", "gw").is(&GATEWAY));
    }
}
