//! Resource type arguments accepted on the command line.

use crate::resource::gknn::{
    GATEWAY, GATEWAY_CLASS, GRPC_ROUTE, GroupKind, HTTP_ROUTE, NAMESPACE, REFERENCE_GRANT,
    SERVICE,
};
use anyhow::bail;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceType {
    /// A plain resource kind listed from the object source.
    Kind(GroupKind),
    /// Policy instances discovered by the policy manager.
    Policies,
    /// Policy CRDs discovered by the policy manager.
    PolicyCrds,
}

impl ResourceType {
    pub fn parse(arg: &str) -> anyhow::Result<Self> {
        let t = match arg.trim().to_ascii_lowercase().as_str() {
            "gatewayclass" | "gatewayclasses" | "gc" => Self::Kind(GATEWAY_CLASS),
            "gateway" | "gateways" | "gw" => Self::Kind(GATEWAY),
            "httproute" | "httproutes" => Self::Kind(HTTP_ROUTE),
            "grpcroute" | "grpcroutes" => Self::Kind(GRPC_ROUTE),
            "referencegrant" | "referencegrants" => Self::Kind(REFERENCE_GRANT),
            "service" | "services" | "svc" | "backend" | "backends" => Self::Kind(SERVICE),
            "namespace" | "namespaces" | "ns" => Self::Kind(NAMESPACE),
            "policy" | "policies" => Self::Policies,
            "policycrd" | "policycrds" => Self::PolicyCrds,
            other => bail!("unknown resource type {:?}", other),
        };
        Ok(t)
    }

    /// Split a comma separated type list (`gateways,httproutes`) keeping order.
    pub fn parse_list(arg: &str) -> anyhow::Result<Vec<Self>> {
        let mut out = Vec::new();
        for part in arg.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let t = Self::parse(part)?;
            if !out.contains(&t) {
                out.push(t);
            }
        }
        if out.is_empty() {
            bail!("at least one resource type must be specified");
        }
        Ok(out)
    }
}
