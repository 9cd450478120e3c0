//! Graphviz dot renderer.
//!
//! Output is byte-identical for identical graphs: namespaces, nodes and edges
//! are each emitted in an explicit sort order, never in storage order.
//!
//!   gwinspect get gateways -f cluster.yaml -o graph | dot -Tsvg -o topology.svg

use crate::error::Error;
use crate::resource::gknn::{
    GATEWAY, GATEWAY_CLASS, GATEWAY_GROUP, GRPC_ROUTE, HTTP_ROUTE, NAMESPACE, SERVICE,
};
use crate::resource::{Gknn, GroupKind};
use crate::topology::{Graph, Node, sorted_nodes};
use regex::Regex;
use std::collections::BTreeMap;

/// Identifiers matching this pattern are emitted without quotes.
const BARE_ID_RE: &str = r"^[a-zA-Z_][a-zA-Z0-9_]*$";

const DEFAULT_COLOR: &str = "#d8dee9";

const COLORS: &[(GroupKind, &str)] = &[
    (GATEWAY_CLASS, "#e5e9f0"),
    (GATEWAY, "#ebcb8b"),
    (HTTP_ROUTE, "#a3be8c"),
    (SERVICE, "#88c0d0"),
];

/// (source kind, target kind) edges drawn with swapped endpoints and
/// `dir="back"`, so a backend ranks above the route pointing at it.
const REVERSED_EDGES: &[(GroupKind, GroupKind)] = &[(HTTP_ROUTE, SERVICE), (GRPC_ROUTE, SERVICE)];

pub fn to_dot(graph: &Graph) -> Result<String, Error> {
    let bare_id = Regex::new(BARE_ID_RE)?;
    let id = |raw: &str| quote_id(&bare_id, raw);

    let mut out = String::with_capacity(1024);
    out.push_str("digraph {\n");
    out.push_str("\trankdir=\"BT\";\n");
    out.push_str("\tcompound=\"true\";\n");

    // 1) Clusters: one per namespace holding a rendered node.
    let rendered: Vec<&Node> = graph.iter().filter(|n| !n.gknn().is(&NAMESPACE)).collect();
    let mut by_namespace: BTreeMap<&str, Vec<&Node>> = BTreeMap::new();
    let mut cluster_less = Vec::new();
    for node in &rendered {
        if node.gknn().is_namespaced() {
            by_namespace
                .entry(node.gknn().namespace.as_str())
                .or_default()
                .push(*node);
        } else {
            cluster_less.push(*node);
        }
    }

    for (namespace, nodes) in &by_namespace {
        out.push_str(&format!("\tsubgraph {} {{\n", id(&format!("cluster_{}", namespace))));
        out.push_str(&format!("\t\tlabel={};\n", quote(&format!("Namespace: {}", namespace))));
        out.push_str("\t\tstyle=\"dashed\";\n");
        out.push_str("\t\tcolor=\"black\";\n");
        for node in sorted_nodes(nodes.iter().copied()) {
            out.push_str(&format!("\t\t{};\n", node_statement(&id(&node.gknn().to_string()), node.gknn())));
        }
        out.push_str("\t}\n");
    }

    // 2) Cluster-scoped nodes at the top level.
    for node in sorted_nodes(cluster_less) {
        out.push_str(&format!("\t{};\n", node_statement(&id(&node.gknn().to_string()), node.gknn())));
    }

    // 3) Edges by source, relation, target.
    for node in sorted_nodes(rendered) {
        let from = node.gknn();
        for (relation, to) in node.out_edges() {
            if to.is(&NAMESPACE) {
                continue;
            }
            if !graph.contains(to) {
                return Err(Error::DanglingEdge {
                    from: from.to_string(),
                    relation,
                    to: to.to_string(),
                });
            }

            let reversed = REVERSED_EDGES
                .iter()
                .any(|(src, dst)| from.is(src) && to.is(dst));
            let (tail, head, attrs) = if reversed {
                (to, from, format!("dir=\"back\",label={}", quote(relation)))
            } else {
                (from, to, format!("label={}", quote(relation)))
            };
            out.push_str(&format!(
                "\t{}->{}[{}];\n",
                id(&tail.to_string()),
                id(&head.to_string()),
                attrs
            ));
        }
    }

    out.push_str("}\n");
    Ok(out)
}

fn node_statement(id: &str, gknn: &Gknn) -> String {
    let group_kind = gknn.group_kind();
    let color = COLORS
        .iter()
        .find(|(gk, _)| *gk == group_kind)
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_COLOR);
    let kind = if gknn.group == GATEWAY_GROUP {
        gknn.kind.clone()
    } else {
        group_kind.to_string()
    };
    format!(
        "{}[color={},label={},style=\"filled\"]",
        id,
        quote(color),
        quote(&format!("{}\n{}", kind, gknn.name)),
    )
}

fn quote_id(bare_id: &Regex, raw: &str) -> String {
    if bare_id.is_match(raw) {
        raw.to_string()
    } else {
        quote(raw)
    }
}

fn quote(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!("\"{}\"", escaped)
}
