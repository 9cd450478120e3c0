//! Topology graph: resource nodes keyed by identity with relation-labelled
//! edges indexed in both directions.
//!
//! The graph owns every node. Nodes are never removed once added; edges,
//! unresolved references and metadata only grow while extensions run.

pub mod builder;
pub mod metadata;
pub mod relations;

pub use builder::Builder;
pub use metadata::{NodeMetadata, ReferenceIssue};
pub use relations::{GATEWAY_RELATIONS, Relation};

use crate::resource::{Gknn, GroupKind, NamespacedName, Object};
use std::collections::{BTreeMap, BTreeSet};

/// Relation name -> target identities.
pub type Neighbors = BTreeMap<&'static str, BTreeSet<Gknn>>;

#[derive(Debug, Clone)]
pub struct Node {
    gknn: Gknn,
    pub object: Object,
    pub out_neighbors: Neighbors,
    pub in_neighbors: Neighbors,
    /// References whose target could not be found. Kept apart from
    /// `out_neighbors` so every neighbor entry always has a node.
    pub unresolved: Neighbors,
    pub metadata: NodeMetadata,
}

impl Node {
    pub fn new(object: Object) -> Self {
        Self {
            gknn: object.gknn().clone(),
            object,
            out_neighbors: Neighbors::new(),
            in_neighbors: Neighbors::new(),
            unresolved: Neighbors::new(),
            metadata: NodeMetadata::default(),
        }
    }

    pub fn gknn(&self) -> &Gknn {
        &self.gknn
    }

    /// Outgoing edges as `(relation, target)` pairs, sorted by relation then target.
    pub fn out_edges(&self) -> impl Iterator<Item = (&'static str, &Gknn)> {
        self.out_neighbors
            .iter()
            .flat_map(|(relation, targets)| targets.iter().map(move |t| (*relation, t)))
    }
}

#[derive(Debug, Clone)]
pub struct Graph {
    pub nodes: BTreeMap<GroupKind, BTreeMap<NamespacedName, Node>>,
    /// Identities of the start objects, in input order.
    pub sources: Vec<Gknn>,
    /// Relations the graph was built with; empty for identity-only graphs.
    pub relations: &'static [Relation],
}

impl Graph {
    pub fn new(relations: &'static [Relation]) -> Self {
        Self {
            nodes: BTreeMap::new(),
            sources: Vec::new(),
            relations,
        }
    }

    /// Insert a node for `object` unless one with the same identity exists.
    /// Returns true when a node was added.
    pub fn insert(&mut self, object: Object) -> bool {
        let gknn = object.gknn().clone();
        let by_name = self.nodes.entry(gknn.group_kind()).or_default();
        let key = gknn.namespaced_name();
        if by_name.contains_key(&key) {
            return false;
        }
        by_name.insert(key, Node::new(object));
        true
    }

    /// Insert a start object and remember it as a source.
    pub fn add_source(&mut self, object: Object) {
        let gknn = object.gknn().clone();
        if self.insert(object) {
            self.sources.push(gknn);
        }
    }

    pub fn contains(&self, gknn: &Gknn) -> bool {
        self.node(gknn).is_some()
    }

    pub fn node(&self, gknn: &Gknn) -> Option<&Node> {
        self.nodes
            .get(&gknn.group_kind())
            .and_then(|by_name| by_name.get(&gknn.namespaced_name()))
    }

    pub fn node_mut(&mut self, gknn: &Gknn) -> Option<&mut Node> {
        self.nodes
            .get_mut(&gknn.group_kind())
            .and_then(|by_name| by_name.get_mut(&gknn.namespaced_name()))
    }

    /// All nodes in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().flat_map(|by_name| by_name.values())
    }

    pub fn gknns(&self) -> Vec<Gknn> {
        self.iter().map(|n| n.gknn().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.values().map(BTreeMap::len).sum()
    }

    pub fn source_nodes(&self) -> Vec<&Node> {
        self.sources.iter().filter_map(|g| self.node(g)).collect()
    }

    /// Record `from -[relation]-> to` in both directions. Both endpoints must
    /// already be nodes; otherwise nothing is recorded and false is returned.
    pub fn add_edge(&mut self, from: &Gknn, relation: &'static str, to: &Gknn) -> bool {
        if !self.contains(from) || !self.contains(to) {
            return false;
        }
        if let Some(node) = self.node_mut(from) {
            node.out_neighbors
                .entry(relation)
                .or_default()
                .insert(to.clone());
        }
        if let Some(node) = self.node_mut(to) {
            node.in_neighbors
                .entry(relation)
                .or_default()
                .insert(from.clone());
        }
        true
    }

    pub fn record_unresolved(&mut self, from: &Gknn, relation: &'static str, target: Gknn) {
        if let Some(node) = self.node_mut(from) {
            node.unresolved.entry(relation).or_default().insert(target);
        }
    }
}

/// Stable sort by full identity, for printing nodes grouped by kind.
pub fn sorted_nodes<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Vec<&'a Node> {
    let mut out: Vec<&Node> = nodes.into_iter().collect();
    out.sort_by(|a, b| a.gknn().cmp(b.gknn()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::gknn::{GATEWAY, HTTP_ROUTE, SERVICE};
    use crate::resource::object::object_from_yaml;
    use pretty_assertions::assert_eq;

    fn obj(api_version: &str, kind: &str, ns: &str, name: &str) -> Object {
        object_from_yaml(&format!(
            "apiVersion: {api_version}\nkind: {kind}\nmetadata:\n  name: {name}\n  namespace: {ns}\n"
        ))
    }

    #[test]
    fn edges_are_mirrored() {
        let mut graph = Graph::new(&[]);
        graph.add_source(obj("gateway.networking.k8s.io/v1", "HTTPRoute", "default", "r"));
        graph.insert(obj("gateway.networking.k8s.io/v1", "Gateway", "default", "g"));

        let route = Gknn::new(&HTTP_ROUTE, "default", "r");
        let gateway = Gknn::new(&GATEWAY, "default", "g");
        assert!(graph.add_edge(&route, "ParentRef", &gateway));

        let back = &graph.node(&gateway).unwrap().in_neighbors["ParentRef"];
        assert!(back.contains(&route));
        assert_eq!(graph.sources, vec![route]);
    }

    #[test]
    fn edges_to_missing_nodes_are_refused() {
        let mut graph = Graph::new(&[]);
        graph.insert(obj("gateway.networking.k8s.io/v1", "HTTPRoute", "default", "r"));
        let route = Gknn::new(&HTTP_ROUTE, "default", "r");
        let svc = Gknn::new(&SERVICE, "default", "missing");
        assert!(!graph.add_edge(&route, "BackendRef", &svc));
        assert!(graph.node(&route).unwrap().out_neighbors.is_empty());
    }

    #[test]
    fn sorted_nodes_orders_by_identity() {
        let mut graph = Graph::new(&[]);
        graph.add_source(obj("v1", "Service", "b", "svc"));
        graph.add_source(obj("gateway.networking.k8s.io/v1", "Gateway", "a", "gw"));
        graph.add_source(obj("v1", "Service", "a", "svc"));

        let sorted: Vec<String> = sorted_nodes(graph.source_nodes())
            .iter()
            .map(|n| n.gknn().to_string())
            .collect();
        assert_eq!(
            sorted,
            vec![
                "Service/a/svc",
                "Service/b/svc",
                "Gateway.gateway.networking.k8s.io/a/gw",
            ]
        );
    }

    #[test]
    fn duplicate_sources_are_kept_once() {
        let mut graph = Graph::new(&[]);
        graph.add_source(obj("v1", "Service", "a", "svc"));
        graph.add_source(obj("v1", "Service", "a", "svc"));
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.sources.len(), 1);
    }
}
