//! Report references whose target does not exist.

use crate::error::Error;
use crate::extension::Extension;
use crate::resource::Gknn;
use crate::topology::{Graph, ReferenceIssue};

pub struct DanglingReferences;

impl Extension for DanglingReferences {
    fn name(&self) -> &'static str {
        "DanglingReferences"
    }

    fn execute(&self, graph: &mut Graph) -> Result<(), Error> {
        let mut found: Vec<(Gknn, ReferenceIssue)> = Vec::new();
        for node in graph.iter() {
            let unresolved = node
                .unresolved
                .iter()
                .flat_map(|(relation, targets)| targets.iter().map(move |t| (*relation, t)));
            // Graphs assembled by hand may carry edges without a node.
            let missing = node.out_edges().filter(|(_, target)| !graph.contains(target));

            for (relation, target) in unresolved.chain(missing) {
                found.push((
                    node.gknn().clone(),
                    ReferenceIssue::NotFound {
                        relation,
                        target: target.clone(),
                    },
                ));
            }
        }

        for (gknn, issue) in found {
            if let Some(node) = graph.node_mut(&gknn) {
                node.metadata.add_issue(issue);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingDiagnostics;
    use crate::resource::gknn::{HTTP_ROUTE, SERVICE};
    use crate::resource::object::object_from_yaml;
    use crate::resource::{ObjectFetcher, ObjectStore};
    use crate::topology::{Builder, GATEWAY_RELATIONS};
    use pretty_assertions::assert_eq;

    #[test]
    fn unresolved_references_become_issues() {
        let store = ObjectStore::from_yaml_str(
            "apiVersion: gateway.networking.k8s.io/v1\nkind: HTTPRoute\nmetadata:\n  name: r\n  namespace: default\nspec:\n  parentRefs:\n    - name: ghost\n  rules:\n    - backendRefs:\n        - name: nowhere\n",
            "test",
        )
        .unwrap();
        let diagnostics = RecordingDiagnostics::default();
        let mut graph = Builder::new(&store, &diagnostics)
            .start_from(store.list(&HTTP_ROUTE, None).unwrap())
            .use_relations(GATEWAY_RELATIONS)
            .build()
            .unwrap();
        DanglingReferences.execute(&mut graph).unwrap();

        let route = graph.node(&Gknn::new(&HTTP_ROUTE, "default", "r")).unwrap();
        let issues: Vec<String> = route.metadata.issues.iter().map(|i| i.to_string()).collect();
        assert_eq!(
            issues,
            vec![
                "BackendRef Service/default/nowhere not found",
                "ParentRef Gateway.gateway.networking.k8s.io/default/ghost not found",
            ]
        );
    }

    #[test]
    fn every_edge_has_a_node_or_an_issue() {
        let mut graph = Graph::new(&[]);
        let route = object_from_yaml(
            "apiVersion: gateway.networking.k8s.io/v1\nkind: HTTPRoute\nmetadata:\n  name: r\n  namespace: default\n",
        );
        let id = route.gknn().clone();
        graph.add_source(route);
        let missing = Gknn::new(&SERVICE, "default", "gone");
        if let Some(node) = graph.node_mut(&id) {
            node.out_neighbors
                .entry("BackendRef")
                .or_default()
                .insert(missing.clone());
        }

        DanglingReferences.execute(&mut graph).unwrap();
        DanglingReferences.execute(&mut graph).unwrap();

        let node = graph.node(&id).unwrap();
        assert_eq!(
            node.metadata.issues,
            vec![ReferenceIssue::NotFound {
                relation: "BackendRef",
                target: missing,
            }]
        );
    }
}
