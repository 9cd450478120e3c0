//! Attach every policy to the graph nodes its target refs name.

use crate::diagnostics::Diagnostics;
use crate::error::Error;
use crate::extension::Extension;
use crate::policy::PolicyManager;
use crate::topology::Graph;
use std::rc::Rc;

pub struct PolicyAttachment<'a> {
    manager: &'a PolicyManager<'a>,
    diagnostics: &'a dyn Diagnostics,
}

impl<'a> PolicyAttachment<'a> {
    pub fn new(manager: &'a PolicyManager<'a>, diagnostics: &'a dyn Diagnostics) -> Self {
        Self {
            manager,
            diagnostics,
        }
    }
}

impl Extension for PolicyAttachment<'_> {
    fn name(&self) -> &'static str {
        "PolicyAttachment"
    }

    fn execute(&self, graph: &mut Graph) -> Result<(), Error> {
        for policy in self.manager.policies() {
            for target in &policy.target_refs {
                match graph.node_mut(target) {
                    Some(node) => {
                        node.metadata
                            .attached_policies
                            .insert(policy.gknn().clone(), Rc::clone(policy));
                    }
                    // Policies for resources outside the requested graph are normal.
                    None => self.diagnostics.debug(&format!(
                        "policy {} targets {} which is not in the graph",
                        policy.gknn(),
                        target
                    )),
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::diagnostics::RecordingDiagnostics;
    use crate::resource::gknn::{GATEWAY, GATEWAY_CLASS, HTTP_ROUTE, SERVICE};
    use crate::resource::{Gknn, ObjectFetcher, ObjectStore};
    use crate::topology::{Builder, GATEWAY_RELATIONS};
    use pretty_assertions::assert_eq;

    const POLICIES: &str = include_str!("../../testdata/policies.yaml");

    #[test]
    fn policies_attach_to_their_targets() {
        let store = ObjectStore::from_yaml_str(POLICIES, "policies.yaml").unwrap();
        let diagnostics = RecordingDiagnostics::default();
        let config = Config::default();
        let mut manager = PolicyManager::new(&store, &diagnostics, &config);
        manager.init().unwrap();

        let mut graph = Builder::new(&store, &diagnostics)
            .start_from(store.list(&GATEWAY, None).unwrap())
            .use_relations(GATEWAY_RELATIONS)
            .build()
            .unwrap();
        PolicyAttachment::new(&manager, &diagnostics)
            .execute(&mut graph)
            .unwrap();

        let attached = |gknn: Gknn| -> Vec<String> {
            graph
                .node(&gknn)
                .unwrap()
                .metadata
                .attached_policies
                .keys()
                .map(|k| k.name.clone())
                .collect()
        };
        assert_eq!(
            attached(Gknn::new(&GATEWAY, "default", "demo-gateway")),
            vec!["health-check-gateway"]
        );
        assert_eq!(
            attached(Gknn::new(&GATEWAY_CLASS, "", "demo-gateway-class")),
            vec!["timeout-policy-class"]
        );
        assert_eq!(
            attached(Gknn::new(&HTTP_ROUTE, "default", "demo-httproute")),
            vec!["timeout-policy-route"]
        );
        assert!(attached(Gknn::new(&SERVICE, "default", "demo-svc")).is_empty());
        assert!(diagnostics.warnings().is_empty());
    }
}
