//! Effective policies: merge each node's direct policies with the inheritable
//! policies of its ancestors.
//!
//! Ancestors are found breadth-first along the configured inheritance links,
//! so every ancestor is seen at its shortest distance. Per policy kind the
//! candidate with the smallest distance wins (a direct policy has distance 0);
//! ties at the same distance go to [`Policy::precedence`]. Only inheritable
//! policies count at distance > 0.

use crate::config::{Config, Direction};
use crate::error::Error;
use crate::extension::Extension;
use crate::policy::{EffectivePolicy, Policy, PolicyOrigin};
use crate::resource::{Gknn, GroupKind};
use crate::topology::Graph;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::rc::Rc;

pub struct EffectivePolicies<'a> {
    config: &'a Config,
}

impl<'a> EffectivePolicies<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Ancestors of `start` with their distance, nearest first.
    fn ancestors(&self, graph: &Graph, start: &Gknn) -> Vec<(Gknn, usize)> {
        let mut seen = BTreeSet::from([start.clone()]);
        let mut queue = VecDeque::from([(start.clone(), 0usize)]);
        let mut out = Vec::new();

        while let Some((current, distance)) = queue.pop_front() {
            let Some(node) = graph.node(&current) else {
                continue;
            };
            for link in &self.config.inheritance {
                let neighbors = match link.direction {
                    Direction::Outgoing => node.out_neighbors.get(link.relation.as_str()),
                    Direction::Incoming => node.in_neighbors.get(link.relation.as_str()),
                };
                for next in neighbors.into_iter().flatten() {
                    if seen.insert(next.clone()) {
                        out.push((next.clone(), distance + 1));
                        queue.push_back((next.clone(), distance + 1));
                    }
                }
            }
        }
        out
    }

    fn resolve(&self, graph: &Graph, gknn: &Gknn) -> BTreeMap<GroupKind, EffectivePolicy> {
        let mut winners: BTreeMap<GroupKind, (usize, EffectivePolicy)> = BTreeMap::new();
        let mut offer = |policy: &Rc<Policy>, distance: usize, origin: PolicyOrigin| {
            let kind = policy.gknn().group_kind();
            let better = match winners.get(&kind) {
                None => true,
                Some((best, current)) => match distance.cmp(best) {
                    Ordering::Less => true,
                    Ordering::Equal => policy.precedence(&current.policy) == Ordering::Less,
                    Ordering::Greater => false,
                },
            };
            if better {
                let effective = EffectivePolicy {
                    policy: Rc::clone(policy),
                    origin,
                };
                winners.insert(kind, (distance, effective));
            }
        };

        if let Some(node) = graph.node(gknn) {
            for policy in node.metadata.attached_policies.values() {
                offer(policy, 0, PolicyOrigin::Direct);
            }
        }
        for (ancestor, distance) in self.ancestors(graph, gknn) {
            let Some(node) = graph.node(&ancestor) else {
                continue;
            };
            for policy in node.metadata.attached_policies.values() {
                if policy.inheritable {
                    let origin = PolicyOrigin::Inherited {
                        from: ancestor.clone(),
                        distance,
                    };
                    offer(policy, distance, origin);
                }
            }
        }

        winners
            .into_iter()
            .map(|(kind, (_, effective))| (kind, effective))
            .collect()
    }
}

impl Extension for EffectivePolicies<'_> {
    fn name(&self) -> &'static str {
        "EffectivePolicies"
    }

    fn execute(&self, graph: &mut Graph) -> Result<(), Error> {
        if !graph.relations.is_empty() {
            for link in &self.config.inheritance {
                if !graph.relations.iter().any(|r| r.name == link.relation) {
                    return Err(Error::Extension {
                        name: self.name(),
                        message: format!("inheritance link uses unknown relation {:?}", link.relation),
                    });
                }
            }
        }

        // Resolve everything against the attachment state before writing.
        let resolved: Vec<(Gknn, BTreeMap<GroupKind, EffectivePolicy>)> = graph
            .gknns()
            .into_iter()
            .map(|gknn| {
                let effective = self.resolve(graph, &gknn);
                (gknn, effective)
            })
            .collect();

        for (gknn, effective) in resolved {
            if let Some(node) = graph.node_mut(&gknn) {
                node.metadata.effective_policies = Some(effective);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InheritanceLink;
    use crate::diagnostics::RecordingDiagnostics;
    use crate::extension::{PolicyAttachment, execute_all};
    use crate::policy::PolicyManager;
    use crate::resource::{ObjectFetcher, ObjectStore};
    use crate::resource::gknn::{GATEWAY, HTTP_ROUTE, NAMESPACE, SERVICE};
    use crate::topology::{Builder, GATEWAY_RELATIONS};
    use pretty_assertions::assert_eq;

    const POLICIES: &str = include_str!("../../testdata/policies.yaml");

    fn timeout() -> GroupKind {
        GroupKind::new("bar.com", "TimeoutPolicy")
    }

    /// Build the full graph for `text`, attach policies and run the merge.
    fn annotated(text: &str, config: &Config) -> Graph {
        let store = ObjectStore::from_yaml_str(text, "policies.yaml").unwrap();
        let diagnostics = RecordingDiagnostics::default();
        let mut manager = PolicyManager::new(&store, &diagnostics, config);
        manager.init().unwrap();

        let mut graph = Builder::new(&store, &diagnostics)
            .start_from(store.list(&GATEWAY, None).unwrap())
            .use_relations(GATEWAY_RELATIONS)
            .build()
            .unwrap();
        let attachment = PolicyAttachment::new(&manager, &diagnostics);
        let effective = EffectivePolicies::new(config);
        execute_all(&mut graph, &[&attachment, &effective], &diagnostics).unwrap();
        graph
    }

    fn effective_of(graph: &Graph, gknn: &Gknn) -> BTreeMap<GroupKind, EffectivePolicy> {
        graph
            .node(gknn)
            .unwrap()
            .metadata
            .effective_policies
            .clone()
            .expect("effective policies computed")
    }

    #[test]
    fn direct_policy_beats_inherited_one() {
        let graph = annotated(POLICIES, &Config::default());
        let route = effective_of(&graph, &Gknn::new(&HTTP_ROUTE, "default", "demo-httproute"));

        let winner = &route[&timeout()];
        assert_eq!(winner.policy.gknn().name, "timeout-policy-route");
        assert_eq!(winner.origin, PolicyOrigin::Direct);
    }

    #[test]
    fn non_inheritable_policies_stay_on_their_target() {
        let graph = annotated(POLICIES, &Config::default());
        let gateway = effective_of(&graph, &Gknn::new(&GATEWAY, "default", "demo-gateway"));
        let route = effective_of(&graph, &Gknn::new(&HTTP_ROUTE, "default", "demo-httproute"));

        let health = GroupKind::new("foo.com", "HealthCheckPolicy");
        assert!(gateway.contains_key(&health));
        assert!(!route.contains_key(&health));
    }

    #[test]
    fn equal_distance_goes_to_the_older_policy() {
        // Both the class and the namespace are one hop from the gateway.
        let graph = annotated(POLICIES, &Config::default());
        let gateway = effective_of(&graph, &Gknn::new(&GATEWAY, "default", "demo-gateway"));

        let winner = &gateway[&timeout()];
        assert_eq!(winner.policy.gknn().name, "timeout-policy-class");
        assert_eq!(
            winner.origin,
            PolicyOrigin::Inherited {
                from: Gknn::new(&crate::resource::gknn::GATEWAY_CLASS, "", "demo-gateway-class"),
                distance: 1,
            }
        );
    }

    #[test]
    fn nearer_ancestor_wins() {
        // Without the namespace link the service sees the route at distance 1
        // and the class at distance 3.
        let config = Config {
            inheritance: vec![
                InheritanceLink {
                    relation: "GatewayClass".to_string(),
                    direction: Direction::Outgoing,
                },
                InheritanceLink {
                    relation: "ParentRef".to_string(),
                    direction: Direction::Outgoing,
                },
                InheritanceLink {
                    relation: "BackendRef".to_string(),
                    direction: Direction::Incoming,
                },
            ],
            ..Config::default()
        };
        let graph = annotated(POLICIES, &config);
        let service = effective_of(&graph, &Gknn::new(&SERVICE, "default", "demo-svc"));

        let winner = &service[&timeout()];
        assert_eq!(winner.policy.gknn().name, "timeout-policy-route");
        assert_eq!(
            winner.origin,
            PolicyOrigin::Inherited {
                from: Gknn::new(&HTTP_ROUTE, "default", "demo-httproute"),
                distance: 1,
            }
        );

        let namespace = effective_of(&graph, &Gknn::new(&NAMESPACE, "", "default"));
        assert_eq!(namespace[&timeout()].origin, PolicyOrigin::Direct);
    }

    #[test]
    fn unknown_inheritance_relation_fails() {
        let store = ObjectStore::from_yaml_str(POLICIES, "policies.yaml").unwrap();
        let diagnostics = RecordingDiagnostics::default();
        let mut graph = Builder::new(&store, &diagnostics)
            .start_from(store.list(&GATEWAY, None).unwrap())
            .use_relations(GATEWAY_RELATIONS)
            .build()
            .unwrap();

        let config = Config {
            inheritance: vec![InheritanceLink {
                relation: "Owner".to_string(),
                direction: Direction::Outgoing,
            }],
            ..Config::default()
        };
        let err = EffectivePolicies::new(&config)
            .execute(&mut graph)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "extension EffectivePolicies failed: inheritance link uses unknown relation \"Owner\""
        );
    }
}
