//! Cross-namespace reference validation against ReferenceGrants.
//!
//! An edge `from -[rel]-> to` with `rel` in the configured grant-required set
//! and `from`, `to` in different namespaces is allowed only when a
//! ReferenceGrant in `to`'s namespace lists `from`'s group, kind and namespace
//! under `spec.from` and `to`'s group, kind (and name, if given) under
//! `spec.to`. Disallowed edges stay in the graph; the source node gets a
//! `NotPermitted` issue.

use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::error::Error;
use crate::extension::Extension;
use crate::resource::gknn::REFERENCE_GRANT;
use crate::resource::{Gknn, Object, ObjectFetcher};
use crate::topology::{Graph, ReferenceIssue};
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::BTreeMap;

pub struct ReferenceGrantCheck<'a> {
    fetcher: &'a dyn ObjectFetcher,
    config: &'a Config,
    diagnostics: &'a dyn Diagnostics,
    /// Grants per namespace, listed on first use.
    grants: RefCell<BTreeMap<String, Vec<Grant>>>,
}

#[derive(Debug, Deserialize)]
struct Grant {
    #[serde(default)]
    from: Vec<GrantFrom>,
    #[serde(default)]
    to: Vec<GrantTo>,
}

#[derive(Debug, Deserialize)]
struct GrantFrom {
    #[serde(default)]
    group: String,
    kind: String,
    namespace: String,
}

#[derive(Debug, Deserialize)]
struct GrantTo {
    #[serde(default)]
    group: String,
    kind: String,
    #[serde(default)]
    name: Option<String>,
}

impl Grant {
    fn from_object(object: &Object) -> Result<Self, String> {
        let spec = object.spec().ok_or_else(|| "missing spec".to_string())?;
        Self::deserialize(spec).map_err(|e| e.to_string())
    }

    fn permits(&self, from: &Gknn, to: &Gknn) -> bool {
        let from_ok = self.from.iter().any(|f| {
            f.group == from.group && f.kind == from.kind && f.namespace == from.namespace
        });
        let to_ok = self.to.iter().any(|t| {
            t.group == to.group
                && t.kind == to.kind
                && t.name.as_deref().is_none_or(|name| name.is_empty() || name == to.name)
        });
        from_ok && to_ok
    }
}

impl<'a> ReferenceGrantCheck<'a> {
    pub fn new(
        fetcher: &'a dyn ObjectFetcher,
        config: &'a Config,
        diagnostics: &'a dyn Diagnostics,
    ) -> Self {
        Self {
            fetcher,
            config,
            diagnostics,
            grants: RefCell::new(BTreeMap::new()),
        }
    }

    fn permitted(&self, from: &Gknn, to: &Gknn) -> Result<bool, Error> {
        let mut grants = self.grants.borrow_mut();
        if !grants.contains_key(&to.namespace) {
            let objects = self
                .fetcher
                .list(&REFERENCE_GRANT, Some(&to.namespace))
                .map_err(|source| Error::Fetch {
                    target: format!("{} in namespace {}", REFERENCE_GRANT, to.namespace),
                    source,
                })?;
            let mut parsed = Vec::new();
            for object in objects.iter().filter(|o| o.namespace() == to.namespace) {
                match Grant::from_object(object) {
                    Ok(grant) => parsed.push(grant),
                    Err(message) => self.diagnostics.warn(&format!(
                        "skipping ReferenceGrant {}: {}",
                        object.gknn(),
                        message
                    )),
                }
            }
            grants.insert(to.namespace.clone(), parsed);
        }
        Ok(grants[&to.namespace].iter().any(|g| g.permits(from, to)))
    }
}

impl Extension for ReferenceGrantCheck<'_> {
    fn name(&self) -> &'static str {
        "ReferenceGrantCheck"
    }

    fn execute(&self, graph: &mut Graph) -> Result<(), Error> {
        let mut denied: Vec<(Gknn, ReferenceIssue)> = Vec::new();
        for node in graph.iter() {
            let from = node.gknn();
            for (relation, to) in node.out_edges() {
                if !self.config.requires_grant(relation) {
                    continue;
                }
                if !from.is_namespaced() || !to.is_namespaced() || from.namespace == to.namespace
                {
                    continue;
                }
                if !self.permitted(from, to)? {
                    denied.push((
                        from.clone(),
                        ReferenceIssue::NotPermitted {
                            relation,
                            target: to.clone(),
                        },
                    ));
                }
            }
        }

        for (gknn, issue) in denied {
            if let Some(node) = graph.node_mut(&gknn) {
                node.metadata.add_issue(issue);
            }
        }
        Ok(())
    }
}
