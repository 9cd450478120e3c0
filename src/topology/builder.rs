//! Graph construction by closure over relation extraction.
//!
//! Without relations the builder returns an identity-only graph (one node per
//! start object, no edges). With relations it expands nodes breadth-first:
//! 1) forward: apply every relation to the node's object and fetch targets
//!    that are not nodes yet;
//! 2) backward: when the node has a relation's target kind, list objects of
//!    the relation's source kind and add those that reference the node.
//!
//! A target the fetcher reports as missing is recorded as an unresolved
//! reference on the source node; any other fetch error aborts the build.

use crate::diagnostics::Diagnostics;
use crate::error::{Error, FetchError};
use crate::resource::{Gknn, GroupKind, Object, ObjectFetcher};
use crate::topology::{Graph, Relation};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

pub struct Builder<'a> {
    fetcher: &'a dyn ObjectFetcher,
    diagnostics: &'a dyn Diagnostics,
    sources: Vec<Object>,
    relations: Option<&'static [Relation]>,
}

impl<'a> Builder<'a> {
    pub fn new(fetcher: &'a dyn ObjectFetcher, diagnostics: &'a dyn Diagnostics) -> Self {
        Self {
            fetcher,
            diagnostics,
            sources: Vec::new(),
            relations: None,
        }
    }

    pub fn start_from(mut self, objects: Vec<Object>) -> Self {
        self.sources = objects;
        self
    }

    pub fn use_relations(mut self, relations: &'static [Relation]) -> Self {
        self.relations = Some(relations);
        self
    }

    pub fn build(self) -> Result<Graph, Error> {
        let relations = self.relations.unwrap_or(&[]);
        let mut graph = Graph::new(relations);
        for object in self.sources {
            graph.add_source(object);
        }

        if self.relations.is_none() {
            return Ok(graph);
        }

        let mut closure = Closure {
            queue: graph.sources.iter().cloned().collect(),
            graph,
            fetcher: self.fetcher,
            diagnostics: self.diagnostics,
            relations,
            listings: BTreeMap::new(),
            missing: BTreeSet::new(),
        };
        while let Some(current) = closure.queue.pop_front() {
            closure.expand(&current)?;
        }

        self.diagnostics.debug(&format!(
            "built graph with {} nodes from {} sources",
            closure.graph.len(),
            closure.graph.sources.len()
        ));
        Ok(closure.graph)
    }
}

struct Closure<'a> {
    graph: Graph,
    fetcher: &'a dyn ObjectFetcher,
    diagnostics: &'a dyn Diagnostics,
    relations: &'static [Relation],
    /// Nodes inserted but not expanded yet.
    queue: VecDeque<Gknn>,
    /// Per-build cache of listings used for referrer discovery.
    listings: BTreeMap<GroupKind, Vec<Object>>,
    /// Targets already reported missing by the fetcher.
    missing: BTreeSet<Gknn>,
}

impl Closure<'_> {
    fn expand(&mut self, current: &Gknn) -> Result<(), Error> {
        let object = match self.graph.node(current) {
            Some(node) => node.object.clone(),
            None => return Ok(()),
        };
        let group_kind = object.group_kind();

        for relation in self.relations {
            let extracted = relation.extract(&object);
            for message in &extracted.malformed {
                self.diagnostics.warn(&format!(
                    "{}: skipping malformed {} reference {}",
                    current, relation.name, message
                ));
            }
            for target in extracted.targets {
                if self.ensure_node(&target)? {
                    self.graph.add_edge(current, relation.name, &target);
                } else {
                    self.graph.record_unresolved(current, relation.name, target);
                }
            }

            let Some(from) = &relation.from else {
                continue;
            };
            if relation.to != group_kind {
                continue;
            }
            let referrers: Vec<Object> = self
                .listing(from)?
                .iter()
                .filter(|candidate| relation.targets(candidate).contains(current))
                .cloned()
                .collect();
            for referrer in referrers {
                let id = referrer.gknn().clone();
                if self.graph.insert(referrer) {
                    self.queue.push_back(id.clone());
                }
                self.graph.add_edge(&id, relation.name, current);
            }
        }
        Ok(())
    }

    /// Make sure `target` is a node, fetching it if needed. Returns false when
    /// the object does not exist.
    fn ensure_node(&mut self, target: &Gknn) -> Result<bool, Error> {
        if self.graph.contains(target) {
            return Ok(true);
        }
        if self.missing.contains(target) {
            return Ok(false);
        }

        let fetched = self.fetcher.fetch(target).map_err(|source| Error::Fetch {
            target: target.to_string(),
            source,
        })?;
        match fetched {
            Some(object) if object.gknn() == target => {
                self.graph.insert(object);
                self.queue.push_back(target.clone());
                Ok(true)
            }
            Some(object) => Err(Error::Fetch {
                target: target.to_string(),
                source: FetchError::Invalid(format!("fetcher returned {}", object.gknn())),
            }),
            None => {
                self.diagnostics
                    .debug(&format!("referenced object {} not found", target));
                self.missing.insert(target.clone());
                Ok(false)
            }
        }
    }

    fn listing(&mut self, group_kind: &GroupKind) -> Result<&Vec<Object>, Error> {
        if !self.listings.contains_key(group_kind) {
            let objects = self
                .fetcher
                .list(group_kind, None)
                .map_err(|source| Error::Fetch {
                    target: group_kind.to_string(),
                    source,
                })?;
            self.listings.insert(group_kind.clone(), objects);
        }
        Ok(&self.listings[group_kind])
    }
}
