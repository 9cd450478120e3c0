//! Secondary index over policy CRDs and policy instances.

use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::error::Error;
use crate::policy::parse::{parse_crd, parse_policy};
use crate::policy::{Policy, PolicyCrd};
use crate::resource::gknn::CUSTOM_RESOURCE_DEFINITION;
use crate::resource::{Gknn, ObjectFetcher};
use std::collections::BTreeMap;
use std::rc::Rc;

pub struct PolicyManager<'a> {
    fetcher: &'a dyn ObjectFetcher,
    diagnostics: &'a dyn Diagnostics,
    config: &'a Config,
    crds: BTreeMap<Gknn, Rc<PolicyCrd>>,
    policies: BTreeMap<Gknn, Rc<Policy>>,
}

impl<'a> PolicyManager<'a> {
    pub fn new(
        fetcher: &'a dyn ObjectFetcher,
        diagnostics: &'a dyn Diagnostics,
        config: &'a Config,
    ) -> Self {
        Self {
            fetcher,
            diagnostics,
            config,
            crds: BTreeMap::new(),
            policies: BTreeMap::new(),
        }
    }

    /// Discover policy CRDs and load every instance of every policy kind.
    ///
    /// Either both indexes are populated or an error is returned and the
    /// manager stays empty. Malformed CRDs and policies are skipped with a
    /// warning.
    pub fn init(&mut self) -> Result<(), Error> {
        let definitions = self
            .fetcher
            .list(&CUSTOM_RESOURCE_DEFINITION, None)
            .map_err(|source| Error::PolicyDiscovery {
                target: CUSTOM_RESOURCE_DEFINITION.to_string(),
                source,
            })?;

        let mut crds = BTreeMap::new();
        for object in &definitions {
            match parse_crd(object, self.config) {
                Ok(Some(crd)) => {
                    crds.insert(crd.gknn().clone(), Rc::new(crd));
                }
                Ok(None) => {}
                Err(message) => self.diagnostics.warn(&format!(
                    "skipping policy CRD {}: {}",
                    object.gknn(),
                    message
                )),
            }
        }

        let mut policies = BTreeMap::new();
        for crd in crds.values() {
            let instances = self
                .fetcher
                .list(&crd.policy_kind, None)
                .map_err(|source| Error::PolicyDiscovery {
                    target: crd.policy_kind.to_string(),
                    source,
                })?;
            for object in &instances {
                match parse_policy(object, crd, self.config) {
                    Ok(policy) => {
                        policies.insert(policy.gknn().clone(), Rc::new(policy));
                    }
                    Err(message) => self.diagnostics.warn(&format!(
                        "skipping policy {}: {}",
                        object.gknn(),
                        message
                    )),
                }
            }
        }

        self.diagnostics.debug(&format!(
            "discovered {} policy CRDs and {} policies",
            crds.len(),
            policies.len()
        ));
        self.crds = crds;
        self.policies = policies;
        Ok(())
    }

    /// All policies in identity order.
    pub fn policies(&self) -> impl Iterator<Item = &Rc<Policy>> {
        self.policies.values()
    }

    /// All policy CRDs in identity order.
    pub fn crds(&self) -> impl Iterator<Item = &Rc<PolicyCrd>> {
        self.crds.values()
    }
}
