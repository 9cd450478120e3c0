//! Object acquisition: the fetcher contract used by the graph builder and the
//! policy manager, and a manifest-backed implementation of it.

use crate::error::{Error, FetchError};
use crate::resource::gknn::{Gknn, GroupKind, NAMESPACE};
use crate::resource::object::Object;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

pub trait ObjectFetcher {
    /// Fetch one object. `Ok(None)` means the object does not exist.
    fn fetch(&self, gknn: &Gknn) -> Result<Option<Object>, FetchError>;

    /// List objects of a group-kind, optionally restricted to one namespace.
    /// Cluster-scoped objects are returned regardless of `namespace`.
    fn list(&self, group_kind: &GroupKind, namespace: Option<&str>)
    -> Result<Vec<Object>, FetchError>;
}

/// All objects decoded from a set of YAML manifests, keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct ObjectStore {
    objects: BTreeMap<Gknn, Object>,
}

impl ObjectStore {
    /// Load every document of every file. Later duplicates are rejected.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, Error> {
        let mut store = Self::default();
        for path in paths {
            let path = path.as_ref();
            let text = fs::read_to_string(path).map_err(|source| Error::Io {
                path: path.to_path_buf(),
                source,
            })?;
            store.load_yaml(&text, &path.display().to_string())?;
        }
        store.add_implicit_namespaces();
        Ok(store)
    }

    #[cfg(test)]
    pub fn from_yaml_str(text: &str, origin: &str) -> Result<Self, Error> {
        let mut store = Self::default();
        store.load_yaml(text, origin)?;
        store.add_implicit_namespaces();
        Ok(store)
    }

    fn load_yaml(&mut self, text: &str, origin: &str) -> Result<(), Error> {
        for document in serde_yaml::Deserializer::from_str(text) {
            let value = Value::deserialize(document).map_err(|source| Error::Manifest {
                path: origin.to_string(),
                source,
            })?;
            self.load_value(value, origin)?;
        }
        Ok(())
    }

    fn load_value(&mut self, value: Value, origin: &str) -> Result<(), Error> {
        // Empty documents (e.g. a trailing `---`) decode to null.
        if value.is_null() {
            return Ok(());
        }

        if value.get("kind").and_then(Value::as_str) == Some("List") {
            if let Some(Value::Array(items)) = value.get("items") {
                for item in items {
                    self.load_value(item.clone(), origin)?;
                }
            }
            return Ok(());
        }

        let object = Object::from_value(value, origin)?;
        let key = object.gknn().clone();
        if self.objects.contains_key(&key) {
            return Err(Error::DuplicateObject(format!("{} (in {})", key, origin)));
        }
        self.objects.insert(key, object);
        Ok(())
    }

    /// A cluster always contains the namespaces its objects live in; manifests
    /// often leave them out.
    fn add_implicit_namespaces(&mut self) {
        let referenced: BTreeSet<String> = self
            .objects
            .keys()
            .filter(|gknn| gknn.is_namespaced())
            .map(|gknn| gknn.namespace.clone())
            .collect();

        for namespace in referenced {
            let key = Gknn::new(&NAMESPACE, "", namespace.as_str());
            self.objects
                .entry(key)
                .or_insert_with(|| Object::namespace_object(&namespace));
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }
}

impl ObjectFetcher for ObjectStore {
    fn fetch(&self, gknn: &Gknn) -> Result<Option<Object>, FetchError> {
        Ok(self.objects.get(gknn).cloned())
    }

    fn list(
        &self,
        group_kind: &GroupKind,
        namespace: Option<&str>,
    ) -> Result<Vec<Object>, FetchError> {
        Ok(self
            .objects
            .values()
            .filter(|obj| obj.gknn().is(group_kind))
            .filter(|obj| match namespace {
                Some(ns) => !obj.gknn().is_namespaced() || obj.namespace() == ns,
                None => true,
            })
            .cloned()
            .collect())
    }
}
