//! Resource layer: identities, typed objects and the acquisition boundary.
//!
//! Graph and policy code only sees [`Object`] and the [`ObjectFetcher`] trait;
//! where objects come from (manifests here) stays behind that trait.

pub mod gknn;
pub mod object;
pub mod selector;
pub mod store;
pub mod types;

pub use gknn::{Gknn, GroupKind, NamespacedName};
pub use object::Object;
pub use selector::LabelSelector;
pub use store::{ObjectFetcher, ObjectStore};
pub use types::ResourceType;
