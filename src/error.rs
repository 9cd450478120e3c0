//! Error types for graph construction, policy discovery and rendering.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by an object fetcher. Not-found is not an error; fetchers
/// return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The backing source could not be reached. Only test fetchers report it.
    #[cfg(test)]
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The source returned an object that cannot be interpreted.
    #[error("invalid object: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum Error {
    /// Fetching a referenced object failed for a reason other than not-found.
    #[error("failed to fetch {target}: {source}")]
    Fetch {
        target: String,
        #[source]
        source: FetchError,
    },

    /// Policy CRD discovery or policy instance listing failed.
    #[error("policy discovery failed for {target}: {source}")]
    PolicyDiscovery {
        target: String,
        #[source]
        source: FetchError,
    },

    /// A pipeline stage failed; later stages did not run.
    #[error("extension {name} failed: {message}")]
    Extension { name: &'static str, message: String },

    /// The graph holds an edge whose target node is missing.
    #[error("edge {from} -[{relation}]-> {to} points at a node that is not in the graph")]
    DanglingEdge {
        from: String,
        relation: &'static str,
        to: String,
    },

    /// A manifest document could not be decoded.
    #[error("failed to decode manifest {path}: {source}")]
    Manifest {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A document lacks apiVersion, kind or name.
    #[error("invalid object in {origin}: {message}")]
    InvalidObject { origin: String, message: String },

    #[error(transparent)]
    Pattern(#[from] regex::Error),

    #[error("duplicate object {0}")]
    DuplicateObject(String),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
