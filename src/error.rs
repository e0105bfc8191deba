use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum TaxonomyError {
    #[error("unknown taxonomy version {version} (available: {})", available.join(", "))]
    VersionNotFound {
        version: String,
        available: Vec<String>,
    },

    #[error("unknown capability {key} (valid: {})", valid.join(", "))]
    UnknownCapability { key: String, valid: Vec<String> },

    #[error("invalid manifest for version {version}: {message}")]
    InvalidManifest { version: String, message: String },

    #[error("remote query failed: {0}")]
    RemoteQueryFailed(String),

    #[error("query endpoint returned status {status}: {message}")]
    QueryStatus { status: u16, message: String },

    #[error("malformed query result: {0}")]
    MalformedQueryResult(String),

    #[error("taxon {taxon} has multiple parents: {existing} and {conflicting}")]
    MultipleParents {
        taxon: String,
        existing: String,
        conflicting: String,
    },

    #[error("taxonomy contains a cycle: {}", cycle.join(" -> "))]
    CyclicTaxonomy { cycle: Vec<String> },

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
