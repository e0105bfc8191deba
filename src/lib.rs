//! Versioned taxonomy dataset builder for the LOTUS project.
//!
//! Resolves a named release of the reference taxonomy into download
//! objectives, retrieves them through a batch downloader, and independently
//! assembles taxon-to-parent hierarchies from cached SPARQL query results.

pub mod cache;
pub mod dataset;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod records;
pub mod settings;
pub mod sparql;
pub mod wikidata;
