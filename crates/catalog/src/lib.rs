//! Catalog - Product Catalog Semantic Search
//!
//! Flattens delimited product records into text documents, embeds them with a
//! sentence-embedding model, stores the vectors in a Qdrant collection, and
//! serves nearest-neighbour queries through a small web front end.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod records;
pub mod search;
pub mod server;
pub mod store;

pub use error::CatalogError;
