//! Core domain model for trailhead.
//!
//! This crate defines the catalog item model, the error taxonomy shared by
//! the search pipeline, the port traits for embedding, generation, vector
//! storage and catalog access, and the SQLite-backed catalog store.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod catalog;
pub mod error;
pub mod model;
pub mod ports;
pub mod schema;
pub mod seed;

pub use catalog::SqliteCatalog;
pub use error::{
    ConfigurationError, EmbeddingError, Error, GenerationError, IndexError, Result,
};
pub use model::{CatalogItem, ItemId, NewCatalogItem, Price};
pub use ports::{
    CatalogSource, ChatMessage, EmbeddingPort, GenerationPort, IndexedVector, Role, SearchHit,
    VectorIndex,
};
