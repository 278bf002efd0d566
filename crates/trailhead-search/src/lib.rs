//! Vector search for trailhead.
//!
//! Keeps an in-memory vector index mirroring the catalog, rebuilds it from
//! the catalog store, and answers natural-language queries with a response
//! grounded in the single best-matching item (or an honest "no match").

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod index;
pub mod indexer;
pub mod prompt;
pub mod resolver;
pub mod response;
pub mod snapshot;
pub mod threshold;

pub use index::InMemoryVectorIndex;
pub use indexer::{Indexer, IndexerError, ItemFailure, RebuildReport};
pub use prompt::SystemPrompt;
pub use resolver::{QueryResolver, ResolverSettings};
pub use response::{Resolution, SearchResponse, Stage};
pub use snapshot::IndexMetadata;
pub use threshold::ScoreThreshold;
