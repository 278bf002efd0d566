pub mod ask;
pub mod catalog;
pub mod config;
pub mod index;
pub mod status;

pub use ask::run_ask;
pub use catalog::{keyword_search, list_items, seed};
pub use index::run_index;
pub use status::show_status;
