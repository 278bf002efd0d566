//! SQLite catalog store.

pub mod db;
pub mod migrations;

pub use db::Database;
