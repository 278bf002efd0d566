//! [`CatalogSource`] backed by the SQLite catalog store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::model::CatalogItem;
use crate::ports::CatalogSource;
use crate::schema::Database;

/// Reads catalog snapshots from a SQLite file.
///
/// `rusqlite::Connection` is not `Sync`, so each snapshot opens its own
/// connection on the blocking pool and drops it before returning.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    path: PathBuf,
}

impl SqliteCatalog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CatalogSource for SqliteCatalog {
    async fn list_all_items(&self) -> Result<Vec<CatalogItem>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Database::open(&path)?.list_all_items())
            .await
            .map_err(|e| Error::InvalidData(format!("catalog read task failed: {e}")))?
    }
}
