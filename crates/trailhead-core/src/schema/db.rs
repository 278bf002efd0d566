use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::error::Result;
use crate::model::{CatalogItem, ItemId, NewCatalogItem, Price};

use super::migrations::MIGRATIONS;

const ITEM_COLUMNS: &str = "id, name, description, price_cents, image_ref";

/// A database connection with read and insert methods for catalog items.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.conn.execute_batch(migration.sql)?;
                self.conn.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, migration.name],
                )?;
            }
        }

        Ok(())
    }
}

// Item reads and inserts
impl Database {
    /// Insert a new item and return the id the store assigned to it.
    pub fn insert_item(&self, item: &NewCatalogItem) -> Result<ItemId> {
        self.conn.execute(
            "INSERT INTO items (name, description, price_cents, image_ref)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                item.name,
                item.description,
                item.price.cents(),
                item.image_ref,
            ],
        )?;
        Ok(ItemId::new(self.conn.last_insert_rowid()))
    }

    /// Fetch a single item by id.
    pub fn get_item(&self, id: ItemId) -> Result<Option<CatalogItem>> {
        let item = self
            .conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
                [id.get()],
                row_to_item,
            )
            .optional()?;
        Ok(item)
    }

    /// List every item, ordered by id.
    pub fn list_all_items(&self) -> Result<Vec<CatalogItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY id"))?;

        let items = stmt
            .query_map([], row_to_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }

    /// Number of items in the catalog.
    pub fn count_items(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Case-insensitive keyword search over item names and descriptions.
    ///
    /// This is the plain, non-semantic lookup; matches come back in id order.
    pub fn search_items_by_name(&self, term: &str) -> Result<Vec<CatalogItem>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE instr(lower(name), lower(?1)) > 0
                OR instr(lower(description), lower(?1)) > 0
             ORDER BY id"
        ))?;

        let items = stmt
            .query_map([term], row_to_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }
}

fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<CatalogItem> {
    let price_cents: i64 = row.get(3)?;
    let price = Price::from_cents(price_cents).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Integer, Box::new(e))
    })?;

    Ok(CatalogItem {
        id: ItemId::new(row.get(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        price,
        image_ref: row.get(4)?,
    })
}
