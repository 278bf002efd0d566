use anyhow::{Context, Result};
use std::path::Path;
use trailhead_core::model::CatalogItem;
use trailhead_core::schema::Database;
use trailhead_core::seed::seed_if_empty;

pub fn seed(db_path: &Path) -> Result<()> {
    let db = Database::open(db_path).context("Failed to open catalog database")?;
    let inserted = seed_if_empty(&db)?;

    if inserted == 0 {
        println!("Catalog already has {} items, nothing seeded", db.count_items()?);
    } else {
        println!("✓ Seeded {} items into {}", inserted, db_path.display());
        println!("\n  Run `trailhead index` to build the vector index");
    }
    Ok(())
}

pub fn list_items(db_path: &Path) -> Result<()> {
    let db = Database::open(db_path).context("Failed to open catalog database")?;
    let items = db.list_all_items()?;

    if items.is_empty() {
        println!("Catalog is empty. Run `trailhead seed` to load sample items.");
        return Ok(());
    }
    print_items(&items);
    Ok(())
}

pub fn keyword_search(db_path: &Path, term: &str) -> Result<()> {
    let db = Database::open(db_path).context("Failed to open catalog database")?;
    let items = db.search_items_by_name(term)?;

    if items.is_empty() {
        println!("No items contain \"{}\"", term.trim());
        return Ok(());
    }
    print_items(&items);
    Ok(())
}

fn print_items(items: &[CatalogItem]) {
    for item in items {
        println!(
            "{:>4}  {:<32} {:>9}",
            item.id.to_string(),
            item.name,
            item.price.to_string()
        );
        println!("      {}", item.description);
    }
    println!("\n{} item(s)", items.len());
}
