use anyhow::Result;
use trailhead_core::schema::Database;
use trailhead_models::Settings;
use trailhead_search::snapshot::read_snapshot;

pub async fn show_status(settings: &Settings) -> Result<()> {
    let db = Database::open(&settings.database_path)?;
    let item_count = db.count_items()?;

    println!("\n📊 Trailhead Status\n");
    println!("  Profile: {}", settings.profile);
    println!("  Database: {}", settings.database_path.display());
    println!("  Catalog items: {}", item_count);
    println!(
        "  Embedder: {} ({} dims)",
        settings.embedder_label(),
        settings.embedding.dimension
    );
    println!(
        "  Generator: {}/{}",
        settings.generation.provider, settings.generation.model
    );
    println!("  Score threshold: {}", settings.resolver.threshold);

    if !settings.index_path.exists() {
        println!("  Index: not built");
        if item_count > 0 {
            println!("\n  Run `trailhead index` to build it");
        } else {
            println!("\n  Run `trailhead seed` to load sample items");
        }
        return Ok(());
    }

    match read_snapshot(&settings.index_path).await {
        Ok(snapshot) => {
            let meta = snapshot.metadata;
            println!("  Index: {} vectors in '{}'", meta.item_count, meta.collection);
            println!("  Index built: {} with {}", meta.built_at, meta.embedder);
            if meta.embedder != settings.embedder_label() {
                println!("\n  ⚠ Index was built with a different embedder; run `trailhead index`");
            } else if meta.item_count < item_count {
                println!(
                    "\n  ⚠ {} catalog items are not indexed; run `trailhead index`",
                    item_count - meta.item_count
                );
            }
        }
        Err(e) => println!("  Index: unreadable ({e})"),
    }

    Ok(())
}
