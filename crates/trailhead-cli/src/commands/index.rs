use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use trailhead_core::model::ItemId;
use trailhead_core::ports::{CatalogSource, EmbeddingPort, VectorIndex};
use trailhead_core::SqliteCatalog;
use trailhead_models::Settings;
use trailhead_search::snapshot::{read_snapshot, write_snapshot};
use trailhead_search::{InMemoryVectorIndex, Indexer, RebuildReport};

pub async fn run_index(settings: &Settings) -> Result<()> {
    let ports = trailhead_models::build_ports(settings)?;

    println!("\n🔎 Indexing catalog with {}\n", ports.embedder.name());
    let (index, report) = rebuild(settings, Arc::clone(&ports.embedder)).await?;
    let metadata = save(settings, &index).await?;

    println!("  Indexed: {}/{}", report.indexed, report.total);
    if !report.is_complete() {
        println!("  Failed:  {}", report.failures.len());
        for failure in &report.failures {
            eprintln!("    ✗ [{}] {}: {}", failure.id, failure.name, failure.reason);
        }
    }
    println!("  Snapshot: {}", settings.index_path.display());
    println!("  Built at: {}", metadata.built_at);

    if report.is_complete() {
        println!("\n✓ Index complete");
    } else {
        println!("\n⚠ Index built with failures; re-run `trailhead index` once the model is healthy");
    }
    Ok(())
}

/// Load the saved index, or rebuild it when the snapshot is missing,
/// unreadable, built with a different embedding model, or out of step with
/// the catalog's item ids.
pub async fn warm_index(
    settings: &Settings,
    embedder: Arc<dyn EmbeddingPort>,
) -> Result<Arc<InMemoryVectorIndex>> {
    if let Some(index) = load_current(settings).await? {
        return Ok(Arc::new(index));
    }

    let (index, report) = rebuild(settings, embedder).await?;
    if !report.is_complete() {
        log::warn!(
            "{} of {} items could not be indexed",
            report.failures.len(),
            report.total
        );
    }
    save(settings, &index).await?;
    Ok(index)
}

/// The saved snapshot as an index, if it still mirrors the catalog.
async fn load_current(settings: &Settings) -> Result<Option<InMemoryVectorIndex>> {
    if !settings.index_path.exists() {
        log::info!("No index snapshot found, building one");
        return Ok(None);
    }

    let snapshot = match read_snapshot(&settings.index_path).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            log::warn!("Ignoring unreadable index snapshot: {e}");
            return Ok(None);
        }
    };

    let label = settings.embedder_label();
    let meta = &snapshot.metadata;
    if meta.embedder != label || meta.dimension != settings.embedding.dimension {
        log::warn!(
            "Index snapshot was built with {} ({} dims), rebuilding for {} ({} dims)",
            meta.embedder,
            meta.dimension,
            label,
            settings.embedding.dimension
        );
        return Ok(None);
    }

    let catalog_ids: BTreeSet<ItemId> = SqliteCatalog::new(&settings.database_path)
        .list_all_items()
        .await
        .context("Failed to read catalog")?
        .iter()
        .map(|item| item.id)
        .collect();
    let indexed_ids: BTreeSet<ItemId> = snapshot.records.iter().map(|r| r.id()).collect();
    if catalog_ids != indexed_ids {
        log::warn!(
            "Index snapshot holds {} items but the catalog has {}, rebuilding",
            indexed_ids.len(),
            catalog_ids.len()
        );
        return Ok(None);
    }

    log::info!(
        "Loaded {} vectors from {}",
        meta.item_count,
        settings.index_path.display()
    );
    Ok(Some(snapshot.into_index(settings.embedding.dimension)?))
}

async fn rebuild(
    settings: &Settings,
    embedder: Arc<dyn EmbeddingPort>,
) -> Result<(Arc<InMemoryVectorIndex>, RebuildReport)> {
    let index = Arc::new(InMemoryVectorIndex::new(
        settings.collection.clone(),
        settings.embedding.dimension,
    ));
    let indexer = Indexer::new(
        Arc::new(SqliteCatalog::new(&settings.database_path)),
        embedder,
        Arc::clone(&index) as Arc<dyn VectorIndex>,
    )?
    .with_call_timeout(settings.call_timeout);

    let report = indexer.rebuild().await.context("Index rebuild failed")?;
    Ok((index, report))
}

async fn save(
    settings: &Settings,
    index: &InMemoryVectorIndex,
) -> Result<trailhead_search::IndexMetadata> {
    let metadata = write_snapshot(index, &settings.index_path, &settings.embedder_label())
        .await
        .context("Failed to save index snapshot")?;
    Ok(metadata)
}
