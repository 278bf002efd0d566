use anyhow::{Context, Result};
use std::sync::Arc;
use trailhead_models::Settings;
use trailhead_search::QueryResolver;

use super::index::warm_index;

pub async fn run_ask(settings: &Settings, query: &str, json: bool) -> Result<()> {
    let ports = trailhead_models::build_ports(settings)?;
    let index = warm_index(settings, Arc::clone(&ports.embedder)).await?;

    let resolver = QueryResolver::new(
        ports.embedder,
        index,
        ports.generator,
        settings.resolver.clone(),
    )?;

    log::debug!(
        "Resolving {:?} with threshold {}",
        query,
        resolver.settings().threshold
    );
    let outcome = resolver.resolve_outcome(query).await;
    let (matched, failed) = (outcome.is_matched(), outcome.is_failed());
    let response = outcome.into_response();

    if json {
        let out = serde_json::to_string_pretty(&response).context("Failed to encode response")?;
        println!("{out}");
        return Ok(());
    }

    match response.matched_item() {
        Some(item) if matched => println!("\n🏕  {} ({})\n", item.name, item.price),
        _ if failed => println!("\n⚠ Search failed\n"),
        _ => println!("\n∅ No matching product\n"),
    }
    println!("{}", response.response);
    Ok(())
}
