use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::info;
use serde_json::json;

use restable::conf::Config;
use restable::controller::{ResourceTableController, SnapshotSummary};
use restable::core::{CliArgs, setup_logging};
use restable::remote::HttpRemote;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging();
    let args = CliArgs::parse();
    info!(args = args; "restable started.");

    let config = match &args.config {
        Some(path) => Config::from_file(Path::new(path))
            .with_context(|| format!("loading config from {path}"))?,
        None => Config::default(),
    };

    let remote = Arc::new(HttpRemote::new(&config.remote)?);
    let mut query = config.query_for(&args.resource);
    if let Some(size) = args.page_size {
        query = query
            .with_page_size(size)
            .with_max_page_size(config.table.max_page_size);
    }
    if let Some(field) = &args.sort {
        query = query.with_sort(field, args.order);
    }
    if let Some(term) = &args.search {
        query = query.with_search(term);
    }
    query = query.with_page(args.page);

    let controller = ResourceTableController::new(remote, config.path_for(&args.resource), query);
    controller
        .load()
        .await
        .with_context(|| format!("listing {}", args.resource))?;

    let snapshot = controller.snapshot();
    let summary = SnapshotSummary::from(&snapshot);
    let records = snapshot.page().map(|p| p.records.clone()).unwrap_or_default();
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({"summary": summary, "records": records}))?
    );
    info!(
        "{}: page {}/{}, total {}",
        args.resource,
        summary.page,
        summary.total_pages.unwrap_or(0),
        summary.total.unwrap_or(0)
    );
    Ok(())
}
