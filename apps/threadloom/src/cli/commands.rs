//! # CLI Command Implementations

use crate::api::{self, PostResponse, StatusResponse};
use crate::config::Config;
use crate::error::AppError;
use crate::ingest::{self, PhaseReport, load_dataset};
use serde::Serialize;
use std::path::Path;
use threadloom_core::{PostId, Registry, RegistryStats, ThreadError, read_snapshot};

fn render_json<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Thread(ThreadError::Serialization(e.to_string())))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", render_json(value)?);
    Ok(())
}

fn print_stats(stats: &RegistryStats) {
    for (kind, count) in &stats.posts {
        println!("  {:<16} {}", kind.name(), count);
    }
    println!("  {:<16} {}", "placeholders", stats.placeholders);
    println!("  {:<16} {}", "total", stats.concrete());
}

fn print_phase(name: &str, report: Option<&PhaseReport>) {
    match report {
        Some(r) => println!(
            "  {:<10} files {:>4}  documents {:>8}  inserted {:>8}  promoted {:>6}  known {:>6}  excluded {:>4}  refreshed {:>6}",
            name, r.files, r.documents, r.inserted, r.promoted, r.known, r.excluded, r.refreshed
        ),
        None => println!("  {:<10} skipped", name),
    }
}

fn open_snapshot(dir: &Path) -> Result<Registry, AppError> {
    read_snapshot(dir).map_err(|source| AppError::File {
        path: dir.display().to_string(),
        source,
    })
}

// =============================================================================
// LOAD COMMAND
// =============================================================================

/// Load a dataset through all four phases.
pub async fn cmd_load(
    config: &Config,
    dataset: &Path,
    snapshot: Option<&Path>,
    json_mode: bool,
    verbose: bool,
) -> Result<(), AppError> {
    let loaded = load_dataset(dataset, config, snapshot).await?;
    let stats = loaded.registry.stats();

    if json_mode {
        let output = serde_json::json!({
            "dataset": dataset.to_string_lossy(),
            "report": loaded.report,
            "stats": StatusResponse::from(&stats),
            "users": loaded
                .users
                .counts()
                .iter()
                .map(|(state, count)| (format!("{:?}", state), *count))
                .collect::<std::collections::BTreeMap<_, _>>(),
        });
        print_json(&output)?;
        return Ok(());
    }

    println!("Threadloom Dataset Load");
    println!("=======================");
    println!("Dataset: {}", dataset.display());
    if let Some(dir) = snapshot {
        println!("Snapshot: {}", dir.display());
    }
    println!();
    if verbose {
        println!("Phases:");
        print_phase("initial", loaded.report.initial.as_ref());
        print_phase("enriched", loaded.report.enriched.as_ref());
        print_phase("reloaded", loaded.report.reloaded.as_ref());
        println!();
    }
    println!("Posts:");
    print_stats(&stats);

    if let Some(users) = &loaded.report.users {
        println!();
        println!("Users:");
        println!("  listed           {}", users.listed);
        println!("  reloaded         {}", users.reloaded);
        println!("  deleted          {}", users.deleted);
        println!("  unavailable      {}", users.unavailable);
        println!("  posts attached   {}", users.reconcile.posts_attached);
        println!("  anonymous posts  {}", users.reconcile.anonymous_posts);
        println!("  undated profiles {}", users.reconcile.undated_profiles);
    }

    Ok(())
}

// =============================================================================
// INGEST COMMAND
// =============================================================================

/// Bulk keyword ingest.
pub async fn cmd_ingest(
    config: &Config,
    input: &Path,
    snapshot: Option<&Path>,
    json_mode: bool,
) -> Result<(), AppError> {
    let (registry, report) = ingest::ingest(input, config, snapshot).await?;
    let stats = registry.stats();

    if json_mode {
        let output = serde_json::json!({
            "input": input.to_string_lossy(),
            "report": report,
            "stats": StatusResponse::from(&stats),
        });
        print_json(&output)?;
        return Ok(());
    }

    println!("Ingested {} documents from {} files", report.documents, report.files);
    println!("  filtered out     {}", report.filtered);
    println!("  excluded         {}", report.excluded);
    println!();
    println!("Posts:");
    print_stats(&stats);
    if let Some(dir) = snapshot {
        println!();
        println!("Snapshot written to {}", dir.display());
    }

    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show snapshot counts.
pub fn cmd_status(snapshot: &Path, json_mode: bool) -> Result<(), AppError> {
    let registry = open_snapshot(snapshot)?;
    let stats = registry.stats();

    if json_mode {
        print_json(&StatusResponse::from(&stats))?;
        return Ok(());
    }

    println!("Threadloom Registry Status");
    println!("==========================");
    println!("Snapshot: {}", snapshot.display());
    println!();
    print_stats(&stats);

    Ok(())
}

// =============================================================================
// LOOKUP COMMAND
// =============================================================================

/// Show one post.
pub fn cmd_lookup(snapshot: &Path, id: i64, json_mode: bool) -> Result<(), AppError> {
    let registry = open_snapshot(snapshot)?;
    let post = registry
        .lookup(PostId(id))
        .ok_or(ThreadError::PostNotFound(PostId(id)))?;
    let view = PostResponse::from(post);

    if json_mode {
        print_json(&view)?;
        return Ok(());
    }

    println!("Post {}", view.id_str);
    println!("  kind:     {}", view.kind);
    println!("  state:    {}", view.state);
    match view.author {
        Some(author) => println!("  author:   {}", author),
        None => println!("  author:   -"),
    }
    if let Some(created_at) = &view.created_at {
        println!("  created:  {}", created_at);
    }
    if view.refreshed {
        println!("  refreshed version attached");
    }
    for parent in &view.parents {
        println!("  {:<15} {}", parent.role, parent.id_str);
    }
    if view.children.is_empty() {
        println!("  no children");
    }
    for (kind, ids) in &view.children {
        println!("  {} children: {}", kind, ids.len());
        for child in ids.iter().take(10) {
            println!("    {}", child);
        }
        if ids.len() > 10 {
            println!("    ... and {} more", ids.len() - 10);
        }
    }
    if let Some(text) = &view.text {
        println!();
        println!("{}", text);
    }

    Ok(())
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Serve a snapshot over HTTP.
pub async fn cmd_serve(snapshot: &Path, host: &str, port: u16) -> Result<(), AppError> {
    let registry = open_snapshot(snapshot)?;

    println!("Threadloom Query Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Snapshot: {}", snapshot.display());
    println!("  Posts:    {}", registry.stats().concrete());
    println!();
    println!("Endpoints:");
    println!("  GET /health              - Health check");
    println!("  GET /status              - Post counts");
    println!("  GET /posts/{{id}}          - One post");
    println!("  GET /posts/{{id}}/children - Child ids per kind");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, registry).await
}
