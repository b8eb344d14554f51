//! Whole-run entry points: folder in, site out.
//!
//! [`run`] discovers documents, converts them through
//! [`crate::stream::convert_stream`], and only after every worker has
//! finished assembles the navigation and writes `mkdocs.yml`.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::context::RunContext;
use crate::error::SiteError;
use crate::formats;
use crate::output::RunReport;
use crate::pipeline::discover;
use crate::site;
use crate::stream::convert_stream;

/// Convert every supported document under `input_root` into a site at
/// `output_root`.
///
/// # Returns
/// `Ok(RunReport)` whenever a site configuration was written, even if
/// some documents were skipped or failed (see `report.failed`).
///
/// # Errors
/// Returns `Err(SiteError)` only for fatal errors:
/// - input root missing or not a folder
/// - output folder cannot be created
/// - navigation scan or `mkdocs.yml` write fails
pub async fn run(
    input_root: impl AsRef<Path>,
    output_root: impl AsRef<Path>,
    config: &RunConfig,
) -> Result<RunReport, SiteError> {
    let started = Instant::now();
    let input_root = input_root.as_ref();
    let output_root = output_root.as_ref();
    info!(
        "Converting {} into {}",
        input_root.display(),
        output_root.display()
    );

    // ── Step 1: Discover ─────────────────────────────────────────────────
    let jobs = discover::discover(input_root, Some(output_root))?;
    if jobs.is_empty() {
        warn!(
            "No supported documents under {}. Supported extensions: {}",
            input_root.display(),
            formats::supported_extensions()
        );
    } else {
        info!("Found {} documents", jobs.len());
    }

    std::fs::create_dir_all(output_root).map_err(|source| SiteError::OutputUnavailable {
        path: output_root.to_path_buf(),
        source,
    })?;

    // ── Step 2: Probe tools once ─────────────────────────────────────────
    let ctx = Arc::new(RunContext::probe(config));

    // ── Step 3: Convert ──────────────────────────────────────────────────
    let total = jobs.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total);
    }

    let mut report = RunReport::default();
    let mut results = convert_stream(
        jobs,
        output_root.to_path_buf(),
        ctx,
        config.concurrency,
        config.progress_callback.clone(),
    );
    while let Some(result) = results.next().await {
        report.record(&result);
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total, report.succeeded);
    }

    // ── Step 4: Site ─────────────────────────────────────────────────────
    let site_config = site::build_site(
        output_root,
        config.site_title.as_deref(),
        config.site_config.as_deref(),
    )?;
    report.pages_in_nav = site_config.page_count();
    report.site_config = site::write_site_config(&site_config, output_root)?;
    report.duration_ms = started.elapsed().as_millis() as u64;

    info!(
        "Run complete: {} converted, {} skipped, {} failed, {} images ({} dropped), {}ms",
        report.succeeded,
        report.skipped_count(),
        report.failed.len(),
        report.assets_written,
        report.assets_dropped,
        report.duration_ms
    );

    Ok(report)
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(
    input_root: impl AsRef<Path>,
    output_root: impl AsRef<Path>,
    config: &RunConfig,
) -> Result<RunReport, SiteError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SiteError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(input_root, output_root, config))
}
