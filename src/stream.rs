//! Streaming conversion API: emit documents as they complete.
//!
//! [`convert_stream`] turns a list of discovered jobs into a `Stream` of
//! [`ConversionResult`]s. Each document is converted on a blocking worker
//! thread (engines shell out and do file I/O), at most `concurrency` at a
//! time, and results come out in discovery order regardless of which worker
//! finishes first.
//!
//! [`crate::convert::run`] drains this stream to build its report; use it
//! directly to show pages as they are written.

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_stream::Stream;
use tracing::{error, warn};

use crate::context::RunContext;
use crate::error::DocumentError;
use crate::output::{ConversionJob, ConversionResult, ConversionStatus};
use crate::pipeline::document;
use crate::progress::ProgressCallback;

/// A boxed stream of per-document results.
pub type DocumentStream = Pin<Box<dyn Stream<Item = ConversionResult> + Send>>;

/// Converts `jobs` with bounded concurrency, yielding results in job order.
///
/// `concurrency` of 0 is treated as 1. Progress events fire from the
/// worker futures, so `callback` may see several documents in flight.
pub fn convert_stream(
    jobs: Vec<ConversionJob>,
    output_root: PathBuf,
    ctx: Arc<RunContext>,
    concurrency: usize,
    callback: Option<ProgressCallback>,
) -> DocumentStream {
    let total = jobs.len();
    let output_root = Arc::new(output_root);

    let s = stream::iter(jobs.into_iter().enumerate().map(move |(i, job)| {
        let ctx = Arc::clone(&ctx);
        let output_root = Arc::clone(&output_root);
        let callback = callback.clone();
        async move {
            let index = i + 1;
            let rel = job.relative_path.clone();
            if let Some(ref cb) = callback {
                cb.on_document_start(index, total, &rel);
            }

            let fallback = job.clone();
            let result = match tokio::task::spawn_blocking(move || {
                document::convert_document(job, &output_root, &ctx)
            })
            .await
            {
                Ok(result) => result,
                Err(e) => {
                    error!("Worker for {} panicked: {}", rel.display(), e);
                    ConversionResult::failed(
                        fallback,
                        DocumentError::WorkerPanicked {
                            detail: e.to_string(),
                        },
                    )
                }
            };

            match &result.status {
                ConversionStatus::Success => {
                    if let Some(ref cb) = callback {
                        cb.on_document_complete(index, total, &rel, result.markdown.len());
                    }
                }
                ConversionStatus::Skipped(reason) => {
                    if let Some(ref cb) = callback {
                        cb.on_document_skipped(index, total, &rel, reason);
                    }
                }
                ConversionStatus::Failed(e) => {
                    warn!("Failed to convert {}: {}", rel.display(), e);
                    if let Some(ref cb) = callback {
                        cb.on_document_error(index, total, &rel, &e.to_string());
                    }
                }
            }
            result
        }
    }))
    .buffered(concurrency.max(1));

    Box::pin(s)
}
