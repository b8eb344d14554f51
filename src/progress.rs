//! Progress-callback trait for per-document conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::RunConfigBuilder::progress_callback`] to receive events
//! as the pipeline works through the input folder. The CLI uses this to
//! drive its progress bar.
//!
//! # Example
//!
//! ```rust
//! use docs_to_site::{ConversionProgressCallback, RunConfig};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, index: usize, total: usize, path: &Path, markdown_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("[{index}/{total}] {} ({markdown_len} bytes)", path.display());
//!     }
//! }
//!
//! let config = RunConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it processes each document.
///
/// Documents are converted on several worker threads at once, so every
/// method may be called concurrently. All methods default to no-ops.
/// `index` is 1-based in discovery order; `path` is relative to the input
/// root.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after discovery, before any document is converted.
    fn on_run_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    fn on_document_start(&self, index: usize, total: usize, path: &Path) {
        let _ = (index, total, path);
    }

    /// Called when a document was written successfully.
    fn on_document_complete(&self, index: usize, total: usize, path: &Path, markdown_len: usize) {
        let _ = (index, total, path, markdown_len);
    }

    /// Called when no converter is available for a document.
    fn on_document_skipped(&self, index: usize, total: usize, path: &Path, reason: &str) {
        let _ = (index, total, path, reason);
    }

    /// Called when a document failed to convert.
    fn on_document_error(&self, index: usize, total: usize, path: &Path, error: &str) {
        let _ = (index, total, path, error);
    }

    /// Called once after every document has been attempted, before the site
    /// configuration is written.
    fn on_run_complete(&self, total_documents: usize, success_count: usize) {
        let _ = (total_documents, success_count);
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RunConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
