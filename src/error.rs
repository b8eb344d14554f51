//! Error types for the docs-to-site library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SiteError`] is **fatal**: the run cannot produce a site at all
//!   (input root missing, `mkdocs.yml` cannot be written, invalid
//!   configuration). Returned as `Err(SiteError)` from [`crate::run`].
//!
//! * [`DocumentError`] is **non-fatal**: a single document failed (corrupt
//!   file, converter rejected it, output not writable) but every other
//!   document is fine. Stored inside [`crate::output::ConversionResult`] and
//!   listed in the [`crate::output::RunReport`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docs-to-site library.
///
/// Document-level failures use [`DocumentError`] and never surface here.
#[derive(Debug, Error)]
pub enum SiteError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input root does not exist.
    #[error("Input folder not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Input root exists but is a file.
    #[error("Input '{path}' is not a folder")]
    InputNotADirectory { path: PathBuf },

    /// A directory under the input root could not be listed.
    #[error("Failed to read folder '{path}': {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Site assembly errors ──────────────────────────────────────────────
    /// The output tree could not be created or scanned.
    #[error("Failed to prepare output folder '{path}': {source}")]
    OutputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Navigation could not be serialised.
    #[error("Failed to serialise site configuration: {0}")]
    Serialize(String),

    /// `mkdocs.yml` could not be written.
    #[error("Failed to write site configuration '{path}': {source}")]
    ConfigWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// Stored in [`crate::output::ConversionStatus::Failed`]; the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// The converter could not read or parse the source file.
    #[error("{engine} rejected the file: {detail}")]
    EngineRejected { engine: String, detail: String },

    /// The source file could not be opened.
    #[error("could not read source: {detail}")]
    Unreadable { detail: String },

    /// Markdown or an image could not be written.
    #[error("could not write '{path}': {detail}")]
    WriteFailed { path: PathBuf, detail: String },

    /// The worker thread died before returning a result.
    #[error("worker panicked: {detail}")]
    WorkerPanicked { detail: String },
}
