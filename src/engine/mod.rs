//! Conversion engines: turn one source file into Markdown plus images.
//!
//! ```text
//!            ┌─ PlainText / Table / CodeBlock / ImagePage ─▶ BuiltinEngine
//! handler() ─┤
//!            └─ External ─────────────────────────────────▶ MarkItDownEngine
//! ```
//!
//! [`DefaultEngine`] routes by [`SupportedFormat::handler`]. Callers that
//! want something else (tests, a different converter) pass their own
//! [`ConversionEngine`] through [`crate::config::RunConfigBuilder::engine`].

pub mod builtin;
pub mod markitdown;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::formats::{Handler, SupportedFormat};
use crate::output::ExtractedAsset;

pub use builtin::BuiltinEngine;
pub use markitdown::MarkItDownEngine;

/// What an engine produced for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    pub markdown: String,
    /// Document title, when the format carries one.
    pub title: Option<String>,
    /// Embedded images, in the order the Markdown references them.
    pub assets: Vec<ExtractedAsset>,
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// Nothing on this machine handles the format. Reported as a skip.
    #[error("no converter for {extension} files: {reason}")]
    Unavailable {
        extension: &'static str,
        reason: String,
    },

    /// The engine ran and refused the input (corrupt, wrong format, ...).
    #[error("{engine} rejected the file: {detail}")]
    Rejected { engine: &'static str, detail: String },

    /// The source file could not be read.
    #[error("could not read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Converts a single source file to Markdown.
///
/// Called from blocking worker threads, possibly several at once.
pub trait ConversionEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn convert(&self, source: &Path, format: SupportedFormat) -> Result<EngineOutput, EngineError>;
}

/// Built-in handling for plain formats, `markitdown` for the rest.
#[derive(Debug, Clone)]
pub struct DefaultEngine {
    builtin: BuiltinEngine,
    external: Option<MarkItDownEngine>,
}

impl DefaultEngine {
    /// Probes for `markitdown` once; absence is not an error.
    pub fn detect() -> Self {
        let external = match MarkItDownEngine::detect() {
            Ok(engine) => {
                info!("Using markitdown at {}", engine.path().display());
                Some(engine)
            }
            Err(e) => {
                debug!("markitdown unavailable: {}", e);
                None
            }
        };
        Self {
            builtin: BuiltinEngine,
            external,
        }
    }

    /// Only the in-process handlers; office formats are skipped.
    #[cfg(test)]
    pub(crate) fn builtin_only() -> Self {
        Self {
            builtin: BuiltinEngine,
            external: None,
        }
    }

    /// Whether `markitdown` was found.
    pub fn has_external(&self) -> bool {
        self.external.is_some()
    }
}

impl ConversionEngine for DefaultEngine {
    fn name(&self) -> &'static str {
        "default"
    }

    fn convert(&self, source: &Path, format: SupportedFormat) -> Result<EngineOutput, EngineError> {
        match format.handler() {
            Handler::External => match &self.external {
                Some(engine) => engine.convert(source, format),
                None => Err(EngineError::Unavailable {
                    extension: format.extension,
                    reason: "markitdown is not installed (pip install 'markitdown[all]')".into(),
                }),
            },
            Handler::PlainText | Handler::Table | Handler::CodeBlock { .. } | Handler::ImagePage => {
                self.builtin.convert(source, format)
            }
        }
    }
}
