//! # docs-to-site
//!
//! Turn a folder of office documents into a browsable MkDocs site.
//!
//! Every supported file under the input folder (Word, PowerPoint, Excel,
//! PDF, images, audio, HTML, CSV/JSON/XML, archives) becomes one Markdown
//! page under `docs/`, mirroring the input layout. Embedded images are
//! extracted next to it, legacy formats such as WMF/EMF are rasterised to
//! PNG when ImageMagick is available, and a `mkdocs.yml` whose navigation
//! mirrors the output tree is written last.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input folder
//!  │
//!  ├─ 1. Discover   walk, classify by extension, assign output paths
//!  ├─ 2. Convert    builtin engine or `markitdown` (spawn_blocking, bounded)
//!  ├─ 3. Normalise  keep web images, transcode TIFF, rasterise WMF/EMF/…
//!  ├─ 4. Rewrite    point image references at docs/images/<doc>/…
//!  ├─ 5. Polish     deterministic Markdown cleanup
//!  └─ 6. Site       scan docs/, build nav, write mkdocs.yml
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docs_to_site::{run, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::builder().site_title("Team Handbook").build()?;
//!     let report = run("shared-drive/", "site/", &config).await?;
//!     eprintln!(
//!         "{} converted, {} skipped, {} failed",
//!         report.succeeded,
//!         report.skipped_count(),
//!         report.failed.len()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docs2site` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## External Tools
//!
//! Office, PDF, audio, HTML and archive formats need
//! [`markitdown`](https://github.com/microsoft/markitdown) on `PATH`
//! (override with `DOCS2SITE_MARKITDOWN`); without it those files are
//! reported as skipped. Legacy image formats need ImageMagick
//! (`DOCS2SITE_MAGICK`); without it those images are dropped with a warning.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod context;
pub mod convert;
pub mod engine;
pub mod error;
pub mod formats;
pub mod markdown;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod site;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ImageToolMode, RunConfig, RunConfigBuilder};
pub use context::RunContext;
pub use convert::{run, run_sync};
pub use engine::{
    BuiltinEngine, ConversionEngine, DefaultEngine, EngineError, EngineOutput, MarkItDownEngine,
};
pub use error::{DocumentError, SiteError};
pub use formats::{classify, Category, Handler, SupportedFormat};
pub use output::{
    AssetOutcome, AssetRecord, ConversionJob, ConversionResult, ConversionStatus, ExtractedAsset,
    FileIssue, RunReport,
};
pub use pipeline::normalize::{DropReason, ImageMagick, RasterTool, ToolError};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use site::{build_site, write_site_config, OutputNode, SiteConfig};
pub use stream::{convert_stream, DocumentStream};
