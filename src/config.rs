//! Configuration for a docs-to-site run.
//!
//! All run behaviour is controlled through [`RunConfig`], built via its
//! [`RunConfigBuilder`]. Collaborators (conversion engine, raster tool,
//! progress callback) can be injected here; anything left unset is
//! auto-detected when the run starts.

use crate::engine::ConversionEngine;
use crate::error::SiteError;
use crate::pipeline::normalize::RasterTool;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for one conversion run.
///
/// # Example
/// ```rust
/// use docs_to_site::RunConfig;
///
/// let config = RunConfig::builder()
///     .concurrency(4)
///     .site_title("Team Handbook")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct RunConfig {
    /// Documents converted at the same time. Default: available CPU threads.
    ///
    /// Most conversions shell out to `markitdown`, which is a Python process
    /// per file, so more than one per core rarely helps.
    pub concurrency: usize,

    /// `site_name` for `mkdocs.yml`. If None, an existing config's name is
    /// kept, else "Documentation".
    pub site_title: Option<String>,

    /// Existing `mkdocs.yml` whose settings are kept; only `nav` is replaced.
    pub site_config: Option<PathBuf>,

    /// Whether to look for ImageMagick. Default: [`ImageToolMode::Auto`].
    pub image_tool: ImageToolMode,

    /// Pre-constructed engine. Takes precedence over auto-detection.
    pub engine: Option<Arc<dyn ConversionEngine>>,

    /// Pre-constructed raster tool. Takes precedence over `image_tool`.
    pub raster_tool: Option<Arc<dyn RasterTool>>,

    /// Apply the Markdown clean-up rules. Default: true.
    pub postprocess: bool,

    /// Per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            site_title: None,
            site_config: None,
            image_tool: ImageToolMode::default(),
            engine: None,
            raster_tool: None,
            postprocess: true,
            progress_callback: None,
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("concurrency", &self.concurrency)
            .field("site_title", &self.site_title)
            .field("site_config", &self.site_config)
            .field("image_tool", &self.image_tool)
            .field("engine", &self.engine.as_ref().map(|e| e.name()))
            .field("raster_tool", &self.raster_tool.as_ref().map(|t| t.name().to_string()))
            .field("postprocess", &self.postprocess)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl RunConfig {
    /// Create a new builder for `RunConfig`.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn site_title(mut self, title: impl Into<String>) -> Self {
        self.config.site_title = Some(title.into());
        self
    }

    pub fn site_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.site_config = Some(path.into());
        self
    }

    pub fn image_tool(mut self, mode: ImageToolMode) -> Self {
        self.config.image_tool = mode;
        self
    }

    pub fn engine(mut self, engine: Arc<dyn ConversionEngine>) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn raster_tool(mut self, tool: Arc<dyn RasterTool>) -> Self {
        self.config.raster_tool = Some(tool);
        self
    }

    pub fn postprocess(mut self, v: bool) -> Self {
        self.config.postprocess = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, SiteError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(SiteError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if matches!(&c.site_title, Some(t) if t.trim().is_empty()) {
            return Err(SiteError::InvalidConfig("Site title must not be blank".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Whether legacy images may be rasterised with ImageMagick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageToolMode {
    /// Probe for `magick` / `convert` once at the start of the run. (default)
    #[default]
    Auto,
    /// Never run ImageMagick; legacy images are dropped.
    Disabled,
}
