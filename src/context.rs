//! Per-run context: collaborators probed once and shared by every worker.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{ImageToolMode, RunConfig};
use crate::engine::{ConversionEngine, DefaultEngine};
use crate::pipeline::normalize::{ImageMagick, RasterTool};

/// Read-only state for one run.
///
/// Built before any worker starts and handed out as `Arc<RunContext>`, so
/// the image-tool probe happens exactly once and two runs in the same
/// process never share a stale result.
pub struct RunContext {
    engine: Arc<dyn ConversionEngine>,
    raster_tool: Option<Arc<dyn RasterTool>>,
    postprocess: bool,
}

impl RunContext {
    pub fn new(
        engine: Arc<dyn ConversionEngine>,
        raster_tool: Option<Arc<dyn RasterTool>>,
    ) -> Self {
        Self {
            engine,
            raster_tool,
            postprocess: true,
        }
    }

    /// Resolves the engine and raster tool, preferring what `config` supplies.
    pub fn probe(config: &RunConfig) -> Self {
        let engine: Arc<dyn ConversionEngine> = match &config.engine {
            Some(engine) => Arc::clone(engine),
            None => Arc::new(DefaultEngine::detect()),
        };

        let raster_tool: Option<Arc<dyn RasterTool>> = match (&config.raster_tool, config.image_tool) {
            (Some(tool), _) => Some(Arc::clone(tool)),
            (None, ImageToolMode::Disabled) => None,
            (None, ImageToolMode::Auto) => match ImageMagick::detect() {
                Ok(magick) => {
                    info!("Using ImageMagick at {}", magick.path().display());
                    Some(Arc::new(magick))
                }
                Err(e) => {
                    warn!("{}; WMF/EMF images will be dropped", e);
                    None
                }
            },
        };

        Self {
            engine,
            raster_tool,
            postprocess: config.postprocess,
        }
    }

    pub fn engine(&self) -> &dyn ConversionEngine {
        self.engine.as_ref()
    }

    pub fn raster_tool(&self) -> Option<&dyn RasterTool> {
        self.raster_tool.as_deref()
    }

    pub fn postprocess(&self) -> bool {
        self.postprocess
    }
}
