//! Image normalisation: make every extracted image displayable in a browser.
//!
//! | Input | Result |
//! |-------|--------|
//! | png, jpg, jpeg, gif, bmp, webp, svg | unchanged |
//! | tiff, tif | re-encoded to PNG in-process |
//! | wmf, emf, wmz, emz, eps, pict | rasterised to PNG by the external tool |
//! | anything else | dropped |
//!
//! A dropped asset is a soft failure. The converter logs it and removes the
//! reference so the page never shows a broken image.

use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::process::Command;

use image::ImageFormat;
use thiserror::Error;
use tool_probe::{ProbeError, ToolLocation, IMAGEMAGICK};
use tracing::debug;

use crate::context::RunContext;
use crate::naming;
use crate::output::ExtractedAsset;

/// Formats the site can show as-is.
pub const USABLE_FORMATS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "svg"];

/// Raster formats re-encoded with the `image` crate.
pub const TRANSCODABLE_FORMATS: &[&str] = &["tiff", "tif"];

/// Vector/metafile formats that need the external raster tool.
pub const LEGACY_FORMATS: &[&str] = &["wmf", "emf", "wmz", "emz", "eps", "pict", "pct"];

/// DPI used when rasterising vector images.
const RASTER_DENSITY: &str = "150";

// ── Types ────────────────────────────────────────────────────────────────────

/// An image ready to be written under `docs/images/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedAsset {
    pub file_name: String,
    pub payload: Vec<u8>,
    /// Lowercase extension of `file_name`.
    pub format: String,
}

/// Why an asset was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// A legacy image needs the raster tool and none was found.
    ToolUnavailable,
    /// The raster tool ran and failed.
    ToolFailed(String),
    /// Not an image format this pipeline knows.
    UnsupportedFormat(String),
    /// The bytes could not be decoded as the claimed format.
    Undecodable(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::ToolUnavailable => f.write_str("conversion tool unavailable"),
            DropReason::ToolFailed(detail) => write!(f, "conversion tool failed: {detail}"),
            DropReason::UnsupportedFormat(format) if format.is_empty() => {
                f.write_str("unrecognised image format")
            }
            DropReason::UnsupportedFormat(format) => write!(f, "unsupported image format '{format}'"),
            DropReason::Undecodable(detail) => write!(f, "could not decode image: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Ready(NormalizedAsset),
    Dropped(DropReason),
}

// ── Raster tool boundary ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("could not run {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed: {detail}")]
    Failed { tool: String, detail: String },

    #[error("scratch file error: {0}")]
    Scratch(#[from] std::io::Error),
}

/// Converts legacy vector/metafile bytes into PNG bytes.
pub trait RasterTool: Send + Sync {
    fn name(&self) -> &str;

    /// `format` is the lowercase source extension, e.g. `wmf`.
    fn rasterize(&self, payload: &[u8], format: &str) -> Result<Vec<u8>, ToolError>;
}

/// ImageMagick 7 (`magick`) or 6 (`convert`).
#[derive(Debug, Clone)]
pub struct ImageMagick {
    location: ToolLocation,
}

impl ImageMagick {
    /// Finds ImageMagick via `DOCS2SITE_MAGICK` or `PATH`.
    pub fn detect() -> Result<Self, ProbeError> {
        tool_probe::locate(&IMAGEMAGICK).map(|location| Self { location })
    }

    pub fn path(&self) -> &Path {
        &self.location.path
    }
}

impl RasterTool for ImageMagick {
    fn name(&self) -> &str {
        "ImageMagick"
    }

    fn rasterize(&self, payload: &[u8], format: &str) -> Result<Vec<u8>, ToolError> {
        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join(format!("in.{format}"));
        let output = scratch.path().join("out.png");
        std::fs::write(&input, payload)?;

        let result = Command::new(self.path())
            .arg("-density")
            .arg(RASTER_DENSITY)
            .arg(&input)
            .args(["-background", "white", "-alpha", "remove", "-flatten"])
            .arg(format!("png:{}", output.display()))
            .output()
            .map_err(|e| ToolError::Launch {
                tool: tool_probe::display_name(self.path()),
                source: e,
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ToolError::Failed {
                tool: tool_probe::display_name(self.path()),
                detail: stderr.trim().lines().last().unwrap_or("no output").to_string(),
            });
        }

        let png = std::fs::read(&output)?;
        if png.is_empty() {
            return Err(ToolError::Failed {
                tool: tool_probe::display_name(self.path()),
                detail: "produced an empty file".into(),
            });
        }
        Ok(png)
    }
}

// ── Normalisation ────────────────────────────────────────────────────────────

/// Normalises one asset using the run's raster tool, if any.
pub fn normalize(asset: ExtractedAsset, ctx: &RunContext) -> Normalized {
    let format = effective_format(&asset);
    let ExtractedAsset {
        original_name,
        payload,
        ..
    } = asset;

    if USABLE_FORMATS.contains(&format.as_str()) {
        return Normalized::Ready(NormalizedAsset {
            file_name: with_extension(&original_name, &format),
            payload,
            format,
        });
    }

    if TRANSCODABLE_FORMATS.contains(&format.as_str()) {
        return match transcode_to_png(&payload, ImageFormat::Tiff) {
            Ok(png) => ready_png(&original_name, png),
            Err(e) => Normalized::Dropped(DropReason::Undecodable(e.to_string())),
        };
    }

    if LEGACY_FORMATS.contains(&format.as_str()) {
        let Some(tool) = ctx.raster_tool() else {
            return Normalized::Dropped(DropReason::ToolUnavailable);
        };
        debug!("Rasterising {} with {}", original_name, tool.name());
        return match tool.rasterize(&payload, &format) {
            Ok(png) => ready_png(&original_name, png),
            Err(e) => Normalized::Dropped(DropReason::ToolFailed(e.to_string())),
        };
    }

    Normalized::Dropped(DropReason::UnsupportedFormat(format))
}

fn is_known(format: &str) -> bool {
    USABLE_FORMATS.contains(&format)
        || TRANSCODABLE_FORMATS.contains(&format)
        || LEGACY_FORMATS.contains(&format)
}

/// The declared extension when it is one we know, else a sniff of the bytes.
fn effective_format(asset: &ExtractedAsset) -> String {
    let declared = asset.inferred_format.to_ascii_lowercase();
    if is_known(&declared) {
        return declared;
    }
    match image::guess_format(&asset.payload) {
        Ok(guessed) => guessed
            .extensions_str()
            .first()
            .map(|e| e.to_string())
            .unwrap_or(declared),
        Err(_) => declared,
    }
}

fn transcode_to_png(payload: &[u8], from: ImageFormat) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory_with_format(payload, from)?;
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

fn ready_png(original_name: &str, payload: Vec<u8>) -> Normalized {
    Normalized::Ready(NormalizedAsset {
        file_name: with_extension(original_name, "png"),
        payload,
        format: "png".into(),
    })
}

/// `figure.wmf` + `png` → `figure.png`; keeps the name when it already matches.
fn with_extension(name: &str, ext: &str) -> String {
    let (stem, current) = naming::split_extension(name);
    if current.trim_start_matches('.').eq_ignore_ascii_case(ext) {
        return name.to_string();
    }
    if is_known(&current.trim_start_matches('.').to_ascii_lowercase()) {
        format!("{stem}.{ext}")
    } else {
        format!("{name}.{ext}")
    }
}
