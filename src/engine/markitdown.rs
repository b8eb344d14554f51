//! External conversion through Microsoft's `markitdown` CLI.
//!
//! `markitdown <file> --keep-data-uris` prints Markdown on stdout with any
//! embedded pictures inlined as `data:image/...;base64,` URIs. Those are
//! decoded here into [`ExtractedAsset`]s named `image.<ext>` so the document
//! converter can relocate them like any other image.

use std::path::Path;

use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tool_probe::{ProbeError, ToolLocation, MARKITDOWN};
use tracing::{debug, warn};

use super::{ConversionEngine, EngineError, EngineOutput};
use crate::formats::SupportedFormat;
use crate::output::ExtractedAsset;

const ENGINE: &str = "markitdown";

static RE_DATA_URI_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[([^\]]*)\]\(data:image/([A-Za-z0-9.+-]+);base64,([A-Za-z0-9+/=\s]*)\)")
        .unwrap()
});

#[derive(Debug, Clone)]
pub struct MarkItDownEngine {
    location: ToolLocation,
}

impl MarkItDownEngine {
    /// Finds `markitdown` via `DOCS2SITE_MARKITDOWN` or `PATH`.
    pub fn detect() -> Result<Self, ProbeError> {
        tool_probe::locate(&MARKITDOWN).map(Self::at)
    }

    pub fn at(location: ToolLocation) -> Self {
        Self { location }
    }

    pub fn path(&self) -> &Path {
        &self.location.path
    }
}

impl ConversionEngine for MarkItDownEngine {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn convert(&self, source: &Path, _format: SupportedFormat) -> Result<EngineOutput, EngineError> {
        debug!("markitdown {}", source.display());
        let output = self
            .location
            .command()
            .arg(source)
            .arg("--keep-data-uris")
            .output()
            .map_err(|e| EngineError::Rejected {
                engine: ENGINE,
                detail: format!("could not start {}: {e}", self.path().display()),
            })?;

        if !output.status.success() {
            return Err(EngineError::Rejected {
                engine: ENGINE,
                detail: failure_detail(&output.stderr, output.status.code()),
            });
        }

        let markdown = String::from_utf8_lossy(&output.stdout);
        let (markdown, assets) = extract_inline_images(&markdown);
        Ok(EngineOutput {
            markdown,
            title: None,
            assets,
        })
    }
}

/// Last meaningful stderr line; Python tracebacks end with the actual error.
fn failure_detail(stderr: &[u8], code: Option<i32>) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| match code {
            Some(c) => format!("exited with status {c}"),
            None => "terminated by signal".to_string(),
        })
}

/// Replaces inline base64 images with `image.<ext>` references and returns
/// the decoded payloads in reference order.
pub fn extract_inline_images(markdown: &str) -> (String, Vec<ExtractedAsset>) {
    let mut assets = Vec::new();
    let rewritten = RE_DATA_URI_IMAGE.replace_all(markdown, |caps: &Captures| {
        let alt = &caps[1];
        let ext = extension_for_mime(&caps[2]);
        let data: String = caps[3].split_whitespace().collect();
        match base64::engine::general_purpose::STANDARD.decode(data.as_bytes()) {
            Ok(payload) => {
                let name = format!("image.{ext}");
                let reference = format!("![{alt}]({name})");
                assets.push(ExtractedAsset::new(name, payload));
                reference
            }
            Err(e) => {
                warn!("Dropping undecodable inline image: {}", e);
                if alt.trim().is_empty() {
                    String::new()
                } else {
                    format!("*{}*", alt.trim())
                }
            }
        }
    });
    (rewritten.into_owned(), assets)
}

fn extension_for_mime(subtype: &str) -> String {
    match subtype.to_ascii_lowercase().as_str() {
        "jpeg" | "pjpeg" => "jpg".into(),
        "svg+xml" => "svg".into(),
        "x-wmf" | "wmf" => "wmf".into(),
        "x-emf" | "emf" => "emf".into(),
        "tiff" | "tif" => "tiff".into(),
        "x-ms-bmp" => "bmp".into(),
        other => other.trim_start_matches("x-").to_string(),
    }
}
