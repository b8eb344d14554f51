//! Document conversion: one [`ConversionJob`] in, one Markdown page out.
//!
//! Runs on a blocking worker thread. Everything this function writes lives
//! under the job's own Markdown path and its own `docs/images/<asset-dir>/`
//! folder, so any number of documents can convert at the same time.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::normalize::{normalize, Normalized};
use super::postprocess::clean_markdown;
use super::rewrite::{relative_target, rewrite_references, Placement};
use super::{DOCS_DIR, IMAGES_DIR};
use crate::context::RunContext;
use crate::engine::EngineError;
use crate::error::DocumentError;
use crate::naming::{self, NameAllocator};
use crate::output::{
    AssetOutcome, AssetRecord, ConversionJob, ConversionResult, ConversionStatus, ExtractedAsset,
};

/// Converts one document and writes it below `output_root/docs`.
///
/// Never panics or returns early with an error: every failure is folded into
/// the returned [`ConversionResult`]'s status.
pub fn convert_document(job: ConversionJob, output_root: &Path, ctx: &RunContext) -> ConversionResult {
    debug!("Converting {}", job.relative_path.display());

    // ── Step 1: Engine ───────────────────────────────────────────────────
    let output = match ctx.engine().convert(&job.source_path, job.format) {
        Ok(output) => output,
        Err(e @ EngineError::Unavailable { .. }) => {
            debug!("Skipping {}: {}", job.relative_path.display(), e);
            return ConversionResult::skipped(job, e.to_string());
        }
        Err(EngineError::Rejected { engine, detail }) => {
            return ConversionResult::failed(
                job,
                DocumentError::EngineRejected {
                    engine: engine.to_string(),
                    detail,
                },
            );
        }
        Err(EngineError::Io { source, .. }) => {
            return ConversionResult::failed(
                job,
                DocumentError::Unreadable {
                    detail: source.to_string(),
                },
            );
        }
    };

    let docs_root = output_root.join(DOCS_DIR);

    // ── Step 2–3: Assets ─────────────────────────────────────────────────
    let (placements, records) = if job.format.category.requires_image_processing() {
        match place_assets(&job, output.assets, &docs_root, ctx) {
            Ok(placed) => placed,
            Err(e) => return ConversionResult::failed(job, e),
        }
    } else {
        discard_assets(&job, output.assets)
    };

    // ── Step 4: References ───────────────────────────────────────────────
    let mut markdown = rewrite_references(&output.markdown, &placements);

    // ── Step 5: Title heading ────────────────────────────────────────────
    if !starts_with_h1(&markdown) {
        let title = page_title(output.title.as_deref(), &job.stem());
        markdown = format!("# {title}\n\n{markdown}");
    }

    // ── Step 6: Post-process ─────────────────────────────────────────────
    if ctx.postprocess() {
        markdown = clean_markdown(&markdown, job.format.category.is_presentation());
    }

    // ── Step 7: Write ────────────────────────────────────────────────────
    let out_path = docs_root.join(&job.output_relative);
    if let Err(e) = write_atomic(&out_path, markdown.as_bytes()) {
        return ConversionResult {
            assets: records,
            ..ConversionResult::failed(
                job,
                DocumentError::WriteFailed {
                    path: out_path,
                    detail: e.to_string(),
                },
            )
        };
    }

    debug!(
        "Wrote {} ({} bytes, {} images)",
        out_path.display(),
        markdown.len(),
        records.iter().filter(|r| r.is_written()).count()
    );

    ConversionResult {
        job,
        markdown,
        assets: records,
        output_path: Some(out_path),
        status: ConversionStatus::Success,
    }
}

/// Normalises and writes every asset, returning where each one went.
///
/// Byte-identical payloads (a logo on every slide) are written once; later
/// copies point at the first file. If any write fails the document's image
/// folder is removed again, so a failed document leaves no images behind.
fn place_assets(
    job: &ConversionJob,
    assets: Vec<ExtractedAsset>,
    docs_root: &Path,
    ctx: &RunContext,
) -> Result<(Vec<Placement>, Vec<AssetRecord>), DocumentError> {
    let image_dir = docs_root.join(IMAGES_DIR).join(&job.asset_dir_name);
    let placed = write_assets(job, assets, &image_dir, ctx);
    if placed.is_err() && image_dir.exists() {
        if let Err(e) = std::fs::remove_dir_all(&image_dir) {
            warn!("Cannot remove {}: {}", image_dir.display(), e);
        }
    }
    placed
}

fn write_assets(
    job: &ConversionJob,
    assets: Vec<ExtractedAsset>,
    image_dir: &Path,
    ctx: &RunContext,
) -> Result<(Vec<Placement>, Vec<AssetRecord>), DocumentError> {
    let depth = job.depth();
    let mut extracted_names = NameAllocator::new();
    let mut final_names = NameAllocator::new();
    let mut by_content: HashMap<String, (Option<String>, AssetOutcome)> = HashMap::new();
    let mut placements = Vec::with_capacity(assets.len());
    let mut records = Vec::with_capacity(assets.len());

    for asset in assets {
        let original = asset.original_name.clone();
        let digest = content_hash(&asset.payload);

        if let Some((target, outcome)) = by_content.get(&digest) {
            debug!(
                "Image '{}' in {} repeats an earlier one",
                original,
                job.relative_path.display()
            );
            placements.push(Placement {
                original_name: original.clone(),
                target: target.clone(),
            });
            records.push(AssetRecord {
                original_name: original,
                outcome: match outcome {
                    AssetOutcome::Written { path } | AssetOutcome::Shared { path } => {
                        AssetOutcome::Shared { path: path.clone() }
                    }
                    dropped => dropped.clone(),
                },
            });
            continue;
        }

        let unique = extracted_names.claim(&naming::sanitize_file_name(file_name_of(&original)));
        let asset = ExtractedAsset {
            original_name: unique,
            ..asset
        };

        let (target, outcome) = match normalize(asset, ctx) {
            Normalized::Ready(normalized) => {
                let file_name = final_names.claim(&normalized.file_name);
                let path = image_dir.join(&file_name);
                write_atomic(&path, &normalized.payload).map_err(|e| DocumentError::WriteFailed {
                    path: path.clone(),
                    detail: e.to_string(),
                })?;
                (
                    Some(relative_target(depth, &job.asset_dir_name, &file_name)),
                    AssetOutcome::Written {
                        path: PathBuf::from(IMAGES_DIR).join(&job.asset_dir_name).join(file_name),
                    },
                )
            }
            Normalized::Dropped(reason) => {
                warn!(
                    "Dropping image '{}' from {}: {}",
                    original,
                    job.relative_path.display(),
                    reason
                );
                (
                    None,
                    AssetOutcome::Dropped {
                        reason: reason.to_string(),
                    },
                )
            }
        };

        placements.push(Placement {
            original_name: original.clone(),
            target: target.clone(),
        });
        records.push(AssetRecord {
            original_name: original,
            outcome: outcome.clone(),
        });
        by_content.insert(digest, (target, outcome));
    }

    Ok((placements, records))
}

fn content_hash(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    format!("{:x}", hasher.finalize())
}

/// Formats that do not carry pictures keep none of the engine's assets.
fn discard_assets(job: &ConversionJob, assets: Vec<ExtractedAsset>) -> (Vec<Placement>, Vec<AssetRecord>) {
    assets
        .into_iter()
        .map(|a| {
            debug!(
                "Ignoring image '{}' from {} file",
                a.original_name, job.format.extension
            );
            (
                Placement {
                    original_name: a.original_name.clone(),
                    target: None,
                },
                AssetRecord {
                    original_name: a.original_name,
                    outcome: AssetOutcome::Dropped {
                        reason: format!("images are not kept for {} files", job.format.extension),
                    },
                },
            )
        })
        .unzip()
}

fn file_name_of(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

fn starts_with_h1(markdown: &str) -> bool {
    markdown
        .lines()
        .find(|l| !l.trim().is_empty())
        .is_some_and(|l| l.trim_start().starts_with("# "))
}

fn page_title(engine_title: Option<&str>, stem: &str) -> String {
    engine_title
        .map(naming::sanitize_title)
        .filter(|t| !t.is_empty())
        .or_else(|| {
            Some(naming::title_case(&naming::sanitize_title(&stem.replace('_', " "))))
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_else(|| stem.to_string())
}

/// Writes `bytes` to `path` via a sibling `.tmp` file and a rename, creating
/// parent folders as needed. Readers never observe a half-written file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    let written = std::fs::write(&tmp_path, bytes).and_then(|()| std::fs::rename(&tmp_path, path));
    if written.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ConversionEngine, EngineOutput};
    use crate::formats::{self, SupportedFormat};
    use crate::pipeline::normalize::{RasterTool, ToolError};
    use std::sync::Arc;

    struct ScriptedEngine {
        markdown: &'static str,
        title: Option<&'static str>,
        assets: Vec<(&'static str, Vec<u8>)>,
    }

    impl ConversionEngine for ScriptedEngine {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn convert(&self, _: &Path, _: SupportedFormat) -> Result<EngineOutput, EngineError> {
            Ok(EngineOutput {
                markdown: self.markdown.to_string(),
                title: self.title.map(str::to_string),
                assets: self
                    .assets
                    .iter()
                    .map(|(n, b)| ExtractedAsset::new(*n, b.clone()))
                    .collect(),
            })
        }
    }

    struct RejectingEngine;

    impl ConversionEngine for RejectingEngine {
        fn name(&self) -> &'static str {
            "rejecting"
        }

        fn convert(&self, _: &Path, _: SupportedFormat) -> Result<EngineOutput, EngineError> {
            Err(EngineError::Rejected {
                engine: "rejecting",
                detail: "File is not a zip file".into(),
            })
        }
    }

    struct PngTool;

    impl RasterTool for PngTool {
        fn name(&self) -> &str {
            "png"
        }

        fn rasterize(&self, _: &[u8], _: &str) -> Result<Vec<u8>, ToolError> {
            Ok(b"\x89PNG".to_vec())
        }
    }

    fn job(rel: &str, asset_dir: &str) -> ConversionJob {
        ConversionJob {
            source_path: PathBuf::from("/in").join(rel),
            relative_path: PathBuf::from(rel),
            format: formats::classify(Path::new(rel)).unwrap(),
            output_relative: PathBuf::from(rel).with_extension("md"),
            asset_dir_name: asset_dir.into(),
        }
    }

    fn ctx(engine: impl ConversionEngine + 'static, tool: Option<Arc<dyn RasterTool>>) -> RunContext {
        RunContext::new(Arc::new(engine), tool)
    }

    #[test]
    fn duplicate_names_are_disambiguated_and_referenced() {
        let out = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine {
            markdown: "![one](image.png)\n\n![two](image.png)\n",
            title: Some("Quarterly Report"),
            assets: vec![("image.png", vec![1]), ("image.png", vec![2])],
        };
        let result = convert_document(job("report.docx", "report"), out.path(), &ctx(engine, None));

        assert!(result.is_success(), "{:?}", result.status);
        let images = out.path().join("docs/images/report");
        assert_eq!(std::fs::read(images.join("image.png")).unwrap(), vec![1]);
        assert_eq!(std::fs::read(images.join("image_1.png")).unwrap(), vec![2]);
        assert_eq!(
            result.markdown,
            "# Quarterly Report\n\n![one](images/report/image.png)\n\n![two](images/report/image_1.png)\n"
        );
    }

    #[test]
    fn identical_images_are_written_once() {
        let out = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine {
            markdown: "![logo](image.png)\n\n![logo](image.png)\n\n![chart](image.png)\n",
            title: Some("Kickoff"),
            assets: vec![
                ("image.png", vec![9, 9]),
                ("image.png", vec![9, 9]),
                ("image.png", vec![3]),
            ],
        };
        let result = convert_document(job("deck.pptx", "deck"), out.path(), &ctx(engine, None));

        assert!(result.is_success(), "{:?}", result.status);
        let images = out.path().join("docs/images/deck");
        let mut files: Vec<_> = std::fs::read_dir(&images)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        assert_eq!(files, vec!["image.png", "image_1.png"]);
        assert_eq!(std::fs::read(images.join("image_1.png")).unwrap(), vec![3]);
        assert_eq!(
            result.markdown,
            "# Kickoff\n\n![logo](images/deck/image.png)\n\n![logo](images/deck/image.png)\n\n![chart](images/deck/image_1.png)\n"
        );
        assert_eq!(
            result.assets[1].outcome,
            AssetOutcome::Shared {
                path: PathBuf::from("images/deck/image.png")
            }
        );
    }

    #[test]
    fn failed_image_write_removes_the_image_folder() {
        let out = tempfile::tempdir().unwrap();
        let images = out.path().join("docs/images/report");
        // A folder where the second image should go makes its rename fail.
        std::fs::create_dir_all(images.join("b.png")).unwrap();
        let engine = ScriptedEngine {
            markdown: "![](a.png) ![](b.png)",
            title: None,
            assets: vec![("a.png", vec![1]), ("b.png", vec![2])],
        };
        let result = convert_document(job("report.docx", "report"), out.path(), &ctx(engine, None));

        assert!(matches!(
            result.status,
            ConversionStatus::Failed(DocumentError::WriteFailed { .. })
        ));
        assert!(!images.exists());
        assert!(!out.path().join("docs/report.md").exists());
    }

    #[test]
    fn nested_pages_link_upwards() {
        let out = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine {
            markdown: "# Plan\n\n![](chart.png)",
            title: None,
            assets: vec![("chart.png", vec![7])],
        };
        let result = convert_document(job("team/q3/plan.docx", "team-q3-plan"), out.path(), &ctx(engine, None));

        assert!(result.markdown.contains("![](../../images/team-q3-plan/chart.png)"));
        let page = out.path().join("docs/team/q3/plan.md");
        assert_eq!(result.output_path.as_deref(), Some(page.as_path()));
        let target = page.parent().unwrap().join("../../images/team-q3-plan/chart.png");
        assert!(target.exists());
    }

    #[test]
    fn legacy_image_without_tool_leaves_no_trace() {
        let out = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine {
            markdown: "Intro\n\n![Org chart](image1.wmf)\n",
            title: None,
            assets: vec![("image1.wmf", vec![0xd7, 0xcd])],
        };
        let result = convert_document(job("org.docx", "org"), out.path(), &ctx(engine, None));

        assert!(result.is_success());
        assert!(!out.path().join("docs/images").exists());
        assert!(!result.markdown.contains("image1.wmf"));
        assert!(result.markdown.contains("*Org chart*"));
        assert!(matches!(result.assets[0].outcome, AssetOutcome::Dropped { .. }));
    }

    #[test]
    fn legacy_image_with_tool_is_renamed_to_png() {
        let out = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine {
            markdown: "![](image1.emf)",
            title: None,
            assets: vec![("image1.emf", vec![1])],
        };
        let result = convert_document(job("a.docx", "a"), out.path(), &ctx(engine, Some(Arc::new(PngTool))));
        assert!(result.markdown.contains("![](images/a/image1.png)"));
        assert!(out.path().join("docs/images/a/image1.png").exists());
    }

    #[test]
    fn no_assets_means_no_image_folder() {
        let out = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine {
            markdown: "Just text.",
            title: None,
            assets: vec![],
        };
        let result = convert_document(job("My_Notes.docx", "My-Notes"), out.path(), &ctx(engine, None));
        assert_eq!(result.markdown, "# My Notes\n\nJust text.\n");
        assert!(!out.path().join("docs/images").exists());
    }

    #[test]
    fn engine_rejection_is_a_failure_with_message() {
        let out = tempfile::tempdir().unwrap();
        let result = convert_document(job("broken.pptx", "broken"), out.path(), &ctx(RejectingEngine, None));
        match result.status {
            ConversionStatus::Failed(DocumentError::EngineRejected { detail, .. }) => {
                assert_eq!(detail, "File is not a zip file")
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!out.path().join("docs/broken.md").exists());
    }

    #[test]
    fn write_atomic_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/page.md");
        write_atomic(&path, b"x").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"x");
        assert!(!dir.path().join("a/b/page.md.tmp").exists());
    }

    #[test]
    fn existing_h1_is_kept() {
        assert!(starts_with_h1("\n# Title\nbody"));
        assert!(!starts_with_h1("## Sub\n# Title"));
        assert!(!starts_with_h1("#hashtag"));
    }
}
