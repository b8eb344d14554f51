//! Data types flowing through a run: jobs in, results and a report out.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::DocumentError;
use crate::formats::SupportedFormat;

/// One discovered input file, ready to convert.
///
/// Built during discovery and consumed exactly once by
/// [`crate::pipeline::document::convert_document`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionJob {
    /// Absolute path of the source file.
    pub source_path: PathBuf,
    /// Path relative to the input root.
    pub relative_path: PathBuf,
    pub format: SupportedFormat,
    /// Markdown path relative to `<output>/docs`.
    pub output_relative: PathBuf,
    /// Folder name under `<output>/docs/images/` for this document's assets.
    pub asset_dir_name: String,
}

impl ConversionJob {
    /// Source stem, used as the fallback page title.
    pub fn stem(&self) -> String {
        self.relative_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Number of folders between `docs/` and the Markdown file.
    pub fn depth(&self) -> usize {
        self.output_relative
            .parent()
            .map(|p| p.components().count())
            .unwrap_or(0)
    }
}

/// An image pulled out of a document by the conversion engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedAsset {
    /// Name the Markdown refers to it by.
    pub original_name: String,
    pub payload: Vec<u8>,
    /// Lowercase extension without the dot, e.g. `png`, `wmf`.
    pub inferred_format: String,
}

impl ExtractedAsset {
    pub fn new(original_name: impl Into<String>, payload: Vec<u8>) -> Self {
        let original_name = original_name.into();
        let inferred_format = Path::new(&original_name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        Self {
            original_name,
            payload,
            inferred_format,
        }
    }
}

/// What happened to one extracted asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AssetOutcome {
    /// Written relative to `<output>/docs`.
    Written { path: PathBuf },
    /// Byte-identical to an earlier asset of the same document; refers to
    /// that asset's file.
    Shared { path: PathBuf },
    Dropped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRecord {
    pub original_name: String,
    pub outcome: AssetOutcome,
}

impl AssetRecord {
    pub fn is_written(&self) -> bool {
        matches!(self.outcome, AssetOutcome::Written { .. })
    }
}

/// Final status of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ConversionStatus {
    Success,
    /// Recognised format, but nothing on this machine can convert it.
    Skipped(String),
    Failed(DocumentError),
}

/// Outcome of converting one [`ConversionJob`].
///
/// Asset payloads are not kept: each asset is written or dropped during the
/// conversion and only its [`AssetRecord`] survives.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    pub job: ConversionJob,
    /// Final Markdown as written to disk; empty unless `Success`.
    #[serde(skip)]
    pub markdown: String,
    pub assets: Vec<AssetRecord>,
    /// Absolute path of the written Markdown file.
    pub output_path: Option<PathBuf>,
    pub status: ConversionStatus,
}

impl ConversionResult {
    pub fn failed(job: ConversionJob, error: DocumentError) -> Self {
        Self {
            job,
            markdown: String::new(),
            assets: Vec::new(),
            output_path: None,
            status: ConversionStatus::Failed(error),
        }
    }

    pub fn skipped(job: ConversionJob, reason: impl Into<String>) -> Self {
        Self {
            job,
            markdown: String::new(),
            assets: Vec::new(),
            output_path: None,
            status: ConversionStatus::Skipped(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ConversionStatus::Success)
    }
}

/// A skipped or failed input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileIssue {
    /// Relative to the input root.
    pub path: PathBuf,
    pub reason: String,
}

/// Summary of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub succeeded: usize,
    pub skipped: Vec<FileIssue>,
    /// In discovery order.
    pub failed: Vec<FileIssue>,
    pub assets_written: usize,
    /// Repeats that point at an already written file.
    pub assets_shared: usize,
    pub assets_dropped: usize,
    /// Path of the written `mkdocs.yml`.
    pub site_config: PathBuf,
    pub pages_in_nav: usize,
    pub duration_ms: u64,
}

impl RunReport {
    /// Folds one result into the tally.
    pub fn record(&mut self, result: &ConversionResult) {
        for asset in &result.assets {
            match asset.outcome {
                AssetOutcome::Written { .. } => self.assets_written += 1,
                AssetOutcome::Shared { .. } => self.assets_shared += 1,
                AssetOutcome::Dropped { .. } => self.assets_dropped += 1,
            }
        }
        let path = result.job.relative_path.clone();
        match &result.status {
            ConversionStatus::Success => self.succeeded += 1,
            ConversionStatus::Skipped(reason) => self.skipped.push(FileIssue {
                path,
                reason: reason.clone(),
            }),
            ConversionStatus::Failed(e) => self.failed.push(FileIssue {
                path,
                reason: e.to_string(),
            }),
        }
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.skipped.len() + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats;

    fn job(rel: &str) -> ConversionJob {
        ConversionJob {
            source_path: PathBuf::from("/in").join(rel),
            relative_path: PathBuf::from(rel),
            format: formats::classify(Path::new(rel)).unwrap(),
            output_relative: PathBuf::from(rel).with_extension("md"),
            asset_dir_name: "x".into(),
        }
    }

    #[test]
    fn depth_counts_parent_folders() {
        assert_eq!(job("a.docx").depth(), 0);
        assert_eq!(job("team/plans/a.docx").depth(), 2);
    }

    #[test]
    fn asset_format_inferred_from_name() {
        let a = ExtractedAsset::new("Figure 1.WMF", vec![1, 2]);
        assert_eq!(a.inferred_format, "wmf");
        assert_eq!(ExtractedAsset::new("blob", vec![]).inferred_format, "");
    }

    #[test]
    fn report_tallies_each_status() {
        let mut report = RunReport::default();
        let mut ok = ConversionResult::skipped(job("a.txt"), "x");
        ok.status = ConversionStatus::Success;
        ok.assets = vec![
            AssetRecord {
                original_name: "a.png".into(),
                outcome: AssetOutcome::Written {
                    path: "images/a/a.png".into(),
                },
            },
            AssetRecord {
                original_name: "a-copy.png".into(),
                outcome: AssetOutcome::Shared {
                    path: "images/a/a.png".into(),
                },
            },
            AssetRecord {
                original_name: "b.wmf".into(),
                outcome: AssetOutcome::Dropped {
                    reason: "conversion tool unavailable".into(),
                },
            },
        ];
        report.record(&ok);
        report.record(&ConversionResult::skipped(job("b.pptx"), "no converter"));
        report.record(&ConversionResult::failed(
            job("c.pdf"),
            DocumentError::Unreadable {
                detail: "boom".into(),
            },
        ));

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.failed[0].path, PathBuf::from("c.pdf"));
        assert!(report.failed[0].reason.contains("boom"));
        assert_eq!(
            (report.assets_written, report.assets_shared, report.assets_dropped),
            (1, 1, 1)
        );
        assert_eq!(report.total(), 3);
        assert!(report.has_failures());
    }
}
