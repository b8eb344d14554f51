//! Input discovery: walk the input folder and build one job per document.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::SiteError;
use crate::formats::{self, SupportedFormat};
use crate::naming::{self, NameAllocator};
use crate::output::ConversionJob;

/// A supported file found under the input root.
#[derive(Debug, Clone)]
struct Candidate {
    source_path: PathBuf,
    relative_path: PathBuf,
    format: SupportedFormat,
}

/// Recursively lists supported documents under `input_root`, in a stable
/// order, and assigns each a unique output path.
///
/// Directory entries are visited sorted by name. Hidden entries, symlinked
/// folders and `skip_dir` (the output folder, when it sits inside the
/// input) are not descended into. Unsupported files are left out without a
/// trace in the report.
pub fn discover(input_root: &Path, skip_dir: Option<&Path>) -> Result<Vec<ConversionJob>, SiteError> {
    if !input_root.exists() {
        return Err(SiteError::InputNotFound {
            path: input_root.to_path_buf(),
        });
    }
    if !input_root.is_dir() {
        return Err(SiteError::InputNotADirectory {
            path: input_root.to_path_buf(),
        });
    }

    let mut candidates = Vec::new();
    let root_entries = read_sorted(input_root).map_err(|source| SiteError::ReadDir {
        path: input_root.to_path_buf(),
        source,
    })?;
    walk(root_entries, Path::new(""), skip_dir, &mut candidates);

    Ok(assign_outputs(candidates))
}

fn read_sorted(dir: &Path) -> std::io::Result<Vec<std::fs::DirEntry>> {
    let mut entries = std::fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

fn walk(
    entries: Vec<std::fs::DirEntry>,
    relative: &Path,
    skip_dir: Option<&Path>,
    out: &mut Vec<Candidate>,
) {
    for entry in entries {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        let rel = relative.join(&name);
        let Ok(file_type) = entry.file_type() else {
            warn!("Cannot stat {}; skipping", path.display());
            continue;
        };

        let is_dir = if file_type.is_symlink() {
            if path.is_dir() {
                debug!("Not following symlinked folder {}", path.display());
                continue;
            }
            false
        } else {
            file_type.is_dir()
        };

        if is_dir {
            if skip_dir.is_some_and(|skip| is_same_dir(&path, skip)) {
                debug!("Skipping output folder {}", path.display());
                continue;
            }
            match read_sorted(&path) {
                Ok(children) => walk(children, &rel, skip_dir, out),
                Err(e) => warn!("Cannot read folder {}: {}", path.display(), e),
            }
            continue;
        }

        match formats::classify(&path) {
            Some(format) => out.push(Candidate {
                source_path: path,
                relative_path: rel,
                format,
            }),
            None => debug!("Skipping unsupported file {}", rel.display()),
        }
    }
}

fn is_same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Mirrors each relative path under `docs/` with a `.md` extension.
///
/// `report.docx` and `report.pdf` in one folder would both become
/// `report.md`; the later one in discovery order gets `report-pdf.md`.
fn assign_outputs(candidates: Vec<Candidate>) -> Vec<ConversionJob> {
    let mut taken_pages: HashSet<String> = HashSet::new();
    let mut asset_dirs = NameAllocator::new();

    candidates
        .into_iter()
        .map(|c| {
            let parent = c.relative_path.parent().unwrap_or(Path::new("")).to_path_buf();
            let stem = naming::sanitize_stem(
                &c.relative_path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
            let ext = c.format.extension.trim_start_matches('.');

            let mut page_stem = stem.clone();
            let mut n = 0usize;
            let output_relative = loop {
                let candidate = parent.join(format!("{page_stem}.md"));
                if taken_pages.insert(key(&candidate)) {
                    break candidate;
                }
                n += 1;
                page_stem = if n == 1 {
                    format!("{stem}-{ext}")
                } else {
                    format!("{stem}-{ext}_{}", n - 1)
                };
            };

            let asset_dir_name = asset_dirs.claim(&asset_dir_for(&output_relative));

            ConversionJob {
                source_path: c.source_path,
                relative_path: c.relative_path,
                format: c.format,
                output_relative,
                asset_dir_name,
            }
        })
        .collect()
}

/// `team/plans/report.md` → `team-plans-report`.
fn asset_dir_for(output_relative: &Path) -> String {
    output_relative
        .with_extension("")
        .components()
        .map(|c| naming::sanitize_stem(&c.as_os_str().to_string_lossy()))
        .collect::<Vec<_>>()
        .join("-")
}

fn key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}
