//! Output tree scan: turn `docs/` into an ordered navigation tree.

use std::cmp::Ordering;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::{markdown, naming};

/// One entry of the navigation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputNode {
    Folder {
        name: String,
        title: String,
        children: Vec<OutputNode>,
    },
    Page {
        name: String,
        title: String,
        /// Path relative to `docs/`, always with `/` separators.
        output_path: String,
    },
}

impl OutputNode {
    pub fn title(&self) -> &str {
        match self {
            Self::Folder { title, .. } | Self::Page { title, .. } => title,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Folder { name, .. } | Self::Page { name, .. } => name,
        }
    }

    /// Number of pages at or below this node.
    pub fn page_count(&self) -> usize {
        match self {
            Self::Page { .. } => 1,
            Self::Folder { children, .. } => children.iter().map(Self::page_count).sum(),
        }
    }

    fn sort_name(&self) -> &str {
        match self {
            Self::Folder { name, .. } => name,
            Self::Page { name, .. } => name.strip_suffix(".md").unwrap_or(name),
        }
    }

    fn is_index(&self) -> bool {
        matches!(self, Self::Page { .. }) && self.sort_name().eq_ignore_ascii_case("index")
    }
}

/// Scans `docs_dir` into navigation nodes.
///
/// A missing `docs_dir` yields an empty tree. Folders without any page
/// below them are left out, as are hidden entries and symlinked folders.
pub fn scan_docs(docs_dir: &Path) -> std::io::Result<Vec<OutputNode>> {
    if !docs_dir.is_dir() {
        return Ok(Vec::new());
    }
    scan(docs_dir, "")
}

fn scan(dir: &Path, prefix: &str) -> std::io::Result<Vec<OutputNode>> {
    let mut nodes = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        let rel = format!("{prefix}{name}");
        let file_type = entry.file_type()?;

        if file_type.is_symlink() && path.is_dir() {
            debug!("Not following symlinked folder {}", path.display());
            continue;
        }

        if file_type.is_dir() {
            let children = scan(&path, &format!("{rel}/"))?;
            if children.is_empty() {
                continue;
            }
            nodes.push(OutputNode::Folder {
                title: naming::title_case(&name),
                name,
                children,
            });
        } else if is_markdown(&name) {
            let stem = name.strip_suffix(".md").unwrap_or(&name);
            let title = first_heading(&path).unwrap_or_else(|| naming::title_case(stem));
            nodes.push(OutputNode::Page {
                name,
                title,
                output_path: rel,
            });
        }
    }
    nodes.sort_by(nav_order);
    Ok(nodes)
}

fn is_markdown(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("md"))
}

/// `index` first, then case-insensitive by name with exact-name tiebreak.
/// A page sorts before a folder of the same name.
fn nav_order(a: &OutputNode, b: &OutputNode) -> Ordering {
    b.is_index()
        .cmp(&a.is_index())
        .then_with(|| a.sort_name().to_lowercase().cmp(&b.sort_name().to_lowercase()))
        .then_with(|| a.sort_name().cmp(b.sort_name()))
        .then_with(|| {
            matches!(a, OutputNode::Folder { .. }).cmp(&matches!(b, OutputNode::Folder { .. }))
        })
}

/// Text of the first level-one heading outside code, sanitised.
fn first_heading(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    heading_in(&text)
}

fn heading_in(text: &str) -> Option<String> {
    markdown::h1_headings(text)
        .iter()
        .map(|h| naming::sanitize_title(h))
        .find(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, body: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, body).unwrap();
    }

    fn names(nodes: &[OutputNode]) -> Vec<&str> {
        nodes.iter().map(OutputNode::name).collect()
    }

    #[test]
    fn index_first_then_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.md", "# B\n");
        write(dir.path(), "A/x.md", "# X\n");
        write(dir.path(), "index.md", "# Home\n");
        write(dir.path(), "a.md", "# a\n");

        let nodes = scan_docs(dir.path()).unwrap();
        assert_eq!(names(&nodes), vec!["index.md", "A", "a.md", "b.md"]);
    }

    #[test]
    fn empty_and_asset_only_folders_are_omitted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "images/report/image.png", "png");
        write(dir.path(), "report.md", "text\n");
        fs::create_dir_all(dir.path().join("empty/deeper")).unwrap();

        let nodes = scan_docs(dir.path()).unwrap();
        assert_eq!(names(&nodes), vec!["report.md"]);
        assert_eq!(nodes[0].title(), "Report");
    }

    #[test]
    fn nested_paths_use_forward_slashes() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "team-notes/q3/plan.md", "# Q3 Plan\n");

        let nodes = scan_docs(dir.path()).unwrap();
        let OutputNode::Folder { title, children, .. } = &nodes[0] else {
            panic!("expected folder");
        };
        assert_eq!(title, "Team Notes");
        let OutputNode::Folder { children, .. } = &children[0] else {
            panic!("expected folder");
        };
        assert_eq!(
            children[0],
            OutputNode::Page {
                name: "plan.md".into(),
                title: "Q3 Plan".into(),
                output_path: "team-notes/q3/plan.md".into(),
            }
        );
        assert_eq!(nodes[0].page_count(), 1);
    }

    #[test]
    fn heading_skips_code_fences() {
        assert_eq!(
            heading_in("```\n# not a title\n```\n# Real Title ##\n"),
            Some("Real Title".into())
        );
        assert_eq!(heading_in("## Only h2\n"), None);
    }

    #[test]
    fn heading_ignores_comments_inside_longer_fence() {
        let page = "````python\n```\n# comment\n```\n````\n\n# Setup Guide\n";
        assert_eq!(heading_in(page), Some("Setup Guide".into()));
        assert_eq!(heading_in("~~~sh\n# install\n~~~\n"), None);
    }

    #[test]
    fn missing_docs_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_docs(&dir.path().join("docs")).unwrap().is_empty());
    }
}
