//! Site assembly: navigation from the output tree plus `mkdocs.yml`.
//!
//! Runs once, after every document has been written. The navigation mirrors
//! `docs/` exactly, so it only ever lists pages that exist on disk.

pub mod settings;
pub mod tree;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SiteError;
use crate::pipeline::document::write_atomic;
use crate::pipeline::DOCS_DIR;

pub use settings::{SiteConfig, DEFAULT_TITLE};
pub use tree::OutputNode;

/// Name of the site configuration file under the output root.
pub const CONFIG_FILE: &str = "mkdocs.yml";

/// Scans `output_root/docs` and merges the result with site settings.
///
/// An explicit `title` wins over the `site_name` of `existing_config`, which
/// wins over [`DEFAULT_TITLE`].
pub fn build_site(
    output_root: &Path,
    title: Option<&str>,
    existing_config: Option<&Path>,
) -> Result<SiteConfig, SiteError> {
    let docs = output_root.join(DOCS_DIR);
    let navigation = tree::scan_docs(&docs)
        .map_err(|source| SiteError::OutputUnavailable { path: docs, source })?;
    let (settings, existing_title) = settings::load_settings(existing_config)?;

    let title = title
        .map(str::to_string)
        .or(existing_title)
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    debug!("Site '{}' with {} top-level nav entries", title, navigation.len());
    Ok(SiteConfig {
        title,
        settings,
        navigation,
    })
}

/// Writes `output_root/mkdocs.yml` atomically and returns its path.
pub fn write_site_config(config: &SiteConfig, output_root: &Path) -> Result<PathBuf, SiteError> {
    let yaml = config.to_yaml()?;
    let path = output_root.join(CONFIG_FILE);
    write_atomic(&path, yaml.as_bytes()).map_err(|source| SiteError::ConfigWriteFailed {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_writes_config() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join(DOCS_DIR);
        std::fs::create_dir_all(docs.join("guides")).unwrap();
        std::fs::write(docs.join("index.md"), "# Welcome\n").unwrap();
        std::fs::write(docs.join("guides/setup.md"), "no heading\n").unwrap();

        let config = build_site(dir.path(), Some("Team Handbook"), None).unwrap();
        assert_eq!(config.title, "Team Handbook");
        assert_eq!(config.page_count(), 2);

        let path = write_site_config(&config, dir.path()).unwrap();
        let yaml = std::fs::read_to_string(path).unwrap();
        assert!(yaml.starts_with("site_name: Team Handbook\n"));
        assert!(yaml.contains("- Welcome: index.md"));
        assert!(yaml.contains("- Guides:"));
        assert!(yaml.contains("- Setup: guides/setup.md"));
        assert!(!dir.path().join("mkdocs.yml.tmp").exists());
    }

    #[test]
    fn title_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("custom.yml");
        std::fs::write(&existing, "site_name: From File\n").unwrap();

        assert_eq!(build_site(dir.path(), None, None).unwrap().title, DEFAULT_TITLE);
        assert_eq!(
            build_site(dir.path(), None, Some(&existing)).unwrap().title,
            "From File"
        );
        assert_eq!(
            build_site(dir.path(), Some("Given"), Some(&existing)).unwrap().title,
            "Given"
        );
    }
}
