//! Site settings: defaults, loading an existing `mkdocs.yml`, and YAML output.

use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::warn;

use super::tree::OutputNode;
use crate::error::SiteError;

/// Title used when neither the caller nor an existing config supplies one.
pub const DEFAULT_TITLE: &str = "Documentation";

const DEFAULT_SETTINGS: &str = r#"
theme:
  name: material
  features:
    - navigation.instant
    - navigation.tracking
    - navigation.sections
    - navigation.expand
    - toc.integrate
  palette:
    primary: blue
    accent: blue
docs_dir: docs
use_directory_urls: false
markdown_extensions:
  - attr_list
  - md_in_html
  - tables
  - fenced_code
  - footnotes
  - admonition
  - toc
  - pymdownx.highlight
  - pymdownx.superfences
"#;

/// Everything needed to write `mkdocs.yml`.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    pub title: String,
    /// Every key except `site_name` and `nav`, in file order.
    pub settings: Mapping,
    pub navigation: Vec<OutputNode>,
}

impl SiteConfig {
    /// Pages reachable from the navigation.
    pub fn page_count(&self) -> usize {
        self.navigation.iter().map(OutputNode::page_count).sum()
    }

    /// Serialises as `site_name`, the settings, then `nav`.
    pub fn to_yaml(&self) -> Result<String, SiteError> {
        let mut doc = Mapping::new();
        doc.insert("site_name".into(), Value::String(self.title.clone()));
        for (k, v) in &self.settings {
            doc.insert(k.clone(), v.clone());
        }
        doc.insert("nav".into(), nav_value(&self.navigation));
        serde_yaml::to_string(&Value::Mapping(doc)).map_err(|e| SiteError::Serialize(e.to_string()))
    }
}

/// Built-in Material theme settings.
pub fn default_settings() -> Result<Mapping, SiteError> {
    serde_yaml::from_str(DEFAULT_SETTINGS)
        .map_err(|e| SiteError::Internal(format!("default site settings: {e}")))
}

/// Settings and `site_name` from an existing config.
///
/// Anything unreadable, or not a YAML mapping, falls back to the defaults
/// with a warning.
pub fn load_settings(existing: Option<&Path>) -> Result<(Mapping, Option<String>), SiteError> {
    let Some(path) = existing else {
        return Ok((default_settings()?, None));
    };
    match read_mapping(path) {
        Ok(map) => {
            let mut site_name = None;
            let mut settings = Mapping::new();
            for (key, value) in map {
                match key.as_str() {
                    Some("nav") => {}
                    Some("site_name") => {
                        site_name = value
                            .as_str()
                            .filter(|s| !s.trim().is_empty())
                            .map(str::to_string);
                    }
                    _ => {
                        settings.insert(key, value);
                    }
                }
            }
            Ok((settings, site_name))
        }
        Err(reason) => {
            warn!(
                "Cannot use site config '{}': {}; using defaults",
                path.display(),
                reason
            );
            Ok((default_settings()?, None))
        }
    }
}

fn read_mapping(path: &Path) -> Result<Mapping, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("failed to read: {e}"))?;
    match serde_yaml::from_str::<Value>(&text).map_err(|e| format!("failed to parse: {e}"))? {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        _ => Err("top level is not a mapping".to_string()),
    }
}

/// `Page` → `{title: path}`, `Folder` → `{title: [children]}`.
fn nav_value(nodes: &[OutputNode]) -> Value {
    Value::Sequence(
        nodes
            .iter()
            .map(|node| {
                let inner = match node {
                    OutputNode::Page { output_path, .. } => Value::String(output_path.clone()),
                    OutputNode::Folder { children, .. } => nav_value(children),
                };
                let mut entry = Mapping::new();
                entry.insert(Value::String(node.title().to_string()), inner);
                Value::Mapping(entry)
            })
            .collect(),
    )
}
