//! Pipeline stages for folder-to-site conversion.
//!
//! Each submodule implements one step. The per-document steps run inside a
//! blocking worker; discovery runs before them and the site builder
//! ([`crate::site`]) after all of them.
//!
//! ## Data Flow
//!
//! ```text
//! discover ──▶ engine ──▶ normalize ──▶ rewrite ──▶ postprocess ──▶ write
//! (walk)       (md+imgs)  (png/svg..)   (img refs)  (cleanup)      (docs/)
//! ```
//!
//! 1. [`discover`]: walk the input root, classify files, assign output paths
//! 2. [`document`]: drive one job through the remaining stages
//! 3. [`normalize`]: make each extracted image browser-displayable
//! 4. [`rewrite`]: point image references at the relocated files
//! 5. [`postprocess`]: deterministic Markdown cleanup rules

pub mod discover;
pub mod document;
pub mod normalize;
pub mod postprocess;
pub mod rewrite;

/// Folder under the output root holding every Markdown page.
pub const DOCS_DIR: &str = "docs";

/// Folder under [`DOCS_DIR`] holding one sub-folder of images per document.
pub const IMAGES_DIR: &str = "images";
