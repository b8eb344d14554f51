//! Image reference rewriting.
//!
//! After a document's assets have been written (or dropped), every inline
//! image reference `![alt](target "title")` is resolved against them:
//!
//! * the k-th reference to a name gets the k-th asset extracted under that
//!   name, so duplicates such as two `image.png` stay distinct;
//! * a reference to a written asset is re-pointed at its new location;
//! * a reference to a dropped asset, or a local target nothing was
//!   extracted for, becomes its alt text in italics (or disappears when
//!   there is none), so no broken image is ever left behind;
//! * remote (`http:`, `https:`) and inline `data:` targets are untouched.
//!
//! Image syntax inside code blocks and code spans is text, not a reference,
//! and is left exactly as written.

use std::collections::HashMap;
use std::path::Path;

use crate::markdown;

/// Where one extracted asset ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Name the engine used for the asset.
    pub original_name: String,
    /// Link target relative to the Markdown file; `None` when dropped.
    pub target: Option<String>,
}

/// Rewrites image references in `source` against `placements`.
pub fn rewrite_references(source: &str, placements: &[Placement]) -> String {
    let mut by_name: HashMap<String, Vec<&Placement>> = HashMap::new();
    for p in placements {
        by_name.entry(reference_key(&p.original_name)).or_default().push(p);
    }
    let mut seen: HashMap<String, usize> = HashMap::new();

    let source = markdown::join_broken_alt_text(source);
    let edits: Vec<_> = markdown::inline_images(&source)
        .into_iter()
        .filter(|image| !is_external(&image.target))
        .map(|image| {
            let key = reference_key(&image.target);
            let replacement = match by_name.get(&key) {
                None => caption(image.alt),
                Some(candidates) => {
                    let nth = seen.entry(key).or_insert(0);
                    let placement = candidates[(*nth).min(candidates.len() - 1)];
                    *nth += 1;
                    match &placement.target {
                        Some(new_target) => format!("![{}]({new_target}{})", image.alt, image.title),
                        None => caption(image.alt),
                    }
                }
            };
            (image.range, replacement)
        })
        .collect();

    markdown::splice(&source, edits)
}

/// Image targets in `source` that point at local files.
pub fn local_targets(source: &str) -> Vec<String> {
    markdown::inline_images(source)
        .into_iter()
        .map(|image| image.target)
        .filter(|t| !is_external(t))
        .collect()
}

/// Link target for an asset, relative to a page `depth` folders below `docs/`.
pub fn relative_target(depth: usize, asset_dir: &str, file_name: &str) -> String {
    format!("{}images/{asset_dir}/{file_name}", "../".repeat(depth))
}

fn caption(alt: &str) -> String {
    let alt = alt.trim();
    if alt.is_empty() {
        String::new()
    } else {
        format!("*{alt}*")
    }
}

fn is_external(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    ["http://", "https://", "data:", "//"]
        .iter()
        .any(|p| lower.starts_with(p))
}

/// File-name component, `%20` decoded, case-folded.
fn reference_key(target: &str) -> String {
    let target = target.split(['?', '#']).next().unwrap_or(target);
    let name = Path::new(target)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| target.to_string());
    name.replace("%20", " ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(name: &str, target: &str) -> Placement {
        Placement {
            original_name: name.into(),
            target: Some(target.into()),
        }
    }

    fn dropped(name: &str) -> Placement {
        Placement {
            original_name: name.into(),
            target: None,
        }
    }

    #[test]
    fn duplicates_pair_in_order() {
        let md = "![first](image.png)\n\n![second](image.png)";
        let out = rewrite_references(
            md,
            &[
                written("image.png", "images/doc/image.png"),
                written("image.png", "images/doc/image_1.png"),
            ],
        );
        assert_eq!(
            out,
            "![first](images/doc/image.png)\n\n![second](images/doc/image_1.png)"
        );
    }

    #[test]
    fn surplus_references_reuse_last_asset() {
        let out = rewrite_references(
            "![a](logo.png) ![b](logo.png)",
            &[written("logo.png", "images/d/logo.png")],
        );
        assert_eq!(out, "![a](images/d/logo.png) ![b](images/d/logo.png)");
    }

    #[test]
    fn dropped_asset_becomes_caption() {
        let out = rewrite_references(
            "Before ![Org chart](chart.wmf) after ![](chart2.wmf)",
            &[dropped("chart.wmf"), dropped("chart2.wmf")],
        );
        assert_eq!(out, "Before *Org chart* after ");
    }

    #[test]
    fn dangling_local_reference_is_removed() {
        let out = rewrite_references("![Picture 3](Picture3.jpg)", &[]);
        assert_eq!(out, "*Picture 3*");
    }

    #[test]
    fn remote_and_data_targets_are_untouched() {
        let md = "![a](https://x.io/a.png) ![b](data:image/png;base64,AAAA)";
        assert_eq!(rewrite_references(md, &[]), md);
    }

    #[test]
    fn title_and_folders_are_handled() {
        let out = rewrite_references(
            r#"![Fig](media/Image1.PNG "Figure 1")"#,
            &[written("image1.png", "../images/sub-doc/image1.png")],
        );
        assert_eq!(out, r#"![Fig](../images/sub-doc/image1.png "Figure 1")"#);
    }

    #[test]
    fn angle_bracket_targets_with_spaces() {
        let out = rewrite_references(
            "![x](<My Chart.png>)",
            &[written("My Chart.png", "images/d/My-Chart.png")],
        );
        assert_eq!(out, "![x](images/d/My-Chart.png)");
    }

    #[test]
    fn image_syntax_in_code_is_left_alone() {
        let md = "Example:\n\n```markdown\n![diagram](diagram.png)\n```\n\nInline `![x](x.png)` too.\n";
        assert_eq!(rewrite_references(md, &[]), md);
    }

    #[test]
    fn references_after_a_code_block_still_pair_in_order() {
        let md = "```\n![a](image.png)\n```\n\n![first](image.png)";
        let out = rewrite_references(md, &[written("image.png", "images/doc/image.png")]);
        assert_eq!(out, "```\n![a](image.png)\n```\n\n![first](images/doc/image.png)");
    }

    #[test]
    fn alt_text_split_over_paragraphs_is_rejoined() {
        let out = rewrite_references(
            "![Figure 1\n\nSales](chart.png)",
            &[written("chart.png", "images/d/chart.png")],
        );
        assert_eq!(out, "![Figure 1 Sales](images/d/chart.png)");
    }

    #[test]
    fn local_targets_excludes_remote() {
        let md = "![a](images/x/a.png) ![b](https://x.io/b.png)";
        assert_eq!(local_targets(md), vec!["images/x/a.png".to_string()]);
    }

    #[test]
    fn relative_target_climbs_to_docs_root() {
        assert_eq!(relative_target(0, "report", "a.png"), "images/report/a.png");
        assert_eq!(
            relative_target(2, "a-b-report", "a.png"),
            "../../images/a-b-report/a.png"
        );
    }
}
