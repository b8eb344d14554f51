//! Source-level views of a Markdown page.
//!
//! The rewriting and cleanup passes edit Markdown text in place, so they need
//! byte ranges into the source rather than rendered HTML. Everything here
//! walks `pulldown_cmark` events with their offsets: fences (of any length
//! and either fence character), inline code and links are told apart by the
//! parser, not by line prefixes.

use std::ops::Range;

use once_cell::sync::Lazy;
use pulldown_cmark::{Event, HeadingLevel, LinkType, Options, Parser, Tag, TagEnd};
use regex::Regex;

fn parser(markdown: &str) -> Parser<'_> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    Parser::new_ext(markdown, options)
}

// ── Images ───────────────────────────────────────────────────────────────────

/// An inline image `![alt](target "title")` as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpan<'a> {
    pub range: Range<usize>,
    /// Alt text exactly as written.
    pub alt: &'a str,
    /// Destination with angle brackets and escapes resolved.
    pub target: String,
    /// Title suffix as written, leading whitespace included. Often empty.
    pub title: &'a str,
}

static RE_IMAGE_TAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\]\(\s*(?:<[^>\n]*>|[^\s)]+)(\s+(?:"[^"\n]*"|'[^'\n]*'|\([^)\n]*\)))?\s*\)$"#,
    )
    .unwrap()
});

/// Inline images outside code, in document order. Images nested in another
/// image's alt text and reference-style images are not reported.
pub fn inline_images(markdown: &str) -> Vec<ImageSpan<'_>> {
    let mut images = Vec::new();
    let mut depth = 0usize;
    for (event, range) in parser(markdown).into_offset_iter() {
        match event {
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                ..
            }) => {
                depth += 1;
                if depth > 1 || link_type != LinkType::Inline {
                    continue;
                }
                let source = &markdown[range.clone()];
                let Some(tail) = RE_IMAGE_TAIL.captures(source).and_then(|c| {
                    let whole = c.get(0)?;
                    Some((whole.start(), c.get(1).map_or("", |m| m.as_str())))
                }) else {
                    continue;
                };
                let (tail_start, title) = tail;
                let Some(alt) = source.get(2..tail_start) else {
                    continue;
                };
                images.push(ImageSpan {
                    range,
                    alt,
                    target: dest_url.to_string(),
                    title,
                });
            }
            Event::End(TagEnd::Image) => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    images
}

static RE_IMAGE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(").unwrap());

/// Rejoins image alt text that a converter broke over several lines.
///
/// `![Figure 1\n\nSales](x.png)` is two paragraphs to a Markdown parser, so
/// this runs on the raw text, skipping anything inside code.
pub fn join_broken_alt_text(markdown: &str) -> String {
    let code = code_ranges(markdown);
    let edits: Vec<_> = RE_IMAGE_OPEN
        .captures_iter(markdown)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let alt = caps.get(1)?.as_str();
            if !alt.contains('\n') || overlaps(&whole.range(), &code) {
                return None;
            }
            let joined = alt.split_whitespace().collect::<Vec<_>>().join(" ");
            Some((whole.range(), format!("![{joined}](")))
        })
        .collect();
    splice(markdown, edits)
}

// ── Code and prose ───────────────────────────────────────────────────────────

/// Byte ranges of fenced and indented code blocks.
pub fn code_blocks(markdown: &str) -> Vec<Range<usize>> {
    parser(markdown)
        .into_offset_iter()
        .filter_map(|(event, range)| matches!(event, Event::Start(Tag::CodeBlock(_))).then_some(range))
        .collect()
}

/// Code blocks plus inline code spans.
pub fn code_ranges(markdown: &str) -> Vec<Range<usize>> {
    parser(markdown)
        .into_offset_iter()
        .filter_map(|(event, range)| match event {
            Event::Start(Tag::CodeBlock(_)) | Event::Code(_) => Some(range),
            _ => None,
        })
        .collect()
}

/// Runs of plain text outside code, links, images and raw HTML.
///
/// The parser splits text at characters that might open emphasis; adjacent
/// pieces are merged back so a URL containing `_` stays one run.
pub fn prose_ranges(markdown: &str) -> Vec<Range<usize>> {
    let mut runs: Vec<Range<usize>> = Vec::new();
    let mut nested = 0usize;
    for (event, range) in parser(markdown).into_offset_iter() {
        match event {
            Event::Start(
                Tag::CodeBlock(_) | Tag::Link { .. } | Tag::Image { .. } | Tag::HtmlBlock,
            ) => nested += 1,
            Event::End(TagEnd::CodeBlock | TagEnd::Link | TagEnd::Image | TagEnd::HtmlBlock) => {
                nested = nested.saturating_sub(1)
            }
            Event::Text(_) if nested == 0 => match runs.last_mut() {
                Some(last) if last.end == range.start => last.end = range.end,
                _ => runs.push(range),
            },
            _ => {}
        }
    }
    runs
}

// ── Headings ─────────────────────────────────────────────────────────────────

/// Plain text of every level-one heading, ATX or setext, in order.
pub fn h1_headings(markdown: &str) -> Vec<String> {
    let mut headings = Vec::new();
    let mut current: Option<String> = None;
    for event in parser(markdown) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => current = Some(String::new()),
            Event::End(TagEnd::Heading(HeadingLevel::H1)) => headings.extend(current.take()),
            Event::Text(text) | Event::Code(text) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(buf) = current.as_mut() {
                    buf.push(' ');
                }
            }
            _ => {}
        }
    }
    headings
}

// ── Editing ──────────────────────────────────────────────────────────────────

/// `true` when `range` shares at least one byte with any of `ranges`.
pub fn overlaps(range: &Range<usize>, ranges: &[Range<usize>]) -> bool {
    ranges.iter().any(|r| range.start < r.end && r.start < range.end)
}

/// Replaces each range with its text. Edits must be in ascending order;
/// one that overlaps an earlier edit is ignored.
pub fn splice(markdown: &str, edits: impl IntoIterator<Item = (Range<usize>, String)>) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut last = 0;
    for (range, text) in edits {
        if range.start < last {
            continue;
        }
        out.push_str(&markdown[last..range.start]);
        out.push_str(&text);
        last = range.end;
    }
    out.push_str(&markdown[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slices<'a>(md: &'a str, ranges: &[Range<usize>]) -> Vec<&'a str> {
        ranges.iter().map(|r| &md[r.clone()]).collect()
    }

    #[test]
    fn images_in_code_are_not_images() {
        let md = "![a](a.png)\n\n```markdown\n![b](b.png)\n```\n\nUse `![c](c.png)` inline.\n";
        let images = inline_images(md);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].target, "a.png");
        assert_eq!(&md[images[0].range.clone()], "![a](a.png)");
    }

    #[test]
    fn image_parts_keep_their_source_text() {
        let md = r#"See ![Fig [1]](<My Chart.png> "Figure 1") here"#;
        let images = inline_images(md);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].alt, "Fig [1]");
        assert_eq!(images[0].target, "My Chart.png");
        assert_eq!(images[0].title, r#" "Figure 1""#);
    }

    #[test]
    fn image_inside_link_is_found() {
        let md = "[![logo](logo.png)](https://x.io)";
        let images = inline_images(md);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].target, "logo.png");
    }

    #[test]
    fn shorter_fence_does_not_close_longer_one() {
        let md = "````xml\n```\n<a>https://x.io</a>\n```\n````\n\nafter https://y.io\n";
        let blocks = code_blocks(md);
        assert_eq!(blocks.len(), 1);
        assert!(md[blocks[0].clone()].contains("<a>https://x.io</a>"));
        assert_eq!(slices(md, &prose_ranges(md)), vec!["after https://y.io"]);
    }

    #[test]
    fn tilde_fence_is_not_closed_by_backticks() {
        let md = "~~~\n```\n# not a heading\n~~~\n";
        assert_eq!(code_blocks(md).len(), 1);
        assert!(h1_headings(md).is_empty());
    }

    #[test]
    fn prose_excludes_code_links_and_html() {
        let md = "Run `curl https://a.io` or [see https://b.io](https://b.io) <span>https://c.io</span> then https://d.io/x_y";
        let prose = prose_ranges(md);
        let text = slices(md, &prose).join("|");
        assert!(!text.contains("a.io"), "{text}");
        assert!(!text.contains("b.io"), "{text}");
        assert!(text.contains("https://d.io/x_y"), "{text}");
    }

    #[test]
    fn code_ranges_cover_spans_and_blocks() {
        let md = "a `b` c\n\n    indented\n";
        let ranges = code_ranges(md);
        assert_eq!(ranges.len(), 2);
        assert_eq!(&md[ranges[0].clone()], "`b`");
    }

    #[test]
    fn h1_headings_skip_fences_and_read_setext() {
        let md = "```\n# comment\n```\n\nReal `Title`\n===========\n\n## Sub\n\n# Second #\n";
        assert_eq!(h1_headings(md), vec!["Real Title", "Second"]);
    }

    #[test]
    fn broken_alt_text_is_joined_outside_code() {
        let md = "![Figure 1\n\nSales](x.png)\n\n```\n![keep\nthis](y.png)\n```\n";
        assert_eq!(
            join_broken_alt_text(md),
            "![Figure 1 Sales](x.png)\n\n```\n![keep\nthis](y.png)\n```\n"
        );
    }

    #[test]
    fn splice_ignores_overlapping_edits() {
        let out = splice("abcdef", vec![(1..3, "X".into()), (2..4, "Y".into()), (5..6, "Z".into())]);
        assert_eq!(out, "aXdeZ");
    }
}
