//! Post-processing: deterministic cleanup of converter-generated Markdown.
//!
//! Office converters emit artefacts that render badly in MkDocs: vertical
//! tabs and form feeds from Word, alt text split over several lines,
//! `<!-- Slide number: N -->` comments from PowerPoint, and bare URLs that
//! Python-Markdown will not link on its own.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule only sees `\n`.
//! Slide markers are expanded before blank lines are collapsed, because the
//! expansion inserts its own blank lines.
//!
//! Rules 4 to 8 never touch code: fenced and indented blocks keep their
//! lines byte for byte, and inline code spans are not linked or expanded.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::markdown;

/// Apply all post-processing rules.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Replace vertical tabs with spaces, drop form feeds and other controls
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 4. Join image alt text that was broken across lines
/// 5. Expand slide-number comments into `---` + `### Slide N` (slides only)
/// 6. Turn bare `http(s)://` URLs in plain text into links
/// 7. Trim trailing whitespace per line
/// 8. Collapse 3+ consecutive newlines to one blank line
/// 9. Ensure the file ends with exactly one newline
pub fn clean_markdown(input: &str, slides: bool) -> String {
    let s = normalise_line_endings(input);
    let s = replace_control_chars(&s);
    let s = remove_invisible_chars(&s);
    let s = markdown::join_broken_alt_text(&s);
    let s = if slides {
        format_slide_markers(&s)
    } else {
        s
    };
    let s = autolink_bare_urls(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Control characters ───────────────────────────────────────────────

fn replace_control_chars(input: &str) -> String {
    input
        .chars()
        .filter_map(|c| match c {
            '\u{000B}' => Some(' '),
            '\n' | '\t' => Some(c),
            c if c.is_control() && (c as u32) < 0x20 => None,
            '\u{007F}' => None,
            c => Some(c),
        })
        .collect()
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Join multi-line alt text ─────────────────────────────────────────
//
// Word captions with manual line breaks come through as `![Figure 1\nSales](x)`,
// which Python-Markdown does not recognise as an image. See
// [`markdown::join_broken_alt_text`].

// ── Rule 5: Slide markers ────────────────────────────────────────────────────

static RE_SLIDE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!--\s*Slide number:\s*(\d+)\s*-->").unwrap());

fn format_slide_markers(input: &str) -> String {
    let code = markdown::code_ranges(input);
    let edits: Vec<_> = RE_SLIDE_MARKER
        .captures_iter(input)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if markdown::overlaps(&whole.range(), &code) {
                return None;
            }
            Some((whole.range(), format!("\n\n---\n\n### Slide {}\n\n", &caps[1])))
        })
        .collect();
    markdown::splice(input, edits)
}

// ── Rule 6: Autolink bare URLs ───────────────────────────────────────────────
//
// Only plain text is considered: code, link text and targets, autolinks and
// raw HTML are never linked. A URL directly after a quote or `=` is left
// alone too. Trailing sentence punctuation is not part of the URL.

static RE_BARE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s()\[\]<>"'`]+"#).unwrap());

fn autolink_bare_urls(input: &str) -> String {
    let mut edits = Vec::new();
    for run in markdown::prose_ranges(input) {
        for m in RE_BARE_URL.find_iter(&input[run.clone()]) {
            let start = run.start + m.start();
            let preceding = input[..start].chars().next_back();
            if matches!(preceding, Some('[' | '(' | '<' | '"' | '\'' | '=' | '`')) {
                continue;
            }
            let url = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
            if url.len() <= "https://".len() {
                continue;
            }
            edits.push((start..start + url.len(), format!("[{url}]({url})")));
        }
    }
    markdown::splice(input, edits)
}

// ── Rule 7: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .split('\n')
        .zip(code_lines(input))
        .map(|(line, in_code)| if in_code { line } else { line.trim_end() })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 8: Collapse excessive blank lines ───────────────────────────────────

fn collapse_blank_lines(input: &str) -> String {
    let mut kept = Vec::new();
    let mut blank_run = 0usize;
    for (line, in_code) in input.split('\n').zip(code_lines(input)) {
        if !in_code && line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        kept.push(line);
    }
    kept.join("\n")
}

/// For each `\n`-separated line: does it sit inside a code block, below the
/// opening fence?
fn code_lines(input: &str) -> Vec<bool> {
    let blocks = markdown::code_blocks(input);
    let mut offset = 0;
    input
        .split('\n')
        .map(|line| {
            let start = offset;
            offset += line.len() + 1;
            blocks.iter().any(|b| b.start < start && start < b.end)
        })
        .collect()
}

// ── Rule 9: Ensure file ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed.trim_start_matches('\n'))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_control_chars() {
        assert_eq!(replace_control_chars("a\u{000B}b\u{000C}c\td\u{0007}"), "a bc\td");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn test_join_alt_lines() {
        let input = "![Figure 1\n\nQuarterly sales](image.png) and ![ok](b.png)";
        assert_eq!(
            clean_markdown(input, false),
            "![Figure 1 Quarterly sales](image.png) and ![ok](b.png)\n"
        );
    }

    #[test]
    fn test_slide_markers() {
        let input = "<!-- Slide number: 1 -->\n# Intro\n<!-- Slide number: 2 -->\nBody";
        let result = collapse_blank_lines(&format_slide_markers(input));
        assert!(result.contains("---\n\n### Slide 1\n\n# Intro"), "got: {result}");
        assert!(result.contains("# Intro\n\n---\n\n### Slide 2\n\nBody"), "got: {result}");
    }

    #[test]
    fn test_slide_markers_only_for_presentations() {
        let input = "<!-- Slide number: 3 -->";
        assert!(clean_markdown(input, false).contains("Slide number"));
        assert!(clean_markdown(input, true).contains("### Slide 3"));
    }

    #[test]
    fn test_autolink_bare_url() {
        assert_eq!(
            autolink_bare_urls("See https://example.org/docs."),
            "See [https://example.org/docs](https://example.org/docs)."
        );
    }

    #[test]
    fn test_autolink_skips_existing_links() {
        let input = "[site](https://a.io) <https://b.io> [https://c.io](https://c.io) <a href=\"https://d.io\">";
        assert_eq!(autolink_bare_urls(input), input);
    }

    #[test]
    fn test_autolink_skips_code_fences() {
        let input = "```\ncurl https://api.io/v1\n```\n\nhttps://x.io";
        assert_eq!(
            autolink_bare_urls(input),
            "```\ncurl https://api.io/v1\n```\n\n[https://x.io](https://x.io)"
        );
    }

    #[test]
    fn test_autolink_skips_inline_code() {
        let input = "Run `curl https://api.example.com/v1` to test.";
        assert_eq!(clean_markdown(input, false), format!("{input}\n"));
    }

    #[test]
    fn test_autolink_skips_link_text() {
        let input = "[Docs at https://x.io here](https://x.io)";
        assert_eq!(clean_markdown(input, false), format!("{input}\n"));
    }

    #[test]
    fn test_autolink_keeps_underscores_in_url() {
        assert_eq!(
            autolink_bare_urls("at https://x.io/a_b_c now"),
            "at [https://x.io/a_b_c](https://x.io/a_b_c) now"
        );
    }

    #[test]
    fn test_inner_shorter_fence_stays_code() {
        let input = "# Data\n\n````xml\n<a>\n```\n<u>https://example.org/a</u>\n```\n</a>\n````\n";
        assert_eq!(clean_markdown(input, false), input);
    }

    #[test]
    fn test_code_block_whitespace_is_kept() {
        let input = "Text   \n\n```\nkeep   \n\n\n\nlines\n```\n\n\n\nend";
        assert_eq!(
            clean_markdown(input, false),
            "Text\n\n```\nkeep   \n\n\n\nlines\n```\n\nend\n"
        );
    }

    #[test]
    fn test_slide_marker_in_code_is_kept() {
        let input = "```html\n<!-- Slide number: 1 -->\n```\n";
        assert_eq!(clean_markdown(input, true), input);
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(
            trim_trailing_whitespace("  hello   \nworld  "),
            "  hello\nworld"
        );
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_ensure_final_newline() {
        assert_eq!(ensure_final_newline("hello"), "hello\n");
        assert_eq!(ensure_final_newline("\n\nhello\n\n\n"), "hello\n");
        assert_eq!(ensure_final_newline(""), "\n");
    }

    #[test]
    fn test_clean_markdown_is_idempotent() {
        let input = "# Title\r\n\r\nSome text   \n\n\n\n\nhttps://x.io\n";
        let once = clean_markdown(input, false);
        assert_eq!(clean_markdown(&once, false), once);
        assert!(once.starts_with("# Title\n\nSome text\n\n[https://x.io]"));
        assert!(!once.contains("\n\n\n"));
    }
}
