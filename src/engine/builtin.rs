//! In-process conversion for formats that need no external tool.

use std::path::Path;

use super::{ConversionEngine, EngineError, EngineOutput};
use crate::formats::{Handler, SupportedFormat};
use crate::naming;
use crate::output::ExtractedAsset;

const ENGINE: &str = "builtin";

/// Plain text, CSV, JSON, XML and standalone images.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinEngine;

impl ConversionEngine for BuiltinEngine {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn convert(&self, source: &Path, format: SupportedFormat) -> Result<EngineOutput, EngineError> {
        match format.handler() {
            Handler::PlainText => Ok(EngineOutput {
                markdown: read_text(source)?,
                ..Default::default()
            }),
            Handler::Table => Ok(EngineOutput {
                markdown: csv_to_table(&read_text(source)?),
                ..Default::default()
            }),
            Handler::CodeBlock { lang } => {
                let text = read_text(source)?;
                let body = if lang == "json" {
                    pretty_json(&text)?
                } else {
                    text.trim_end().to_string()
                };
                Ok(EngineOutput {
                    markdown: fenced(lang, &body),
                    ..Default::default()
                })
            }
            Handler::ImagePage => image_page(source),
            Handler::External => Err(EngineError::Unavailable {
                extension: format.extension,
                reason: "not handled in-process".into(),
            }),
        }
    }
}

fn read_bytes(source: &Path) -> Result<Vec<u8>, EngineError> {
    std::fs::read(source).map_err(|e| EngineError::Io {
        path: source.to_path_buf(),
        source: e,
    })
}

fn read_text(source: &Path) -> Result<String, EngineError> {
    let bytes = read_bytes(source)?;
    let text = String::from_utf8(bytes).map_err(|e| EngineError::Rejected {
        engine: ENGINE,
        detail: format!("not valid UTF-8 text ({e})"),
    })?;
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

fn pretty_json(text: &str) -> Result<String, EngineError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| EngineError::Rejected {
            engine: ENGINE,
            detail: format!("invalid JSON: {e}"),
        })?;
    serde_json::to_string_pretty(&value).map_err(|e| EngineError::Rejected {
        engine: ENGINE,
        detail: e.to_string(),
    })
}

/// Wraps `body` in a fence longer than any backtick run inside it.
fn fenced(lang: &str, body: &str) -> String {
    let longest = body
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest.max(2) + 1);
    format!("{fence}{lang}\n{body}\n{fence}\n")
}

/// A page that simply shows the image; the converter relocates it.
fn image_page(source: &Path) -> Result<EngineOutput, EngineError> {
    let payload = read_bytes(source)?;
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = naming::sanitize_file_name(&file_name);
    let alt = source
        .file_stem()
        .map(|s| naming::sanitize_title(&s.to_string_lossy()))
        .unwrap_or_default();
    Ok(EngineOutput {
        markdown: format!("![{alt}]({name})\n"),
        title: None,
        assets: vec![ExtractedAsset::new(name, payload)],
    })
}

// ── CSV ──────────────────────────────────────────────────────────────────────

/// Renders comma-separated rows as a GFM table; the first row is the header.
pub fn csv_to_table(text: &str) -> String {
    let rows = parse_csv(text);
    let Some(width) = rows.iter().map(Vec::len).max() else {
        return String::new();
    };

    let render = |row: &[String]| {
        let cells: Vec<String> = (0..width)
            .map(|i| row.get(i).map(|c| escape_cell(c)).unwrap_or_default())
            .collect();
        format!("| {} |\n", cells.join(" | "))
    };

    let mut out = render(&rows[0]);
    out.push_str(&format!("|{}\n", " --- |".repeat(width)));
    for row in &rows[1..] {
        out.push_str(&render(row));
    }
    out
}

fn escape_cell(cell: &str) -> String {
    cell.trim()
        .replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}

/// RFC 4180 style: quoted fields may contain commas, newlines and `""`.
fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows.retain(|r| r.iter().any(|c| !c.trim().is_empty()));
    rows
}
