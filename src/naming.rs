//! File-name and title helpers shared by the converter and the site builder.

use std::collections::HashSet;
use std::path::Path;

/// Fallback used when sanitising leaves nothing behind.
const EMPTY_STEM: &str = "document";

/// Makes a file stem safe on every platform.
///
/// Runs of anything other than letters, digits, `.` and `-` collapse into a
/// single `-`; `_`, `/` and `\` count as separators. Case is preserved.
pub fn sanitize_stem(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    let mut pending_dash = false;
    for c in stem.chars() {
        if c.is_alphanumeric() || c == '.' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    let out = out.trim_matches('.').to_string();
    if out.is_empty() {
        EMPTY_STEM.to_string()
    } else {
        out
    }
}

/// Sanitises a file name, keeping its extension (lowercased).
pub fn sanitize_file_name(name: &str) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = sanitize_stem(&stem);
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{stem}.{}", ext.to_ascii_lowercase()),
        _ => stem,
    }
}

/// Cleans a heading or document title for use in navigation.
///
/// En/em dashes become `-`, trademark symbols disappear, square brackets
/// become parentheses, and other punctuation is removed.
pub fn sanitize_title(title: &str) -> String {
    let mapped: String = title
        .chars()
        .filter_map(|c| match c {
            '–' | '—' => Some('-'),
            '™' | '®' | '©' => None,
            '[' => Some('('),
            ']' => Some(')'),
            c if c.is_alphanumeric() || c.is_whitespace() || "()-.,".contains(c) => Some(c),
            _ => None,
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `getting-started` → `Getting Started`.
pub fn title_case(s: &str) -> String {
    s.split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Hands out unique file names within one folder.
///
/// The first claim of a name gets it verbatim; later claims get `_1`, `_2`,
/// ... inserted before the extension. Comparison ignores case so the result
/// is also unique on case-insensitive filesystems.
#[derive(Debug, Default)]
pub struct NameAllocator {
    taken: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, name: &str) -> String {
        if self.taken.insert(name.to_lowercase()) {
            return name.to_string();
        }
        let (stem, ext) = split_extension(name);
        (1..)
            .map(|n| format!("{stem}_{n}{ext}"))
            .find(|candidate| self.taken.insert(candidate.to_lowercase()))
            .unwrap_or_else(|| name.to_string())
    }
}

/// `image.png` → (`image`, `.png`); `README` → (`README`, ``).
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) if i > 0 => name.split_at(i),
        _ => (name, ""),
    }
}
