//! # tool-probe
//!
//! Locate optional external command-line tools so that callers can decide,
//! once and up front, whether a feature backed by that tool is available.
//!
//! ## How it works
//!
//! For a given [`Tool`], [`locate`]:
//!
//! 1. Checks the tool's environment override (e.g. `DOCS2SITE_MAGICK`).
//!    If set, the path must exist; a dangling override is reported as
//!    [`ProbeError::OverrideMissing`] instead of silently searching `PATH`.
//! 2. Otherwise searches `PATH` for each platform candidate name in order
//!    (`magick` before the legacy ImageMagick 6 `convert`).
//!
//! Absence is a normal state: every function returns a `Result` and nothing
//! panics or prints.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tool_probe::{locate, IMAGEMAGICK};
//!
//! match locate(&IMAGEMAGICK) {
//!     Ok(found) => println!("ImageMagick at {}", found.path.display()),
//!     Err(e) => println!("ImageMagick unavailable: {e}"),
//! }
//! ```
//!
//! ## Environment variable overrides
//!
//! - `DOCS2SITE_MAGICK`: path to the ImageMagick executable.
//! - `DOCS2SITE_MARKITDOWN`: path to the `markitdown` executable.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

// ── Known tools ──────────────────────────────────────────────────────────────

/// Description of an external executable and how to find it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tool {
    /// Human-readable name used in messages.
    pub name: &'static str,
    /// Environment variable that overrides the search.
    pub env_var: &'static str,
    /// Executable names tried on Unix-like systems, in order.
    pub unix_candidates: &'static [&'static str],
    /// Executable names tried on Windows, in order.
    pub windows_candidates: &'static [&'static str],
}

/// ImageMagick, used to rasterise WMF/EMF and other legacy vector images.
///
/// `convert` is not tried on Windows, where `convert.exe` is the
/// filesystem conversion utility shipped with the OS.
pub const IMAGEMAGICK: Tool = Tool {
    name: "ImageMagick",
    env_var: "DOCS2SITE_MAGICK",
    unix_candidates: &["magick", "convert"],
    windows_candidates: &["magick"],
};

/// Microsoft's `markitdown` converter for office documents.
pub const MARKITDOWN: Tool = Tool {
    name: "markitdown",
    env_var: "DOCS2SITE_MARKITDOWN",
    unix_candidates: &["markitdown"],
    windows_candidates: &["markitdown"],
};

impl Tool {
    /// Candidate executable names for the current platform.
    pub fn candidates(&self) -> &'static [&'static str] {
        if cfg!(windows) {
            self.windows_candidates
        } else {
            self.unix_candidates
        }
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by tool-probe operations.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The environment override names a file that does not exist.
    #[error("{var} is set to '{path}', which does not exist")]
    OverrideMissing { var: &'static str, path: PathBuf },

    /// None of the candidate names were found on `PATH`.
    #[error("{tool} not found on PATH (tried: {tried})")]
    NotFound { tool: &'static str, tried: String },

    /// The executable was found but asking for its version failed.
    #[error("could not query {tool} version: {reason}")]
    Version { tool: &'static str, reason: String },
}

// ── Locations ────────────────────────────────────────────────────────────────

/// How a tool was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// From the tool's environment variable.
    Override,
    /// From a `PATH` search.
    Path,
}

/// A resolved executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLocation {
    pub tool: &'static str,
    pub path: PathBuf,
    pub source: Source,
}

impl ToolLocation {
    /// Start a [`Command`] for this executable.
    pub fn command(&self) -> Command {
        Command::new(&self.path)
    }

    /// Runs `<tool> --version` and returns the first non-empty output line.
    pub fn version(&self) -> Result<String, ProbeError> {
        let output = self
            .command()
            .arg("--version")
            .output()
            .map_err(|e| ProbeError::Version {
                tool: self.tool,
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ProbeError::Version {
                tool: self.tool,
                reason: format!("exited with {}", output.status),
            });
        }

        first_line(&output.stdout)
            .or_else(|| first_line(&output.stderr))
            .ok_or(ProbeError::Version {
                tool: self.tool,
                reason: "empty output".into(),
            })
    }
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Finds `tool`, honouring its environment override first.
pub fn locate(tool: &Tool) -> Result<ToolLocation, ProbeError> {
    if let Some(value) = std::env::var_os(tool.env_var).filter(|v| !v.is_empty()) {
        let path = PathBuf::from(value);
        return if path.is_file() {
            Ok(ToolLocation {
                tool: tool.name,
                path,
                source: Source::Override,
            })
        } else {
            Err(ProbeError::OverrideMissing {
                var: tool.env_var,
                path,
            })
        };
    }

    locate_on_path(tool)
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn locate_on_path(tool: &Tool) -> Result<ToolLocation, ProbeError> {
    let candidates = tool.candidates();
    candidates
        .iter()
        .find_map(|name| which::which(name).ok())
        .map(|path| ToolLocation {
            tool: tool.name,
            path,
            source: Source::Path,
        })
        .ok_or_else(|| ProbeError::NotFound {
            tool: tool.name,
            tried: candidates.join(", "),
        })
}

fn first_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_owned)
}

/// Returns the file name of a located executable, for display.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_tool(env_var: &'static str) -> Tool {
        Tool {
            name: "fake",
            env_var,
            unix_candidates: &["docs2site-definitely-not-installed"],
            windows_candidates: &["docs2site-definitely-not-installed"],
        }
    }

    #[test]
    fn override_to_existing_file_wins() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::env::set_var("TOOL_PROBE_TEST_EXISTING", file.path());
        let found = locate(&fake_tool("TOOL_PROBE_TEST_EXISTING"));
        std::env::remove_var("TOOL_PROBE_TEST_EXISTING");

        let found = found.expect("override should resolve");
        assert_eq!(found.source, Source::Override);
        assert_eq!(found.path, file.path());
    }

    #[test]
    fn dangling_override_is_an_error() {
        std::env::set_var("TOOL_PROBE_TEST_DANGLING", "/no/such/dir/magick");
        let err = locate(&fake_tool("TOOL_PROBE_TEST_DANGLING")).unwrap_err();
        std::env::remove_var("TOOL_PROBE_TEST_DANGLING");

        assert!(matches!(err, ProbeError::OverrideMissing { .. }));
        assert!(err.to_string().contains("TOOL_PROBE_TEST_DANGLING"));
    }

    #[test]
    fn missing_tool_reports_candidates() {
        let err = locate(&fake_tool("TOOL_PROBE_TEST_UNSET")).unwrap_err();
        match err {
            ProbeError::NotFound { tried, .. } => {
                assert!(tried.contains("docs2site-definitely-not-installed"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn windows_never_tries_convert() {
        assert_eq!(IMAGEMAGICK.windows_candidates, &["magick"]);
        assert_eq!(IMAGEMAGICK.unix_candidates[0], "magick");
    }

    #[test]
    fn first_line_skips_blank_lines() {
        assert_eq!(
            first_line(b"\n\n  Version: ImageMagick 7.1.1\nmore"),
            Some("Version: ImageMagick 7.1.1".to_string())
        );
        assert_eq!(first_line(b"  \n"), None);
    }

    #[test]
    fn display_name_uses_file_name() {
        assert_eq!(display_name(Path::new("/usr/bin/magick")), "magick");
    }
}
