use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Open-comment marker; an entry beginning with it counts as completed.
pub const COMMENT_OPEN: &str = "/*";

/// One line of a controller file, parsed once at load time. Completion is
/// a prefix test on the raw line: a filename that legitimately starts with
/// `/*` is misidentified as completed. That matches the historical format
/// and is covered by a test rather than corrected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerLine {
    Script { text: String, completed: bool },
    Blank(String),
}

pub fn parse_controller(raw: &str) -> Vec<ControllerLine> {
    raw.lines()
        .map(|line| {
            if line.trim().is_empty() {
                ControllerLine::Blank(line.to_string())
            } else {
                ControllerLine::Script {
                    completed: line.starts_with(COMMENT_OPEN),
                    text: line.to_string(),
                }
            }
        })
        .collect()
}

pub fn load_controller(path: &Path) -> Result<Vec<ControllerLine>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(parse_controller(&raw))
}

pub fn commented_form(line: &str) -> String {
    format!("/* {line} */")
}

/// Persist completion of one entry: re-read the controller from disk,
/// replace the first line exactly matching `entry_text` with its commented
/// form, and rewrite the whole file. Called immediately after each script
/// succeeds so a crash mid-version resumes at the right entry.
pub fn mark_completed(path: &Path, entry_text: &str) -> Result<()> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let had_trailing_newline = raw.ends_with('\n');

    let mut replaced = false;
    let mut out: Vec<String> = Vec::new();
    for line in raw.lines() {
        if !replaced && line == entry_text {
            out.push(commented_form(line));
            replaced = true;
        } else {
            out.push(line.to_string());
        }
    }
    if !replaced {
        anyhow::bail!(
            "controller entry `{entry_text}` not found in {}",
            path.display()
        );
    }

    let mut text = out.join("\n");
    if had_trailing_newline {
        text.push('\n');
    }
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

/// Read the master version list: newline-delimited identifiers, trimmed,
/// blanks dropped, sorted ascending as plain text. Callers relying on
/// numeric ordering must zero-pad identifiers.
pub fn read_version_list(path: &Path) -> Result<Vec<String>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut versions: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    versions.sort();
    Ok(versions)
}
