//! Utility functions and helpers.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path};

/// Lexically normalize a path: collapse `.` and redundant separators and
/// resolve `..` against preceding components without touching the filesystem.
pub fn clean_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let p = Path::new(trimmed);
    let mut parts: Vec<String> = Vec::new();
    let mut rooted = false;

    for component in p.components() {
        match component {
            Component::RootDir => rooted = true,
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|last| last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..".to_string());
                }
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
            Component::Prefix(prefix) => parts.push(prefix.as_os_str().to_string_lossy().to_string()),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

static ESCAPE_SEQUENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9;:?]*[ -/]*[@-~]|\x1b\][^\x07]*(\x07|\x1b\\)|\x1b[@-_]")
        .expect("escape sequence pattern is valid")
});

/// Remove terminal escape sequences for plain-text display. Captured lines
/// keep their styling codes; only the renderer strips them.
pub fn strip_escapes(line: &str) -> String {
    ESCAPE_SEQUENCES.replace_all(line, "").to_string()
}
