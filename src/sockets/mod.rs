//! Socket identity and target resolution.
//!
//! A tmux server is addressed either by an explicit socket file (`-S path`)
//! or by the default named server (`-L default`). Every socket gets a
//! canonical dedup key, and sessions are keyed as
//! `socketKey::sessionName[::paneId]` so identically-named sessions on
//! different sockets never collide.

pub mod lisa;

use crate::config::Config;
use crate::util::clean_path;
use self::lisa::LisaSocketSource;
use std::collections::HashSet;
use std::path::Path;

/// Dedup key and display hint for the default named server.
pub const DEFAULT_SOCKET_KEY: &str = "default";

/// Glob matching lisa-managed socket files in the canonical location.
pub const DEFAULT_LISA_SOCKET_GLOB: &str = "/tmp/lisa-tmux-*-*.sock";

/// One resolved socket to query. `path` is empty for the default server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketTarget {
    pub path: String,
    pub key: String,
    pub hint: String,
}

impl SocketTarget {
    pub fn new(path: &str) -> Self {
        Self {
            path: if path.trim().is_empty() {
                String::new()
            } else {
                clean_path(path)
            },
            key: socket_key(path),
            hint: socket_hint(path),
        }
    }
}

/// Canonical dedup identity of a socket path; empty means the default server.
pub fn socket_key(path: &str) -> String {
    if path.trim().is_empty() {
        DEFAULT_SOCKET_KEY.to_string()
    } else {
        clean_path(path)
    }
}

/// Short display label: the file basename without its extension.
pub fn socket_hint(path: &str) -> String {
    if path.trim().is_empty() {
        return DEFAULT_SOCKET_KEY.to_string();
    }
    let clean = clean_path(path);
    let base = Path::new(&clean)
        .file_name()
        .map(|b| b.to_string_lossy().to_string());
    match base {
        Some(base) => match base.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => base,
        },
        None => clean,
    }
}

/// Globally unique key of a session on a socket.
pub fn session_qualified_key(socket_path: &str, session_name: &str) -> String {
    format!("{}::{}", socket_key(socket_path), session_name)
}

/// Globally unique key of a pane on a socket. An empty pane id falls back to
/// the session-level key.
pub fn pane_qualified_key(socket_path: &str, session_name: &str, pane_id: &str) -> String {
    let pane = pane_id.trim();
    if pane.is_empty() {
        session_qualified_key(socket_path, session_name)
    } else {
        format!("{}::{}", session_qualified_key(socket_path, session_name), pane)
    }
}

/// Socket path of the tmux client we are running inside, from the `TMUX`
/// environment variable (`path,pid,sessionId`).
pub fn tmux_socket_from_env(value: &str) -> String {
    let raw = value.trim();
    if raw.is_empty() {
        return String::new();
    }
    let path = raw.split(',').next().unwrap_or("").trim();
    if path.is_empty() {
        return String::new();
    }
    clean_path(path)
}

/// Whether a socket path follows tmux's own default-server naming convention
/// (`…/tmux-<uid>/default`).
pub fn is_default_socket_path(path: &str) -> bool {
    let clean = clean_path(path);
    let p = Path::new(&clean);
    if p.file_name().map(|b| b.to_string_lossy().to_string()) != Some(DEFAULT_SOCKET_KEY.into()) {
        return false;
    }
    let parent = match p.parent().and_then(|d| d.file_name()) {
        Some(name) => name.to_string_lossy().to_string(),
        None => return false,
    };
    match parent.strip_prefix("tmux-") {
        Some(suffix) if !suffix.is_empty() => suffix.chars().all(|c| c.is_ascii_digit()),
        _ => false,
    }
}

/// Whether a socket file exists (and is not a directory).
pub fn socket_path_exists(path: &str) -> bool {
    std::fs::metadata(path).map(|m| !m.is_dir()).unwrap_or(false)
}

/// Classify an error message as "socket simply absent" rather than a real
/// failure. Permission problems are always real failures.
pub fn is_socket_unavailable_message(msg: &str) -> bool {
    let text = msg.trim().to_lowercase();
    if text.is_empty() || text.contains("permission denied") {
        return false;
    }
    text.contains("no server running")
        || text.contains("failed to connect to server")
        || text.contains("error connecting to")
        || text.contains("connection refused")
        || text.contains("no such file or directory")
}

/// Clean and deduplicate a list of socket paths, preserving first-seen order.
pub fn dedupe_paths(paths: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(paths.len());
    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        let clean = clean_path(&path);
        if clean.is_empty() || clean == "." {
            continue;
        }
        if seen.insert(clean.clone()) {
            out.push(clean);
        }
    }
    out
}

/// Glob patterns to try for lisa socket files: the configured pattern, plus
/// the built-in fallbacks when no custom pattern overrides them.
pub fn lisa_socket_globs(configured: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<String> = Vec::with_capacity(4);
    let mut add = |pattern: &str, seen: &mut HashSet<String>, out: &mut Vec<String>| {
        let clean = pattern.trim();
        if clean.is_empty() {
            return;
        }
        if seen.insert(clean.to_string()) {
            out.push(clean.to_string());
        }
    };

    let configured = configured.trim();
    let configured = if configured.is_empty() {
        DEFAULT_LISA_SOCKET_GLOB
    } else {
        configured
    };
    add(configured, &mut seen, &mut out);
    if configured == DEFAULT_LISA_SOCKET_GLOB {
        add("/private/tmp/lisa-tmux-*-*.sock", &mut seen, &mut out);
        add("/tmp/lisa-codex-nosb.sock", &mut seen, &mut out);
        add("/private/tmp/lisa-codex-nosb.sock", &mut seen, &mut out);
    }
    out
}

/// Resolve the ordered, deduplicated list of sockets to query.
///
/// Sources, in order: the default server (plus the socket named by `TMUX`
/// when it is not the default one), explicit config paths, glob matches, and
/// lisa-discovered paths. Explicit paths are kept even when the file is
/// absent so the listing stage reports them instead of silently dropping
/// them; glob matches must exist to avoid resurrecting stale socket files.
///
/// Returns the targets plus non-fatal discovery errors (bad glob pattern,
/// lisa lookup failure).
pub async fn discover_socket_targets(
    config: &Config,
    lisa_source: &LisaSocketSource,
    tmux_env: &str,
) -> (Vec<SocketTarget>, Vec<String>) {
    fn add(
        path: &str,
        require_exists: bool,
        targets: &mut Vec<SocketTarget>,
        seen: &mut HashSet<String>,
    ) {
        let raw = path.trim();
        if !raw.is_empty() {
            let clean = clean_path(raw);
            if require_exists && !socket_path_exists(&clean) {
                return;
            }
        }
        let target = SocketTarget::new(raw);
        if seen.insert(target.key.clone()) {
            targets.push(target);
        }
    }

    let mut targets: Vec<SocketTarget> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut discovery_errors: Vec<String> = Vec::new();

    if config.include_default_socket {
        add("", false, &mut targets, &mut seen);
        let env_socket = tmux_socket_from_env(tmux_env);
        if !env_socket.is_empty() && !is_default_socket_path(&env_socket) {
            add(&env_socket, false, &mut targets, &mut seen);
        }
    }

    for path in &config.sockets {
        add(path, false, &mut targets, &mut seen);
    }

    if config.include_lisa_sockets {
        for pattern in lisa_socket_globs(&config.socket_glob) {
            match glob::glob(&pattern) {
                Ok(entries) => {
                    let mut matches: Vec<String> = entries
                        .filter_map(|entry| entry.ok())
                        .map(|p| p.to_string_lossy().to_string())
                        .collect();
                    matches.sort();
                    for path in matches {
                        add(&path, true, &mut targets, &mut seen);
                    }
                }
                Err(e) => {
                    discovery_errors.push(format!("socket-glob {:?}: {}", pattern, e));
                }
            }
        }

        let (paths, err_text) = lisa_source.socket_paths().await;
        if let Some(err) = err_text {
            discovery_errors.push(format!("lisa-sockets: {}", err));
        }
        for path in paths {
            add(&path, false, &mut targets, &mut seen);
        }
    }

    (targets, discovery_errors)
}
