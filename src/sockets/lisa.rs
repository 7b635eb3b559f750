//! Discovery of lisa-managed tmux sockets.
//!
//! Two independent strategies are merged because neither alone is complete:
//! scanning the process table for `tmux -S <path>` invocations, and asking
//! the `lisa` CLI for its project roots and deriving the socket paths it
//! would have created for them. Results are cached for a few seconds so the
//! refresh cycle does not rescan the process table every tick.

use crate::config::Config;
use crate::util::clean_path;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// How long a merged discovery result stays valid.
pub const LISA_SOCKET_CACHE_TTL: Duration = Duration::from_secs(5);

/// Combined output of a `lisa session list` invocation.
#[derive(Debug, Clone)]
pub struct LisaOutput {
    pub combined: String,
    pub success: bool,
}

/// Invokes the lisa CLI. Injected so tests can script responses.
#[async_trait]
pub trait LisaClient: Send + Sync {
    /// Run `lisa session list --all-sockets [--with-next-action] --json`.
    /// `Ok(None)` means the binary is not installed, which is not an error.
    async fn session_list(&self, with_next_action: bool) -> Result<Option<LisaOutput>>;
}

/// Enumerates running process command lines. Injected so tests can script
/// process tables.
#[async_trait]
pub trait ProcessTable: Send + Sync {
    async fn command_lines(&self) -> Result<Vec<String>>;
}

/// Real lisa CLI invocation with a hard deadline.
pub struct SystemLisa {
    timeout: Duration,
}

impl SystemLisa {
    pub fn new(cmd_timeout: Duration) -> Self {
        // The lisa CLI is slower than tmux; give it at least a second.
        Self {
            timeout: cmd_timeout.max(Duration::from_secs(1)),
        }
    }
}

#[async_trait]
impl LisaClient for SystemLisa {
    async fn session_list(&self, with_next_action: bool) -> Result<Option<LisaOutput>> {
        let mut args = vec!["session", "list", "--all-sockets"];
        if with_next_action {
            args.push("--with-next-action");
        }
        args.push("--json");

        let mut cmd = tokio::process::Command::new("lisa");
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => anyhow::bail!("lisa list timed out"),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Ok(Err(e)) => return Err(e).context("failed to run lisa"),
            Ok(Ok(output)) => output,
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(Some(LisaOutput {
            combined,
            success: output.status.success(),
        }))
    }
}

/// Real process-table enumeration. POSIX-only; elsewhere the strategy
/// degrades to an empty successful result.
pub struct SystemProcessTable;

#[async_trait]
impl ProcessTable for SystemProcessTable {
    #[cfg(unix)]
    async fn command_lines(&self) -> Result<Vec<String>> {
        let output = tokio::process::Command::new("ps")
            .args(["axo", "command="])
            .stdin(Stdio::null())
            .output()
            .await
            .context("failed to run ps")?;
        if !output.status.success() {
            anyhow::bail!("ps exited with {}", output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }

    #[cfg(not(unix))]
    async fn command_lines(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Socket paths named in `tmux -S <path>` invocations, deduplicated.
pub fn extract_tmux_socket_paths(commands: &[String]) -> Vec<String> {
    let mut paths = Vec::new();
    for line in commands {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            continue;
        }
        let executable = Path::new(fields[0])
            .file_name()
            .map(|b| b.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if executable != "tmux" {
            continue;
        }
        for window in fields[1..].windows(2) {
            if window[0] != "-S" {
                continue;
            }
            let candidate = window[1].trim();
            if !candidate.is_empty() {
                paths.push(clean_path(candidate));
            }
            break;
        }
    }
    super::dedupe_paths(paths)
}

/// Whether a socket file name follows the lisa naming convention.
pub fn is_likely_lisa_socket_path(path: &str) -> bool {
    let base = Path::new(path.trim())
        .file_name()
        .map(|b| b.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if base == "lisa-codex-nosb.sock" {
        return true;
    }
    base.starts_with("lisa-") && base.ends_with(".sock")
}

/// Absolute, symlink-resolved, cleaned project root. Empty input stays empty.
pub fn canonical_project_root(project_root: &str) -> String {
    let root = project_root.trim();
    if root.is_empty() {
        return String::new();
    }
    let mut path = std::path::PathBuf::from(root);
    if path.is_relative() {
        if let Ok(cwd) = std::env::current_dir() {
            path = cwd.join(path);
        }
    }
    if let Ok(resolved) = std::fs::canonicalize(&path) {
        path = resolved;
    }
    clean_path(&path.to_string_lossy())
}

/// Lowercase alphanumeric project identifier, at most `max` characters.
pub fn sanitize_id(s: &str, max: usize) -> String {
    let cleaned: String = s
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();
    let cleaned = if cleaned.is_empty() {
        "project".to_string()
    } else {
        cleaned
    };
    cleaned.chars().take(max).collect()
}

pub fn project_slug(project_root: &str) -> String {
    let base = Path::new(project_root)
        .file_name()
        .map(|b| b.to_string_lossy().to_string())
        .unwrap_or_default();
    sanitize_id(&base, 10)
}

/// First 8 hex characters of the content hash of the canonical root string.
pub fn project_hash(project_root: &str) -> String {
    let digest = Sha256::digest(project_root.as_bytes());
    digest
        .iter()
        .take(4)
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn socket_file_name(root: &str) -> String {
    format!("lisa-tmux-{}-{}.sock", project_slug(root), project_hash(root))
}

fn preferred_socket_dir() -> String {
    if std::fs::metadata("/tmp").map(|m| m.is_dir()).unwrap_or(false) {
        return "/tmp".to_string();
    }
    let tmp = std::env::temp_dir();
    let tmp = tmp.to_string_lossy();
    if tmp.trim().is_empty() {
        "/tmp".to_string()
    } else {
        clean_path(&tmp)
    }
}

/// Socket path lisa derives for a project root, under the preferred temp dir.
pub fn socket_path_for_project_root(project_root: &str) -> Option<String> {
    let root = canonical_project_root(project_root);
    if root.is_empty() {
        return None;
    }
    Some(format!("{}/{}", preferred_socket_dir(), socket_file_name(&root)))
}

/// Socket path under the OS default temp dir, kept for older lisa versions.
pub fn legacy_socket_path_for_project_root(project_root: &str) -> Option<String> {
    let root = canonical_project_root(project_root);
    if root.is_empty() {
        return None;
    }
    let dir = clean_path(&std::env::temp_dir().to_string_lossy());
    Some(format!("{}/{}", dir, socket_file_name(&root)))
}

#[derive(Debug, Deserialize)]
struct LisaListPayload {
    #[serde(default)]
    items: Vec<LisaListItem>,
}

#[derive(Debug, Deserialize)]
struct LisaListItem {
    #[serde(default, rename = "projectRoot")]
    project_root: String,
}

/// Query the lisa CLI and derive socket paths for each reported project root.
///
/// The optional `--with-next-action` flag is tried first; if the installed
/// lisa rejects it as unknown, the call is retried exactly once without it so
/// an older CLI never causes total failure.
pub async fn socket_paths_from_lisa(client: &dyn LisaClient) -> Result<Vec<String>> {
    let mut output = match client.session_list(true).await? {
        None => return Ok(Vec::new()),
        Some(output) => output,
    };
    if !output.success && output.combined.contains("unknown flag") {
        output = match client.session_list(false).await? {
            None => return Ok(Vec::new()),
            Some(output) => output,
        };
    }
    if !output.success {
        anyhow::bail!("lisa list failed: {}", output.combined.trim());
    }

    let payload: LisaListPayload =
        serde_json::from_str(&output.combined).map_err(|_| anyhow::anyhow!("lisa list invalid json"))?;

    let mut paths = Vec::with_capacity(payload.items.len() * 2);
    for item in payload.items {
        let root = canonical_project_root(&item.project_root);
        if root.is_empty() {
            continue;
        }
        if let Some(preferred) = socket_path_for_project_root(&root) {
            if let Some(legacy) = legacy_socket_path_for_project_root(&root) {
                if legacy != preferred {
                    paths.push(preferred);
                    paths.push(legacy);
                    continue;
                }
            }
            paths.push(preferred);
        }
    }
    Ok(super::dedupe_paths(paths))
}

#[derive(Debug, Clone)]
struct CacheEntry {
    at: Instant,
    paths: Vec<String>,
    err_text: Option<String>,
}

/// Merged, TTL-cached lisa socket discovery.
///
/// The cache is check-then-act: the TTL is checked under the lock, the
/// expensive scan and CLI query run unlocked, and the result is published
/// under the lock again. Concurrent misses may both do the work; the second
/// publish simply wins.
pub struct LisaSocketSource {
    client: Arc<dyn LisaClient>,
    processes: Arc<dyn ProcessTable>,
    ttl: Duration,
    cache: Mutex<Option<CacheEntry>>,
}

impl LisaSocketSource {
    pub fn new(client: Arc<dyn LisaClient>, processes: Arc<dyn ProcessTable>, ttl: Duration) -> Self {
        Self {
            client,
            processes,
            ttl,
            cache: Mutex::new(None),
        }
    }

    /// Source backed by the real lisa CLI and process table.
    pub fn system(config: &Config) -> Self {
        Self::new(
            Arc::new(SystemLisa::new(config.cmd_timeout())),
            Arc::new(SystemProcessTable),
            LISA_SOCKET_CACHE_TTL,
        )
    }

    /// Merged socket paths plus the combined error text of any failed
    /// strategy. Cache hits return the cached error too: a strategy that
    /// failed recently is still failed as far as this TTL window goes.
    pub async fn socket_paths(&self) -> (Vec<String>, Option<String>) {
        {
            let guard = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(entry) = guard.as_ref() {
                if entry.at.elapsed() < self.ttl {
                    return (entry.paths.clone(), entry.err_text.clone());
                }
            }
        }

        let mut paths: Vec<String> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        match self.scan_process_table().await {
            Ok(scanned) => paths.extend(scanned),
            Err(e) => {
                tracing::debug!("process-table socket scan failed: {}", e);
                errors.push(e.to_string());
            }
        }
        match socket_paths_from_lisa(self.client.as_ref()).await {
            Ok(derived) => paths.extend(derived),
            Err(e) => {
                tracing::debug!("lisa socket query failed: {}", e);
                errors.push(e.to_string());
            }
        }

        let paths = super::dedupe_paths(paths);
        let err_text = if errors.is_empty() {
            None
        } else {
            Some(errors.join(" | "))
        };

        let mut guard = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(CacheEntry {
            at: Instant::now(),
            paths: paths.clone(),
            err_text: err_text.clone(),
        });
        (paths, err_text)
    }

    async fn scan_process_table(&self) -> Result<Vec<String>> {
        let commands = self.processes.command_lines().await?;
        Ok(extract_tmux_socket_paths(&commands)
            .into_iter()
            .filter(|path| is_likely_lisa_socket_path(path))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_socket_flags_from_tmux_commands() {
        let commands = vec![
            "/opt/homebrew/bin/tmux -S /tmp/lisa-a.sock new -d".to_string(),
            "tmux -S /tmp/tmux-1000/default list-sessions".to_string(),
            "/usr/bin/tmux -L dev list-sessions".to_string(),
            "/usr/bin/tmux -S /tmp/lisa-b.sock has-session -t x".to_string(),
            "zsh -lc echo hi".to_string(),
        ];
        assert_eq!(
            extract_tmux_socket_paths(&commands),
            vec![
                "/tmp/lisa-a.sock".to_string(),
                "/tmp/tmux-1000/default".to_string(),
                "/tmp/lisa-b.sock".to_string(),
            ]
        );
    }

    #[test]
    fn lisa_socket_naming_filter() {
        assert!(is_likely_lisa_socket_path("/tmp/lisa-tmux-proj-abcd1234.sock"));
        assert!(is_likely_lisa_socket_path("/tmp/lisa-codex-nosb.sock"));
        assert!(is_likely_lisa_socket_path("/private/tmp/LISA-x.SOCK"));
        assert!(!is_likely_lisa_socket_path("/tmp/tmux-1000/default"));
        assert!(!is_likely_lisa_socket_path("/tmp/other.sock"));
    }

    #[test]
    fn slug_is_lowercase_alnum_capped() {
        assert_eq!(project_slug("/home/user/My-Project"), "myproject");
        assert_eq!(project_slug("/home/user/averylongprojectname"), "averylongp");
        assert_eq!(project_slug("/home/user/---"), "project");
    }

    #[test]
    fn slug_cap_is_ten() {
        assert!(project_slug("/x/abcdefghijklmnop").len() <= 10);
    }

    #[test]
    fn hash_is_eight_hex_chars_and_stable() {
        let a = project_hash("/tmp/proj-a");
        let b = project_hash("/tmp/proj-a");
        let c = project_hash("/tmp/proj-b");
        assert_eq!(a.len(), 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn derived_paths_follow_naming_scheme() {
        let path = socket_path_for_project_root("/tmp").unwrap();
        let base = Path::new(&path).file_name().unwrap().to_string_lossy().to_string();
        assert!(base.starts_with("lisa-tmux-tmp-"));
        assert!(base.ends_with(".sock"));
        assert!(is_likely_lisa_socket_path(&path));
        assert!(socket_path_for_project_root("").is_none());
        assert!(socket_path_for_project_root("   ").is_none());
    }
}
