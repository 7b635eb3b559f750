use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime configuration, read from an optional TOML file and overridden by
/// CLI flags. Every field has a default so a missing file is not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Scrollback lines captured per session.
    #[serde(default = "default_lines")]
    pub lines: usize,

    /// Refresh interval in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Per-command deadline in milliseconds.
    #[serde(default = "default_cmd_timeout_ms")]
    pub cmd_timeout_ms: u64,

    /// Max concurrent capture workers.
    #[serde(default = "default_workers")]
    pub max_workers: usize,

    /// Capture every pane instead of only the active pane per session.
    #[serde(default)]
    pub all_panes: bool,

    /// Query the default tmux server.
    #[serde(default = "default_true")]
    pub include_default_socket: bool,

    /// Discover lisa-managed sockets (glob + process table + lisa CLI).
    #[serde(default = "default_true")]
    pub include_lisa_sockets: bool,

    /// Glob pattern for socket files; empty means the built-in pattern.
    #[serde(default)]
    pub socket_glob: String,

    /// Explicit socket paths to always query.
    #[serde(default)]
    pub sockets: Vec<String>,
}

fn default_lines() -> usize {
    500
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_cmd_timeout_ms() -> u64 {
    900
}

fn default_workers() -> usize {
    4
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lines: default_lines(),
            interval_ms: default_interval_ms(),
            cmd_timeout_ms: default_cmd_timeout_ms(),
            max_workers: default_workers(),
            all_panes: false,
            include_default_socket: true,
            include_lisa_sockets: true,
            socket_glob: String::new(),
            sockets: Vec::new(),
        }
    }
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn cmd_timeout(&self) -> Duration {
        Duration::from_millis(self.cmd_timeout_ms)
    }

    /// Apply the floor values. Called once after file + flag merging.
    pub fn clamp(&mut self) {
        if self.lines < 20 {
            self.lines = 20;
        }
        if self.interval_ms < 200 {
            self.interval_ms = 200;
        }
        if self.cmd_timeout_ms < 300 {
            self.cmd_timeout_ms = 300;
        }
        if self.max_workers < 1 {
            self.max_workers = 1;
        }
    }
}

pub fn config_dir() -> Result<PathBuf> {
    let dir = directories::ProjectDirs::from("", "", "muxboard")
        .context("Could not determine config directory")?
        .config_dir()
        .to_path_buf();
    Ok(dir)
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load configuration. An explicitly given path must exist; the default path
/// is optional and falls back to defaults when absent.
pub fn load(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => {
            if !p.exists() {
                anyhow::bail!("Config file not found at {}", p.display());
            }
            load_from_path(p)
        }
        None => {
            let p = default_config_path()?;
            if !p.exists() {
                return Ok(Config::default());
            }
            load_from_path(&p)
        }
    }
}

fn load_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", path.display()))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.lines, 500);
        assert_eq!(config.interval(), Duration::from_millis(1000));
        assert_eq!(config.cmd_timeout(), Duration::from_millis(900));
        assert_eq!(config.max_workers, 4);
        assert!(config.include_default_socket);
        assert!(config.include_lisa_sockets);
    }

    #[test]
    fn clamp_applies_floors() {
        let mut config = Config {
            lines: 5,
            interval_ms: 50,
            cmd_timeout_ms: 100,
            max_workers: 0,
            ..Config::default()
        };
        config.clamp();
        assert_eq!(config.lines, 20);
        assert_eq!(config.interval_ms, 200);
        assert_eq!(config.cmd_timeout_ms, 300);
        assert_eq!(config.max_workers, 1);
    }

    #[test]
    fn parses_partial_file() {
        let config: Config = toml::from_str("lines = 120\nall_panes = true\n").unwrap();
        assert_eq!(config.lines, 120);
        assert!(config.all_panes);
        assert_eq!(config.max_workers, 4);
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = load(Some(Path::new("/nonexistent/muxboard.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
