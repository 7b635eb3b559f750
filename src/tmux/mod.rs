//! Socket-addressed tmux command execution.
//!
//! All tmux traffic, including the write commands issued from the UI
//! (`send-keys`, `kill-session`, `switch-client`), goes through the
//! [`TmuxRunner`] trait so tests can substitute a scripted runner.

use crate::sockets::{is_default_socket_path, socket_key, tmux_socket_from_env};
use anyhow::Result;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;

/// Runs tmux commands against a socket. Implementations own the deadline.
#[async_trait]
pub trait TmuxRunner: Send + Sync {
    /// Run one tmux command and return stdout with trailing newlines removed.
    /// The error message is tmux's stderr so the caller can classify it.
    async fn run(&self, socket: &str, args: &[&str]) -> Result<String>;

    /// Run tmux attached to the current terminal (attach-session). The
    /// `TMUX` variable is scrubbed so tmux does not refuse to nest.
    fn run_interactive(&self, socket: &str, args: &[&str]) -> Result<()>;
}

/// Full argument list for addressing a socket: `-S path` for explicit socket
/// files, `-L default` for the default named server.
pub fn socket_args<'a>(socket: &'a str, args: &[&'a str]) -> Vec<&'a str> {
    let mut full = Vec::with_capacity(args.len() + 2);
    if socket.trim().is_empty() {
        full.push("-L");
        full.push("default");
    } else {
        full.push("-S");
        full.push(socket);
    }
    full.extend_from_slice(args);
    full
}

/// Whether `switch-client` can reach the given socket from the tmux client
/// this process runs inside (per the `TMUX` environment variable).
pub fn can_switch_client(socket: &str) -> bool {
    can_switch_client_env(socket, &std::env::var("TMUX").unwrap_or_default())
}

pub fn can_switch_client_env(socket: &str, tmux_env: &str) -> bool {
    let current = tmux_socket_from_env(tmux_env);
    if current.is_empty() {
        return false;
    }
    if socket.trim().is_empty() {
        return is_default_socket_path(&current);
    }
    socket_key(socket) == socket_key(&current)
}

/// Real tmux invocation with a per-call deadline.
pub struct SystemRunner {
    cmd_timeout: Duration,
}

impl SystemRunner {
    pub fn new(cmd_timeout: Duration) -> Self {
        Self { cmd_timeout }
    }
}

#[async_trait]
impl TmuxRunner for SystemRunner {
    async fn run(&self, socket: &str, args: &[&str]) -> Result<String> {
        let full = socket_args(socket, args);
        let mut cmd = tokio::process::Command::new("tmux");
        cmd.args(&full)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.cmd_timeout, cmd.output()).await {
            Err(_) => anyhow::bail!("tmux {} timed out", args.join(" ")),
            Ok(Err(e)) => anyhow::bail!("{}", e),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let msg = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if msg.is_empty() {
                anyhow::bail!("tmux exited with {}", output.status);
            }
            anyhow::bail!("{}", msg);
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .trim_end_matches('\n')
            .to_string())
    }

    fn run_interactive(&self, socket: &str, args: &[&str]) -> Result<()> {
        let full = socket_args(socket, args);
        let status = std::process::Command::new("tmux")
            .args(&full)
            .env_remove("TMUX")
            .status()?;
        if !status.success() {
            anyhow::bail!("tmux exited with {}", status);
        }
        Ok(())
    }
}
