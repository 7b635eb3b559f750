//! Test utilities and fixtures for muxboard tests
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use muxboard::config::Config;
use muxboard::sockets::lisa::{LisaClient, LisaOutput, LisaSocketSource, ProcessTable};
use muxboard::tmux::TmuxRunner;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Config with every discovery source disabled; tests opt sources back in.
pub fn bare_config() -> Config {
    Config {
        include_default_socket: false,
        include_lisa_sockets: false,
        ..Config::default()
    }
}

/// Tmux runner driven by a closure. Records every call.
pub struct ScriptedRunner {
    script: Box<dyn Fn(&str, &[&str]) -> Result<String> + Send + Sync>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new(script: impl Fn(&str, &[&str]) -> Result<String> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TmuxRunner for ScriptedRunner {
    async fn run(&self, socket: &str, args: &[&str]) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}|{}", socket, args.join(" ")));
        (self.script)(socket, args)
    }

    fn run_interactive(&self, _socket: &str, _args: &[&str]) -> Result<()> {
        Ok(())
    }
}

/// Lisa CLI stub driven by a closure over the optional-flag argument.
/// Records the flag value of every invocation.
pub struct ScriptedLisa {
    script: Box<dyn Fn(bool) -> Result<Option<LisaOutput>> + Send + Sync>,
    pub calls: Mutex<Vec<bool>>,
}

impl ScriptedLisa {
    pub fn new(script: impl Fn(bool) -> Result<Option<LisaOutput>> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// A lisa binary that is not installed.
    pub fn not_installed() -> Arc<Self> {
        Self::new(|_| Ok(None))
    }

    /// A lisa that reports the given project roots.
    pub fn with_roots(roots: Vec<String>) -> Arc<Self> {
        Self::new(move |_| {
            let items: Vec<String> = roots
                .iter()
                .map(|root| format!(r#"{{"projectRoot":{}}}"#, serde_json::to_string(root).unwrap()))
                .collect();
            Ok(Some(LisaOutput {
                combined: format!(r#"{{"items":[{}]}}"#, items.join(",")),
                success: true,
            }))
        })
    }

    pub fn call_flags(&self) -> Vec<bool> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LisaClient for ScriptedLisa {
    async fn session_list(&self, with_next_action: bool) -> Result<Option<LisaOutput>> {
        self.calls.lock().unwrap().push(with_next_action);
        (self.script)(with_next_action)
    }
}

/// Process table stub returning fixed command lines. Counts invocations.
pub struct ScriptedProcessTable {
    lines: Vec<String>,
    error: Option<String>,
    pub calls: AtomicUsize,
}

impl ScriptedProcessTable {
    pub fn with_lines(lines: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            lines,
            error: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::with_lines(Vec::new())
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            lines: Vec::new(),
            error: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessTable for ScriptedProcessTable {
    async fn command_lines(&self) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.error {
            Some(message) => anyhow::bail!("{}", message),
            None => Ok(self.lines.clone()),
        }
    }
}

/// A lisa source that discovers nothing and never fails.
pub fn empty_lisa_source() -> Arc<LisaSocketSource> {
    Arc::new(LisaSocketSource::new(
        ScriptedLisa::not_installed(),
        ScriptedProcessTable::empty(),
        Duration::from_secs(60),
    ))
}
