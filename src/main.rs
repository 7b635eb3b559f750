use anyhow::Result;
use clap::Parser;
use muxboard::{config, tui};

#[derive(Parser, Debug)]
#[command(name = "muxboard")]
#[command(about = "Terminal dashboard for monitoring tmux sessions across control sockets")]
#[command(version)]
struct Args {
    /// Number of lines to capture per session
    #[arg(long)]
    lines: Option<usize>,

    /// Refresh interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Timeout for each tmux command in milliseconds
    #[arg(long)]
    cmd_timeout_ms: Option<u64>,

    /// Max concurrent tmux capture workers
    #[arg(long)]
    workers: Option<usize>,

    /// Capture every pane instead of only the active pane per session
    #[arg(long)]
    all_panes: bool,

    /// Do not query the default tmux server
    #[arg(long)]
    no_default_socket: bool,

    /// Do not discover lisa-managed sockets
    #[arg(long)]
    no_lisa_sockets: bool,

    /// Glob pattern for socket files
    #[arg(long)]
    socket_glob: Option<String>,

    /// Explicit socket path to query (repeatable)
    #[arg(long = "socket", value_name = "PATH")]
    sockets: Vec<String>,

    /// Path to config file
    #[arg(long, short)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("muxboard=warn".parse()?),
        )
        .init();

    let mut config = config::load(args.config.as_deref())?;

    if let Some(lines) = args.lines {
        config.lines = lines;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.interval_ms = interval_ms;
    }
    if let Some(cmd_timeout_ms) = args.cmd_timeout_ms {
        config.cmd_timeout_ms = cmd_timeout_ms;
    }
    if let Some(workers) = args.workers {
        config.max_workers = workers;
    }
    if args.all_panes {
        config.all_panes = true;
    }
    if args.no_default_socket {
        config.include_default_socket = false;
    }
    if args.no_lisa_sockets {
        config.include_lisa_sockets = false;
    }
    if let Some(socket_glob) = args.socket_glob {
        config.socket_glob = socket_glob;
    }
    for socket in args.sockets {
        let socket = socket.trim().to_string();
        if !socket.is_empty() {
            config.sockets.push(socket);
        }
    }
    config.clamp();

    // Run TUI
    tui::run(config).await
}
