mod app;
mod input;
pub mod layout;
mod message;
mod ui;

use crate::config::Config;
use crate::refresh::RefreshEngine;
use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind, MouseButton,
        MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::{Duration, Instant};

pub use app::{Action, App};
pub use message::Message;

pub async fn run(config: Config) -> Result<()> {
    // Check if stdout is a terminal
    if !std::io::IsTerminal::is_terminal(&io::stdout()) {
        anyhow::bail!("muxboard requires an interactive terminal");
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let engine = RefreshEngine::system(&config);
    let mut app = App::new(config, engine);

    // Initial cycle starts immediately; the UI shows while it runs.
    app.start_background_refresh();

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    app.abort_refresh();
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let mut last_refresh = Instant::now();

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            let msg = match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    input::dispatch(app, key)
                }
                Event::Mouse(mouse) => mouse_message(app, mouse),
                Event::Resize(..) => {
                    terminal.autoresize()?;
                    Message::None
                }
                _ => Message::None,
            };

            match app.update(msg).await? {
                Action::Quit => return Ok(()),
                Action::Attach {
                    socket,
                    session,
                    pane_id,
                } => attach(terminal, app, &socket, &session, &pane_id)?,
                Action::MouseToggled(enabled) => {
                    if enabled {
                        execute!(terminal.backend_mut(), EnableMouseCapture)?;
                    } else {
                        execute!(terminal.backend_mut(), DisableMouseCapture)?;
                    }
                }
                Action::Continue => {}
            }
        }

        app.poll_refresh();

        if last_refresh.elapsed() >= app.config.interval() {
            app.start_background_refresh();
            last_refresh = Instant::now();
        }
    }
}

fn mouse_message(app: &App, mouse: MouseEvent) -> Message {
    if !app.mouse_enabled || app.forward_input {
        return Message::None;
    }
    match mouse.kind {
        MouseEventKind::ScrollUp => Message::ScrollBy(-3),
        MouseEventKind::ScrollDown => Message::ScrollBy(3),
        MouseEventKind::Down(MouseButton::Left) => {
            let count = app.state.sessions.len();
            match layout::session_index_at(app.grid_area, count, mouse.column, mouse.row) {
                Some(idx) => Message::FocusSet(idx),
                None => Message::None,
            }
        }
        _ => Message::None,
    }
}

/// Suspend the dashboard and hand the terminal to `tmux attach-session`.
fn attach(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    socket: &str,
    session: &str,
    pane_id: &str,
) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;

    if let Err(e) = app.attach_interactive(socket, session, pane_id) {
        app.state.last_err = Some(format!("tmux attach failed: {}", e));
    }

    enable_raw_mode()?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)?;
    if app.mouse_enabled {
        execute!(terminal.backend_mut(), EnableMouseCapture)?;
    }
    terminal.clear()?;
    Ok(())
}
