//! Rendering: the session grid and the status line.

use crate::data::{ordered_session_keys, SessionView};
use crate::tui::{layout, App};
use crate::util::strip_escapes;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

pub fn draw(f: &mut Frame, app: &mut App) {
    let area = f.area();
    if area.width == 0 || area.height == 0 {
        return;
    }

    let status_height = if area.height >= 2 { 1 } else { 0 };
    let grid = Rect {
        height: area.height - status_height,
        ..area
    };
    app.grid_area = grid;

    let keys = ordered_session_keys(&app.state);
    if grid.height > 0 {
        if app.state.server_down {
            draw_centered(f, grid, "tmux server not running");
        } else if keys.is_empty() {
            draw_centered(f, grid, "no tmux sessions");
        } else {
            for (i, key) in keys.iter().enumerate() {
                let Some(view) = app.state.sessions.get(key) else {
                    continue;
                };
                let cell = layout::cell_rect(grid, keys.len(), i);
                let scroll = app.state.scroll.get(key).copied().unwrap_or(0);
                let follow = app.state.follow.get(key).copied().unwrap_or(true);
                draw_cell(f, cell, view, i == app.state.focus_index, scroll, follow);
            }
        }
    }

    if status_height == 1 {
        let status = Rect {
            y: area.y + area.height - 1,
            height: 1,
            ..area
        };
        draw_status(f, status, app, keys.len());
    }
}

fn cell_title(view: &SessionView) -> String {
    let mut title = view.name.clone();
    if !view.pane_id.is_empty() {
        title.push_str(&format!(" ({})", view.pane_id));
    }
    title.push_str(&format!(" · {}", view.socket_hint));
    title
}

fn draw_cell(f: &mut Frame, cell: Rect, view: &SessionView, focused: bool, scroll: usize, follow: bool) {
    if cell.width <= 1 || cell.height <= 1 {
        return;
    }

    let (border_style, title_style) = if focused {
        (
            Style::default().fg(Color::Yellow),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        (
            Style::default().fg(Color::DarkGray),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )
    };

    let mut title = cell_title(view);
    let max_title = cell.width.saturating_sub(2) as usize;
    while title.width() > max_title && !title.is_empty() {
        title.pop();
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Line::styled(title, title_style));
    let inner = block.inner(cell);
    f.render_widget(block, cell);

    let content_height = inner.height as usize;
    if content_height == 0 {
        return;
    }

    let max_start = view.lines.len().saturating_sub(content_height);
    let start = if follow { max_start } else { scroll.min(max_start) };
    let lines: Vec<Line> = view
        .lines
        .iter()
        .skip(start)
        .take(content_height)
        .map(|line| Line::raw(strip_escapes(line)))
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_centered(f: &mut Frame, area: Rect, text: &str) {
    let y = area.y + area.height / 2;
    let row = Rect {
        y,
        height: 1,
        ..area
    };
    f.render_widget(
        Paragraph::new(text).alignment(Alignment::Center),
        row,
    );
}

fn draw_status(f: &mut Frame, area: Rect, app: &App, session_count: usize) {
    let (label, style) = match &app.state.last_err {
        Some(err) => (
            format!("error: {}", err),
            Style::default().fg(Color::White).bg(Color::Red),
        ),
        None => {
            let mut label = format!(
                "sessions:{} | sockets:{} | lines:{} | interval:{}ms | tab:focus j/k:scroll i:type q:quit",
                session_count, app.state.socket_count, app.config.lines, app.config.interval_ms
            );
            if app.forward_input {
                label = format!("[typing → focused pane, C-s to stop] {}", label);
            } else if app.refreshing() {
                label.push_str(" | refreshing…");
            }
            (label, Style::default().fg(Color::Black).bg(Color::Gray))
        }
    };
    f.render_widget(Paragraph::new(label).style(style), area);
}
