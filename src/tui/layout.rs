//! Grid geometry for the session view.
//!
//! Sessions are laid out in a ⌈√n⌉-column grid filling the area above the
//! status line. Cells are computed with integer math so the grid always
//! covers the full area without gaps.

use ratatui::layout::Rect;

/// Columns and rows for `count` cells.
pub fn grid_dims(count: usize) -> (usize, usize) {
    if count == 0 {
        return (1, 1);
    }
    let cols = (count as f64).sqrt().ceil() as usize;
    let cols = cols.max(1);
    let rows = count.div_ceil(cols);
    (cols, rows.max(1))
}

/// The rectangle of cell `index` within `area`.
pub fn cell_rect(area: Rect, count: usize, index: usize) -> Rect {
    let (cols, rows) = grid_dims(count);
    let col = index % cols;
    let row = index / cols;
    let width = area.width as usize;
    let height = area.height as usize;
    let x0 = width * col / cols;
    let x1 = width * (col + 1) / cols;
    let y0 = height * row / rows;
    let y1 = height * (row + 1) / rows;
    Rect {
        x: area.x + x0 as u16,
        y: area.y + y0 as u16,
        width: (x1 - x0) as u16,
        height: (y1 - y0) as u16,
    }
}

/// Content rows inside cell `index`: the cell minus its border.
pub fn content_height(area: Rect, count: usize, index: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let cell = cell_rect(area, count, index);
    (cell.height as usize).saturating_sub(2)
}

/// Which cell a point falls into, if any.
pub fn session_index_at(area: Rect, count: usize, x: u16, y: u16) -> Option<usize> {
    if count == 0 || !area.contains(ratatui::layout::Position { x, y }) {
        return None;
    }
    for index in 0..count {
        if cell_rect(area, count, index).contains(ratatui::layout::Position { x, y }) {
            return Some(index);
        }
    }
    None
}
