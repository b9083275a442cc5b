//! Layout helpers shared by the shell and the pages.

use ratatui::prelude::*;

/// Header, active page and help footer.
pub struct ShellLayout {
    pub header: Rect,
    pub body: Rect,
    pub footer: Rect,
}

/// Areas of a tabbed page.
pub struct PageLayout {
    pub tabs: Rect,
    pub body: Rect,
    pub status_bar: Rect,
}

/// Split the terminal into header, page and a footer of `footer_height` rows.
pub fn shell_layout(area: Rect, footer_height: u16) -> ShellLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(footer_height),
        ])
        .split(area);

    ShellLayout {
        header: chunks[0],
        body: chunks[1],
        footer: chunks[2],
    }
}

/// Tab strip on top, status bar at the bottom, content in between.
pub fn page_layout(area: Rect) -> PageLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    PageLayout {
        tabs: chunks[0],
        body: chunks[1],
        status_bar: chunks[2],
    }
}

/// Text area of a bordered content block.
pub fn pane_inner(body: Rect) -> Rect {
    body.inner(Margin {
        horizontal: 1,
        vertical: 1,
    })
}

/// Box of `height` rows and `width_percent` of the width, centered in `area`.
pub fn centered_rect(area: Rect, width_percent: u16, height: u16) -> Rect {
    let width_percent = width_percent.min(100);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(height) / 2),
            Constraint::Length(height.min(area.height)),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(rows[1])[1]
}
