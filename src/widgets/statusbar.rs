//! One-line status bar: page key, file path, scroll position and version.

use ratatui::{prelude::*, widgets::Paragraph};

#[derive(Clone, Debug, Default)]
pub struct StatusBar {
    key: String,
    value: String,
    info: String,
    branch: String,
}

impl StatusBar {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn set(
        &mut self,
        value: impl Into<String>,
        info: impl Into<String>,
        branch: impl Into<String>,
    ) {
        self.value = value.into();
        self.info = info.into();
        self.branch = branch.into();
    }

    #[cfg(test)]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[cfg(test)]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[cfg(test)]
    pub fn info(&self) -> &str {
        &self.info
    }

    #[cfg(test)]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let right = format!(" {} ", self.info);
        let branch = format!(" {} ", self.branch);
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(self.key.chars().count() as u16 + 2),
                Constraint::Min(0),
                Constraint::Length(right.chars().count() as u16),
                Constraint::Length(branch.chars().count() as u16),
            ])
            .split(area);

        let base = Style::default().bg(Color::DarkGray).fg(Color::White);
        f.render_widget(
            Paragraph::new(format!(" {} ", self.key)).style(
                Style::default()
                    .bg(Color::Rgb(255, 140, 0))
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            ),
            chunks[0],
        );
        f.render_widget(
            Paragraph::new(format!(" {}", self.value)).style(base),
            chunks[1],
        );
        f.render_widget(Paragraph::new(right).style(base), chunks[2]);
        f.render_widget(
            Paragraph::new(branch).style(Style::default().bg(Color::Magenta).fg(Color::White)),
            chunks[3],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::buffer_lines;
    use ratatui::{Terminal, backend::TestBackend};

    #[test]
    fn test_render_shows_all_fields() {
        // Key on the left, percentage and version on the right.
        let mut bar = StatusBar::new("vars");
        bar.set("/tmp/vars.yml", "☰ 40%", "v23.02");
        let mut terminal = Terminal::new(TestBackend::new(50, 1)).unwrap();
        terminal.draw(|f| bar.render(f, f.area())).unwrap();

        let row = &buffer_lines(terminal.backend().buffer())[0];
        assert!(row.starts_with(" vars "));
        assert!(row.contains("/tmp/vars.yml"));
        assert!(row.trim_end().ends_with("☰ 40%  v23.02"));
    }
}
