//! Horizontal tab strip with clamped navigation.

use ratatui::{prelude::*, widgets::Tabs};

#[derive(Clone, Debug)]
pub struct TabStrip {
    labels: Vec<String>,
    active: usize,
}

impl TabStrip {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            active: 0,
        }
    }

    pub fn active(&self) -> usize {
        self.active
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Make `index` active. Out of range indexes are ignored and yield `None`.
    pub fn select(&mut self, index: usize) -> Option<usize> {
        if index >= self.labels.len() {
            return None;
        }
        self.active = index;
        Some(index)
    }

    /// Move right; stays on the last tab.
    pub fn next(&mut self) -> Option<usize> {
        if self.active + 1 >= self.labels.len() {
            return None;
        }
        self.select(self.active + 1)
    }

    /// Move left; stays on the first tab.
    pub fn prev(&mut self) -> Option<usize> {
        let index = self.active.checked_sub(1)?;
        self.select(index)
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let tabs = Tabs::new(self.labels.iter().map(|l| Line::from(format!(" {l} "))))
            .select(self.active)
            .style(Style::default().fg(Color::Gray))
            .highlight_style(
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Rgb(255, 140, 0))
                    .add_modifier(Modifier::BOLD),
            )
            .divider("│");
        f.render_widget(tabs, area);
    }
}
