//! Modal confirmation dialog: a prompt and a row of buttons.

use crossterm::event::KeyEvent;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::{
    layout,
    shortcuts::{DialogShortcuts, matches_shortcut},
};

/// What a key press did to the dialog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DialogEvent {
    /// The highlighted button moved.
    Active(usize),
    /// The highlighted button was chosen.
    Chosen(usize),
}

/// Index 0 is the affirmative button. The dialog only reports choices;
/// the owner decides what they mean.
#[derive(Clone, Debug)]
pub struct Dialog {
    prompt: String,
    buttons: Vec<String>,
    active: usize,
}

impl Dialog {
    pub fn new<I, S>(prompt: impl Into<String>, buttons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prompt: prompt.into(),
            buttons: buttons.into_iter().map(Into::into).collect(),
            active: 0,
        }
    }

    #[cfg(test)]
    pub fn active(&self) -> usize {
        self.active
    }

    /// Highlight `index`, clamped to the last button.
    pub fn activate(&mut self, index: usize) {
        self.active = index.min(self.buttons.len().saturating_sub(1));
    }

    pub fn left(&mut self) {
        self.activate(self.active.saturating_sub(1));
    }

    pub fn right(&mut self) {
        self.activate(self.active + 1);
    }

    /// Apply a key. Keys the dialog does not bind return `None`.
    pub fn handle_key(&mut self, key: &KeyEvent, sc: &DialogShortcuts) -> Option<DialogEvent> {
        if matches_shortcut(key, &sc.left) {
            self.left();
            Some(DialogEvent::Active(self.active))
        } else if matches_shortcut(key, &sc.right) {
            self.right();
            Some(DialogEvent::Active(self.active))
        } else if matches_shortcut(key, &sc.select) {
            Some(DialogEvent::Chosen(self.active))
        } else {
            None
        }
    }

    /// One flag per button; exactly one is set.
    pub fn active_markers(&self) -> Vec<bool> {
        (0..self.buttons.len()).map(|i| i == self.active).collect()
    }

    fn button_line(&self) -> Line<'static> {
        let mut spans = Vec::new();
        for (i, (label, active)) in self.buttons.iter().zip(self.active_markers()).enumerate() {
            if i > 0 {
                spans.push(Span::raw("   "));
            }
            if active {
                spans.push(Span::styled(
                    format!("[ {label} ]"),
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Rgb(255, 140, 0))
                        .add_modifier(Modifier::BOLD),
                ));
            } else {
                spans.push(Span::styled(
                    format!("  {label}  "),
                    Style::default().fg(Color::Gray),
                ));
            }
        }
        Line::from(spans)
    }

    /// Draw centered over `area`, clearing what is underneath.
    pub fn render(&self, f: &mut Frame, area: Rect) {
        let popup = layout::centered_rect(area, 60, 7);
        f.render_widget(Clear, popup);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Rgb(255, 140, 0)));
        let inner = block.inner(popup);
        f.render_widget(block, popup);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(inner);
        f.render_widget(
            Paragraph::new(self.prompt.as_str())
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            rows[0],
        );
        f.render_widget(
            Paragraph::new(self.button_line()).alignment(Alignment::Center),
            rows[2],
        );
    }
}
