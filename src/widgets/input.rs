//! Single-line text input used for list filtering.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{prelude::*, widgets::Paragraph};

use crate::shortcuts::{FilterShortcuts, matches_shortcut};

/// Result of feeding a key to the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// The text changed.
    Changed,
    /// The cursor moved or nothing happened.
    Unchanged,
    Confirmed,
    Cancelled,
}

/// Text and cursor position, counted in characters.
#[derive(Clone, Debug, Default)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn value(&self) -> &str {
        &self.value
    }

    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Remove the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let at = self.byte_index(self.cursor - 1);
        self.value.remove(at);
        self.cursor -= 1;
    }

    /// Remove the character under the cursor.
    pub fn delete(&mut self) {
        if self.cursor < self.len() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.len();
    }

    pub fn clear_line(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Apply an editing key. Printable characters without Ctrl/Alt are typed.
    pub fn handle_key(&mut self, key: &KeyEvent, sc: &FilterShortcuts) -> InputEvent {
        let before = self.value.len();
        if matches_shortcut(key, &sc.confirm) {
            return InputEvent::Confirmed;
        } else if matches_shortcut(key, &sc.cancel) {
            return InputEvent::Cancelled;
        } else if matches_shortcut(key, &sc.backspace) {
            self.backspace();
        } else if matches_shortcut(key, &sc.delete) {
            self.delete();
        } else if matches_shortcut(key, &sc.left) {
            self.move_left();
        } else if matches_shortcut(key, &sc.right) {
            self.move_right();
        } else if matches_shortcut(key, &sc.home) {
            self.move_home();
        } else if matches_shortcut(key, &sc.end) {
            self.move_end();
        } else if matches_shortcut(key, &sc.clear_line) {
            self.clear_line();
        } else if let KeyCode::Char(c) = key.code
            && !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            self.insert_char(c);
        }

        if self.value.len() == before {
            InputEvent::Unchanged
        } else {
            InputEvent::Changed
        }
    }

    /// Draw `prompt` followed by the text, with `|` marking the cursor.
    /// Long input scrolls horizontally to keep the cursor visible.
    pub fn render(&self, f: &mut Frame, area: Rect, prompt: &str, focused: bool) {
        let width = (area.width as usize).saturating_sub(prompt.chars().count() + 1);
        let scroll = self.cursor.saturating_sub(width.saturating_sub(1));
        let chars: Vec<char> = self.value.chars().skip(scroll).take(width).collect();

        let mut text: String = chars.iter().collect();
        if focused {
            let at = (self.cursor - scroll).min(chars.len());
            let before: String = chars[..at].iter().collect();
            let after: String = chars[at..].iter().collect();
            text = format!("{before}|{after}");
        }

        let style = if focused {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::Gray)
        };
        let line = Line::from(vec![
            Span::styled(
                prompt.to_owned(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(text, style),
        ]);
        f.render_widget(Paragraph::new(line), area);
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    fn byte_index(&self, chars: usize) -> usize {
        self.value
            .char_indices()
            .nth(chars)
            .map_or(self.value.len(), |(i, _)| i)
    }
}
