//! Start page: a filterable list of the things wdeploy can do.

use crossterm::event::KeyEvent;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState},
};

use crate::{
    events::PageOutcome,
    shortcuts::{Shortcuts, matches_shortcut},
    widgets::{InputEvent, StatusBar, TextInput},
};

/// One entry of the action list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Action {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

pub static ACTIONS: [Action; 3] = [
    Action {
        id: "vars",
        title: "Configure vars",
        description: "Webitel version, Grafana dashboards, Fail2ban, LetsEncrypt certificate",
    },
    Action {
        id: "hosts",
        title: "Configure hosts",
        description: "Servers to deploy to and the services each one runs",
    },
    Action {
        id: "deploy",
        title: "Deploy Webitel",
        description: "Review the summary and run the playbook",
    },
];

const FILTER_PROMPT: &str = "Filter: ";

pub struct SelectionPage {
    filter: TextInput,
    filtering: bool,
    cursor: usize,
    status: StatusBar,
}

impl Default for SelectionPage {
    fn default() -> Self {
        Self {
            filter: TextInput::default(),
            filtering: false,
            cursor: 0,
            status: StatusBar::new("wdeploy"),
        }
    }
}

impl SelectionPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether typed keys go to the filter input.
    pub fn is_filtering(&self) -> bool {
        self.filtering
    }

    #[cfg(test)]
    pub fn filter_text(&self) -> &str {
        self.filter.value()
    }

    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Actions whose title contains the filter text, ignoring case.
    pub fn visible(&self) -> Vec<&'static Action> {
        let needle = self.filter.value().to_lowercase();
        ACTIONS
            .iter()
            .filter(|a| a.title.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn selected(&self) -> Option<&'static Action> {
        self.visible().get(self.cursor).copied()
    }

    pub fn handle_key(&mut self, key: &KeyEvent, sc: &Shortcuts) -> PageOutcome {
        if self.filtering {
            match self.filter.handle_key(key, &sc.filter) {
                InputEvent::Confirmed => self.filtering = false,
                InputEvent::Cancelled => {
                    self.filter.clear_line();
                    self.filtering = false;
                }
                InputEvent::Changed => self.cursor = 0,
                InputEvent::Unchanged => {}
            }
            self.clamp_cursor();
            return PageOutcome::None;
        }

        let list = &sc.selection;
        if matches_shortcut(key, &list.filter) {
            self.filtering = true;
            self.filter.move_end();
        } else if matches_shortcut(key, &list.up) {
            self.cursor = self.cursor.saturating_sub(1);
        } else if matches_shortcut(key, &list.down) {
            self.cursor += 1;
            self.clamp_cursor();
        } else if matches_shortcut(key, &list.select) {
            if let Some(action) = self.selected() {
                tracing::debug!(action = action.id, "action selected");
                return PageOutcome::Selected(action.id);
            }
        } else if matches_shortcut(key, &sc.global.back) && !self.filter.is_empty() {
            self.filter.clear_line();
            self.clamp_cursor();
        }
        PageOutcome::None
    }

    pub fn refresh_status(&mut self, version: &str) {
        let total = self.visible().len();
        let value = if self.filter.is_empty() {
            format!("{total} actions")
        } else {
            format!("{total} matching \"{}\"", self.filter.value())
        };
        let position = if total == 0 {
            "0/0".to_string()
        } else {
            format!("{}/{}", self.cursor + 1, total)
        };
        self.status.set(value, position, version);
    }

    #[cfg(test)]
    pub fn status(&self) -> &StatusBar {
        &self.status
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(area);

        if self.filtering || !self.filter.is_empty() {
            self.filter
                .render(f, chunks[0], FILTER_PROMPT, self.filtering);
        }

        let items: Vec<ListItem> = self
            .visible()
            .into_iter()
            .map(|a| {
                ListItem::new(vec![
                    Line::from(Span::styled(
                        a.title,
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(
                        a.description,
                        Style::default().fg(Color::DarkGray),
                    )),
                ])
            })
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Actions"))
            .highlight_style(
                Style::default()
                    .bg(Color::Rgb(255, 140, 0))
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");
        let mut state = ListState::default();
        if self.selected().is_some() {
            state.select(Some(self.cursor));
        }
        f.render_stateful_widget(list, chunks[1], &mut state);

        self.status.render(f, chunks[2]);
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.visible().len().saturating_sub(1));
    }
}
