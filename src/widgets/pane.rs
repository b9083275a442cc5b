//! Scrollable text viewport with optional line numbers and light highlighting.

use ratatui::{prelude::*, widgets::Paragraph};

/// Highlighting applied to the pane contents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Syntax {
    #[default]
    Plain,
    Yaml,
    Markdown,
    Log,
}

impl Syntax {
    /// Map a file extension or language name to a syntax. Unknown hints are plain.
    pub fn from_hint(hint: &str) -> Self {
        match hint.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Syntax::Yaml,
            "markdown" | "md" => Syntax::Markdown,
            "log" => Syntax::Log,
            _ => Syntax::Plain,
        }
    }
}

/// Text buffer plus the window of it that is on screen.
///
/// The scroll offset always stays within `0..=max_offset()`; every mutation
/// that changes the line count or the viewport re-clamps it.
#[derive(Clone, Debug, Default)]
pub struct ContentPane {
    lines: Vec<String>,
    syntax: Syntax,
    offset: usize,
    show_line_numbers: bool,
    height: u16,
}

impl ContentPane {
    pub fn new(syntax: Syntax) -> Self {
        Self {
            syntax,
            ..Self::default()
        }
    }

    /// Replace the whole buffer. The offset is clamped but not reset.
    pub fn set_content(&mut self, text: &str, syntax: Syntax) {
        self.lines = text.lines().map(str::to_owned).collect();
        self.syntax = syntax;
        self.clamp();
    }

    /// Append lines. A pane scrolled to the bottom keeps following the end.
    pub fn append_lines<I>(&mut self, lines: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let follow = self.is_at_bottom();
        self.lines.extend(lines.into_iter().map(Into::into));
        if follow {
            self.scroll_to_bottom();
        } else {
            self.clamp();
        }
    }

    #[cfg(test)]
    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    #[cfg(test)]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Largest valid offset for the current content and height.
    pub fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.height as usize)
    }

    pub fn is_at_bottom(&self) -> bool {
        self.offset >= self.max_offset()
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.offset = self.offset.saturating_sub(rows);
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.offset = self.offset.saturating_add(rows).min(self.max_offset());
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.page_rows());
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.page_rows());
    }

    pub fn half_page_up(&mut self) {
        self.scroll_up((self.page_rows() / 2).max(1));
    }

    pub fn half_page_down(&mut self) {
        self.scroll_down((self.page_rows() / 2).max(1));
    }

    /// Position of the window in `[0, 1]`; `0` when everything fits.
    pub fn scroll_percent(&self) -> f64 {
        let max = self.max_offset();
        if max == 0 {
            return 0.0;
        }
        (self.offset as f64 / max as f64).clamp(0.0, 1.0)
    }

    /// Status bar form of [`scroll_percent`](Self::scroll_percent).
    pub fn percent_label(&self) -> String {
        format!("☰ {}%", (self.scroll_percent() * 100.0).round() as u32)
    }

    #[cfg(test)]
    pub fn show_line_numbers(&self) -> bool {
        self.show_line_numbers
    }

    pub fn set_show_line_numbers(&mut self, show: bool) {
        self.show_line_numbers = show;
    }

    pub fn toggle_line_numbers(&mut self) {
        self.set_show_line_numbers(!self.show_line_numbers);
    }

    /// Viewport height in rows.
    pub fn set_height(&mut self, height: u16) {
        self.height = height;
        self.clamp();
    }

    /// Lines currently inside the viewport.
    pub fn visible_lines(&self) -> &[String] {
        let end = (self.offset + self.height as usize).min(self.lines.len());
        let start = self.offset.min(end);
        &self.lines[start..end]
    }

    #[cfg(test)]
    /// Visible text as drawn, without styling.
    pub fn rendered_text(&self) -> String {
        let width = self.gutter_width();
        self.visible_lines()
            .iter()
            .enumerate()
            .map(|(i, line)| match width {
                Some(w) => format!("{:>w$} {line}", self.offset + i + 1),
                None => line.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let width = self.gutter_width();
        let lines: Vec<Line> = self
            .visible_lines()
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let mut spans = Vec::new();
                if let Some(w) = width {
                    spans.push(Span::styled(
                        format!("{:>w$} ", self.offset + i + 1),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                spans.extend(highlight(self.syntax, text));
                Line::from(spans)
            })
            .collect();
        f.render_widget(Paragraph::new(lines), area);
    }

    fn page_rows(&self) -> usize {
        (self.height as usize).max(1)
    }

    fn gutter_width(&self) -> Option<usize> {
        self.show_line_numbers
            .then(|| self.lines.len().max(1).to_string().len())
    }

    fn clamp(&mut self) {
        self.offset = self.offset.min(self.max_offset());
    }
}

fn highlight(syntax: Syntax, line: &str) -> Vec<Span<'static>> {
    match syntax {
        Syntax::Plain => vec![Span::raw(line.to_owned())],
        Syntax::Yaml => highlight_yaml(line),
        Syntax::Markdown => highlight_markdown(line),
        Syntax::Log => vec![Span::styled(line.to_owned(), log_style(line))],
    }
}

fn highlight_yaml(line: &str) -> Vec<Span<'static>> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return vec![Span::styled(
            line.to_owned(),
            Style::default().fg(Color::DarkGray),
        )];
    }
    if let Some(idx) = line.find(':') {
        let key = trimmed.trim_start_matches("- ");
        let key = &key[..key.find(':').unwrap_or(0)];
        if !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return vec![
                Span::styled(line[..idx].to_owned(), Style::default().fg(Color::Cyan)),
                Span::raw(line[idx..].to_owned()),
            ];
        }
    }
    vec![Span::raw(line.to_owned())]
}

fn highlight_markdown(line: &str) -> Vec<Span<'static>> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return vec![Span::styled(
            line.to_owned(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )];
    }
    if let Some(rest) = trimmed.strip_prefix("- ") {
        let indent = &line[..line.len() - trimmed.len()];
        return vec![
            Span::raw(indent.to_owned()),
            Span::styled("- ", Style::default().fg(Color::Green)),
            Span::raw(rest.to_owned()),
        ];
    }
    vec![Span::raw(line.to_owned())]
}

fn log_style(line: &str) -> Style {
    let lower = line.to_ascii_lowercase();
    if line.starts_with("[wdeploy]") {
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD)
    } else if lower.contains("fatal") || lower.contains("failed") || lower.contains("error") {
        Style::default().fg(Color::Red)
    } else if lower.starts_with("changed") {
        Style::default().fg(Color::Yellow)
    } else if lower.starts_with("ok") {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    }
}
