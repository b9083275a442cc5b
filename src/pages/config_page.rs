//! Viewer for one of the YAML documents, with a hand-off to the editor.

use crossterm::event::KeyEvent;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders},
};

use crate::{
    config::{ConfigError, ConfigKind, DeployConfig},
    events::PageOutcome,
    layout,
    pages::scroll_pane,
    shortcuts::{Shortcuts, matches_shortcut},
    widgets::{ContentPane, StatusBar, Syntax, TabStrip},
};

pub struct ConfigPage {
    kind: ConfigKind,
    tabs: TabStrip,
    pane: ContentPane,
    status: StatusBar,
    /// Message shown in place of the path until the next reload.
    notice: Option<String>,
}

impl ConfigPage {
    pub fn new(kind: ConfigKind) -> Self {
        let (key, tab) = match kind {
            ConfigKind::Vars => ("vars", "vars.yml"),
            ConfigKind::Hosts => ("hosts", "hosts.yml"),
        };
        Self {
            kind,
            tabs: TabStrip::new([tab]),
            pane: ContentPane::new(Syntax::Yaml),
            status: StatusBar::new(key),
            notice: None,
        }
    }

    #[cfg(test)]
    pub fn pane(&self) -> &ContentPane {
        &self.pane
    }

    #[cfg(test)]
    pub fn status(&self) -> &StatusBar {
        &self.status
    }

    /// Re-read the backing file into the pane and the parsed configuration.
    ///
    /// An unreadable file is logged and leaves the previous text (or a
    /// placeholder) in place. Malformed YAML is shown as-is and returned as
    /// an error; the parsed configuration keeps its last good value.
    pub fn reload(&mut self, cfg: &mut DeployConfig) -> Result<(), ConfigError> {
        self.notice = None;
        let result = match cfg.read_raw(self.kind) {
            Ok(text) => {
                let syntax = cfg
                    .path(self.kind)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map_or(Syntax::Yaml, Syntax::from_hint);
                self.pane.set_content(&text, syntax);
                self.pane.scroll_to_top();
                cfg.apply_raw(self.kind, &text)
            }
            Err(err) => {
                tracing::warn!("{err}");
                if self.pane.line_count() == 0 {
                    self.pane
                        .set_content(&format!("# {err}"), Syntax::Yaml);
                }
                self.notice = Some("unable to read file".into());
                Ok(())
            }
        };
        self.refresh_status(cfg);
        result
    }

    /// Report an editor problem in the status bar until the next reload.
    pub fn set_notice(&mut self, notice: impl Into<String>, cfg: &DeployConfig) {
        self.notice = Some(notice.into());
        self.refresh_status(cfg);
    }

    pub fn resize(&mut self, body: Rect) {
        let inner = layout::pane_inner(layout::page_layout(body).body);
        self.pane.set_height(inner.height);
    }

    pub fn handle_key(&mut self, key: &KeyEvent, sc: &Shortcuts, cfg: &DeployConfig) -> PageOutcome {
        let page = &sc.page;
        let outcome = if matches_shortcut(key, &page.edit) {
            PageOutcome::Edit(cfg.path(self.kind).to_path_buf())
        } else if matches_shortcut(key, &page.next_tab) {
            self.tabs.next();
            PageOutcome::None
        } else if matches_shortcut(key, &page.prev_tab) {
            self.tabs.prev();
            PageOutcome::None
        } else if matches_shortcut(key, &page.line_numbers) {
            self.pane.toggle_line_numbers();
            PageOutcome::None
        } else {
            scroll_pane(&mut self.pane, key, page);
            PageOutcome::None
        };
        self.refresh_status(cfg);
        outcome
    }

    pub fn refresh_status(&mut self, cfg: &DeployConfig) {
        let value = match &self.notice {
            Some(notice) => notice.clone(),
            None => cfg.path(self.kind).display().to_string(),
        };
        self.status
            .set(value, self.pane.percent_label(), cfg.version_tag());
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let page = layout::page_layout(area);
        self.tabs.render(f, page.tabs);
        f.render_widget(Block::default().borders(Borders::ALL), page.body);
        self.pane.render(f, layout::pane_inner(page.body));
        self.status.render(f, page.status_bar);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::fs;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    #[test]
    fn test_reload_shows_file_and_status() {
        // The pane holds the file text; the status bar names the file and version.
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = test_config(dir.path());
        let mut page = ConfigPage::new(ConfigKind::Hosts);
        page.resize(Rect::new(0, 0, 80, 20));
        page.reload(&mut cfg).unwrap();

        assert!(page.pane().rendered_text().contains("ansible_host: localhost"));
        assert_eq!(page.status().key(), "hosts");
        assert!(page.status().value().ends_with("hosts.yml"));
        assert_eq!(page.status().info(), "☰ 0%");
        assert_eq!(page.status().branch(), "v23.02");
    }

    #[test]
    fn test_reload_picks_up_external_edit() {
        // A changed file replaces both the text and the parsed inventory.
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = test_config(dir.path());
        let mut page = ConfigPage::new(ConfigKind::Hosts);
        page.resize(Rect::new(0, 0, 80, 20));
        fs::write(
            dir.path().join("hosts.yml"),
            "all:\n  hosts:\n    edge:\n      ansible_host: 9.9.9.9\n",
        )
        .unwrap();

        page.reload(&mut cfg).unwrap();
        assert_eq!(cfg.inventory.all.hosts["edge"].address, "9.9.9.9");
        assert!(page.pane().rendered_text().contains("9.9.9.9"));
    }

    #[test]
    fn test_malformed_edit_keeps_raw_text() {
        // Broken YAML is displayed and reported, the parsed state is untouched.
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = test_config(dir.path());
        let before = cfg.inventory.clone();
        let mut page = ConfigPage::new(ConfigKind::Hosts);
        page.resize(Rect::new(0, 0, 80, 20));
        fs::write(dir.path().join("hosts.yml"), "all: [broken").unwrap();

        assert!(page.reload(&mut cfg).is_err());
        assert_eq!(page.pane().rendered_text(), "all: [broken");
        assert_eq!(cfg.inventory, before);
    }

    #[test]
    fn test_unreadable_file_keeps_last_content() {
        // A vanished file leaves the previous text and flags the status bar.
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = test_config(dir.path());
        let mut page = ConfigPage::new(ConfigKind::Vars);
        page.resize(Rect::new(0, 0, 80, 20));
        page.reload(&mut cfg).unwrap();
        let shown = page.pane().rendered_text();

        fs::remove_file(dir.path().join("vars.yml")).unwrap();
        page.reload(&mut cfg).unwrap();
        assert_eq!(page.pane().rendered_text(), shown);
        assert_eq!(page.status().value(), "unable to read file");
    }

    #[test]
    fn test_edit_key_requests_editor() {
        // e and Enter both ask for the backing file to be edited.
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        let sc = Shortcuts::default();
        let mut page = ConfigPage::new(ConfigKind::Vars);

        let expected = PageOutcome::Edit(dir.path().join("vars.yml"));
        assert_eq!(page.handle_key(&press(KeyCode::Char('e')), &sc, &cfg), expected);
        assert_eq!(page.handle_key(&press(KeyCode::Enter), &sc, &cfg), expected);
    }

    #[test]
    fn test_scroll_updates_percentage() {
        // Scrolling to the end of a long file reports 100%.
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = test_config(dir.path());
        let sc = Shortcuts::default();
        let mut page = ConfigPage::new(ConfigKind::Vars);
        page.resize(Rect::new(0, 0, 80, 10));
        page.reload(&mut cfg).unwrap();

        page.handle_key(&press(KeyCode::End), &sc, &cfg);
        assert_eq!(page.status().info(), "☰ 100%");
        page.handle_key(&press(KeyCode::Home), &sc, &cfg);
        assert_eq!(page.status().info(), "☰ 0%");
    }
}
