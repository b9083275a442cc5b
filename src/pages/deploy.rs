//! Deploy page: summary, confirmation and the live provisioning log.

use std::{fmt::Display, path::PathBuf};

use chrono::{DateTime, Local};
use crossterm::event::KeyEvent;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders},
};
use tokio::sync::mpsc;

use crate::{
    config::DeployConfig,
    events::PageOutcome,
    layout,
    pages::scroll_pane,
    runner::{RunOutcome, RunnerEvent},
    shortcuts::{Shortcuts, matches_shortcut},
    tail::LogStream,
    templates,
    widgets::{ContentPane, Dialog, DialogEvent, StatusBar, Syntax, TabStrip},
};

pub const SUMMARY_TAB: usize = 0;
pub const LOG_TAB: usize = 1;

const PROMPT: &str = "Are you sure want to deploy Webitel?";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeployState {
    Idle,
    Confirming,
    Running,
    Finished { success: bool, code: Option<i32> },
}

pub struct DeployPage {
    state: DeployState,
    tabs: TabStrip,
    summary: ContentPane,
    log: ContentPane,
    dialog: Dialog,
    stream: LogStream,
    status: StatusBar,
    started_at: Option<DateTime<Local>>,
    /// A run was started or attempted in this session. The in-memory
    /// transcript then holds more than the log file (the run notes).
    ran: bool,
}

impl DeployPage {
    /// `log_path` is the transcript file the runner writes.
    pub fn new(log_path: PathBuf) -> Self {
        Self {
            state: DeployState::Idle,
            tabs: TabStrip::new(["Summary", "Log"]),
            summary: ContentPane::new(Syntax::Markdown),
            log: ContentPane::new(Syntax::Log),
            dialog: Dialog::new(PROMPT, ["Deploy", "Cancel"]),
            stream: LogStream::new(log_path),
            status: StatusBar::new("deploy"),
            started_at: None,
            ran: false,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> DeployState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == DeployState::Running
    }

    #[cfg(test)]
    pub fn active_tab(&self) -> usize {
        self.tabs.active()
    }

    #[cfg(test)]
    pub fn transcript(&self) -> &[String] {
        self.stream.transcript()
    }

    #[cfg(test)]
    pub fn summary_pane(&self) -> &ContentPane {
        &self.summary
    }

    #[cfg(test)]
    pub fn log_pane(&self) -> &ContentPane {
        &self.log
    }

    #[cfg(test)]
    pub fn dialog(&self) -> &Dialog {
        &self.dialog
    }

    #[cfg(test)]
    pub fn status(&self) -> &StatusBar {
        &self.status
    }

    /// Page entry. Always shows the summary tab; unless a run is in
    /// progress the dialog opens. The transcript is re-read from disk only
    /// while this session has not run anything itself.
    pub fn activate(&mut self, cfg: &DeployConfig) {
        let summary = templates::render_summary(&cfg.vars, &cfg.inventory);
        self.summary.set_content(&summary, Syntax::Markdown);
        self.summary.scroll_to_top();

        if !self.is_running() {
            if !self.ran {
                if let Err(err) = self.stream.reload_from_disk() {
                    tracing::warn!(
                        "failed to read {}: {err}",
                        self.stream.path().display()
                    );
                }
                self.log
                    .set_content(&self.stream.transcript_text(), Syntax::Log);
            }
            self.log.scroll_to_bottom();
            self.open_dialog();
        }
        self.tabs.select(SUMMARY_TAB);
        self.refresh_status(cfg);
    }

    pub fn resize(&mut self, body: Rect) {
        let inner = layout::pane_inner(layout::page_layout(body).body);
        self.summary.set_height(inner.height);
        self.log.set_height(inner.height);
    }

    pub fn handle_key(&mut self, key: &KeyEvent, sc: &Shortcuts, cfg: &DeployConfig) -> PageOutcome {
        let outcome = self.route_key(key, sc);
        self.refresh_status(cfg);
        outcome
    }

    fn route_key(&mut self, key: &KeyEvent, sc: &Shortcuts) -> PageOutcome {
        let page = &sc.page;
        // Tab switching works in every state, dialog or not.
        if matches_shortcut(key, &page.next_tab) {
            self.tabs.next();
            return PageOutcome::None;
        }
        if matches_shortcut(key, &page.prev_tab) {
            self.tabs.prev();
            return PageOutcome::None;
        }

        // The dialog gets first pick while it is on screen.
        if self.dialog_visible() {
            match self.dialog.handle_key(key, &sc.dialog) {
                Some(DialogEvent::Chosen(0)) => return PageOutcome::StartDeploy,
                Some(DialogEvent::Chosen(_)) => {
                    tracing::info!("deploy cancelled");
                    self.state = DeployState::Idle;
                    return PageOutcome::None;
                }
                Some(DialogEvent::Active(_)) => return PageOutcome::None,
                None => {}
            }
        }

        // Page keys act on whichever pane the active tab shows.
        if matches_shortcut(key, &page.deploy) {
            if matches!(self.state, DeployState::Idle | DeployState::Finished { .. }) {
                self.open_dialog();
            }
        } else if matches_shortcut(key, &page.line_numbers) {
            self.active_pane_mut().toggle_line_numbers();
        } else {
            scroll_pane(self.active_pane_mut(), key, page);
        }
        PageOutcome::None
    }

    /// Switch to the log and start consuming a freshly spawned run.
    pub fn begin_run(&mut self, rx: mpsc::UnboundedReceiver<RunnerEvent>) {
        self.ran = true;
        self.stream.attach(rx);
        self.log.set_content("", Syntax::Log);
        let now = Local::now();
        self.started_at = Some(now);
        self.note(format!(
            "[wdeploy] deploy started at {}",
            now.format(TIME_FORMAT)
        ));
        self.state = DeployState::Running;
        self.tabs.select(LOG_TAB);
    }

    /// The runner could not be started.
    pub fn start_failed(&mut self, err: impl Display) {
        self.ran = true;
        self.note(format!("[wdeploy] failed to start the playbook: {err}"));
        self.state = DeployState::Finished {
            success: false,
            code: None,
        };
        self.tabs.select(LOG_TAB);
    }

    /// Move queued runner output into the log. Returns whether anything changed.
    pub fn poll(&mut self) -> bool {
        if !self.stream.is_attached() {
            return false;
        }
        let was_closed = self.stream.is_closed();
        let drained = self.stream.drain();
        if drained.is_empty() {
            return self.stream.is_closed() != was_closed;
        }
        self.log.append_lines(drained.lines);
        if let Some(outcome) = drained.outcome {
            self.finish(outcome);
        }
        true
    }

    fn finish(&mut self, outcome: RunOutcome) {
        let now = Local::now();
        let elapsed = self
            .started_at
            .map_or(0, |start| (now - start).num_seconds());
        let at = now.format(TIME_FORMAT);
        let line = if outcome.success {
            tracing::info!(elapsed, "deploy finished");
            format!("[wdeploy] deploy finished successfully at {at} ({elapsed}s)")
        } else {
            let code = outcome
                .code
                .map_or_else(|| "no exit code".to_string(), |c| format!("exit code {c}"));
            tracing::warn!(elapsed, "deploy failed with {code}");
            format!("[wdeploy] deploy failed with {code} at {at} ({elapsed}s)")
        };
        self.note(line);
        self.state = DeployState::Finished {
            success: outcome.success,
            code: outcome.code,
        };
    }

    fn note(&mut self, line: String) {
        self.stream.push_line(line.clone());
        self.log.append_lines([line]);
    }

    fn dialog_visible(&self) -> bool {
        self.state == DeployState::Confirming && self.tabs.active() == SUMMARY_TAB
    }

    fn open_dialog(&mut self) {
        self.dialog.activate(0);
        self.tabs.select(SUMMARY_TAB);
        self.state = DeployState::Confirming;
    }

    fn active_pane(&self) -> &ContentPane {
        if self.tabs.active() == LOG_TAB {
            &self.log
        } else {
            &self.summary
        }
    }

    fn active_pane_mut(&mut self) -> &mut ContentPane {
        if self.tabs.active() == LOG_TAB {
            &mut self.log
        } else {
            &mut self.summary
        }
    }

    pub fn refresh_status(&mut self, cfg: &DeployConfig) {
        let state = match self.state {
            DeployState::Idle => "ready".to_string(),
            DeployState::Confirming => "awaiting confirmation".to_string(),
            DeployState::Running if self.stream.is_closed() => "waiting for exit".to_string(),
            DeployState::Running => format!("running, {} lines", self.stream.transcript().len()),
            DeployState::Finished { success: true, .. } => "finished".to_string(),
            DeployState::Finished {
                success: false,
                code: Some(code),
            } => format!("failed (exit code {code})"),
            DeployState::Finished { .. } => "failed".to_string(),
        };
        let value = format!("{state} | {}", self.stream.path().display());
        let info = self.active_pane().percent_label();
        self.status.set(value, info, cfg.version_tag());
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let page = layout::page_layout(area);
        self.tabs.render(f, page.tabs);
        f.render_widget(Block::default().borders(Borders::ALL), page.body);
        self.active_pane().render(f, layout::pane_inner(page.body));
        self.status.render(f, page.status_bar);
        if self.dialog_visible() {
            self.dialog.render(f, page.body);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::test_config, widgets::buffer_lines};
    use crossterm::event::{KeyCode, KeyModifiers};
    use ratatui::{Terminal, backend::TestBackend};
    use std::fs;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    fn entered(cfg: &DeployConfig) -> DeployPage {
        let mut page = DeployPage::new(cfg.ansible_log_path());
        page.resize(Rect::new(0, 0, 80, 24));
        page.activate(cfg);
        page
    }

    #[test]
    fn test_entry_shows_summary_and_dialog() {
        // Entering opens the summary tab with the primary button active.
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        let page = entered(&cfg);

        assert_eq!(page.state(), DeployState::Confirming);
        assert_eq!(page.active_tab(), SUMMARY_TAB);
        assert_eq!(page.dialog().active(), 0);
        let text = page.summary_pane().rendered_text();
        assert!(text.contains("## Webitel v23.02"));
        assert!(text.contains("localhost (node1)"));
    }

    #[test]
    fn test_cancel_starts_nothing() {
        // Cancel dismisses the dialog, stays on the summary and leaves no transcript.
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        let sc = Shortcuts::default();
        let mut page = entered(&cfg);

        assert_eq!(page.handle_key(&press(KeyCode::Right), &sc, &cfg), PageOutcome::None);
        assert_eq!(page.handle_key(&press(KeyCode::Enter), &sc, &cfg), PageOutcome::None);
        assert_eq!(page.state(), DeployState::Idle);
        assert_eq!(page.active_tab(), SUMMARY_TAB);
        assert!(page.transcript().is_empty());
        assert!(!cfg.ansible_log_path().exists());
    }

    #[test]
    fn test_confirm_requests_start() {
        // Enter on the primary button asks the shell to start the runner.
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        let sc = Shortcuts::default();
        let mut page = entered(&cfg);

        assert_eq!(
            page.handle_key(&press(KeyCode::Enter), &sc, &cfg),
            PageOutcome::StartDeploy
        );
    }

    #[test]
    fn test_dialog_only_listens_on_summary_tab() {
        // On the log tab, Enter does not confirm.
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        let sc = Shortcuts::default();
        let mut page = entered(&cfg);

        page.handle_key(&press(KeyCode::Tab), &sc, &cfg);
        assert_eq!(page.active_tab(), LOG_TAB);
        assert_eq!(page.handle_key(&press(KeyCode::Enter), &sc, &cfg), PageOutcome::None);
        page.handle_key(&press(KeyCode::BackTab), &sc, &cfg);
        assert_eq!(
            page.handle_key(&press(KeyCode::Enter), &sc, &cfg),
            PageOutcome::StartDeploy
        );
    }

    #[test]
    fn test_run_streams_lines_and_finishes() {
        // Lines arrive in order on the log tab and the exit status ends the run.
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        let mut page = entered(&cfg);
        let (tx, rx) = mpsc::unbounded_channel();
        page.begin_run(rx);
        assert!(page.is_running());
        assert_eq!(page.active_tab(), LOG_TAB);

        for line in ["a", "b", "c"] {
            tx.send(RunnerEvent::Line(line.into())).unwrap();
        }
        assert!(page.poll());
        assert!(page.transcript().join("\n").ends_with("a\nb\nc"));
        assert!(page.log_pane().is_at_bottom());

        tx.send(RunnerEvent::Closed).unwrap();
        tx.send(RunnerEvent::Exited(RunOutcome {
            success: false,
            code: Some(2),
        }))
        .unwrap();
        drop(tx);
        page.poll();

        assert_eq!(
            page.state(),
            DeployState::Finished {
                success: false,
                code: Some(2)
            }
        );
        let last = page.transcript().last().cloned().unwrap_or_default();
        assert!(last.starts_with("[wdeploy] deploy failed with exit code 2"));
        assert!(!page.poll());
    }

    #[test]
    fn test_closed_output_waits_for_exit() {
        // End of output alone does not finish the run.
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        let mut page = entered(&cfg);
        let (tx, rx) = mpsc::unbounded_channel();
        page.begin_run(rx);

        tx.send(RunnerEvent::Closed).unwrap();
        assert!(page.poll());
        page.refresh_status(&cfg);
        assert!(page.is_running());
        assert!(page.status().value().starts_with("waiting for exit"));
    }

    #[test]
    fn test_deploy_key_reopens_dialog_only_when_idle() {
        // d does nothing while running and reopens the dialog afterwards.
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        let sc = Shortcuts::default();
        let mut page = entered(&cfg);
        let (tx, rx) = mpsc::unbounded_channel();
        page.begin_run(rx);

        page.handle_key(&press(KeyCode::Char('d')), &sc, &cfg);
        assert!(page.is_running());

        tx.send(RunnerEvent::Exited(RunOutcome {
            success: true,
            code: Some(0),
        }))
        .unwrap();
        page.poll();
        page.handle_key(&press(KeyCode::Char('d')), &sc, &cfg);
        assert_eq!(page.state(), DeployState::Confirming);
        assert_eq!(page.active_tab(), SUMMARY_TAB);
        assert_eq!(page.dialog().active(), 0);
    }

    #[test]
    fn test_reentry_while_running_keeps_live_transcript() {
        // Leaving and re-entering during a run neither reloads nor prompts.
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        let mut page = entered(&cfg);
        let (tx, rx) = mpsc::unbounded_channel();
        page.begin_run(rx);
        tx.send(RunnerEvent::Line("TASK [consul]".into())).unwrap();
        page.poll();

        page.activate(&cfg);
        assert!(page.is_running());
        assert_eq!(page.active_tab(), SUMMARY_TAB);
        assert!(page.transcript().iter().any(|l| l == "TASK [consul]"));
    }

    #[test]
    fn test_reentry_when_idle_reloads_log_file() {
        // The previous run's log file is shown on entry.
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        fs::write(cfg.ansible_log_path(), "PLAY RECAP\nnode1 : ok=3\n").unwrap();
        let page = entered(&cfg);
        assert_eq!(page.transcript(), ["PLAY RECAP", "node1 : ok=3"]);
        assert!(page.log_pane().rendered_text().contains("PLAY RECAP"));
    }

    #[test]
    fn test_reentry_after_run_keeps_result_line() {
        // The finished note survives leaving and re-entering the page.
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        let mut page = entered(&cfg);
        let (tx, rx) = mpsc::unbounded_channel();
        page.begin_run(rx);
        tx.send(RunnerEvent::Line("PLAY RECAP".into())).unwrap();
        tx.send(RunnerEvent::Exited(RunOutcome {
            success: true,
            code: Some(0),
        }))
        .unwrap();
        page.poll();
        fs::write(cfg.ansible_log_path(), "PLAY RECAP\n").unwrap();

        page.activate(&cfg);
        assert_eq!(page.state(), DeployState::Confirming);
        let last = page.transcript().last().cloned().unwrap_or_default();
        assert!(last.starts_with("[wdeploy] deploy finished successfully"));
        assert!(page.log_pane().is_at_bottom());
        assert_eq!(page.log_pane().line_count(), page.transcript().len());
    }

    #[test]
    fn test_start_failure_is_reported() {
        // A spawn error ends up in the log as a failed run.
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        let mut page = entered(&cfg);
        page.start_failed("No such file or directory");

        assert_eq!(
            page.state(),
            DeployState::Finished {
                success: false,
                code: None
            }
        );
        assert_eq!(page.active_tab(), LOG_TAB);
        assert!(page.transcript()[0].contains("No such file or directory"));
    }

    #[test]
    fn test_render_overlays_dialog_on_summary() {
        // The confirmation prompt is drawn over the summary tab.
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(dir.path());
        let page = entered(&cfg);
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| page.render(f, f.area())).unwrap();

        let screen = buffer_lines(terminal.backend().buffer()).join("\n");
        assert!(screen.contains(PROMPT));
        assert!(screen.contains("[ Deploy ]"));
        assert!(screen.contains("Summary"));
    }
}
