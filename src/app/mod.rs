//! Application shell: page routing, event loop and background polling.

mod handlers;
mod render;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::layout::Rect;
use std::{path::Path, process::ExitStatus, time::Duration};

use crate::{
    config::{ConfigKind, DeployConfig},
    editor::{EditorCommand, EditorError},
    events::{PageId, ShellCommand, ShellState},
    layout,
    pages::{ConfigPage, DeployPage, SelectionPage},
    runner::{self, PlaybookCommand},
    shortcuts::Shortcuts,
    ui::{self, Tui},
};

use render::draw;

/// Rows of the footer while the full legend is shown.
pub const FULL_HELP_ROWS: u16 = 4;

/// Input poll timeout; also the cadence at which runner output is drained.
const TICK: Duration = Duration::from_millis(50);

pub struct App {
    pub cfg: DeployConfig,
    pub shortcuts: Shortcuts,
    pub editor: EditorCommand,
    pub state: ShellState,
    pub active: PageId,
    pub selection: SelectionPage,
    pub vars: ConfigPage,
    pub hosts: ConfigPage,
    pub deploy: DeployPage,
    pub show_full_help: bool,
    area: Rect,
}

impl App {
    pub fn new(cfg: DeployConfig, shortcuts: Shortcuts, editor: EditorCommand) -> Self {
        let deploy = DeployPage::new(cfg.ansible_log_path());
        Self {
            cfg,
            shortcuts,
            editor,
            state: ShellState::Start,
            active: PageId::Selection,
            selection: SelectionPage::new(),
            vars: ConfigPage::new(ConfigKind::Vars),
            hosts: ConfigPage::new(ConfigKind::Hosts),
            deploy,
            show_full_help: false,
            area: Rect::default(),
        }
    }

    pub fn footer_height(&self) -> u16 {
        if self.show_full_help { FULL_HELP_ROWS } else { 1 }
    }

    /// Size every page for `area`. The first call finishes start-up.
    pub fn resize(&mut self, area: Rect) {
        self.area = area;
        let body = layout::shell_layout(area, self.footer_height()).body;
        self.vars.resize(body);
        self.hosts.resize(body);
        self.deploy.resize(body);
        if self.state == ShellState::Start {
            tracing::info!(width = area.width, height = area.height, "pages sized");
            self.state = ShellState::Loaded;
        }
        self.refresh_status();
    }

    /// Whether the selection list owns the keyboard for text input.
    pub fn is_filtering(&self) -> bool {
        self.active == PageId::Selection && self.selection.is_filtering()
    }

    /// Switch pages and run the target's entry logic.
    pub fn open_page(&mut self, id: PageId) -> Result<()> {
        tracing::debug!(page = ?id, "open page");
        self.active = id;
        match id {
            PageId::Selection => {}
            PageId::Vars => self.vars.reload(&mut self.cfg)?,
            PageId::Hosts => self.hosts.reload(&mut self.cfg)?,
            PageId::Deploy => self.deploy.activate(&self.cfg),
        }
        self.refresh_status();
        Ok(())
    }

    /// Apply a key press. Errors move the shell into the error state.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<ShellCommand> {
        match handlers::handle_key(self, key) {
            Ok(command) => command,
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    /// Show `err` in the error panel until dismissed.
    pub fn fail(&mut self, err: anyhow::Error) {
        tracing::error!("{err:#}");
        self.state = ShellState::Error(format!("{err:#}"));
    }

    /// Pick up runner output produced since the last frame.
    pub fn poll_background(&mut self) {
        if self.deploy.poll() {
            self.deploy.refresh_status(&self.cfg);
        }
    }

    /// Spawn the playbook and hand its output channel to the deploy page.
    pub fn start_deploy(&mut self) {
        if self.deploy.is_running() {
            tracing::warn!("deploy already running");
            return;
        }
        let cmd = PlaybookCommand::from_config(&self.cfg);
        tracing::info!(playbook = %cmd.playbook.display(), "starting deploy");
        match runner::spawn(cmd, self.cfg.ansible_log_path()) {
            Ok(rx) => self.deploy.begin_run(rx),
            Err(err) => {
                tracing::error!("{err}");
                self.deploy.start_failed(&err);
            }
        }
        self.deploy.refresh_status(&self.cfg);
    }

    /// Reload the edited page after the editor returned.
    pub fn finish_edit(&mut self, result: Result<ExitStatus, EditorError>) {
        let (page, cfg) = match self.active {
            PageId::Vars => (&mut self.vars, &mut self.cfg),
            PageId::Hosts => (&mut self.hosts, &mut self.cfg),
            _ => return,
        };
        match result {
            Ok(status) => {
                if !status.success() {
                    tracing::warn!("editor exited with {status}");
                }
                if let Err(err) = page.reload(cfg) {
                    self.fail(err.into());
                }
            }
            Err(err) => {
                tracing::error!("{err}");
                page.set_notice(err.to_string(), cfg);
            }
        }
    }

    fn refresh_status(&mut self) {
        match self.active {
            PageId::Selection => self.selection.refresh_status(&self.cfg.version_tag()),
            PageId::Vars => self.vars.refresh_status(&self.cfg),
            PageId::Hosts => self.hosts.refresh_status(&self.cfg),
            PageId::Deploy => self.deploy.refresh_status(&self.cfg),
        }
    }

    fn toggle_help(&mut self) {
        self.show_full_help = !self.show_full_help;
        self.resize(self.area);
    }
}

/// Run the UI until the user quits.
pub async fn run_app(terminal: &mut Tui, mut app: App) -> Result<()> {
    loop {
        // Draw the current state.
        terminal.draw(|f| draw(f, &app))?;

        // The splash stays up until every page knows its size.
        if app.state == ShellState::Start {
            let size = terminal.size()?;
            app.resize(Rect::new(0, 0, size.width, size.height));
            continue;
        }

        // Take in runner output before handling input.
        app.poll_background();

        // Short timeout so output keeps flowing without key presses.
        if event::poll(TICK)? {
            match event::read()? {
                Event::Key(k) if k.kind == KeyEventKind::Press => match app.handle_key(k) {
                    Some(ShellCommand::Quit) => break,
                    Some(ShellCommand::Edit(path)) => edit(terminal, &mut app, &path).await?,
                    None => {}
                },
                Event::Resize(width, height) => app.resize(Rect::new(0, 0, width, height)),
                _ => {}
            }
        }
    }
    // The run is not cancelled; it loses its reader once we exit.
    if app.deploy.is_running() {
        tracing::warn!("exiting while the playbook is still running");
    }
    Ok(())
}

async fn edit(terminal: &mut Tui, app: &mut App, path: &Path) -> Result<()> {
    ui::suspend(terminal)?;
    let result = app.editor.open(path).await;
    ui::resume(terminal)?;
    app.finish_edit(result);
    Ok(())
}
