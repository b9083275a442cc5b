//! Key routing: shell-wide bindings first, then the active page.

use anyhow::{Result, anyhow};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::{
    events::{PageId, PageOutcome, ShellCommand, ShellState},
    shortcuts::matches_shortcut,
};

use super::App;

/// Handle one key press; `Some` asks the event loop for follow-up work.
pub fn handle_key(app: &mut App, k: KeyEvent) -> Result<Option<ShellCommand>> {
    // Quits from every state, including text input.
    if is_ctrl_c(&k) {
        return Ok(Some(ShellCommand::Quit));
    }

    let global = &app.shortcuts.global;
    let (quit, help, back) = (
        matches_shortcut(&k, &global.quit),
        matches_shortcut(&k, &global.help),
        matches_shortcut(&k, &global.back),
    );

    match app.state {
        ShellState::Start => return Ok(None),
        ShellState::Error(_) => {
            if back {
                app.state = ShellState::Loaded;
            } else if quit {
                return Ok(Some(ShellCommand::Quit));
            }
            return Ok(None);
        }
        ShellState::Loaded => {}
    }

    // The filter input gets every key, q and ? included.
    if app.is_filtering() {
        let outcome = app.selection.handle_key(&k, &app.shortcuts);
        let command = apply_outcome(app, outcome)?;
        app.refresh_status();
        return Ok(command);
    }

    if quit {
        return Ok(Some(ShellCommand::Quit));
    }
    if help {
        app.toggle_help();
        return Ok(None);
    }
    if back && app.active != PageId::Selection {
        app.open_page(PageId::Selection)?;
        return Ok(None);
    }

    let outcome = match app.active {
        PageId::Selection => app.selection.handle_key(&k, &app.shortcuts),
        PageId::Vars => app.vars.handle_key(&k, &app.shortcuts, &app.cfg),
        PageId::Hosts => app.hosts.handle_key(&k, &app.shortcuts, &app.cfg),
        PageId::Deploy => app.deploy.handle_key(&k, &app.shortcuts, &app.cfg),
    };
    let command = apply_outcome(app, outcome)?;
    app.refresh_status();
    Ok(command)
}

/// Ctrl+C, independent of the binding table.
pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

fn apply_outcome(app: &mut App, outcome: PageOutcome) -> Result<Option<ShellCommand>> {
    match outcome {
        PageOutcome::None => Ok(None),
        PageOutcome::Selected(id) => {
            let page = PageId::from_action_id(id).ok_or_else(|| anyhow!("unknown action {id}"))?;
            app.open_page(page)?;
            Ok(None)
        }
        PageOutcome::Edit(path) => Ok(Some(ShellCommand::Edit(path))),
        PageOutcome::StartDeploy => {
            app.start_deploy();
            Ok(None)
        }
    }
}
