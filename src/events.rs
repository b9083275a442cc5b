//! Shell-level state and the requests pages send to the shell.

use std::path::PathBuf;

/// Top-level screens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageId {
    Selection,
    Vars,
    Hosts,
    Deploy,
}

impl PageId {
    /// Page opened by a selection list action.
    pub fn from_action_id(id: &str) -> Option<Self> {
        match id {
            "vars" => Some(PageId::Vars),
            "hosts" => Some(PageId::Hosts),
            "deploy" => Some(PageId::Deploy),
            _ => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PageId::Selection => "Select action",
            PageId::Vars => "Variables",
            PageId::Hosts => "Hosts",
            PageId::Deploy => "Deploy",
        }
    }
}

/// Lifecycle of the application shell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShellState {
    /// Splash until the pages know their size.
    Start,
    Loaded,
    /// Dismissible error panel over the last page.
    Error(String),
}

/// What a page asks the shell to do after handling a key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageOutcome {
    None,
    /// Action chosen on the selection list.
    Selected(&'static str),
    /// Open the file in the external editor.
    Edit(PathBuf),
    /// The deploy was confirmed.
    StartDeploy,
}

/// Work the event loop has to do outside of the app state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShellCommand {
    Quit,
    Edit(PathBuf),
}
