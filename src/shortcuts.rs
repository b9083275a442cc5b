//! Key binding table, overridable from a TOML file.

use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// All key bindings, grouped by where they apply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Shortcuts {
    pub global: GlobalShortcuts,
    pub page: PageShortcuts,
    pub dialog: DialogShortcuts,
    pub selection: SelectionShortcuts,
    pub filter: FilterShortcuts,
}

/// Bindings handled by the application shell on every page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalShortcuts {
    pub quit: Vec<String>,
    pub help: Vec<String>,
    pub back: Vec<String>,
}

/// Bindings of pages built from tabs and content panes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageShortcuts {
    pub next_tab: Vec<String>,
    pub prev_tab: Vec<String>,
    pub edit: Vec<String>,
    pub line_numbers: Vec<String>,
    pub deploy: Vec<String>,
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub page_up: Vec<String>,
    pub page_down: Vec<String>,
    pub half_page_up: Vec<String>,
    pub half_page_down: Vec<String>,
    pub top: Vec<String>,
    pub bottom: Vec<String>,
}

/// Confirmation dialog bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogShortcuts {
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub select: Vec<String>,
}

/// Action list bindings on the selection page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionShortcuts {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub select: Vec<String>,
    pub filter: Vec<String>,
}

/// Bindings while the filter box has focus. Unbound printable keys are typed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterShortcuts {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub backspace: Vec<String>,
    pub delete: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub home: Vec<String>,
    pub end: Vec<String>,
    pub clear_line: Vec<String>,
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for GlobalShortcuts {
    fn default() -> Self {
        Self {
            quit: keys(&["q"]),
            help: keys(&["?"]),
            back: keys(&["Esc"]),
        }
    }
}

impl Default for PageShortcuts {
    fn default() -> Self {
        Self {
            next_tab: keys(&["Tab"]),
            prev_tab: keys(&["BackTab"]),
            edit: keys(&["e", "Enter"]),
            line_numbers: keys(&["l"]),
            deploy: keys(&["d"]),
            up: keys(&["Up", "k"]),
            down: keys(&["Down", "j"]),
            page_up: keys(&["PageUp", "b"]),
            page_down: keys(&["PageDown", "f"]),
            half_page_up: keys(&["u"]),
            half_page_down: keys(&["Ctrl+d"]),
            top: keys(&["Home", "g"]),
            bottom: keys(&["End", "G"]),
        }
    }
}

impl Default for DialogShortcuts {
    fn default() -> Self {
        Self {
            left: keys(&["Left", "h"]),
            right: keys(&["Right", "l"]),
            select: keys(&["Enter"]),
        }
    }
}

impl Default for SelectionShortcuts {
    fn default() -> Self {
        Self {
            up: keys(&["Up", "k"]),
            down: keys(&["Down", "j"]),
            select: keys(&["Enter"]),
            filter: keys(&["/"]),
        }
    }
}

impl Default for FilterShortcuts {
    fn default() -> Self {
        Self {
            confirm: keys(&["Enter"]),
            cancel: keys(&["Esc"]),
            backspace: keys(&["Backspace"]),
            delete: keys(&["Delete"]),
            left: keys(&["Left"]),
            right: keys(&["Right"]),
            home: keys(&["Home"]),
            end: keys(&["End"]),
            clear_line: keys(&["Ctrl+u"]),
        }
    }
}

impl Shortcuts {
    /// Read overrides from `path`; a missing file yields the defaults.
    /// Sections or keys absent from the file keep their default bindings.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let shortcuts = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        tracing::info!("key bindings loaded from {}", path.display());
        Ok(shortcuts)
    }
}

/// True when `key` matches any binding in `bindings`.
pub fn matches_shortcut(key: &KeyEvent, bindings: &[String]) -> bool {
    bindings.iter().any(|b| matches_binding(key, b))
}

/// Display form of a binding list, e.g. `Up/k`.
pub fn format_keys(bindings: &[String]) -> String {
    bindings.join("/")
}

/// Compare one binding such as `Ctrl+u`, `Enter` or `G` against a key event.
fn matches_binding(key: &KeyEvent, binding: &str) -> bool {
    // A lone "+" is a key, not a separator.
    let (modifier_names, key_name) = match binding.rsplit_once('+') {
        Some((mods, name)) if !name.is_empty() => (mods.split('+').collect::<Vec<_>>(), name),
        _ => (vec![], binding),
    };

    let mut expected = KeyModifiers::empty();
    for name in modifier_names {
        expected |= match name.to_ascii_lowercase().as_str() {
            "ctrl" => KeyModifiers::CONTROL,
            "alt" => KeyModifiers::ALT,
            "shift" => KeyModifiers::SHIFT,
            _ => return false,
        };
    }

    let code = match key_name.to_ascii_lowercase().as_str() {
        "enter" => KeyCode::Enter,
        "esc" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "backspace" => KeyCode::Backspace,
        "delete" => KeyCode::Delete,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        _ => {
            let mut chars = key_name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return false,
            }
        }
    };
    if key.code != code {
        return false;
    }

    // Terminals report SHIFT for upper-case letters, symbols and BackTab;
    // the character itself already encodes it.
    let mut actual = key.modifiers;
    if matches!(code, KeyCode::Char(_) | KeyCode::BackTab) {
        actual.remove(KeyModifiers::SHIFT);
        expected.remove(KeyModifiers::SHIFT);
    }
    actual == expected
}
