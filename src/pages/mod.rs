//! The four top-level pages. The shell owns one of each for the whole session.

pub mod config_page;
pub mod deploy;
pub mod selection;

pub use config_page::ConfigPage;
pub use deploy::{DeployPage, DeployState};
pub use selection::SelectionPage;

use crossterm::event::KeyEvent;

use crate::{
    shortcuts::{PageShortcuts, matches_shortcut},
    widgets::ContentPane,
};

/// Apply a scrolling key to `pane`. Returns false for keys that do not scroll.
pub(crate) fn scroll_pane(pane: &mut ContentPane, key: &KeyEvent, sc: &PageShortcuts) -> bool {
    if matches_shortcut(key, &sc.up) {
        pane.scroll_up(1);
    } else if matches_shortcut(key, &sc.down) {
        pane.scroll_down(1);
    } else if matches_shortcut(key, &sc.page_up) {
        pane.page_up();
    } else if matches_shortcut(key, &sc.page_down) {
        pane.page_down();
    } else if matches_shortcut(key, &sc.half_page_up) {
        pane.half_page_up();
    } else if matches_shortcut(key, &sc.half_page_down) {
        pane.half_page_down();
    } else if matches_shortcut(key, &sc.top) {
        pane.scroll_to_top();
    } else if matches_shortcut(key, &sc.bottom) {
        pane.scroll_to_bottom();
    } else {
        return false;
    }
    true
}
