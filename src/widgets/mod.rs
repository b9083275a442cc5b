//! Reusable building blocks the pages are composed of.

pub mod dialog;
pub mod input;
pub mod pane;
pub mod statusbar;
pub mod tabs;

pub use dialog::{Dialog, DialogEvent};
pub use input::{InputEvent, TextInput};
pub use pane::{ContentPane, Syntax};
pub use statusbar::StatusBar;
pub use tabs::TabStrip;

/// Rows of a rendered test buffer as plain strings.
#[cfg(test)]
pub(crate) fn buffer_lines(buf: &ratatui::buffer::Buffer) -> Vec<String> {
    let area = buf.area;
    (area.top()..area.bottom())
        .map(|y| {
            (area.left()..area.right())
                .map(|x| buf[(x, y)].symbol())
                .collect::<String>()
        })
        .collect()
}
