//! External editor launched on a configuration file.

use std::{
    io,
    path::Path,
    process::{ExitStatus, Stdio},
};
use thiserror::Error;
use tokio::process::Command;

pub const DEFAULT_EDITOR: &str = "nano";

#[derive(Debug, Error)]
#[error("failed to launch editor {program}: {source}")]
pub struct EditorError {
    pub program: String,
    #[source]
    pub source: io::Error,
}

/// Program and leading arguments, e.g. `code --wait`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl EditorCommand {
    /// Split an `$EDITOR` style value on whitespace. Blank or missing values
    /// fall back to [`DEFAULT_EDITOR`].
    pub fn parse(value: Option<&str>) -> Self {
        let mut parts = value.unwrap_or_default().split_whitespace();
        match parts.next() {
            Some(program) => Self {
                program: program.to_string(),
                args: parts.map(str::to_string).collect(),
            },
            None => Self {
                program: DEFAULT_EDITOR.to_string(),
                args: Vec::new(),
            },
        }
    }

    pub fn from_env() -> Self {
        Self::parse(std::env::var("EDITOR").ok().as_deref())
    }

    /// Run the editor on `path` with the inherited terminal and wait for it.
    pub async fn open(&self, path: &Path) -> Result<ExitStatus, EditorError> {
        tracing::info!(editor = %self.program, path = %path.display(), "launching editor");
        Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| EditorError {
                program: self.program.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_arguments() {
        // Extra words become arguments placed before the file.
        let cmd = EditorCommand::parse(Some("  code --wait  "));
        assert_eq!(cmd.program, "code");
        assert_eq!(cmd.args, vec!["--wait"]);
    }

    #[test]
    fn test_parse_defaults_to_nano() {
        // Unset and blank both mean nano.
        assert_eq!(EditorCommand::parse(None).program, "nano");
        assert_eq!(EditorCommand::parse(Some("   ")).program, "nano");
    }

    #[tokio::test]
    async fn test_open_missing_editor_fails() {
        // A program that does not exist is a launch error naming it.
        let dir = tempfile::tempdir().unwrap();
        let cmd = EditorCommand::parse(Some("wdeploy-no-such-editor"));
        let err = cmd.open(&dir.path().join("vars.yml")).await.unwrap_err();
        assert_eq!(err.program, "wdeploy-no-such-editor");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_open_reports_exit_status() {
        // The editor's exit status is handed back.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vars.yml");
        let ok = EditorCommand::parse(Some("true")).open(&path).await.unwrap();
        assert!(ok.success());
        let failed = EditorCommand::parse(Some("false")).open(&path).await.unwrap();
        assert!(!failed.success());
    }
}
