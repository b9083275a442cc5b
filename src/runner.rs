//! Background execution of the provisioning tool.
//!
//! stdout and stderr of `ansible-playbook` share one pipe, so the reader sees
//! output in the order the process wrote it. A reader thread splits the pipe
//! into lines, tees them into the log file and forwards them over a channel.

use std::{
    collections::BTreeMap,
    ffi::OsString,
    fmt,
    fs::{self, File},
    io::{self, BufReader, Read, Write},
    path::{Path, PathBuf},
    process::Stdio,
    thread,
    time::Duration,
};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::{
    process::Command,
    sync::{mpsc, oneshot},
};

use crate::{config::DeployConfig, tail::LineReader};

/// How long to wait for the reader after the process exited. Helpers that
/// inherited the pipe (ssh control masters) may keep it open indefinitely.
const READER_GRACE: Duration = Duration::from_secs(2);

/// Stands in for the private vars file when a command is logged.
const PRIVATE_VARS_LABEL: &str = "<private vars>";

/// Events delivered to the UI, in production order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunnerEvent {
    /// One complete output line.
    Line(String),
    /// Reading the pipe failed; no more lines follow.
    ReadError(String),
    /// End of output.
    Closed,
    /// The process terminated.
    Exited(RunOutcome),
}

/// Exit status of a provisioning run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    pub success: bool,
    /// `None` when killed by a signal or when waiting failed.
    pub code: Option<i32>,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to write private vars file: {0}")]
    PrivateVars(#[source] io::Error),

    #[error("failed to create output pipe: {0}")]
    Pipe(#[source] io::Error),

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to start output reader: {0}")]
    Reader(#[source] io::Error),
}

/// Extra vars that must stay out of argv and out of the logs.
///
/// They reach the playbook through a temporary YAML file readable only by
/// the current user. `Debug` prints the keys only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PrivateVars(BTreeMap<String, String>);

impl PrivateVars {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Write the vars to a fresh temporary file. The file is removed when
    /// the handle is dropped.
    fn write_temp(&self) -> io::Result<NamedTempFile> {
        let yaml = serde_yaml::to_string(&self.0).map_err(io::Error::other)?;
        let mut file = tempfile::Builder::new()
            .prefix("wdeploy-vars-")
            .suffix(".yml")
            .tempfile()?;
        file.write_all(yaml.as_bytes())?;
        file.flush()?;
        Ok(file)
    }
}

impl fmt::Debug for PrivateVars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// Command line of one playbook run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybookCommand {
    pub program: String,
    pub playbook: PathBuf,
    pub inventory: PathBuf,
    pub vars: PathBuf,
    pub ssh_common_args: Option<String>,
    pub private_vars: PrivateVars,
}

impl PlaybookCommand {
    pub fn from_config(cfg: &DeployConfig) -> Self {
        let mut private_vars = PrivateVars::default();
        // Credentials given only on the command line still reach the playbook.
        if cfg.vars.webitel_repository_user.is_empty() {
            private_vars.insert("webitel_repository_user", cfg.repository_user());
        }
        if cfg.vars.webitel_repository_password.is_empty() {
            private_vars.insert("webitel_repository_password", cfg.repository_password());
        }
        let ssh = cfg.vars.ansible_ssh_extra_args.trim();
        Self {
            program: cfg.settings.ansible_playbook.clone(),
            playbook: cfg.settings.playbook.clone(),
            inventory: cfg.hosts_path.clone(),
            vars: cfg.vars_path.clone(),
            ssh_common_args: (!ssh.is_empty()).then(|| ssh.to_string()),
            private_vars,
        }
    }

    /// Arguments after the program name. `private_file` is where
    /// [`PrivateVars`] were written, if there are any.
    pub fn args(&self, private_file: Option<&Path>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-i".into(), self.inventory.clone().into()];
        let files = std::iter::once(self.vars.as_path()).chain(private_file);
        for file in files {
            let mut arg = OsString::from("@");
            arg.push(file);
            args.push("--extra-vars".into());
            args.push(arg);
        }
        if let Some(ssh) = &self.ssh_common_args {
            args.push("--ssh-common-args".into());
            args.push(ssh.into());
        }
        args.push(self.playbook.clone().into());
        args
    }
}

/// Command line as logged; private vars appear only as a placeholder.
impl fmt::Display for PlaybookCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let private = (!self.private_vars.is_empty()).then(|| Path::new(PRIVATE_VARS_LABEL));
        f.write_str(&self.program)?;
        for arg in self.args(private) {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Start the playbook and return the channel its output arrives on.
///
/// Must be called from within the tokio runtime. The log file is truncated
/// at start so it always holds the latest run. The channel is unbounded:
/// the child never waits for the UI to catch up.
pub fn spawn(
    cmd: PlaybookCommand,
    log_path: PathBuf,
) -> Result<mpsc::UnboundedReceiver<RunnerEvent>, RunnerError> {
    // Lives until the process exits; dropping it deletes the file.
    let private_file = if cmd.private_vars.is_empty() {
        None
    } else {
        Some(cmd.private_vars.write_temp().map_err(RunnerError::PrivateVars)?)
    };

    let (pipe_rx, pipe_tx) = io::pipe().map_err(RunnerError::Pipe)?;
    let pipe_tx_err = pipe_tx.try_clone().map_err(RunnerError::Pipe)?;

    let mut command = Command::new(&cmd.program);
    command
        .args(cmd.args(private_file.as_ref().map(NamedTempFile::path)))
        .env("ANSIBLE_FORCE_COLOR", "false")
        .env("ANSIBLE_STDOUT_CALLBACK", "unixy")
        .stdin(Stdio::null())
        .stdout(pipe_tx)
        .stderr(pipe_tx_err);
    tracing::info!(command = %cmd, "starting playbook");

    let mut child = command.spawn().map_err(|source| RunnerError::Spawn {
        program: cmd.program.clone(),
        source,
    })?;
    // The child holds the write ends now; ours must go for EOF to arrive.
    drop(command);

    let log = open_log(&log_path);
    let (tx, rx) = mpsc::unbounded_channel();
    let (done_tx, done_rx) = oneshot::channel();
    let reader_tx = tx.clone();
    // A detached thread, not the blocking pool: runtime shutdown waits for
    // blocking tasks, and this one may sit on the pipe for minutes.
    let reader = thread::Builder::new()
        .name("playbook-output".into())
        .spawn(move || {
            pump_lines(pipe_rx, log, reader_tx);
            let _ = done_tx.send(());
        });
    if let Err(e) = reader {
        if let Err(kill) = child.start_kill() {
            tracing::warn!("failed to stop playbook: {kill}");
        }
        return Err(RunnerError::Reader(e));
    }

    tokio::spawn(async move {
        let outcome = match child.wait().await {
            Ok(status) => RunOutcome {
                success: status.success(),
                code: status.code(),
            },
            Err(e) => {
                tracing::error!("waiting for playbook failed: {e}");
                RunOutcome {
                    success: false,
                    code: None,
                }
            }
        };
        tracing::info!(?outcome, "playbook exited");
        drop(private_file);

        // Give the reader a moment to flush the tail of the output.
        if tokio::time::timeout(READER_GRACE, done_rx).await.is_err() {
            tracing::warn!("output pipe still open after exit; not waiting for more output");
        }
        let _ = tx.send(RunnerEvent::Exited(outcome));
    });

    Ok(rx)
}

fn open_log(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = fs::create_dir_all(parent)
    {
        tracing::warn!("cannot create log directory {}: {e}", parent.display());
        return None;
    }
    match File::create(path) {
        Ok(f) => Some(f),
        Err(e) => {
            tracing::warn!("cannot open {}: {e}", path.display());
            None
        }
    }
}

/// Read `source` to the end, forwarding each line. Runs on the reader thread.
///
/// The pipe is drained to the end even after the receiver is gone, so the
/// child never blocks on a full pipe and the log file stays complete.
fn pump_lines<R: Read>(
    source: R,
    mut log: Option<File>,
    tx: mpsc::UnboundedSender<RunnerEvent>,
) {
    let mut lines = LineReader::new(BufReader::new(source));
    let mut forward = true;
    let mut send = |event: RunnerEvent| {
        if forward && tx.send(event).is_err() {
            tracing::debug!("output receiver gone; still writing the log");
            forward = false;
        }
    };
    loop {
        match lines.next_line() {
            Ok(Some(line)) => {
                // Log file first; a failed write disables the tee, not the run.
                let write_err = log.as_mut().and_then(|f| writeln!(f, "{line}").err());
                if let Some(e) = write_err {
                    tracing::warn!("writing provisioning log failed: {e}");
                    log = None;
                }
                tracing::debug!(target: "playbook", "{line}");
                send(RunnerEvent::Line(line));
            }
            Ok(None) => {
                send(RunnerEvent::Closed);
                return;
            }
            Err(e) => {
                tracing::error!("reading playbook output failed: {e}");
                send(RunnerEvent::ReadError(e.to_string()));
                send(RunnerEvent::Closed);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogSettings, Settings};
    use std::time::Instant;

    fn sample_command() -> PlaybookCommand {
        PlaybookCommand {
            program: "ansible-playbook".into(),
            playbook: "playbook.yml".into(),
            inventory: "/tmp/hosts.yml".into(),
            vars: "/tmp/vars.yml".into(),
            ssh_common_args: Some("-o StrictHostKeyChecking=no".into()),
            private_vars: PrivateVars::default(),
        }
    }

    fn as_strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Yields `data` once, then fails.
    struct Broken {
        data: Option<&'static [u8]>,
    }

    impl Read for Broken {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.take() {
                Some(data) => {
                    buf[..data.len()].copy_from_slice(data);
                    Ok(data.len())
                }
                None => Err(io::Error::other("pipe broke")),
            }
        }
    }

    fn collect(rx: &mut mpsc::UnboundedReceiver<RunnerEvent>) -> Vec<RunnerEvent> {
        let mut events = vec![];
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    #[cfg(unix)]
    fn fake_playbook(dir: &Path, script: &str) -> PlaybookCommand {
        use std::os::unix::fs::PermissionsExt;

        let fake = dir.join("fake-playbook");
        fs::write(&fake, script).unwrap();
        fs::set_permissions(&fake, fs::Permissions::from_mode(0o755)).unwrap();
        let mut cmd = sample_command();
        cmd.program = fake.to_string_lossy().into_owned();
        cmd
    }

    #[test]
    fn test_playbook_args() {
        // Inventory, vars files and ssh args precede the playbook.
        assert_eq!(
            as_strings(sample_command().args(Some(Path::new("/tmp/private.yml")))),
            vec![
                "-i",
                "/tmp/hosts.yml",
                "--extra-vars",
                "@/tmp/vars.yml",
                "--extra-vars",
                "@/tmp/private.yml",
                "--ssh-common-args",
                "-o StrictHostKeyChecking=no",
                "playbook.yml",
            ]
        );
        assert_eq!(as_strings(sample_command().args(None)).len(), 7);
    }

    #[test]
    fn test_cli_credentials_stay_out_of_argv_and_logs() {
        // Credentials missing from the vars file travel as private vars only.
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("vars.yml"), "webitel_version: \"23.02\"\n").unwrap();
        let settings = Settings {
            vars_file: Some(dir.path().join("vars.yml")),
            hosts_file: Some(dir.path().join("hosts.yml")),
            repository_user: "alice".into(),
            repository_password: "TopSecret123".into(),
            log: LogSettings {
                directory: dir.path().to_path_buf(),
                ..Settings::default().log
            },
            ..Settings::default()
        };
        let cfg = DeployConfig::load(settings).unwrap();
        let cmd = PlaybookCommand::from_config(&cfg);

        assert_eq!(cmd.inventory, dir.path().join("hosts.yml"));
        assert_eq!(cmd.ssh_common_args, None);
        assert_eq!(cmd.private_vars.get("webitel_repository_user"), Some("alice"));
        assert_eq!(
            cmd.private_vars.get("webitel_repository_password"),
            Some("TopSecret123")
        );

        let argv = as_strings(cmd.args(Some(Path::new("/tmp/x.yml")))).join(" ");
        let shown = cmd.to_string();
        let debug = format!("{cmd:?}");
        for text in [&argv, &shown, &debug] {
            assert!(!text.contains("TopSecret123"), "{text}");
        }
        assert!(shown.contains(PRIVATE_VARS_LABEL));
    }

    #[test]
    fn test_private_vars_file_holds_values() {
        // The temporary file is YAML the playbook can load, readable only by us.
        let mut vars = PrivateVars::default();
        vars.insert("webitel_repository_password", "s3cret: with colon");
        let file = vars.write_temp().unwrap();

        let text = fs::read_to_string(file.path()).unwrap();
        let parsed: BTreeMap<String, String> = serde_yaml::from_str(&text).unwrap();
        assert_eq!(parsed["webitel_repository_password"], "s3cret: with colon");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(file.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn test_pump_lines_forwards_and_tees() {
        // Every line reaches both the channel and the log file, then Closed.
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("ansible.log");
        let log = File::create(&log_path).ok();
        let (tx, mut rx) = mpsc::unbounded_channel();

        pump_lines(&b"a\nb\nc\n"[..], log, tx);

        assert_eq!(
            collect(&mut rx),
            vec![
                RunnerEvent::Line("a".into()),
                RunnerEvent::Line("b".into()),
                RunnerEvent::Line("c".into()),
                RunnerEvent::Closed,
            ]
        );
        assert_eq!(fs::read_to_string(&log_path).unwrap(), "a\nb\nc\n");
    }

    #[test]
    fn test_pump_lines_reports_read_error() {
        // A failing pipe yields the lines read so far, the error, then Closed.
        let (tx, mut rx) = mpsc::unbounded_channel();

        pump_lines(Broken { data: Some(b"ok: [node1]\n") }, None, tx);

        assert_eq!(
            collect(&mut rx),
            vec![
                RunnerEvent::Line("ok: [node1]".into()),
                RunnerEvent::ReadError("pipe broke".into()),
                RunnerEvent::Closed,
            ]
        );
    }

    #[test]
    fn test_pump_lines_keeps_logging_without_receiver() {
        // With nobody listening, the pipe is still read to the end into the log.
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("ansible.log");
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        pump_lines(&b"one\ntwo\n"[..], File::create(&log_path).ok(), tx);
        assert_eq!(fs::read_to_string(&log_path).unwrap(), "one\ntwo\n");
    }

    #[tokio::test]
    async fn test_spawn_missing_program_fails() {
        // A program that cannot be started is reported, not panicked on.
        let dir = tempfile::tempdir().unwrap();
        let mut cmd = sample_command();
        cmd.program = "wdeploy-no-such-program".into();

        let err = spawn(cmd, dir.path().join("ansible.log")).unwrap_err();
        assert!(matches!(err, RunnerError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_streams_merged_output() {
        // stdout and stderr arrive on one stream, followed by the exit status.
        let dir = tempfile::tempdir().unwrap();
        let cmd = fake_playbook(
            dir.path(),
            "#!/bin/sh\necho one\necho two 1>&2\necho three\nexit 3\n",
        );
        let log_path = dir.path().join("logs").join("ansible.log");

        let mut rx = spawn(cmd, log_path.clone()).unwrap();
        let mut lines = vec![];
        let mut outcome = None;
        while let Some(ev) = rx.recv().await {
            match ev {
                RunnerEvent::Line(l) => lines.push(l),
                RunnerEvent::Exited(o) => outcome = Some(o),
                _ => {}
            }
        }
        assert_eq!(lines, vec!["one", "two", "three"]);
        assert_eq!(
            outcome,
            Some(RunOutcome {
                success: false,
                code: Some(3)
            })
        );
        assert_eq!(fs::read_to_string(&log_path).unwrap(), "one\ntwo\nthree\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_passes_private_vars_file() {
        // The playbook sees a readable private vars file that is gone after exit.
        let dir = tempfile::tempdir().unwrap();
        let mut cmd = fake_playbook(
            dir.path(),
            "#!/bin/sh\nfor a in \"$@\"; do case \"$a\" in @*wdeploy-vars-*) f=\"${a#@}\"; echo \"$f\"; cat \"$f\";; esac; done\n",
        );
        cmd.private_vars.insert("webitel_repository_password", "pw");

        let mut rx = spawn(cmd, dir.path().join("ansible.log")).unwrap();
        let mut lines = vec![];
        while let Some(ev) = rx.recv().await {
            if let RunnerEvent::Line(l) = ev {
                lines.push(l);
            }
        }
        assert!(lines.iter().any(|l| l.contains("webitel_repository_password: pw")));
        assert!(!Path::new(&lines[0]).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_undrained_output_does_not_stall_child() {
        // The child runs to completion while nobody reads the channel.
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("done");
        let cmd = fake_playbook(
            dir.path(),
            &format!(
                "#!/bin/sh\ni=0\nwhile [ $i -lt 20000 ]; do echo \"line $i\"; i=$((i+1)); done\ntouch '{}'\n",
                marker.display()
            ),
        );

        let mut rx = spawn(cmd, dir.path().join("ansible.log")).unwrap();
        let deadline = Instant::now() + Duration::from_secs(20);
        while !marker.exists() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(marker.exists());

        let mut count = 0;
        while let Some(ev) = rx.recv().await {
            if matches!(ev, RunnerEvent::Line(_)) {
                count += 1;
            }
        }
        assert_eq!(count, 20000);
    }

    #[cfg(unix)]
    #[test]
    fn test_runtime_shutdown_does_not_wait_for_reader() {
        // Quitting mid-run returns promptly even while the child is silent.
        let dir = tempfile::tempdir().unwrap();
        let cmd = fake_playbook(dir.path(), "#!/bin/sh\necho start\nsleep 5\necho late\n");
        let log_path = dir.path().join("ansible.log");

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let rx = runtime.block_on(async { spawn(cmd, log_path).unwrap() });
        thread::sleep(Duration::from_millis(300));
        drop(rx);

        let started = Instant::now();
        drop(runtime);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
