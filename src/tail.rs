//! Consumer side of the provisioning output stream.
//!
//! The runner's reader thread turns the merged stdout/stderr pipe into lines
//! with [`LineReader`] and pushes them through a channel. [`LogStream`] owns
//! the receiving end for the lifetime of a run and keeps the transcript.

use std::{
    fs,
    io::{self, BufRead},
    path::{Path, PathBuf},
};
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::runner::{RunOutcome, RunnerEvent};

/// Longest line kept in one piece; longer lines are split.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Upper bound of events applied per UI frame.
const DRAIN_BUDGET: usize = 1024;

/// Splits a byte stream into lines, reassembling lines that arrive across
/// several reads.
pub struct LineReader<R> {
    inner: R,
    max_len: usize,
    /// Start of a character cut off by the previous length split.
    carry: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_max_len(inner, MAX_LINE_BYTES)
    }

    pub fn with_max_len(inner: R, max_len: usize) -> Self {
        Self {
            inner,
            max_len: max_len.max(1),
            carry: Vec::new(),
        }
    }

    /// Next complete line without its terminator, or `None` at end of stream.
    ///
    /// A trailing `\r` is dropped. Invalid UTF-8 is replaced lossily. A
    /// final line without terminator is still returned.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut line = std::mem::take(&mut self.carry);
        let mut split = false;
        loop {
            let chunk = match self.inner.fill_buf() {
                Ok(chunk) => chunk,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if chunk.is_empty() {
                if line.is_empty() {
                    return Ok(None);
                }
                break;
            }

            // A terminator right after a full line still ends that line.
            let room = self.max_len.saturating_sub(line.len());
            let window = &chunk[..chunk.len().min(room + 1)];
            if let Some(pos) = window.iter().position(|b| *b == b'\n') {
                line.extend_from_slice(&window[..pos]);
                self.inner.consume(pos + 1);
                break;
            }
            let taken = window.len().min(room);
            line.extend_from_slice(&window[..taken]);
            self.inner.consume(taken);
            if line.len() >= self.max_len {
                split = true;
                break;
            }
        }

        // Never cut inside a UTF-8 sequence; the remainder opens the next line.
        if split && let Some(start) = partial_char_start(&line) {
            self.carry = line.split_off(start);
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

/// Index of a multi-byte character that `bytes` ends in the middle of.
/// `None` when the tail is complete or the character starts at index 0.
fn partial_char_start(bytes: &[u8]) -> Option<usize> {
    let tail = bytes.len().saturating_sub(4);
    let lead = (tail..bytes.len()).rev().find(|&i| bytes[i] & 0xC0 != 0x80)?;
    let width = match bytes[lead] {
        b if b >= 0xF0 => 4,
        b if b >= 0xE0 => 3,
        b if b >= 0xC0 => 2,
        _ => 1,
    };
    (lead > 0 && lead + width > bytes.len()).then_some(lead)
}

/// What one drain pass produced.
#[derive(Debug, Default)]
pub struct Drained {
    /// New transcript lines in arrival order.
    pub lines: Vec<String>,
    /// Exit status, once the process is gone.
    pub outcome: Option<RunOutcome>,
}

impl Drained {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.outcome.is_none()
    }
}

/// Transcript of the provisioning output plus the channel feeding it.
#[derive(Debug)]
pub struct LogStream {
    rx: Option<mpsc::UnboundedReceiver<RunnerEvent>>,
    path: PathBuf,
    transcript: Vec<String>,
    closed: bool,
}

impl LogStream {
    pub fn new(path: PathBuf) -> Self {
        Self {
            rx: None,
            path,
            transcript: Vec::new(),
            closed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn transcript_text(&self) -> String {
        self.transcript.join("\n")
    }

    /// Whether a runner channel is currently connected.
    pub fn is_attached(&self) -> bool {
        self.rx.is_some()
    }

    /// Whether the producer reported end of output for the current run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Start consuming a new run. The transcript restarts empty.
    pub fn attach(&mut self, rx: mpsc::UnboundedReceiver<RunnerEvent>) {
        self.transcript.clear();
        self.closed = false;
        self.rx = Some(rx);
    }

    /// Append lines produced outside the runner (status notes, errors).
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.transcript.push(line.into());
    }

    /// Replace the transcript with the log file contents. A missing file
    /// yields an empty transcript.
    pub fn reload_from_disk(&mut self) -> io::Result<()> {
        match fs::read_to_string(&self.path) {
            Ok(text) => {
                self.transcript = text.lines().map(str::to_owned).collect();
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.transcript.clear();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Apply every event already queued on the channel, in order.
    ///
    /// Never blocks. Lines not yet produced stay queued in the channel until
    /// the next call, so nothing is lost between frames.
    pub fn drain(&mut self) -> Drained {
        let mut drained = Drained::default();
        let Some(rx) = self.rx.as_mut() else {
            return drained;
        };

        let mut disconnected = false;
        for _ in 0..DRAIN_BUDGET {
            match rx.try_recv() {
                Ok(RunnerEvent::Line(line)) => drained.lines.push(line),
                // Read failures become a visible line; the page keeps running.
                Ok(RunnerEvent::ReadError(err)) => {
                    tracing::warn!("provisioning output read failed: {err}");
                    drained.lines.push(format!("[wdeploy] output read failed: {err}"));
                }
                Ok(RunnerEvent::Closed) => {
                    tracing::debug!("provisioning output closed");
                    self.closed = true;
                }
                Ok(RunnerEvent::Exited(outcome)) => {
                    drained.outcome = Some(outcome);
                }
                // Nothing queued yet; the rest arrives on a later frame.
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }
        // Both producers are gone; release the channel.
        if disconnected {
            tracing::debug!("runner channel disconnected");
            self.rx = None;
        }

        self.transcript.extend(drained.lines.iter().cloned());
        drained
    }
}
