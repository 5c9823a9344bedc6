//! Lazy line stream over extractor output.
//!
//! The process writes into a pipe; a reader thread forwards each line over a
//! bounded channel, so parsing overlaps with extraction and a slow consumer
//! applies backpressure to the process. The consumer only ever sees an
//! iterator of lines, which is also how tests feed canned output.

use crate::extractor::{ExtractError, ExtractResult};
use crossbeam_channel::{Receiver, bounded, never, unbounded};
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};

/// Output lines of one extraction, in order.
pub struct TagStream {
    lines: Receiver<String>,
    process: Option<RunningExtraction>,
}

struct RunningExtraction {
    program: String,
    target: PathBuf,
    child: Child,
    reader: JoinHandle<()>,
}

impl TagStream {
    /// A stream over fixed lines, with no process behind it.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (tx, rx) = unbounded();
        for line in lines {
            // Receiver is alive, send cannot fail
            let _ = tx.send(line.into());
        }
        Self {
            lines: rx,
            process: None,
        }
    }

    /// Spawn `command` and stream its standard output.
    pub fn spawn(
        mut command: Command,
        program: &str,
        target: PathBuf,
        capacity: usize,
    ) -> ExtractResult<Self> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| spawn_error(program, source))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExtractError::Spawn {
                program: program.to_string(),
                source: std::io::Error::other("stdout was not captured"),
            });
        };

        let (tx, rx) = bounded(capacity.max(1));
        let reader = thread::spawn(move || {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        let line = line.trim_end_matches(['\n', '\r']).to_string();
                        if tx.send(line).is_err() {
                            // Consumer went away; closing the pipe ends the process
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!("[extractor] read error: {e}");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            lines: rx,
            process: Some(RunningExtraction {
                program: program.to_string(),
                target,
                child,
                reader,
            }),
        })
    }

    /// Wait for the process to exit and report how it ended.
    ///
    /// Remaining unread lines are discarded. Canned streams always succeed.
    pub fn finish(mut self) -> ExtractResult<()> {
        self.lines = never();
        match self.process.take() {
            Some(process) => process.wait(),
            None => Ok(()),
        }
    }
}

impl Iterator for TagStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.lines.recv().ok()
    }
}

impl Drop for TagStream {
    fn drop(&mut self) {
        // Drop the receiver first so the reader thread stops and the pipe closes
        self.lines = never();
        if let Some(process) = self.process.take() {
            if let Err(e) = process.wait() {
                tracing::debug!("[extractor] abandoned extraction: {e}");
            }
        }
    }
}

impl RunningExtraction {
    fn wait(mut self) -> ExtractResult<()> {
        if self.reader.join().is_err() {
            tracing::warn!("[extractor] output reader thread panicked");
        }
        let status = self.child.wait().map_err(|source| ExtractError::Wait {
            program: self.program.clone(),
            source,
        })?;
        exit_status_to_result(status, &self.program, self.target)
    }
}

pub(crate) fn spawn_error(program: &str, source: std::io::Error) -> ExtractError {
    if source.kind() == ErrorKind::NotFound {
        ExtractError::ProgramNotFound {
            program: program.to_string(),
        }
    } else {
        ExtractError::Spawn {
            program: program.to_string(),
            source,
        }
    }
}

pub(crate) fn exit_status_to_result(
    status: std::process::ExitStatus,
    program: &str,
    target: PathBuf,
) -> ExtractResult<()> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(ExtractError::Failed {
            program: program.to_string(),
            code,
            target,
        }),
        None => Err(ExtractError::Interrupted {
            program: program.to_string(),
            target,
        }),
    }
}
