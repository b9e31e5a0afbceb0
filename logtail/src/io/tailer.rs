//! Streaming reader that follows a deployment log while it is being written.

use std::path::PathBuf;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::core::record::LogLine;
use crate::core::tail::{ReadOutcome, TailAction, TailEnd, TailMachine};
use crate::core::token::DeploymentToken;
use crate::error::{Error, Result};
use crate::supervisor::Supervisor;

/// Polling behaviour of a tail stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailSettings {
    /// Sleep between polls that found nothing new.
    pub poll_interval: Duration,
    /// Consecutive empty polls tolerated for a log with no known producer.
    pub idle_poll_limit: u32,
}

impl Default for TailSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(300),
            idle_poll_limit: 200,
        }
    }
}

/// Read position in one log, private to one consumer.
///
/// Bytes of a line that is still being written are held back until its
/// terminator arrives.
#[derive(Debug)]
pub struct LogCursor<R> {
    reader: BufReader<R>,
    path: PathBuf,
    offset: u64,
    partial: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LogCursor<R> {
    pub fn new(reader: R, path: PathBuf) -> Self {
        Self {
            reader: BufReader::new(reader),
            path,
            offset: 0,
            partial: Vec::new(),
        }
    }

    /// Bytes consumed so far, including any held-back partial line.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the next complete line, if one is available.
    pub async fn read_next(&mut self) -> Result<ReadOutcome> {
        let n = self
            .reader
            .read_until(b'\n', &mut self.partial)
            .await
            .map_err(|e| Error::storage(&self.path, e))?;
        if n == 0 {
            return Ok(ReadOutcome::Eof);
        }
        self.offset += n as u64;

        if self.partial.last() != Some(&b'\n') {
            return Ok(ReadOutcome::Partial);
        }

        let mut raw = std::mem::take(&mut self.partial);
        raw.pop();
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        let line = String::from_utf8_lossy(&raw);
        Ok(match LogLine::classify(&line) {
            LogLine::Record(text) => ReadOutcome::Line(text),
            LogLine::Sentinel => ReadOutcome::Sentinel,
        })
    }
}

/// Follows one deployment log and forwards each record line to a consumer.
#[derive(Debug)]
pub struct Tailer {
    token: DeploymentToken,
    cursor: LogCursor<File>,
    machine: TailMachine,
    settings: TailSettings,
    supervisor: Supervisor,
}

impl Tailer {
    pub fn new(
        token: DeploymentToken,
        file: File,
        path: PathBuf,
        settings: TailSettings,
        supervisor: Supervisor,
    ) -> Self {
        Self {
            token,
            cursor: LogCursor::new(file, path),
            machine: TailMachine::new(settings.idle_poll_limit),
            settings,
            supervisor,
        }
    }

    pub fn token(&self) -> DeploymentToken {
        self.token
    }

    /// Run the tail loop on its own task, returning the receiving end of the line
    /// channel. Dropping the receiver stops the task at its next check.
    pub fn spawn(self, buffer: usize) -> (mpsc::Receiver<String>, JoinHandle<TailEnd>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let handle = tokio::spawn(self.run(tx));
        (rx, handle)
    }

    /// Forward lines into `tx` until the log completes, the file becomes
    /// unreadable, or the receiver is dropped.
    #[instrument(skip_all, fields(token = %self.token))]
    pub async fn run(mut self, tx: mpsc::Sender<String>) -> TailEnd {
        debug!("tail started");
        let mut delivered: u64 = 0;

        loop {
            if tx.is_closed() {
                self.machine.abort(TailEnd::Disconnected);
                break;
            }

            let outcome = match self.cursor.read_next().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "log became unreadable, ending stream");
                    self.machine.abort(TailEnd::Failed);
                    break;
                }
            };
            let producer = self.supervisor.status(&self.token);

            match self.machine.on_read(outcome, producer) {
                TailAction::Emit(line) => {
                    if tx.send(line).await.is_err() {
                        self.machine.abort(TailEnd::Disconnected);
                        break;
                    }
                    delivered += 1;
                }
                TailAction::ReadAgain => {}
                TailAction::Wait => {
                    tokio::select! {
                        _ = tx.closed() => {
                            self.machine.abort(TailEnd::Disconnected);
                            break;
                        }
                        _ = tokio::time::sleep(self.settings.poll_interval) => {}
                    }
                }
                TailAction::Close => break,
            }
        }

        let end = self.machine.end().unwrap_or(TailEnd::Failed);
        info!(?end, delivered, offset = self.cursor.offset(), "tail ended");
        end
    }
}
