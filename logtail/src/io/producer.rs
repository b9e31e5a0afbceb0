//! Background writer that appends synthetic records to a deployment log.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument};

use crate::core::record::{LogRecord, SENTINEL, next_timestamp};
use crate::core::token::DeploymentToken;
use crate::error::{Error, Result};
use crate::generator::RecordGenerator;

/// Shape of one production run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProducerSettings {
    /// Number of records to append before the sentinel.
    pub record_count: u32,
    /// Pause between consecutive records.
    pub interval: Duration,
}

impl Default for ProducerSettings {
    fn default() -> Self {
        Self {
            record_count: 50,
            interval: Duration::from_millis(300),
        }
    }
}

/// Append `record_count` records to `writer`, then the sentinel.
///
/// Each line is flushed before the producer sleeps so concurrent readers see it.
/// The first failed write aborts the run; the writer is dropped on return either
/// way. Returns the number of records written.
#[instrument(skip_all, fields(token = %token, records = settings.record_count))]
pub async fn produce_records<W, G>(
    token: DeploymentToken,
    mut writer: W,
    path: PathBuf,
    settings: ProducerSettings,
    mut generator: G,
) -> Result<u32>
where
    W: AsyncWrite + Unpin,
    G: RecordGenerator,
{
    info!(path = %path.display(), "producer started");
    let mut previous = None;

    for written in 0..settings.record_count {
        if written > 0 {
            tokio::time::sleep(settings.interval).await;
        }

        let timestamp = next_timestamp(previous, Utc::now());
        previous = Some(timestamp);
        let record = LogRecord::new(timestamp, generator.persona());

        append_line(&mut writer, &path, &record.to_line()).await?;
        debug!(seq = written + 1, "record appended");
    }

    append_line(&mut writer, &path, &format!("{SENTINEL}\n")).await?;
    writer.shutdown().await.map_err(|e| Error::storage(&path, e))?;
    info!("producer finished");
    Ok(settings.record_count)
}

async fn append_line<W: AsyncWrite + Unpin>(writer: &mut W, path: &Path, line: &str) -> Result<()> {
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| Error::storage(path, e))?;
    writer.flush().await.map_err(|e| Error::storage(path, e))
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use super::*;
    use crate::core::record::parse_record_timestamp;
    use crate::generator::RandomGenerator;

    /// Accepts `budget` writes, then fails every write.
    struct FailingWriter {
        budget: usize,
        written: Vec<u8>,
    }

    impl AsyncWrite for FailingWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.budget == 0 {
                return Poll::Ready(Err(io::Error::other("disk full")));
            }
            self.budget -= 1;
            self.written.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn fast(record_count: u32) -> ProducerSettings {
        ProducerSettings {
            record_count,
            interval: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn writes_records_then_sentinel() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("run.log");
        let file = tokio::fs::File::create(&path).await.expect("create");

        let written = produce_records(
            DeploymentToken::generate(),
            file,
            path.clone(),
            fast(4),
            RandomGenerator::seeded(1),
        )
        .await
        .expect("produce");
        assert_eq!(written, 4);

        let contents = std::fs::read_to_string(&path).expect("read");
        assert!(contents.ends_with('\n'));
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[4], SENTINEL);

        let stamps: Vec<_> = lines[..4]
            .iter()
            .map(|l| parse_record_timestamp(l).expect("record format"))
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn zero_records_still_writes_sentinel() {
        let mut out = Vec::new();
        let written = produce_records(
            DeploymentToken::generate(),
            &mut out,
            PathBuf::from("mem.log"),
            fast(0),
            RandomGenerator::seeded(2),
        )
        .await
        .expect("produce");
        assert_eq!(written, 0);
        assert_eq!(String::from_utf8(out).expect("utf8"), format!("{SENTINEL}\n"));
    }

    #[tokio::test]
    async fn write_failure_aborts_without_sentinel() {
        let mut writer = FailingWriter {
            budget: 2,
            written: Vec::new(),
        };
        let err = produce_records(
            DeploymentToken::generate(),
            &mut writer,
            PathBuf::from("broken.log"),
            fast(5),
            RandomGenerator::seeded(3),
        )
        .await
        .expect_err("write should fail");

        assert!(
            matches!(err, Error::Storage { ref path, .. } if path == &PathBuf::from("broken.log"))
        );
        let text = String::from_utf8(writer.written).expect("utf8");
        assert_eq!(text.lines().count(), 2);
        assert!(!text.contains(SENTINEL));
    }
}
