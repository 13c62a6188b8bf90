//! Per-file batch submission

use crate::error::{IngestError, Result};
use crate::influx::line_protocol::render_batch;
use asa_common::types::TelegramRecord;
use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Destination for a batch of points
#[async_trait]
pub trait PointSink: Send + Sync {
    /// Store all `points` in one operation
    async fn write_points(&self, points: &[TelegramRecord]) -> Result<()>;
}

/// Dry-run sink: prints line protocol instead of sending it
pub struct DryRunSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> DryRunSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl<W: Write + Send> PointSink for DryRunSink<W> {
    async fn write_points(&self, points: &[TelegramRecord]) -> Result<()> {
        let body = render_batch(points);
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(out, "{}", body)?;
        out.flush()?;
        Ok(())
    }
}

/// What happened to a file's batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Nothing new, no write issued
    UpToDate,
    /// Points handed to the sink in one call
    Written(usize),
}

/// Submits each file's batch to a [`PointSink`]
pub struct BatchWriter<'a> {
    sink: &'a dyn PointSink,
}

impl<'a> BatchWriter<'a> {
    pub fn new(sink: &'a dyn PointSink) -> Self {
        Self { sink }
    }

    /// Submit `batch` from `file` as a single write
    ///
    /// An empty batch is not written. A failed write comes back as
    /// [`IngestError::Write`] and is not retried.
    pub async fn submit(&self, file: &Path, batch: &[TelegramRecord]) -> Result<BatchOutcome> {
        if batch.is_empty() {
            info!(file = %file.display(), "InfluxDB is up to date, there is no new data to write");
            return Ok(BatchOutcome::UpToDate);
        }

        info!(file = %file.display(), points = batch.len(), "Writing data to InfluxDB");
        self.sink
            .write_points(batch)
            .await
            .map_err(|e| IngestError::write(file, e))?;

        Ok(BatchOutcome::Written(batch.len()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(ts: i64) -> TelegramRecord {
        let line = format!(
            "{};2023-11-14T22:13:20Z;-70;12;3;1.5;0x01;MSG;ABC123;DEF456;Sensor1;Actor1;SN1;SN2;false;false;PAYLOAD;RAW",
            ts
        );
        let fields: Vec<&str> = line.split(';').collect();
        TelegramRecord::from_fields(&fields).unwrap()
    }

    #[derive(Default)]
    struct CountingSink {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl PointSink for CountingSink {
        async fn write_points(&self, _points: &[TelegramRecord]) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(IngestError::QueryResponse("connection reset".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_empty_batch_skips_sink() {
        let sink = CountingSink::default();
        let outcome = BatchWriter::new(&sink)
            .submit(Path::new("TelegramsXS_1.csv"), &[])
            .await
            .unwrap();

        assert_eq!(outcome, BatchOutcome::UpToDate);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_batch_is_one_call() {
        let sink = CountingSink::default();
        let outcome = BatchWriter::new(&sink)
            .submit(Path::new("TelegramsXS_1.csv"), &[record(1), record(2), record(3)])
            .await
            .unwrap();

        assert_eq!(outcome, BatchOutcome::Written(3));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_carries_file_and_is_not_retried() {
        let sink = CountingSink {
            fail: true,
            ..CountingSink::default()
        };
        let err = BatchWriter::new(&sink)
            .submit(Path::new("TelegramsXS_9.csv"), &[record(1)])
            .await
            .unwrap_err();

        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
        assert!(err.is_fatal());
        assert!(err.to_string().contains("TelegramsXS_9.csv"));
    }

    #[tokio::test]
    async fn test_dry_run_prints_line_protocol() {
        let sink = DryRunSink::new(Vec::new());
        BatchWriter::new(&sink)
            .submit(Path::new("TelegramsXS_1.csv"), &[record(5), record(6)])
            .await
            .unwrap();

        let printed = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = printed.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Telegrams,"));
        assert!(lines[0].ends_with(" 5"));
        assert!(lines[1].ends_with(" 6"));
    }
}
