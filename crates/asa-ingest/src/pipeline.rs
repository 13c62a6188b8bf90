//! End-to-end ingestion run
//!
//! Files are handled strictly one after another: read, filter, then a
//! single write per file. The watermark is resolved once, before the first
//! file is opened, and only in latest mode.

use crate::config::AppConfig;
use crate::dedup::DedupFilter;
use crate::error::{IngestError, Result};
use crate::parser::RecordReader;
use crate::sequencer::FileSequencer;
use crate::watermark::{WatermarkResolver, WatermarkSource};
use crate::writer::{BatchOutcome, BatchWriter, PointSink};
use asa_common::types::TelegramRecord;
use std::path::Path;
use tracing::{error, info, warn};

/// Counters describing a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Files selected by the sequencer
    pub files_total: usize,
    /// Files that could not be opened
    pub files_skipped: usize,
    /// Files whose reading stopped at a malformed row
    pub files_truncated: usize,
    /// Files that had nothing new to write
    pub files_up_to_date: usize,
    pub points_written: usize,
    /// Records dropped as already present at the destination
    pub records_filtered: u64,
}

/// Records read from one file, and whether reading stopped early
struct FileBatch {
    records: Vec<TelegramRecord>,
    truncated: bool,
}

/// Drives one ingestion run against a watermark source and a point sink
pub struct Ingestor<'a> {
    config: &'a AppConfig,
    source: &'a dyn WatermarkSource,
    sink: &'a dyn PointSink,
}

impl<'a> Ingestor<'a> {
    pub fn new(
        config: &'a AppConfig,
        source: &'a dyn WatermarkSource,
        sink: &'a dyn PointSink,
    ) -> Self {
        Self {
            config,
            source,
            sink,
        }
    }

    /// Run the pipeline to completion
    ///
    /// Returns the first fatal error; per-file read problems are logged and
    /// counted in the report instead.
    pub async fn run(&self) -> Result<IngestReport> {
        let run = &self.config.run;

        let files = FileSequencer::new(run.dir.clone(), run.files.clone(), run.latest).sequence()?;

        let watermark = if run.latest {
            WatermarkResolver::new(self.source, self.config.influx.query_retry())
                .resolve()
                .await?
        } else {
            None
        };

        let mut filter = DedupFilter::new(watermark, run.latest);
        let writer = BatchWriter::new(self.sink);
        let mut report = IngestReport {
            files_total: files.len(),
            ..IngestReport::default()
        };

        for (idx, file) in files.iter().enumerate() {
            info!(
                file = %file.display(),
                "Reading file ({}/{})",
                idx + 1,
                files.len()
            );

            let batch = match read_file(file, &mut filter) {
                Ok(batch) => batch,
                Err(e) if !e.is_fatal() => {
                    error!(file = %file.display(), error = %e, "Skipping file");
                    report.files_skipped += 1;
                    continue;
                },
                Err(e) => return Err(e),
            };

            if batch.truncated {
                report.files_truncated += 1;
            }

            match writer.submit(file, &batch.records).await? {
                BatchOutcome::UpToDate => report.files_up_to_date += 1,
                BatchOutcome::Written(points) => report.points_written += points,
            }
        }

        report.records_filtered = filter.dropped();

        info!(
            files = report.files_total,
            skipped = report.files_skipped,
            truncated = report.files_truncated,
            points = report.points_written,
            filtered = report.records_filtered,
            "Ingestion finished"
        );

        Ok(report)
    }
}

/// Read every record of `file` that passes `filter`
///
/// A malformed row ends the file but keeps what was read before it.
fn read_file(file: &Path, filter: &mut DedupFilter) -> Result<FileBatch> {
    let reader = RecordReader::open(file)?;
    let mut batch = FileBatch {
        records: Vec::new(),
        truncated: false,
    };

    for record in reader {
        match record {
            Ok(record) => {
                if filter.accept(&record) {
                    batch.records.push(record);
                }
            },
            Err(IngestError::MalformedRow { line, reason }) => {
                warn!(
                    file = %file.display(),
                    line,
                    reason = %reason,
                    kept = batch.records.len(),
                    "Malformed row, ignoring the rest of the file"
                );
                batch.truncated = true;
            },
            Err(e) => return Err(e),
        }
    }

    Ok(batch)
}
