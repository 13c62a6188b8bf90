//! Streaming reader for analyzer telegram files
//!
//! Rows are read one at a time from disk; nothing beyond the current row is
//! buffered. The first malformed row ends the stream, so a caller that
//! drains the iterator keeps every record parsed before it.

use crate::error::{IngestError, Result};
use asa_common::types::{TelegramRecord, DELIMITER, HEADER_MARKER};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::trace;

/// Iterator over the telegrams of one file
pub struct RecordReader<R> {
    inner: csv::Reader<R>,
    row: csv::StringRecord,
    finished: bool,
}

fn builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(DELIMITER)
        .has_headers(false)
        .flexible(true)
        .quoting(false);
    builder
}

impl RecordReader<File> {
    /// Open `path` for streaming
    ///
    /// Fails with [`IngestError::FileOpen`] when no reader can be set up.
    pub fn open(path: &Path) -> Result<Self> {
        let inner = builder()
            .from_path(path)
            .map_err(|source| IngestError::FileOpen {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self::wrap(inner))
    }
}

impl<R: Read> RecordReader<R> {
    pub fn from_reader(reader: R) -> Self {
        Self::wrap(builder().from_reader(reader))
    }

    fn wrap(inner: csv::Reader<R>) -> Self {
        Self {
            inner,
            row: csv::StringRecord::new(),
            finished: false,
        }
    }

    fn current_line(&self) -> u64 {
        self.row.position().map(|p| p.line()).unwrap_or(0)
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<TelegramRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            match self.inner.read_record(&mut self.row) {
                Ok(false) => {
                    self.finished = true;
                    return None;
                },
                Ok(true) => {
                    let line = self.current_line();

                    if self.row.get(0) == Some(HEADER_MARKER) {
                        trace!(line, "Skipping header row");
                        continue;
                    }

                    let fields: Vec<&str> = self.row.iter().collect();
                    let parsed = TelegramRecord::from_fields(&fields)
                        .map_err(|e| IngestError::malformed_row(line, e));

                    if parsed.is_err() {
                        self.finished = true;
                    }
                    return Some(parsed);
                },
                Err(e) => {
                    self.finished = true;
                    let line = e.position().map(|p| p.line()).unwrap_or(0);
                    return Some(Err(IngestError::malformed_row(line, e)));
                },
            }
        }
    }
}
