//! Watermark-based filtering of already uploaded telegrams

use asa_common::types::{TelegramRecord, Watermark};

/// Decides whether a record still has to be uploaded
///
/// Outside latest mode every record passes. In latest mode a record passes
/// only when it is strictly newer than the watermark; with no watermark
/// (empty destination) everything passes.
#[derive(Debug, Default)]
pub struct DedupFilter {
    cutoff: Option<Watermark>,
    dropped: u64,
}

impl DedupFilter {
    pub fn new(watermark: Option<Watermark>, latest: bool) -> Self {
        Self {
            cutoff: if latest { watermark } else { None },
            dropped: 0,
        }
    }

    pub fn accept(&mut self, record: &TelegramRecord) -> bool {
        let keep = self
            .cutoff
            .map_or(true, |watermark| watermark.is_older_than(record));

        if !keep {
            self.dropped += 1;
        }
        keep
    }

    /// Records rejected so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
