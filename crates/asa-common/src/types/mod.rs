//! Telegram schema shared across asa-to-ifdb
//!
//! The AskSin Analyzer XS writes one telegram per line into
//! `TelegramsXS_*.csv` files, `;`-delimited, with a fixed 18-column layout.

use crate::error::{AsaError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Schema Constants
// ============================================================================

/// Column names in the order they appear in a telegram file.
pub const FIELD_NAMES: [&str; 18] = [
    "tstamp",
    "date",
    "rssi",
    "len",
    "cnt",
    "dc",
    "flags",
    "type",
    "fromAddr",
    "toAddr",
    "fromName",
    "toName",
    "fromSerial",
    "toSerial",
    "toIsIp",
    "fromIsIp",
    "payload",
    "raw",
];

/// First field of a header row.
pub const HEADER_MARKER: &str = "tstamp";

/// Measurement name every telegram point is written under.
pub const MEASUREMENT: &str = "Telegrams";

/// File name pattern of analyzer exports.
pub const FILE_PATTERN: &str = "TelegramsXS_*.csv";

/// Field delimiter of analyzer exports.
pub const DELIMITER: u8 = b';';

/// One telegram parsed from an analyzer export line
///
/// `payload` and `raw` are part of the file schema but are never uploaded,
/// so they are not retained here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramRecord {
    /// Epoch milliseconds; ordering and dedup key
    pub timestamp_ms: i64,
    /// Human-readable timestamp, kept verbatim
    pub date: String,
    pub rssi: i64,
    pub len: i64,
    pub cnt: i64,
    /// Duty cycle
    pub dc: f64,
    pub flags: String,
    pub telegram_type: String,
    pub from_addr: String,
    pub to_addr: String,
    pub from_name: String,
    pub to_name: String,
    pub from_serial: String,
    pub to_serial: String,
    pub to_is_ip: String,
    pub from_is_ip: String,
}

impl TelegramRecord {
    /// Build a record from the split fields of one line
    ///
    /// Fields are positional in [`FIELD_NAMES`] order. Rows with fewer than
    /// 18 fields are rejected; trailing extra fields are ignored.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Result<Self> {
        if fields.len() < FIELD_NAMES.len() {
            return Err(AsaError::MissingField {
                field: FIELD_NAMES[fields.len()],
                found: fields.len(),
                expected: FIELD_NAMES.len(),
            });
        }

        let text = |idx: usize| fields[idx].as_ref().to_string();

        Ok(Self {
            timestamp_ms: parse_int(fields, 0)?,
            date: text(1),
            rssi: parse_int(fields, 2)?,
            len: parse_int(fields, 3)?,
            cnt: parse_int(fields, 4)?,
            dc: parse_float(fields, 5)?,
            flags: text(6),
            telegram_type: text(7),
            from_addr: text(8),
            to_addr: text(9),
            from_name: text(10),
            to_name: text(11),
            from_serial: text(12),
            to_serial: text(13),
            to_is_ip: text(14),
            from_is_ip: text(15),
        })
    }

    /// Tag set as `(column name, value)` pairs, in schema order
    pub fn tags(&self) -> [(&'static str, &str); 10] {
        [
            ("flags", &self.flags),
            ("type", &self.telegram_type),
            ("fromAddr", &self.from_addr),
            ("toAddr", &self.to_addr),
            ("fromName", &self.from_name),
            ("toName", &self.to_name),
            ("fromSerial", &self.from_serial),
            ("toSerial", &self.to_serial),
            ("toIsIp", &self.to_is_ip),
            ("fromIsIp", &self.from_is_ip),
        ]
    }
}

fn parse_int<S: AsRef<str>>(fields: &[S], idx: usize) -> Result<i64> {
    let raw = fields[idx].as_ref();
    raw.trim()
        .parse()
        .map_err(|_| AsaError::invalid_number(FIELD_NAMES[idx], raw))
}

fn parse_float<S: AsRef<str>>(fields: &[S], idx: usize) -> Result<f64> {
    let raw = fields[idx].as_ref();
    raw.trim()
        .parse()
        .map_err(|_| AsaError::invalid_number(FIELD_NAMES[idx], raw))
}

/// Most recent telegram timestamp already persisted in the destination
///
/// "No prior data" is modelled as `Option<Watermark>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Watermark(i64);

impl Watermark {
    pub fn new(timestamp_ms: i64) -> Self {
        Self(timestamp_ms)
    }

    pub fn timestamp_ms(self) -> i64 {
        self.0
    }

    /// True when `record` is strictly newer than this watermark
    pub fn is_older_than(&self, record: &TelegramRecord) -> bool {
        record.timestamp_ms > self.0
    }
}

impl std::fmt::Display for Watermark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match DateTime::<Utc>::from_timestamp_millis(self.0) {
            Some(at) => write!(f, "{} ({})", self.0, at.to_rfc3339()),
            None => write!(f, "{}", self.0),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLE: &str = "1700000000000;2023-11-14T22:13:20Z;-70;12;3;1.5;0x01;MSG;ABC123;DEF456;Sensor1;Actor1;SN1;SN2;false;false;PAYLOAD;RAW";

    fn sample_fields() -> Vec<&'static str> {
        SAMPLE.split(';').collect()
    }

    #[test]
    fn test_from_fields_sample_line() {
        let record = TelegramRecord::from_fields(&sample_fields()).unwrap();

        assert_eq!(record.timestamp_ms, 1_700_000_000_000);
        assert_eq!(record.date, "2023-11-14T22:13:20Z");
        assert_eq!(record.rssi, -70);
        assert_eq!(record.len, 12);
        assert_eq!(record.cnt, 3);
        assert_eq!(record.dc, 1.5);
        assert_eq!(record.telegram_type, "MSG");
        assert_eq!(record.from_addr, "ABC123");
        assert_eq!(record.to_serial, "SN2");
        assert_eq!(record.from_is_ip, "false");
    }

    #[test]
    fn test_from_fields_too_few() {
        let fields = &sample_fields()[..10];
        let err = TelegramRecord::from_fields(fields).unwrap_err();

        assert_eq!(
            err,
            AsaError::MissingField {
                field: "fromName",
                found: 10,
                expected: 18
            }
        );
    }

    #[test]
    fn test_from_fields_extra_fields_ignored() {
        let mut fields = sample_fields();
        fields.push("trailing");
        assert!(TelegramRecord::from_fields(&fields).is_ok());
    }

    #[test]
    fn test_from_fields_bad_numbers() {
        for (idx, name) in [(0, "tstamp"), (2, "rssi"), (3, "len"), (4, "cnt"), (5, "dc")] {
            let mut fields = sample_fields();
            fields[idx] = "n/a";
            let err = TelegramRecord::from_fields(&fields).unwrap_err();
            assert_eq!(err, AsaError::invalid_number(name, "n/a"));
        }
    }

    #[test]
    fn test_header_row_is_not_a_record() {
        let err = TelegramRecord::from_fields(&FIELD_NAMES).unwrap_err();
        assert_eq!(err, AsaError::invalid_number("tstamp", "tstamp"));
    }

    #[test]
    fn test_tags_use_column_names() {
        let record = TelegramRecord::from_fields(&sample_fields()).unwrap();
        let tags = record.tags();

        assert_eq!(tags[1], ("type", "MSG"));
        assert_eq!(tags[9], ("fromIsIp", "false"));
    }

    #[test]
    fn test_watermark_boundary() {
        let record = TelegramRecord::from_fields(&sample_fields()).unwrap();

        assert!(!Watermark::new(1_700_000_000_000).is_older_than(&record));
        assert!(Watermark::new(1_699_999_999_999).is_older_than(&record));
    }

    #[test]
    fn test_watermark_display() {
        let shown = Watermark::new(1_700_000_000_000).to_string();
        assert_eq!(shown, "1700000000000 (2023-11-14T22:13:20+00:00)");
    }

    proptest! {
        #[test]
        fn prop_watermark_accepts_only_newer(ts in any::<i64>(), mark in any::<i64>()) {
            let mut record = TelegramRecord::from_fields(&sample_fields()).unwrap();
            record.timestamp_ms = ts;
            prop_assert_eq!(Watermark::new(mark).is_older_than(&record), ts > mark);
        }
    }
}
