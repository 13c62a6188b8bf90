//! InfluxDB line protocol rendering for telegram points
//!
//! Tags and fields are emitted sorted by key, so the same batch always
//! renders to the same body and re-submitting it overwrites identical points.

use asa_common::types::{TelegramRecord, MEASUREMENT};
use std::fmt::Write;

fn escape_into(out: &mut String, text: &str, special: &[char]) {
    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            c if special.contains(&c) => {
                out.push('\\');
                out.push(c);
            },
            c => out.push(c),
        }
    }
}

fn push_measurement(out: &mut String, name: &str) {
    escape_into(out, name, &[',', ' ']);
}

fn push_key(out: &mut String, key: &str) {
    escape_into(out, key, &[',', '=', ' ']);
}

fn push_string_field(out: &mut String, value: &str) {
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

/// Append one point for `record`, without trailing newline
pub fn render_point(out: &mut String, record: &TelegramRecord) {
    push_measurement(out, MEASUREMENT);

    let mut tags = record.tags();
    tags.sort_by_key(|(key, _)| *key);
    for (key, value) in tags.iter().filter(|(_, value)| !value.is_empty()) {
        out.push(',');
        push_key(out, key);
        out.push('=');
        push_key(out, value);
    }

    // Field keys in sorted order: cnt, date, dc, len, rssi, tstamp
    let _ = write!(out, " cnt={}i,date=", record.cnt);
    push_string_field(out, &record.date);
    if record.dc.is_finite() {
        let _ = write!(out, ",dc={}", record.dc);
    }
    let _ = write!(
        out,
        ",len={}i,rssi={}i,tstamp={}i {}",
        record.len, record.rssi, record.timestamp_ms, record.timestamp_ms
    );
}

/// Render a batch, one point per line
pub fn render_batch(records: &[TelegramRecord]) -> String {
    let mut out = String::with_capacity(records.len() * 256);
    for (idx, record) in records.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        render_point(&mut out, record);
    }
    out
}
