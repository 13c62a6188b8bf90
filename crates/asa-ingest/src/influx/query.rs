//! Flux query for the watermark and parsing of its CSV response

use crate::error::{IngestError, Result};
use asa_common::types::{Watermark, FIELD_NAMES, MEASUREMENT};
use serde::Serialize;

/// Request body for `POST /api/v2/query`
#[derive(Debug, Serialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub dialect: Dialect,
}

/// CSV response layout: header row, no annotation rows
#[derive(Debug, Serialize)]
pub struct Dialect {
    pub header: bool,
    pub annotations: Vec<String>,
    pub delimiter: &'static str,
}

impl QueryRequest {
    pub fn flux(query: String) -> Self {
        Self {
            query,
            kind: "flux",
            dialect: Dialect {
                header: true,
                annotations: Vec::new(),
                delimiter: ",",
            },
        }
    }
}

fn flux_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Last `tstamp` value written to `bucket`, across all time
pub fn watermark_query(bucket: &str) -> String {
    format!(
        r#"from(bucket: "{bucket}")
  |> range(start: 1970-01-01T00:00:00Z)
  |> filter(fn: (r) => r["_measurement"] == "{measurement}")
  |> filter(fn: (r) => r["_field"] == "{field}")
  |> group()
  |> last()"#,
        bucket = flux_string(bucket),
        measurement = MEASUREMENT,
        field = FIELD_NAMES[0],
    )
}

/// Extract the watermark from a query response
///
/// A response without data rows means the destination holds no telegrams
/// yet and yields `None`.
pub fn parse_watermark(body: &str) -> Result<Option<Watermark>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut value_column = None;

    for row in reader.records() {
        let row = row.map_err(|e| IngestError::QueryResponse(e.to_string()))?;

        if row.iter().all(|field| field.trim().is_empty())
            || row.get(0).is_some_and(|field| field.starts_with('#'))
        {
            continue;
        }

        match value_column {
            None => {
                let idx = row.iter().position(|field| field == "_value").ok_or_else(|| {
                    IngestError::QueryResponse("no _value column in response".to_string())
                })?;
                value_column = Some(idx);
            },
            Some(idx) => {
                let raw = row.get(idx).unwrap_or_default().trim();
                let timestamp_ms = raw.parse::<i64>().map_err(|_| {
                    IngestError::QueryResponse(format!("_value '{}' is not an integer", raw))
                })?;
                return Ok(Some(Watermark::new(timestamp_ms)));
            },
        }
    }

    Ok(None)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_watermark_query_text() {
        let query = watermark_query("AskSinAnalyzer");
        assert!(query.starts_with(r#"from(bucket: "AskSinAnalyzer")"#));
        assert!(query.contains(r#"r["_measurement"] == "Telegrams""#));
        assert!(query.contains(r#"r["_field"] == "tstamp""#));
        assert!(query.trim_end().ends_with("|> last()"));
    }

    #[test]
    fn test_bucket_is_quoted() {
        let query = watermark_query(r#"odd"name"#);
        assert!(query.contains(r#"from(bucket: "odd\"name")"#));
    }

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(QueryRequest::flux("buckets()".into())).unwrap();
        assert_eq!(body["type"], "flux");
        assert_eq!(body["dialect"]["header"], true);
        assert_eq!(body["dialect"]["annotations"], serde_json::json!([]));
    }

    #[test]
    fn test_parse_single_row() {
        let body = ",result,table,_start,_stop,_time,_value,_field,_measurement\r\n\
                    ,_result,0,1970-01-01T00:00:00Z,2023-11-15T00:00:00Z,2023-11-14T22:13:20Z,1700000000000,tstamp,Telegrams\r\n\r\n";
        assert_eq!(
            parse_watermark(body).unwrap(),
            Some(Watermark::new(1_700_000_000_000))
        );
    }

    #[test]
    fn test_parse_with_annotations() {
        let body = "#datatype,string,long,long\n#group,false,false,false\n#default,_result,,\n\
                    ,result,table,_value\n,,0,42\n";
        assert_eq!(parse_watermark(body).unwrap(), Some(Watermark::new(42)));
    }

    #[test]
    fn test_parse_empty_response() {
        assert_eq!(parse_watermark("").unwrap(), None);
        assert_eq!(parse_watermark("\r\n").unwrap(), None);
        assert_eq!(
            parse_watermark(",result,table,_value\r\n").unwrap(),
            None
        );
    }

    #[test]
    fn test_parse_non_integer_value() {
        let err = parse_watermark(",result,table,_value\n,_result,0,soon\n").unwrap_err();
        assert!(matches!(err, IngestError::QueryResponse(_)));
    }

    #[test]
    fn test_parse_missing_value_column() {
        let err = parse_watermark("error,reference\nboom,1\n").unwrap_err();
        assert!(matches!(err, IngestError::QueryResponse(_)));
    }
}
