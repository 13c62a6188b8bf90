//! ASA Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the asa-to-ifdb workspace.
//!
//! # Overview
//!
//! - **Types**: The telegram record schema written by the AskSin Analyzer XS
//!   and the watermark used for incremental uploads
//! - **Error Handling**: Record-level error types and result alias
//! - **Logging**: Centralized `tracing` subscriber setup
//!
//! # Example
//!
//! ```
//! use asa_common::types::{TelegramRecord, Watermark};
//!
//! let line = "1700000000000;2023-11-14T22:13:20Z;-70;12;3;1.5;0x01;MSG;ABC123;DEF456;Sensor1;Actor1;SN1;SN2;false;false;PAYLOAD;RAW";
//! let fields: Vec<&str> = line.split(';').collect();
//! let record = TelegramRecord::from_fields(&fields).unwrap();
//!
//! assert!(Watermark::new(1_699_999_999_999).is_older_than(&record));
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{AsaError, Result};
pub use types::{TelegramRecord, Watermark};
