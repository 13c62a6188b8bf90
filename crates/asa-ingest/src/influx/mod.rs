//! InfluxDB 2.x HTTP access
//!
//! Line protocol rendering, the watermark query and the client that ties
//! them to the `/api/v2` endpoints.

pub mod client;
pub mod endpoints;
pub mod line_protocol;
pub mod query;

pub use client::InfluxClient;
