//! InfluxDB 2.x endpoint URL builders

/// Build write endpoint URL (org and bucket go in the query string)
pub fn write_url(base_url: &str) -> String {
    format!("{}/api/v2/write", base_url)
}

/// Build Flux query endpoint URL
pub fn query_url(base_url: &str) -> String {
    format!("{}/api/v2/query", base_url)
}
