//! HTTP client for the InfluxDB 2.x API

use crate::config::InfluxConfig;
use crate::error::{IngestError, Result};
use crate::influx::{endpoints, line_protocol, query};
use crate::watermark::WatermarkSource;
use crate::writer::PointSink;
use asa_common::types::{TelegramRecord, Watermark};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use tracing::debug;

/// Write timestamps are sent in milliseconds
const WRITE_PRECISION: &str = "ms";

/// InfluxDB client bound to one org and bucket
pub struct InfluxClient {
    client: Client,
    base_url: String,
    org: String,
    bucket: String,
    token: String,
}

impl InfluxClient {
    /// Create a client from validated settings
    pub fn new(config: &InfluxConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            org: config.org.clone(),
            bucket: config.bucket.clone(),
            token: config.token.clone(),
        })
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.token)
    }

    /// Send a line protocol body in one write request
    pub async fn write_line_protocol(&self, body: String) -> Result<()> {
        let url = endpoints::write_url(&self.base_url);
        debug!(url = %url, bytes = body.len(), "Sending write request");

        let response = self
            .client
            .post(&url)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", WRITE_PRECISION),
            ])
            .header(AUTHORIZATION, self.auth_header())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    /// Run a Flux query and return the raw CSV response
    pub async fn query_csv(&self, flux: String) -> Result<String> {
        let url = endpoints::query_url(&self.base_url);
        debug!(url = %url, "Sending Flux query");

        let response = self
            .client
            .post(&url)
            .query(&[("org", self.org.as_str())])
            .header(AUTHORIZATION, self.auth_header())
            .header(ACCEPT, "application/csv")
            .json(&query::QueryRequest::flux(flux))
            .send()
            .await?;

        Ok(check(response).await?.text().await?)
    }
}

/// Turn a non-success status into [`IngestError::Api`] carrying the body
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(IngestError::Api {
        status,
        body: body.trim().to_string(),
    })
}

#[async_trait]
impl WatermarkSource for InfluxClient {
    async fn latest_timestamp(&self) -> Result<Option<Watermark>> {
        let body = self.query_csv(query::watermark_query(&self.bucket)).await?;
        query::parse_watermark(&body)
    }
}

#[async_trait]
impl PointSink for InfluxClient {
    async fn write_points(&self, points: &[TelegramRecord]) -> Result<()> {
        self.write_line_protocol(line_protocol::render_batch(points))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> InfluxConfig {
        let addr = server.address();
        InfluxConfig {
            url: format!("http://{}", addr.ip()),
            port: addr.port(),
            org: "home".to_string(),
            bucket: "AskSinAnalyzer".to_string(),
            token: "s3cr3t".to_string(),
            ..InfluxConfig::default()
        }
    }

    #[tokio::test]
    async fn test_write_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/write"))
            .and(query_param("org", "home"))
            .and(query_param("bucket", "AskSinAnalyzer"))
            .and(query_param("precision", "ms"))
            .and(header("authorization", "Token s3cr3t"))
            .and(body_string("Telegrams cnt=1i 1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = InfluxClient::new(&config_for(&server)).unwrap();
        client
            .write_line_protocol("Telegrams cnt=1i 1".to_string())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_write_rejection_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/write"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string(r#"{"code":"unauthorized"}"#),
            )
            .mount(&server)
            .await;

        let client = InfluxClient::new(&config_for(&server)).unwrap();
        let err = client.write_line_protocol("x".into()).await.unwrap_err();
        match err {
            IngestError::Api { status, body } => {
                assert_eq!(status.as_u16(), 401);
                assert!(body.contains("unauthorized"));
            },
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_latest_timestamp() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/query"))
            .and(query_param("org", "home"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                ",result,table,_value\r\n,_result,0,1700000000000\r\n",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = InfluxClient::new(&config_for(&server)).unwrap();
        assert_eq!(
            client.latest_timestamp().await.unwrap(),
            Some(Watermark::new(1_700_000_000_000))
        );
    }

    #[tokio::test]
    async fn test_latest_timestamp_empty_bucket() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/query"))
            .respond_with(ResponseTemplate::new(200).set_body_string("\r\n"))
            .mount(&server)
            .await;

        let client = InfluxClient::new(&config_for(&server)).unwrap();
        assert_eq!(client.latest_timestamp().await.unwrap(), None);
    }
}
