//! Outbound HTTP transport for registrations.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use super::errors::TransportError;

/// Content type sent with every registration body.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Status and body returned by the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw reply body.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }
}

/// Sends a JSON body to the registration endpoint.
#[async_trait]
pub trait RegistrationTransport: Send + Sync + 'static {
    /// Posts `body` to `endpoint`. The body is consumed by the call.
    async fn post_json(
        &self,
        endpoint: &Url,
        body: Vec<u8>,
    ) -> Result<TransportResponse, TransportError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a client that applies `timeout` to each request.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] when the TLS backend or client
    /// configuration cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("xapsd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| TransportError::Client {
                message: error.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RegistrationTransport for HttpTransport {
    async fn post_json(
        &self,
        endpoint: &Url,
        body: Vec<u8>,
    ) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(endpoint.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|error| TransportError::from_request(&error))?;
        let status = response.status().as_u16();
        let reply = response
            .bytes()
            .await
            .map_err(|error| TransportError::from_body(&error))?;
        Ok(TransportResponse {
            status,
            body: reply.to_vec(),
        })
    }
}
