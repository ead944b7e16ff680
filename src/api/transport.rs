//! HTTP transport for signed report requests

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::{ApiError, SignedRequest};

/// Sends a signed request and returns the raw response body
pub trait Transport {
    fn get(&self, request: &SignedRequest) -> impl Future<Output = Result<String, ApiError>> + Send;
}

/// reqwest-backed transport with a request timeout
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport whose requests fail after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, request: &SignedRequest) -> impl Future<Output = Result<String, ApiError>> + Send {
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }

        async move {
            let response = builder.send().await?;
            // ShareASale reports failures in the body, so the status is only logged
            debug!(status = %response.status(), "ShareASale responded");
            let body = response.text().await?;
            Ok(body)
        }
    }
}
