use crate::core::error::ChatError;
use reqwest::{Client, Response};
use serde::Serialize;
use std::time::Duration;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Long-lived JSON client bound to one API base URL.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    endpoint: String,
}

impl HttpClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ChatError> {
        Self::with_timeout(endpoint, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        bearer: &str,
        payload: &T,
    ) -> Result<Response, ChatError> {
        let url = format!("{}/{}", self.endpoint, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(bearer)
            .json(payload)
            .send()
            .await?;

        Ok(response)
    }
}
