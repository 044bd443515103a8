//! HTTP client implementation

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::errors::CanvasError;

/// HTTP client for the execution backend
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a client. Without a timeout, requests wait for the backend
    /// indefinitely.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, CanvasError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CanvasError> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = Self::send(self.client.get(&url), "GET").await?;
        Ok(response.json().await?)
    }

    /// Make a GET request and return the raw body
    pub async fn get_bytes(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<u8>, CanvasError> {
        let url = self.url(path);
        debug!("GET {} (download)", url);

        let response = Self::send(self.client.get(&url).query(query), "GET").await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Make a POST request with a JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CanvasError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = Self::send(self.client.post(&url).json(body), "POST").await?;
        Ok(response.json().await?)
    }

    /// Make a POST request without a body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, CanvasError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = Self::send(self.client.post(&url), "POST").await?;
        Ok(response.json().await?)
    }

    async fn send(request: RequestBuilder, method: &str) -> Result<Response, CanvasError> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP {} failed: {} - {}", method, status, body);
            return Err(CanvasError::BackendError { status, body });
        }

        Ok(response)
    }
}
