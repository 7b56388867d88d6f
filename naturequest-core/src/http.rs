//! HTTP client abstraction for outbound API calls.
//!
//! The places lookup used during challenge verification goes through this
//! trait so tests can stub network traffic. The default implementation
//! wraps reqwest.

use async_trait::async_trait;
use std::collections::HashMap;
use crate::Error;

/// A generic trait for making HTTP GET requests with headers.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(
        &self,
        url: String,
        headers: HashMap<String, String>,
    ) -> Result<String, Error>;
}

#[derive(Clone)]
pub struct DefaultHttpClient {
    client: reqwest::Client,
}

impl DefaultHttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for DefaultHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for DefaultHttpClient {
    async fn get(
        &self,
        url: String,
        headers: HashMap<String, String>,
    ) -> Result<String, Error> {
        let mut request = self.client.get(&url);
        for (key, value) in headers {
            request = request.header(&key, value);
        }
        let response = request.send().await?.text().await?;
        Ok(response)
    }
}
