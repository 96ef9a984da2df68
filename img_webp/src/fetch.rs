//! Remote retrieval for URL jobs
//!
//! A plain blocking GET; no retries, no redirects beyond the client defaults.
//! Status checking is left to the caller so the error names the URL.

use std::io::Read;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("{0}")]
pub struct FetchError(pub String);

/// Raw HTTP response as seen by a worker.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    /// Status line text, e.g. `404 Not Found`.
    pub status_text: String,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

pub trait Fetcher: Send + Sync {
    fn get(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// Shared blocking client; connection pools are reused across workers.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError(e.to_string()))?;

        let status = response.status();
        let status_text = status.to_string();

        let mut body = Vec::new();
        if status.is_success() {
            response
                .read_to_end(&mut body)
                .map_err(|e| FetchError(format!("reading body: {}", e)))?;
        }

        Ok(FetchResponse {
            status: status.as_u16(),
            status_text,
            body,
        })
    }
}
