//! HTTP client wrapper for snapshot and feed downloads.

use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::{CloudInfoError, Result};

/// Default timeout for range document requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client wrapper with a bounded total request time.
#[derive(Debug, Clone)]
pub struct FetchClient {
    inner: Client,
    timeout: Duration,
}

impl FetchClient {
    /// Create a new fetch client with the specified timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let inner = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(false)
            .build()?;
        Ok(Self { inner, timeout })
    }

    /// Create a new fetch client with the default timeout.
    pub fn with_default_timeout() -> Result<Self> {
        Self::new(DEFAULT_TIMEOUT)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` and return the body.
    ///
    /// A timed-out request is reported as [`CloudInfoError::Timeout`] and any
    /// non-success status as [`CloudInfoError::Http`].
    pub async fn fetch(&self, url: &str, max_size: Option<usize>) -> Result<Vec<u8>> {
        let response = self.inner.get(url).send().await.map_err(from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CloudInfoError::Http(status.as_u16()));
        }

        read_body(response, max_size).await
    }
}

fn from_reqwest(err: reqwest::Error) -> CloudInfoError {
    if err.is_timeout() {
        CloudInfoError::Timeout
    } else {
        CloudInfoError::Request(err)
    }
}

/// Collect the body, giving up as soon as it exceeds `max_size`.
async fn read_body(mut response: Response, max_size: Option<usize>) -> Result<Vec<u8>> {
    let Some(max_size) = max_size else {
        return Ok(response.bytes().await.map_err(from_reqwest)?.to_vec());
    };

    let announced = response
        .content_length()
        .map(|len| usize::try_from(len).unwrap_or(usize::MAX));
    if let Some(len) = announced.filter(|&len| len > max_size) {
        return Err(CloudInfoError::TooLarge(len, max_size));
    }

    // Content-Length is only a hint; the running total is what gets enforced
    let mut body = Vec::with_capacity(announced.unwrap_or(0).min(max_size));
    while let Some(chunk) = response.chunk().await.map_err(from_reqwest)? {
        let len = body.len().saturating_add(chunk.len());
        if len > max_size {
            return Err(CloudInfoError::TooLarge(len, max_size));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
