//! reqwest-backed [`Fetcher`]

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, COOKIE, REFERER, USER_AGENT};

use super::cookies::CookieJar;
use super::errors::FetchError;
use super::retry::RetryPolicy;
use super::{FetchRequest, FetchResponse, Fetcher};
use crate::config::ArchiveConfig;

/// HTTP client used for every request of an archival run
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    user_agent: String,
    cookies: Arc<CookieJar>,
    retry: RetryPolicy,
}

impl HttpFetcher {
    /// Build a client from the run configuration
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the TLS backend cannot be initialized.
    pub fn new(config: &ArchiveConfig, cookies: CookieJar) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs()))
            .danger_accept_invalid_certs(config.skip_tls_verification())
            .gzip(true)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            user_agent: config.user_agent().to_string(),
            cookies: Arc::new(cookies),
            retry: config.retry_policy(),
        })
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn unix_now() -> u64 {
        u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let started = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut builder = self
                .client
                .get(request.url.clone())
                .header(USER_AGENT, &self.user_agent);
            if let Some(referer) = &request.referer {
                builder = builder.header(REFERER, referer);
            }
            if let Some(cookie) = self.cookies.header_value(&request.url, Self::unix_now()) {
                builder = builder.header(COOKIE, cookie);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();

            if self.retry.is_retryable(status) {
                let elapsed = started.elapsed();
                match self.retry.next_delay(attempt, elapsed) {
                    Some(delay) => {
                        log::debug!(
                            "HTTP {status} from {}, retrying in {delay:?} (attempt {attempt})",
                            request.url
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    None => {
                        return Err(FetchError::RetriesExhausted {
                            attempts: attempt,
                            elapsed,
                            last_status: status,
                        });
                    }
                }
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);

            let body = response
                .bytes_stream()
                .map(|chunk| {
                    chunk
                        .map(|bytes| bytes.to_vec())
                        .map_err(|e| FetchError::Body(e.to_string()))
                })
                .boxed();

            return Ok(FetchResponse {
                status,
                content_type,
                body,
            });
        }
    }
}
