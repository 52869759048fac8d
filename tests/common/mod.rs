//! Test utilities shared by the archiver integration tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use kodegen_tools_webarchive::{
    ArchiveConfig, FetchError, FetchRequest, FetchResponse, Fetcher,
};
use url::Url;

/// Smallest byte sequence sniffed as PNG
#[allow(dead_code)]
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

#[derive(Debug, Clone)]
struct Route {
    status: u16,
    content_type: Option<String>,
    body: Vec<u8>,
}

/// In-memory [`Fetcher`] with scripted responses
///
/// Unknown URLs fail with a transport error, as an unreachable host would.
/// Every call is counted per URL, and the peak number of simultaneous
/// calls is recorded.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    routes: HashMap<String, Route>,
    delay: Duration,
    calls: Mutex<HashMap<String, usize>>,
    referers: Mutex<HashMap<String, Option<String>>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[allow(dead_code)]
impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every response for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Answer `url` with a 200 and `body`
    pub fn route(self, url: &str, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        self.route_full(url, 200, Some(content_type), body)
    }

    /// Answer `url` with a 200 and no `Content-Type`
    pub fn route_untyped(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.route_full(url, 200, None, body)
    }

    /// Answer `url` with an empty body and `status`
    pub fn route_status(self, url: &str, status: u16) -> Self {
        self.route_full(url, status, Some("text/plain"), Vec::new())
    }

    fn route_full(
        mut self,
        url: &str,
        status: u16,
        content_type: Option<&str>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        self.routes.insert(
            normalize(url),
            Route {
                status,
                content_type: content_type.map(str::to_string),
                body: body.into(),
            },
        );
        self
    }

    /// Calls made for `url`
    pub fn calls(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&normalize(url))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Highest number of calls that were in progress at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// `Referer` sent with the last request for `url`
    pub fn referer(&self, url: &str) -> Option<String> {
        self.referers
            .lock()
            .unwrap()
            .get(&normalize(url))
            .cloned()
            .flatten()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let key = request.url.to_string();
        *self.calls.lock().unwrap().entry(key.clone()).or_default() += 1;
        self.referers
            .lock()
            .unwrap()
            .insert(key.clone(), request.referer.clone());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.routes.get(&key) {
            Some(route) => Ok(FetchResponse::from_bytes(
                route.status,
                route.content_type.clone(),
                route.body.clone(),
            )),
            None => Err(FetchError::Transport(format!("connection refused: {key}"))),
        }
    }
}

fn normalize(url: &str) -> String {
    Url::parse(url)
        .map(|parsed| parsed.to_string())
        .unwrap_or_else(|_| url.to_string())
}

/// Single-file configuration without meta tags, so outputs are easy to compare
#[allow(dead_code)]
pub fn plain_config() -> kodegen_tools_webarchive::ArchiveConfigBuilder<
    kodegen_tools_webarchive::config::WithOutputMode,
> {
    ArchiveConfig::builder()
        .content_security_policy(false)
        .single_file()
}

/// `data:` URL the archiver produces for `content`
#[allow(dead_code)]
pub fn data_url(content_type: &str, content: &[u8]) -> String {
    format!("data:{content_type};base64,{}", STANDARD.encode(content))
}

/// Decode the payload of a base64 `data:` URL
#[allow(dead_code)]
pub fn decode_data_url(data_url: &str) -> Vec<u8> {
    let (_, payload) = data_url
        .split_once(";base64,")
        .expect("not a base64 data URL");
    STANDARD.decode(payload).expect("invalid base64 payload")
}

/// Value of the first ` attr="..."` occurrence in `html`
///
/// The leading space keeps `src` from matching inside `data-src`.
#[allow(dead_code)]
pub fn attr_value(html: &str, attr: &str) -> Option<String> {
    let marker = format!(" {attr}=\"");
    let start = html.find(&marker)? + marker.len();
    let end = html[start..].find('"')? + start;
    Some(html[start..end].replace("&amp;", "&"))
}
