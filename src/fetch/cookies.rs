//! Netscape cookie files and per-domain cookie buckets
//!
//! A cookie file line holds 7 TAB-separated fields:
//! `domain`, `include-subdomains`, `path`, `secure`, `expires`, `name`, `value`.
//! A `#HttpOnly_` prefix on the domain marks an HTTP-only cookie; any other
//! line starting with `#` is a comment.

use std::collections::HashMap;
use std::fmt;
use std::io::BufRead;

use url::Url;

use super::errors::CookieError;

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// One cookie to attach to outgoing requests
///
/// The value is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    value: String,
    /// Domain as written, e.g. `.example.com` or `www.example.com`
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    /// Unix seconds, 0 for a session cookie
    pub expires: u64,
}

impl Cookie {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into().to_ascii_lowercase(),
            path: "/".to_string(),
            secure: false,
            http_only: false,
            expires: 0,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn with_expires(mut self, expires: u64) -> Self {
        self.expires = expires;
        self
    }

    /// Cookie value, avoid logging it
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    fn is_expired(&self, now: u64) -> bool {
        self.expires != 0 && self.expires <= now
    }

    fn path_matches(&self, request_path: &str) -> bool {
        let path = if self.path.is_empty() { "/" } else { self.path.as_str() };
        if !request_path.starts_with(path) {
            return false;
        }
        // "/docs" matches "/docs" and "/docs/x" but not "/docsets"
        path.ends_with('/')
            || request_path.len() == path.len()
            || request_path.as_bytes().get(path.len()) == Some(&b'/')
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("domain", &self.domain)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .field("expires", &self.expires)
            .finish()
    }
}

/// Parse a Netscape cookie file
///
/// Malformed lines are logged and skipped. A file with data lines but no
/// valid cookie is an error.
///
/// # Errors
///
/// [`CookieError::Io`] on read failure, [`CookieError::NoCookiesFound`] when
/// every data line was malformed.
pub fn parse_netscape_cookies(reader: impl BufRead) -> Result<Vec<Cookie>, CookieError> {
    let mut cookies = Vec::new();
    let mut malformed = 0;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        let line_number = idx + 1;

        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with('#') && !line.starts_with(HTTP_ONLY_PREFIX) {
            continue;
        }

        match parse_cookie_line(line, line_number) {
            Ok(cookie) => {
                log::debug!("Parsed cookie '{}' for {}", cookie.name, cookie.domain);
                cookies.push(cookie);
            }
            Err(e) => {
                log::warn!("Skipping malformed cookie line: {e}");
                malformed += 1;
            }
        }
    }

    if cookies.is_empty() && malformed > 0 {
        return Err(CookieError::NoCookiesFound {
            malformed_count: malformed,
        });
    }

    Ok(cookies)
}

fn parse_cookie_line(line: &str, line_number: usize) -> Result<Cookie, CookieError> {
    let invalid = |reason: String| CookieError::InvalidLine {
        line_number,
        reason,
    };

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 7 {
        return Err(invalid(format!(
            "expected 7 TAB-separated fields, found {}",
            fields.len()
        )));
    }

    let (domain, http_only) = match fields[0].strip_prefix(HTTP_ONLY_PREFIX) {
        Some(domain) => (domain, true),
        None => (fields[0], false),
    };
    if domain.is_empty() {
        return Err(invalid("domain field is empty".to_string()));
    }

    let secure = parse_flag(fields[3]).ok_or_else(|| {
        invalid(format!("secure field must be TRUE or FALSE, got '{}'", fields[3]))
    })?;
    let expires = fields[4].trim().parse::<u64>().map_err(|_| {
        invalid(format!(
            "expires field must be a non-negative integer, got '{}'",
            fields[4]
        ))
    })?;

    Ok(Cookie::new(fields[5], fields[6], domain)
        .with_path(fields[2])
        .with_secure(secure)
        .with_http_only(http_only)
        .with_expires(expires))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_uppercase().as_str() {
        "TRUE" => Some(true),
        "FALSE" => Some(false),
        _ => None,
    }
}

/// Cookies bucketed by domain
///
/// A request for `www.example.com` merges the buckets `www.example.com`,
/// `.www.example.com` and every parent `.example.com`. More specific buckets
/// win when two buckets define the same cookie name.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    buckets: HashMap<String, Vec<Cookie>>,
}

impl CookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cookie: Cookie) {
        self.buckets
            .entry(cookie.domain.clone())
            .or_default()
            .push(cookie);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of distinct domain buckets
    #[must_use]
    pub fn domain_count(&self) -> usize {
        self.buckets.len()
    }

    /// Cookies to send with a request to `url` at unix time `now`
    #[must_use]
    pub fn cookies_for(&self, url: &Url, now: u64) -> Vec<&Cookie> {
        let Some(host) = url.host_str() else {
            return Vec::new();
        };
        let host = host.to_ascii_lowercase();
        let is_https = url.scheme() == "https";
        let path = url.path();

        let mut selected: Vec<&Cookie> = Vec::new();
        for key in bucket_keys(&host) {
            let Some(bucket) = self.buckets.get(&key) else {
                continue;
            };
            for cookie in bucket {
                if cookie.is_expired(now)
                    || (cookie.secure && !is_https)
                    || !cookie.path_matches(path)
                    || selected.iter().any(|c| c.name == cookie.name)
                {
                    continue;
                }
                selected.push(cookie);
            }
        }
        selected
    }

    /// `Cookie` header value for a request, `None` when nothing matches
    #[must_use]
    pub fn header_value(&self, url: &Url, now: u64) -> Option<String> {
        let cookies = self.cookies_for(url, now);
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

impl FromIterator<Cookie> for CookieJar {
    fn from_iter<I: IntoIterator<Item = Cookie>>(iter: I) -> Self {
        let mut jar = Self::new();
        for cookie in iter {
            jar.insert(cookie);
        }
        jar
    }
}

/// Bucket keys for a host, most specific first
fn bucket_keys(host: &str) -> Vec<String> {
    let mut keys = vec![host.to_string(), format!(".{host}")];

    let labels: Vec<&str> = host.split('.').collect();
    // Parent domains down to the registrable domain (last two labels)
    for start in 1..labels.len().saturating_sub(1) {
        keys.push(format!(".{}", labels[start..].join(".")));
    }
    keys
}
