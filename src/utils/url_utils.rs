//! URL resolution and canonicalization.
//!
//! Every reference found in a document goes through [`UrlResolver::resolve`]
//! before it is fetched, so the resource cache key is stable no matter how a
//! reference was spelled in different documents.

use url::Url;

/// Query parameter prefix stripped during canonicalization
const TRACKING_QUERY_PREFIX: &str = "utm_";

/// Resolves references found in one document against that document's base URL
#[derive(Debug, Clone, Copy)]
pub struct UrlResolver<'a> {
    base: &'a Url,
    neutralize_javascript: bool,
}

impl<'a> UrlResolver<'a> {
    #[must_use]
    pub fn new(base: &'a Url) -> Self {
        Self {
            base,
            neutralize_javascript: false,
        }
    }

    /// Turn `javascript:` references into `#` (used when JS is disabled)
    #[must_use]
    pub fn neutralize_javascript(mut self, neutralize: bool) -> Self {
        self.neutralize_javascript = neutralize;
        self
    }

    #[must_use]
    pub fn base(&self) -> &Url {
        self.base
    }

    /// Resolve a raw reference to its absolute canonical form
    ///
    /// - empty references resolve to the empty string
    /// - `data:` URIs and pure fragments are returned unchanged
    /// - `javascript:` becomes `#` when neutralization is on, otherwise unchanged
    /// - absolute URLs are canonicalized
    /// - relative URLs are joined onto the base, then canonicalized
    #[must_use]
    pub fn resolve(&self, reference: &str) -> String {
        let reference = reference.trim();
        if reference.is_empty() {
            return String::new();
        }

        if starts_with_ignore_case(reference, "data:") || reference.starts_with('#') {
            return reference.to_string();
        }

        if starts_with_ignore_case(reference, "javascript:") {
            return if self.neutralize_javascript {
                "#".to_string()
            } else {
                reference.to_string()
            };
        }

        if let Some(absolute) = parse_absolute(reference) {
            return canonicalize(absolute).to_string();
        }

        match self.base.join(reference) {
            Ok(joined) if joined.has_host() => canonicalize(joined).to_string(),
            Ok(joined) => joined.to_string(),
            Err(e) => {
                log::debug!("Cannot resolve '{reference}' against {}: {e}", self.base);
                reference.to_string()
            }
        }
    }
}

/// Check if a URL is a valid absolute URL: it parses and has a scheme and a host
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    parse_absolute(url.trim()).is_some()
}

/// Parse an absolute URL with a non-empty scheme and host
#[must_use]
pub fn parse_absolute(url: &str) -> Option<Url> {
    let parsed = Url::parse(url).ok()?;
    let has_host = parsed.host_str().is_some_and(|host| !host.is_empty());
    (!parsed.scheme().is_empty() && has_host).then_some(parsed)
}

/// Strip the fragment and any `utm_*` query parameters
///
/// Other query parameters keep their order. A query left empty is removed.
#[must_use]
pub fn canonicalize(mut url: Url) -> Url {
    url.set_fragment(None);

    // Filter raw segments so the remaining parameters keep their encoding
    if let Some(query) = url.query().map(str::to_string) {
        let segments: Vec<&str> = query.split('&').collect();
        let kept: Vec<&str> = segments
            .iter()
            .copied()
            .filter(|segment| {
                let key = segment.split('=').next().unwrap_or_default();
                !key.starts_with(TRACKING_QUERY_PREFIX)
            })
            .collect();

        if kept.len() != segments.len() {
            let kept = kept.join("&");
            url.set_query((!kept.is_empty()).then_some(kept.as_str()));
        }
    }

    url
}

/// Canonical cache key for an absolute URL, `None` when the URL is not valid
#[must_use]
pub fn canonical_key(url: &str) -> Option<String> {
    parse_absolute(url.trim()).map(|parsed| canonicalize(parsed).to_string())
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
