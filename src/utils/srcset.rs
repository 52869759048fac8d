//! `srcset` attribute parsing.
//!
//! Candidates are split the way browsers do it: a URL runs until whitespace,
//! so commas inside `data:` URLs survive, and an optional descriptor
//! (`480w`, `2x`, `1.5x`) runs until the next comma.

/// One image candidate from a `srcset` list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcsetCandidate {
    pub url: String,
    pub descriptor: Option<String>,
}

impl SrcsetCandidate {
    /// Render this candidate with a replacement URL, keeping the descriptor
    #[must_use]
    pub fn render_with(&self, url: &str) -> String {
        match &self.descriptor {
            Some(descriptor) => format!("{url} {descriptor}"),
            None => url.to_string(),
        }
    }
}

/// Split a `srcset` value into candidates
#[must_use]
pub fn parse_srcset(srcset: &str) -> Vec<SrcsetCandidate> {
    let mut candidates = Vec::new();
    let mut rest = srcset;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }

        let url_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let raw_url = &rest[..url_end];
        rest = &rest[url_end..];

        // "a.png, b.png 2x": the comma belongs to the separator, not the URL
        let url = raw_url.trim_end_matches(',');
        if url.len() != raw_url.len() {
            candidates.push(SrcsetCandidate {
                url: url.to_string(),
                descriptor: None,
            });
            continue;
        }

        let descriptor_end = rest.find(',').unwrap_or(rest.len());
        let descriptor = rest[..descriptor_end].trim();
        rest = &rest[descriptor_end..];

        candidates.push(SrcsetCandidate {
            url: url.to_string(),
            descriptor: (!descriptor.is_empty()).then(|| descriptor.to_string()),
        });
    }

    candidates
}

/// Rebuild a `srcset` value after mapping every candidate URL
pub fn rewrite_srcset<F>(srcset: &str, mut map_url: F) -> String
where
    F: FnMut(&str) -> String,
{
    parse_srcset(srcset)
        .iter()
        .map(|candidate| candidate.render_with(&map_url(&candidate.url)))
        .collect::<Vec<_>>()
        .join(", ")
}
