//! Subresource resolution: classify, resolve, download once, recurse into
//! CSS and HTML, cache

use futures::future::{BoxFuture, FutureExt};
use futures::StreamExt;
use url::Url;

use super::context::{DocumentScope, RunContext};
use super::css::process_css;
use super::orchestrator::process_html;
use super::types::{Resource, ResourceKind, ResourceOutcome, SkipReason};
use crate::errors::{ArchiveError, Result};
use crate::fetch::{FetchError, FetchRequest};
use crate::utils::mime;
use crate::utils::url_utils::{UrlResolver, parse_absolute};

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Resolve one reference found in the document of `scope`
///
/// Skips empty, `data:`, fragment and invalid references. HTML and CSS are
/// processed recursively before being cached. When errors are tolerated, a
/// failure becomes [`SkipReason::Failed`] and the reference stays as is.
pub(crate) fn process_url<'a>(
    ctx: &'a RunContext,
    raw: &'a str,
    scope: &'a DocumentScope,
    kind: ResourceKind,
) -> BoxFuture<'a, Result<ResourceOutcome>> {
    async move {
        let reference = raw.trim();
        if reference.is_empty() {
            return Ok(ResourceOutcome::Skipped(SkipReason::Empty));
        }
        if starts_with_ignore_case(reference, "data:") {
            return Ok(ResourceOutcome::Skipped(SkipReason::DataUrl));
        }
        if reference.starts_with('#') {
            return Ok(ResourceOutcome::Skipped(SkipReason::Fragment));
        }

        let resolved = UrlResolver::new(&scope.base).resolve(reference);
        let Some(url) = parse_absolute(&resolved) else {
            log::debug!("Skipping invalid reference '{reference}' in {}", scope.url);
            return Ok(ResourceOutcome::Skipped(SkipReason::Invalid));
        };

        if ctx.cancel.is_cancelled() {
            return Err(ArchiveError::Canceled);
        }

        if let Some(resource) = ctx.cache.lookup(url.as_str()) {
            ctx.log_resource(url.as_str(), &scope.url, true);
            return Ok(ResourceOutcome::Fetched(resource));
        }

        if kind != ResourceKind::Asset && scope.depth >= ctx.config.max_depth() {
            log::debug!("Not descending into {url}: depth {} reached", scope.depth);
            return Ok(ResourceOutcome::Skipped(SkipReason::DepthLimit));
        }

        match fetch_and_process(ctx, &url, scope, kind).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_canceled() => Err(e),
            Err(e) if ctx.config.tolerate_errors() => {
                log::warn!("Skipping {url}: {e}");
                Ok(ResourceOutcome::Skipped(SkipReason::Failed))
            }
            Err(e) => Err(e),
        }
    }
    .boxed()
}

/// Resolve a reference and turn the result into the string written back into
/// the document, `None` when the reference stays untouched
pub(crate) async fn embed_reference(
    ctx: &RunContext,
    raw: &str,
    scope: &DocumentScope,
    kind: ResourceKind,
) -> Result<Option<String>> {
    let resolved = UrlResolver::new(&scope.base).resolve(raw);
    let ResourceOutcome::Fetched(resource) = process_url(ctx, &resolved, scope, kind).await? else {
        return Ok(None);
    };
    let Some(url) = parse_absolute(&resolved) else {
        return Ok(None);
    };
    Ok(Some(
        ctx.output
            .transform(&url, &resource, scope.location.as_deref())
            .await,
    ))
}

async fn fetch_and_process(
    ctx: &RunContext,
    url: &Url,
    scope: &DocumentScope,
    kind: ResourceKind,
) -> Result<ResourceOutcome> {
    let key = url.as_str();
    let max_size = Some(ctx.config.max_resource_size());
    let (downloaded, fetched_here) = ctx
        .cache
        .download_once(key, || download(ctx, url, Some(scope.url.as_str()), max_size))
        .await?;

    // Waiters on another call's download report a cache hit
    if !fetched_here && let Some(resource) = ctx.cache.lookup(key) {
        ctx.log_resource(key, &scope.url, true);
        return Ok(ResourceOutcome::Fetched(resource));
    }

    let ResourceOutcome::Fetched(raw) = downloaded else {
        return Ok(downloaded);
    };

    let treat_as_css = kind == ResourceKind::Stylesheet || mime::is_css(&raw.content_type);
    let treat_as_html = kind == ResourceKind::Document && mime::is_html(&raw.content_type);

    if (treat_as_css || treat_as_html) && scope.depth >= ctx.config.max_depth() {
        return Ok(ResourceOutcome::Skipped(SkipReason::DepthLimit));
    }

    let resource = if treat_as_css {
        // Legacy encodings still tokenize, invalid bytes become U+FFFD
        let css = String::from_utf8_lossy(&raw.content).into_owned();
        let content_type = "text/css";
        let child = scope.child(url.clone(), ctx.output.location_for(url, content_type));
        let processed = process_css(ctx, &css, &child).await?;
        Resource::new(processed.into_bytes(), content_type)
    } else if treat_as_html {
        let html = String::from_utf8_lossy(&raw.content).into_owned();
        let child = scope.child(url.clone(), ctx.output.location_for(url, &raw.content_type));
        let processed = process_html(ctx, html, child).await?;
        Resource::new(processed.into_bytes(), raw.content_type.clone())
    } else {
        raw
    };

    ctx.cache.store(key, resource);
    ctx.log_resource(key, &scope.url, !fetched_here);

    match ctx.cache.lookup(key) {
        Some(stored) => Ok(ResourceOutcome::Fetched(stored)),
        None => Ok(ResourceOutcome::Skipped(SkipReason::Failed)),
    }
}

/// Fetch `url` under a download slot, honoring cancellation and the size cap
///
/// The slot is held until the body is read, never during HTML or CSS
/// processing. An empty `Content-Type` is sniffed from the bytes.
///
/// # Errors
///
/// [`ArchiveError::Fetch`] on transport errors and non-2xx statuses,
/// [`ArchiveError::Canceled`] when the run is canceled.
pub(crate) async fn download(
    ctx: &RunContext,
    url: &Url,
    referer: Option<&str>,
    max_size: Option<usize>,
) -> Result<ResourceOutcome> {
    let permit = tokio::select! {
        biased;
        () = ctx.cancel.cancelled() => return Err(ArchiveError::Canceled),
        permit = ctx.downloads.acquire() => permit.map_err(|_| ArchiveError::Canceled)?,
    };

    let mut request = FetchRequest::new(url.clone());
    if let Some(referer) = referer {
        request = request.with_referer(referer);
    }

    let response = tokio::select! {
        biased;
        () = ctx.cancel.cancelled() => return Err(ArchiveError::Canceled),
        response = ctx.fetcher.fetch(request) => response.map_err(|e| ArchiveError::fetch(url.as_str(), e))?,
    };

    if !response.is_success() {
        return Err(ArchiveError::fetch(
            url.as_str(),
            FetchError::HttpStatus {
                status: response.status,
            },
        ));
    }

    let declared_type = response
        .content_type
        .filter(|content_type| !content_type.trim().is_empty());
    let mut body = response.body;
    let mut content = Vec::new();

    loop {
        let chunk = tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => return Err(ArchiveError::Canceled),
            chunk = body.next() => chunk,
        };
        let Some(chunk) = chunk else {
            break;
        };
        content.extend_from_slice(&chunk.map_err(|e| ArchiveError::fetch(url.as_str(), e))?);

        if let Some(limit) = max_size
            && content.len() > limit
        {
            log::warn!("Skipping {url}: body exceeds {limit} bytes");
            return Ok(ResourceOutcome::Skipped(SkipReason::TooLarge));
        }
    }
    drop(permit);

    let content_type =
        declared_type.unwrap_or_else(|| mime::sniff_content_type(&content, url.path()));
    Ok(ResourceOutcome::Fetched(Resource::new(content, content_type)))
}
