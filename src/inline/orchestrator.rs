//! Archival orchestration
//!
//! Every HTML document goes through three phases:
//! 1. parse, normalize, mark resource-bearing nodes and snapshot them (sync)
//! 2. process all snapshots concurrently (async)
//! 3. reparse, apply the edits to the marked nodes and serialize (sync)
//!
//! kuchiki documents are `!Send`, so they only live inside phases 1 and 3.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, try_join_all};
use kuchiki::NodeRef;
use kuchiki::traits::TendrilSink;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::context::{DocumentScope, RunContext};
use super::dom::{
    all_elements, attributes, create_element, elements_by_tag, get_attr, has_attr, has_tag,
    remove_attr, serialize, set_attr, set_text, tag_name,
};
use super::downloaders::download;
use super::normalize::{effective_base, normalize, remove_base_elements};
use super::processors::{MEDIA_TAGS, process_task};
use super::types::{
    ArchiveOutput, ArchiveRequest, NodeEdit, PendingTask, Resource, ResourceOutcome, TaskEdits,
};
use crate::config::ArchiveConfig;
use crate::errors::{ArchiveError, DocumentKind, Result};
use crate::fetch::{FetchError, Fetcher, HttpFetcher};
use crate::utils::constants::RESOURCE_MARKER_ATTR;
use crate::utils::mime;

/// Content type of every archived HTML document
pub const ARCHIVE_CONTENT_TYPE: &str = "text/html; charset=utf-8";

const CONTENT_SECURITY_POLICIES: &[&str] = &[
    "default-src 'unsafe-inline' 'self' data:;",
    "connect-src 'none';",
];

/// Tags that carry subresources regardless of their attributes
const RESOURCE_TAGS: &[&str] = &["style", "script", "iframe", "embed", "object"];

/// Archives web pages with one configuration
///
/// Each call to [`Archiver::archive`] is an independent run with its own
/// cache and download slots.
pub struct Archiver {
    config: Arc<ArchiveConfig>,
    fetcher: Option<Arc<dyn Fetcher>>,
    cancel: CancellationToken,
}

impl Archiver {
    #[must_use]
    pub fn new(config: ArchiveConfig) -> Self {
        Self {
            config: Arc::new(config),
            fetcher: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `fetcher` instead of an [`HttpFetcher`] built per run
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Token that cancels every run of this archiver, current and future
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Archive one page
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::InvalidRequest`] for a bad configuration or root URL
    /// - [`ArchiveError::Fetch`] when the root, or a subresource in strict mode, fails
    /// - [`ArchiveError::Canceled`] when canceled through the token
    pub async fn archive(&self, request: ArchiveRequest) -> Result<ArchiveOutput> {
        self.config.validate()?;
        let root_url = request.root_url()?;

        let fetcher: Arc<dyn Fetcher> = match &self.fetcher {
            Some(fetcher) => Arc::clone(fetcher),
            None => Arc::new(
                HttpFetcher::new(&self.config, request.cookies.clone())
                    .map_err(|e| ArchiveError::fetch(root_url.as_str(), e))?,
            ),
        };
        let ctx = RunContext::new(Arc::clone(&self.config), fetcher, self.cancel.child_token());

        let root = match request.input {
            Some(input) => input,
            None => fetch_root(&ctx, &root_url).await?,
        };
        let content_type = if root.content_type.trim().is_empty() {
            mime::sniff_content_type(&root.content, root_url.path())
        } else {
            root.content_type.clone()
        };

        if !mime::is_html(&content_type) {
            log::info!("{root_url} is {content_type}, returned unchanged");
            return Ok(ArchiveOutput {
                content: root.content.to_vec(),
                content_type,
            });
        }

        let location = ctx.output.entry_location(self.config.entry_file_name());
        let scope = DocumentScope::root(root_url.clone(), location.clone());
        let html = String::from_utf8_lossy(&root.content).into_owned();
        let archived = process_html(&ctx, html, scope).await?;

        if let Some(path) = location
            && let Err(e) = ctx.output.write_entry(&path, archived.as_bytes()).await
        {
            log::warn!("{e}");
        }

        log::info!("Archived {root_url} with {} subresources", ctx.cache.len());
        Ok(ArchiveOutput {
            content: archived.into_bytes(),
            content_type: ARCHIVE_CONTENT_TYPE.to_string(),
        })
    }
}

/// The root is fetched without size cap, any failure is fatal
async fn fetch_root(ctx: &RunContext, root_url: &Url) -> Result<Resource> {
    match download(ctx, root_url, None, None).await? {
        ResourceOutcome::Fetched(resource) => Ok(resource),
        ResourceOutcome::Skipped(reason) => Err(ArchiveError::fetch(
            root_url.as_str(),
            FetchError::Body(reason.to_string()),
        )),
    }
}

/// Archive one HTML document and everything it references
pub(crate) fn process_html(
    ctx: &RunContext,
    html: String,
    scope: DocumentScope,
) -> BoxFuture<'_, Result<String>> {
    async move {
        let parse_error =
            |e: std::io::Error| ArchiveError::parse(scope.url.as_str(), DocumentKind::Html, e.to_string());

        let prepared = prepare_document(ctx.config(), &html, &scope.url).map_err(parse_error)?;
        let scope = scope.clone().with_base(prepared.base);

        log::debug!("{}: {} resource nodes", scope.url, prepared.tasks.len());
        let edits = try_join_all(
            prepared
                .tasks
                .iter()
                .map(|task| process_task(ctx, task, &scope)),
        )
        .await?;

        let source_url = (ctx.output.is_single_file() && ctx.config.content_security_policy())
            .then_some(&scope.url);
        apply_edits(&prepared.html, edits, source_url).map_err(parse_error)
    }
    .boxed()
}

/// Output of phase 1
#[derive(Debug, Clone)]
pub(crate) struct PreparedDocument {
    /// Normalized HTML with marker attributes on resource-bearing nodes
    pub html: String,
    pub base: Url,
    pub tasks: Vec<PendingTask>,
}

fn is_resource_bearing(node: &NodeRef) -> bool {
    if get_attr(node, "style").is_some_and(|style| !style.trim().is_empty()) {
        return true;
    }
    if has_tag(node, &["link"]) {
        let rel = get_attr(node, "rel").unwrap_or_default().to_ascii_lowercase();
        return rel.contains("icon") || rel.contains("stylesheet");
    }
    has_tag(node, RESOURCE_TAGS) || has_tag(node, MEDIA_TAGS)
}

pub(crate) fn prepare_document(
    config: &ArchiveConfig,
    html: &str,
    document_url: &Url,
) -> std::io::Result<PreparedDocument> {
    let document = kuchiki::parse_html().one(html);

    let base = effective_base(&document, document_url);
    normalize(&document, config, &base);
    remove_base_elements(&document);

    let elements = all_elements(&document);
    for element in &elements {
        remove_attr(element, RESOURCE_MARKER_ATTR);
    }

    let mut tasks = Vec::new();
    for (id, node) in elements.iter().filter(|node| is_resource_bearing(node)).enumerate() {
        let tag = tag_name(node).unwrap_or_default();
        let text = if tag == "style" || tag == "script" {
            node.text_contents()
        } else {
            String::new()
        };
        tasks.push(PendingTask {
            id,
            tag,
            attrs: attributes(node),
            text,
        });
        set_attr(node, RESOURCE_MARKER_ATTR, id.to_string());
    }

    Ok(PreparedDocument {
        html: serialize(&document)?,
        base,
        tasks,
    })
}

/// Phase 3: apply edits by marker, drop the markers, add meta tags when
/// `source_url` is given
pub(crate) fn apply_edits(
    html: &str,
    edits: Vec<TaskEdits>,
    source_url: Option<&Url>,
) -> std::io::Result<String> {
    let document = kuchiki::parse_html().one(html);
    let mut by_id: HashMap<usize, Vec<NodeEdit>> =
        edits.into_iter().map(|task| (task.id, task.edits)).collect();

    for node in all_elements(&document) {
        let Some(id) = get_attr(&node, RESOURCE_MARKER_ATTR) else {
            continue;
        };
        remove_attr(&node, RESOURCE_MARKER_ATTR);
        if let Some(edits) = id.parse().ok().and_then(|id: usize| by_id.remove(&id)) {
            for edit in edits {
                apply_edit(&node, edit);
            }
        }
    }

    if let Some(url) = source_url {
        insert_meta_tags(&document, url);
    }

    serialize(&document)
}

fn apply_edit(node: &NodeRef, edit: NodeEdit) {
    match edit {
        NodeEdit::SetAttribute(name, value) => set_attr(node, &name, value),
        NodeEdit::RemoveAttribute(name) => remove_attr(node, &name),
        NodeEdit::SetText(text) => set_text(node, &text),
        NodeEdit::ReplaceWithStyle(css) => {
            let Some(style) = create_element(r#"<style type="text/css"></style>"#, "style") else {
                return;
            };
            if let Some(media) = get_attr(node, "media") {
                set_attr(&style, "media", media);
            }
            set_text(&style, &css);
            node.insert_before(style);
            node.detach();
        }
    }
}

fn is_replaced_meta(meta: &NodeRef) -> bool {
    let http_equiv = get_attr(meta, "http-equiv").unwrap_or_default();
    has_attr(meta, "charset")
        || http_equiv.eq_ignore_ascii_case("content-type")
        || http_equiv.eq_ignore_ascii_case("content-security-policy")
        || get_attr(meta, "property").as_deref() == Some("source:url")
}

/// Prepend charset, source URL and the policies that block network access
fn insert_meta_tags(document: &NodeRef, source_url: &Url) {
    let Some(head) = elements_by_tag(document, &["head"]).into_iter().next() else {
        return;
    };

    for meta in elements_by_tag(document, &["meta"]) {
        if is_replaced_meta(&meta) {
            meta.detach();
        }
    }

    let mut metas: Vec<Vec<(&str, &str)>> = vec![
        vec![("charset", "utf-8")],
        vec![("property", "source:url"), ("content", source_url.as_str())],
    ];
    for policy in CONTENT_SECURITY_POLICIES {
        metas.push(vec![
            ("http-equiv", "Content-Security-Policy"),
            ("content", policy),
        ]);
    }

    for attrs in metas.into_iter().rev() {
        let Some(meta) = create_element("<meta>", "meta") else {
            continue;
        };
        for (name, value) in attrs {
            set_attr(&meta, name, value);
        }
        head.prepend(meta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn config() -> ArchiveConfig {
        ArchiveConfig::builder().single_file().build().unwrap()
    }

    #[test]
    fn marks_resource_bearing_nodes() {
        let html = r#"<html><head><link rel="stylesheet" href="s.css"><link rel="canonical" href="/"></head>
            <body><p style="color:red">x</p><p>y</p><img src="a.png"><iframe src="f.html"></iframe></body></html>"#;
        let prepared = prepare_document(&config(), html, &url("https://x.test/")).unwrap();

        let tags: Vec<_> = prepared.tasks.iter().map(|task| task.tag.as_str()).collect();
        assert_eq!(tags, ["link", "p", "img", "iframe"]);
        assert_eq!(prepared.tasks[2].attr("src"), Some("https://x.test/a.png"));
        assert_eq!(prepared.html.matches(RESOURCE_MARKER_ATTR).count(), 4);
    }

    #[test]
    fn base_element_drives_resolution_and_is_removed() {
        let html = r#"<head><base href="https://cdn.test/assets/"></head><body><img src="a.png"></body>"#;
        let prepared = prepare_document(&config(), html, &url("https://x.test/page")).unwrap();

        assert_eq!(prepared.base.as_str(), "https://cdn.test/assets/");
        assert_eq!(prepared.tasks[0].attr("src"), Some("https://cdn.test/assets/a.png"));
        assert!(!prepared.html.contains("<base"));
    }

    #[test]
    fn preexisting_markers_are_ignored() {
        let html = r#"<p data-archive-ref="7">x</p><img src="a.png">"#;
        let prepared = prepare_document(&config(), html, &url("https://x.test/")).unwrap();
        assert_eq!(prepared.tasks.len(), 1);
        assert_eq!(prepared.tasks[0].id, 0);
    }

    #[test]
    fn applies_edits_and_removes_markers() {
        let html = r#"<html><head><link rel="stylesheet" media="print" href="s.css" data-archive-ref="0"></head>
            <body><img src="a.png" data-archive-ref="1"><script src="a.js" data-archive-ref="2"></script></body></html>"#;
        let edits = vec![
            TaskEdits {
                id: 0,
                edits: vec![NodeEdit::ReplaceWithStyle("a{}".to_string())],
            },
            TaskEdits {
                id: 1,
                edits: vec![NodeEdit::SetAttribute(
                    "src".to_string(),
                    "data:image/png;base64,/9g=".to_string(),
                )],
            },
            TaskEdits {
                id: 2,
                edits: vec![
                    NodeEdit::SetText("run()".to_string()),
                    NodeEdit::RemoveAttribute("src".to_string()),
                ],
            },
        ];

        let output = apply_edits(html, edits, None).unwrap();

        assert!(!output.contains(RESOURCE_MARKER_ATTR));
        assert!(output.contains(r#"<style media="print" type="text/css">a{}</style>"#));
        assert!(!output.contains("<link"));
        assert!(output.contains(r#"src="data:image/png;base64,/9g=""#));
        assert!(output.contains("<script>run()</script>"));
    }

    #[test]
    fn inserts_meta_tags_in_order() {
        let html = r#"<html><head><meta charset="latin1"><title>t</title></head><body></body></html>"#;
        let output = apply_edits(html, Vec::new(), Some(&url("https://x.test/page"))).unwrap();

        let charset = output.find(r#"<meta charset="utf-8">"#).unwrap();
        let source = output
            .find(r#"<meta content="https://x.test/page" property="source:url">"#)
            .unwrap();
        let default_src = output.find("default-src 'unsafe-inline' 'self' data:;").unwrap();
        let connect_src = output.find("connect-src 'none';").unwrap();
        let title = output.find("<title>").unwrap();

        assert!(charset < source && source < default_src && default_src < connect_src);
        assert!(connect_src < title);
        assert!(!output.contains("latin1"));
    }

    #[test]
    fn meta_tags_are_not_duplicated() {
        let once = apply_edits("<p>x</p>", Vec::new(), Some(&url("https://x.test/"))).unwrap();
        let twice = apply_edits(&once, Vec::new(), Some(&url("https://x.test/"))).unwrap();
        assert_eq!(once, twice);
    }
}
