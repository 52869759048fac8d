//! Per-node subresource processing
//!
//! Works on [`PendingTask`] snapshots, never on live DOM nodes, and answers
//! with the [`NodeEdit`]s to apply once every task is done.

use futures::future::try_join_all;

use super::context::{DocumentScope, RunContext};
use super::css::process_css;
use super::downloaders::{embed_reference, process_url};
use super::types::{NodeEdit, PendingTask, ResourceKind, ResourceOutcome, TaskEdits};
use crate::errors::Result;
use crate::utils::srcset::parse_srcset;

/// Tags whose `src`, `poster` and `srcset` reference media
pub(crate) const MEDIA_TAGS: &[&str] = &["img", "picture", "figure", "video", "audio", "source"];

/// `</style` inside raw text would close the element early
fn escape_style_text(css: &str) -> String {
    css.replace("</style", "<\\/style")
}

/// Produce the edits for one resource-bearing node
///
/// # Errors
///
/// The first subresource error when errors are not tolerated, or cancellation.
pub(crate) async fn process_task(
    ctx: &RunContext,
    task: &PendingTask,
    scope: &DocumentScope,
) -> Result<TaskEdits> {
    let mut edits = Vec::new();

    if let Some(style) = task.non_blank_attr("style") {
        let css = process_css(ctx, style, scope).await?;
        edits.push(NodeEdit::SetAttribute("style".to_string(), css));
    }

    match task.tag.as_str() {
        "link" => edits.extend(process_link(ctx, task, scope).await?),
        "script" => edits.extend(process_script(ctx, task, scope).await?),
        "iframe" | "embed" => {
            edits.extend(process_attr(ctx, task, scope, "src", ResourceKind::Document).await?);
        }
        "object" => {
            edits.extend(process_attr(ctx, task, scope, "data", ResourceKind::Document).await?);
        }
        "style" => {
            let css = process_css(ctx, &task.text, scope).await?;
            edits.push(NodeEdit::SetText(escape_style_text(&css)));
        }
        tag if MEDIA_TAGS.contains(&tag) => edits.extend(process_media(ctx, task, scope).await?),
        _ => {}
    }

    Ok(TaskEdits { id: task.id, edits })
}

/// Embed the reference in `attr`, leaving the node alone when it is skipped
async fn process_attr(
    ctx: &RunContext,
    task: &PendingTask,
    scope: &DocumentScope,
    attr: &str,
    kind: ResourceKind,
) -> Result<Option<NodeEdit>> {
    let Some(value) = task.attr(attr) else {
        return Ok(None);
    };
    let reference = embed_reference(ctx, value, scope, kind).await?;
    Ok(reference.map(|reference| NodeEdit::SetAttribute(attr.to_string(), reference)))
}

async fn process_link(ctx: &RunContext, task: &PendingTask, scope: &DocumentScope) -> Result<Vec<NodeEdit>> {
    let rel = task.attr("rel").unwrap_or_default().to_ascii_lowercase();

    if rel.contains("stylesheet") {
        if !ctx.output.is_single_file() {
            return Ok(process_attr(ctx, task, scope, "href", ResourceKind::Stylesheet)
                .await?
                .into_iter()
                .collect());
        }

        let Some(href) = task.attr("href") else {
            return Ok(Vec::new());
        };
        return match process_url(ctx, href, scope, ResourceKind::Stylesheet).await? {
            ResourceOutcome::Fetched(resource) => {
                let css = String::from_utf8_lossy(&resource.content);
                Ok(vec![NodeEdit::ReplaceWithStyle(escape_style_text(&css))])
            }
            ResourceOutcome::Skipped(_) => Ok(Vec::new()),
        };
    }

    if rel.contains("icon") {
        return Ok(process_attr(ctx, task, scope, "href", ResourceKind::Asset)
            .await?
            .into_iter()
            .collect());
    }

    Ok(Vec::new())
}

/// External scripts are inlined as text in single-file mode
async fn process_script(ctx: &RunContext, task: &PendingTask, scope: &DocumentScope) -> Result<Vec<NodeEdit>> {
    let Some(src) = task.non_blank_attr("src") else {
        return Ok(Vec::new());
    };

    if !ctx.output.is_single_file() {
        return Ok(process_attr(ctx, task, scope, "src", ResourceKind::Asset)
            .await?
            .into_iter()
            .collect());
    }

    match process_url(ctx, src, scope, ResourceKind::Asset).await? {
        ResourceOutcome::Fetched(resource) => {
            let script = String::from_utf8_lossy(&resource.content).replace("</script", "<\\/script");
            Ok(vec![
                NodeEdit::SetText(script),
                NodeEdit::RemoveAttribute("src".to_string()),
            ])
        }
        ResourceOutcome::Skipped(_) => Ok(Vec::new()),
    }
}

async fn process_media(ctx: &RunContext, task: &PendingTask, scope: &DocumentScope) -> Result<Vec<NodeEdit>> {
    let (src, poster) = futures::try_join!(
        process_attr(ctx, task, scope, "src", ResourceKind::Asset),
        process_attr(ctx, task, scope, "poster", ResourceKind::Asset),
    )?;
    let mut edits: Vec<NodeEdit> = src.into_iter().chain(poster).collect();

    if let Some(srcset) = task.attr("srcset") {
        let candidates = parse_srcset(srcset);
        let references = try_join_all(
            candidates
                .iter()
                .map(|candidate| embed_reference(ctx, &candidate.url, scope, ResourceKind::Asset)),
        )
        .await?;

        let rewritten = candidates
            .iter()
            .zip(references)
            .map(|(candidate, reference)| match reference {
                Some(reference) => candidate.render_with(&reference),
                None => candidate.render_with(&candidate.url),
            })
            .collect::<Vec<_>>()
            .join(", ");
        edits.push(NodeEdit::SetAttribute("srcset".to_string(), rewritten));
    }

    Ok(edits)
}
