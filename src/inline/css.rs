//! CSS processing: find every `url(...)` and `@import "..."` reference and
//! replace it with the embedded form

use std::collections::HashMap;

use cssparser::{ParseError, Parser, ParserInput, Token};
use futures::future::try_join_all;

use super::context::{DocumentScope, RunContext};
use super::downloaders::embed_reference;
use super::types::ResourceKind;
use crate::errors::Result;

/// Byte range of one URL reference inside a stylesheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlSpan {
    pub start: usize,
    pub end: usize,
    pub url: String,
    /// `@import` target, fetched as a stylesheet
    pub import: bool,
}

/// Locate URL references with a CSS tokenizer, so strings and comments that
/// merely contain `url(` are left alone
#[must_use]
pub fn collect_url_spans(css: &str) -> Vec<UrlSpan> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut spans = Vec::new();
    collect_from_parser(&mut parser, &mut spans);
    spans
}

fn collect_from_parser<'i>(parser: &mut Parser<'i, '_>, spans: &mut Vec<UrlSpan>) {
    let mut after_import = false;

    loop {
        let start = parser.position().byte_index();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::WhiteSpace(_) | Token::Comment(_) => continue,
            Token::AtKeyword(ref name) => {
                after_import = name.eq_ignore_ascii_case("import");
                continue;
            }
            Token::QuotedString(ref value) if after_import => spans.push(UrlSpan {
                start,
                end: parser.position().byte_index(),
                url: value.to_string(),
                import: true,
            }),
            Token::UnquotedUrl(ref value) => spans.push(UrlSpan {
                start,
                end: parser.position().byte_index(),
                url: value.to_string(),
                import: after_import,
            }),
            Token::Function(ref name) if name.eq_ignore_ascii_case("url") => {
                let url: std::result::Result<String, ParseError<'i, ()>> = parser
                    .parse_nested_block(|nested| {
                        nested
                            .expect_string()
                            .map(|value| value.to_string())
                            .map_err(Into::into)
                    });
                if let Ok(url) = url {
                    spans.push(UrlSpan {
                        start,
                        end: parser.position().byte_index(),
                        url,
                        import: after_import,
                    });
                }
            }
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                let _ = parser.parse_nested_block(|nested| {
                    collect_from_parser(nested, spans);
                    Ok::<_, ParseError<'i, ()>>(())
                });
            }
            _ => {}
        }

        after_import = false;
    }
}

/// Replace each span with `url("<reference>")`; spans without a reference stay
fn splice(css: &str, spans: &[UrlSpan], references: &HashMap<(String, bool), String>) -> String {
    let mut output = String::with_capacity(css.len());
    let mut cursor = 0;

    for span in spans {
        let Some(reference) = references.get(&(span.url.clone(), span.import)) else {
            continue;
        };
        output.push_str(&css[cursor..span.start]);
        output.push_str("url(\"");
        output.push_str(&reference.replace('"', "%22"));
        output.push_str("\")");
        cursor = span.end;
    }

    output.push_str(&css[cursor..]);
    output
}

/// Embed every resource a stylesheet references
///
/// `scope` is the stylesheet's own scope: relative references resolve against
/// its URL, and directory-mode paths are relative to its mirrored location.
///
/// # Errors
///
/// The first subresource error when errors are not tolerated, or
/// [`ArchiveError::Canceled`](crate::errors::ArchiveError::Canceled).
pub async fn process_css(ctx: &RunContext, css: &str, scope: &DocumentScope) -> Result<String> {
    let spans = collect_url_spans(css);
    if spans.is_empty() {
        return Ok(css.to_string());
    }

    let mut unique: Vec<(String, bool)> = Vec::new();
    for span in &spans {
        let key = (span.url.clone(), span.import);
        if !unique.contains(&key) {
            unique.push(key);
        }
    }

    let embedded = try_join_all(unique.iter().map(|(url, import)| async move {
        let kind = if *import {
            ResourceKind::Stylesheet
        } else {
            ResourceKind::Asset
        };
        embed_reference(ctx, url, scope, kind).await
    }))
    .await?;

    let references: HashMap<(String, bool), String> = unique
        .into_iter()
        .zip(embedded)
        .filter_map(|(key, reference)| reference.map(|reference| (key, reference)))
        .collect();

    Ok(splice(css, &spans, &references))
}
