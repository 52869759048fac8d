//! Structural normalization passes, run in order before enumeration
//!
//! 1. remove elements of disabled features, neutralize `javascript:` links
//! 2. unwrap lazy-loaded images (drop empty `<img>`, take images out of `<noscript>`)
//! 3. promote lazy-loading attributes to `src`/`srcset`, clear tiny placeholders
//! 4. rewrite references to absolute canonical URLs
//! 5. strip `integrity` from `<link>`
//! 6. remove comments
//!
//! Later passes rely on earlier ones: pass 4 also absolutizes the attributes
//! promoted by pass 3.

use kuchiki::NodeRef;
use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use super::dom::{
    all_elements, attributes, create_element, element_children, elements_by_tag, get_attr,
    has_attr, has_tag, parse_body, previous_element_sibling, remove_attr, set_attr, tag_name,
};
use super::processors::MEDIA_TAGS;
use crate::config::ArchiveConfig;
use crate::utils::constants::LAZY_IMAGE_EXTENSIONS;
use crate::utils::srcset::rewrite_srcset;
use crate::utils::url_utils::{UrlResolver, parse_absolute};

/// Attribute marking a `<noscript>` revealed as a `<div>`
pub const NOSCRIPT_MARKER_ATTR: &str = "data-archive-noscript";

const EMBED_TAGS: &[&str] = &["iframe", "embed", "object"];

lazy_static! {
    static ref IMAGE_EXTENSION: Regex =
        Regex::new(&format!(r"(?i)\.({LAZY_IMAGE_EXTENSIONS})")).expect("BUG: invalid image extension regex");
    static ref LAZY_SRC: Regex =
        Regex::new(&format!(r"(?i)^\s*\S+\.({LAZY_IMAGE_EXTENSIONS})\S*\s*$"))
            .expect("BUG: invalid lazy src regex");
    static ref LAZY_SRCSET: Regex =
        Regex::new(&format!(r"(?i)\.({LAZY_IMAGE_EXTENSIONS})\s+\d")).expect("BUG: invalid lazy srcset regex");
    static ref BASE64_DATA_URL: Regex =
        Regex::new(r"(?i)^data:\s*([^\s;,]+)\s*;\s*base64\s*,").expect("BUG: invalid data URL regex");
}

/// Run every pass in order; `base` is the document's effective base URL
pub(crate) fn normalize(document: &NodeRef, config: &ArchiveConfig, base: &Url) {
    remove_disabled_features(document, config);
    unwrap_lazy_images(document, config.disable_js());
    promote_lazy_attributes(document, config.placeholder_max_len());

    let resolver = UrlResolver::new(base).neutralize_javascript(config.disable_js());
    absolutize_urls(document, &resolver);

    strip_link_integrity(document);
    remove_comments(document);
}

/// `<base href>` resolved against the document URL, or the document URL itself
pub(crate) fn effective_base(document: &NodeRef, document_url: &Url) -> Url {
    elements_by_tag(document, &["base"])
        .iter()
        .find_map(|base| get_attr(base, "href"))
        .and_then(|href| document_url.join(href.trim()).ok())
        .filter(|url| parse_absolute(url.as_str()).is_some())
        .unwrap_or_else(|| document_url.clone())
}

/// Drop `<base>` once references are absolute, so relative output paths resolve
pub(crate) fn remove_base_elements(document: &NodeRef) {
    for base in elements_by_tag(document, &["base"]) {
        base.detach();
    }
}

fn detach_all(document: &NodeRef, tags: &[&str]) {
    for node in elements_by_tag(document, tags) {
        node.detach();
    }
}

fn strip_event_handlers(root: &NodeRef) {
    for element in all_elements(root) {
        for (name, _) in attributes(&element) {
            if name.to_ascii_lowercase().starts_with("on") {
                remove_attr(&element, &name);
            }
        }
    }
}

fn is_javascript(value: &str) -> bool {
    value
        .trim_start()
        .get(..11)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("javascript:"))
}

fn is_stylesheet_link(node: &NodeRef) -> bool {
    has_tag(node, &["link"])
        && get_attr(node, "rel").is_some_and(|rel| rel.to_ascii_lowercase().contains("stylesheet"))
}

pub(crate) fn remove_disabled_features(document: &NodeRef, config: &ArchiveConfig) {
    if config.disable_js() {
        detach_all(document, &["script"]);
        strip_event_handlers(document);
        for link in elements_by_tag(document, &["a", "area"]) {
            if get_attr(&link, "href").is_some_and(|href| is_javascript(&href)) {
                set_attr(&link, "href", "#");
            }
        }
    }

    if config.disable_css() {
        detach_all(document, &["style"]);
        for link in elements_by_tag(document, &["link"]) {
            if is_stylesheet_link(&link) {
                link.detach();
            }
        }
        for element in all_elements(document) {
            remove_attr(&element, "style");
        }
    }

    if config.disable_embeds() {
        detach_all(document, EMBED_TAGS);
    }

    if config.disable_medias() {
        detach_all(document, MEDIA_TAGS);
    }
}

/// An `<img>`, or a chain of single-child elements without text ending in one
fn is_single_image(node: &NodeRef) -> bool {
    let mut current = node.clone();
    loop {
        if has_tag(&current, &["img"]) {
            return true;
        }
        let children = element_children(&current);
        if children.len() != 1 || !current.text_contents().trim().is_empty() {
            return false;
        }
        current = children[0].clone();
    }
}

fn first_image(node: &NodeRef) -> Option<NodeRef> {
    if has_tag(node, &["img"]) {
        return Some(node.clone());
    }
    elements_by_tag(node, &["img"]).into_iter().next()
}

pub(crate) fn unwrap_lazy_images(document: &NodeRef, reveal_noscript: bool) {
    // Images without any source would otherwise swallow the <noscript> fallback below
    for img in elements_by_tag(document, &["img"]) {
        let keep = attributes(&img).iter().any(|(name, value)| {
            matches!(name.as_str(), "src" | "srcset" | "data-src" | "data-srcset")
                || IMAGE_EXTENSION.is_match(value)
        });
        if !keep {
            img.detach();
        }
    }

    for noscript in elements_by_tag(document, &["noscript"]) {
        let Some(previous) = previous_element_sibling(&noscript) else {
            continue;
        };
        if !is_single_image(&previous) {
            continue;
        }
        let Some(body) = parse_body(&noscript.text_contents()) else {
            continue;
        };
        let children = element_children(&body);
        if children.len() != 1 || !is_single_image(&children[0]) {
            continue;
        }

        let replacement = children[0].clone();
        if let (Some(old_img), Some(new_img)) = (first_image(&previous), first_image(&replacement)) {
            carry_over_image_attributes(&old_img, &new_img);
        }

        replacement.detach();
        previous.insert_before(replacement);
        previous.detach();
        noscript.detach();
    }

    if reveal_noscript {
        for noscript in elements_by_tag(document, &["noscript"]) {
            reveal(&noscript);
        }
    }
}

/// Copy image-like attributes of the placeholder onto the real image,
/// renaming clashes with a `data-old-` prefix
fn carry_over_image_attributes(old_img: &NodeRef, new_img: &NodeRef) {
    for (name, value) in attributes(old_img) {
        if value.is_empty() {
            continue;
        }
        if name != "src" && name != "srcset" && !IMAGE_EXTENSION.is_match(&value) {
            continue;
        }
        if get_attr(new_img, &name).as_deref() == Some(value.as_str()) {
            continue;
        }
        let target = if has_attr(new_img, &name) {
            format!("data-old-{name}")
        } else {
            name
        };
        set_attr(new_img, &target, value);
    }
}

fn reveal(noscript: &NodeRef) {
    let markup = format!(r#"<div {NOSCRIPT_MARKER_ATTR}="true"></div>"#);
    let Some(container) = create_element(&markup, "div") else {
        return;
    };
    if let Some(body) = parse_body(&noscript.text_contents()) {
        for child in body.children().collect::<Vec<_>>() {
            container.append(child);
        }
    }
    detach_all(&container, &["script"]);
    strip_event_handlers(&container);
    noscript.insert_before(container);
    noscript.detach();
}

fn non_empty_attr(node: &NodeRef, name: &str) -> Option<String> {
    get_attr(node, name).filter(|value| !value.trim().is_empty() && value.trim() != "null")
}

pub(crate) fn promote_lazy_attributes(document: &NodeRef, placeholder_max_len: usize) {
    for element in elements_by_tag(document, &["img", "picture", "figure"]) {
        let is_figure = has_tag(&element, &["figure"]);

        if let Some(src) = get_attr(&element, "src") {
            if let Some(captures) = BASE64_DATA_URL.captures(&src) {
                if captures[1].eq_ignore_ascii_case("image/svg+xml") {
                    continue;
                }
                let real_image_elsewhere = attributes(&element)
                    .iter()
                    .any(|(name, value)| name != "src" && IMAGE_EXTENSION.is_match(value));
                let payload_len = src.len() - captures.get(0).map_or(0, |m| m.end());
                if real_image_elsewhere && payload_len < placeholder_max_len {
                    remove_attr(&element, "src");
                }
            }
        }

        if !is_figure {
            if non_empty_attr(&element, "src").is_none()
                && let Some(data_src) = non_empty_attr(&element, "data-src")
            {
                set_attr(&element, "src", data_src);
            }
            if non_empty_attr(&element, "srcset").is_none()
                && let Some(data_srcset) = non_empty_attr(&element, "data-srcset")
            {
                set_attr(&element, "srcset", data_srcset);
            }
        }

        let has_source =
            non_empty_attr(&element, "src").is_some() || non_empty_attr(&element, "srcset").is_some();
        let lazy_class = get_attr(&element, "class")
            .is_some_and(|class| class.to_ascii_lowercase().contains("lazy"));
        if has_source && !lazy_class {
            continue;
        }

        for (name, value) in attributes(&element) {
            if matches!(name.as_str(), "src" | "srcset" | "alt") {
                continue;
            }
            let copy_to = if LAZY_SRCSET.is_match(&value) {
                "srcset"
            } else if LAZY_SRC.is_match(&value) {
                "src"
            } else {
                continue;
            };

            if !is_figure {
                set_attr(&element, copy_to, value);
            } else if elements_by_tag(&element, &["img", "picture"]).is_empty()
                && let Some(img) = create_element("<img>", "img")
            {
                set_attr(&img, copy_to, value);
                element.append(img);
            }
        }
    }
}

pub(crate) fn absolutize_urls(document: &NodeRef, resolver: &UrlResolver<'_>) {
    for element in all_elements(document) {
        let Some(tag) = tag_name(&element) else {
            continue;
        };
        let url_attrs: &[&str] = match tag.as_str() {
            "a" | "link" => &["href"],
            "embed" | "iframe" | "script" => &["src"],
            "object" => &["data"],
            t if MEDIA_TAGS.contains(&t) => &["src", "poster"],
            _ => continue,
        };

        for name in url_attrs {
            if let Some(value) = get_attr(&element, name) {
                let resolved = resolver.resolve(&value);
                if resolved.is_empty() {
                    remove_attr(&element, name);
                } else {
                    set_attr(&element, name, resolved);
                }
            }
        }

        if MEDIA_TAGS.contains(&tag.as_str())
            && let Some(srcset) = get_attr(&element, "srcset")
        {
            set_attr(&element, "srcset", rewrite_srcset(&srcset, |url| resolver.resolve(url)));
        }
    }
}

pub(crate) fn strip_link_integrity(document: &NodeRef) {
    for link in elements_by_tag(document, &["link"]) {
        remove_attr(&link, "integrity");
    }
}

pub(crate) fn remove_comments(document: &NodeRef) {
    let comments: Vec<NodeRef> = document
        .descendants()
        .filter(|node| node.as_comment().is_some())
        .collect();
    for comment in comments {
        comment.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inline::dom::serialize;
    use kuchiki::traits::TendrilSink;

    fn parse(html: &str) -> NodeRef {
        kuchiki::parse_html().one(html)
    }

    fn first(document: &NodeRef, tag: &str) -> NodeRef {
        elements_by_tag(document, &[tag]).remove(0)
    }

    #[test]
    fn disabled_js_removes_scripts_handlers_and_links() {
        let document = parse(
            r#"<body onload="x()"><script>evil()</script><a href="javascript:alert(1)">a</a></body>"#,
        );
        let config = ArchiveConfig::builder().disable_js(true).single_file().build().unwrap();

        remove_disabled_features(&document, &config);

        assert!(elements_by_tag(&document, &["script"]).is_empty());
        assert!(!has_attr(&first(&document, "body"), "onload"));
        assert_eq!(get_attr(&first(&document, "a"), "href").as_deref(), Some("#"));
    }

    #[test]
    fn disabled_css_embeds_and_medias_remove_elements() {
        let document = parse(
            r#"<head><style>a{}</style><link rel="stylesheet" href="s.css"><link rel="icon" href="i.ico"></head>
            <body><p style="color:red">t</p><iframe src="f.html"></iframe><img src="a.png"><video src="v.mp4"></video></body>"#,
        );
        let config = ArchiveConfig::builder()
            .disable_css(true)
            .disable_embeds(true)
            .disable_medias(true)
            .single_file()
            .build()
            .unwrap();

        remove_disabled_features(&document, &config);

        assert!(elements_by_tag(&document, &["style", "iframe", "img", "video"]).is_empty());
        assert_eq!(elements_by_tag(&document, &["link"]).len(), 1);
        assert!(!has_attr(&first(&document, "p"), "style"));
    }

    #[test]
    fn drops_images_without_any_source() {
        let document = parse(r#"<img class="a"><img data-src="b.png"><img alt="photo.jpg">"#);
        unwrap_lazy_images(&document, false);
        assert_eq!(elements_by_tag(&document, &["img"]).len(), 2);
    }

    #[test]
    fn noscript_image_replaces_placeholder() {
        let document = parse(
            r#"<div><img src="placeholder.png" data-src="real.jpg" class="lazy"><noscript><img src="real.jpg"></noscript></div>"#,
        );
        unwrap_lazy_images(&document, false);

        let images = elements_by_tag(&document, &["img"]);
        assert_eq!(images.len(), 1);
        assert!(elements_by_tag(&document, &["noscript"]).is_empty());
        assert_eq!(get_attr(&images[0], "src").as_deref(), Some("real.jpg"));
        assert_eq!(get_attr(&images[0], "data-old-src").as_deref(), Some("placeholder.png"));
        assert_eq!(get_attr(&images[0], "data-src").as_deref(), Some("real.jpg"));
    }

    #[test]
    fn wrapped_noscript_image_replaces_wrapped_placeholder() {
        let document = parse(
            r#"<div><a href="/post"><img src="placeholder.png" data-src="real.jpg"></a><noscript><span><img src="real.jpg" alt="cover"></span></noscript></div>"#,
        );
        unwrap_lazy_images(&document, false);

        let images = elements_by_tag(&document, &["img"]);
        assert_eq!(images.len(), 1);
        assert!(elements_by_tag(&document, &["noscript"]).is_empty());
        assert!(elements_by_tag(&document, &["a"]).is_empty());

        let parent = images[0].parent().unwrap();
        assert_eq!(tag_name(&parent).as_deref(), Some("span"));
        assert_eq!(get_attr(&images[0], "src").as_deref(), Some("real.jpg"));
        assert_eq!(get_attr(&images[0], "alt").as_deref(), Some("cover"));
        assert_eq!(get_attr(&images[0], "data-old-src").as_deref(), Some("placeholder.png"));
        assert_eq!(get_attr(&images[0], "data-src").as_deref(), Some("real.jpg"));
    }

    #[test]
    fn text_beside_the_image_is_not_a_single_image() {
        let document = parse(
            r#"<div><p><img src="placeholder.png">caption</p><noscript><img src="real.jpg"></noscript></div>"#,
        );
        unwrap_lazy_images(&document, false);

        assert_eq!(elements_by_tag(&document, &["noscript"]).len(), 1);
        let img = first(&document, "img");
        assert_eq!(get_attr(&img, "src").as_deref(), Some("placeholder.png"));
    }

    #[test]
    fn reveals_remaining_noscript_when_js_disabled() {
        let document = parse(r#"<body><noscript><p>Enable JS</p></noscript></body>"#);
        unwrap_lazy_images(&document, true);

        let div = first(&document, "div");
        assert_eq!(get_attr(&div, NOSCRIPT_MARKER_ATTR).as_deref(), Some("true"));
        assert_eq!(elements_by_tag(&div, &["p"]).len(), 1);
    }

    #[test]
    fn promotes_data_src_and_lazy_attributes() {
        let document = parse(
            r#"<img data-src="a.png"><img src="x.gif" class="LazyLoad" data-original="b.webp">
            <img data-lazy-srcset="c.jpg 1x, d.jpg 2x"><figure data-url="e.jpeg"></figure>"#,
        );
        promote_lazy_attributes(&document, 133);

        let images = elements_by_tag(&document, &["img"]);
        assert_eq!(get_attr(&images[0], "src").as_deref(), Some("a.png"));
        assert_eq!(get_attr(&images[1], "src").as_deref(), Some("b.webp"));
        assert_eq!(get_attr(&images[2], "srcset").as_deref(), Some("c.jpg 1x, d.jpg 2x"));

        let figure = first(&document, "figure");
        let synthesized = elements_by_tag(&figure, &["img"]);
        assert_eq!(synthesized.len(), 1);
        assert_eq!(get_attr(&synthesized[0], "src").as_deref(), Some("e.jpeg"));
    }

    #[test]
    fn clears_tiny_placeholder_but_keeps_svg() {
        let document = parse(
            r#"<img src="data:image/gif;base64,R0lGODlhAQABAAAAACw=" data-src="real.png">
            <img src="data:image/svg+xml;base64,PHN2Zz4=" data-src="real.png">"#,
        );
        promote_lazy_attributes(&document, 133);

        let images = elements_by_tag(&document, &["img"]);
        assert_eq!(get_attr(&images[0], "src").as_deref(), Some("real.png"));
        assert!(get_attr(&images[1], "src").unwrap().starts_with("data:image/svg+xml"));
    }

    #[test]
    fn absolutizes_references_and_srcset() {
        let document = parse(
            r##"<a href="/about#team">a</a><a href="#top">t</a><script src="js/app.js"></script>
            <object data="doc.pdf"></object><img src="a.png?utm_source=x" srcset="a.png 1x, b.png 2x">"##,
        );
        let base = Url::parse("https://x.test/dir/page.html").unwrap();
        absolutize_urls(&document, &UrlResolver::new(&base));

        let links = elements_by_tag(&document, &["a"]);
        assert_eq!(get_attr(&links[0], "href").as_deref(), Some("https://x.test/about"));
        assert_eq!(get_attr(&links[1], "href").as_deref(), Some("#top"));
        assert_eq!(
            get_attr(&first(&document, "script"), "src").as_deref(),
            Some("https://x.test/dir/js/app.js")
        );
        assert_eq!(
            get_attr(&first(&document, "object"), "data").as_deref(),
            Some("https://x.test/dir/doc.pdf")
        );
        let img = first(&document, "img");
        assert_eq!(get_attr(&img, "src").as_deref(), Some("https://x.test/dir/a.png"));
        assert_eq!(
            get_attr(&img, "srcset").as_deref(),
            Some("https://x.test/dir/a.png 1x, https://x.test/dir/b.png 2x")
        );
    }

    #[test]
    fn strips_integrity_and_comments() {
        let document = parse(
            r#"<!-- top --><head><link rel="stylesheet" href="s.css" integrity="sha384-x"></head><body><!-- c --><p>t</p></body>"#,
        );
        strip_link_integrity(&document);
        remove_comments(&document);

        let html = serialize(&document).unwrap();
        assert!(!html.contains("integrity"));
        assert!(!html.contains("<!--"));
    }

    #[test]
    fn base_href_sets_effective_base() {
        let document = parse(r#"<head><base href="/static/"></head>"#);
        let url = Url::parse("https://x.test/page").unwrap();
        assert_eq!(effective_base(&document, &url).as_str(), "https://x.test/static/");

        let without = parse("<p>t</p>");
        assert_eq!(effective_base(&without, &url), url);
    }
}
