//! Small kuchiki helpers shared by the normalization and rewrite passes
//!
//! kuchiki nodes are `!Send`; nothing in here may be held across an `.await`.

use kuchiki::traits::TendrilSink;
use kuchiki::NodeRef;

/// Lowercase tag name, `None` for non-element nodes
pub(crate) fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element()
        .map(|element| element.name.local.to_string().to_ascii_lowercase())
}

pub(crate) fn has_tag(node: &NodeRef, tags: &[&str]) -> bool {
    tag_name(node).is_some_and(|tag| tags.contains(&tag.as_str()))
}

pub(crate) fn get_attr(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()
        .and_then(|element| element.attributes.borrow().get(name).map(str::to_string))
}

pub(crate) fn has_attr(node: &NodeRef, name: &str) -> bool {
    node.as_element()
        .is_some_and(|element| element.attributes.borrow().contains(name))
}

pub(crate) fn set_attr(node: &NodeRef, name: &str, value: impl Into<String>) {
    if let Some(element) = node.as_element() {
        element.attributes.borrow_mut().insert(name, value.into());
    }
}

pub(crate) fn remove_attr(node: &NodeRef, name: &str) {
    if let Some(element) = node.as_element() {
        element.attributes.borrow_mut().remove(name);
    }
}

/// Attributes as `(name, value)` pairs
pub(crate) fn attributes(node: &NodeRef) -> Vec<(String, String)> {
    node.as_element()
        .map(|element| {
            element
                .attributes
                .borrow()
                .map
                .iter()
                .map(|(name, attr)| (name.local.to_string(), attr.value.clone()))
                .collect()
        })
        .unwrap_or_default()
}

/// All elements with one of `tags`, collected so callers can detach freely
pub(crate) fn elements_by_tag(root: &NodeRef, tags: &[&str]) -> Vec<NodeRef> {
    root.descendants()
        .filter(|node| has_tag(node, tags))
        .collect()
}

/// Every element under `root`, collected
pub(crate) fn all_elements(root: &NodeRef) -> Vec<NodeRef> {
    root.descendants()
        .filter(|node| node.as_element().is_some())
        .collect()
}

pub(crate) fn element_children(node: &NodeRef) -> Vec<NodeRef> {
    node.children()
        .filter(|child| child.as_element().is_some())
        .collect()
}

pub(crate) fn previous_element_sibling(node: &NodeRef) -> Option<NodeRef> {
    let mut current = node.previous_sibling();
    while let Some(sibling) = current {
        if sibling.as_element().is_some() {
            return Some(sibling);
        }
        current = sibling.previous_sibling();
    }
    None
}

/// Replace all children of `node` with a single text node
pub(crate) fn set_text(node: &NodeRef, text: &str) {
    for child in node.children().collect::<Vec<_>>() {
        child.detach();
    }
    node.append(NodeRef::new_text(text));
}

/// Parse `markup` as the body of a fresh document and return the body element
pub(crate) fn parse_body(markup: &str) -> Option<NodeRef> {
    let document = kuchiki::parse_html().one(markup);
    document
        .select_first("body")
        .ok()
        .map(|body| body.as_node().clone())
}

/// Build a detached element from a single-element HTML fragment
pub(crate) fn create_element(markup: &str, tag: &str) -> Option<NodeRef> {
    let document = kuchiki::parse_html().one(markup);
    let element = document.select_first(tag).ok()?.as_node().clone();
    element.detach();
    Some(element)
}

pub(crate) fn serialize(node: &NodeRef) -> std::io::Result<String> {
    let mut html_output = Vec::new();
    node.serialize(&mut html_output)?;
    Ok(String::from_utf8_lossy(&html_output).into_owned())
}
