//! Small helpers over the `kuchikikiki` tree shared by the page rewriters.

use kuchikikiki::{Attribute, ExpandedName, NodeRef};
use markup5ever::{ns, LocalName, QualName};
use tendril::TendrilSink;

use crate::structures::errors::SiteError;

pub fn parse(html: &str) -> NodeRef {
    kuchikikiki::parse_html().one(html)
}

pub fn serialize(document: &NodeRef) -> Result<String, SiteError> {
    let mut out = Vec::new();
    document.serialize(&mut out)?;
    String::from_utf8(out).map_err(|e| SiteError::Other(e.to_string()))
}

/// Element with the given `id`, if the page has one.
pub fn find_by_id(document: &NodeRef, id: &str) -> Option<NodeRef> {
    document
        .select_first(&format!("#{id}"))
        .ok()
        .map(|element| element.as_node().clone())
}

pub fn element(name: &str, attributes: &[(&str, &str)]) -> NodeRef {
    NodeRef::new_element(
        QualName::new(None, ns!(html), LocalName::from(name)),
        attributes.iter().map(|(key, value)| {
            (
                ExpandedName::new("", *key),
                Attribute {
                    prefix: None,
                    value: (*value).to_string(),
                },
            )
        }),
    )
}

pub fn attribute(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()
        .and_then(|element| element.attributes.borrow().get(name).map(str::to_string))
}

pub fn clear_children(node: &NodeRef) {
    for child in node.children().collect::<Vec<_>>() {
        child.detach();
    }
}

pub fn set_text(node: &NodeRef, text: &str) {
    clear_children(node);
    node.append(NodeRef::new_text(text));
}

/// Parse `html` as body content and append the resulting nodes to `node`.
pub fn append_html(node: &NodeRef, html: &str) {
    let fragment = parse(html);
    if let Ok(body) = fragment.select_first("body") {
        for child in body.as_node().children().collect::<Vec<_>>() {
            node.append(child);
        }
    }
}

pub fn replace_html(node: &NodeRef, html: &str) {
    clear_children(node);
    append_html(node, html);
}

/// Sets `<title>`, creating it in `<head>` when the page has none.
pub fn set_title(document: &NodeRef, title: &str) {
    if let Ok(existing) = document.select_first("title") {
        set_text(existing.as_node(), title);
    } else if let Ok(head) = document.select_first("head") {
        let node = element("title", &[]);
        node.append(NodeRef::new_text(title));
        head.as_node().append(node);
    }
}
