//! Decorates autoindex directory listings with file-type icons.

use kuchikikiki::NodeRef;
use log::debug;

use crate::dom;

/// Extensions that have a matching `<ext>.png` icon.
pub const FORMATS: [&str; 50] = [
    "7z", "avi", "bat", "bin", "bmp", "c", "c++", "cmd", "css", "deb", "doc", "docx", "exe", "gif",
    "gz", "gzip", "html", "ico", "iso", "java", "jpeg", "jpg", "js", "mp3", "mp4", "msg", "ogg",
    "pdf", "php", "png", "ppt", "pptx", "psd", "py", "rar", "raw", "rpm", "sh", "sql", "svg", "swf",
    "tiff", "torrent", "txt", "wav", "wma", "wmv", "xls", "xlsx", "zip",
];

const MAX_TITLE_CHARS: usize = 19;
const TRUNCATED_CHARS: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File(&'static str),
    Parent,
    Folder,
    Unknown,
}

impl EntryKind {
    /// Icon name, without the `.png` suffix.
    pub fn icon(self) -> &'static str {
        match self {
            EntryKind::File(ext) => ext,
            EntryKind::Parent => "home",
            EntryKind::Folder => "folder",
            EntryKind::Unknown => "error",
        }
    }
}

/// First matching rule wins: known extension, parent link, folder, anything else.
pub fn classify(href: &str, text: &str) -> EntryKind {
    let ext = href.rsplit('.').next().unwrap_or(href);
    if let Some(format) = FORMATS.iter().copied().find(|format| format.eq_ignore_ascii_case(ext)) {
        EntryKind::File(format)
    } else if text.contains("Parent directory") {
        EntryKind::Parent
    } else if href.ends_with('/') {
        EntryKind::Folder
    } else {
        EntryKind::Unknown
    }
}

/// Display name for the directory at `path`: last non-empty segment,
/// first letter capitalized, long names cut to 18 characters and an ellipsis.
pub fn directory_title(path: &str) -> String {
    let last = path.split('/').rfind(|segment| !segment.is_empty()).unwrap_or("/");
    let mut chars = last.chars();
    let name: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };

    if name.chars().count() > MAX_TITLE_CHARS {
        let prefix: String = name.chars().take(TRUNCATED_CHARS).collect();
        format!("{prefix}...")
    } else {
        name
    }
}

pub struct ListingDecorator<'a> {
    site_name: &'a str,
    icons_base: &'a str,
}

impl<'a> ListingDecorator<'a> {
    pub fn new(site_name: &'a str, icons_base: &'a str) -> Self {
        Self {
            site_name,
            icons_base: icons_base.trim_end_matches('/'),
        }
    }

    /// Rewrites the listing served at `request_path` in place.
    pub fn decorate(&self, document: &NodeRef, request_path: &str) {
        let title = directory_title(request_path);
        dom::set_title(document, &format!("{}: {}", self.site_name, title));
        if let Some(dirname) = dom::find_by_id(document, "dirname") {
            dom::set_text(&dirname, &title);
        }

        let anchors: Vec<NodeRef> = match document.select("td a") {
            Ok(selection) => selection.map(|anchor| anchor.as_node().clone()).collect(),
            Err(()) => Vec::new(),
        };
        for anchor in &anchors {
            self.decorate_anchor(anchor);
        }
        debug!("decorated {} entries for {}", anchors.len(), request_path);
    }

    fn decorate_anchor(&self, anchor: &NodeRef) {
        let href = dom::attribute(anchor, "href").unwrap_or_default();
        let text = anchor.text_contents();
        let kind = classify(&href, &text);
        debug!("{href} -> {kind:?}");

        let shown = match kind {
            EntryKind::Folder => text.strip_suffix('/').unwrap_or(text.as_str()),
            _ => text.as_str(),
        };
        dom::set_text(anchor, shown);
        anchor.prepend(self.icon(kind));

        // The slash we dropped is made up for after the anchor to keep columns aligned.
        if kind == EntryKind::Folder {
            let next = anchor.next_sibling();
            if let Some(text_node) = next.as_ref().and_then(|node| node.as_text()) {
                text_node.borrow_mut().insert(0, ' ');
            }
        }
    }

    fn icon(&self, kind: EntryKind) -> NodeRef {
        let src = format!("{}/{}.png", self.icons_base, kind.icon());
        dom::element(
            "img",
            &[
                ("class", "icons"),
                ("src", &src),
                ("style", "margin:0 4px -4px 0"),
            ],
        )
    }
}
