//! Substring-based wikilink helpers.
//!
//! Links are deliberately not parse-tree citizens; the document parser only
//! avoids being confused by their `|`. For the handful of bots that touch
//! `[[target|display]]` syntax directly, these simple helpers are enough.

/// One `[[...]]` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    pub target: String,
    /// Display text; equal to `target` for plain `[[target]]` links.
    pub display: String,
}

impl WikiLink {
    pub fn to_wikitext(&self) -> String {
        if self.display == self.target {
            format!("[[{}]]", self.target)
        } else {
            format!("[[{}|{}]]", self.target, self.display)
        }
    }
}

/// All `[[...]]` links in `text`, in order. Malformed openings without a
/// matching `]]` are ignored rather than reported; this layer guesses
/// nothing and edits nothing.
pub fn iter_links(text: &str) -> Vec<WikiLink> {
    let mut links = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("[[") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("]]") else {
            break;
        };
        let inner = &after[..end];
        let (target, display) = match inner.split_once('|') {
            Some((t, d)) => (t, d),
            None => (inner, inner),
        };
        links.push(WikiLink {
            target: target.to_string(),
            display: display.to_string(),
        });
        rest = &after[end + 2..];
    }
    links
}

/// Replace every link with its display text.
pub fn strip_links(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("[[") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("]]") else {
            break;
        };
        out.push_str(&rest[..start]);
        let inner = &after[..end];
        out.push_str(inner.split_once('|').map(|(_, d)| d).unwrap_or(inner));
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

pub fn make_link(target: &str, display: Option<&str>) -> String {
    match display {
        Some(d) if d != target => format!("[[{}|{}]]", target, d),
        _ => format!("[[{}]]", target),
    }
}
