//! Document parser: wikitext → ordered template nodes + literal runs → wikitext.
//!
//! Only top-level `{{...}}` spans become [`Template`] nodes. Wikilinks and
//! everything else stay opaque literal text, and a template argument that
//! itself contains `{{b}}` keeps it verbatim inside the parameter value.
//! Serializing an unmutated document reproduces the input byte-for-byte;
//! bots diff before saving, so an accidental reformat is a bug.

use crate::error::ParseError;
use crate::scanner::{scan_multi, Piece};
use crate::template::{Template, WIKI_PAIRS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Template(Template),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn parse(text: &str) -> Result<Document, ParseError> {
        let mut nodes: Vec<Node> = Vec::new();
        for piece in scan_multi(text, &WIKI_PAIRS)? {
            match piece {
                Piece::Span { group: 0, text } => {
                    nodes.push(Node::Template(Template::parse(&text)?));
                }
                // wikilink spans and outside runs are both literal text here
                Piece::Span { text, .. } | Piece::Outside(text) => {
                    if text.is_empty() {
                        continue;
                    }
                    if let Some(Node::Text(prev)) = nodes.last_mut() {
                        prev.push_str(&text);
                    } else {
                        nodes.push(Node::Text(text));
                    }
                }
            }
        }
        Ok(Document { nodes })
    }

    pub fn to_wikitext(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Template(t) => out.push_str(&t.to_wikitext()),
            }
        }
        out
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        self.nodes.iter().filter_map(|n| match n {
            Node::Template(t) => Some(t),
            _ => None,
        })
    }

    pub fn templates_mut(&mut self) -> impl Iterator<Item = &mut Template> {
        self.nodes.iter_mut().filter_map(|n| match n {
            Node::Template(t) => Some(t),
            _ => None,
        })
    }

    /// All templates whose semantic name equals `name`.
    pub fn templates_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Template> {
        self.templates().filter(move |t| t.name() == name)
    }

    /// First template named `name`, if any. The returned borrow is tied to
    /// the document alone, not to `name`.
    pub fn find_template(&self, name: &str) -> Option<&Template> {
        self.templates().find(|t| t.name() == name)
    }

    pub fn find_template_mut(&mut self, name: &str) -> Option<&mut Template> {
        self.templates_mut().find(|t| t.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trips(text: &str) {
        let doc = Document::parse(text).unwrap();
        assert_eq!(doc.to_wikitext(), text, "round trip failed for {:?}", text);
    }

    #[test]
    fn test_round_trip_identity() {
        round_trips("plain text, no templates");
        round_trips("{{en-noun}}");
        round_trips("{{a|{{b|{{c}}}}}}");
        round_trips("{{t|2=b|1=a|name=x}}");
        round_trips("{{cite|http://x.y/?a=b}}");
        round_trips("==English==\n{{en-noun}}\n\n# a [[thing]]\n");
        round_trips("before [[link|with pipe]] {{t|p}} after");
    }

    #[test]
    fn test_wikilink_pipe_does_not_confuse_template_scan() {
        let doc = Document::parse("[[a|b]]{{t|1=x}}").unwrap();
        let templates: Vec<_> = doc.templates().collect();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].get("1"), "x");
    }

    #[test]
    fn test_nested_template_stays_in_parameter_value() {
        let doc = Document::parse("{{a|{{b}}}}").unwrap();
        let templates: Vec<_> = doc.templates().collect();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].name(), "a");
        assert_eq!(templates[0].get("1"), "{{b}}");
    }

    #[test]
    fn test_unbalanced_braces_are_a_parse_error() {
        assert!(Document::parse("text {{broken").is_err());
        assert!(Document::parse("text }}stray").is_err());
    }

    #[test]
    fn test_mutation_then_serialize() {
        let mut doc = Document::parse("intro {{en-noun}} outro").unwrap();
        doc.find_template_mut("en-noun").unwrap().add("head", "x");
        assert_eq!(doc.to_wikitext(), "intro {{en-noun|head=x}} outro");
    }

    #[test]
    fn test_find_template_outlives_name_string() {
        let doc = Document::parse("{{en-noun}} text {{head|en}}").unwrap();
        let found = {
            let name = String::from("head");
            doc.find_template(&name)
        };
        assert_eq!(found.unwrap().name(), "head");
    }

    #[test]
    fn test_templates_named() {
        let doc = Document::parse("{{l|en|a}} {{m|en|b}} {{l|en|c}}").unwrap();
        assert_eq!(doc.templates_named("l").count(), 2);
        assert_eq!(doc.templates_named("m").count(), 1);
        assert!(doc.find_template("xyz").is_none());
    }
}
