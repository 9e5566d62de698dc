//! In-memory model of one `{{name|...}}` template invocation.
//!
//! The model keeps enough raw formatting (spacing around the name, spacing
//! around `=`, trailing HTML comments) that serializing an untouched template
//! reproduces its source byte-for-byte. Name lookups always go through the
//! trimmed semantic name, so `{{ foo<!--c-->}}` and `{{foo}}` compare equal.

use crate::error::ParseError;
use crate::scanner::{scan_multi, split_outside, Piece};

/// Delimiter pairs that hide `|` and `=` from template-argument splitting.
pub const WIKI_PAIRS: [(&str, &str); 2] = [("{{", "}}"), ("[[", "]]")];

/// One parameter of a template: a (key, value, explicit-key) triple plus the
/// raw source pieces needed for exact serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    key: String,
    value: String,
    showkey: bool,
    /// Raw text of the key side including spacing, when parsed from source.
    key_raw: Option<String>,
    /// Raw text of the value side including spacing.
    value_raw: String,
}

impl Param {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the key is written out explicitly (`1=foo` rather than `foo`).
    pub fn showkey(&self) -> bool {
        self.showkey
    }
}

/// Options for [`Template::add_opts`].
#[derive(Debug, Clone, Default)]
pub struct AddOpts<'a> {
    /// `None` infers: named keys are always explicit, numeric keys are bare
    /// unless the value contains a raw `=`.
    pub showkey: Option<bool>,
    /// Insert the new parameter immediately before this existing key instead
    /// of appending. Ignored when the key already exists.
    pub before: Option<&'a str>,
    /// Keep the spacing around `=` and the value when overwriting an
    /// existing parameter.
    pub preserve_spacing: bool,
}

impl<'a> AddOpts<'a> {
    pub fn new() -> Self {
        AddOpts {
            showkey: None,
            before: None,
            preserve_spacing: true,
        }
    }
}

/// One `{{...}}` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Whitespace between `{{` and the name.
    lead: String,
    /// Trimmed semantic name.
    name: String,
    /// Whitespace and/or HTML comments between the name and the first `|`
    /// (or the closing braces).
    trail: String,
    params: Vec<Param>,
}

impl Template {
    /// Build a fresh template with no parameters.
    pub fn new(name: &str) -> Self {
        Template {
            lead: String::new(),
            name: name.to_string(),
            trail: String::new(),
            params: Vec::new(),
        }
    }

    /// Parse one already-delimited `{{...}}` span. The caller (normally the
    /// document parser) guarantees the braces are balanced.
    pub fn parse(span: &str) -> Result<Template, ParseError> {
        let inner = span
            .strip_prefix("{{")
            .and_then(|s| s.strip_suffix("}}"))
            .unwrap_or(span);
        let segments = split_outside(inner, &WIKI_PAIRS, "|")?;
        let (lead, name, trail) = split_name_segment(&segments[0]);
        if name.is_empty() {
            return Err(ParseError::EmptyTemplateName {
                snippet: span.chars().take(40).collect(),
            });
        }
        let mut params = Vec::new();
        let mut positional = 0usize;
        for segment in &segments[1..] {
            params.push(parse_param(segment, &mut positional)?);
        }
        Ok(Template {
            lead,
            name,
            trail,
            params,
        })
    }

    /// The trimmed semantic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Change the semantic name, keeping captured spacing and comments.
    pub fn rename(&mut self, new_name: &str) {
        self.name = new_name.to_string();
    }

    /// Value for `key`, or the empty string if absent. Probing optional
    /// parameters is the normal case, so absence is not an error.
    pub fn get(&self, key: &str) -> &str {
        self.find(key).map(|i| self.params[i].value.as_str()).unwrap_or("")
    }

    pub fn has(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Set `key` to `value` with default options (auto showkey, append at
    /// the end, preserve spacing on overwrite).
    pub fn add(&mut self, key: &str, value: &str) {
        self.add_opts(key, value, AddOpts::new());
    }

    pub fn add_opts(&mut self, key: &str, value: &str, opts: AddOpts) {
        if let Some(i) = self.find(key) {
            let param = &mut self.params[i];
            if opts.preserve_spacing {
                let (ws_lead, ws_trail) = surrounding_whitespace(&param.value_raw, &param.value);
                param.value_raw = format!("{}{}{}", ws_lead, value, ws_trail);
            } else {
                param.key_raw = None;
                param.value_raw = value.to_string();
            }
            param.value = value.to_string();
            if let Some(showkey) = opts.showkey {
                param.showkey = showkey;
            }
            return;
        }
        let showkey = opts
            .showkey
            .unwrap_or_else(|| !is_numeric_key(key) || value.contains('='));
        let param = Param {
            key: key.to_string(),
            value: value.to_string(),
            showkey,
            key_raw: None,
            value_raw: value.to_string(),
        };
        let at = opts
            .before
            .and_then(|b| self.find(b))
            .unwrap_or(self.params.len());
        self.params.insert(at, param);
    }

    /// Delete `key` if present; no-op otherwise.
    pub fn remove(&mut self, key: &str) {
        self.params.retain(|p| p.key != key);
    }

    /// All parameters in serialization order.
    pub fn params(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    /// Physical position of `key` in the parameter list, if present.
    pub fn param_index(&self, key: &str) -> Option<usize> {
        self.find(key)
    }

    /// Key of the parameter at physical position `index`, if any.
    pub fn key_at(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(|p| p.key.as_str())
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Stable-sort parameters so numeric keys come first, in numeric order.
    /// This is the Wiktionary display convention; it is opt-in because it
    /// breaks byte-for-byte round-tripping of templates parsed from source.
    pub fn sort_params(&mut self) {
        self.params.sort_by_key(|p| match p.key.parse::<usize>() {
            Ok(n) => (0, n),
            Err(_) => (1, 0),
        });
    }

    pub fn to_wikitext(&self) -> String {
        let mut out = String::from("{{");
        out.push_str(&self.lead);
        out.push_str(&self.name);
        out.push_str(&self.trail);
        for param in &self.params {
            out.push('|');
            if param.showkey {
                match &param.key_raw {
                    Some(raw) => out.push_str(raw),
                    None => out.push_str(&param.key),
                }
                out.push('=');
            }
            out.push_str(&param.value_raw);
        }
        out.push_str("}}");
        out
    }

    // Duplicate keys can occur in source wikitext; both copies are kept so
    // round-tripping stays exact, and lookups follow the rendering engine's
    // last-one-wins rule.
    fn find(&self, key: &str) -> Option<usize> {
        self.params.iter().rposition(|p| p.key == key)
    }
}

fn is_numeric_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_digit())
}

/// Split the name segment into (leading whitespace, semantic name, trailing
/// whitespace-and-comments).
fn split_name_segment(segment: &str) -> (String, String, String) {
    let lead_len = segment.len() - segment.trim_start().len();
    let lead = &segment[..lead_len];
    let mut rest = &segment[lead_len..];
    let mut trail = String::new();
    loop {
        let trimmed = rest.trim_end();
        if trimmed.len() < rest.len() {
            trail.insert_str(0, &rest[trimmed.len()..]);
            rest = trimmed;
            continue;
        }
        if rest.ends_with("-->") {
            if let Some(start) = rest.rfind("<!--") {
                trail.insert_str(0, &rest[start..]);
                rest = &rest[..start];
                continue;
            }
        }
        break;
    }
    (lead.to_string(), rest.to_string(), trail)
}

fn parse_param(segment: &str, positional: &mut usize) -> Result<Param, ParseError> {
    if let Some(eq) = top_level_eq(segment)? {
        let key_side = &segment[..eq];
        let value_side = &segment[eq + 1..];
        // Only treat this as a named parameter when the key side looks like
        // a parameter name; a bare URL with `=` stays positional.
        if is_param_key(key_side.trim()) {
            return Ok(Param {
                key: key_side.trim().to_string(),
                value: value_side.trim().to_string(),
                showkey: true,
                key_raw: Some(key_side.to_string()),
                value_raw: value_side.to_string(),
            });
        }
    }
    *positional += 1;
    Ok(Param {
        key: positional.to_string(),
        value: segment.to_string(),
        showkey: false,
        key_raw: None,
        value_raw: segment.to_string(),
    })
}

/// Byte index of the first `=` outside any nested `{{}}`/`[[]]` span.
fn top_level_eq(segment: &str) -> Result<Option<usize>, ParseError> {
    let mut offset = 0;
    for piece in scan_multi(segment, &WIKI_PAIRS)? {
        if let Piece::Outside(text) = &piece {
            if let Some(i) = text.find('=') {
                return Ok(Some(offset + i));
            }
        }
        offset += piece.text().len();
    }
    Ok(None)
}

fn is_param_key(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | ' '))
}

/// Leading and trailing whitespace of `raw` around its trimmed core `value`.
fn surrounding_whitespace<'a>(raw: &'a str, value: &str) -> (&'a str, &'a str) {
    if let Some(start) = raw.find(value.trim()) {
        if !value.trim().is_empty() {
            return (&raw[..start], &raw[start + value.trim().len()..]);
        }
    }
    ("", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize_untouched() {
        let cases = [
            "{{en-noun}}",
            "{{en-noun|s|head=[[a|b]]}}",
            "{{ foo<!--c-->}}",
            "{{t|first|key = spaced |last}}",
            "{{en-verb\n|head=run\n}}",
        ];
        for case in cases {
            let t = Template::parse(case).unwrap();
            assert_eq!(t.to_wikitext(), case, "round trip failed for {}", case);
        }
    }

    #[test]
    fn test_name_ignores_spacing_and_comments() {
        let t = Template::parse("{{ foo<!--c-->}}").unwrap();
        assert_eq!(t.name(), "foo");
        let plain = Template::parse("{{foo}}").unwrap();
        assert_eq!(t.name(), plain.name());
    }

    #[test]
    fn test_rename_preserves_formatting() {
        let mut t = Template::parse("{{ foo<!--c-->|1=x}}").unwrap();
        t.rename("bar");
        assert_eq!(t.to_wikitext(), "{{ bar<!--c-->|1=x}}");
    }

    #[test]
    fn test_get_add_remove() {
        let mut t = Template::new("en-noun");
        assert_eq!(t.get("head"), "");
        assert!(!t.has("head"));
        t.add("head", "test");
        assert_eq!(t.get("head"), "test");
        assert!(t.has("head"));
        t.remove("head");
        assert!(!t.has("head"));
        // remove on an absent key is a no-op
        t.remove("head");
        assert!(!t.has("head"));
    }

    #[test]
    fn test_add_before_existing_key() {
        let mut t = Template::parse("{{t|a=1|c=3}}").unwrap();
        t.add_opts(
            "b",
            "2",
            AddOpts {
                before: Some("c"),
                ..AddOpts::new()
            },
        );
        assert_eq!(t.to_wikitext(), "{{t|a=1|b=2|c=3}}");
    }

    #[test]
    fn test_overwrite_preserves_spacing() {
        let mut t = Template::parse("{{t|key = old }}").unwrap();
        t.add("key", "new");
        assert_eq!(t.to_wikitext(), "{{t|key = new }}");
        assert_eq!(t.get("key"), "new");
    }

    #[test]
    fn test_positional_with_equals_stays_positional() {
        let t = Template::parse("{{cite|http://x.y/?a=b}}").unwrap();
        assert_eq!(t.get("1"), "http://x.y/?a=b");
        assert_eq!(t.to_wikitext(), "{{cite|http://x.y/?a=b}}");
    }

    #[test]
    fn test_equals_inside_link_is_not_a_key() {
        let t = Template::parse("{{t|[[x=y|z]]}}").unwrap();
        assert_eq!(t.get("1"), "[[x=y|z]]");
    }

    #[test]
    fn test_auto_showkey_for_numeric_values_with_equals() {
        let mut t = Template::new("t");
        t.add("1", "a=b");
        assert_eq!(t.to_wikitext(), "{{t|1=a=b}}");
        let mut u = Template::new("t");
        u.add("1", "plain");
        assert_eq!(u.to_wikitext(), "{{t|plain}}");
    }

    #[test]
    fn test_explicit_numeric_key_round_trips() {
        let t = Template::parse("{{t|2=b|1=a}}").unwrap();
        assert_eq!(t.get("1"), "a");
        assert_eq!(t.get("2"), "b");
        assert_eq!(t.to_wikitext(), "{{t|2=b|1=a}}");
    }

    #[test]
    fn test_duplicate_key_last_wins_and_round_trips() {
        let t = Template::parse("{{t|a=1|a=2}}").unwrap();
        assert_eq!(t.get("a"), "2");
        assert_eq!(t.to_wikitext(), "{{t|a=1|a=2}}");
    }

    #[test]
    fn test_sort_params() {
        let mut t = Template::parse("{{t|b=x|2=two|1=one}}").unwrap();
        t.sort_params();
        assert_eq!(t.to_wikitext(), "{{t|1=one|2=two|b=x}}");
    }

    #[test]
    fn test_empty_name_is_an_error() {
        assert!(Template::parse("{{}}").is_err());
        assert!(Template::parse("{{ |x}}").is_err());
    }
}
