//! Section splitter: page text → `==Language==` sections → nested
//! `===Header===` subsections, and back.
//!
//! The split keeps the raw header line and raw body of every block, so
//! re-joining all blocks in order reproduces the page byte-for-byte. That
//! exactness is what lets a bot rewrite one language's body and leave every
//! other character of the page alone. Structure parsing stays separate from
//! semantic interpretation; callers decide what a header means.

use std::collections::HashMap;

use crate::error::SplitError;
use crate::language::LanguageRegistry;

/// One header-delimited block. `level` is the number of `=` signs (2 for
/// `==Language==`, 3 for `===Noun===`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub level: usize,
    /// Trimmed text between the `=` runs.
    pub header: String,
    /// The raw header line, line terminator included.
    pub header_line: String,
    /// Raw text after the header line, up to the next header in scope.
    pub body: String,
}

impl Section {
    /// The block's exact source text.
    pub fn raw(&self) -> String {
        format!("{}{}", self.header_line, self.body)
    }
}

/// A page split on its top-level `==Language==` headers.
#[derive(Debug, Clone, Default)]
pub struct SectionedPage {
    /// Raw text before the first level-2 header, often `{{also|...}}`.
    pub preamble: String,
    pub sections: Vec<Section>,
    /// Header text → index of its first occurrence. A duplicate header is a
    /// warning, and the first occurrence wins here; the duplicate block is
    /// still preserved verbatim in `sections`.
    pub by_name: HashMap<String, usize>,
    pub warnings: Vec<String>,
}

impl SectionedPage {
    /// Rebuild the page. Identity when nothing was mutated.
    pub fn rejoin(&self) -> String {
        let mut out = self.preamble.clone();
        for section in &self.sections {
            out.push_str(&section.header_line);
            out.push_str(&section.body);
        }
        out
    }

    /// Level-2 headers that are not known language names.
    pub fn unknown_languages(&self, registry: &LanguageRegistry) -> Vec<String> {
        self.sections
            .iter()
            .filter(|s| !registry.is_language(&s.header))
            .map(|s| s.header.clone())
            .collect()
    }
}

/// A language body split on all of its nested subsection headers, as a flat
/// ordered list annotated with nesting levels.
#[derive(Debug, Clone, Default)]
pub struct SubsectionedBody {
    /// Raw text before the first subsection header.
    pub preamble: String,
    pub subsections: Vec<Section>,
    /// Header text → all indices carrying it. Repeated subsection headers
    /// (several Etymology blocks, Noun under each) are normal.
    pub by_name: HashMap<String, Vec<usize>>,
    pub warnings: Vec<String>,
}

impl SubsectionedBody {
    pub fn rejoin(&self) -> String {
        let mut out = self.preamble.clone();
        for sub in &self.subsections {
            out.push_str(&sub.header_line);
            out.push_str(&sub.body);
        }
        out
    }
}

/// Split a full page into its `==Language==` sections. Headers deeper than
/// level 2 stay inside the section bodies.
pub fn split_into_sections(text: &str) -> SectionedPage {
    let mut page = SectionedPage::default();
    let mut current: Option<Section> = None;

    for line in split_lines_inclusive(text) {
        match parse_header_line(line) {
            Some((2, header, warning)) => {
                if let Some(warning) = warning {
                    page.warnings.push(warning);
                }
                if let Some(done) = current.take() {
                    page.sections.push(done);
                }
                let index = page.sections.len();
                if page.by_name.contains_key(&header) {
                    page.warnings
                        .push(format!("duplicate section header {:?}", header));
                } else {
                    page.by_name.insert(header.clone(), index);
                }
                current = Some(Section {
                    level: 2,
                    header,
                    header_line: line.to_string(),
                    body: String::new(),
                });
            }
            _ => match current.as_mut() {
                Some(section) => section.body.push_str(line),
                None => page.preamble.push_str(line),
            },
        }
    }
    if let Some(done) = current.take() {
        page.sections.push(done);
    }
    page
}

/// Split one language body into its nested subsections (level 3 and deeper;
/// a stray level-2 header inside a body is also treated as a boundary).
pub fn split_into_subsections(body: &str) -> SubsectionedBody {
    let mut result = SubsectionedBody::default();
    let mut current: Option<Section> = None;

    for line in split_lines_inclusive(body) {
        match parse_header_line(line) {
            Some((level, header, warning)) => {
                if let Some(warning) = warning {
                    result.warnings.push(warning);
                }
                if let Some(done) = current.take() {
                    result.subsections.push(done);
                }
                result
                    .by_name
                    .entry(header.clone())
                    .or_default()
                    .push(result.subsections.len());
                current = Some(Section {
                    level,
                    header,
                    header_line: line.to_string(),
                    body: String::new(),
                });
            }
            None => match current.as_mut() {
                Some(sub) => sub.body.push_str(line),
                None => result.preamble.push_str(line),
            },
        }
    }
    if let Some(done) = current.take() {
        result.subsections.push(done);
    }
    result
}

/// The one language section a transform is allowed to rewrite, with the
/// trailing separator/category boilerplate peeled off so the transform never
/// has to worry about relocating it.
#[derive(Debug, Clone)]
pub struct ModifiableSection {
    pub page: SectionedPage,
    /// Index of the target section; `None` when the whole input is the body.
    pub index: Option<usize>,
    /// The section body minus `tail`.
    pub body: String,
    /// Trailing horizontal rule and/or category links, re-appended verbatim
    /// after the rewritten body.
    pub tail: String,
    pub has_other_languages: bool,
}

impl ModifiableSection {
    /// Rebuild the full page with `new_body` in place of the target body.
    pub fn reassemble(&self, new_body: &str) -> String {
        match self.index {
            None => format!("{}{}", new_body, self.tail),
            Some(target) => {
                let mut out = self.page.preamble.clone();
                for (i, section) in self.page.sections.iter().enumerate() {
                    out.push_str(&section.header_line);
                    if i == target {
                        out.push_str(new_body);
                        out.push_str(&self.tail);
                    } else {
                        out.push_str(&section.body);
                    }
                }
                out
            }
        }
    }
}

/// Locate the body to transform. With `language` as `None` the whole text is
/// the body, for input pre-filtered to one language by an external tool.
///
/// A missing language section is reported, not fatal: the calling bot skips
/// the page and the batch continues.
pub fn find_modifiable_section(
    text: &str,
    language: Option<&str>,
) -> Result<ModifiableSection, SplitError> {
    let Some(language) = language else {
        return Ok(ModifiableSection {
            page: SectionedPage::default(),
            index: None,
            body: text.to_string(),
            tail: String::new(),
            has_other_languages: false,
        });
    };
    let page = split_into_sections(text);
    let Some(&index) = page.by_name.get(language) else {
        return Err(SplitError::LanguageNotFound {
            language: language.to_string(),
        });
    };
    let (body, tail) = split_tail(&page.sections[index].body);
    let has_other_languages = page.sections.len() > 1;
    Ok(ModifiableSection {
        page,
        index: Some(index),
        body,
        tail,
        has_other_languages,
    })
}

/// Peel trailing blank lines, `----` separators, and `[[Category:...]]`
/// links off the end of a section body.
fn split_tail(body: &str) -> (String, String) {
    let lines: Vec<&str> = split_lines_inclusive(body).collect();
    let mut start = lines.len();
    for line in lines.iter().rev() {
        let trimmed = line.trim();
        let is_rule = trimmed.len() >= 4 && trimmed.chars().all(|c| c == '-');
        let is_category = (trimmed.starts_with("[[Category:")
            || trimmed.starts_with("[[category:"))
            && trimmed.ends_with("]]");
        if trimmed.is_empty() || is_rule || is_category {
            start -= 1;
        } else {
            break;
        }
    }
    let body_part: String = lines[..start].concat();
    let tail_part: String = lines[start..].concat();
    (body_part, tail_part)
}

/// Try to parse a line as a `==Header==`. Returns (level, trimmed text,
/// optional warning). Asymmetric `=` counts (`==Foo===`) resolve to the
/// smaller count with a warning rather than rejecting the page.
fn parse_header_line(line: &str) -> Option<(usize, String, Option<String>)> {
    let trimmed = line.trim_end();
    if !trimmed.starts_with("==") {
        return None;
    }
    let leading = trimmed.chars().take_while(|c| *c == '=').count();
    let trailing = trimmed.chars().rev().take_while(|c| *c == '=').count();
    if trailing < 2 || leading + trailing >= trimmed.len() {
        return None;
    }
    let level = leading.min(trailing);
    let text = trimmed[leading..trimmed.len() - trailing].trim().to_string();
    let warning = (leading != trailing).then(|| {
        format!(
            "asymmetric header {:?}: {} leading vs {} trailing '=', using {}",
            trimmed, leading, trailing, level
        )
    });
    Some((level, text, warning))
}

/// Like `str::lines` but keeping each line's terminator, so concatenating
/// the pieces reproduces the input exactly.
fn split_lines_inclusive(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive('\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "\
{{also|Foo}}
==English==

===Noun===
{{en-noun}}

# a thing
----
[[Category:English nouns]]
==Finnish==

===Verb===
{{fi-verb}}
";

    #[test]
    fn test_split_and_rejoin_identity() {
        let page = split_into_sections(PAGE);
        assert_eq!(page.rejoin(), PAGE);
        assert_eq!(page.sections.len(), 2);
        assert_eq!(page.sections[0].header, "English");
        assert_eq!(page.sections[1].header, "Finnish");
        assert_eq!(page.preamble, "{{also|Foo}}\n");
        assert!(page.warnings.is_empty());
    }

    #[test]
    fn test_rejoin_identity_with_duplicate_headers() {
        let text = "==English==\nfirst\n==English==\nsecond\n";
        let page = split_into_sections(text);
        assert_eq!(page.rejoin(), text);
        assert_eq!(page.sections.len(), 2);
        // first occurrence wins for the mapping
        assert_eq!(page.by_name["English"], 0);
        assert_eq!(page.warnings.len(), 1);
        assert!(page.warnings[0].contains("duplicate"));
    }

    #[test]
    fn test_no_trailing_newline() {
        let text = "==English==\nbody with no final newline";
        let page = split_into_sections(text);
        assert_eq!(page.rejoin(), text);
    }

    #[test]
    fn test_asymmetric_header_takes_min_with_warning() {
        let text = "==English===\nbody\n";
        let page = split_into_sections(text);
        assert_eq!(page.sections.len(), 1);
        assert_eq!(page.sections[0].level, 2);
        assert_eq!(page.sections[0].header, "English");
        assert_eq!(page.warnings.len(), 1);
        assert!(page.warnings[0].contains("asymmetric"));
        assert_eq!(page.rejoin(), text);
    }

    #[test]
    fn test_deeper_headers_stay_in_body() {
        let page = split_into_sections(PAGE);
        assert!(page.sections[0].body.contains("===Noun==="));
    }

    #[test]
    fn test_split_into_subsections() {
        let body = "\npre\n===Etymology===\nfrom x\n====Noun====\n{{en-noun}}\n===Pronunciation===\nipa\n";
        let subs = split_into_subsections(body);
        assert_eq!(subs.rejoin(), body);
        assert_eq!(subs.preamble, "\npre\n");
        let levels: Vec<usize> = subs.subsections.iter().map(|s| s.level).collect();
        assert_eq!(levels, vec![3, 4, 3]);
        assert_eq!(subs.by_name["Etymology"], vec![0]);
        assert_eq!(subs.by_name["Noun"], vec![1]);
    }

    #[test]
    fn test_repeated_subsection_headers_collect_all_indices() {
        let body = "===Etymology 1===\na\n====Noun====\nb\n===Etymology 2===\nc\n====Noun====\nd\n";
        let subs = split_into_subsections(body);
        assert_eq!(subs.by_name["Noun"], vec![1, 3]);
        assert_eq!(subs.rejoin(), body);
    }

    #[test]
    fn test_find_modifiable_section_peels_tail() {
        let found = find_modifiable_section(PAGE, Some("English")).unwrap();
        assert!(found.has_other_languages);
        assert!(found.body.ends_with("# a thing\n"));
        assert_eq!(found.tail, "----\n[[Category:English nouns]]\n");
        // untouched reassembly is the identity
        assert_eq!(found.reassemble(&found.body), PAGE);
    }

    #[test]
    fn test_find_modifiable_section_rewrites_only_target() {
        let found = find_modifiable_section(PAGE, Some("English")).unwrap();
        let new_body = found.body.replace("a thing", "a widget");
        let rebuilt = found.reassemble(&new_body);
        assert!(rebuilt.contains("a widget"));
        assert!(rebuilt.contains("{{fi-verb}}"));
        // the tail stays after the rewritten body
        assert!(rebuilt.contains("a widget\n----\n[[Category:English nouns]]\n==Finnish=="));
    }

    #[test]
    fn test_missing_language_is_reported_not_fatal() {
        let err = find_modifiable_section(PAGE, Some("Latin")).unwrap_err();
        assert_eq!(
            err,
            SplitError::LanguageNotFound {
                language: "Latin".to_string()
            }
        );
    }

    #[test]
    fn test_no_language_means_whole_text_is_body() {
        let found = find_modifiable_section("just a body\n", None).unwrap();
        assert_eq!(found.body, "just a body\n");
        assert_eq!(found.reassemble("new body\n"), "new body\n");
    }
}
