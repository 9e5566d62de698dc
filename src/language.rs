//! Language names and standard section headings.
//!
//! The registry is a plain constructed-once value handed to whatever needs
//! it, never ambient global state, so everything stays testable without a
//! live backend. The built-in table covers the languages the bots most often
//! touch; a batch against a full language set seeds the registry from a
//! caller-supplied list instead.

use std::collections::HashSet;

pub const LANGUAGE_NAMES: [&str; 60] = [
    "Afrikaans",
    "Albanian",
    "Arabic",
    "Armenian",
    "Azerbaijani",
    "Basque",
    "Belarusian",
    "Bengali",
    "Bulgarian",
    "Catalan",
    "Chinese",
    "Czech",
    "Danish",
    "Dutch",
    "English",
    "Esperanto",
    "Estonian",
    "Finnish",
    "French",
    "Galician",
    "Georgian",
    "German",
    "Greek",
    "Hebrew",
    "Hindi",
    "Hungarian",
    "Icelandic",
    "Indonesian",
    "Irish",
    "Italian",
    "Japanese",
    "Kazakh",
    "Korean",
    "Latin",
    "Latvian",
    "Lithuanian",
    "Macedonian",
    "Malay",
    "Maltese",
    "Mongolian",
    "Norwegian",
    "Old English",
    "Persian",
    "Polish",
    "Portuguese",
    "Romanian",
    "Russian",
    "Serbo-Croatian",
    "Slovak",
    "Slovene",
    "Spanish",
    "Swahili",
    "Swedish",
    "Tagalog",
    "Thai",
    "Translingual",
    "Turkish",
    "Ukrainian",
    "Vietnamese",
    "Welsh",
];

/// Section headings a well-formed entry is expected to use. Kept for bots
/// that sanity-check entry structure before editing it.
pub const STANDARD_HEADINGS: [&str; 36] = [
    "Adjective",
    "Adverb",
    "Alternative forms",
    "Anagrams",
    "Antonyms",
    "Article",
    "Conjunction",
    "Declension",
    "Conjugation",
    "Derived terms",
    "Descendants",
    "Determiner",
    "Etymology",
    "Further reading",
    "Hypernyms",
    "Hyponyms",
    "Interjection",
    "Noun",
    "Numeral",
    "Participle",
    "Particle",
    "Phrase",
    "Postposition",
    "Prefix",
    "Preposition",
    "Pronoun",
    "Pronunciation",
    "Proper noun",
    "Quotations",
    "References",
    "Related terms",
    "See also",
    "Suffix",
    "Synonyms",
    "Usage notes",
    "Verb",
];

/// Known language names, for validating `==...==` headers.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    names: HashSet<String>,
}

impl LanguageRegistry {
    /// Registry over the built-in table.
    pub fn builtin() -> Self {
        Self::from_names(LANGUAGE_NAMES.iter().copied())
    }

    /// Registry over any caller-supplied name list (e.g. one fetched from
    /// the backend ahead of a batch).
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LanguageRegistry {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_language(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Whether a subsection heading is one of the standard ones. Numbered
/// etymology headings ("Etymology 3") count as standard.
pub fn is_standard_heading(heading: &str) -> bool {
    if STANDARD_HEADINGS.contains(&heading) {
        return true;
    }
    if let Some(number) = heading.strip_prefix("Etymology ") {
        return !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = LanguageRegistry::builtin();
        assert!(registry.is_language("English"));
        assert!(registry.is_language("Translingual"));
        assert!(!registry.is_language("Klingon"));
    }

    #[test]
    fn test_custom_registry() {
        let registry = LanguageRegistry::from_names(["Lojban"]);
        assert!(registry.is_language("Lojban"));
        assert!(!registry.is_language("English"));
    }

    #[test]
    fn test_numbered_etymology_is_standard() {
        assert!(is_standard_heading("Etymology"));
        assert!(is_standard_heading("Etymology 12"));
        assert!(!is_standard_heading("Etymology x"));
        assert!(!is_standard_heading("Trivia"));
    }
}
