//! The `Page <index> <title>: <message>` log stream, in both directions.
//!
//! Batch runs emit this stream on stdout; companion runs re-parse it to
//! apply previously-logged fixes, so the format is a wire format between two
//! process invocations, not just prose. Two kinds of structured payload are
//! embedded:
//!
//! - `<from> old <to> new <end>` inside a message: a proposed template
//!   replacement;
//! - `<new> text <end>` inside a message: a proposed net-new insertion;
//! - a `Would save with comment = ...` line followed by a
//!   `-------- begin text --------` / `-------- end text --------` block: a
//!   full proposed page body.

use std::collections::HashMap;
use std::io::{self, Write};

use regex::Regex;

pub const BEGIN_TEXT_MARKER: &str = "-------- begin text --------";
pub const END_TEXT_MARKER: &str = "-------- end text --------";

pub fn page_line(index: u64, title: &str, message: &str) -> String {
    format!("Page {} {}: {}", index, title, message)
}

/// Emit one per-page log line on stdout. This stream is re-parsed later;
/// ambient diagnostics belong on the `log` crate instead.
pub fn log_page(index: u64, title: &str, message: &str) {
    println!("{}", page_line(index, title, message));
}

pub fn replacement_note(from: &str, to: &str) -> String {
    format!("<from> {} <to> {} <end>", from, to)
}

pub fn insertion_note(new_text: &str) -> String {
    format!("<new> {} <end>", new_text)
}

/// Emit a full proposed page body for later batch-application.
///
/// The body is line-framed between the markers, so a text lacking a final
/// newline gains one on the wire and parses back as `text + "\n"`. Real wiki
/// pages always end with a newline; nothing is lost for them.
pub fn write_proposed_save<W: Write>(
    w: &mut W,
    index: u64,
    title: &str,
    comment: &str,
    text: &str,
) -> io::Result<()> {
    writeln!(
        w,
        "{}",
        page_line(index, title, &format!("Would save with comment = {}", comment))
    )?;
    writeln!(w, "{}", BEGIN_TEXT_MARKER)?;
    w.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        writeln!(w)?;
    }
    writeln!(w, "{}", END_TEXT_MARKER)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedSave {
    pub index: u64,
    pub title: String,
    pub comment: String,
    pub text: String,
}

/// Every structured record recovered from one log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub index: u64,
    pub title: String,
    pub message: String,
    pub replacements: Vec<Replacement>,
    pub insertions: Vec<String>,
}

/// A parsed fix log.
#[derive(Debug, Default)]
pub struct FixLog {
    pub entries: Vec<LogEntry>,
    pub saves: Vec<ProposedSave>,
}

impl FixLog {
    /// Parse a previously captured log stream. Lines that are not `Page`
    /// lines (ambient chatter, warnings) are skipped.
    pub fn parse(text: &str) -> FixLog {
        let page_re = Regex::new(r"^Page (\d+) (.*?): (.*)$").unwrap();
        let from_to_re = Regex::new(r"<from> (.*?) <to> (.*?) <end>").unwrap();
        let new_re = Regex::new(r"<new> (.*?) <end>").unwrap();

        let mut log = FixLog::default();
        let mut lines = text.lines().peekable();
        while let Some(line) = lines.next() {
            let Some(caps) = page_re.captures(line) else {
                continue;
            };
            let index: u64 = caps[1].parse().unwrap_or(0);
            let title = caps[2].to_string();
            let message = caps[3].to_string();

            if let Some(comment) = message.strip_prefix("Would save with comment = ") {
                if lines.peek() == Some(&BEGIN_TEXT_MARKER) {
                    lines.next();
                    let mut body = String::new();
                    for body_line in lines.by_ref() {
                        if body_line == END_TEXT_MARKER {
                            break;
                        }
                        body.push_str(body_line);
                        body.push('\n');
                    }
                    log.saves.push(ProposedSave {
                        index,
                        title: title.clone(),
                        comment: comment.to_string(),
                        text: body,
                    });
                    continue;
                }
            }

            let mut replacements = Vec::new();
            for m in from_to_re.captures_iter(&message) {
                replacements.push(Replacement {
                    from: m[1].to_string(),
                    to: m[2].to_string(),
                });
            }
            // strip the replacement spans first so their halves cannot be
            // mistaken for insertion tags
            let without_replacements = from_to_re.replace_all(&message, "");
            let insertions: Vec<String> = new_re
                .captures_iter(&without_replacements)
                .map(|m| m[1].to_string())
                .collect();

            log.entries.push(LogEntry {
                index,
                title,
                message,
                replacements,
                insertions,
            });
        }
        log
    }

    /// Replacements per page title, for an apply run.
    pub fn replacements_by_title(&self) -> HashMap<String, Vec<Replacement>> {
        let mut map: HashMap<String, Vec<Replacement>> = HashMap::new();
        for entry in &self.entries {
            if !entry.replacements.is_empty() {
                map.entry(entry.title.clone())
                    .or_default()
                    .extend(entry.replacements.iter().cloned());
            }
        }
        map
    }

    /// Titles of all pages mentioned by any structured record, in first-seen
    /// order.
    pub fn titles(&self) -> Vec<String> {
        let mut seen = HashMap::new();
        let mut titles = Vec::new();
        for title in self
            .entries
            .iter()
            .filter(|e| !e.replacements.is_empty() || !e.insertions.is_empty())
            .map(|e| &e.title)
            .chain(self.saves.iter().map(|s| &s.title))
        {
            if seen.insert(title.clone(), ()).is_none() {
                titles.push(title.clone());
            }
        }
        titles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replacement_round_trip() {
        let note = replacement_note("{{en-noun|x}}", "{{en-noun|head=x}}");
        let line = page_line(3, "widget", &note);
        let log = FixLog::parse(&line);
        assert_eq!(log.entries.len(), 1);
        let entry = &log.entries[0];
        assert_eq!(entry.index, 3);
        assert_eq!(entry.title, "widget");
        assert_eq!(
            entry.replacements,
            vec![Replacement {
                from: "{{en-noun|x}}".to_string(),
                to: "{{en-noun|head=x}}".to_string(),
            }]
        );
    }

    #[test]
    fn test_insertion_round_trip() {
        let line = page_line(1, "thing", &insertion_note("{{rfdef|en}}"));
        let log = FixLog::parse(&line);
        assert_eq!(log.entries[0].insertions, vec!["{{rfdef|en}}"]);
        assert!(log.entries[0].replacements.is_empty());
    }

    #[test]
    fn test_mixed_notes_on_one_line() {
        let message = format!(
            "{}; {}",
            replacement_note("{{a}}", "{{b}}"),
            insertion_note("{{c}}")
        );
        let log = FixLog::parse(&page_line(7, "page", &message));
        assert_eq!(log.entries[0].replacements.len(), 1);
        assert_eq!(log.entries[0].insertions, vec!["{{c}}"]);
    }

    #[test]
    fn test_proposed_save_block_round_trip() {
        let mut out = Vec::new();
        write_proposed_save(&mut out, 12, "widget", "clean up headword", "==English==\nbody\n")
            .unwrap();
        let log = FixLog::parse(&String::from_utf8(out).unwrap());
        assert_eq!(log.saves.len(), 1);
        let save = &log.saves[0];
        assert_eq!(save.index, 12);
        assert_eq!(save.title, "widget");
        assert_eq!(save.comment, "clean up headword");
        assert_eq!(save.text, "==English==\nbody\n");
    }

    #[test]
    fn test_proposed_save_normalizes_missing_final_newline() {
        let mut out = Vec::new();
        write_proposed_save(&mut out, 1, "widget", "c", "no final newline").unwrap();
        let log = FixLog::parse(&String::from_utf8(out).unwrap());
        assert_eq!(log.saves[0].text, "no final newline\n");
    }

    #[test]
    fn test_non_page_lines_are_skipped() {
        let text = "WARNING: something odd\nPage 1 cat: no change\nstray prose\n";
        let log = FixLog::parse(text);
        assert_eq!(log.entries.len(), 1);
        assert_eq!(log.entries[0].message, "no change");
    }

    #[test]
    fn test_replacements_by_title_accumulate() {
        let text = format!(
            "{}\n{}\n",
            page_line(1, "cat", &replacement_note("{{a}}", "{{b}}")),
            page_line(2, "cat", &replacement_note("{{c}}", "{{d}}")),
        );
        let by_title = FixLog::parse(&text).replacements_by_title();
        assert_eq!(by_title["cat"].len(), 2);
    }
}
