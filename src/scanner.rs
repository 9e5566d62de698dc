//! Balanced-delimiter scanner.
//!
//! Splits text into alternating outside-text / balanced-span runs for one or
//! more delimiter pairs scanned simultaneously (`{{`/`}}` and `[[`/`]]` for
//! wikitext). Depth is tracked per pair: an open `[[` inside a `{{...}}` span
//! pushes the `[[` group, and the next close must match whichever group is
//! currently open. Used by the document parser for template boundaries and by
//! list-splitting helpers that must not split inside a nested call.

use crate::error::ScanError;

/// One run of a scanned text: either text outside any balanced span, or one
/// complete top-level balanced span (delimiters included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Outside(String),
    /// `group` is the index into the pair slice passed to [`scan_multi`].
    Span { group: usize, text: String },
}

impl Piece {
    pub fn text(&self) -> &str {
        match self {
            Piece::Outside(t) => t,
            Piece::Span { text, .. } => text,
        }
    }
}

/// Scan with a single delimiter pair, returning a strictly alternating list
/// starting and ending with outside text (possibly empty at either end).
///
/// `scan("a{{b{{c}}d}}e", "{{", "}}")` yields `["a", "{{b{{c}}d}}", "e"]`.
pub fn scan(text: &str, open: &str, close: &str) -> Result<Vec<String>, ScanError> {
    let pieces = scan_multi(text, &[(open, close)])?;
    Ok(alternating(pieces))
}

/// Scan with several delimiter pairs at once. Top-level spans of every group
/// appear as [`Piece::Span`] entries in document order; everything else is
/// outside text. Concatenating all piece texts reproduces the input exactly.
pub fn scan_multi(text: &str, pairs: &[(&str, &str)]) -> Result<Vec<Piece>, ScanError> {
    let mut pieces: Vec<Piece> = Vec::new();
    // (group, byte position of the open delimiter)
    let mut stack: Vec<(usize, usize)> = Vec::new();
    let mut outside_start = 0;
    let mut span_start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;

    'outer: while i < bytes.len() {
        for (group, (open, _)) in pairs.iter().enumerate() {
            if text[i..].starts_with(open) {
                if stack.is_empty() {
                    span_start = i;
                    if outside_start < i {
                        pieces.push(Piece::Outside(text[outside_start..i].to_string()));
                    } else if pieces.is_empty() || matches!(pieces.last(), Some(Piece::Span { .. }))
                    {
                        pieces.push(Piece::Outside(String::new()));
                    }
                }
                stack.push((group, i));
                i += open.len();
                continue 'outer;
            }
        }
        for (group, (_, close)) in pairs.iter().enumerate() {
            if text[i..].starts_with(close) {
                match stack.last() {
                    None => {
                        return Err(ScanError::UnmatchedClose {
                            delim: close.to_string(),
                            pos: i,
                        });
                    }
                    Some(&(open_group, _)) if open_group != group => {
                        return Err(ScanError::MismatchedClose {
                            found: close.to_string(),
                            expected: pairs[open_group].1.to_string(),
                            pos: i,
                        });
                    }
                    Some(&(open_group, _)) => {
                        stack.pop();
                        i += close.len();
                        if stack.is_empty() {
                            pieces.push(Piece::Span {
                                group: open_group,
                                text: text[span_start..i].to_string(),
                            });
                            outside_start = i;
                        }
                        continue 'outer;
                    }
                }
            }
        }
        // advance one whole character, not one byte
        i += text[i..].chars().next().map(char::len_utf8).unwrap_or(1);
    }

    if let Some(&(group, pos)) = stack.last() {
        return Err(ScanError::UnmatchedOpen {
            delim: pairs[group].0.to_string(),
            pos,
        });
    }
    if outside_start < text.len() || pieces.is_empty() {
        pieces.push(Piece::Outside(text[outside_start..].to_string()));
    } else if matches!(pieces.last(), Some(Piece::Span { .. })) {
        pieces.push(Piece::Outside(String::new()));
    }
    Ok(pieces)
}

/// Split `text` on `sep`, but only where the separator occurs outside every
/// balanced span of every supplied delimiter pair. The separators themselves
/// are dropped; the spans stay embedded in the returned segments.
///
/// `split_outside("a,{{b,c}},d", &[("{{", "}}")], ",")` yields
/// `["a", "{{b,c}}", "d"]`.
pub fn split_outside(
    text: &str,
    pairs: &[(&str, &str)],
    sep: &str,
) -> Result<Vec<String>, ScanError> {
    let mut segments = Vec::new();
    let mut current = String::new();
    for piece in scan_multi(text, pairs)? {
        match piece {
            Piece::Span { text, .. } => current.push_str(&text),
            Piece::Outside(out) => {
                let mut parts = out.split(sep);
                if let Some(first) = parts.next() {
                    current.push_str(first);
                }
                for part in parts {
                    segments.push(std::mem::take(&mut current));
                    current.push_str(part);
                }
            }
        }
    }
    segments.push(current);
    Ok(segments)
}

fn alternating(pieces: Vec<Piece>) -> Vec<String> {
    pieces.into_iter().map(|p| p.text().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_nested() {
        let result = scan("a{{b{{c}}d}}e", "{{", "}}").unwrap();
        assert_eq!(result, vec!["a", "{{b{{c}}d}}", "e"]);
    }

    #[test]
    fn test_scan_leading_and_trailing_spans() {
        let result = scan("{{a}}x{{b}}", "{{", "}}").unwrap();
        assert_eq!(result, vec!["", "{{a}}", "x", "{{b}}", ""]);
    }

    #[test]
    fn test_scan_no_spans() {
        let result = scan("plain text", "{{", "}}").unwrap();
        assert_eq!(result, vec!["plain text"]);
    }

    #[test]
    fn test_unmatched_open_reports_position() {
        let err = scan("a{{b", "{{", "}}").unwrap_err();
        assert_eq!(
            err,
            ScanError::UnmatchedOpen {
                delim: "{{".to_string(),
                pos: 1
            }
        );
    }

    #[test]
    fn test_unmatched_close_reports_position() {
        let err = scan("ab}}c", "{{", "}}").unwrap_err();
        assert_eq!(
            err,
            ScanError::UnmatchedClose {
                delim: "}}".to_string(),
                pos: 2
            }
        );
    }

    #[test]
    fn test_two_groups_track_depth_separately() {
        let pieces = scan_multi("x{{a|[[b|c]]}}y[[d]]", &[("{{", "}}"), ("[[", "]]")]).unwrap();
        assert_eq!(
            pieces,
            vec![
                Piece::Outside("x".to_string()),
                Piece::Span {
                    group: 0,
                    text: "{{a|[[b|c]]}}".to_string()
                },
                Piece::Outside("y".to_string()),
                Piece::Span {
                    group: 1,
                    text: "[[d]]".to_string()
                },
                Piece::Outside("".to_string()),
            ]
        );
    }

    #[test]
    fn test_mismatched_close_is_an_error() {
        let err = scan_multi("{{a]]", &[("{{", "}}"), ("[[", "]]")]).unwrap_err();
        assert_eq!(
            err,
            ScanError::MismatchedClose {
                found: "]]".to_string(),
                expected: "}}".to_string(),
                pos: 3
            }
        );
    }

    #[test]
    fn test_split_outside_respects_spans() {
        let parts = split_outside("a,{{b,c}},d", &[("{{", "}}")], ",").unwrap();
        assert_eq!(parts, vec!["a", "{{b,c}}", "d"]);
    }

    #[test]
    fn test_split_outside_pipe_with_links() {
        let parts = split_outside(
            "en-noun|head=[[a|b]]|pl",
            &[("{{", "}}"), ("[[", "]]")],
            "|",
        )
        .unwrap();
        assert_eq!(parts, vec!["en-noun", "head=[[a|b]]", "pl"]);
    }

    #[test]
    fn test_round_trip_concatenation() {
        let text = "pre {{t|one|[[two|2]]}} mid [[link]] post";
        let pieces = scan_multi(text, &[("{{", "}}"), ("[[", "]]")]).unwrap();
        let joined: String = pieces.iter().map(|p| p.text()).collect();
        assert_eq!(joined, text);
    }
}
