//! Case-insensitive substring filter and highlight for single lines.

use crate::event::{AnnotatedLine, Run};

/// Filters `line` and splits it into highlighted and plain runs.
///
/// Returns `None` when `filter` is non-empty and does not occur in `line`.
/// Highlight matches are found leftmost-first and never overlap; scanning
/// resumes right after each match.
pub fn annotate(line: &str, filter: &str, highlight: &str) -> Option<AnnotatedLine> {
    if !contains_ignore_case(line, filter) {
        return None;
    }

    Some(split_highlights(line, highlight))
}

/// True when `needle` is empty or occurs in `haystack` ignoring case.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || find_ignore_case(haystack, needle, 0).is_some()
}

fn split_highlights(line: &str, highlight: &str) -> AnnotatedLine {
    if highlight.is_empty() || line.is_empty() {
        return AnnotatedLine {
            runs: vec![Run::plain(line)],
        };
    }

    let mut runs = Vec::new();
    let mut cursor = 0usize;
    while let Some((start, end)) = find_ignore_case(line, highlight, cursor) {
        if start > cursor {
            runs.push(Run::plain(&line[cursor..start]));
        }
        runs.push(Run::highlighted(&line[start..end]));
        cursor = end;
    }

    if cursor < line.len() {
        runs.push(Run::plain(&line[cursor..]));
    }

    AnnotatedLine { runs }
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Byte range of the first match of `needle` in `haystack` at or after `from`.
///
/// Comparison is per character so both ends of the range are char
/// boundaries of `haystack`.
fn find_ignore_case(haystack: &str, needle: &str, from: usize) -> Option<(usize, usize)> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }

    for (offset, _) in haystack[from..].char_indices() {
        let start = from + offset;
        let mut candidate = haystack[start..].char_indices();
        let mut end = start;
        let mut matched = true;

        for wanted in needle.chars() {
            match candidate.next() {
                Some((index, ch)) if chars_eq_ignore_case(ch, wanted) => {
                    end = start + index + ch.len_utf8();
                }
                _ => {
                    matched = false;
                    break;
                }
            }
        }

        if matched {
            return Some((start, end));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::{annotate, contains_ignore_case, find_ignore_case};
    use crate::event::Run;

    fn runs(line: &str, filter: &str, highlight: &str) -> Vec<(String, bool)> {
        annotate(line, filter, highlight)
            .map(|annotated| {
                annotated
                    .runs
                    .into_iter()
                    .map(|Run { text, highlighted }| (text, highlighted))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn filter_rejects_only_when_missing() {
        assert!(annotate("boot ok", "", "").is_some());
        assert!(annotate("boot ok", "boot", "").is_some());
        assert!(annotate("boot ok", "BOOT", "").is_some());
        assert!(annotate("boot ok", "fault", "").is_none());
        assert!(annotate("", "fault", "").is_none());
        assert!(annotate("", "", "").is_some());
    }

    #[test]
    fn empty_highlight_keeps_whole_line() {
        assert_eq!(runs("hello world", "", ""), vec![("hello world".to_owned(), false)]);
        assert_eq!(runs("", "", "x"), vec![(String::new(), false)]);
    }

    #[test]
    fn repeated_highlight_never_overlaps() {
        assert_eq!(
            runs("foofoobar", "foo", "foo"),
            vec![
                ("foo".to_owned(), true),
                ("foo".to_owned(), true),
                ("bar".to_owned(), false),
            ]
        );
        assert_eq!(
            runs("aaa", "", "aa"),
            vec![("aa".to_owned(), true), ("a".to_owned(), false)]
        );
    }

    #[test]
    fn highlight_is_case_insensitive_and_keeps_original_case() {
        assert_eq!(
            runs("[I] Temp WARN high, warn again", "", "warn"),
            vec![
                ("[I] Temp ".to_owned(), false),
                ("WARN".to_owned(), true),
                (" high, ".to_owned(), false),
                ("warn".to_owned(), true),
                (" again".to_owned(), false),
            ]
        );
    }

    #[test]
    fn runs_reassemble_the_line() {
        let lines = [
            "",
            "plain",
            "ERR err Err eRR",
            "Grüße aus München, GRÜSSE",
            "x=1 y=2 x=3",
            "ends with match: xx",
        ];
        let highlights = ["", "x", "err", "grü", "ü", "xx", "not there"];

        for line in lines {
            for highlight in highlights {
                let annotated = annotate(line, "", highlight).expect("empty filter matches");
                assert_eq!(annotated.text(), line, "highlight {highlight:?}");
                assert!(
                    annotated.runs.len() == 1 || annotated.runs.iter().all(|run| !run.text.is_empty())
                );
            }
        }
    }

    #[test]
    fn unicode_matches_stay_on_char_boundaries() {
        assert_eq!(find_ignore_case("Grüße", "GRÜ", 0), Some((0, 4)));
        assert_eq!(
            runs("München", "", "Ü"),
            vec![
                ("M".to_owned(), false),
                ("ü".to_owned(), true),
                ("nchen".to_owned(), false),
            ]
        );
    }

    #[test]
    fn contains_treats_empty_needle_as_match() {
        assert!(contains_ignore_case("", ""));
        assert!(contains_ignore_case("abc", ""));
        assert!(!contains_ignore_case("", "a"));
        assert!(contains_ignore_case("HardFault at 0x0800", "hardfault"));
    }
}
