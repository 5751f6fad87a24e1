//! Chunk spans and conversion from BIO tag sequences.

use std::fmt;

/// A chunk covering the tokens `start..end` of one sentence.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    start: usize,
    end: usize,
    kind: String,
}

impl Span {
    /// Creates a new span.
    ///
    /// `start` must be smaller than `end`.
    pub fn new<S>(start: usize, end: usize, kind: S) -> Self
    where
        S: Into<String>,
    {
        debug_assert!(start < end);
        Self {
            start,
            end,
            kind: kind.into(),
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Phrase type, e.g. `NP`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}..{}) {}", self.start, self.end, self.kind)
    }
}

/// Outside tag.
pub const OUTSIDE: &str = "O";

pub(crate) fn split_tag(tag: &str) -> (Option<char>, &str) {
    if let Some(kind) = tag.strip_prefix("B-") {
        (Some('B'), kind)
    } else if let Some(kind) = tag.strip_prefix("I-") {
        (Some('I'), kind)
    } else {
        (None, tag)
    }
}

/// Returns `false` if `tag` cannot follow `prev` in a BIO sequence.
///
/// `I-X` is only allowed after `B-X` or `I-X`.
pub fn is_valid_transition(prev: Option<&str>, tag: &str) -> bool {
    let (prefix, kind) = split_tag(tag);
    if prefix != Some('I') {
        return true;
    }
    prev.map_or(false, |prev| {
        let (prev_prefix, prev_kind) = split_tag(prev);
        prev_prefix.is_some() && prev_kind == kind
    })
}

/// Converts a chunk tag sequence into spans.
///
/// `B-X` opens a chunk; `I-X` extends an open chunk of the same type and otherwise opens a new
/// one; `O` closes the open chunk. Any other tag is treated as the beginning of a chunk of that
/// type. The result is sorted by start position and never overlaps.
pub fn spans_from_tags<S>(tags: &[S]) -> Vec<Span>
where
    S: AsRef<str>,
{
    let mut spans = vec![];
    let mut open: Option<(usize, &str)> = None;
    for (i, tag) in tags.iter().enumerate() {
        let tag = tag.as_ref();
        if tag == OUTSIDE {
            if let Some((start, kind)) = open.take() {
                spans.push(Span::new(start, i, kind));
            }
            continue;
        }
        let (prefix, kind) = split_tag(tag);
        match open {
            Some((_, open_kind)) if prefix == Some('I') && open_kind == kind => {}
            _ => {
                if let Some((start, open_kind)) = open.take() {
                    spans.push(Span::new(start, i, open_kind));
                }
                open = Some((i, kind));
            }
        }
    }
    if let Some((start, kind)) = open {
        spans.push(Span::new(start, tags.len(), kind));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rockwell_spans() {
        let spans = spans_from_tags(&["B-NP", "I-NP", "B-VP"]);

        assert_eq!(vec![Span::new(0, 2, "NP"), Span::new(2, 3, "VP")], spans);
    }

    #[test]
    fn test_outside_closes() {
        let spans = spans_from_tags(&["O", "B-NP", "O", "B-PP", "B-NP", "I-NP", "O"]);

        assert_eq!(
            vec![
                Span::new(1, 2, "NP"),
                Span::new(3, 4, "PP"),
                Span::new(4, 6, "NP"),
            ],
            spans
        );
    }

    #[test]
    fn test_stray_inside_opens() {
        let spans = spans_from_tags(&["O", "I-NP", "I-NP", "I-VP"]);

        assert_eq!(vec![Span::new(1, 3, "NP"), Span::new(3, 4, "VP")], spans);
    }

    #[test]
    fn test_bare_tag_opens() {
        let spans = spans_from_tags(&["NP", "NP", "O"]);

        assert_eq!(vec![Span::new(0, 1, "NP"), Span::new(1, 2, "NP")], spans);
    }

    #[test]
    fn test_sorted_and_disjoint() {
        let tags = [
            "B-NP", "I-NP", "B-VP", "I-VP", "O", "I-ADJP", "B-NP", "O", "B-SBAR", "I-NP",
        ];
        let spans = spans_from_tags(&tags);

        for pair in spans.windows(2) {
            assert!(pair[0].end() <= pair[1].start());
        }
        assert!(spans.iter().all(|s| s.start() < s.end() && s.end() <= tags.len()));
    }

    #[test]
    fn test_empty() {
        assert!(spans_from_tags::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_transitions() {
        assert!(is_valid_transition(None, "B-NP"));
        assert!(is_valid_transition(None, "O"));
        assert!(!is_valid_transition(None, "I-NP"));
        assert!(is_valid_transition(Some("B-NP"), "I-NP"));
        assert!(is_valid_transition(Some("I-NP"), "I-NP"));
        assert!(!is_valid_transition(Some("B-VP"), "I-NP"));
        assert!(!is_valid_transition(Some("O"), "I-NP"));
    }
}
