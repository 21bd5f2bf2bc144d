//! Byte ranges and text edits

use serde::{Deserialize, Serialize};

use crate::error::{GroveError, Result};
use crate::model::FileId;

/// Half-open byte range `[start, end)` into a file's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn new(start: usize, end: usize) -> Self {
        ByteRange { start, end }
    }

    /// Zero-width range at `offset`.
    pub fn point(offset: usize) -> Self {
        ByteRange { start: offset, end: offset }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, other: &ByteRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Whether an edit over `edit` invalidates something spanning `self`.
    ///
    /// Insertions only invalidate when they land strictly inside the range, so
    /// text appended at either boundary leaves the range intact.
    pub fn touched_by(&self, edit: &ByteRange) -> bool {
        if edit.is_empty() {
            self.start < edit.start && edit.start < self.end
        } else {
            edit.start < self.end && self.start < edit.end
        }
    }

    /// Conflict test between two staged edits on the same file.
    pub fn conflicts_with(&self, other: &ByteRange) -> bool {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => self.start == other.start,
            (true, false) => other.start < self.start && self.start < other.end,
            (false, true) => self.start < other.start && other.start < self.end,
            (false, false) => self.start < other.end && other.start < self.end,
        }
    }

    pub fn shifted(&self, delta: isize) -> ByteRange {
        ByteRange {
            start: offset_by(self.start, delta),
            end: offset_by(self.end, delta),
        }
    }

    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.start..self.end)
    }
}

impl From<std::ops::Range<usize>> for ByteRange {
    fn from(r: std::ops::Range<usize>) -> Self {
        ByteRange::new(r.start, r.end)
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

fn offset_by(offset: usize, delta: isize) -> usize {
    if delta >= 0 {
        offset + delta as usize
    } else {
        offset.saturating_sub(delta.unsigned_abs())
    }
}

/// A pending replacement of `range` with `text` in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub range: ByteRange,
    pub text: String,
}

impl TextEdit {
    pub fn new(range: ByteRange, text: impl Into<String>) -> Self {
        TextEdit { range, text: text.into() }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        TextEdit::new(ByteRange::point(offset), text)
    }

    pub fn delete(range: ByteRange) -> Self {
        TextEdit::new(range, String::new())
    }

    /// Length change this edit causes.
    pub fn delta(&self) -> isize {
        self.text.len() as isize - self.range.len() as isize
    }
}

/// Check that `range` is a valid edit target in `text`.
pub fn check_range(file: FileId, text: &str, range: ByteRange) -> Result<()> {
    if range.start > range.end || range.end > text.len() {
        return Err(GroveError::OutOfBounds { file, range, len: text.len() });
    }
    if !text.is_char_boundary(range.start) || !text.is_char_boundary(range.end) {
        return Err(GroveError::NotCharBoundary { file, range });
    }
    Ok(())
}

/// Validate a batch of edits against `text`: bounds, char boundaries and
/// pairwise conflicts.
pub fn validate_edits(file: FileId, path: &str, text: &str, edits: &[TextEdit]) -> Result<()> {
    for edit in edits {
        check_range(file, text, edit.range)?;
    }
    for (i, a) in edits.iter().enumerate() {
        for b in &edits[i + 1..] {
            if a.range.conflicts_with(&b.range) {
                return Err(GroveError::Overlap {
                    file,
                    path: path.to_string(),
                    existing: a.range,
                    new: b.range,
                });
            }
        }
    }
    Ok(())
}

/// Sort edits into application order: descending start, replacements before
/// insertions that share their start.
pub fn descending(edits: &[TextEdit]) -> Vec<TextEdit> {
    let mut sorted = edits.to_vec();
    sorted.sort_by(|a, b| {
        b.range
            .start
            .cmp(&a.range.start)
            .then(b.range.end.cmp(&a.range.end))
    });
    sorted
}

/// Apply validated edits to `text`.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
    let mut out = text.to_string();
    for edit in descending(edits) {
        out.replace_range(edit.range.start..edit.range.end, &edit.text);
    }
    out
}

/// Net shift applied to an offset that lies at or after every edit preceding it.
pub fn shift_at(edits: &[TextEdit], offset: usize) -> isize {
    edits
        .iter()
        .filter(|e| e.range.end <= offset)
        .map(TextEdit::delta)
        .sum()
}

/// Whether any edit invalidates `range`.
pub fn any_touches(edits: &[TextEdit], range: &ByteRange) -> bool {
    edits.iter().any(|e| range.touched_by(&e.range))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicts() {
        let a = ByteRange::new(2, 6);
        assert!(a.conflicts_with(&ByteRange::new(5, 9)));
        assert!(!a.conflicts_with(&ByteRange::new(6, 9)));
        assert!(a.conflicts_with(&ByteRange::point(3)));
        assert!(!a.conflicts_with(&ByteRange::point(2)));
        assert!(!a.conflicts_with(&ByteRange::point(6)));
        assert!(ByteRange::point(4).conflicts_with(&ByteRange::point(4)));
        assert!(!ByteRange::point(4).conflicts_with(&ByteRange::point(5)));
    }

    #[test]
    fn test_touched_by() {
        let sym = ByteRange::new(10, 20);
        assert!(sym.touched_by(&ByteRange::new(15, 16)));
        assert!(sym.touched_by(&ByteRange::new(5, 11)));
        assert!(!sym.touched_by(&ByteRange::new(20, 25)));
        assert!(!sym.touched_by(&ByteRange::point(20)));
        assert!(!sym.touched_by(&ByteRange::point(10)));
        assert!(sym.touched_by(&ByteRange::point(11)));
    }

    #[test]
    fn test_apply_edits_descending() {
        let text = "def add(a, b): return a + b";
        let edits = vec![
            TextEdit::new(ByteRange::new(4, 7), "sum_"),
            TextEdit::new(ByteRange::new(22, 23), "x"),
        ];
        assert_eq!(apply_edits(text, &edits), "def sum_(a, b): return x + b");
    }

    #[test]
    fn test_insert_and_replace_at_same_start() {
        let edits = vec![
            TextEdit::insert(0, "# head\n"),
            TextEdit::new(ByteRange::new(0, 1), "y"),
        ];
        validate_edits(FileId(0), "t.py", "x = 1", &edits).unwrap();
        assert_eq!(apply_edits("x = 1", &edits), "# head\ny = 1");
    }

    #[test]
    fn test_validate_rejects_overlap_and_bounds() {
        let text = "hello world";
        let overlapping = vec![
            TextEdit::new(ByteRange::new(0, 5), "bye"),
            TextEdit::new(ByteRange::new(3, 8), "x"),
        ];
        assert!(matches!(
            validate_edits(FileId(1), "a.py", text, &overlapping),
            Err(GroveError::Overlap { .. })
        ));
        let oob = vec![TextEdit::new(ByteRange::new(8, 40), "x")];
        assert!(matches!(
            validate_edits(FileId(1), "a.py", text, &oob),
            Err(GroveError::OutOfBounds { len: 11, .. })
        ));
    }

    #[test]
    fn test_char_boundary() {
        let text = "é = 1";
        assert!(matches!(
            check_range(FileId(0), text, ByteRange::new(1, 2)),
            Err(GroveError::NotCharBoundary { .. })
        ));
    }

    #[test]
    fn test_shift_at() {
        let edits = vec![
            TextEdit::new(ByteRange::new(0, 3), "abcdef"),
            TextEdit::delete(ByteRange::new(10, 12)),
        ];
        assert_eq!(shift_at(&edits, 5), 3);
        assert_eq!(shift_at(&edits, 12), 1);
        assert_eq!(ByteRange::new(20, 25).shifted(shift_at(&edits, 20)), ByteRange::new(21, 26));
    }
}
