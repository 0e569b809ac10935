//! Segment model and segment container.
//!
//! A [`Segment`] is one decoded VLQ record on a single generated line: either
//! a hole (arity 1 — the generated column is known but unmapped) or a
//! mapping into a source/name table by index (arity 4 or 5). [`MappingMatrix`]
//! is the line-indexed, `genCol`-sorted container used for floor lookups.

/// Sentinel index meaning "no name". Indices are otherwise plain table
/// offsets into a map's `names`/`sources` vectors.
pub(crate) const NO_NAME: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub gen_col: u32,
    /// `None` for a hole (arity 1).
    pub source: Option<u32>,
    pub orig_line: u32,
    pub orig_col: u32,
    pub name: Option<u32>,
}

impl Segment {
    pub fn hole(gen_col: u32) -> Self {
        Self { gen_col, source: None, orig_line: 0, orig_col: 0, name: None }
    }

    pub fn mapped(gen_col: u32, source: u32, orig_line: u32, orig_col: u32, name: Option<u32>) -> Self {
        Self { gen_col, source: Some(source), orig_line, orig_col, name }
    }

    pub fn is_hole(&self) -> bool {
        self.source.is_none()
    }
}

/// Segments for a single generated line, kept sorted ascending by `gen_col`.
pub type SegmentLine = Vec<Segment>;

/// A decoded `mappings` string: one entry per generated line (1-indexed in
/// the public API, 0-indexed here), each an ascending-by-`gen_col` vector of
/// segments. A line with no mappings at all is an empty vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingMatrix {
    lines: Vec<SegmentLine>,
}

impl MappingMatrix {
    pub fn with_lines(lines: Vec<SegmentLine>) -> Self {
        Self { lines }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, line_1_based: u32) -> Option<&[Segment]> {
        let idx = (line_1_based as usize).checked_sub(1)?;
        self.lines.get(idx).map(Vec::as_slice)
    }

    pub fn lines(&self) -> impl Iterator<Item = (u32, &[Segment])> {
        self.lines.iter().enumerate().map(|(i, segs)| (i as u32 + 1, segs.as_slice()))
    }

    /// The floor lookup: the greatest segment on
    /// `line` whose `gen_col <= col`, or `None` if `col` precedes every
    /// segment on that line (or the line has none / doesn't exist).
    pub fn floor(&self, line_1_based: u32, col: u32) -> Option<&Segment> {
        let segs = self.line(line_1_based)?;
        match segs.binary_search_by_key(&col, |s| s.gen_col) {
            Ok(idx) => segs.get(idx),
            Err(0) => None,
            Err(idx) => segs.get(idx - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> MappingMatrix {
        MappingMatrix::with_lines(vec![
            vec![Segment::mapped(0, 0, 0, 0, None), Segment::hole(5), Segment::mapped(10, 0, 1, 0, Some(0))],
            vec![],
            vec![Segment::mapped(3, 0, 2, 0, None)],
        ])
    }

    #[test]
    fn floor_exact_match() {
        let m = matrix();
        assert_eq!(m.floor(1, 0), Some(&Segment::mapped(0, 0, 0, 0, None)));
        assert_eq!(m.floor(1, 10), Some(&Segment::mapped(10, 0, 1, 0, Some(0))));
    }

    #[test]
    fn floor_inherits_preceding_segment() {
        let m = matrix();
        // Columns in [5, 10) inherit the hole at col 5.
        assert_eq!(m.floor(1, 7), Some(&Segment::hole(5)));
        // Columns in [0, 5) inherit the mapped segment at col 0.
        assert_eq!(m.floor(1, 4), Some(&Segment::mapped(0, 0, 0, 0, None)));
        // Columns past the last segment inherit it (extends to infinity).
        assert_eq!(m.floor(1, 1000), Some(&Segment::mapped(10, 0, 1, 0, Some(0))));
    }

    #[test]
    fn floor_before_first_segment_is_none() {
        let m = MappingMatrix::with_lines(vec![vec![Segment::mapped(5, 0, 0, 0, None)]]);
        assert_eq!(m.floor(1, 0), None);
    }

    #[test]
    fn floor_on_empty_or_missing_line_is_none() {
        let m = matrix();
        assert_eq!(m.floor(2, 0), None);
        assert_eq!(m.floor(1000, 0), None);
    }
}
