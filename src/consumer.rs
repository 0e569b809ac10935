//! The read side of the core: given a parsed map, answer
//! `original_position_for(generated_position)`.
//!
//! A [`Consumer`] is built once from a [`ParsedMap`] and is immutable and
//! freely shareable afterwards — queries take `&self`. Flat maps resolve
//! directly against their decoded [`MappingMatrix`]; indexed maps dispatch
//! to whichever section's offset range contains the query and recurse, so
//! an indexed map of depth *d* costs *d* dispatch steps per query on top of
//! the flat lookup.

use std::sync::Arc;

use crate::facebook_sources::FacebookSourcesEntry;
use crate::position::{GeneratedPosition, OriginalPosition};
use crate::source_map::{FlatSourceMap, IndexedSourceMap, ParsedMap};

/// A resolved original position together with the `x_facebook_sources`
/// entry (if any) the owning flat map carries for that source. Kept
/// separate from [`OriginalPosition`] because only the composer needs the
/// metadata channel; ordinary callers just want the position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Resolved {
    pub position: OriginalPosition,
    pub facebook_sources: Option<FacebookSourcesEntry>,
}

#[derive(Debug, Clone)]
pub enum Consumer {
    Flat(FlatConsumer),
    Indexed(IndexedConsumer),
}

impl Consumer {
    pub fn new(map: ParsedMap) -> Self {
        match map {
            ParsedMap::Flat(m) => Self::Flat(FlatConsumer { map: m }),
            ParsedMap::Indexed(m) => Self::Indexed(IndexedConsumer::build(m)),
        }
    }

    pub fn from_json_str(json: &str) -> crate::error::Result<Self> {
        ParsedMap::from_json_str(json).map(Self::new)
    }

    /// `original_position_for` from the external consumer surface: resolve
    /// a generated `(line, column)` to the original position it was mapped
    /// from, or `None` if the position falls in a hole or off the end of
    /// the decoded mappings.
    pub fn original_position_for(&self, pos: GeneratedPosition) -> Option<OriginalPosition> {
        self.resolve(pos).map(|r| r.position)
    }

    pub(crate) fn resolve(&self, pos: GeneratedPosition) -> Option<Resolved> {
        match self {
            Self::Flat(c) => c.resolve(pos),
            Self::Indexed(c) => c.resolve(pos),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlatConsumer {
    map: FlatSourceMap,
}

impl FlatConsumer {
    fn resolve(&self, pos: GeneratedPosition) -> Option<Resolved> {
        let segment = self.map.mapping_matrix().floor(pos.line, pos.column)?;
        let source_idx = segment.source? as usize;
        let source = Arc::clone(self.map.sources.get(source_idx)?);
        let name = segment.name.and_then(|i| self.map.names.get(i as usize)).map(Arc::clone);
        let facebook_sources = self
            .map
            .x_facebook_sources
            .as_ref()
            .and_then(|table| table.get(source_idx))
            .cloned();
        Some(Resolved {
            position: OriginalPosition {
                source: Some(source),
                line: segment.orig_line + 1,
                column: segment.orig_col,
                name,
            },
            facebook_sources,
        })
    }
}

#[derive(Debug, Clone)]
pub struct IndexedConsumer {
    sections: Vec<(GeneratedPosition, Consumer)>,
}

impl IndexedConsumer {
    fn build(map: IndexedSourceMap) -> Self {
        let sections = map
            .sections
            .into_iter()
            .map(|s| (s.offset, Consumer::new(*s.map)))
            .collect();
        Self { sections }
    }

    /// Locate the section whose offset is the greatest `<= pos`
    /// (non-decreasing offsets, ties broken by preferring the later
    /// section), then recurse with the query rebased into that section's
    /// local coordinate space.
    fn resolve(&self, pos: GeneratedPosition) -> Option<Resolved> {
        let idx = match self.sections.binary_search_by(|(offset, _)| offset.cmp(&pos)) {
            Ok(mut i) => {
                while i + 1 < self.sections.len() && self.sections[i + 1].0 == pos {
                    i += 1;
                }
                i
            }
            Err(0) => return None,
            Err(i) => i - 1,
        };
        let (offset, consumer) = &self.sections[idx];

        let local_line = pos.line.checked_sub(offset.line)?.checked_add(1)?;
        let local_col = if local_line == 1 { pos.column.checked_sub(offset.column)? } else { pos.column };

        consumer.resolve(GeneratedPosition::new(local_line, local_col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(json: &str) -> Consumer {
        Consumer::from_json_str(json).unwrap()
    }

    #[test]
    fn flat_floor_and_unmapped() {
        let c = flat(
            r#"{"version":3,"sources":["a.js"],"names":["x"],
               "mappings":"AAAA,SAACA"}"#,
        );
        let at_start = c.original_position_for(GeneratedPosition::new(1, 0)).unwrap();
        assert_eq!(at_start.source.as_deref(), Some("a.js"));
        assert_eq!(at_start.line, 1);
        assert_eq!(at_start.column, 0);

        // Line 2 doesn't exist.
        assert!(c.original_position_for(GeneratedPosition::new(2, 0)).is_none());
    }

    #[test]
    fn flat_hole_is_unmapped() {
        let c = flat(r#"{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA,C"}"#);
        // Column 0 is mapped.
        assert!(c.original_position_for(GeneratedPosition::new(1, 0)).is_some());
        // Column 1 is a hole (arity-1 segment) and extends to the end of the line.
        assert!(c.original_position_for(GeneratedPosition::new(1, 1)).is_none());
        assert!(c.original_position_for(GeneratedPosition::new(1, 50)).is_none());
    }

    #[test]
    fn indexed_single_section_matches_flat() {
        let flat_json = r#"{"version":3,"sources":["a.js"],"names":["n"],"mappings":"AAAAA,CAACA"}"#;
        let indexed_json = format!(
            r#"{{"version":3,"sections":[{{"offset":{{"line":0,"column":0}},"map":{flat_json}}}]}}"#
        );

        let flat_consumer = flat(flat_json);
        let indexed_consumer = flat(&indexed_json);

        for col in 0..5 {
            let pos = GeneratedPosition::new(1, col);
            assert_eq!(
                flat_consumer.original_position_for(pos),
                indexed_consumer.original_position_for(pos)
            );
        }
    }

    #[test]
    fn indexed_rebases_line_one_column_only() {
        // Section at offset (line=2 (0-based), column=100) -> internal offset line 3, col 100.
        let inner = r#"{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA;KAAA"}"#;
        let indexed_json = format!(
            r#"{{"version":3,"sections":[{{"offset":{{"line":2,"column":100}},"map":{inner}}}]}}"#
        );
        let c = flat(&indexed_json);

        // Effective gen line 1 of the section is outer line 3; column offset applies.
        let at_offset_col = c.original_position_for(GeneratedPosition::new(3, 100));
        assert!(at_offset_col.is_some());
        assert_eq!(at_offset_col.unwrap().column, 0);

        // Before the column offset on line 1 of the section: no mapping reachable.
        assert!(c.original_position_for(GeneratedPosition::new(3, 0)).is_none());

        // Line 2 of the section (outer line 4) does not get the column offset.
        let second_line = c.original_position_for(GeneratedPosition::new(4, 5));
        assert!(second_line.is_some());
    }
}
