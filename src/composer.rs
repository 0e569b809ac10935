//! Folds an ordered chain of source maps into one flat map.
//!
//! The chain is interpreted as successive transformations applied in
//! order: `maps[0]` runs first against the original sources, `maps.last()`
//! runs last and produces the final generated code. Composition walks
//! every segment of the last map and, for each one, re-resolves its
//! original position through the consumers built from every earlier map,
//! folding from the map nearest the tail back to `maps[0]`. A consumer
//! returning no mapping at any step turns that segment into a hole in the
//! output; an already-unmapped region of the tail map stays a hole too.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::consumer::Consumer;
use crate::error::{Error, Result};
use crate::facebook_sources::{FacebookSourceEntry, FacebookSourcesEntry};
use crate::position::GeneratedPosition;
use crate::segment::{MappingMatrix, Segment, SegmentLine};
use crate::source_map::{encode_mappings, FlatSourceMap, ParsedMap};

/// Compose `maps` (in application order, earliest transform first) into a
/// single flat map from the original sources of `maps[0]` to the generated
/// positions of `maps.last()`.
///
/// # Errors
///
/// Returns [`Error::UnsupportedComposition`] if `maps` is empty, if any map
/// other than the first carries more than one source (the chain assumes
/// only the deepest stage concatenates multiple original files; every
/// later transform consumes and re-emits a single file), or if the tail
/// map is not a flat map.
pub fn compose(mut maps: Vec<ParsedMap>) -> Result<FlatSourceMap> {
    if maps.is_empty() {
        return Err(Error::UnsupportedComposition("no maps to compose".to_string()));
    }
    for (idx, map) in maps.iter().enumerate().skip(1) {
        if idx != maps.len() - 1 && map.source_count() > 1 {
            return Err(Error::UnsupportedComposition(format!(
                "intermediate map at position {idx} has {} sources; only the first map in a \
                 composition chain may carry more than one",
                map.source_count()
            )));
        }
    }

    let tail = match maps.pop().expect("checked non-empty above") {
        ParsedMap::Flat(m) => m,
        ParsedMap::Indexed(_) => {
            return Err(Error::UnsupportedComposition(
                "the last map in a composition chain must be a flat map".to_string(),
            ));
        }
    };
    let consumers: Vec<Consumer> = maps.into_iter().map(Consumer::new).collect();

    let mut interner = Interner::default();
    let mut lines: Vec<SegmentLine> = Vec::with_capacity(tail.mapping_matrix().line_count());

    for (_, tail_segments) in tail.mapping_matrix().lines() {
        let mut out_line = Vec::with_capacity(tail_segments.len());
        for tail_segment in tail_segments {
            let emitted = resolve_through_chain(tail_segment, &tail, &consumers, &mut interner);
            out_line.push(emitted);
        }
        lines.push(out_line);
    }

    let (sources, names) = interner.into_tables();
    let x_facebook_sources = interner.facebook_sources;
    let x_facebook_sources =
        if x_facebook_sources.iter().all(Option::is_none) { None } else { Some(x_facebook_sources) };

    Ok(FlatSourceMap {
        file: tail.file.clone(),
        source_root: None,
        sources,
        source_contents: Vec::new(),
        names,
        x_google_ignore_list: None,
        x_facebook_sources,
        debug_id: tail.debug_id.clone(),
        mapping_matrix: MappingMatrix::with_lines(lines),
    })
}

/// Resolve one segment of the tail map through the consumer chain,
/// returning either a fresh mapped segment (interned into `interner`) or a
/// hole, and never failing: an unresolvable fold is itself the hole.
fn resolve_through_chain(
    tail_segment: &Segment,
    tail: &FlatSourceMap,
    consumers: &[Consumer],
    interner: &mut Interner,
) -> Segment {
    let Some(source_idx) = tail_segment.source else {
        // The tail map already declares this generated column unmapped.
        return Segment::hole(tail_segment.gen_col);
    };

    let mut source = Arc::clone(&tail.sources[source_idx as usize]);
    let mut line = tail_segment.orig_line + 1;
    let mut column = tail_segment.orig_col;
    // Seeded from the tail; kept unless the tail had no name, in which case
    // the first (shallowest) deeper consumer to supply one wins. A name is
    // never overwritten once set, so the tail-most non-null name always
    // survives the fold.
    let mut name = tail_segment.name.map(|i| Arc::clone(&tail.names[i as usize]));
    let mut facebook_sources: Option<FacebookSourcesEntry> = if consumers.is_empty() {
        tail.x_facebook_sources.as_ref().and_then(|t| t.get(source_idx as usize)).cloned()
    } else {
        None
    };

    for consumer in consumers.iter().rev() {
        let query = GeneratedPosition::new(line, column);
        let Some(resolved) = consumer.resolve(query) else {
            return Segment::hole(tail_segment.gen_col);
        };
        let Some(resolved_source) = resolved.position.source else {
            return Segment::hole(tail_segment.gen_col);
        };
        source = resolved_source;
        line = resolved.position.line;
        column = resolved.position.column;
        if name.is_none() {
            name = resolved.position.name;
        }
        // The channel belongs to whichever consumer last supplied a source;
        // by construction that's the deepest (closest to the original
        // authored files) consumer successfully folded through.
        facebook_sources = resolved.facebook_sources;
    }

    let (source_id, source_is_new) = interner.intern_source(&source);
    if source_is_new {
        interner.facebook_sources.push(facebook_sources.flatten());
    }
    let name_id = name.map(|n| interner.intern_name(&n).0);

    Segment::mapped(tail_segment.gen_col, source_id, line - 1, column, name_id)
}

#[derive(Default)]
struct Interner {
    sources: Vec<Arc<str>>,
    sources_map: FxHashMap<Arc<str>, u32>,
    names: Vec<Arc<str>>,
    names_map: FxHashMap<Arc<str>, u32>,
    facebook_sources: Vec<Option<Arc<[FacebookSourceEntry]>>>,
}

impl Interner {
    /// Intern `source`, returning its id and whether this is its first
    /// occurrence (first-seen order is what determines the output `id`).
    fn intern_source(&mut self, source: &Arc<str>) -> (u32, bool) {
        if let Some(&id) = self.sources_map.get(source.as_ref()) {
            return (id, false);
        }
        let id = self.sources.len() as u32;
        self.sources_map.insert(Arc::clone(source), id);
        self.sources.push(Arc::clone(source));
        (id, true)
    }

    fn intern_name(&mut self, name: &Arc<str>) -> (u32, bool) {
        if let Some(&id) = self.names_map.get(name.as_ref()) {
            return (id, false);
        }
        let id = self.names.len() as u32;
        self.names_map.insert(Arc::clone(name), id);
        self.names.push(Arc::clone(name));
        (id, true)
    }

    fn into_tables(self) -> (Vec<Arc<str>>, Vec<Arc<str>>) {
        (self.sources, self.names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ParsedMap {
        ParsedMap::from_json_str(json).unwrap()
    }

    #[test]
    fn single_map_compose_is_near_identity() {
        let json = r#"{"version":3,"sources":["a.js"],"names":["x"],"mappings":"AAAAA,CAACA"}"#;
        let composed = compose(vec![parse(json)]).unwrap();
        assert_eq!(composed.sources.iter().map(AsRef::as_ref).collect::<Vec<_>>(), vec!["a.js"]);
        assert_eq!(composed.names.iter().map(AsRef::as_ref).collect::<Vec<_>>(), vec!["x"]);
        assert_eq!(encode_mappings(&composed.mapping_matrix), "AAAAA,CAACA");
    }

    #[test]
    fn hole_in_first_map_preserved() {
        // a.js -> b.js chain with a hole introduced by the second map.
        let m1 = parse(r#"{"version":3,"sources":["a.js"],"names":["a"],"mappings":"AAACA,CAACA"}"#);
        let m2 = parse(
            r#"{"version":3,"sources":["b.js"],"names":["b"],"mappings":"AAAAA,C,CAAAA,CAACA"}"#,
        );
        let composed = compose(vec![m1, m2]).unwrap();
        assert_eq!(encode_mappings(&composed.mapping_matrix), "AAACA,C,CAAAA,CAACA");
        assert_eq!(composed.sources.iter().map(AsRef::as_ref).collect::<Vec<_>>(), vec!["a.js"]);
        assert_eq!(composed.names.iter().map(AsRef::as_ref).collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(composed.x_facebook_sources, None);
    }

    #[test]
    fn hole_in_tail_map_survives_even_if_earlier_map_mapped_it() {
        let m1 = parse(r#"{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA,EAAC"}"#);
        let m2 = parse(r#"{"version":3,"sources":["b.js"],"names":[],"mappings":"AAAA,C,CAAC"}"#);
        let composed = compose(vec![m1, m2]).unwrap();
        // Middle segment stays a hole: the tail map declared it unmapped.
        let line = composed.mapping_matrix.line(1).unwrap();
        assert!(line[1].is_hole());
    }

    #[test]
    fn tail_name_wins_when_tail_segment_has_one() {
        // The first map carries the pre-mangle name 'a'; the tail segment
        // has its own name 'x'. The tail-most non-null name survives.
        let m1 = parse(r#"{"version":3,"sources":["orig.js"],"names":["a"],"mappings":"AAAAA"}"#);
        let m2 = parse(r#"{"version":3,"sources":["mid.js"],"names":["x"],"mappings":"AAAAA"}"#);
        let composed = compose(vec![m1, m2]).unwrap();
        assert_eq!(composed.names.iter().map(AsRef::as_ref).collect::<Vec<_>>(), vec!["x"]);
    }

    #[test]
    fn earlier_map_name_surfaces_when_tail_segment_has_none() {
        // The tail segment carries no name (arity-4); the fold falls back
        // to the first deeper map that supplies one.
        let m1 = parse(r#"{"version":3,"sources":["orig.js"],"names":["a"],"mappings":"AAAAA"}"#);
        let m2 = parse(r#"{"version":3,"sources":["mid.js"],"names":[],"mappings":"AAAA"}"#);
        let composed = compose(vec![m1, m2]).unwrap();
        assert_eq!(composed.names.iter().map(AsRef::as_ref).collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn rejects_empty_chain() {
        assert!(matches!(compose(vec![]), Err(Error::UnsupportedComposition(_))));
    }

    #[test]
    fn rejects_indexed_tail() {
        let indexed = parse(
            r#"{"version":3,"sections":[{"offset":{"line":0,"column":0},
               "map":{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA"}}]}"#,
        );
        let err = compose(vec![indexed]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedComposition(_)));
    }

    #[test]
    fn rejects_multi_source_intermediate_map() {
        let m0 = parse(r#"{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA"}"#);
        let m1 =
            parse(r#"{"version":3,"sources":["x.js","y.js"],"names":[],"mappings":"AAAA,AACA"}"#);
        let tail = parse(r#"{"version":3,"sources":["b.js"],"names":[],"mappings":"AAAA"}"#);
        let err = compose(vec![m0, m1, tail]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedComposition(_)));
    }
}
