//! The parsed map representation and JSON codec: flat and indexed shapes,
//! decode/encode of the `mappings` VLQ stream, and the `x_facebook_sources`
//! auxiliary channel.
//!
//! Coordinate convention: the wire `mappings` string encodes original line
//! numbers and section offsets 0-based, like every real-world source map.
//! Internally, [`Segment::orig_line`] keeps that 0-based wire value; the
//! `+1` to the 1-based [`OriginalPosition`] happens only at the
//! [`crate::consumer::Consumer`] boundary. Generated line numbers don't
//! need this translation because they're only ever used as an array index
//! into [`MappingMatrix`], which already does the `-1` internally.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::facebook_sources::FacebookSourceEntry;
use crate::position::GeneratedPosition;
use crate::segment::{MappingMatrix, Segment, SegmentLine};
use crate::vlq;

/// A parsed source map: either flat or indexed.
#[derive(Debug, Clone)]
pub enum ParsedMap {
    Flat(FlatSourceMap),
    Indexed(IndexedSourceMap),
}

impl ParsedMap {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawMap = serde_json::from_str(json)?;
        parse_raw(raw)
    }

    /// Total number of distinct original sources reachable from this map,
    /// counting recursively through sections. Used by the composer to check
    /// the composer's precondition on non-first maps in a chain.
    pub fn source_count(&self) -> usize {
        match self {
            Self::Flat(m) => m.sources.len(),
            Self::Indexed(m) => m.sections.iter().map(|s| s.map.source_count()).sum(),
        }
    }
}

/// A flat map: mappings live in a single `mappings` string. This is also the
/// only shape the composer ever produces.
#[derive(Debug, Clone, Default)]
pub struct FlatSourceMap {
    pub file: Option<Arc<str>>,
    pub source_root: Option<String>,
    pub sources: Vec<Arc<str>>,
    pub source_contents: Vec<Option<Arc<str>>>,
    pub names: Vec<Arc<str>>,
    pub x_google_ignore_list: Option<Vec<u32>>,
    /// One slot per source; `None` overall if the key was absent from the
    /// input JSON entirely, distinct from a slot being present-but-null.
    pub x_facebook_sources: Option<Vec<Option<Arc<[FacebookSourceEntry]>>>>,
    pub debug_id: Option<String>,
    pub(crate) mapping_matrix: MappingMatrix,
}

impl FlatSourceMap {
    pub fn from_json_str(json: &str) -> Result<Self> {
        match ParsedMap::from_json_str(json)? {
            ParsedMap::Flat(map) => Ok(map),
            ParsedMap::Indexed(_) => {
                Err(Error::InvalidMap("expected a flat map, found an indexed map".to_string()))
            }
        }
    }

    pub fn get_file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn get_source_root(&self) -> Option<&str> {
        self.source_root.as_deref()
    }

    pub fn get_sources(&self) -> impl Iterator<Item = &Arc<str>> {
        self.sources.iter()
    }

    pub fn get_names(&self) -> impl Iterator<Item = &Arc<str>> {
        self.names.iter()
    }

    pub fn mapping_matrix(&self) -> &MappingMatrix {
        &self.mapping_matrix
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(&self.to_raw()).expect("flat source map serializes to valid JSON")
    }

    pub fn to_data_url(&self) -> String {
        let encoded = base64_simd::STANDARD.encode_to_string(self.to_json_string().as_bytes());
        format!("data:application/json;charset=utf-8;base64,{encoded}")
    }

    fn to_raw(&self) -> RawMapOut<'_> {
        let x_facebook_sources = self.x_facebook_sources.as_ref().map(|entries| {
            entries.iter().map(|e| e.as_ref().map(|arc| arc.as_ref())).collect::<Vec<_>>()
        });
        RawMapOut {
            version: 3,
            file: self.file.as_deref(),
            source_root: self.source_root.as_deref(),
            names: self.names.iter().map(AsRef::as_ref).collect(),
            sources: self.sources.iter().map(AsRef::as_ref).collect(),
            sources_content: if self.source_contents.is_empty() {
                None
            } else {
                Some(self.source_contents.iter().map(|c| c.as_deref()).collect())
            },
            x_google_ignore_list: self.x_google_ignore_list.as_deref(),
            x_facebook_sources,
            mappings: encode_mappings(&self.mapping_matrix),
            debug_id: self.debug_id.as_deref(),
        }
    }
}

/// One section of an indexed map: an offset in the outer generated
/// coordinate space, plus the nested map it wraps.
#[derive(Debug, Clone)]
pub struct IndexedSection {
    pub offset: GeneratedPosition,
    pub map: Box<ParsedMap>,
}

#[derive(Debug, Clone, Default)]
pub struct IndexedSourceMap {
    pub file: Option<Arc<str>>,
    pub sections: Vec<IndexedSection>,
}

// --- JSON wire shapes ---------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMap {
    version: Option<u32>,
    file: Option<String>,
    mappings: Option<String>,
    source_root: Option<String>,
    sources: Option<Vec<String>>,
    sources_content: Option<Vec<Option<String>>>,
    #[serde(default)]
    names: Vec<String>,
    debug_id: Option<String>,
    #[serde(rename = "x_google_ignoreList", alias = "ignoreList")]
    x_google_ignore_list: Option<Vec<u32>>,
    #[serde(rename = "x_facebook_sources")]
    x_facebook_sources: Option<Vec<Option<Vec<RawFacebookSourceEntry>>>>,
    sections: Option<Vec<RawSection>>,
}

#[derive(Debug, Deserialize)]
struct RawFacebookSourceEntry {
    #[serde(default)]
    names: Vec<String>,
    mappings: String,
}

impl From<RawFacebookSourceEntry> for FacebookSourceEntry {
    fn from(raw: RawFacebookSourceEntry) -> Self {
        Self { names: raw.names.into_iter().map(Arc::from).collect(), mappings: Arc::from(raw.mappings) }
    }
}

#[derive(Debug, Deserialize)]
struct RawOffset {
    line: u32,
    column: u32,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    offset: RawOffset,
    map: Box<RawMap>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RawMapOut<'a> {
    version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_root: Option<&'a str>,
    names: Vec<&'a str>,
    sources: Vec<&'a str>,
    #[serde(rename = "sourcesContent", skip_serializing_if = "Option::is_none")]
    sources_content: Option<Vec<Option<&'a str>>>,
    #[serde(rename = "x_google_ignoreList", skip_serializing_if = "Option::is_none")]
    x_google_ignore_list: Option<&'a [u32]>,
    #[serde(rename = "x_facebook_sources", skip_serializing_if = "Option::is_none")]
    x_facebook_sources: Option<Vec<Option<&'a [FacebookSourceEntry]>>>,
    mappings: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug_id: Option<&'a str>,
}

fn parse_raw(raw: RawMap) -> Result<ParsedMap> {
    let version = raw.version.ok_or_else(|| Error::InvalidMap("missing `version` field".to_string()))?;
    if version != 3 {
        return Err(Error::InvalidMap(format!("unsupported source map version: {version}")));
    }
    match (raw.mappings.is_some(), raw.sections.is_some()) {
        (true, true) => {
            Err(Error::InvalidMap("map has both `mappings` and `sections`".to_string()))
        }
        (false, false) => {
            Err(Error::InvalidMap("map has neither `mappings` nor `sections`".to_string()))
        }
        (true, false) => Ok(ParsedMap::Flat(build_flat(raw)?)),
        (false, true) => Ok(ParsedMap::Indexed(build_indexed(raw)?)),
    }
}

fn build_flat(raw: RawMap) -> Result<FlatSourceMap> {
    let sources = raw.sources.unwrap_or_default();
    let names = raw.names;
    let mappings = raw.mappings.expect("checked Some by parse_raw's dispatch");

    if let Some(ignore_list) = &raw.x_google_ignore_list {
        for &idx in ignore_list {
            if idx as usize >= sources.len() {
                return Err(Error::InvalidMap(format!(
                    "x_google_ignoreList references out-of-range source {idx}"
                )));
            }
        }
    }

    let x_facebook_sources = match raw.x_facebook_sources {
        None => None,
        Some(list) => {
            if list.len() != sources.len() {
                return Err(Error::InvalidMap(
                    "x_facebook_sources must have one slot per source".to_string(),
                ));
            }
            Some(
                list.into_iter()
                    .map(|entry| {
                        entry.map(|items| -> Arc<[FacebookSourceEntry]> {
                            items.into_iter().map(FacebookSourceEntry::from).collect()
                        })
                    })
                    .collect(),
            )
        }
    };

    let mapping_matrix = decode_mappings(&mappings, sources.len(), names.len())?;

    Ok(FlatSourceMap {
        file: raw.file.map(Arc::from),
        source_root: raw.source_root,
        sources: sources.into_iter().map(Arc::from).collect(),
        source_contents: raw
            .sources_content
            .map(|contents| contents.into_iter().map(|c| c.map(Arc::from)).collect())
            .unwrap_or_default(),
        names: names.into_iter().map(Arc::from).collect(),
        x_google_ignore_list: raw.x_google_ignore_list,
        x_facebook_sources,
        debug_id: raw.debug_id,
        mapping_matrix,
    })
}

fn build_indexed(raw: RawMap) -> Result<IndexedSourceMap> {
    let raw_sections = raw.sections.expect("checked Some by parse_raw's dispatch");
    let mut sections = Vec::with_capacity(raw_sections.len());
    let mut prev_offset: Option<GeneratedPosition> = None;

    for section in raw_sections {
        // Wire offsets are 0-based in both axes; rebase the line to our
        // internal 1-based convention so it composes directly with
        // `GeneratedPosition` arithmetic (see module docs).
        let offset = GeneratedPosition::new(section.offset.line + 1, section.offset.column);
        if let Some(prev) = prev_offset {
            if offset < prev {
                return Err(Error::InvalidMap(
                    "sections must appear in non-decreasing offset order".to_string(),
                ));
            }
        }
        prev_offset = Some(offset);
        let inner = parse_raw(*section.map)?;
        sections.push(IndexedSection { offset, map: Box::new(inner) });
    }

    Ok(IndexedSourceMap { file: raw.file.map(Arc::from), sections })
}

/// Decode a `mappings` string into a line-indexed [`MappingMatrix`]
/// `sourceId`/`origLine`/`origCol`/`nameId` deltas
/// carry across the whole string; `genCol` resets at every `;`.
pub(crate) fn decode_mappings(mappings: &str, sources_len: usize, names_len: usize) -> Result<MappingMatrix> {
    let bytes = mappings.as_bytes();
    let mut lines: Vec<SegmentLine> = vec![Vec::new()];
    let mut cursor = 0usize;

    let mut gen_col: i64 = 0;
    let mut source_id: i64 = 0;
    let mut orig_line: i64 = 0;
    let mut orig_col: i64 = 0;
    let mut name_id: i64 = 0;
    let mut nums = [0i64; 5];

    while cursor < bytes.len() {
        match bytes[cursor] {
            b';' => {
                lines.push(Vec::new());
                gen_col = 0;
                cursor += 1;
            }
            b',' => {
                cursor += 1;
            }
            _ => {
                let arity = vlq::decode_segment(bytes, &mut cursor, &mut nums)?;
                gen_col += nums[0];
                if gen_col < 0 {
                    return Err(Error::MalformedVlq("negative generated column".to_string()));
                }

                let segment = match arity {
                    1 => Segment::hole(gen_col as u32),
                    4 | 5 => {
                        source_id += nums[1];
                        orig_line += nums[2];
                        orig_col += nums[3];
                        if source_id < 0 || source_id as usize >= sources_len {
                            return Err(Error::MalformedVlq(format!(
                                "segment references out-of-range source {source_id}"
                            )));
                        }
                        if orig_line < 0 || orig_col < 0 {
                            return Err(Error::MalformedVlq(
                                "negative original line or column".to_string(),
                            ));
                        }
                        let name = if arity == 5 {
                            name_id += nums[4];
                            if name_id < 0 || name_id as usize >= names_len {
                                return Err(Error::MalformedVlq(format!(
                                    "segment references out-of-range name {name_id}"
                                )));
                            }
                            Some(name_id as u32)
                        } else {
                            None
                        };
                        Segment::mapped(gen_col as u32, source_id as u32, orig_line as u32, orig_col as u32, name)
                    }
                    n => return Err(Error::MalformedVlq(format!("segment has unsupported arity {n}"))),
                };
                lines.last_mut().expect("at least one line is always present").push(segment);
            }
        }
    }

    Ok(MappingMatrix::with_lines(lines))
}

/// Inverse of [`decode_mappings`]: re-emits the matrix in the same
/// compact encoding").
pub(crate) fn encode_mappings(matrix: &MappingMatrix) -> String {
    let mut out = String::new();
    let mut prev_source = 0u32;
    let mut prev_orig_line = 0u32;
    let mut prev_orig_col = 0u32;
    let mut prev_name = 0u32;

    for (line_no, segments) in matrix.lines() {
        if line_no > 1 {
            out.push(';');
        }
        let mut prev_gen_col = 0u32;
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            vlq::encode_diff(&mut out, segment.gen_col, prev_gen_col);
            prev_gen_col = segment.gen_col;

            if let Some(source) = segment.source {
                vlq::encode_diff(&mut out, source, prev_source);
                prev_source = source;
                vlq::encode_diff(&mut out, segment.orig_line, prev_orig_line);
                prev_orig_line = segment.orig_line;
                vlq::encode_diff(&mut out, segment.orig_col, prev_orig_col);
                prev_orig_col = segment.orig_col;
                if let Some(name) = segment.name {
                    vlq::encode_diff(&mut out, name, prev_name);
                    prev_name = name;
                }
            }
        }
    }

    out
}
