//! Error kinds for the source-map core.
//!
//! The taxonomy is intentionally coarse. An unmapped position is not
//! represented here at all — it is the in-band `None` returned from
//! `Consumer::original_position_for`, never an `Err`.

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Structural problem with a map: wrong `version`, missing required
    /// fields, or a map that mixes the flat (`mappings`) and indexed
    /// (`sections`) shapes.
    #[error("invalid source map: {0}")]
    InvalidMap(String),

    /// A `mappings` string could not be decoded: illegal base64 character,
    /// a truncated VLQ, a segment with arity outside {1,4,5}, or a value
    /// that does not fit in a signed 32-bit integer.
    #[error("malformed VLQ mapping: {0}")]
    MalformedVlq(String),

    /// The map chain passed to the composer cannot be traversed: a non-tail
    /// map with more than one source that cannot be consumed unambiguously
    /// by position alone, or a tail map that is not a flat map.
    #[error("unsupported composition: {0}")]
    UnsupportedComposition(String),

    /// The input was not well-formed JSON at all.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
