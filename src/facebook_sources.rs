//! The `x_facebook_sources` auxiliary channel.
//!
//! Parallel to a flat map's `sources[]`: each source either carries no
//! metadata (`None`) or an array of per-source function-name tracking
//! entries. The composer copies this channel verbatim from whichever
//! consumer in the chain originated the retained source — it never
//! interprets `names`/`mappings` inside an entry.

use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct FacebookSourceEntry {
    #[serde(default)]
    pub names: Vec<Arc<str>>,
    pub mappings: Arc<str>,
}

/// One slot per source: `None` if that source carries no metadata.
pub type FacebookSourcesEntry = Option<Arc<[FacebookSourceEntry]>>;
