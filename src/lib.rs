mod composer;
mod consumer;
mod error;
mod facebook_sources;
mod position;
mod segment;
mod source_map;
mod vlq;

pub use composer::compose;
pub use consumer::Consumer;
pub use error::Error;
pub use facebook_sources::FacebookSourceEntry;
pub use position::{GeneratedPosition, OriginalPosition};
pub use source_map::{FlatSourceMap, IndexedSourceMap, ParsedMap};
