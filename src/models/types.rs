use std::sync::Arc;

// Snapshots and their caches are shared between scoring threads,
// so shared strings are always atomically counted.
pub(crate) type OurRc<T> = Arc<T>;

pub(crate) type OurStr = OurRc<str>;

/// A document ordinal, global to one index snapshot.
pub type DocId = u32;

/// Returned by exhausted scorers.
pub const NO_MORE_DOCS: DocId = DocId::MAX;
