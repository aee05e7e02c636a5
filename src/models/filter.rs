use itertools::Itertools;
use roaring::RoaringBitmap;

use crate::models::docset::DocSet;
use crate::models::snapshot::SegmentReader;
use crate::models::types::{DocId, NO_MORE_DOCS};

/// A reusable predicate over the ordinals of one snapshot,
/// handing each segment the slice of matches it owns.
#[derive(Debug, Clone)]
pub struct DocFilter {
    set: DocSet,
}

impl DocFilter {
    pub(crate) fn new(set: &DocSet) -> Self {
        // Hash sets are for probing only. Segments need ordered slices.
        let set = match set {
            DocSet::Hash(_) => set.to_sorted(),
            _ => set.clone(),
        };
        Self { set }
    }

    /// The whole set this filter was built from.
    pub fn doc_set(&self) -> &DocSet {
        &self.set
    }

    pub fn accepts(&self, doc: DocId) -> bool {
        self.set.exists(doc)
    }

    /// The matching documents of the segment, as segment local ordinals.
    /// None when nothing in the segment matches.
    pub fn segment_docs(&self, segment: &SegmentReader) -> Option<SegmentDocs> {
        let start = segment.base();
        let end = start + segment.max_doc();
        let local: Vec<DocId> = match &self.set {
            DocSet::Sorted(docs) => {
                let from = docs.partition_point(|&d| d < start);
                let to = docs.partition_point(|&d| d < end);
                docs[from..to].iter().map(|d| d - start).collect()
            }
            DocSet::Bits(bits) => {
                let mut window = RoaringBitmap::new();
                window.insert_range(start..end);
                window &= bits.as_ref();
                window.iter().map(|d| d - start).collect()
            }
            DocSet::Hash(docs) => docs
                .iter()
                .filter(|&&d| d >= start && d < end)
                .map(|d| d - start)
                .sorted_unstable()
                .collect(),
        };
        if local.is_empty() {
            None
        } else {
            Some(SegmentDocs::new(local))
        }
    }
}

/// A forward only cursor over segment local matches.
#[derive(Debug, Clone)]
pub struct SegmentDocs {
    docs: Vec<DocId>,
    // Index of the current doc. None before the first next_doc.
    pos: Option<usize>,
}

impl SegmentDocs {
    pub(crate) fn new(docs: Vec<DocId>) -> Self {
        Self { docs, pos: None }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// The current document. NO_MORE_DOCS when positioned past the end,
    /// or before the first call to next_doc or advance.
    pub fn doc(&self) -> DocId {
        self.pos
            .and_then(|p| self.docs.get(p).copied())
            .unwrap_or(NO_MORE_DOCS)
    }

    pub fn next_doc(&mut self) -> DocId {
        let next = self.pos.map_or(0, |p| (p + 1).min(self.docs.len()));
        self.pos = Some(next);
        self.doc()
    }

    /// Moves to the first document at or after target, never backwards.
    pub fn advance(&mut self, target: DocId) -> DocId {
        let from = self.pos.unwrap_or(0);
        let skip = self.docs[from..].partition_point(|&d| d < target);
        self.pos = Some(from + skip);
        self.doc()
    }
}
