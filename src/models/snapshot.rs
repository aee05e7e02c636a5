use std::fmt;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;
use roaring::RoaringBitmap;

use crate::models::docset::DocSet;
use crate::models::document::Document;
use crate::models::error::{Error, Result};
use crate::models::index::CommittedSegment;
use crate::models::index::config::IndexConfig;
use crate::models::index::segment::SegmentData;
use crate::models::queries::Query;
use crate::models::schema::Schema;
use crate::models::term_cursor::TermCursor;
use crate::models::types::{DocId, OurRc, OurStr};

static NEXT_SNAPSHOT_ID: AtomicU64 = AtomicU64::new(0);

/// One segment of a snapshot, with the deletions it had
/// when the snapshot was taken.
#[derive(Debug, Clone)]
pub struct SegmentReader {
    snapshot_id: u64,
    ord: usize,
    base: DocId,
    data: OurRc<SegmentData>,
    deleted: RoaringBitmap,
}

impl SegmentReader {
    /// The position of this segment in its snapshot.
    pub fn ord(&self) -> usize {
        self.ord
    }

    /// The global ordinal of this segment's first document.
    pub fn base(&self) -> DocId {
        self.base
    }

    pub fn max_doc(&self) -> u32 {
        self.data.max_doc()
    }

    /// Deleted documents, as segment local ordinals.
    pub fn deleted_docs(&self) -> &RoaringBitmap {
        &self.deleted
    }

    pub(crate) fn snapshot_id(&self) -> u64 {
        self.snapshot_id
    }

    pub(crate) fn data(&self) -> &SegmentData {
        &self.data
    }
}

struct SnapshotInner {
    id: u64,
    schema: OurRc<Schema>,
    config: OurRc<IndexConfig>,
    segments: Vec<SegmentReader>,
    max_doc: u32,
    deleted: RoaringBitmap,
    term_cache: RwLock<HashMap<(OurStr, OurStr), DocSet>>,
    query_cache: RwLock<HashMap<Query, DocSet>>,
}

/// An immutable, point in time view of an index.
///
/// This is what queries execute against. Cloning is cheap and clones
/// share the per-term and per-query DocSet caches.
#[derive(Clone)]
pub struct Snapshot {
    inner: OurRc<SnapshotInner>,
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("id", &self.inner.id)
            .field("segments", &self.inner.segments.len())
            .field("max_doc", &self.inner.max_doc)
            .field("deleted", &self.inner.deleted.len())
            .finish()
    }
}

impl Snapshot {
    pub(crate) fn new(
        schema: OurRc<Schema>,
        config: OurRc<IndexConfig>,
        committed: Vec<CommittedSegment>,
    ) -> Self {
        let id = NEXT_SNAPSHOT_ID.fetch_add(1, Ordering::Relaxed);
        let mut base = 0;
        let mut deleted = RoaringBitmap::new();
        let mut segments = Vec::with_capacity(committed.len());
        for (ord, c) in committed.into_iter().enumerate() {
            deleted.extend(c.deleted.iter().map(|d| d + base));
            let max_doc = c.data.max_doc();
            segments.push(SegmentReader {
                snapshot_id: id,
                ord,
                base,
                data: c.data,
                deleted: c.deleted,
            });
            base += max_doc;
        }

        Self {
            inner: OurRc::new(SnapshotInner {
                id,
                schema,
                config,
                segments,
                max_doc: base,
                deleted,
                term_cache: RwLock::new(HashMap::new()),
                query_cache: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    pub fn config(&self) -> &IndexConfig {
        &self.inner.config
    }

    /// One more than the highest ordinal of this snapshot.
    pub fn max_doc(&self) -> u32 {
        self.inner.max_doc
    }

    /// The number of live documents.
    pub fn num_docs(&self) -> u32 {
        // Deleted ordinals are all below max_doc.
        self.inner.max_doc - self.inner.deleted.len() as u32
    }

    pub fn segments(&self) -> &[SegmentReader] {
        &self.inner.segments
    }

    /// All deleted ordinals.
    pub fn deleted_docs(&self) -> &RoaringBitmap {
        &self.inner.deleted
    }

    pub fn is_live(&self, doc: DocId) -> bool {
        doc < self.inner.max_doc && !self.inner.deleted.contains(doc)
    }

    pub(crate) fn id(&self) -> u64 {
        self.inner.id
    }

    /// The segment holding the global ordinal.
    pub fn segment_for(&self, doc: DocId) -> Option<&SegmentReader> {
        if doc >= self.inner.max_doc {
            return None;
        }
        let segments = &self.inner.segments;
        let after = segments.partition_point(|s| s.base <= doc);
        segments.get(after.checked_sub(1)?)
    }

    /// The stored live document.
    pub fn document(&self, doc: DocId) -> Option<&Document> {
        if !self.is_live(doc) {
            return None;
        }
        let segment = self.segment_for(doc)?;
        segment.data.document(doc - segment.base)
    }

    /// Does any segment have terms for this field?
    pub fn has_terms(&self, field: &str) -> bool {
        self.inner
            .segments
            .iter()
            .any(|s| s.data.terms(field).is_some_and(|t| !t.is_empty()))
    }

    /// A cursor on the field's terms, or None if no segment has any.
    /// Terms with a document frequency of at least `min_set_size_cached`
    /// get their DocSets through the term cache.
    pub fn term_cursor(&self, field: &str, min_set_size_cached: u32) -> Option<TermCursor<'_>> {
        TermCursor::open(self, field, min_set_size_cached)
    }

    /// All live documents.
    pub fn all_docs(&self) -> DocSet {
        let mut bits = RoaringBitmap::new();
        bits.insert_range(0..self.inner.max_doc);
        bits -= &self.inner.deleted;
        DocSet::from_bits(bits)
    }

    /// The live documents having the term, built without the cache.
    pub fn term_doc_set(&self, field: &str, term: &str) -> DocSet {
        let mut docs = Vec::new();
        for s in self.inner.segments.iter() {
            if let Some(postings) = s.data.postings(field, term) {
                docs.extend(
                    postings
                        .iter()
                        .filter(|&&d| !s.deleted.contains(d))
                        .map(|&d| d + s.base),
                );
            }
        }
        self.encode(docs)
    }

    // Ascending ordinals into the cheapest encoding for their count.
    pub(crate) fn encode(&self, docs: Vec<DocId>) -> DocSet {
        if docs.len() > self.inner.config.small_set_size(self.inner.max_doc) as usize {
            DocSet::from_bits(docs.into_iter().collect())
        } else {
            DocSet::from_sorted(docs)
        }
    }

    /// The live documents having the term, through the term cache.
    pub fn cached_term_set(&self, field: &str, term: &str) -> Result<DocSet> {
        let key: (OurStr, OurStr) = (field.into(), term.into());
        if let Some(set) = self
            .inner
            .term_cache
            .read()
            .map_err(|_| Error::CachePoisoned)?
            .get(&key)
        {
            return Ok(set.clone());
        }

        let set = self.term_doc_set(field, term);
        let mut cache = self
            .inner
            .term_cache
            .write()
            .map_err(|_| Error::CachePoisoned)?;
        if cache.len() < self.inner.config.term_cache_capacity() {
            cache.insert(key, set.clone());
        }
        Ok(set)
    }

    /// The number of terms currently cached.
    pub fn term_cache_len(&self) -> usize {
        self.inner.term_cache.read().map_or(0, |c| c.len())
    }

    /// The live documents matching the query, through the query cache.
    pub fn doc_set(&self, query: &Query) -> Result<DocSet> {
        if let Some(set) = self
            .inner
            .query_cache
            .read()
            .map_err(|_| Error::CachePoisoned)?
            .get(query)
        {
            return Ok(set.clone());
        }

        // The lock is not held while computing, sub-queries need it.
        let set = query.compute_doc_set(self)?;
        let mut cache = self
            .inner
            .query_cache
            .write()
            .map_err(|_| Error::CachePoisoned)?;
        if cache.len() < self.inner.config.query_cache_capacity() {
            cache.insert(query.clone(), set.clone());
        }
        Ok(set)
    }

    /// The number of queries currently cached.
    pub fn query_cache_len(&self) -> usize {
        self.inner.query_cache.read().map_or(0, |c| c.len())
    }
}
