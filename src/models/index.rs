use log::info;
use roaring::RoaringBitmap;

use crate::models::document::Document;
use crate::models::error::{Error, Result};
use crate::models::schema::Schema;
use crate::models::snapshot::Snapshot;
use crate::models::types::{DocId, OurRc, OurStr};

pub mod config;
pub(crate) mod segment;

use config::IndexConfig;
use segment::{SegmentBuilder, SegmentData};

#[derive(Debug, Clone)]
pub(crate) struct CommittedSegment {
    pub(crate) data: OurRc<SegmentData>,
    pub(crate) deleted: RoaringBitmap,
}

/// An index being written.
///
/// Documents are buffered until [`Index::commit`] seals them into a new
/// segment. Snapshots only see committed segments, and never see
/// deletions made after they were taken.
///
/// Example:
/// ```
/// use joinery::prelude::*;
///
/// let mut index = Index::new(Schema::new().with_text("colour"));
/// let doc_id = index.index_document(&[("colour", "blue")].into()).unwrap();
/// index.commit();
/// assert_eq!(index.snapshot().num_docs(), 1);
/// assert_eq!(doc_id, 0);
/// ```
#[derive(Debug)]
pub struct Index {
    schema: OurRc<Schema>,
    config: OurRc<IndexConfig>,
    segments: Vec<CommittedSegment>,
    pending: SegmentBuilder,
    pending_deleted: RoaringBitmap,
}

impl Index {
    pub fn new(schema: Schema) -> Self {
        Self::with_config(schema, IndexConfig::default())
    }

    pub fn with_config(schema: Schema, config: IndexConfig) -> Self {
        Self {
            schema: OurRc::new(schema),
            config: OurRc::new(config),
            segments: Vec::new(),
            pending: SegmentBuilder::default(),
            pending_deleted: RoaringBitmap::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// The number of documents ever indexed, including pending
    /// and deleted ones.
    pub fn len(&self) -> usize {
        self.committed_max_doc() as usize + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    fn committed_max_doc(&self) -> u32 {
        self.segments.iter().map(|s| s.data.max_doc()).sum()
    }

    /// Buffers the document for the next commit and returns its ordinal.
    /// Ordinals never change once given.
    pub fn index_document(&mut self, d: &Document) -> Result<DocId> {
        let new_doc_id: DocId = self
            .len()
            .try_into()
            .map_err(|_| Error::TooManyDocuments)?;
        if new_doc_id == DocId::MAX {
            return Err(Error::TooManyDocuments);
        }

        let mut terms: Vec<(OurStr, OurStr)> = Vec::with_capacity(d.fv_count());
        for (field, value) in d.field_values() {
            let field_type = self
                .schema
                .field_type(&field)
                .ok_or_else(|| Error::UnknownField(field.to_string()))?;
            for term in field_type.index_terms(&field, &value)? {
                terms.push((field.clone(), term));
            }
        }

        self.pending.add(d, terms);
        Ok(new_doc_id)
    }

    /// Seals the pending documents into a new segment.
    pub fn commit(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let data = std::mem::take(&mut self.pending).seal();
        let deleted = std::mem::take(&mut self.pending_deleted);
        info!(
            "Committed segment {} with {} documents ({} deleted)",
            self.segments.len(),
            data.max_doc(),
            deleted.len()
        );
        self.segments.push(CommittedSegment {
            data: OurRc::new(data),
            deleted,
        });
    }

    /// Marks the document deleted. Returns false if it was
    /// already deleted or never existed.
    pub fn delete_doc(&mut self, doc_id: DocId) -> bool {
        let mut base = 0;
        for s in self.segments.iter_mut() {
            let max_doc = s.data.max_doc();
            if doc_id < base + max_doc {
                return s.deleted.insert(doc_id - base);
            }
            base += max_doc;
        }
        if ((doc_id - base) as usize) < self.pending.len() {
            return self.pending_deleted.insert(doc_id - base);
        }
        false
    }

    /// Deletes all documents having this value in the field,
    /// returning how many were newly deleted.
    pub fn delete_term(&mut self, field: &str, value: &str) -> Result<u64> {
        let field_type = self
            .schema
            .field_type(field)
            .ok_or_else(|| Error::UnknownField(field.to_string()))?;
        let term = field_type.query_term(field, value)?;

        let mut n_deleted = 0;
        for s in self.segments.iter_mut() {
            if let Some(docs) = s.data.postings(field, &term) {
                let before = s.deleted.len();
                s.deleted.extend(docs.iter().copied());
                n_deleted += s.deleted.len() - before;
            }
        }
        if let Some(docs) = self.pending.postings(field, &term) {
            let before = self.pending_deleted.len();
            self.pending_deleted.extend(docs.iter().copied());
            n_deleted += self.pending_deleted.len() - before;
        }
        Ok(n_deleted)
    }

    /// A point in time view of the committed segments.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(
            self.schema.clone(),
            self.config.clone(),
            self.segments.clone(),
        )
    }
}
