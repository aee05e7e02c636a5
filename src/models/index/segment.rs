use std::collections::{BTreeMap, HashMap};

use crate::models::document::Document;
use crate::models::types::{DocId, OurRc, OurStr};

/// The immutable content of a sealed segment.
/// Ordinals are local to the segment.
#[derive(Debug, Default)]
pub(crate) struct SegmentData {
    documents: Vec<Document>,
    // The term dictionary of each field, with ascending postings.
    postings: HashMap<OurStr, BTreeMap<OurStr, OurRc<[DocId]>>>,
}

impl SegmentData {
    pub(crate) fn max_doc(&self) -> u32 {
        // Bounded when indexing.
        self.documents.len() as u32
    }

    pub(crate) fn document(&self, local: DocId) -> Option<&Document> {
        self.documents.get(local as usize)
    }

    pub(crate) fn terms(&self, field: &str) -> Option<&BTreeMap<OurStr, OurRc<[DocId]>>> {
        self.postings.get(field)
    }

    pub(crate) fn postings(&self, field: &str, term: &str) -> Option<&[DocId]> {
        self.terms(field)
            .and_then(|terms| terms.get(term))
            .map(|docs| docs.as_ref())
    }
}

/// The segment being filled by the index writer.
#[derive(Debug, Default)]
pub(crate) struct SegmentBuilder {
    documents: Vec<Document>,
    postings: HashMap<OurStr, BTreeMap<OurStr, Vec<DocId>>>,
}

impl SegmentBuilder {
    pub(crate) fn len(&self) -> usize {
        self.documents.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Adds the document with its already encoded terms.
    pub(crate) fn add(&mut self, d: &Document, terms: Vec<(OurStr, OurStr)>) -> DocId {
        let local = self.documents.len() as DocId;
        self.documents.push(d.clone());
        for (field, term) in terms {
            let docs = self
                .postings
                .entry(field)
                .or_default()
                .entry(term)
                .or_default();
            // The same term can come from two values of the same document.
            if docs.last() != Some(&local) {
                docs.push(local);
            }
        }
        local
    }

    pub(crate) fn postings(&self, field: &str, term: &str) -> Option<&[DocId]> {
        self.postings
            .get(field)
            .and_then(|terms| terms.get(term))
            .map(|docs| docs.as_slice())
    }

    pub(crate) fn seal(self) -> SegmentData {
        SegmentData {
            documents: self.documents,
            postings: self
                .postings
                .into_iter()
                .map(|(field, terms)| {
                    (
                        field,
                        terms
                            .into_iter()
                            .map(|(term, docs)| (term, OurRc::from(docs)))
                            .collect(),
                    )
                })
                .collect(),
        }
    }
}
