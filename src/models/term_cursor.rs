use std::collections::{BTreeMap, btree_map};
use std::ops::Bound;

use roaring::RoaringBitmap;

use crate::models::docset::DocSet;
use crate::models::error::Result;
use crate::models::snapshot::Snapshot;
use crate::models::types::{DocId, OurRc, OurStr};

/// Outcome of positioning a [`TermCursor`] on a target term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SeekStatus {
    /// Positioned on the target itself.
    Found,
    /// Positioned on the smallest term after the target.
    NotFound,
    /// No term at or after the target. The cursor is exhausted.
    End,
}

/// The postings of one segment for one term.
#[derive(Debug)]
pub struct SegmentPostings<'a> {
    docs: &'a [DocId],
    pos: usize,
    base: DocId,
    // Set when deleted documents must be skipped.
    deleted: Option<&'a RoaringBitmap>,
}

impl SegmentPostings<'_> {
    // Appends up to `max` global ordinals. Returns how many were appended.
    fn read_into(&mut self, buf: &mut Vec<DocId>, max: usize) -> usize {
        let before = buf.len();
        while self.pos < self.docs.len() && buf.len() - before < max {
            let d = self.docs[self.pos];
            self.pos += 1;
            if self.deleted.is_some_and(|del| del.contains(d)) {
                continue;
            }
            buf.push(d + self.base);
        }
        buf.len() - before
    }
}

/// Postings of a term spanning one or several segments.
///
/// Both shapes read the same way: batches of ascending global ordinals.
#[derive(Debug)]
pub enum Postings<'a> {
    Single(SegmentPostings<'a>),
    Multi(Vec<SegmentPostings<'a>>),
}

impl Postings<'_> {
    /// Replaces the content of `buf` with the next batch of ordinals.
    /// Returns the batch length, zero once exhausted.
    pub fn read(&mut self, buf: &mut Vec<DocId>, batch_size: usize) -> usize {
        buf.clear();
        match self {
            Postings::Single(sub) => sub.read_into(buf, batch_size),
            Postings::Multi(subs) => {
                for sub in subs.iter_mut() {
                    let n = buf.len();
                    sub.read_into(buf, batch_size - n);
                    if buf.len() == batch_size {
                        break;
                    }
                }
                buf.len()
            }
        }
    }

    /// The number of segments these postings span.
    pub fn n_segments(&self) -> usize {
        match self {
            Postings::Single(_) => 1,
            Postings::Multi(subs) => subs.len(),
        }
    }
}

type TermDictionary = BTreeMap<OurStr, OurRc<[DocId]>>;
type TermEntry<'s> = (&'s OurStr, &'s OurRc<[DocId]>);

// One segment's terms, read from some position on.
struct SegmentTerms<'s> {
    segment: usize,
    dictionary: &'s TermDictionary,
    range: btree_map::Range<'s, OurStr, OurRc<[DocId]>>,
    // Smallest term not consumed yet.
    head: Option<TermEntry<'s>>,
}

impl<'s> SegmentTerms<'s> {
    fn new(segment: usize, dictionary: &'s TermDictionary) -> Self {
        let mut range = dictionary.range::<str, _>(..);
        let head = range.next();
        Self {
            segment,
            dictionary,
            range,
            head,
        }
    }

    fn seek(&mut self, target: &str) {
        self.range = self
            .dictionary
            .range::<str, _>((Bound::Included(target), Bound::Unbounded));
        self.head = self.range.next();
    }

    fn skip(&mut self, term: &str) {
        if self.head.is_some_and(|(t, _)| t.as_ref() == term) {
            self.head = self.range.next();
        }
    }

    fn docs_of(&self, term: &str) -> Option<&'s OurRc<[DocId]>> {
        match self.head {
            Some((t, docs)) if t.as_ref() == term => Some(docs),
            _ => None,
        }
    }
}

/// A resumable, forward reading cursor on one field's terms,
/// merged across the segments of a snapshot.
///
/// Terms are read lazily from each segment's dictionary, so seeking
/// does not go through the terms before the target.
/// A cursor is owned by one reader. It keeps a reusable buffer
/// for postings batches.
pub struct TermCursor<'s> {
    snapshot: &'s Snapshot,
    field: OurStr,
    // Segments having the field.
    segments: Vec<SegmentTerms<'s>>,
    // None before the first move or once exhausted.
    current: Option<&'s OurStr>,
    started: bool,
    min_set_size_cached: u32,
    buffer: Vec<DocId>,
}

impl<'s> TermCursor<'s> {
    pub(crate) fn open(
        snapshot: &'s Snapshot,
        field: &str,
        min_set_size_cached: u32,
    ) -> Option<Self> {
        let segments: Vec<SegmentTerms<'s>> = snapshot
            .segments()
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.data().terms(field).map(|d| (i, d)))
            .filter(|(_, d)| !d.is_empty())
            .map(|(i, d)| SegmentTerms::new(i, d))
            .collect();
        if segments.is_empty() {
            return None;
        }

        Some(Self {
            snapshot,
            field: field.into(),
            segments,
            current: None,
            started: false,
            min_set_size_cached,
            buffer: Vec::with_capacity(snapshot.config().read_batch_size()),
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    // The smallest head across segments becomes the current term.
    fn settle(&mut self) {
        self.started = true;
        self.current = self
            .segments
            .iter()
            .filter_map(|s| s.head.map(|(t, _)| t))
            .min();
    }

    /// Moves to the next term and returns it.
    pub fn next_term(&mut self) -> Option<&str> {
        if let Some(current) = self.current {
            for s in self.segments.iter_mut() {
                s.skip(current);
            }
        }
        self.settle();
        self.term()
    }

    /// The current term, None before the first move or once exhausted.
    pub fn term(&self) -> Option<&str> {
        self.current.map(|t| t.as_ref())
    }

    /// The current term, shared.
    pub fn current_term(&self) -> Option<OurStr> {
        self.current.cloned()
    }

    /// Moves to the smallest term at or after the target.
    pub fn seek_ceil(&mut self, target: &str) -> SeekStatus {
        for s in self.segments.iter_mut() {
            s.seek(target);
        }
        self.settle();
        match self.term() {
            None => SeekStatus::End,
            Some(t) if t == target => SeekStatus::Found,
            Some(_) => SeekStatus::NotFound,
        }
    }

    /// The number of documents having the current term,
    /// deleted ones included. Zero when not positioned on a term.
    pub fn doc_freq(&self) -> u32 {
        let Some(term) = self.term() else {
            return 0;
        };
        self.segments
            .iter()
            .filter_map(|s| s.docs_of(term))
            .map(|docs| docs.len() as u32)
            .sum()
    }

    /// The postings of the current term. Deleted documents are only
    /// skipped when `live_only` is set.
    pub fn postings(&self, live_only: bool) -> Postings<'s> {
        let snapshot: &'s Snapshot = self.snapshot;
        let segments = snapshot.segments();
        let mut subs: Vec<SegmentPostings<'s>> = match self.term() {
            None => vec![],
            Some(term) => self
                .segments
                .iter()
                .filter_map(|s| s.docs_of(term).map(|docs| (s.segment, docs)))
                .map(|(i, docs)| SegmentPostings {
                    docs: docs.as_ref(),
                    pos: 0,
                    base: segments[i].base(),
                    deleted: live_only.then_some(segments[i].deleted_docs()),
                })
                .collect(),
        };
        if subs.len() == 1 {
            Postings::Single(subs.remove(0))
        } else {
            Postings::Multi(subs)
        }
    }

    /// Reads the postings of the current term batch by batch,
    /// calling `f` on each ordinal until it returns false.
    /// Returns false if `f` stopped the scan.
    pub fn scan_postings<F>(&mut self, live_only: bool, mut f: F) -> bool
    where
        F: FnMut(DocId) -> bool,
    {
        let batch_size = self.snapshot.config().read_batch_size();
        let mut postings = self.postings(live_only);
        let mut buffer = std::mem::take(&mut self.buffer);
        let mut completed = true;
        'batches: while postings.read(&mut buffer, batch_size) > 0 {
            for &d in buffer.iter() {
                if !f(d) {
                    completed = false;
                    break 'batches;
                }
            }
        }
        self.buffer = buffer;
        completed
    }

    /// The live documents of the current term. Goes through the
    /// snapshot's term cache when the term is frequent enough.
    pub fn doc_set(&self) -> Result<DocSet> {
        let Some(term) = self.term() else {
            return Ok(DocSet::empty());
        };
        if self.doc_freq() >= self.min_set_size_cached {
            self.snapshot.cached_term_set(&self.field, term)
        } else {
            Ok(self.snapshot.term_doc_set(&self.field, term))
        }
    }
}
