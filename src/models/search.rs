use std::sync::OnceLock;

use log::trace;

use crate::models::error::{Error, Result};
use crate::models::filter::{DocFilter, SegmentDocs};
use crate::models::queries::Query;
use crate::models::snapshot::{SegmentReader, Snapshot};
use crate::models::types::{DocId, NO_MORE_DOCS};

pub mod explanation;

pub use explanation::Explanation;

/// Iterates over the matching documents of one segment, in ascending
/// segment local order, with their scores.
pub trait Scorer: Send {
    /// The current document, [`NO_MORE_DOCS`] once exhausted.
    fn doc(&self) -> DocId;
    fn next_doc(&mut self) -> DocId;
    /// Moves to the first document at or after the target.
    fn advance(&mut self, target: DocId) -> DocId;
    fn score(&self) -> f32;
}

/// A query bound to one snapshot for one execution.
///
/// The weight is shared by all the segments of the snapshot, possibly
/// scored from several threads at once.
pub trait Weight: Send + Sync {
    fn query(&self) -> Query;

    /// The weight of the query, once normalised.
    fn value(&self) -> f32;

    fn sum_of_squared_weights(&self) -> f32;

    fn normalize(&mut self, norm: f32);

    /// The scorer of one segment. Empty when nothing matches there.
    fn scorer(&self, segment: &SegmentReader) -> Result<Box<dyn Scorer>>;

    /// Explains the score of a segment local document.
    fn explain(&self, segment: &SegmentReader, doc: DocId) -> Result<Explanation>;
}

/// Gives the same score to every document of a segment.
#[derive(Debug)]
pub struct ConstantScorer {
    docs: SegmentDocs,
    score: f32,
}

impl ConstantScorer {
    pub fn new(docs: SegmentDocs, score: f32) -> Self {
        Self { docs, score }
    }

    pub fn empty() -> Self {
        Self::new(SegmentDocs::empty(), 0.0)
    }

    pub(crate) fn for_segment(filter: &DocFilter, segment: &SegmentReader, score: f32) -> Self {
        match filter.segment_docs(segment) {
            Some(docs) => {
                trace!(
                    "Scorer for segment {} with {} documents",
                    segment.ord(),
                    docs.len()
                );
                Self::new(docs, score)
            }
            None => Self::empty(),
        }
    }
}

impl Scorer for ConstantScorer {
    fn doc(&self) -> DocId {
        self.docs.doc()
    }

    fn next_doc(&mut self) -> DocId {
        self.docs.next_doc()
    }

    fn advance(&mut self, target: DocId) -> DocId {
        self.docs.advance(target)
    }

    fn score(&self) -> f32 {
        self.score
    }
}

// Scorers only make sense for the segments the weight was built on.
pub(crate) fn check_segment(snapshot: &Snapshot, segment: &SegmentReader) -> Result<()> {
    if segment.snapshot_id() == snapshot.id() {
        Ok(())
    } else {
        Err(Error::ForeignSegment {
            segment: segment.ord(),
        })
    }
}

/// The explanation of a weight whose matches all score
/// `boost * query_norm`, probing the segment's scorer for membership.
pub(crate) fn explain_constant(
    weight: &dyn Weight,
    segment: &SegmentReader,
    doc: DocId,
    boost: f32,
    query_norm: f32,
) -> Result<Explanation> {
    let mut scorer = weight.scorer(segment)?;
    if scorer.advance(doc) == doc {
        Ok(
            Explanation::new(weight.value(), format!("{} , product of:", weight.query()))
                .with_detail(Explanation::new(boost, "boost"))
                .with_detail(Explanation::new(query_norm, "queryNorm")),
        )
    } else {
        Ok(Explanation::no_match(format!(
            "{} doesn't match id {}",
            weight.query(),
            doc
        )))
    }
}

/// The weight of any query executed as a set of documents:
/// its matches are computed once, through the snapshot's query cache.
pub struct ConstantScoreWeight {
    query: Query,
    snapshot: Snapshot,
    filter: OnceLock<Result<DocFilter>>,
    query_weight: f32,
    query_norm: f32,
}

impl ConstantScoreWeight {
    pub fn new(query: Query, snapshot: Snapshot) -> Self {
        let boost = query.boost();
        Self {
            query,
            snapshot,
            filter: OnceLock::new(),
            query_weight: boost,
            query_norm: 1.0,
        }
    }

    fn filter(&self) -> Result<&DocFilter> {
        self.filter
            .get_or_init(|| {
                self.snapshot
                    .doc_set(&self.query)
                    .map(|set| set.as_filter())
            })
            .as_ref()
            .map_err(|e| e.clone())
    }
}

impl Weight for ConstantScoreWeight {
    fn query(&self) -> Query {
        self.query.clone()
    }

    fn value(&self) -> f32 {
        self.query_weight
    }

    fn sum_of_squared_weights(&self) -> f32 {
        let boost = self.query.boost();
        boost * boost
    }

    fn normalize(&mut self, norm: f32) {
        self.query_norm = norm;
        self.query_weight = self.query.boost() * norm;
    }

    fn scorer(&self, segment: &SegmentReader) -> Result<Box<dyn Scorer>> {
        check_segment(&self.snapshot, segment)?;
        let filter = self.filter()?;
        Ok(Box::new(ConstantScorer::for_segment(
            filter,
            segment,
            self.query_weight,
        )))
    }

    fn explain(&self, segment: &SegmentReader, doc: DocId) -> Result<Explanation> {
        explain_constant(self, segment, doc, self.query.boost(), self.query_norm)
    }
}

/// The normalisation factor of a weight.
pub fn query_norm(sum_of_squared_weights: f32) -> f32 {
    if sum_of_squared_weights > 0.0 && sum_of_squared_weights.is_finite() {
        1.0 / sum_of_squared_weights.sqrt()
    } else {
        1.0
    }
}

impl Snapshot {
    /// Rewrites the query, creates its weight and normalises it.
    pub fn create_normalized_weight(&self, query: &Query) -> Result<Box<dyn Weight>> {
        let query = query.rewrite_fully(self)?;
        let mut weight = query.create_weight(self);
        let norm = query_norm(weight.sum_of_squared_weights());
        weight.normalize(norm);
        Ok(weight)
    }

    /// All the matches of the query with their scores, by ascending ordinal.
    pub fn search(&self, query: &Query) -> Result<Vec<(DocId, f32)>> {
        let weight = self.create_normalized_weight(query)?;
        let mut hits = vec![];
        for segment in self.segments() {
            collect_segment(weight.as_ref(), segment, &mut hits)?;
        }
        Ok(hits)
    }

    /// Like [`Snapshot::search`], with each segment scored by its own thread.
    /// All the threads share the one weight.
    pub fn search_threaded(&self, query: &Query) -> Result<Vec<(DocId, f32)>> {
        let weight = self.create_normalized_weight(query)?;
        let weight: &dyn Weight = weight.as_ref();
        let per_segment: Vec<Result<Vec<(DocId, f32)>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .segments()
                .iter()
                .map(|segment| {
                    scope.spawn(move || {
                        let mut hits = vec![];
                        collect_segment(weight, segment, &mut hits).map(|_| hits)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(r) => r,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        let mut hits = vec![];
        for r in per_segment {
            hits.extend(r?);
        }
        Ok(hits)
    }

    /// Explains the score of the query for a document of this snapshot.
    pub fn explain(&self, query: &Query, doc: DocId) -> Result<Explanation> {
        let weight = self.create_normalized_weight(query)?;
        match self.segment_for(doc) {
            Some(segment) => weight.explain(segment, doc - segment.base()),
            None => Ok(Explanation::no_match(format!(
                "{} doesn't match id {}",
                weight.query(),
                doc
            ))),
        }
    }
}

fn collect_segment(
    weight: &dyn Weight,
    segment: &SegmentReader,
    hits: &mut Vec<(DocId, f32)>,
) -> Result<()> {
    let mut scorer = weight.scorer(segment)?;
    while scorer.next_doc() != NO_MORE_DOCS {
        hits.push((segment.base() + scorer.doc(), scorer.score()));
    }
    Ok(())
}
