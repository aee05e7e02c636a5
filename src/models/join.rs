use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};

use log::{debug, warn};

use crate::models::docset::DocSet;
use crate::models::error::Result;
use crate::models::filter::DocFilter;
use crate::models::queries::Query;
use crate::models::queries::term::Term;
use crate::models::search::{ConstantScorer, Explanation, Scorer, Weight, check_segment, explain_constant};
use crate::models::snapshot::{SegmentReader, Snapshot};
use crate::models::types::{DocId, OurRc, OurStr};

pub mod algorithm;

use algorithm::{JoinStats, join_doc_set};

/// The documents whose `to_field` shares a term with the `from_field`
/// of the documents matching a sub-query.
///
/// Example:
/// ```
/// use joinery::prelude::*;
///
/// let mut index = Index::new(Schema::new().with_i64("pid").with_i64("external_id"));
/// for pid in ["1", "1", "2"] {
///     index.index_document(&[("pid", pid)].into()).unwrap();
/// }
/// let child = index.index_document(&[("external_id", "2")].into()).unwrap();
/// index.commit();
///
/// let q = "pid".has_i64(2).join("pid", "external_id");
/// let hits = index.snapshot().search(&q).unwrap();
/// assert_eq!(hits, vec![(child, 1.0)]);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JoinQuery {
    from_field: OurStr,
    to_field: OurStr,
    sub: OurRc<Query>,
    boost: f32,
}

impl JoinQuery {
    pub fn new<T: Into<OurStr>, U: Into<OurStr>>(from_field: T, to_field: U, sub: Query) -> Self {
        Self {
            from_field: from_field.into(),
            to_field: to_field.into(),
            sub: OurRc::new(sub),
            boost: 1.0,
        }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn from_field(&self) -> &str {
        &self.from_field
    }

    pub fn to_field(&self) -> &str {
        &self.to_field
    }

    pub fn sub_query(&self) -> &Query {
        &self.sub
    }

    pub fn boost(&self) -> f32 {
        self.boost
    }

    /// Rewrites the sub-query. None when it does not change.
    pub fn rewrite(&self, snapshot: &Snapshot) -> Result<Option<JoinQuery>> {
        Ok(self.sub.rewrite(snapshot)?.map(|sub| JoinQuery {
            from_field: self.from_field.clone(),
            to_field: self.to_field.clone(),
            sub: OurRc::new(sub),
            boost: self.boost,
        }))
    }

    /// The terms of the sub-query.
    pub fn extract_terms(&self, terms: &mut HashSet<Term>) {
        self.sub.extract_terms(terms)
    }

    /// Runs the sub-query, then joins its documents.
    pub(crate) fn compute(&self, snapshot: &Snapshot) -> Result<(DocSet, JoinStats)> {
        let from_set = snapshot.doc_set(&self.sub)?;
        join_doc_set(snapshot, &self.from_field, &self.to_field, &from_set)
    }
}

impl PartialEq for JoinQuery {
    fn eq(&self, other: &Self) -> bool {
        self.from_field == other.from_field
            && self.to_field == other.to_field
            && self.boost.to_bits() == other.boost.to_bits()
            && self.sub == other.sub
    }
}

impl Eq for JoinQuery {}

// The boost is left out. Equal joins still hash the same.
impl Hash for JoinQuery {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sub.hash(state);
        self.from_field.hash(state);
        self.to_field.hash(state);
    }
}

impl fmt::Display for JoinQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{!join from={} to={}}}{}",
            self.from_field, self.to_field, self.sub
        )
    }
}

struct JoinResult {
    set: DocSet,
    filter: DocFilter,
    stats: JoinStats,
}

/// A join bound to one snapshot.
///
/// Nothing is computed until the first scorer request. The join then
/// runs once, whatever the number of segments or threads asking, and
/// all of them share its result. A failure is final for this weight.
pub struct JoinWeight {
    query: JoinQuery,
    snapshot: Snapshot,
    result: OnceLock<Result<JoinResult>>,
    computations: AtomicU32,
    query_weight: f32,
    query_norm: f32,
}

impl JoinWeight {
    pub fn new(query: JoinQuery, snapshot: Snapshot) -> Self {
        let boost = query.boost();
        Self {
            query,
            snapshot,
            result: OnceLock::new(),
            computations: AtomicU32::new(0),
            query_weight: boost,
            query_norm: 1.0,
        }
    }

    fn result(&self) -> Result<&JoinResult> {
        self.result
            .get_or_init(|| {
                self.computations.fetch_add(1, Ordering::Relaxed);
                let r = self.compute();
                if let Err(e) = &r {
                    warn!("Join {} failed: {}", self.query, e);
                }
                r
            })
            .as_ref()
            .map_err(|e| e.clone())
    }

    fn compute(&self) -> Result<JoinResult> {
        let (set, stats) = self.query.compute(&self.snapshot)?;
        debug!("Join {}:\n{}", self.query, stats);
        Ok(JoinResult {
            filter: set.as_filter(),
            set,
            stats,
        })
    }

    /// The join result, computed on first use.
    pub fn doc_set(&self) -> Result<DocSet> {
        self.result().map(|r| r.set.clone())
    }

    /// The statistics of the computation, once it has succeeded.
    pub fn stats(&self) -> Option<&JoinStats> {
        self.result.get()?.as_ref().ok().map(|r| &r.stats)
    }

    /// How many times the join ran. Never more than once.
    pub fn computations(&self) -> u32 {
        self.computations.load(Ordering::Relaxed)
    }
}

impl Weight for JoinWeight {
    fn query(&self) -> Query {
        Query::Join(self.query.clone())
    }

    fn value(&self) -> f32 {
        self.query_weight
    }

    fn sum_of_squared_weights(&self) -> f32 {
        self.query.boost() * self.query.boost()
    }

    fn normalize(&mut self, norm: f32) {
        self.query_norm = norm;
        self.query_weight = self.query.boost() * norm;
    }

    fn scorer(&self, segment: &SegmentReader) -> Result<Box<dyn Scorer>> {
        check_segment(&self.snapshot, segment)?;
        let result = self.result()?;
        Ok(Box::new(ConstantScorer::for_segment(
            &result.filter,
            segment,
            self.query_weight,
        )))
    }

    fn explain(&self, segment: &SegmentReader, doc: DocId) -> Result<Explanation> {
        explain_constant(self, segment, doc, self.query.boost(), self.query_norm)
    }
}
