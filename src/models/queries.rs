use std::collections::HashSet;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use roaring::RoaringBitmap;

use crate::models::docset::DocSet;
use crate::models::error::Result;
use crate::models::join::{JoinQuery, JoinWeight};
use crate::models::schema::i64_term;
use crate::models::search::{ConstantScoreWeight, Weight};
use crate::models::snapshot::Snapshot;
use crate::models::types::OurStr;

pub mod boolean;
pub mod common;
pub mod prefix;
pub mod term;

use boolean::{BooleanQuery, Occur};
use prefix::PrefixQuery;
use term::{Term, TermQuery};

/// A query tree.
///
/// Queries are plain values: they compare and hash structurally, so
/// they can key the per snapshot result cache.
///
/// Build them with [`Queryable`] and the `&`, `|` and `!` operators:
/// ```
/// use joinery::prelude::*;
///
/// let q = "colour".has_value("blue") & !"size".has_i64(12);
/// assert_eq!(q.to_string(), "(+colour:blue +(-size:#00800000000000000c))");
///
/// let j = "pid".has_value("1").join("pid", "external_id");
/// assert_eq!(j.to_string(), "{!join from=pid to=external_id}pid:1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Query {
    /// All live documents.
    MatchAll,
    Term(TermQuery),
    Prefix(PrefixQuery),
    Boolean(BooleanQuery),
    Join(JoinQuery),
}

impl Query {
    /// A join of the documents matching this query, from one field to another.
    pub fn join<T: Into<OurStr>, U: Into<OurStr>>(self, from_field: T, to_field: U) -> Query {
        Query::Join(JoinQuery::new(from_field, to_field, self))
    }

    /// The score multiplier of this query.
    pub fn boost(&self) -> f32 {
        match self {
            Query::Join(j) => j.boost(),
            _ => 1.0,
        }
    }

    /// One rewriting step, towards queries the index can run directly.
    /// Returns None when this query is already in its final form.
    pub fn rewrite(&self, snapshot: &Snapshot) -> Result<Option<Query>> {
        match self {
            Query::MatchAll | Query::Term(_) => Ok(None),
            Query::Prefix(p) => {
                let mut terms = p.expand(snapshot)?;
                Ok(Some(if terms.len() == 1 {
                    Query::Term(TermQuery::new(p.field(), terms.remove(0)))
                } else {
                    Query::Boolean(terms.into_iter().fold(BooleanQuery::new(), |b, t| {
                        b.with_should(Query::Term(TermQuery::new(p.field(), t)))
                    }))
                }))
            }
            Query::Boolean(b) => {
                if let [(Occur::Must | Occur::Should, only)] = b.clauses() {
                    return Ok(Some(only.rewrite_fully(snapshot)?));
                }
                let mut changed = false;
                let mut rewritten = BooleanQuery::new();
                for (occur, q) in b.clauses() {
                    let q = match q.rewrite(snapshot)? {
                        Some(new) => {
                            changed = true;
                            new
                        }
                        None => q.clone(),
                    };
                    rewritten = rewritten.with_clause(*occur, q);
                }
                Ok(changed.then_some(Query::Boolean(rewritten)))
            }
            Query::Join(j) => Ok(j.rewrite(snapshot)?.map(Query::Join)),
        }
    }

    /// Rewrites until there is nothing left to rewrite.
    pub fn rewrite_fully(&self, snapshot: &Snapshot) -> Result<Query> {
        let mut current = self.clone();
        while let Some(next) = current.rewrite(snapshot)? {
            current = next;
        }
        Ok(current)
    }

    /// Adds the terms this query looks up to the set.
    /// Prefixes only contribute terms once rewritten.
    pub fn extract_terms(&self, terms: &mut HashSet<Term>) {
        match self {
            Query::MatchAll | Query::Prefix(_) => {}
            Query::Term(t) => {
                terms.insert(t.to_term());
            }
            Query::Boolean(b) => b
                .clauses()
                .iter()
                .filter(|(o, _)| *o != Occur::MustNot)
                .for_each(|(_, q)| q.extract_terms(terms)),
            Query::Join(j) => j.extract_terms(terms),
        }
    }

    /// The live documents matching this query.
    /// Use [`Snapshot::doc_set`] to go through the result cache.
    pub(crate) fn compute_doc_set(&self, snapshot: &Snapshot) -> Result<DocSet> {
        match self {
            Query::MatchAll => Ok(snapshot.all_docs()),
            Query::Term(t) => snapshot.cached_term_set(&t.field(), &t.term()),
            Query::Prefix(p) => {
                let mut bits = RoaringBitmap::new();
                for term in p.expand(snapshot)? {
                    snapshot
                        .cached_term_set(&p.field(), &term)?
                        .union_into(&mut bits);
                }
                Ok(DocSet::from_bits(bits))
            }
            Query::Boolean(b) => b.compute_doc_set(snapshot),
            Query::Join(j) => j.compute(snapshot).map(|(set, _)| set),
        }
    }

    /// A fresh, not yet normalised weight of this query on the snapshot.
    pub fn create_weight(&self, snapshot: &Snapshot) -> Box<dyn Weight> {
        match self {
            Query::Join(j) => Box::new(JoinWeight::new(j.clone(), snapshot.clone())),
            _ => Box::new(ConstantScoreWeight::new(self.clone(), snapshot.clone())),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::MatchAll => write!(f, "*:*"),
            Query::Term(q) => write!(f, "{}", q),
            Query::Prefix(q) => write!(f, "{}", q),
            Query::Boolean(q) => write!(f, "{}", q),
            Query::Join(q) => write!(f, "{}", q),
        }
    }
}

impl From<TermQuery> for Query {
    fn from(q: TermQuery) -> Self {
        Query::Term(q)
    }
}

impl From<PrefixQuery> for Query {
    fn from(q: PrefixQuery) -> Self {
        Query::Prefix(q)
    }
}

impl From<BooleanQuery> for Query {
    fn from(q: BooleanQuery) -> Self {
        Query::Boolean(q)
    }
}

impl From<JoinQuery> for Query {
    fn from(q: JoinQuery) -> Self {
        Query::Join(q)
    }
}

/// Builds leaf queries from field names.
pub trait Queryable {
    /// Documents with this exact text value.
    fn has_value<T: Into<OurStr>>(self, v: T) -> Query;
    /// Documents with a text value starting with the prefix.
    fn has_prefix<T: Into<OurStr>>(self, prefix: T) -> Query;
    /// Documents with this numeric value.
    fn has_i64(self, v: i64) -> Query;
}

impl<F> Queryable for F
where
    F: Into<OurStr>,
{
    fn has_value<T: Into<OurStr>>(self, v: T) -> Query {
        Query::Term(TermQuery::new(self, v))
    }

    fn has_prefix<T: Into<OurStr>>(self, prefix: T) -> Query {
        Query::Prefix(PrefixQuery::new(self, prefix))
    }

    fn has_i64(self, v: i64) -> Query {
        Query::Term(TermQuery::new(self, i64_term(v)))
    }
}

impl BitAnd for Query {
    type Output = Query;

    fn bitand(self, rhs: Self) -> Self::Output {
        match self {
            Query::Boolean(b) if b.is_only(Occur::Must) => Query::Boolean(b.with_must(rhs)),
            q => Query::Boolean(BooleanQuery::new().with_must(q).with_must(rhs)),
        }
    }
}

impl BitOr for Query {
    type Output = Query;

    fn bitor(self, rhs: Self) -> Self::Output {
        match self {
            Query::Boolean(b) if b.is_only(Occur::Should) => Query::Boolean(b.with_should(rhs)),
            q => Query::Boolean(BooleanQuery::new().with_should(q).with_should(rhs)),
        }
    }
}

impl Not for Query {
    type Output = Query;

    fn not(self) -> Self::Output {
        Query::Boolean(BooleanQuery::new().with_must_not(self))
    }
}
