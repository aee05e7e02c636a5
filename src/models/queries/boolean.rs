use std::fmt;

use roaring::RoaringBitmap;

use crate::itertools::InPlaceReduce;
use crate::models::docset::DocSet;
use crate::models::error::Result;
use crate::models::queries::Query;
use crate::models::snapshot::Snapshot;

/// How a clause takes part in a [`BooleanQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Occur {
    Must,
    Should,
    MustNot,
}

impl Occur {
    fn sigil(&self) -> &'static str {
        match self {
            Occur::Must => "+",
            Occur::Should => "",
            Occur::MustNot => "-",
        }
    }
}

/// A combination of sub-queries.
///
/// Matches all the `Must` clauses when there are some, or else any of
/// the `Should` clauses. `MustNot` clauses are removed from that.
/// A query with only `MustNot` clauses starts from all live documents,
/// and a query without any clause matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BooleanQuery {
    clauses: Vec<(Occur, Query)>,
}

impl BooleanQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clause(mut self, occur: Occur, query: Query) -> Self {
        self.clauses.push((occur, query));
        self
    }

    pub fn with_must(self, query: Query) -> Self {
        self.with_clause(Occur::Must, query)
    }

    pub fn with_should(self, query: Query) -> Self {
        self.with_clause(Occur::Should, query)
    }

    pub fn with_must_not(self, query: Query) -> Self {
        self.with_clause(Occur::MustNot, query)
    }

    pub fn clauses(&self) -> &[(Occur, Query)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Are all the clauses of this kind?
    pub(crate) fn is_only(&self, occur: Occur) -> bool {
        !self.clauses.is_empty() && self.clauses.iter().all(|(o, _)| *o == occur)
    }

    fn clause_bits<'a>(
        &'a self,
        occur: Occur,
        snapshot: &'a Snapshot,
    ) -> impl Iterator<Item = Result<RoaringBitmap>> + 'a {
        self.clauses
            .iter()
            .filter(move |(o, _)| *o == occur)
            .map(move |(_, q)| {
                let set = snapshot.doc_set(q)?;
                let mut bits = RoaringBitmap::new();
                set.union_into(&mut bits);
                Ok(bits)
            })
    }

    pub(crate) fn compute_doc_set(&self, snapshot: &Snapshot) -> Result<DocSet> {
        if self.clauses.is_empty() {
            return Ok(DocSet::empty());
        }
        let has = |occur: Occur| self.clauses.iter().any(|(o, _)| *o == occur);

        let musts: Vec<RoaringBitmap> =
            self.clause_bits(Occur::Must, snapshot).collect::<Result<_>>()?;
        let mut bits = if !musts.is_empty() {
            // Smallest first keeps the running intersection small.
            let mut musts = musts;
            musts.sort_by_key(|b| b.len());
            musts
                .into_iter()
                .reduce_inplace(|acc, b| *acc &= b)
                .unwrap_or_default()
        } else if has(Occur::Should) {
            self.clause_bits(Occur::Should, snapshot)
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .reduce_inplace(|acc, b| *acc |= b)
                .unwrap_or_default()
        } else {
            let mut all = RoaringBitmap::new();
            snapshot.all_docs().union_into(&mut all);
            all
        };

        for excluded in self.clause_bits(Occur::MustNot, snapshot) {
            bits -= excluded?;
        }
        Ok(DocSet::from_bits(bits))
    }
}

impl fmt::Display for BooleanQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, (occur, q)) in self.clauses.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}{}", occur.sigil(), q)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::index::Index;
    use crate::models::queries::term::TermQuery;
    use crate::models::schema::Schema;

    fn t(v: &str) -> Query {
        Query::Term(TermQuery::new("f", v))
    }

    fn snapshot() -> Snapshot {
        let mut index = Index::new(Schema::new().with_text("f"));
        for vs in [&["a", "b"][..], &["a"], &["b"], &["c"], &["a", "c"]] {
            let d = vs
                .iter()
                .fold(crate::models::document::Document::new(), |d, v| {
                    d.with_value("f", *v)
                });
            index.index_document(&d).unwrap();
        }
        index.commit();
        index.delete_doc(3);
        index.snapshot()
    }

    #[test]
    fn test_semantics() {
        let s = snapshot();
        let run = |q: BooleanQuery| q.compute_doc_set(&s).unwrap().to_sorted_vec();

        assert_eq!(run(BooleanQuery::new()), Vec::<u32>::new());
        assert_eq!(run(BooleanQuery::new().with_must(t("a")).with_must(t("b"))), vec![0]);
        assert_eq!(run(BooleanQuery::new().with_should(t("b")).with_should(t("c"))), vec![0, 2, 4]);
        // Shoulds are optional once there are musts.
        assert_eq!(run(BooleanQuery::new().with_must(t("a")).with_should(t("zz"))), vec![0, 1, 4]);
        assert_eq!(run(BooleanQuery::new().with_must(t("a")).with_must_not(t("c"))), vec![0, 1]);
        // Pure negation starts from live documents.
        assert_eq!(run(BooleanQuery::new().with_must_not(t("a"))), vec![2]);
    }

    #[test]
    fn test_display() {
        let q = BooleanQuery::new()
            .with_must(t("a"))
            .with_should(t("b"))
            .with_must_not(t("c"));
        assert_eq!(q.to_string(), "(+f:a f:b -f:c)");
        assert_eq!(BooleanQuery::new().to_string(), "()");
        assert!(q.clone().with_must(t("d")).clauses().len() == 4);
        assert!(!q.is_only(Occur::Must));
        assert!(BooleanQuery::new().with_must(t("a")).is_only(Occur::Must));
        assert_eq!(Occur::MustNot.to_string(), "must_not");
    }
}
