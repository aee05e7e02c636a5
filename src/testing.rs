/// Testing oriented utilities.
use hashbrown::HashSet;
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::models::queries::common::DocMatcher;
use crate::models::types::OurStr;
use crate::prelude::{
    DocId, Document, Index, IndexConfig, JoinQuery, Occur, Query, Queryable, Schema, Snapshot,
};

/// The schema of [`random_index`]: a text `kind`, numeric `id` and
/// `parent` fields, and text `label` and `link` fields sharing their values.
pub fn random_schema() -> Schema {
    Schema::new()
        .with_text("kind")
        .with_i64("id")
        .with_i64("parent")
        .with_text("label")
        .with_text("link")
}

static KINDS: [&str; 3] = ["a", "b", "c"];

static JOINABLE: [(&str, &str); 4] = [
    ("id", "parent"),
    ("parent", "id"),
    ("label", "link"),
    ("link", "label"),
];

/// Builds a random index over [`random_schema`], with several segments
/// and some deleted documents. Numeric values are drawn from `0..n_values`
/// and text values from as many labels.
///
/// Example:
/// ```
/// use joinery::testing::random_index;
/// use joinery::prelude::*;
///
/// let mut rng = rand::rng();
/// let index = random_index(&mut rng, 50, 10, IndexConfig::default());
/// assert_eq!(index.len(), 50);
/// ```
pub fn random_index<R: Rng>(
    rng: &mut R,
    n_docs: usize,
    n_values: i64,
    config: IndexConfig,
) -> Index {
    let n_values = n_values.max(1);
    let mut index = Index::with_config(random_schema(), config);
    for _ in 0..n_docs {
        let mut d = Document::new();
        if let Some(kind) = KINDS.choose(rng) {
            d = d.with_value("kind", *kind);
        }
        for field in ["id", "parent"] {
            for _ in 0..rng.random_range(0..3) {
                d = d.with_value(field, rng.random_range(0..n_values).to_string());
            }
        }
        for field in ["label", "link"] {
            for _ in 0..rng.random_range(0..3) {
                d = d.with_value(field, format!("v{}", rng.random_range(0..n_values)));
            }
        }
        // Only fails past u32::MAX documents.
        if index.index_document(&d).is_err() {
            break;
        }
        if rng.random_bool(0.1) {
            index.commit();
        }
    }
    for _ in 0..(n_docs / 10) {
        index.delete_doc(rng.random_range(0..n_docs.max(1)) as DocId);
    }
    index.commit();
    index
}

impl Query {
    /// Builds a random query over [`random_schema`], nesting joins
    /// and booleans up to the depth. This is mainly useful for testing and benchmarking.
    ///
    /// Example:
    /// ```
    /// use joinery::prelude::*;
    ///
    /// let mut rng = rand::rng();
    /// let q = Query::random(&mut rng, 10, 2);
    /// ```
    pub fn random<U: Rng>(rng: &mut U, n_values: i64, depth: usize) -> Self {
        let n_values = n_values.max(1);
        let leaf_only = depth == 0;
        match rng.random_range(0..if leaf_only { 4 } else { 7 }) {
            0 => "kind".has_value(*KINDS.choose(rng).unwrap_or(&"a")),
            1 => "id".has_i64(rng.random_range(0..n_values)),
            2 => "label".has_prefix(format!("v{}", rng.random_range(0..n_values.min(10)))),
            3 => Query::MatchAll,
            4 => {
                Query::random(rng, n_values, depth - 1) & Query::random(rng, n_values, depth - 1)
            }
            5 => {
                Query::random(rng, n_values, depth - 1) | !Query::random(rng, n_values, depth - 1)
            }
            _ => {
                let (from, to) = *JOINABLE.choose(rng).unwrap_or(&("id", "parent"));
                Query::random(rng, n_values, depth - 1).join(from, to)
            }
        }
    }
}

/// The live documents matching the query, found by looking at every
/// stored document. Slow, but independent from the index structures.
pub fn brute_force_doc_set(snapshot: &Snapshot, query: &Query) -> Vec<DocId> {
    brute_force_mask(snapshot, query)
        .into_iter()
        .enumerate()
        .filter(|(_, m)| *m)
        .map(|(d, _)| d as DocId)
        .collect()
}

// One flag per ordinal, set for the live documents matching the query.
fn brute_force_mask(snapshot: &Snapshot, query: &Query) -> Vec<bool> {
    let schema = snapshot.schema();
    let each_live = |f: &dyn Fn(&Document) -> bool| -> Vec<bool> {
        (0..snapshot.max_doc())
            .map(|doc| snapshot.document(doc).is_some_and(f))
            .collect()
    };
    match query {
        Query::MatchAll => each_live(&|_| true),
        Query::Term(t) => each_live(&|d| t.matches(d, schema)),
        Query::Prefix(p) => each_live(&|d| p.matches(d, schema)),
        Query::Boolean(b) => {
            let mut musts = vec![];
            let mut shoulds = vec![];
            let mut must_nots = vec![];
            for (occur, q) in b.clauses() {
                let mask = brute_force_mask(snapshot, q);
                match occur {
                    Occur::Must => musts.push(mask),
                    Occur::Should => shoulds.push(mask),
                    Occur::MustNot => must_nots.push(mask),
                }
            }
            if b.is_empty() {
                return vec![false; snapshot.max_doc() as usize];
            }
            let mut result = if !musts.is_empty() {
                (0..snapshot.max_doc() as usize)
                    .map(|i| musts.iter().all(|m| m[i]))
                    .collect()
            } else if !shoulds.is_empty() {
                (0..snapshot.max_doc() as usize)
                    .map(|i| shoulds.iter().any(|m| m[i]))
                    .collect()
            } else {
                each_live(&|_| true)
            };
            for (i, r) in result.iter_mut().enumerate() {
                *r = *r && !must_nots.iter().any(|m| m[i]);
            }
            result
        }
        Query::Join(j) => {
            let from_terms = join_from_terms(snapshot, j);
            each_live(&|d| {
                document_terms(snapshot, d, j.to_field())
                    .iter()
                    .any(|t| from_terms.contains(t))
            })
        }
    }
}

fn join_from_terms(snapshot: &Snapshot, j: &JoinQuery) -> HashSet<OurStr> {
    brute_force_doc_set(snapshot, j.sub_query())
        .into_iter()
        .filter_map(|doc| snapshot.document(doc))
        .flat_map(|d| document_terms(snapshot, d, j.from_field()))
        .collect()
}

// The full value terms of the document in the field.
fn document_terms(snapshot: &Snapshot, d: &Document, field: &str) -> Vec<OurStr> {
    let Some(field_type) = snapshot.schema().field_type(field) else {
        return vec![];
    };
    d.values(field)
        .iter()
        .filter_map(|v| field_type.query_term(field, v).ok())
        .collect()
}

/// The documents a join selects, found by brute force.
pub fn brute_force_join(
    snapshot: &Snapshot,
    from_field: &str,
    to_field: &str,
    sub: &Query,
) -> Vec<DocId> {
    brute_force_doc_set(snapshot, &sub.clone().join(from_field, to_field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_random_index() {
        let mut rng = StdRng::seed_from_u64(42);
        let index = random_index(&mut rng, 100, 10, IndexConfig::default());
        assert_eq!(index.len(), 100);
        let snapshot = index.snapshot();
        assert!(snapshot.num_docs() <= 100);
        assert!(snapshot.num_docs() >= 90);
    }

    #[test]
    fn test_brute_force_join() {
        let mut index = Index::new(random_schema());
        index.index_document(&[("id", "1")].into()).unwrap();
        index.index_document(&[("parent", "1")].into()).unwrap();
        index.index_document(&[("parent", "2")].into()).unwrap();
        index.commit();
        let snapshot = index.snapshot();
        assert_eq!(
            brute_force_join(&snapshot, "id", "parent", &Query::MatchAll),
            vec![1]
        );
        assert_eq!(
            brute_force_doc_set(&snapshot, &("id".has_i64(1) | "parent".has_i64(2))),
            vec![0, 2]
        );
        assert!(brute_force_doc_set(&snapshot, &Query::Boolean(Default::default())).is_empty());
    }

    #[test]
    fn test_random_queries() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let q = Query::random(&mut rng, 10, 2);
            assert!(!q.to_string().is_empty());
        }
    }
}
