//! Value equality joins over one inverted index.
//!
//! A join query selects the documents whose `to` field holds a value
//! that some document matching a sub-query holds in its `from` field.
//! Everything lives in one [`prelude::Index`]: joins read the term
//! dictionaries of a [`prelude::Snapshot`] and never load stored values.
//!
//! Example:
//! ```
//! use joinery::prelude::*;
//!
//! let mut index = Index::new(Schema::new().with_text("kind").with_i64("id").with_i64("parent"));
//! let parent = index.index_document(&[("kind", "parent"), ("id", "1")].into()).unwrap();
//! let child = index.index_document(&[("kind", "child"), ("parent", "1")].into()).unwrap();
//! index.commit();
//!
//! let snapshot = index.snapshot();
//! let q = QueryParser::new(snapshot.schema())
//!     .parse("{!join from=id to=parent}kind:parent")
//!     .unwrap();
//! let hits: Vec<DocId> = snapshot.search(&q).unwrap().into_iter().map(|(d, _)| d).collect();
//! assert_eq!(hits, vec![child]);
//! assert_ne!(parent, child);
//! ```
pub mod models;
pub mod prelude;
pub mod testing;

mod itertools;
