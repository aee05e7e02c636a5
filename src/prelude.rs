pub use crate::models::docset::{DocSet, Encoding};
pub use crate::models::document::Document;
pub use crate::models::error::{Error, ParseError};
pub use crate::models::filter::{DocFilter, SegmentDocs};
pub use crate::models::index::Index;
pub use crate::models::index::config::{IndexConfig, IndexConfigBuilder};
pub use crate::models::join::JoinQuery;
pub use crate::models::join::JoinWeight;
pub use crate::models::join::algorithm::JoinStats;
pub use crate::models::parsing::QueryParser;
pub use crate::models::queries::boolean::{BooleanQuery, Occur};
pub use crate::models::queries::prefix::PrefixQuery;
pub use crate::models::queries::term::{Term, TermQuery};
pub use crate::models::queries::{Query, Queryable};
pub use crate::models::schema::{FieldType, Schema};
pub use crate::models::search::{Explanation, Scorer, Weight};
pub use crate::models::snapshot::{SegmentReader, Snapshot};
pub use crate::models::term_cursor::{Postings, SeekStatus, TermCursor};
pub use crate::models::types::{DocId, NO_MORE_DOCS};
