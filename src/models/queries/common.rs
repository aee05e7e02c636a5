use crate::models::document::Document;
use crate::models::schema::Schema;

/// Matching a single stored document, without any index.
/// This is the ground truth the index based execution must agree with.
pub trait DocMatcher {
    fn matches(&self, d: &Document, schema: &Schema) -> bool;
}
