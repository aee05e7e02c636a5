use std::fmt;

use crate::models::document::Document;
use crate::models::queries::common::DocMatcher;
use crate::models::schema::Schema;
use crate::models::types::OurStr;

/// A field scoped dictionary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Term {
    field: OurStr,
    text: OurStr,
}

impl Term {
    pub fn new<T: Into<OurStr>, U: Into<OurStr>>(field: T, text: U) -> Self {
        Self {
            field: field.into(),
            text: text.into(),
        }
    }

    pub fn field(&self) -> OurStr {
        self.field.clone()
    }

    /// The indexed text, as found in the term dictionary.
    pub fn text(&self) -> OurStr {
        self.text.clone()
    }
}

// Quotes the text when it would not read back as a bare value.
pub(crate) fn write_value(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    let bare = !text.is_empty()
        && !text
            .chars()
            .any(|c| c.is_whitespace() || "\"():*{}\\".contains(c));
    if bare {
        write!(f, "{}", text)
    } else {
        write!(f, "\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.field)?;
        write_value(f, &self.text)
    }
}

/// Documents having a term.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TermQuery {
    field: OurStr,
    term: OurStr,
}

impl TermQuery {
    /// Constructor. The term must already be encoded for its field.
    pub fn new<T: Into<OurStr>, U: Into<OurStr>>(field: T, term: U) -> Self {
        TermQuery {
            field: field.into(),
            term: term.into(),
        }
    }

    pub fn field(&self) -> OurStr {
        self.field.clone()
    }

    pub fn term(&self) -> OurStr {
        self.term.clone()
    }

    pub fn to_term(&self) -> Term {
        Term::new(self.field.clone(), self.term.clone())
    }
}

impl fmt::Display for TermQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.field)?;
        write_value(f, &self.term)
    }
}

impl DocMatcher for TermQuery {
    fn matches(&self, d: &Document, schema: &Schema) -> bool {
        let Some(field_type) = schema.field_type(&self.field) else {
            return false;
        };
        d.values_iter(&self.field).is_some_and(|mut vs| {
            vs.any(|v| {
                field_type
                    .index_terms(&self.field, &v)
                    .is_ok_and(|ts| ts.contains(&self.term))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::FieldType;

    #[test]
    fn test_display() {
        assert_eq!(TermQuery::new("f", "abc").to_string(), "f:abc");
        assert_eq!(TermQuery::new("f", "a b").to_string(), "f:\"a b\"");
        assert_eq!(TermQuery::new("f", "a\"b").to_string(), "f:\"a\\\"b\"");
        assert_eq!(TermQuery::new("f", "").to_string(), "f:\"\"");
        assert_eq!(Term::new("f", "x").to_string(), "f:x");
    }

    #[test]
    fn test_matching() {
        let schema = Schema::new().with_text("colour").with_i64("size");
        let d = Document::new()
            .with_value("colour", "blue")
            .with_value("size", "12");
        assert!(TermQuery::new("colour", "blue").matches(&d, &schema));
        assert!(!TermQuery::new("colour", "red").matches(&d, &schema));
        assert!(!TermQuery::new("shape", "blue").matches(&d, &schema));

        let twelve = FieldType::i64().query_term("size", "12").unwrap();
        assert!(TermQuery::new("size", twelve).matches(&d, &schema));
        assert!(!TermQuery::new("size", "12").matches(&d, &schema));
    }
}
