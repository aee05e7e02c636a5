use std::fmt;

use crate::models::document::Document;
use crate::models::error::{Error, Result};
use crate::models::queries::common::DocMatcher;
use crate::models::queries::term::write_value;
use crate::models::schema::Schema;
use crate::models::snapshot::Snapshot;
use crate::models::term_cursor::SeekStatus;
use crate::models::types::OurStr;

/// Documents having a term starting with a prefix.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrefixQuery {
    field: OurStr,
    prefix: OurStr,
}

impl PrefixQuery {
    /// Constructor
    pub fn new<T: Into<OurStr>, U: Into<OurStr>>(field: T, prefix: U) -> Self {
        PrefixQuery {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    /// The field
    pub fn field(&self) -> OurStr {
        self.field.clone()
    }

    /// The prefix
    pub fn prefix(&self) -> OurStr {
        self.prefix.clone()
    }

    /// The terms of the snapshot starting with the prefix, ascending.
    /// Fails when there are more than the configured maximum.
    pub fn expand(&self, snapshot: &Snapshot) -> Result<Vec<OurStr>> {
        if !snapshot
            .schema()
            .field_type(&self.field)
            .is_some_and(|ft| ft.supports_prefix())
        {
            return Ok(vec![]);
        }
        let Some(mut cursor) = snapshot.term_cursor(&self.field, u32::MAX) else {
            return Ok(vec![]);
        };

        let limit = snapshot.config().max_prefix_expansions();
        let mut terms = vec![];
        if cursor.seek_ceil(&self.prefix) == SeekStatus::End {
            return Ok(terms);
        }
        while let Some(term) = cursor.term() {
            if !term.starts_with(&*self.prefix) {
                break;
            }
            if terms.len() == limit {
                return Err(Error::TooManyTerms {
                    field: self.field.to_string(),
                    prefix: self.prefix.to_string(),
                    limit,
                });
            }
            terms.push(term.into());
            cursor.next_term();
        }
        Ok(terms)
    }
}

impl fmt::Display for PrefixQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.field)?;
        write_value(f, &self.prefix)?;
        write!(f, "*")
    }
}

impl DocMatcher for PrefixQuery {
    /// Does this match the document?
    fn matches(&self, d: &Document, schema: &Schema) -> bool {
        schema
            .field_type(&self.field)
            .is_some_and(|ft| ft.supports_prefix())
            && d.values_iter(&self.field)
                .is_some_and(|mut i| i.any(|v| v.starts_with(&*self.prefix)))
    }
}
