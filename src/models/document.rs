use std::collections::HashMap;

use itertools::Itertools;

use crate::models::types::OurStr;

/// A document to index: a multimap from field names to raw values.
///
/// Values are raw strings. The schema decides how each of them
/// is turned into indexed terms.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Document {
    // Fields representing the document's content
    fields: HashMap<OurStr, Vec<OurStr>>,
    fvs_count: usize,
}

type FieldValue = (OurStr, OurStr);

impl Document {
    /// Alias for default. An empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of (field,value) tuples in this document.
    pub fn fv_count(&self) -> usize {
        self.fvs_count
    }

    /// An iterator on all the (field,value) tuples of this document,
    /// ordered by field name.
    pub fn field_values(&self) -> impl Iterator<Item = FieldValue> + use<'_> {
        self.fields
            .iter()
            .sorted_by(|(fa, _), (fb, _)| fa.cmp(fb))
            .flat_map(|(f, vs)| vs.iter().map(move |v| (f.clone(), v.clone())))
    }

    /// This document with a new field,value pair
    pub fn with_value<T, U>(mut self, field: T, value: U) -> Self
    where
        T: Into<OurStr>,
        U: Into<OurStr>,
    {
        let val: OurStr = value.into();

        self.fields
            .entry(field.into())
            .and_modify(|v| v.push(val.clone()))
            .or_insert(vec![val]);
        self.fvs_count += 1;
        self
    }

    /// All fields of this document
    pub fn fields(&self) -> impl Iterator<Item = OurStr> + use<'_> {
        self.fields.keys().cloned()
    }

    /// Does this document have any value for the field?
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// All values of the field
    pub fn values(&self, field: &str) -> Vec<OurStr> {
        if let Some(it) = self.values_iter(field) {
            it.collect()
        } else {
            vec![]
        }
    }

    /// All values of the field if it exists
    pub fn values_iter(&self, field: &str) -> Option<impl Iterator<Item = OurStr> + '_> {
        self.fields.get(field).map(|v| v.iter().cloned())
    }
}

impl<T, U, const N: usize> From<[(T, U); N]> for Document
where
    T: Into<OurStr>,
    U: Into<OurStr>,
{
    fn from(fvs: [(T, U); N]) -> Self {
        fvs.into_iter()
            .fold(Document::default(), |d, (f, v)| d.with_value(f, v))
    }
}
