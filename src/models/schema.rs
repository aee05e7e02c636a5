use std::fmt;

use crate::models::error::ParseError;
use crate::models::types::OurStr;

/// Prefix of every full precision numeric term.
pub const MAIN_VALUE_PREFIX: &str = "#00";

/// How the values of a field are turned into terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldType {
    /// Values are indexed verbatim, as one term each.
    Text,
    /// Values are signed 64 bits integers. Each value produces one full
    /// precision term, plus one reduced precision term for each multiple
    /// of `precision_step` bits shifted out.
    I64 { precision_step: u8 },
}

impl FieldType {
    /// The numeric type with the usual precision step.
    pub fn i64() -> Self {
        Self::I64 { precision_step: 16 }
    }

    /// The prefix shared by all terms holding a full value of this field,
    /// when reduced precision terms live in the same dictionary.
    pub fn main_value_prefix(&self) -> Option<&'static str> {
        match self {
            FieldType::Text => None,
            FieldType::I64 { .. } => Some(MAIN_VALUE_PREFIX),
        }
    }

    /// All the terms to index for the raw value.
    pub fn index_terms(&self, field: &str, value: &str) -> Result<Vec<OurStr>, ParseError> {
        match self {
            FieldType::Text => Ok(vec![value.into()]),
            FieldType::I64 { precision_step } => {
                let v = parse_i64(field, value)?;
                let step = u32::from((*precision_step).clamp(1, 64));
                Ok((0..64)
                    .step_by(step as usize)
                    .map(|shift| encode_i64(v, shift).into())
                    .collect())
            }
        }
    }

    /// The single term a query for this exact value looks for.
    pub fn query_term(&self, field: &str, value: &str) -> Result<OurStr, ParseError> {
        match self {
            FieldType::Text => Ok(value.into()),
            FieldType::I64 { .. } => Ok(encode_i64(parse_i64(field, value)?, 0).into()),
        }
    }

    /// Whether prefix queries make sense on this field.
    pub fn supports_prefix(&self) -> bool {
        matches!(self, FieldType::Text)
    }
}

fn parse_i64(field: &str, value: &str) -> Result<i64, ParseError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|e| ParseError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

// Flipping the sign bit makes the unsigned order match the signed one,
// and fixed width hex keeps the byte order equal to the numeric order.
fn encode_i64(v: i64, shift: u32) -> String {
    let sortable = (v as u64) ^ (1 << 63);
    format!("#{:02}{:016x}", shift, sortable >> shift)
}

/// The full precision term of a value, as queries look it up.
pub fn i64_term(v: i64) -> OurStr {
    encode_i64(v, 0).into()
}

/// Decodes a full precision term back to its value.
pub fn decode_i64(term: &str) -> Option<i64> {
    let hex = term.strip_prefix(MAIN_VALUE_PREFIX)?;
    let sortable = u64::from_str_radix(hex, 16).ok()?;
    Some((sortable ^ (1 << 63)) as i64)
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct FieldEntry {
    name: OurStr,
    field_type: FieldType,
}

/// The declared fields of an index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Schema {
    fields: Vec<FieldEntry>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// This schema with one more field. Redeclaring a field changes its type.
    pub fn with_field<T: Into<OurStr>>(mut self, name: T, field_type: FieldType) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|e| e.name == name) {
            Some(e) => e.field_type = field_type,
            None => self.fields.push(FieldEntry { name, field_type }),
        }
        self
    }

    /// Shortcut for a [`FieldType::Text`] field.
    pub fn with_text<T: Into<OurStr>>(self, name: T) -> Self {
        self.with_field(name, FieldType::Text)
    }

    /// Shortcut for a [`FieldType::I64`] field.
    pub fn with_i64<T: Into<OurStr>>(self, name: T) -> Self {
        self.with_field(name, FieldType::i64())
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|e| e.name.as_ref() == name)
            .map(|e| e.field_type)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field_type(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = OurStr> + '_ {
        self.fields.iter().map(|e| e.name.clone())
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match e.field_type {
                FieldType::Text => write!(f, "{}:text", e.name)?,
                FieldType::I64 { precision_step } => {
                    write!(f, "{}:i64/{}", e.name, precision_step)?
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i64_terms_sort_numerically() {
        let ft = FieldType::i64();
        let mut values = vec![-1000_i64, -1, 0, 1, 42, 1 << 40, i64::MIN, i64::MAX];
        let mut terms: Vec<String> = values
            .iter()
            .map(|v| ft.query_term("n", &v.to_string()).unwrap().to_string())
            .collect();
        values.sort();
        terms.sort();
        let decoded: Vec<i64> = terms.iter().map(|t| decode_i64(t).unwrap()).collect();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_i64_index_terms() {
        let ft = FieldType::I64 { precision_step: 16 };
        let terms = ft.index_terms("n", "7").unwrap();
        assert_eq!(terms.len(), 4);
        assert!(terms[0].starts_with(MAIN_VALUE_PREFIX));
        assert!(terms[1..].iter().all(|t| !t.starts_with(MAIN_VALUE_PREFIX)));
        assert_eq!(ft.main_value_prefix(), Some(MAIN_VALUE_PREFIX));
        assert_eq!(decode_i64(&terms[0]), Some(7));
        assert_eq!(terms[0], i64_term(7));
        assert_eq!(decode_i64(&terms[1]), None);
    }

    #[test]
    fn test_invalid_i64() {
        let ft = FieldType::i64();
        assert!(matches!(
            ft.query_term("n", "abc"),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(ft.index_terms("n", "12x").is_err());
    }

    #[test]
    fn test_text() {
        let ft = FieldType::Text;
        assert_eq!(ft.main_value_prefix(), None);
        assert_eq!(ft.index_terms("t", "Hello").unwrap(), vec!["Hello".into()]);
        assert!(ft.supports_prefix());
    }

    #[test]
    fn test_schema() {
        let s = Schema::new()
            .with_text("pid")
            .with_i64("price")
            .with_text("pid");
        assert_eq!(s.field_type("pid"), Some(FieldType::Text));
        assert_eq!(s.field_type("price"), Some(FieldType::i64()));
        assert!(!s.has_field("nope"));
        assert_eq!(s.to_string(), "pid:text, price:i64/16");
    }
}
