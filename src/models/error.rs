use thiserror::Error;

/// Errors detected while turning query text into a [`crate::prelude::Query`].
/// Nothing is executed when one of these is raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("missing required parameter '{0}'")]
    MissingParam(&'static str),

    #[error("undefined field '{0}'")]
    UnknownField(String),

    #[error("unknown query parser '{0}'")]
    UnknownParser(String),

    #[error("invalid value '{value}' for field '{field}': {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Index and execution time errors.
///
/// Errors are `Clone` so a weight whose computation failed can
/// report the same failure to every later scorer request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("undefined field '{0}'")]
    UnknownField(String),

    /// More documents than a [`crate::prelude::DocId`] can address.
    #[error("too many documents in index")]
    TooManyDocuments,

    #[error("prefix '{prefix}' on field '{field}' expands to more than {limit} terms")]
    TooManyTerms {
        field: String,
        prefix: String,
        limit: usize,
    },

    #[error("a snapshot cache lock was poisoned")]
    CachePoisoned,

    #[error("segment {segment} does not belong to this snapshot")]
    ForeignSegment { segment: usize },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ParseError::MissingParam("from").to_string(),
            "missing required parameter 'from'"
        );
        let e: Error = ParseError::UnknownField("nope".into()).into();
        assert_eq!(e.to_string(), "undefined field 'nope'");
        assert_eq!(
            Error::TooManyTerms {
                field: "f".into(),
                prefix: "a".into(),
                limit: 3
            }
            .to_string(),
            "prefix 'a' on field 'f' expands to more than 3 terms"
        );
    }
}
