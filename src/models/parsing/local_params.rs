// Parsing the {!type key=value ...} prefix of a query text
use chumsky::prelude::*;

use crate::models::error::ParseError;

use super::{Extra, syntax_error};

/// The parameters in front of a query text, and the text after them.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalParams<'src> {
    kind: Option<String>,
    params: Vec<(String, String)>,
    rest: &'src str,
}

impl<'src> LocalParams<'src> {
    /// Parses a text starting with `{!`.
    pub fn parse(text: &'src str) -> Result<Self, ParseError> {
        local_params_parser()
            .parse(text)
            .into_result()
            .map_err(syntax_error)
    }

    /// The query parser to use. Explicit `type=` wins over the leading name.
    pub fn kind(&self) -> &str {
        self.get("type")
            .or(self.kind.as_deref())
            .unwrap_or("lucene")
    }

    /// The last value given for the key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The query text after the closing brace.
    pub fn rest(&self) -> &'src str {
        self.rest
    }

    /// The query text these parameters apply to:
    /// the `v` parameter if given, or else the rest.
    pub fn query_text(&self) -> &str {
        self.get("v").unwrap_or(self.rest)
    }
}

static NON_BARE: [char; 6] = [' ', '\t', '\n', '}', '\'', '"'];

fn quoted_parser<'src>(quote: char) -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    let quoted_char = just('\\').ignore_then(any()).or(none_of(quote));
    just(quote)
        .ignore_then(quoted_char.repeated().collect::<String>())
        .then_ignore(just(quote).labelled("closing quote"))
}

fn param_value_parser<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    let bare = none_of(NON_BARE)
        .repeated()
        .at_least(1)
        .collect::<String>();
    choice((quoted_parser('\''), quoted_parser('"'), bare))
}

fn param_key_parser<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    none_of([' ', '\t', '\n', '}', '='])
        .repeated()
        .at_least(1)
        .collect::<String>()
}

fn local_params_parser<'src>() -> impl Parser<'src, &'src str, LocalParams<'src>, Extra<'src>> {
    let pair = param_key_parser()
        .then_ignore(just('='))
        .then(param_value_parser())
        .padded();

    let kind = param_key_parser().then_ignore(none_of('=').rewind()).padded();

    just("{!")
        .ignore_then(kind.or_not())
        .then(pair.repeated().collect::<Vec<_>>())
        .then_ignore(just('}').labelled("closing brace"))
        .then(any().repeated().to_slice())
        .map(|((kind, params), rest)| LocalParams { kind, params, rest })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_params() {
        let lp = LocalParams::parse("{!join from=pid to=external_id}pid:1").unwrap();
        assert_eq!(lp.kind(), "join");
        assert_eq!(lp.get("from"), Some("pid"));
        assert_eq!(lp.get("to"), Some("external_id"));
        assert_eq!(lp.get("v"), None);
        assert_eq!(lp.rest(), "pid:1");
        assert_eq!(lp.query_text(), "pid:1");
    }

    #[test]
    fn test_quoted_values() {
        let lp = LocalParams::parse("{!join from='pid' to=\"ext id\" v='name:\"a b\"'}").unwrap();
        assert_eq!(lp.get("from"), Some("pid"));
        assert_eq!(lp.get("to"), Some("ext id"));
        assert_eq!(lp.query_text(), "name:\"a b\"");
        assert_eq!(lp.rest(), "");

        let lp = LocalParams::parse("{!lucene v='it\\'s'}").unwrap();
        assert_eq!(lp.get("v"), Some("it's"));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(LocalParams::parse("{!}x:y").unwrap().kind(), "lucene");
        assert_eq!(LocalParams::parse("{!type=join from=a}").unwrap().kind(), "join");
        assert_eq!(LocalParams::parse("{! lucene }x:y").unwrap().kind(), "lucene");
        let lp = LocalParams::parse("{!join from=a from=b}").unwrap();
        assert_eq!(lp.get("from"), Some("b"));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            LocalParams::parse("{!join from=a"),
            Err(ParseError::Syntax(_))
        ));
        assert!(matches!(
            LocalParams::parse("{!join from='a}x:y"),
            Err(ParseError::Syntax(_))
        ));
        assert!(LocalParams::parse("join}").is_err());
    }
}
