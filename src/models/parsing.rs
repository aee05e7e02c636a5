// Parsing query texts
use chumsky::prelude::*;
use itertools::Itertools;

use crate::models::error::ParseError;
use crate::models::join::JoinQuery;
use crate::models::queries::Query;
use crate::models::queries::prefix::PrefixQuery;
use crate::models::queries::term::TermQuery;
use crate::models::schema::Schema;

pub mod local_params;

use local_params::LocalParams;

pub(crate) type Extra<'src> = extra::Err<Rich<'src, char>>;

pub(crate) fn syntax_error(errors: Vec<Rich<'_, char>>) -> ParseError {
    ParseError::Syntax(errors.iter().map(|e| e.to_string()).join("; "))
}

#[derive(Debug, PartialEq, Clone)]
enum Ast {
    MatchAll,
    Atom(String, FieldValue),
    Neg(Box<Ast>),
    And(Box<Ast>, Box<Ast>),
    Or(Box<Ast>, Box<Ast>),
}

#[derive(Debug, PartialEq, Clone)]
enum FieldValue {
    Term(String),
    Prefix(String),
}

fn query_parser<'src>() -> impl Parser<'src, &'src str, Ast, Extra<'src>> {
    recursive(|query| {
        let match_all = just("*:*").to(Ast::MatchAll).padded();

        let atom = identifier_parser()
            .then_ignore(just(':'))
            .then(field_value_parser())
            .map(|(f, v)| Ast::Atom(f, v))
            .padded();

        let group = query.delimited_by(just('(').padded(), just(')').padded().labelled("closing parenthesis"));

        let primary = choice((match_all, group, atom)).boxed();

        let unary = text::ascii::keyword("NOT")
            .padded()
            .repeated()
            .foldr(primary, |_op, rhs| Ast::Neg(Box::new(rhs)))
            .boxed();

        // AND binds tighter than OR.
        let product = unary
            .clone()
            .foldl(
                text::ascii::keyword("AND").padded().ignore_then(unary).repeated(),
                |lhs, rhs| Ast::And(Box::new(lhs), Box::new(rhs)),
            )
            .boxed();

        product.clone().foldl(
            text::ascii::keyword("OR").padded().ignore_then(product).repeated(),
            |lhs, rhs| Ast::Or(Box::new(lhs), Box::new(rhs)),
        )
    })
    .then_ignore(end())
}

static NON_IDENTIFIERS: [char; 10] = [' ', '\t', '\n', '"', '(', ')', ':', '*', '{', '}'];

fn identifier_parser<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    none_of(NON_IDENTIFIERS)
        .filter(|c: &char| !c.is_whitespace())
        .repeated()
        .at_least(1)
        .collect::<String>()
        .padded()
}

fn field_value_parser<'src>() -> impl Parser<'src, &'src str, FieldValue, Extra<'src>> + Clone {
    let term_char = just('\\')
        .ignore_then(any()) // After backslash, accept any character
        .or(none_of('"'));

    let phrase = just('"')
        .ignore_then(term_char.repeated().collect::<String>())
        .then_ignore(just('"').labelled("closing double quote"))
        .labelled("Quote enclosed phrase")
        .then(just('*').or_not())
        .map(|(t, wc)| {
            if wc.is_some() {
                FieldValue::Prefix(t)
            } else {
                FieldValue::Term(t)
            }
        });

    let naked_string = none_of(NON_IDENTIFIERS)
        .filter(|c: &char| !c.is_whitespace())
        .repeated()
        .at_least(1)
        .collect::<String>()
        .then(just('*').or_not())
        .map(|(t, wc)| {
            if wc.is_some() {
                FieldValue::Prefix(t)
            } else {
                FieldValue::Term(t)
            }
        });

    choice((phrase, naked_string)).padded()
}

/// Turns query texts into [`Query`] values, checked against a schema.
///
/// A text is either in the standard syntax (`field:value`, `field:"a phrase"`,
/// `field:prefix*`, `*:*`, `NOT`, `AND`, `OR` and parentheses), or starts with
/// local parameters selecting the parser: `{!lucene}` for the standard syntax,
/// `{!join from=<field> to=<field>}` for a join. The sub-query of a join is its
/// `v` parameter, or else the text after the closing brace. It is parsed
/// the same way, so joins nest.
///
/// Example:
/// ```
/// use joinery::prelude::*;
///
/// let schema = Schema::new().with_i64("pid").with_i64("external_id");
/// let q = QueryParser::new(&schema)
///     .parse("{!join from=pid to=external_id}pid:1")
///     .unwrap();
/// assert_eq!(q, "pid".has_i64(1).join("pid", "external_id"));
///
/// assert_eq!(
///     QueryParser::new(&schema).parse("{!join to=external_id}pid:1"),
///     Err(ParseError::MissingParam("from"))
/// );
/// ```
#[derive(Debug, Clone, Copy)]
pub struct QueryParser<'a> {
    schema: &'a Schema,
}

impl<'a> QueryParser<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    pub fn parse(&self, text: &str) -> Result<Query, ParseError> {
        let text = text.trim_start();
        if !text.starts_with("{!") {
            return self.parse_standard(text);
        }

        let lp = LocalParams::parse(text)?;
        match lp.kind() {
            "join" => self.parse_join(&lp),
            "lucene" => self.parse_standard(lp.query_text()),
            other => Err(ParseError::UnknownParser(other.to_string())),
        }
    }

    fn parse_join(&self, lp: &LocalParams<'_>) -> Result<Query, ParseError> {
        let from = lp.get("from").ok_or(ParseError::MissingParam("from"))?;
        let to = lp.get("to").ok_or(ParseError::MissingParam("to"))?;
        for field in [from, to] {
            if !self.schema.has_field(field) {
                return Err(ParseError::UnknownField(field.to_string()));
            }
        }
        let sub = self.parse(lp.query_text())?;
        Ok(Query::Join(JoinQuery::new(from, to, sub)))
    }

    fn parse_standard(&self, text: &str) -> Result<Query, ParseError> {
        let ast = query_parser()
            .parse(text)
            .into_result()
            .map_err(syntax_error)?;
        self.to_query(ast)
    }

    fn to_query(&self, ast: Ast) -> Result<Query, ParseError> {
        Ok(match ast {
            Ast::MatchAll => Query::MatchAll,
            Ast::Atom(field, value) => {
                let field_type = self
                    .schema
                    .field_type(&field)
                    .ok_or_else(|| ParseError::UnknownField(field.clone()))?;
                match value {
                    FieldValue::Term(v) => {
                        let term = field_type.query_term(&field, &v)?;
                        Query::Term(TermQuery::new(field, term))
                    }
                    FieldValue::Prefix(p) if field_type.supports_prefix() => {
                        Query::Prefix(PrefixQuery::new(field, p))
                    }
                    FieldValue::Prefix(p) => {
                        return Err(ParseError::InvalidValue {
                            field,
                            value: format!("{}*", p),
                            reason: "prefix queries need a text field".to_string(),
                        });
                    }
                }
            }
            Ast::Neg(q) => !self.to_query(*q)?,
            Ast::And(l, r) => self.to_query(*l)? & self.to_query(*r)?,
            Ast::Or(l, r) => self.to_query(*l)? | self.to_query(*r)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::queries::Queryable;

    fn atom(f: &str, v: FieldValue) -> Ast {
        Ast::Atom(f.to_string(), v)
    }

    fn term(v: &str) -> FieldValue {
        FieldValue::Term(v.to_string())
    }

    #[test]
    fn test_identifier_parser() {
        let p = identifier_parser();
        assert_eq!(p.parse("abcd").output(), Some(&"abcd".to_string()));
        assert_eq!(p.parse("ab.cd").output(), Some(&"ab.cd".to_string()));
        assert_eq!(p.parse("ab_cd").output(), Some(&"ab_cd".to_string()));
        assert!(p.parse("ab{cd").has_errors());
    }

    #[test]
    fn test_field_value_parser() {
        let parser = field_value_parser();

        assert_eq!(parser.parse("").output(), None);
        assert_eq!(parser.parse("abc").output(), Some(&term("abc")));
        assert_eq!(
            parser.parse("abc*").output(),
            Some(&FieldValue::Prefix("abc".to_string()))
        );
        assert_eq!(
            parser.parse("\"boudin \\\" blanc\"").output(),
            Some(&term("boudin \" blanc"))
        );
        assert!(parser.parse("\"boudin blanc").has_errors());
        assert_eq!(parser.parse("-123").output(), Some(&term("-123")));
    }

    #[test]
    fn test_query_parser() {
        let p = query_parser();
        assert_eq!(p.parse("*:*").output(), Some(&Ast::MatchAll));
        assert_eq!(p.parse(" a:b ").output(), Some(&atom("a", term("b"))));
        assert_eq!(
            p.parse("a:b OR c:d AND NOT e:f").output(),
            Some(&Ast::Or(
                Box::new(atom("a", term("b"))),
                Box::new(Ast::And(
                    Box::new(atom("c", term("d"))),
                    Box::new(Ast::Neg(Box::new(atom("e", term("f")))))
                ))
            ))
        );
        assert_eq!(
            p.parse("(a:b OR c:d) AND e:f").output(),
            Some(&Ast::And(
                Box::new(Ast::Or(
                    Box::new(atom("a", term("b"))),
                    Box::new(atom("c", term("d")))
                )),
                Box::new(atom("e", term("f")))
            ))
        );
        assert!(p.parse("(a:b").has_errors());
        assert!(p.parse("a:b c:d").has_errors());
        assert!(p.parse("a").has_errors());
        assert!(p.parse("").has_errors());
    }

    fn schema() -> Schema {
        Schema::new()
            .with_text("name")
            .with_i64("pid")
            .with_i64("external_id")
    }

    #[test]
    fn test_standard_queries() {
        let schema = schema();
        let p = QueryParser::new(&schema);
        assert_eq!(p.parse("name:ann"), Ok("name".has_value("ann")));
        assert_eq!(p.parse("pid:-12"), Ok("pid".has_i64(-12)));
        assert_eq!(p.parse("name:an*"), Ok("name".has_prefix("an")));
        assert_eq!(
            p.parse("name:ann AND NOT pid:3"),
            Ok("name".has_value("ann") & !"pid".has_i64(3))
        );
        assert_eq!(p.parse("{!lucene}*:*"), Ok(Query::MatchAll));
        assert_eq!(p.parse("{!lucene v='name:ann'}"), Ok("name".has_value("ann")));
    }

    #[test]
    fn test_join_queries() {
        let schema = schema();
        let p = QueryParser::new(&schema);
        let expected = "name".has_value("ann").join("pid", "external_id");
        assert_eq!(p.parse("{!join from=pid to=external_id}name:ann"), Ok(expected.clone()));
        assert_eq!(p.parse("{!join from=pid to=external_id v='name:ann'}"), Ok(expected.clone()));
        assert_eq!(
            p.parse("{!join from=external_id to=pid}{!join from=pid to=external_id}name:ann"),
            Ok(expected.join("external_id", "pid"))
        );
        assert_eq!(
            p.parse("{!join from=pid to=external_id}{!lucene}name:a*"),
            Ok("name".has_prefix("a").join("pid", "external_id"))
        );
    }

    #[test]
    fn test_errors() {
        let schema = schema();
        let p = QueryParser::new(&schema);
        assert_eq!(
            p.parse("{!join from=pid}name:ann"),
            Err(ParseError::MissingParam("to"))
        );
        assert_eq!(
            p.parse("{!join from=nope to=pid}name:ann"),
            Err(ParseError::UnknownField("nope".to_string()))
        );
        assert_eq!(
            p.parse("{!join from=pid to=pid}nope:ann"),
            Err(ParseError::UnknownField("nope".to_string()))
        );
        assert_eq!(
            p.parse("{!geo}x:y"),
            Err(ParseError::UnknownParser("geo".to_string()))
        );
        assert!(matches!(p.parse("pid:abc"), Err(ParseError::InvalidValue { .. })));
        assert!(matches!(p.parse("pid:1*"), Err(ParseError::InvalidValue { .. })));
        assert!(matches!(p.parse("name:"), Err(ParseError::Syntax(_))));
        assert!(matches!(
            p.parse("{!join from=pid to=external_id}"),
            Err(ParseError::Syntax(_))
        ));
    }
}
