//! Parser combinator helpers shared by the expression and statement parsers.

use chumsky::prelude::*;
use std::ops::Range;

use crate::lexer::{Token, TokenSpan};
use crate::parser::ast::{Expr, Literal};
use crate::parser::literals::{decode_string, parse_float, parse_int, LiteralOptions};

/// Type alias for parser error
pub(crate) type ParserError = Simple<TokenSpan>;

/// Helper: error for a token that no alternative accepts
pub(crate) fn unexpected(span: Range<usize>, found: TokenSpan) -> ParserError {
    Simple::expected_input_found(span, std::iter::empty::<Option<TokenSpan>>(), Some(found))
}

/// Helper: match a specific token type, ignoring the span
pub(crate) fn token(t: Token) -> impl Parser<TokenSpan, (), Error = ParserError> + Clone {
    filter(move |(tok, _): &TokenSpan| tok == &t).ignored()
}

/// Helper: match an identifier and return its text
pub(crate) fn name() -> impl Parser<TokenSpan, String, Error = ParserError> + Clone {
    filter_map(|span, item: TokenSpan| match item {
        (Token::Name(name), _) => Ok(name),
        other => Err(unexpected(span, other)),
    })
}

/// Number and keyword literals
pub(crate) fn literal() -> impl Parser<TokenSpan, Expr, Error = ParserError> + Clone {
    filter_map(|span: Range<usize>, item: TokenSpan| {
        let literal = match &item.0 {
            Token::Int(text) => {
                Literal::Int(parse_int(text).map_err(|m| Simple::custom(span.clone(), m))?)
            }
            Token::Float(text) => {
                Literal::Float(parse_float(text).map_err(|m| Simple::custom(span.clone(), m))?)
            }
            Token::True => Literal::Bool(true),
            Token::False => Literal::Bool(false),
            Token::None => Literal::None,
            _ => return Err(unexpected(span, item)),
        };
        Ok(Expr::Literal(literal))
    })
}

/// One or more adjacent string literals, concatenated
pub(crate) fn strings(
    options: LiteralOptions,
) -> impl Parser<TokenSpan, Expr, Error = ParserError> + Clone {
    let single = filter_map(move |span, item: TokenSpan| match &item.0 {
        Token::Str(raw) => decode_string(raw, options).map_err(|m| Simple::custom(span, m)),
        _ => Err(unexpected(span, item)),
    });

    single
        .repeated()
        .at_least(1)
        .map(|parts: Vec<String>| Expr::Literal(Literal::Str(parts.concat())))
}
