//! Parser for field code
//!
//! Field code is compiled in two modes, chosen by the code itself:
//!
//! - code without a newline is a single expression; statements (assignments,
//!   loops) are rejected even if they would fit on one line,
//! - code with a newline is a block: zero or more statements whose last one
//!   must be an expression statement, which supplies the field's value.
//!
//! Both modes run the same lexer ([`crate::lexer::lex`]) and chumsky grammar.

pub mod ast;
pub mod combinators;
pub mod expressions;
pub mod literals;
pub mod statements;

use chumsky::error::SimpleReason;
use chumsky::prelude::*;

pub use ast::{Expr, Program, Stmt};
pub use literals::LiteralOptions;

use crate::error::FormatError;
use crate::lexer::{lex, Token, TokenSpan};
use combinators::{token, ParserError};
use expressions::expression;
use statements::statements;

/// Compile field code into a [`Program`]
pub fn parse_field(code: &str, options: LiteralOptions) -> Result<Program, FormatError> {
    if code.trim().is_empty() {
        return Err(FormatError::field_syntax(code, "empty field"));
    }

    let tokens = lex(code).map_err(|err| FormatError::field_syntax(code, err.to_string()))?;

    if !code.contains('\n') {
        let expr = expression(options)
            .then_ignore(token(Token::Newline).or_not())
            .then_ignore(end())
            .parse(tokens.clone())
            .map_err(|errs| syntax_error(code, &tokens, errs))?;
        return Ok(Program::Expression(expr));
    }

    let mut body = statements(options)
        .parse(tokens.clone())
        .map_err(|errs| syntax_error(code, &tokens, errs))?;

    match body.pop() {
        Some(Stmt::Expr(result)) => Ok(Program::Block {
            statements: body,
            result,
        }),
        _ => Err(FormatError::field_syntax(
            code,
            "the last statement of a field must be an expression",
        )),
    }
}

/// Turn the first chumsky error into a readable message
fn syntax_error(code: &str, tokens: &[TokenSpan], errors: Vec<ParserError>) -> FormatError {
    let message = match errors.into_iter().next() {
        Some(error) => describe(code, tokens, &error),
        None => "invalid syntax".to_string(),
    };
    FormatError::field_syntax(code, message)
}

fn describe(code: &str, tokens: &[TokenSpan], error: &ParserError) -> String {
    if let SimpleReason::Custom(message) = error.reason() {
        return message.clone();
    }
    match error.found() {
        Some((found, span)) => {
            let position = crate::error::Position::locate(code, span.start);
            format!("unexpected {} at {}", found, position)
        }
        None => {
            let last = tokens.last().map(|(_, span)| span.end).unwrap_or(0);
            format!(
                "unexpected end of field at {}",
                crate::error::Position::locate(code, last)
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::Literal;

    fn parse(code: &str) -> Result<Program, FormatError> {
        parse_field(code, LiteralOptions::default())
    }

    #[test]
    fn test_one_line_is_expression_only() {
        assert_eq!(
            parse("foo").unwrap(),
            Program::Expression(Expr::Name("foo".to_string()))
        );
        assert!(matches!(
            parse("x = 1"),
            Err(FormatError::FieldSyntax { .. })
        ));
    }

    #[test]
    fn test_block_ends_with_expression() {
        let program = parse("x = 2\nx * 3").unwrap();
        assert_eq!(program.statements().len(), 1);
        assert!(matches!(program.result(), Expr::Binary { .. }));
    }

    #[test]
    fn test_block_must_end_with_expression() {
        let err = parse("x = 1\ny = 2").unwrap_err();
        match err {
            FormatError::FieldSyntax { message, code } => {
                assert!(message.contains("last statement"));
                assert_eq!(code, "x = 1\ny = 2");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_empty_field() {
        assert!(matches!(
            parse("   "),
            Err(FormatError::FieldSyntax { .. })
        ));
    }

    #[test]
    fn test_lex_errors_are_syntax_errors() {
        let err = parse("a ? b").unwrap_err();
        assert!(err.to_string().contains("unrecognized input `?`"));
    }

    #[test]
    fn test_unexpected_token_message() {
        let err = parse("1 +").unwrap_err();
        assert!(matches!(err, FormatError::FieldSyntax { .. }));
    }

    #[test]
    fn test_conversion_free_string_field() {
        assert_eq!(
            parse(r#""false brace ending}}""#).unwrap(),
            Program::Expression(Expr::Literal(Literal::Str(
                "false brace ending}".to_string()
            )))
        );
    }
}
