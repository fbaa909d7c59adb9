//! Lexer module for field code
//!
//! This module contains the tokenization logic for the language spoken inside
//! `{...}` fields, including token definitions and the logical-line pass.
//!
//! Three consumers share the token set:
//! - the field scanner runs the raw logos lexer over template text to find where
//!   a field ends, so string literals and comments hide their braces;
//! - field normalisation asks for [`multiline_string_spans`] so dedenting
//!   never touches the inside of a triple-quoted string;
//! - the parser runs [`lex`], which adds the logical-line pass on top.
//!
//! Indentation Handling
//!
//!     Statement blocks are delimited by indentation, as in Python. The logos pass
//!     only skips horizontal whitespace; the indentation pass measures each line's
//!     leading whitespace from the source text and emits semantic `Indent` and
//!     `Dedent` tokens, which map nicely to brace tokens for standard parser
//!     combinators.

pub mod indentation;
pub mod tokens;

use std::fmt;
use std::ops::Range;

use logos::Logos;

pub use indentation::{logical_lines, IndentationError};
pub use tokens::Token;

/// Token paired with its byte range in the lexed source
pub type TokenSpan = (Token, Range<usize>);

/// Errors raised while lexing field code for the parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// Input no token matches (stray characters, unterminated strings).
    UnrecognizedInput { span: Range<usize>, text: String },
    /// A dedent to a width no enclosing block uses.
    InconsistentDedent { line: usize },
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnrecognizedInput { span, text } => {
                write!(f, "unrecognized input `{}` at offset {}", text, span.start)
            }
            LexError::InconsistentDedent { line } => write!(
                f,
                "inconsistent dedent on line {}: unindent does not match any outer indentation level",
                line + 1
            ),
        }
    }
}

impl std::error::Error for LexError {}

impl From<IndentationError> for LexError {
    fn from(err: IndentationError) -> Self {
        LexError::InconsistentDedent { line: err.line }
    }
}

/// Byte ranges of the string literals that span more than one line.
/// Input that fails to lex is skipped.
pub fn multiline_string_spans(source: &str) -> Vec<Range<usize>> {
    Token::lexer(source)
        .spanned()
        .filter_map(|(result, span)| match result {
            Ok(Token::Str(text)) if text.contains('\n') => Some(span),
            _ => None,
        })
        .collect()
}

/// Tokenize a string keeping spans; the first unrecognized input is an error
pub fn tokenize_with_spans(source: &str) -> Result<Vec<TokenSpan>, LexError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                return Err(LexError::UnrecognizedInput {
                    span: lexer.span(),
                    text: lexer.slice().to_string(),
                })
            }
        }
    }

    Ok(tokens)
}

/// Main lexer function: tokens with spans, arranged into logical lines
pub fn lex(source: &str) -> Result<Vec<TokenSpan>, LexError> {
    let raw = tokenize_with_spans(source)?;
    Ok(logical_lines(source, raw)?)
}
