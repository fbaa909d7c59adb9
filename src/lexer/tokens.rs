//! Token definitions for the field language
//!
//! This module defines all the tokens that can be produced by the field lexer.
//! The tokens are defined using the logos derive macro for efficient tokenization.
//! The same token set drives both the field scanner (which only cares about braces,
//! strings and comments) and the parser (which needs everything).
use logos::{Lexer, Logos};
use std::fmt;

/// All possible tokens in field code
#[derive(Logos, Debug, PartialEq, Eq, Hash, Clone)]
#[logos(skip r"[ \t\f\r]+")]
#[logos(skip r"\\\r?\n")]
pub enum Token {
    // Line structure
    #[token("\n")]
    Newline,
    #[regex(r"#[^\n]*")]
    Comment,

    // Synthetic tokens produced by the indentation pass, never by logos
    Indent,
    Dedent,

    // Keywords
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("in")]
    In,
    #[token("is")]
    Is,
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("while")]
    While,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("pass")]
    Pass,
    #[token("True")]
    True,
    #[token("False")]
    False,
    #[token("None")]
    None,

    // Names and literals keep their source text; decoding happens in the parser
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Name(String),
    #[regex(r"[0-9][0-9_]*", |lex| lex.slice().to_string())]
    #[regex(r"0[xX][0-9a-fA-F_]+", |lex| lex.slice().to_string())]
    #[regex(r"0[oO][0-7_]+", |lex| lex.slice().to_string())]
    #[regex(r"0[bB][01_]+", |lex| lex.slice().to_string())]
    Int(String),
    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+", |lex| lex.slice().to_string())]
    Float(String),
    #[regex(r#"[rR]?"([^"\\\n]|\\(.|\n))*""#, |lex| lex.slice().to_string())]
    #[regex(r#"[rR]?'([^'\\\n]|\\(.|\n))*'"#, |lex| lex.slice().to_string())]
    #[token("\"\"\"", triple_quoted)]
    #[token("'''", triple_quoted)]
    Str(String),

    // Brackets
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    // Punctuation
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,

    // Assignment
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("//=")]
    DoubleSlashAssign,
    #[token("%=")]
    PercentAssign,
    #[token("**=")]
    DoubleStarAssign,

    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("//")]
    DoubleSlash,
    #[token("%")]
    Percent,
    #[token("**")]
    DoubleStar,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
}

/// Consume the body of a triple-quoted string up to its closing delimiter.
///
/// Returns `None` (a lexing error) when the delimiter never shows up.
fn triple_quoted(lex: &mut Lexer<Token>) -> Option<String> {
    let delimiter = lex.slice().to_string();
    let quote = delimiter.as_bytes()[0];
    let rest = lex.remainder().as_bytes();
    let mut i = 0;
    while i < rest.len() {
        match rest[i] {
            b'\\' => i += 2,
            b if b == quote && rest[i..].starts_with(delimiter.as_bytes()) => {
                lex.bump(i + delimiter.len());
                return Some(lex.slice().to_string());
            }
            _ => i += 1,
        }
    }
    None
}

impl Token {
    /// Check if this token opens a bracket pair
    pub fn is_opening_bracket(&self) -> bool {
        matches!(self, Token::LParen | Token::LBracket | Token::LBrace)
    }

    /// Check if this token closes a bracket pair
    pub fn is_closing_bracket(&self) -> bool {
        matches!(self, Token::RParen | Token::RBracket | Token::RBrace)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Newline => "end of line",
            Token::Comment => "comment",
            Token::Indent => "indent",
            Token::Dedent => "dedent",
            Token::And => "and",
            Token::Or => "or",
            Token::Not => "not",
            Token::In => "in",
            Token::Is => "is",
            Token::If => "if",
            Token::Elif => "elif",
            Token::Else => "else",
            Token::For => "for",
            Token::While => "while",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::Pass => "pass",
            Token::True => "True",
            Token::False => "False",
            Token::None => "None",
            Token::Name(name) => return write!(f, "name `{}`", name),
            Token::Int(text) | Token::Float(text) => return write!(f, "number `{}`", text),
            Token::Str(text) => return write!(f, "string {}", text),
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Semicolon => ";",
            Token::Dot => ".",
            Token::Assign => "=",
            Token::PlusAssign => "+=",
            Token::MinusAssign => "-=",
            Token::StarAssign => "*=",
            Token::SlashAssign => "/=",
            Token::DoubleSlashAssign => "//=",
            Token::PercentAssign => "%=",
            Token::DoubleStarAssign => "**=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::DoubleSlash => "//",
            Token::Percent => "%",
            Token::DoubleStar => "**",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::LtEq => "<=",
            Token::Gt => ">",
            Token::GtEq => ">=",
        };
        write!(f, "`{}`", text)
    }
}
