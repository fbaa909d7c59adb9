//! Logical-line transformation for field code
//!
//! This module turns the raw token stream into the line structure the parser
//! consumes: comments and blank lines disappear, newlines inside brackets are
//! joined away, every logical line ends with a `Newline`, and changes in leading
//! whitespace become semantic `Indent` / `Dedent` tokens.

use std::ops::Range;

use crate::lexer::tokens::Token;

/// Width a tab advances to, as in Python's tokenizer.
const TAB_WIDTH: usize = 8;

/// Raised when a line dedents to a width that no enclosing block uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentationError {
    pub line: usize,
}

/// Transform raw tokens into logical lines with semantic indentation tokens
///
/// # Algorithm
///
/// 1. Track bracket depth; inside brackets newlines are ignored
/// 2. On the first code token of a line, measure its leading whitespace width
/// 3. Compare with the indentation stack:
///    - If greater: push the width and emit an `Indent`
///    - If less: pop and emit a `Dedent` per closed level; the width must match
///      a level still on the stack
///    - If equal: no indentation tokens needed
/// 4. End every non-empty line with a `Newline`
/// 5. Close all remaining levels with `Dedent` tokens at the end
///
/// Synthetic tokens get empty spans at the position they were introduced.
pub fn logical_lines(
    source: &str,
    tokens: Vec<(Token, Range<usize>)>,
) -> Result<Vec<(Token, Range<usize>)>, IndentationError> {
    let mut result = Vec::with_capacity(tokens.len() + 4);
    let mut levels: Vec<usize> = vec![0];
    let mut bracket_depth = 0usize;
    let mut line_has_code = false;

    for (token, span) in tokens {
        match token {
            Token::Comment => continue,
            Token::Newline => {
                if bracket_depth == 0 && line_has_code {
                    result.push((Token::Newline, span));
                    line_has_code = false;
                }
                continue;
            }
            _ => {}
        }

        if !line_has_code && bracket_depth == 0 {
            let width = indentation_width(source, span.start);
            let marker = span.start..span.start;
            let current = levels.last().copied().unwrap_or(0);
            if width > current {
                levels.push(width);
                result.push((Token::Indent, marker));
            } else if width < current {
                while levels.last().is_some_and(|&level| level > width) {
                    levels.pop();
                    result.push((Token::Dedent, marker.clone()));
                }
                if levels.last().copied().unwrap_or(0) != width {
                    return Err(IndentationError {
                        line: source[..span.start].matches('\n').count(),
                    });
                }
            }
        }
        line_has_code = true;

        if token.is_opening_bracket() {
            bracket_depth += 1;
        } else if token.is_closing_bracket() {
            bracket_depth = bracket_depth.saturating_sub(1);
        }
        result.push((token, span));
    }

    let end = source.len()..source.len();
    if line_has_code {
        result.push((Token::Newline, end.clone()));
    }
    for _ in 1..levels.len() {
        result.push((Token::Dedent, end.clone()));
    }
    Ok(result)
}

/// Width of the whitespace between the start of the line and `offset`
fn indentation_width(source: &str, offset: usize) -> usize {
    let line_start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    source[line_start..offset].chars().fold(0, |width, c| match c {
        '\t' => (width / TAB_WIDTH + 1) * TAB_WIDTH,
        _ => width + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize_with_spans;

    fn lines(source: &str) -> Vec<Token> {
        let raw = tokenize_with_spans(source).expect("source should lex");
        logical_lines(source, raw)
            .expect("indentation should be consistent")
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    fn name(n: &str) -> Token {
        Token::Name(n.to_string())
    }

    #[test]
    fn test_single_line_gets_newline() {
        assert_eq!(lines("x"), vec![name("x"), Token::Newline]);
    }

    #[test]
    fn test_blank_and_comment_lines_vanish() {
        assert_eq!(
            lines("# header\n\nx\n   # trailing\n"),
            vec![name("x"), Token::Newline]
        );
    }

    #[test]
    fn test_indent_and_dedent() {
        assert_eq!(
            lines("for x in y:\n    pass\nx"),
            vec![
                Token::For,
                name("x"),
                Token::In,
                name("y"),
                Token::Colon,
                Token::Newline,
                Token::Indent,
                Token::Pass,
                Token::Newline,
                Token::Dedent,
                name("x"),
                Token::Newline,
            ]
        );
    }

    #[test]
    fn test_dedents_close_at_end() {
        let tokens = lines("if a:\n  if b:\n    pass");
        let dedents = tokens.iter().filter(|t| **t == Token::Dedent).count();
        assert_eq!(dedents, 2);
        assert_eq!(tokens.last(), Some(&Token::Dedent));
    }

    #[test]
    fn test_newlines_inside_brackets_are_joined() {
        assert_eq!(
            lines("f(1,\n      2)"),
            vec![
                name("f"),
                Token::LParen,
                Token::Int("1".to_string()),
                Token::Comma,
                Token::Int("2".to_string()),
                Token::RParen,
                Token::Newline,
            ]
        );
    }

    #[test]
    fn test_inconsistent_dedent_is_an_error() {
        let source = "if a:\n    pass\n  x";
        let raw = tokenize_with_spans(source).unwrap();
        assert_eq!(
            logical_lines(source, raw),
            Err(IndentationError { line: 2 })
        );
    }

    #[test]
    fn test_tab_width() {
        assert_eq!(indentation_width("\tx", 1), 8);
        assert_eq!(indentation_width("  \tx", 3), 8);
        assert_eq!(indentation_width("a\n    x", 6), 4);
    }
}
