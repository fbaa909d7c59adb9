//! Field boundary scanner
//!
//! Given template text that starts at an opening brace, finds the brace that
//! closes the field. The text is run through the field lexer, so a `{` or `}`
//! inside a string literal or a comment belonging to the field's own code does
//! not count towards nesting; only brace tokens do.
//!
//! The scan is lazy: tokens past the closing brace are never produced, so the
//! template text after a field may contain anything (unbalanced quotes,
//! characters the field language does not know).

use logos::Logos;

use crate::error::FormatError;
use crate::lexer::Token;

/// A field located at the start of some template text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    /// Source text between the opening and the closing brace
    pub code: &'a str,
    /// Byte offset just past the closing brace, relative to the scanned text
    pub end: usize,
}

/// Scan the field that opens at `text[0]`.
///
/// Scanning starts at nesting depth 1 (the opening brace is already consumed).
/// Every `{` token increments the depth, every `}` token decrements it, and the
/// field ends at the `}` that brings the depth to 0. Input the lexer rejects is
/// skipped: it cannot be a brace.
///
/// Fails with [`FormatError::UnterminatedField`] (offset 0, i.e. the opening
/// brace) when the text ends first, or when `text` does not start with `{`.
pub fn scan(text: &str) -> Result<Field<'_>, FormatError> {
    if !text.starts_with('{') {
        return Err(FormatError::unterminated_field(text, 0));
    }
    let body = &text[1..];
    let mut lexer = Token::lexer(body);
    let mut depth = 1usize;

    while let Some(result) = lexer.next() {
        match result {
            Ok(Token::LBrace) => depth += 1,
            Ok(Token::RBrace) => {
                depth -= 1;
                if depth == 0 {
                    let close = lexer.span();
                    return Ok(Field {
                        code: &body[..close.start],
                        end: 1 + close.end,
                    });
                }
            }
            _ => {}
        }
    }

    Err(FormatError::unterminated_field(text, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_field() {
        let field = scan("{foo}def").unwrap();
        assert_eq!(field.code, "foo");
        assert_eq!(field.end, 5);
    }

    #[test]
    fn test_brace_inside_string() {
        let text = r#"{"false brace ending}"}end"#;
        let field = scan(text).unwrap();
        assert_eq!(field.code, r#""false brace ending}""#);
        assert_eq!(&text[field.end..], "end");
    }

    #[test]
    fn test_nested_braces() {
        let text = r#"{ {"a": {"b": 1}}["a"] } tail"#;
        let field = scan(text).unwrap();
        assert_eq!(field.code, r#" {"a": {"b": 1}}["a"] "#);
        assert_eq!(&text[field.end..], " tail");
    }

    #[test]
    fn test_brace_inside_comment() {
        let text = "{\n# a } in a comment\nx\n}rest";
        let field = scan(text).unwrap();
        assert_eq!(field.code, "\n# a } in a comment\nx\n");
        assert_eq!(&text[field.end..], "rest");
    }

    #[test]
    fn test_multiline_field_with_blank_lines() {
        let text = "{\nsum = 0\n\nfor x in range(3):\n    sum += x\nsum}!";
        let field = scan(text).unwrap();
        assert!(field.code.ends_with("sum"));
        assert_eq!(&text[field.end..], "!");
    }

    #[test]
    fn test_text_after_field_is_never_lexed() {
        let text = "{x}don't $";
        let field = scan(text).unwrap();
        assert_eq!(field.code, "x");
        assert_eq!(field.end, 3);
    }

    #[test]
    fn test_astral_characters_keep_offsets() {
        let text = "{\" 🔥\"} fire";
        let field = scan(text).unwrap();
        assert_eq!(field.code, "\" 🔥\"");
        assert_eq!(&text[field.end..], " fire");
    }

    #[test]
    fn test_unterminated() {
        assert!(matches!(
            scan("{foo"),
            Err(FormatError::UnterminatedField { offset: 0, .. })
        ));
        assert!(matches!(
            scan("{\"}\""),
            Err(FormatError::UnterminatedField { .. })
        ));
    }

    #[test]
    fn test_requires_opening_brace() {
        assert!(scan("foo}").is_err());
        assert!(scan("").is_err());
    }
}
