//! Error types for formatting operations
//!
//! Every failure of a formatting call surfaces as a [`FormatError`]. None of them
//! are recovered internally: the call that hit the error returns no partial output.

use std::fmt;

/// A line/column position inside a template, both zero-based.
///
/// Columns count characters (code points), not bytes, so positions stay correct
/// next to multi-byte and astral characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Locate a byte offset inside `text`.
    ///
    /// Offsets past the end (or inside a character) are clamped to the nearest
    /// preceding character boundary.
    pub fn locate(text: &str, byte_offset: usize) -> Self {
        let mut end = byte_offset.min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let before = &text[..end];
        let line = before.matches('\n').count();
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count();
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line + 1, self.column + 1)
    }
}

/// Errors that can occur while formatting a template
#[derive(Debug, Clone, PartialEq)]
pub enum FormatError {
    /// An opening brace whose field never closes before the template ends.
    UnterminatedField { offset: usize, position: Position },
    /// A bare `}` in literal text.
    UnmatchedClosingBrace { offset: usize, position: Position },
    /// Field code that is not "statements followed by one expression".
    FieldSyntax { code: String, message: String },
    /// A name used by field code is bound neither in the environment nor in the
    /// function table.
    UnboundName {
        name: String,
        bound: Vec<String>,
        code: String,
    },
    /// Runtime failure while evaluating field code (bad types, bad values,
    /// arithmetic errors).
    Evaluation { message: String },
    /// Formatting calls nested deeper than the configured limit.
    RecursionLimit { depth: usize },
}

impl FormatError {
    pub fn unterminated_field(template: &str, offset: usize) -> Self {
        FormatError::UnterminatedField {
            offset,
            position: Position::locate(template, offset),
        }
    }

    pub fn unmatched_closing_brace(template: &str, offset: usize) -> Self {
        FormatError::UnmatchedClosingBrace {
            offset,
            position: Position::locate(template, offset),
        }
    }

    pub fn field_syntax(code: impl Into<String>, message: impl Into<String>) -> Self {
        FormatError::FieldSyntax {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        FormatError::Evaluation {
            message: message.into(),
        }
    }

    /// Move a scanner error reported relative to a field start onto the
    /// template that contains the field.
    pub(crate) fn relocate(self, template: &str, base: usize) -> Self {
        match self {
            FormatError::UnterminatedField { offset, .. } => {
                FormatError::unterminated_field(template, base + offset)
            }
            FormatError::UnmatchedClosingBrace { offset, .. } => {
                FormatError::unmatched_closing_brace(template, base + offset)
            }
            other => other,
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::UnterminatedField { position, .. } => {
                write!(f, "Missing end brace for the field opened at {}", position)
            }
            FormatError::UnmatchedClosingBrace { position, .. } => write!(
                f,
                "Illegal unmatched closing brace at {}. Repeat the brace (`}}}}`) to insert a literal brace.",
                position
            ),
            FormatError::FieldSyntax { code, message } => {
                write!(f, "Invalid field: {}\nField code:\n{}", message, code)
            }
            FormatError::UnboundName { name, bound, code } => write!(
                f,
                "name '{}' is not defined\nEnvironment:\n[{}]\nField code:\n{}",
                name,
                bound.join(", "),
                code
            ),
            FormatError::Evaluation { message } => write!(f, "{}", message),
            FormatError::RecursionLimit { depth } => {
                write!(f, "Formatting nested deeper than {} levels", depth)
            }
        }
    }
}

impl std::error::Error for FormatError {}
