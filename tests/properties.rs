//! Property-based tests for the template driver and the field scanner

use extfmt::scanner::scan;
use extfmt::{format, FormatError};
use proptest::prelude::*;

/// Literal text, escaped braces, or a field producing known text
#[derive(Debug, Clone)]
enum Piece {
    Text(String),
    Open,
    Close,
    Field(String),
}

impl Piece {
    fn template(&self) -> String {
        match self {
            Piece::Text(text) => text.clone(),
            Piece::Open => "{{".to_string(),
            Piece::Close => "}}".to_string(),
            Piece::Field(word) => format!("{{'{}'}}", word),
        }
    }

    fn expected(&self) -> String {
        match self {
            Piece::Text(text) => text.clone(),
            Piece::Open => "{".to_string(),
            Piece::Close => "}".to_string(),
            Piece::Field(word) => word.clone(),
        }
    }
}

fn piece() -> impl Strategy<Value = Piece> {
    prop_oneof![
        "[^{}]{1,12}".prop_map(Piece::Text),
        Just(Piece::Open),
        Just(Piece::Close),
        "[a-z🔥😀é ]{0,6}".prop_map(Piece::Field),
    ]
}

proptest! {
    #[test]
    fn brace_free_text_is_unchanged(text in "[^{}]*") {
        prop_assert_eq!(format(text.as_str(), ()).unwrap(), text);
    }

    #[test]
    fn pieces_render_in_order(pieces in prop::collection::vec(piece(), 0..12)) {
        let template: String = pieces.iter().map(Piece::template).collect();
        let expected: String = pieces.iter().map(Piece::expected).collect();
        prop_assert_eq!(format(template.as_str(), ()).unwrap(), expected);
    }

    #[test]
    fn scanner_end_offset_skips_astral_prefix(prefix in "[🔥😀𝄞a]{0,10}", code in "[a-z]{1,8}") {
        let field = format!("{{{}}}{}", code, prefix);
        let scanned = scan(&field).unwrap();
        prop_assert_eq!(scanned.code, code.as_str());
        prop_assert_eq!(&field[scanned.end..], prefix.as_str());
    }

    #[test]
    fn unmatched_brace_column_counts_characters(prefix in "[🔥😀𝄞ab]{0,10}") {
        let template = format!("{}}}", prefix);
        match format(template.as_str(), ()) {
            Err(FormatError::UnmatchedClosingBrace { offset, position }) => {
                prop_assert_eq!(offset, prefix.len());
                prop_assert_eq!(position.line, 0);
                prop_assert_eq!(position.column, prefix.chars().count());
            }
            other => prop_assert!(false, "expected unmatched brace, got {:?}", other),
        }
    }
}
