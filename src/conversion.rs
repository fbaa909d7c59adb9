//! Conversion pipeline: single-letter flags after `!` at the end of a field
//!
//! `{name!u}` evaluates `name`, stringifies it and uppercases the text. Flags
//! are applied in table order, never in the order they were written. Every
//! conversion belongs to a class; within a class only the first flag in table
//! order is applied, so `{x!ul}` and `{x!lu}` both lowercase (`l` comes first).
//! Flags the table does not know are ignored.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ConversionConfig;
use crate::interpreter::methods::{capitalize, center, ljust, rjust};

/// The last `!` followed only by ASCII letters and digits up to the end
static CONVERSION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^(.*)!([A-Za-z0-9]+)$").expect("valid conversion regex"));

/// Split trimmed field text into its code and its conversion flags, if any
pub fn split_conversion(field: &str) -> (&str, Option<&str>) {
    match CONVERSION_SUFFIX.captures(field) {
        Some(captures) => match (captures.get(1), captures.get(2)) {
            (Some(code), Some(flags)) if !code.as_str().trim().is_empty() => {
                (code.as_str().trim_end(), Some(flags.as_str()))
            }
            _ => (field, None),
        },
        None => (field, None),
    }
}

/// Conversions in the same class exclude each other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionClass {
    Alignment,
    Case,
}

/// Layout the alignment conversions pad to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub width: usize,
    pub fill: char,
}

pub type Transform = fn(&str, Layout) -> String;

#[derive(Debug, Clone)]
pub struct Conversion {
    pub flag: char,
    pub name: &'static str,
    pub class: ConversionClass,
    pub transform: Transform,
}

/// Ordered flag table
#[derive(Debug, Clone)]
pub struct ConversionTable {
    conversions: Vec<Conversion>,
    layout: Layout,
}

impl ConversionTable {
    /// The standard table: `c r f` (alignment), then `l u t` (case)
    pub fn new(config: &ConversionConfig) -> Self {
        use ConversionClass::{Alignment, Case};
        let standard: [(char, &'static str, ConversionClass, Transform); 6] = [
            ('c', "center", Alignment, |s, l| center(s, l.width, l.fill)),
            ('r', "right-justify", Alignment, |s, l| rjust(s, l.width, l.fill)),
            ('f', "fill", Alignment, |s, l| ljust(s, l.width, l.fill)),
            ('l', "lowercase", Case, |s, _| s.to_lowercase()),
            ('u', "uppercase", Case, |s, _| s.to_uppercase()),
            ('t', "title-case", Case, |s, _| capwords(s)),
        ];
        Self {
            conversions: standard
                .into_iter()
                .map(|(flag, name, class, transform)| Conversion {
                    flag,
                    name,
                    class,
                    transform,
                })
                .collect(),
            layout: Layout {
                width: config.width,
                fill: config.fill,
            },
        }
    }

    /// Add a conversion at the end of the table, replacing one with the same flag
    pub fn register(&mut self, conversion: Conversion) {
        match self
            .conversions
            .iter_mut()
            .find(|existing| existing.flag == conversion.flag)
        {
            Some(existing) => *existing = conversion,
            None => self.conversions.push(conversion),
        }
    }

    pub fn conversions(&self) -> &[Conversion] {
        &self.conversions
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn set_width(&mut self, width: usize) {
        self.layout.width = width;
    }

    /// Apply the flags in `flags` to already stringified text
    pub fn apply(&self, text: String, flags: &str) -> String {
        let mut applied: Vec<ConversionClass> = Vec::new();
        let mut text = text;
        for conversion in &self.conversions {
            if !flags.contains(conversion.flag) {
                continue;
            }
            if applied.contains(&conversion.class) {
                log::debug!(
                    "skipping conversion `{}` ({}): its class is already applied",
                    conversion.flag,
                    conversion.name
                );
                continue;
            }
            applied.push(conversion.class);
            text = (conversion.transform)(&text, self.layout);
        }
        text
    }
}

impl Default for ConversionTable {
    fn default() -> Self {
        Self::new(&ConversionConfig::default())
    }
}

/// Capitalize each whitespace-separated word and join with single spaces
pub fn capwords(s: &str) -> String {
    s.split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn table(width: usize) -> ConversionTable {
        ConversionTable::new(&ConversionConfig { width, fill: ' ' })
    }

    #[rstest]
    #[case("name!u", "name", Some("u"))]
    #[case("x != y", "x != y", None)]
    #[case("a!b!cl", "a!b", Some("cl"))]
    #[case("\"hi!\"", "\"hi!\"", None)]
    #[case("value !r", "value", Some("r"))]
    #[case("!u", "!u", None)]
    #[case("x!", "x!", None)]
    fn test_split_conversion(
        #[case] field: &str,
        #[case] code: &str,
        #[case] flags: Option<&str>,
    ) {
        assert_eq!(split_conversion(field), (code, flags));
    }

    #[rstest]
    #[case("abc", "c", "  abc   ")]
    #[case("abc", "r", "     abc")]
    #[case("abc", "f", "abc     ")]
    #[case("Mixed Case", "l", "mixed case")]
    #[case("Mixed Case", "u", "MIXED CASE")]
    #[case("hello   big world", "t", "Hello Big World")]
    #[case("abc", "ru", "     ABC")]
    #[case("abc", "ur", "     ABC")]
    fn test_apply(#[case] text: &str, #[case] flags: &str, #[case] expected: &str) {
        assert_eq!(table(8).apply(text.to_string(), flags), expected);
    }

    #[test]
    fn test_first_flag_in_table_order_wins_per_class() {
        let table = table(8);
        assert_eq!(table.apply("Ab".to_string(), "ul"), "ab");
        assert_eq!(table.apply("ab".to_string(), "rc"), "   ab   ");
    }

    #[test]
    fn test_unknown_flags_are_ignored() {
        assert_eq!(table(8).apply("ab".to_string(), "xyz9"), "ab");
    }

    #[test]
    fn test_default_width() {
        let text = ConversionTable::default().apply("x".to_string(), "r");
        assert_eq!(text.chars().count(), 80);
        assert!(text.ends_with('x'));
    }

    #[test]
    fn test_register_custom_conversion() {
        let mut table = table(8);
        table.register(Conversion {
            flag: 's',
            name: "strip",
            class: ConversionClass::Alignment,
            transform: |s, _| s.trim().to_string(),
        });
        assert_eq!(table.apply("  a  ".to_string(), "s"), "a");
        assert_eq!(table.conversions().len(), 7);
    }
}
