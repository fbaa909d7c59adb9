//! # extfmt
//!
//! A template engine whose `{...}` fields are small programs.
//!
//! ```text
//! {greeting!u}, the sum is {
//!     total = 0
//!     for i in range(101):
//!         total += i
//!     total
//! } and 5! = {format('{n}', n=120)}
//! ```
//!
//! A field runs zero or more statements and evaluates its last line as an
//! expression; the value is stringified and spliced into the output. Field code
//! can call `format(...)` to format another template with the bindings it
//! currently sees, to any depth.
//!
//! String literals in field code collapse `{{` and `}}` to single braces
//! (see `collapse_string_braces`), so `{'{{'}` renders `{`. That collapse also
//! applies to a template string handed to `format`, which then applies its own
//! escaping: a nested template needs `{{{{x}}}}` to print a literal `{x}`, and
//! `{format('{{x}}')}` formats the field `{x}`.
//!
//! ## Pipeline
//!
//! - [`scanner`] finds where a field ends, lexing its code so braces inside
//!   strings and comments do not count
//! - [`parser`] compiles the field code ([`lexer`] tokens, chumsky grammar)
//! - [`interpreter`] evaluates it against the formatter's [`environment`]
//! - [`conversion`] applies `!flags` such as `!u` or `!c`
//! - [`formatter`] drives the whole thing and owns the session state
//!
//! ## Usage
//!
//! ```text
//! let mut formatter = extfmt::Formatter::new();
//! let text = formatter.format("{name.title()}!", [("name", "ada")])?;
//! assert_eq!(text, "Ada!");
//! ```

pub mod config;
pub mod conversion;
pub mod environment;
pub mod error;
pub mod formatter;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod scanner;

pub use config::{ExtfmtConfig, Loader};
pub use environment::{Environment, Snapshot};
pub use error::{FormatError, Position};
pub use formatter::{format, Formatter, Template, Vars};
pub use interpreter::Value;
