//! Template driver and the formatter session object
//!
//! The driver walks a template copying literal text, turning `{{` / `}}` into
//! single braces, and expanding every other `{` into a field:
//!
//! 1. the scanner finds the field's closing brace,
//! 2. the field code is normalised (leading blank lines dropped, common
//!    indentation removed, trimmed) and its `!flags` suffix split off,
//! 3. the code is compiled (or fetched from the cache) and evaluated against
//!    the formatter's environment,
//! 4. the value is stringified, converted, and appended to the output.
//!
//! A bare `}` in literal text is an error. Field code can call back into the
//! formatter through the self-reference binding; every call saves and restores
//! the environment, on the error path too.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::config::{ExtfmtConfig, FormatterConfig};
use crate::conversion::{split_conversion, ConversionTable};
use crate::environment::{Environment, Snapshot};
use crate::error::FormatError;
use crate::interpreter::{Evaluator, FunctionTable, Host, Value};
use crate::lexer;
use crate::parser::{parse_field, LiteralOptions, Program};
use crate::scanner;

/// Template text: a string, or lines joined with `\n`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template(String);

impl Template {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for Template {
    fn from(text: &str) -> Self {
        Template(text.to_string())
    }
}

impl From<String> for Template {
    fn from(text: String) -> Self {
        Template(text)
    }
}

impl From<&String> for Template {
    fn from(text: &String) -> Self {
        Template(text.clone())
    }
}

impl From<Vec<String>> for Template {
    fn from(lines: Vec<String>) -> Self {
        Template(lines.join("\n"))
    }
}

impl From<Vec<&str>> for Template {
    fn from(lines: Vec<&str>) -> Self {
        Template(lines.join("\n"))
    }
}

impl From<&[&str]> for Template {
    fn from(lines: &[&str]) -> Self {
        Template(lines.join("\n"))
    }
}

impl<const N: usize> From<[&str; N]> for Template {
    fn from(lines: [&str; N]) -> Self {
        Template(lines.join("\n"))
    }
}

/// Variables bound for the duration of one formatting call
#[derive(Debug, Clone, Default)]
pub struct Vars(BTreeMap<String, Value>);

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for Vars {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Vars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Vars(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Vars {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<BTreeMap<String, Value>> for Vars {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Vars(map)
    }
}

impl From<HashMap<String, Value>> for Vars {
    fn from(map: HashMap<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl From<()> for Vars {
    fn from(_: ()) -> Self {
        Vars::new()
    }
}

/// Remove leading blank lines and the indentation shared by all code lines,
/// then trim. Lines that begin inside a multi-line string literal are string
/// content: they are kept verbatim and do not count towards the margin.
pub fn normalize_field(code: &str) -> String {
    let strings = lexer::multiline_string_spans(code);
    let mut offset = 0;
    let lines: Vec<(&str, bool)> = code
        .split('\n')
        .map(|line| {
            let start = offset;
            offset += line.len() + 1;
            let quoted = strings
                .iter()
                .any(|span| span.start < start && start < span.end);
            (line, quoted)
        })
        .skip_while(|(line, quoted)| !quoted && line.trim().is_empty())
        .collect();
    let margin = lines
        .iter()
        .filter(|(line, quoted)| !quoted && !line.trim().is_empty())
        .map(|(line, _)| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|&(line, quoted)| {
            if quoted {
                line
            } else if line.trim().is_empty() {
                ""
            } else {
                &line[margin..]
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Owns one environment, one function table, one conversion table and the
/// compiled-field cache.
///
/// A formatter is single-threaded: its values share containers through `Rc`.
pub struct Formatter {
    env: Environment,
    functions: FunctionTable,
    conversions: ConversionTable,
    cache: HashMap<String, Rc<Program>>,
    config: FormatterConfig,
    depth: usize,
}

impl Formatter {
    pub fn new() -> Self {
        Self::with_config(ExtfmtConfig::default())
    }

    pub fn with_config(config: ExtfmtConfig) -> Self {
        Self {
            env: Environment::new(config.formatter.self_name.clone()),
            functions: FunctionTable::with_builtins(),
            conversions: ConversionTable::new(&config.conversions),
            cache: HashMap::new(),
            config: config.formatter,
            depth: 0,
        }
    }

    /// Format `template`, with `vars` bound on top of the current environment
    /// for this call only.
    ///
    /// Inside field code, a string literal passed to `format` has already had
    /// its `{{`/`}}` collapsed, so a literal brace in a nested template is
    /// written `{{{{` or `}}}}`.
    pub fn format(
        &mut self,
        template: impl Into<Template>,
        vars: impl Into<Vars>,
    ) -> Result<String, FormatError> {
        if self.depth >= self.config.max_depth {
            return Err(FormatError::RecursionLimit {
                depth: self.config.max_depth,
            });
        }
        let template = template.into();

        let snapshot = self.env.save();
        self.env.extend(vars.into());
        self.depth += 1;
        let result = self.render(template.as_str());
        self.depth -= 1;
        self.env.restore(snapshot);

        result
    }

    /// The driver loop
    fn render(&mut self, template: &str) -> Result<String, FormatError> {
        let mut out = String::with_capacity(template.len());
        let mut cursor = 0;

        while cursor < template.len() {
            let rest = &template[cursor..];
            if rest.starts_with("{{") {
                out.push('{');
                cursor += 2;
            } else if rest.starts_with('{') {
                let field = scanner::scan(rest).map_err(|err| err.relocate(template, cursor))?;
                out.push_str(&self.expand_field(field.code)?);
                cursor += field.end;
            } else if rest.starts_with("}}") {
                out.push('}');
                cursor += 2;
            } else if rest.starts_with('}') {
                return Err(FormatError::unmatched_closing_brace(template, cursor));
            } else {
                let literal = rest.find(['{', '}']).unwrap_or(rest.len());
                out.push_str(&rest[..literal]);
                cursor += literal;
            }
        }

        Ok(out)
    }

    fn expand_field(&mut self, code: &str) -> Result<String, FormatError> {
        let normalized = normalize_field(code);
        let (source, flags) = split_conversion(&normalized);
        let program = self.compile(source)?;

        log::trace!("evaluating field {:?} at depth {}", source, self.depth);
        let value = Evaluator::new(self, source).run(&program)?;

        let text = value.to_string();
        Ok(match flags {
            Some(flags) => self.conversions.apply(text, flags),
            None => text,
        })
    }

    fn compile(&mut self, source: &str) -> Result<Rc<Program>, FormatError> {
        if let Some(program) = self.cache.get(source) {
            return Ok(Rc::clone(program));
        }
        let options = LiteralOptions {
            collapse_braces: self.config.collapse_string_braces,
        };
        let program = Rc::new(parse_field(source, options)?);
        if self.config.cache_fields {
            log::debug!("caching compiled field {:?}", source);
            self.cache.insert(source.to_string(), Rc::clone(&program));
        }
        Ok(program)
    }

    /// Capture the current bindings
    pub fn save_env(&self) -> Snapshot {
        self.env.save()
    }

    /// Go back to previously saved bindings
    pub fn restore_env(&mut self, snapshot: Snapshot) {
        self.env.restore(snapshot);
    }

    /// Bind variables until the environment is restored or reset
    pub fn extend_env(&mut self, vars: impl Into<Vars>) {
        self.env.extend(vars.into());
    }

    /// Bind a single variable until the environment is restored or reset
    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.env.set(name, value);
    }

    /// Clear every binding except the self-reference
    pub fn reset_env(&mut self) {
        self.env.reset();
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Drop all compiled fields
    pub fn invalidate_cache(&mut self) {
        log::debug!("invalidating {} cached fields", self.cache.len());
        self.cache.clear();
    }

    pub fn cached_fields(&self) -> usize {
        self.cache.len()
    }

    /// Make a native function callable from field code. Registered functions
    /// survive [`reset_env`](Self::reset_env); environment bindings shadow them.
    pub fn register_function(
        &mut self,
        name: &str,
        body: impl Fn(&[Value]) -> Result<Value, FormatError> + 'static,
    ) {
        self.functions.register(name, body);
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    pub fn conversions(&self) -> &ConversionTable {
        &self.conversions
    }

    pub fn conversions_mut(&mut self) -> &mut ConversionTable {
        &mut self.conversions
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for Formatter {
    fn environment(&self) -> &Environment {
        &self.env
    }

    fn environment_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    fn format_nested(
        &mut self,
        template: String,
        vars: Vec<(String, Value)>,
    ) -> Result<String, FormatError> {
        self.format(template, vars.into_iter().collect::<Vars>())
    }
}

/// Format with a fresh [`Formatter`]
pub fn format(
    template: impl Into<Template>,
    vars: impl Into<Vars>,
) -> Result<String, FormatError> {
    Formatter::new().format(template, vars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_field() {
        assert_eq!(normalize_field("  foo  "), "foo");
        assert_eq!(
            normalize_field("\n\n    x = 1\n\n    if x:\n        x += 1\n    x\n"),
            "x = 1\n\nif x:\n    x += 1\nx"
        );
        assert_eq!(normalize_field("\n   \n"), "");
    }

    #[test]
    fn test_normalize_field_keeps_string_lines() {
        assert_eq!(
            normalize_field("\n    s = '''a\n  b'''\n    s\n"),
            "s = '''a\n  b'''\ns"
        );
        assert_eq!(
            normalize_field("\n  t = \"\"\"x\n\n      y\"\"\"\n  t"),
            "t = \"\"\"x\n\n      y\"\"\"\nt"
        );
    }

    #[test]
    fn test_literal_text_and_escapes() {
        let mut f = Formatter::new();
        assert_eq!(f.format("plain", ()).unwrap(), "plain");
        assert_eq!(f.format("{{ }}", ()).unwrap(), "{ }");
        assert_eq!(f.format("", ()).unwrap(), "");
    }

    #[test]
    fn test_field_and_vars() {
        let mut f = Formatter::new();
        assert_eq!(f.format("{foo}def", [("foo", "abc")]).unwrap(), "abcdef");
    }

    #[test]
    fn test_vars_do_not_outlive_the_call() {
        let mut f = Formatter::new();
        f.format("{x}", [("x", 1)]).unwrap();
        assert!(!f.environment().contains("x"));
        f.format("{\ny = 2\ny\n}", ()).unwrap();
        assert!(!f.environment().contains("y"));
    }

    #[test]
    fn test_environment_restored_after_error() {
        let mut f = Formatter::new();
        f.set_var("keep", 1);
        let err = f.format("{\nkeep = 5\nmissing\n}", [("temp", 2)]).unwrap_err();
        assert!(matches!(err, FormatError::UnboundName { .. }));
        assert_eq!(f.environment().get("keep"), Some(&Value::Int(1)));
        assert!(!f.environment().contains("temp"));
    }

    #[test]
    fn test_unmatched_closing_brace_position() {
        let err = Formatter::new().format("ab\ncd}", ()).unwrap_err();
        assert_eq!(
            err,
            FormatError::unmatched_closing_brace("ab\ncd}", 5)
        );
    }

    #[test]
    fn test_unterminated_field_is_relocated() {
        let err = Formatter::new().format("ok {oops", ()).unwrap_err();
        match err {
            FormatError::UnterminatedField { offset, position } => {
                assert_eq!(offset, 3);
                assert_eq!(position.column, 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cache() {
        let mut f = Formatter::new();
        f.format("{1 + 1}{1 + 1}{2}", ()).unwrap();
        assert_eq!(f.cached_fields(), 2);
        f.invalidate_cache();
        assert_eq!(f.cached_fields(), 0);

        let mut config = ExtfmtConfig::default();
        config.formatter.cache_fields = false;
        let mut uncached = Formatter::with_config(config);
        uncached.format("{1}", ()).unwrap();
        assert_eq!(uncached.cached_fields(), 0);
    }

    #[test]
    fn test_recursion_limit() {
        let mut config = ExtfmtConfig::default();
        config.formatter.max_depth = 3;
        let mut f = Formatter::with_config(config);
        assert_eq!(f.format("{format('{format(\"{1}\")}')}", ()).unwrap(), "1");
        let err = f
            .format(r#"{format('{format("{format(\'{1}\')}")}')}"#, ())
            .unwrap_err();
        assert_eq!(err, FormatError::RecursionLimit { depth: 3 });
    }

    #[test]
    fn test_template_from_lines() {
        let mut f = Formatter::new();
        assert_eq!(f.format(["a{1}", "b"], ()).unwrap(), "a1\nb");
        assert_eq!(
            f.format(vec!["x".to_string(), "y".to_string()], ()).unwrap(),
            "x\ny"
        );
    }

    #[test]
    fn test_register_function_survives_reset() {
        let mut f = Formatter::new();
        f.register_function("twice", |args| {
            let n = args.first().and_then(Value::as_int).unwrap_or(0);
            Ok(Value::Int(n * 2))
        });
        f.reset_env();
        assert_eq!(f.format("{twice(21)}", ()).unwrap(), "42");
    }
}
