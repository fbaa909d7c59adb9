//! Function table: built-in functions plus natives registered by the host

use std::collections::BTreeMap;

use crate::error::FormatError;
use crate::interpreter::methods::{arity, int_arg, normalize_index, sort_values, str_arg};
use crate::interpreter::value::{Function, Value, MAX_SIZE};

/// Name-to-function table consulted after the environment
#[derive(Debug, Clone)]
pub struct FunctionTable {
    functions: BTreeMap<String, Function>,
}

impl FunctionTable {
    /// A table with no functions at all
    pub fn empty() -> Self {
        Self {
            functions: BTreeMap::new(),
        }
    }

    /// A table holding the built-in functions
    pub fn with_builtins() -> Self {
        let mut table = Self::empty();
        for (name, body) in BUILTINS {
            table.register(name, *body);
        }
        table
    }

    /// Add or replace a function
    pub fn register(
        &mut self,
        name: &str,
        body: impl Fn(&[Value]) -> Result<Value, FormatError> + 'static,
    ) {
        self.functions
            .insert(name.to_string(), Function::new(name, body));
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl Default for FunctionTable {
    fn default() -> Self {
        Self::with_builtins()
    }
}

type Builtin = fn(&[Value]) -> Result<Value, FormatError>;

const BUILTINS: &[(&str, Builtin)] = &[
    ("abs", abs),
    ("all", all),
    ("any", any),
    ("bin", bin),
    ("bool", bool_),
    ("chr", chr),
    ("enumerate", enumerate),
    ("float", float),
    ("hex", hex),
    ("int", int),
    ("len", len),
    ("list", list),
    ("max", max),
    ("min", min),
    ("oct", oct),
    ("ord", ord),
    ("range", range),
    ("repr", repr),
    ("reversed", reversed),
    ("round", round),
    ("sorted", sorted),
    ("str", str_),
    ("sum", sum),
    ("tuple", tuple),
    ("zip", zip),
];

fn value_error(message: impl Into<String>) -> FormatError {
    FormatError::evaluation(message)
}

fn len(args: &[Value]) -> Result<Value, FormatError> {
    arity("len", args, 1, 1)?;
    let n = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        Value::Dict(entries) => entries.borrow().len(),
        other => {
            return Err(value_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(Value::Int(n as i64))
}

fn str_(args: &[Value]) -> Result<Value, FormatError> {
    arity("str", args, 0, 1)?;
    Ok(Value::Str(
        args.first().map(Value::to_string).unwrap_or_default(),
    ))
}

fn repr(args: &[Value]) -> Result<Value, FormatError> {
    arity("repr", args, 1, 1)?;
    Ok(Value::Str(args[0].repr()))
}

fn bool_(args: &[Value]) -> Result<Value, FormatError> {
    arity("bool", args, 0, 1)?;
    Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
}

fn int(args: &[Value]) -> Result<Value, FormatError> {
    arity("int", args, 0, 2)?;
    let Some(value) = args.first() else {
        return Ok(Value::Int(0));
    };
    if let Some(base) = args.get(1) {
        let text = str_arg("int", value)?;
        let base = int_arg("int", base)?;
        return parse_int_text(text, base);
    }
    match value {
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(f) if f.is_finite() => {
            let truncated = f.trunc();
            if truncated.abs() >= 9.2e18 {
                Err(value_error("integer overflow"))
            } else {
                Ok(Value::Int(truncated as i64))
            }
        }
        Value::Float(f) => Err(value_error(format!(
            "cannot convert float {} to integer",
            Value::Float(*f)
        ))),
        Value::Str(text) => parse_int_text(text, 10),
        other => Err(value_error(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn parse_int_text(text: &str, base: i64) -> Result<Value, FormatError> {
    let invalid = || {
        value_error(format!(
            "invalid literal for int() with base {}: {}",
            base,
            Value::from(text).repr()
        ))
    };
    let radix = u32::try_from(base)
        .ok()
        .filter(|radix| (2..=36).contains(radix))
        .ok_or_else(|| value_error("int() base must be >= 2 and <= 36"))?;
    let cleaned: String = text.trim().chars().filter(|c| *c != '_').collect();
    i64::from_str_radix(&cleaned, radix)
        .map(Value::Int)
        .map_err(|_| invalid())
}

fn float(args: &[Value]) -> Result<Value, FormatError> {
    arity("float", args, 0, 1)?;
    match args.first() {
        None => Ok(Value::Float(0.0)),
        Some(Value::Str(text)) => {
            let trimmed = text.trim();
            match trimmed.to_ascii_lowercase().as_str() {
                "inf" | "+inf" | "infinity" => Ok(Value::Float(f64::INFINITY)),
                "-inf" | "-infinity" => Ok(Value::Float(f64::NEG_INFINITY)),
                "nan" => Ok(Value::Float(f64::NAN)),
                _ => trimmed.parse::<f64>().map(Value::Float).map_err(|_| {
                    value_error(format!(
                        "could not convert string to float: {}",
                        Value::from(text.as_str()).repr()
                    ))
                }),
            }
        }
        Some(other) => other.as_float().map(Value::Float).ok_or_else(|| {
            value_error(format!(
                "float() argument must be a string or a number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn abs(args: &[Value]) -> Result<Value, FormatError> {
    arity("abs", args, 1, 1)?;
    match &args[0] {
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => match other.as_int() {
            Some(i) => i
                .checked_abs()
                .map(Value::Int)
                .ok_or_else(|| value_error("integer overflow")),
            None => Err(value_error(format!(
                "bad operand type for abs(): '{}'",
                other.type_name()
            ))),
        },
    }
}

/// Items of `min`/`max`: one iterable argument, or the arguments themselves
fn candidates(name: &str, args: &[Value]) -> Result<Vec<Value>, FormatError> {
    let items = match args {
        [] => return Err(value_error(format!("{} expected at least 1 argument, got 0", name))),
        [single] => single.iterate()?,
        many => many.to_vec(),
    };
    if items.is_empty() {
        return Err(value_error(format!("{}() arg is an empty sequence", name)));
    }
    Ok(items)
}

fn extreme(name: &str, args: &[Value], keep: std::cmp::Ordering) -> Result<Value, FormatError> {
    let mut items = candidates(name, args)?.into_iter();
    let mut best = items.next().unwrap_or(Value::None);
    for item in items {
        if item.order(&best, if name == "min" { "<" } else { ">" })? == keep {
            best = item;
        }
    }
    Ok(best)
}

fn min(args: &[Value]) -> Result<Value, FormatError> {
    extreme("min", args, std::cmp::Ordering::Less)
}

fn max(args: &[Value]) -> Result<Value, FormatError> {
    extreme("max", args, std::cmp::Ordering::Greater)
}

fn sum(args: &[Value]) -> Result<Value, FormatError> {
    arity("sum", args, 1, 2)?;
    let start = args.get(1).cloned().unwrap_or(Value::Int(0));
    if matches!(start, Value::Str(_)) {
        return Err(value_error(
            "sum() can't sum strings [use ''.join(seq) instead]",
        ));
    }
    args[0]
        .iterate()?
        .iter()
        .try_fold(start, |total, item| {
            total.binary(crate::parser::ast::BinaryOp::Add, item)
        })
}

fn round(args: &[Value]) -> Result<Value, FormatError> {
    arity("round", args, 1, 2)?;
    let digits = match args.get(1) {
        None | Some(Value::None) => None,
        Some(value) => Some(int_arg("round", value)?),
    };
    match (&args[0], digits) {
        (Value::Float(f), None) => {
            let rounded = f.round_ties_even();
            if !rounded.is_finite() || rounded.abs() >= 9.2e18 {
                return Err(value_error(format!(
                    "cannot convert float {} to integer",
                    Value::Float(*f)
                )));
            }
            Ok(Value::Int(rounded as i64))
        }
        (Value::Float(f), Some(digits)) => {
            let scale = 10f64.powi(digits.clamp(-308, 308) as i32);
            Ok(Value::Float((f * scale).round_ties_even() / scale))
        }
        (other, _) => match other.as_int() {
            Some(i) => Ok(Value::Int(i)),
            None => Err(value_error(format!(
                "type {} doesn't define __round__ method",
                other.type_name()
            ))),
        },
    }
}

fn radix_text(name: &str, args: &[Value], prefix: &str, digits: fn(u64) -> String) -> Result<Value, FormatError> {
    arity(name, args, 1, 1)?;
    let value = int_arg(name, &args[0])?;
    let sign = if value < 0 { "-" } else { "" };
    Ok(Value::Str(format!(
        "{}{}{}",
        sign,
        prefix,
        digits(value.unsigned_abs())
    )))
}

fn hex(args: &[Value]) -> Result<Value, FormatError> {
    radix_text("hex", args, "0x", |n| format!("{:x}", n))
}

fn oct(args: &[Value]) -> Result<Value, FormatError> {
    radix_text("oct", args, "0o", |n| format!("{:o}", n))
}

fn bin(args: &[Value]) -> Result<Value, FormatError> {
    radix_text("bin", args, "0b", |n| format!("{:b}", n))
}

fn chr(args: &[Value]) -> Result<Value, FormatError> {
    arity("chr", args, 1, 1)?;
    let code = int_arg("chr", &args[0])?;
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(|c| Value::Str(c.to_string()))
        .ok_or_else(|| value_error("chr() arg not in range(0x110000)"))
}

fn ord(args: &[Value]) -> Result<Value, FormatError> {
    arity("ord", args, 1, 1)?;
    let text = str_arg("ord", &args[0])?;
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Value::Int(c as i64)),
        _ => Err(value_error(format!(
            "ord() expected a character, but string of length {} found",
            text.chars().count()
        ))),
    }
}

fn range(args: &[Value]) -> Result<Value, FormatError> {
    arity("range", args, 1, 3)?;
    let ints = args
        .iter()
        .map(|arg| int_arg("range", arg))
        .collect::<Result<Vec<_>, _>>()?;
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => (0, 0, 1),
    };
    if step == 0 {
        return Err(value_error("range() arg 3 must not be zero"));
    }
    let (start, stop, step) = (i128::from(start), i128::from(stop), i128::from(step));
    let span = if step > 0 { stop - start } else { start - stop };
    let count = if span > 0 { (span - 1) / step.abs() + 1 } else { 0 };
    if usize::try_from(count).map_or(true, |count| count > MAX_SIZE) {
        return Err(value_error("range() result too large"));
    }
    let items = (0..count)
        .map(|i| start + i * step)
        .filter_map(|n| i64::try_from(n).ok())
        .map(Value::Int)
        .collect();
    Ok(Value::list(items))
}

fn list(args: &[Value]) -> Result<Value, FormatError> {
    arity("list", args, 0, 1)?;
    match args.first() {
        Some(value) => Ok(Value::list(value.iterate()?)),
        None => Ok(Value::list(Vec::new())),
    }
}

fn tuple(args: &[Value]) -> Result<Value, FormatError> {
    arity("tuple", args, 0, 1)?;
    match args.first() {
        Some(value) => Ok(Value::tuple(value.iterate()?)),
        None => Ok(Value::tuple(Vec::new())),
    }
}

fn sorted(args: &[Value]) -> Result<Value, FormatError> {
    arity("sorted", args, 1, 1)?;
    Ok(Value::list(sort_values(args[0].iterate()?)?))
}

fn reversed(args: &[Value]) -> Result<Value, FormatError> {
    arity("reversed", args, 1, 1)?;
    let mut items = args[0].iterate()?;
    items.reverse();
    Ok(Value::list(items))
}

fn enumerate(args: &[Value]) -> Result<Value, FormatError> {
    arity("enumerate", args, 1, 2)?;
    let start = match args.get(1) {
        Some(value) => int_arg("enumerate", value)?,
        None => 0,
    };
    let items = args[0]
        .iterate()?
        .into_iter()
        .enumerate()
        .map(|(i, item)| Value::tuple(vec![Value::Int(start + i as i64), item]))
        .collect();
    Ok(Value::list(items))
}

fn zip(args: &[Value]) -> Result<Value, FormatError> {
    let columns = args
        .iter()
        .map(Value::iterate)
        .collect::<Result<Vec<_>, _>>()?;
    let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
    let items = (0..rows)
        .map(|row| Value::tuple(columns.iter().map(|column| column[row].clone()).collect()))
        .collect();
    Ok(Value::list(items))
}

fn any(args: &[Value]) -> Result<Value, FormatError> {
    arity("any", args, 1, 1)?;
    Ok(Value::Bool(args[0].iterate()?.iter().any(Value::is_truthy)))
}

fn all(args: &[Value]) -> Result<Value, FormatError> {
    arity("all", args, 1, 1)?;
    Ok(Value::Bool(args[0].iterate()?.iter().all(Value::is_truthy)))
}

/// Subscript `object[index]`
pub fn index(object: &Value, index: &Value) -> Result<Value, FormatError> {
    let position = |len: usize, what: &str| -> Result<usize, FormatError> {
        let i = index.as_int().ok_or_else(|| {
            value_error(format!(
                "{} indices must be integers, not {}",
                what,
                index.type_name()
            ))
        })?;
        normalize_index(i, len).ok_or_else(|| value_error(format!("{} index out of range", what)))
    };
    match object {
        Value::Str(s) => {
            let i = position(s.chars().count(), "string")?;
            Ok(s.chars()
                .nth(i)
                .map(|c| Value::Str(c.to_string()))
                .unwrap_or(Value::None))
        }
        Value::List(items) => {
            let items = items.borrow();
            Ok(items[position(items.len(), "list")?].clone())
        }
        Value::Tuple(items) => Ok(items[position(items.len(), "tuple")?].clone()),
        Value::Dict(entries) => {
            let key = index.as_str().ok_or_else(|| {
                value_error(format!("dict keys must be str, not {}", index.type_name()))
            })?;
            entries
                .borrow()
                .get(key)
                .cloned()
                .ok_or_else(|| value_error(format!("KeyError: {}", index.repr())))
        }
        other => Err(value_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// Slice `object[start:stop]` with Python's clamping
pub fn slice(object: &Value, start: Option<&Value>, stop: Option<&Value>) -> Result<Value, FormatError> {
    let bound = |value: Option<&Value>, default: i64, len: i64| -> Result<usize, FormatError> {
        let raw = match value {
            None | Some(Value::None) => default,
            Some(v) => v.as_int().ok_or_else(|| {
                value_error("slice indices must be integers or None")
            })?,
        };
        let adjusted = if raw < 0 { raw + len } else { raw };
        Ok(adjusted.clamp(0, len) as usize)
    };
    let range = |len: usize| -> Result<std::ops::Range<usize>, FormatError> {
        let len = len as i64;
        let from = bound(start, 0, len)?;
        let to = bound(stop, len, len)?;
        Ok(from..to.max(from))
    };
    match object {
        Value::Str(s) => {
            let range = range(s.chars().count())?;
            Ok(Value::Str(
                s.chars().skip(range.start).take(range.len()).collect(),
            ))
        }
        Value::List(items) => {
            let items = items.borrow();
            Ok(Value::list(items[range(items.len())?].to_vec()))
        }
        Value::Tuple(items) => Ok(Value::tuple(items[range(items.len())?].to_vec())),
        other => Err(value_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn call(name: &str, args: &[Value]) -> Result<Value, FormatError> {
        let table = FunctionTable::with_builtins();
        let function = table.get(name).expect("builtin exists");
        function.call(args)
    }

    #[rstest]
    #[case("len", vec![Value::from("🔥ab")], "3")]
    #[case("str", vec![Value::from(2.0)], "2.0")]
    #[case("repr", vec![Value::from("a")], "'a'")]
    #[case("int", vec![Value::from(2.9)], "2")]
    #[case("int", vec![Value::from(" 24 ")], "24")]
    #[case("int", vec![Value::from("ff"), Value::from(16)], "255")]
    #[case("float", vec![Value::from("1.5")], "1.5")]
    #[case("abs", vec![Value::from(-3)], "3")]
    #[case("min", vec![Value::from(3), Value::from(1), Value::from(2)], "1")]
    #[case("max", vec![Value::from(vec![3, 7, 2])], "7")]
    #[case("sum", vec![Value::from(vec![1, 2, 3])], "6")]
    #[case("round", vec![Value::from(2.5)], "2")]
    #[case("round", vec![Value::from(3.14159), Value::from(2)], "3.14")]
    #[case("hex", vec![Value::from(-255)], "-0xff")]
    #[case("bin", vec![Value::from(5)], "0b101")]
    #[case("chr", vec![Value::from(128293)], "🔥")]
    #[case("ord", vec![Value::from("A")], "65")]
    #[case("range", vec![Value::from(5), Value::from(0), Value::from(-2)], "[5, 3, 1]")]
    #[case("range", vec![Value::from(3), Value::from(-3)], "[]")]
    #[case("range", vec![Value::from(i64::MAX - 2), Value::from(i64::MAX), Value::from(5)], "[9223372036854775805]")]
    #[case("sorted", vec![Value::from(vec!["b", "a"])], "['a', 'b']")]
    #[case("reversed", vec![Value::from("ab")], "['b', 'a']")]
    #[case("enumerate", vec![Value::from("ab"), Value::from(1)], "[(1, 'a'), (2, 'b')]")]
    #[case("zip", vec![Value::from(vec![1, 2]), Value::from("xyz")], "[(1, 'x'), (2, 'y')]")]
    #[case("any", vec![Value::from(vec![0, 1])], "True")]
    #[case("all", vec![Value::from(Vec::<Value>::new())], "True")]
    fn test_builtins(#[case] name: &str, #[case] args: Vec<Value>, #[case] expected: &str) {
        assert_eq!(call(name, &args).unwrap().to_string(), expected);
    }

    #[rstest]
    #[case("len", vec![Value::from(1)], "object of type 'int' has no len()")]
    #[case("int", vec![Value::from("x")], "invalid literal for int() with base 10: 'x'")]
    #[case("min", vec![Value::from(Vec::<Value>::new())], "min() arg is an empty sequence")]
    #[case("range", vec![Value::from(1), Value::from(2), Value::from(0)], "range() arg 3 must not be zero")]
    #[case("range", vec![Value::from(i64::MIN), Value::from(i64::MAX)], "range() result too large")]
    #[case("sorted", vec![Value::from(vec![Value::from(1), Value::from("a")])], "'<' not supported between instances of 'str' and 'int'")]
    fn test_builtin_errors(#[case] name: &str, #[case] args: Vec<Value>, #[case] message: &str) {
        assert_eq!(call(name, &args).unwrap_err().to_string(), message);
    }

    #[test]
    fn test_registered_functions_replace_builtins() {
        let mut table = FunctionTable::with_builtins();
        table.register("len", |_| Ok(Value::from(42)));
        let len = table.get("len").expect("registered");
        assert_eq!(len.call(&[]).unwrap(), Value::from(42));
        assert!(FunctionTable::empty().get("len").is_none());
    }

    #[test]
    fn test_index_and_slice() {
        let text = Value::from("hello");
        assert_eq!(index(&text, &Value::from(-1)).unwrap(), Value::from("o"));
        assert_eq!(
            slice(&text, Some(&Value::from(1)), None).unwrap(),
            Value::from("ello")
        );
        assert_eq!(
            slice(&text, Some(&Value::from(-3)), Some(&Value::from(-1))).unwrap(),
            Value::from("ll")
        );
        let list = Value::from(vec![1, 2, 3]);
        assert_eq!(
            slice(&list, None, Some(&Value::from(2))).unwrap().to_string(),
            "[1, 2]"
        );
        assert_eq!(
            index(&list, &Value::from(3)).unwrap_err().to_string(),
            "list index out of range"
        );
    }
}
