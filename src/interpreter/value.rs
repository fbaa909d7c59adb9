//! Runtime values of the field language
//!
//! Values follow Python's data model closely enough that field code written
//! for `str.format`-style templating reads naturally: dynamic typing, `str()`
//! and `repr()` renderings, truthiness, and containers shared by reference.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::FormatError;
use crate::parser::ast::{BinaryOp, CompareOp, UnaryOp};

/// Largest string (in bytes) or container (in items) an operation may build
pub(crate) const MAX_SIZE: usize = 1 << 24;

/// Nesting depth at which ordering comparisons give up
const MAX_COMPARE_DEPTH: usize = 256;

/// Address of a shared container, used to detect reference cycles
type Identity = *const ();

/// Fail when an operation would build something larger than [`MAX_SIZE`]
pub(crate) fn ensure_size(size: Option<usize>) -> Result<usize, FormatError> {
    size.filter(|size| *size <= MAX_SIZE)
        .ok_or_else(|| FormatError::evaluation("result too large to build"))
}

/// Signature of native functions callable from field code
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, FormatError>;

/// A named native function
#[derive(Clone)]
pub struct Function {
    name: Rc<str>,
    body: Rc<NativeFn>,
}

impl Function {
    pub fn new(
        name: &str,
        body: impl Fn(&[Value]) -> Result<Value, FormatError> + 'static,
    ) -> Self {
        Self {
            name: Rc::from(name),
            body: Rc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, FormatError> {
        (self.body)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name)
    }
}

/// A dynamically typed field-language value
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<Vec<Value>>),
    Dict(Rc<RefCell<BTreeMap<String, Value>>>),
    Function(Function),
    /// The formatter itself, bound under its self-reference name
    Format,
}

/// Numeric view of a value; `bool` counts as an integer
#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

impl Value {
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Rc::new(items))
    }

    pub fn dict(entries: BTreeMap<String, Value>) -> Value {
        Value::Dict(Rc::new(RefCell::new(entries)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Function(_) | Value::Format => "builtin_function_or_method",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Dict(entries) => !entries.borrow().is_empty(),
            Value::Function(_) | Value::Format => true,
        }
    }

    fn number(&self) -> Option<Number> {
        match self {
            Value::Bool(b) => Some(Number::Int(*b as i64)),
            Value::Int(i) => Some(Number::Int(*i)),
            Value::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    /// Integer view for indices, counts and widths
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(*b as i64),
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        self.number().map(Number::as_f64)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Python `repr()`; a container met again inside itself prints as `[...]`
    /// or `{...}`
    pub fn repr(&self) -> String {
        self.repr_within(&mut Vec::new())
    }

    fn repr_within(&self, open: &mut Vec<Identity>) -> String {
        match self {
            Value::Str(s) => quote(s),
            Value::List(items) => {
                let id = Rc::as_ptr(items) as Identity;
                if open.contains(&id) {
                    return "[...]".to_string();
                }
                open.push(id);
                let text = format!("[{}]", join_repr(&items.borrow(), open));
                open.pop();
                text
            }
            Value::Tuple(items) if items.len() == 1 => {
                format!("({},)", items[0].repr_within(open))
            }
            Value::Tuple(items) => format!("({})", join_repr(items, open)),
            Value::Dict(entries) => {
                let id = Rc::as_ptr(entries) as Identity;
                if open.contains(&id) {
                    return "{...}".to_string();
                }
                open.push(id);
                let parts: Vec<String> = entries
                    .borrow()
                    .iter()
                    .map(|(key, value)| format!("{}: {}", quote(key), value.repr_within(open)))
                    .collect();
                open.pop();
                format!("{{{}}}", parts.join(", "))
            }
            other => other.to_string(),
        }
    }

    /// Items produced by iterating over the value
    pub fn iterate(&self) -> Result<Vec<Value>, FormatError> {
        match self {
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Value::List(items) => Ok(items.borrow().clone()),
            Value::Tuple(items) => Ok(items.as_ref().clone()),
            Value::Dict(entries) => Ok(entries
                .borrow()
                .keys()
                .map(|key| Value::Str(key.clone()))
                .collect()),
            other => Err(FormatError::evaluation(format!(
                "'{}' object is not iterable",
                other.type_name()
            ))),
        }
    }

    pub fn unary(&self, op: UnaryOp) -> Result<Value, FormatError> {
        match (op, self.number()) {
            (UnaryOp::Not, _) => Ok(Value::Bool(!self.is_truthy())),
            (UnaryOp::Pos, Some(Number::Int(i))) => Ok(Value::Int(i)),
            (UnaryOp::Pos, Some(Number::Float(f))) => Ok(Value::Float(f)),
            (UnaryOp::Neg, Some(Number::Int(i))) => {
                i.checked_neg().map(Value::Int).ok_or_else(overflow)
            }
            (UnaryOp::Neg, Some(Number::Float(f))) => Ok(Value::Float(-f)),
            (op, None) => Err(FormatError::evaluation(format!(
                "bad operand type for unary {}: '{}'",
                match op {
                    UnaryOp::Neg => "-",
                    _ => "+",
                },
                self.type_name()
            ))),
        }
    }

    pub fn binary(&self, op: BinaryOp, rhs: &Value) -> Result<Value, FormatError> {
        if let (Some(a), Some(b)) = (self.number(), rhs.number()) {
            return arithmetic(op, a, b);
        }
        match (op, self, rhs) {
            (BinaryOp::Add, Value::Str(a), Value::Str(b)) => {
                Ok(Value::Str(format!("{}{}", a, b)))
            }
            (BinaryOp::Add, Value::List(a), Value::List(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Ok(Value::list(items))
            }
            (BinaryOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
                Ok(Value::tuple(a.iter().chain(b.iter()).cloned().collect()))
            }
            (BinaryOp::Mul, sequence, count) | (BinaryOp::Mul, count, sequence)
                if count.as_int().is_some() && is_sequence(sequence) =>
            {
                repeat(sequence, count.as_int().unwrap_or(0))
            }
            _ => Err(FormatError::evaluation(format!(
                "unsupported operand type(s) for {}: '{}' and '{}'",
                op.symbol(),
                self.type_name(),
                rhs.type_name()
            ))),
        }
    }

    pub fn compare(&self, op: CompareOp, rhs: &Value) -> Result<bool, FormatError> {
        let ordered = |wanted: fn(Ordering) -> bool| -> Result<bool, FormatError> {
            self.order(rhs, op.symbol()).map(wanted)
        };
        match op {
            CompareOp::Eq => Ok(self == rhs),
            CompareOp::NotEq => Ok(self != rhs),
            CompareOp::Lt => ordered(Ordering::is_lt),
            CompareOp::LtEq => ordered(Ordering::is_le),
            CompareOp::Gt => ordered(Ordering::is_gt),
            CompareOp::GtEq => ordered(Ordering::is_ge),
            CompareOp::In => rhs.contains(self),
            CompareOp::NotIn => rhs.contains(self).map(|found| !found),
            CompareOp::Is => Ok(self.is(rhs)),
            CompareOp::IsNot => Ok(!self.is(rhs)),
        }
    }

    /// Ordering used by `<`, `sorted`, `min` and `max`
    pub fn order(&self, rhs: &Value, symbol: &str) -> Result<Ordering, FormatError> {
        self.order_at(rhs, symbol, 0)
    }

    fn order_at(&self, rhs: &Value, symbol: &str, depth: usize) -> Result<Ordering, FormatError> {
        if depth > MAX_COMPARE_DEPTH {
            return Err(FormatError::evaluation(
                "maximum recursion depth exceeded in comparison",
            ));
        }
        if let (Some(a), Some(b)) = (self.number(), rhs.number()) {
            return Ok(match (a, b) {
                (Number::Int(a), Number::Int(b)) => a.cmp(&b),
                (a, b) => a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Equal),
            });
        }
        match (self, rhs) {
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                order_sequences(&a.borrow(), &b.borrow(), symbol, depth)
            }
            (Value::Tuple(a), Value::Tuple(b)) => order_sequences(a, b, symbol, depth),
            _ => Err(FormatError::evaluation(format!(
                "'{}' not supported between instances of '{}' and '{}'",
                symbol,
                self.type_name(),
                rhs.type_name()
            ))),
        }
    }

    /// Membership test, `needle in self`
    pub fn contains(&self, needle: &Value) -> Result<bool, FormatError> {
        match (self, needle) {
            (Value::Str(haystack), Value::Str(needle)) => Ok(haystack.contains(needle.as_str())),
            (Value::Str(_), other) => Err(FormatError::evaluation(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
            (Value::List(items), needle) => Ok(items.borrow().iter().any(|item| item == needle)),
            (Value::Tuple(items), needle) => Ok(items.iter().any(|item| item == needle)),
            (Value::Dict(entries), Value::Str(key)) => Ok(entries.borrow().contains_key(key)),
            (Value::Dict(_), _) => Ok(false),
            (other, _) => Err(FormatError::evaluation(format!(
                "argument of type '{}' is not iterable",
                other.type_name()
            ))),
        }
    }

    /// Identity: containers compare by reference, everything else by value
    fn is(&self, rhs: &Value) -> bool {
        match (self, rhs) {
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(&a.body, &b.body),
            (Value::Bool(_), Value::Int(_)) | (Value::Int(_), Value::Bool(_)) => false,
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b) && a == b,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.equals(other, &mut Vec::new())
    }
}

impl Value {
    /// Structural equality. Container pairs already being compared further up
    /// are assumed equal, so self-referencing containers terminate.
    fn equals(&self, other: &Value, comparing: &mut Vec<(Identity, Identity)>) -> bool {
        if let (Some(a), Some(b)) = (self.number(), other.number()) {
            return match (a, b) {
                (Number::Int(a), Number::Int(b)) => a == b,
                (a, b) => a.as_f64() == b.as_f64(),
            };
        }
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Format, Value::Format) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Rc::as_ptr(a) as Identity, Rc::as_ptr(b) as Identity);
                if comparing.contains(&pair) {
                    return true;
                }
                comparing.push(pair);
                let equal = items_equal(&a.borrow(), &b.borrow(), comparing);
                comparing.pop();
                equal
            }
            (Value::Tuple(a), Value::Tuple(b)) => items_equal(a, b, comparing),
            (Value::Dict(a), Value::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Rc::as_ptr(a) as Identity, Rc::as_ptr(b) as Identity);
                if comparing.contains(&pair) {
                    return true;
                }
                comparing.push(pair);
                let (a, b) = (a.borrow(), b.borrow());
                let equal = a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| {
                        ka == kb && va.equals(vb, comparing)
                    });
                comparing.pop();
                equal
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(&a.body, &b.body),
            _ => false,
        }
    }
}

/// Python `str()`
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", float_repr(*x)),
            Value::Str(s) => write!(f, "{}", s),
            Value::Function(function) => write!(f, "<built-in function {}>", function.name()),
            Value::Format => write!(f, "<built-in function format>"),
            container => write!(f, "{}", container.repr()),
        }
    }
}

/// Shortest round-tripping float text, in Python's layout
pub fn float_repr(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = x.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let text = format!("{:e}", x);
        return match text.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => text,
        };
    }
    let text = format!("{}", x);
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}

/// Quote a string the way `repr()` does
fn quote(s: &str) -> String {
    let delimiter = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delimiter);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}

fn items_equal(a: &[Value], b: &[Value], comparing: &mut Vec<(Identity, Identity)>) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y, comparing))
}

fn join_repr(items: &[Value], open: &mut Vec<Identity>) -> String {
    items
        .iter()
        .map(|item| item.repr_within(open))
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_sequence(value: &Value) -> bool {
    matches!(value, Value::Str(_) | Value::List(_) | Value::Tuple(_))
}

fn repeat(sequence: &Value, count: i64) -> Result<Value, FormatError> {
    let count = usize::try_from(count.max(0)).map_err(|_| overflow())?;
    let len = match sequence {
        Value::Str(s) => s.len(),
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        _ => 0,
    };
    ensure_size(len.checked_mul(count))?;
    Ok(match sequence {
        Value::Str(s) => Value::Str(s.repeat(count)),
        Value::List(items) => Value::list(repeat_items(&items.borrow(), count)),
        Value::Tuple(items) => Value::tuple(repeat_items(items, count)),
        other => other.clone(),
    })
}

fn repeat_items(items: &[Value], count: usize) -> Vec<Value> {
    (0..count).flat_map(|_| items.iter().cloned()).collect()
}

fn order_sequences(
    a: &[Value],
    b: &[Value],
    symbol: &str,
    depth: usize,
) -> Result<Ordering, FormatError> {
    for (x, y) in a.iter().zip(b.iter()) {
        if x != y {
            return x.order_at(y, symbol, depth + 1);
        }
    }
    Ok(a.len().cmp(&b.len()))
}

fn overflow() -> FormatError {
    FormatError::evaluation("integer overflow")
}

fn zero_division() -> FormatError {
    FormatError::evaluation("division by zero")
}

fn arithmetic(op: BinaryOp, a: Number, b: Number) -> Result<Value, FormatError> {
    match (a, b) {
        (Number::Int(a), Number::Int(b)) => int_arithmetic(op, a, b),
        (a, b) => float_arithmetic(op, a.as_f64(), b.as_f64()),
    }
}

fn int_arithmetic(op: BinaryOp, a: i64, b: i64) -> Result<Value, FormatError> {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => return float_arithmetic(op, a as f64, b as f64),
        BinaryOp::FloorDiv | BinaryOp::Mod if b == 0 => return Err(zero_division()),
        BinaryOp::FloorDiv => a.checked_div(b).map(|q| {
            if a % b != 0 && ((a < 0) != (b < 0)) {
                q - 1
            } else {
                q
            }
        }),
        BinaryOp::Mod => a.checked_rem(b).map(|r| {
            if r != 0 && ((r < 0) != (b < 0)) {
                r + b
            } else {
                r
            }
        }),
        BinaryOp::Pow if b < 0 => return float_arithmetic(op, a as f64, b as f64),
        BinaryOp::Pow => u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp)),
    };
    result.map(Value::Int).ok_or_else(overflow)
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64) -> Result<Value, FormatError> {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod if b == 0.0 => {
            return Err(zero_division())
        }
        BinaryOp::Div => a / b,
        BinaryOp::FloorDiv => (a / b).floor(),
        BinaryOp::Mod => a - b * (a / b).floor(),
        BinaryOp::Pow if a == 0.0 && b < 0.0 => return Err(zero_division()),
        BinaryOp::Pow => a.powf(b),
    };
    Ok(Value::Float(result))
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::list(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::None)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::list(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::dict(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2.0, "2.0")]
    #[case(0.1, "0.1")]
    #[case(-1.5, "-1.5")]
    #[case(1e16, "1e+16")]
    #[case(1.5e-5, "1.5e-05")]
    #[case(123456.789, "123456.789")]
    #[case(f64::INFINITY, "inf")]
    fn test_float_repr(#[case] x: f64, #[case] expected: &str) {
        assert_eq!(float_repr(x), expected);
    }

    #[test]
    fn test_str_and_repr() {
        let list = Value::from(vec![Value::from(1), Value::from("a"), Value::None]);
        assert_eq!(list.to_string(), "[1, 'a', None]");
        assert_eq!(Value::from("don't").repr(), "\"don't\"");
        assert_eq!(Value::tuple(vec![Value::from(1)]).repr(), "(1,)");
        let mut entries = BTreeMap::new();
        entries.insert("k".to_string(), Value::from(true));
        assert_eq!(Value::dict(entries).to_string(), "{'k': True}");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from(vec![0]).is_truthy());
        assert!(!Value::from(0.0).is_truthy());
    }

    #[rstest]
    #[case(BinaryOp::FloorDiv, -7, 2, -4)]
    #[case(BinaryOp::Mod, -7, 2, 1)]
    #[case(BinaryOp::Mod, 7, -2, -1)]
    #[case(BinaryOp::Pow, 2, 10, 1024)]
    fn test_python_integer_semantics(
        #[case] op: BinaryOp,
        #[case] a: i64,
        #[case] b: i64,
        #[case] expected: i64,
    ) {
        assert_eq!(
            Value::from(a).binary(op, &Value::from(b)).unwrap(),
            Value::Int(expected)
        );
    }

    #[test]
    fn test_division_is_true_division() {
        assert_eq!(
            Value::from(6).binary(BinaryOp::Div, &Value::from(3)).unwrap(),
            Value::Float(2.0)
        );
        assert!(Value::from(1)
            .binary(BinaryOp::Div, &Value::from(0))
            .is_err());
    }

    #[test]
    fn test_overflow_is_an_error() {
        let err = Value::from(i64::MAX)
            .binary(BinaryOp::Add, &Value::from(1))
            .unwrap_err();
        assert_eq!(err.to_string(), "integer overflow");
    }

    #[test]
    fn test_sequence_operators() {
        assert_eq!(
            Value::from("ab").binary(BinaryOp::Mul, &Value::from(3)).unwrap(),
            Value::from("ababab")
        );
        assert_eq!(
            Value::from(2).binary(BinaryOp::Mul, &Value::from("x")).unwrap(),
            Value::from("xx")
        );
        let err = Value::from(1)
            .binary(BinaryOp::Add, &Value::from("x"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported operand type(s) for +: 'int' and 'str'"
        );
    }

    #[test]
    fn test_comparisons() {
        assert!(Value::from(1).compare(CompareOp::Eq, &Value::from(1.0)).unwrap());
        assert!(Value::from("a").compare(CompareOp::Lt, &Value::from("b")).unwrap());
        assert!(Value::from("ell")
            .compare(CompareOp::In, &Value::from("hello"))
            .unwrap());
        assert!(Value::from(1).compare(CompareOp::Lt, &Value::from("b")).is_err());
        assert!(Value::None.compare(CompareOp::Is, &Value::None).unwrap());
    }

    #[test]
    fn test_lists_share_by_reference() {
        let list = Value::from(vec![1]);
        let alias = list.clone();
        if let Value::List(items) = &alias {
            items.borrow_mut().push(Value::from(2));
        }
        assert_eq!(list.to_string(), "[1, 2]");
        assert!(list.compare(CompareOp::Is, &alias).unwrap());
    }

    fn self_containing(first: Value) -> Value {
        let list = Value::list(vec![first]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        list
    }

    #[test]
    fn test_self_containing_repr() {
        assert_eq!(self_containing(Value::from(1)).repr(), "[1, [...]]");
        assert_eq!(
            Value::Tuple(Rc::new(vec![self_containing(Value::None)])).repr(),
            "([None, [...]],)"
        );

        let dict = Value::dict(BTreeMap::new());
        if let Value::Dict(entries) = &dict {
            entries.borrow_mut().insert("me".to_string(), dict.clone());
        }
        assert_eq!(dict.to_string(), "{'me': {...}}");
    }

    #[test]
    fn test_self_containing_equality() {
        let a = self_containing(Value::from(1));
        let b = self_containing(Value::from(1));
        let c = self_containing(Value::from(2));
        assert_eq!(a, a.clone());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_self_containing_ordering_is_an_error() {
        let x = Value::list(vec![]);
        let y = Value::list(vec![]);
        for (list, tail) in [(&x, 1), (&y, 2)] {
            if let Value::List(items) = list {
                items.borrow_mut().push(list.clone());
                items.borrow_mut().push(Value::from(tail));
            }
        }
        let err = x.compare(CompareOp::Lt, &y).unwrap_err();
        assert_eq!(
            err.to_string(),
            "maximum recursion depth exceeded in comparison"
        );
    }

    #[rstest]
    #[case::string(Value::from("ab"))]
    #[case::list(Value::from(vec![1, 2]))]
    fn test_oversized_repeat_is_an_error(#[case] sequence: Value) {
        let err = sequence
            .binary(BinaryOp::Mul, &Value::from(1i64 << 62))
            .unwrap_err();
        assert_eq!(err.to_string(), "result too large to build");
        assert!(sequence.binary(BinaryOp::Mul, &Value::from(0)).is_ok());
    }

    #[test]
    fn test_from_json() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"n": 1, "x": 1.5, "items": ["a", null]}"#).unwrap();
        assert_eq!(
            Value::from(json).to_string(),
            "{'items': ['a', None], 'n': 1, 'x': 1.5}"
        );
    }
}
