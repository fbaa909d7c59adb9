//! Methods on strings, lists and dicts (`s.upper()`, `xs.append(1)`, ...)

use crate::error::FormatError;
use crate::interpreter::value::{ensure_size, Value};

/// Call method `name` on `object`
pub fn call_method(object: &Value, name: &str, args: &[Value]) -> Result<Value, FormatError> {
    match object {
        Value::Str(s) => string_method(s, name, args),
        Value::List(_) => list_method(object, name, args),
        Value::Tuple(items) => sequence_method(items, "tuple", name, args),
        Value::Dict(_) => dict_method(object, name, args),
        other => Err(no_attribute(other, name)),
    }
}

fn no_attribute(object: &Value, name: &str) -> FormatError {
    FormatError::evaluation(format!(
        "'{}' object has no attribute '{}'",
        object.type_name(),
        name
    ))
}

/// Check the argument count of a method or function
pub(crate) fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), FormatError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(FormatError::evaluation(format!(
            "{}() takes {} argument(s) ({} given)",
            name,
            expected,
            args.len()
        )));
    }
    Ok(())
}

pub(crate) fn str_arg<'v>(name: &str, value: &'v Value) -> Result<&'v str, FormatError> {
    value.as_str().ok_or_else(|| {
        FormatError::evaluation(format!(
            "{}() argument must be str, not {}",
            name,
            value.type_name()
        ))
    })
}

pub(crate) fn int_arg(name: &str, value: &Value) -> Result<i64, FormatError> {
    value.as_int().ok_or_else(|| {
        FormatError::evaluation(format!(
            "'{}' object cannot be interpreted as an integer in {}()",
            value.type_name(),
            name
        ))
    })
}

fn fill_arg(name: &str, args: &[Value], at: usize) -> Result<char, FormatError> {
    match args.get(at) {
        None => Ok(' '),
        Some(value) => {
            let text = str_arg(name, value)?;
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(FormatError::evaluation(
                    "The fill character must be exactly one character long",
                )),
            }
        }
    }
}

fn width_arg(name: &str, value: &Value) -> Result<usize, FormatError> {
    let width = usize::try_from(int_arg(name, value)?).unwrap_or(0);
    ensure_size(Some(width))
}

/// Pad on the right to `width` characters (`str.ljust`)
pub(crate) fn ljust(s: &str, width: usize, fill: char) -> String {
    let len = s.chars().count();
    let mut out = s.to_string();
    out.extend(std::iter::repeat(fill).take(width.saturating_sub(len)));
    out
}

/// Pad on the left to `width` characters (`str.rjust`)
pub(crate) fn rjust(s: &str, width: usize, fill: char) -> String {
    let len = s.chars().count();
    let mut out: String = std::iter::repeat(fill)
        .take(width.saturating_sub(len))
        .collect();
    out.push_str(s);
    out
}

/// Center in `width` characters; odd margins lean the way `str.center` does
pub(crate) fn center(s: &str, width: usize, fill: char) -> String {
    let len = s.chars().count();
    if width <= len {
        return s.to_string();
    }
    let margin = width - len;
    let left = margin / 2 + (margin & width & 1);
    let mut out: String = std::iter::repeat(fill).take(left).collect();
    out.push_str(s);
    out.extend(std::iter::repeat(fill).take(margin - left));
    out
}

/// `str.title`: uppercase the first letter of every run of letters
pub(crate) fn title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut previous_is_letter = false;
    for c in s.chars() {
        if previous_is_letter {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        previous_is_letter = c.is_alphabetic();
    }
    out
}

/// `str.capitalize`: first character upper, the rest lower
pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn zfill(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if width <= len {
        return s.to_string();
    }
    let zeros = "0".repeat(width - len);
    match s.chars().next() {
        Some(sign @ ('+' | '-')) => format!("{}{}{}", sign, zeros, &s[1..]),
        _ => format!("{}{}", zeros, s),
    }
}

fn strip<'s>(s: &'s str, chars: Option<&str>, left: bool, right: bool) -> &'s str {
    let matches = |c: char| match chars {
        Some(set) => set.contains(c),
        None => c.is_whitespace(),
    };
    let s = if left { s.trim_start_matches(matches) } else { s };
    if right {
        s.trim_end_matches(matches)
    } else {
        s
    }
}

fn split(s: &str, sep: Option<&str>, maxsplit: i64) -> Result<Vec<Value>, FormatError> {
    let parts: Vec<String> = match sep {
        Some("") => return Err(FormatError::evaluation("empty separator")),
        Some(sep) if maxsplit < 0 => s.split(sep).map(str::to_string).collect(),
        Some(sep) => s
            .splitn(maxsplit as usize + 1, sep)
            .map(str::to_string)
            .collect(),
        None if maxsplit < 0 => s.split_whitespace().map(str::to_string).collect(),
        None => {
            let mut parts = Vec::new();
            let mut rest = s.trim_start();
            while !rest.is_empty() {
                if parts.len() as i64 == maxsplit {
                    parts.push(rest.to_string());
                    break;
                }
                let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                parts.push(rest[..end].to_string());
                rest = rest[end..].trim_start();
            }
            parts
        }
    };
    Ok(parts.into_iter().map(Value::Str).collect())
}

/// Prefix/suffix tests accept a string or a tuple of strings
fn affix_test(
    name: &str,
    arg: &Value,
    test: impl Fn(&str) -> bool,
) -> Result<Value, FormatError> {
    match arg {
        Value::Tuple(options) => {
            for option in options.iter() {
                if test(str_arg(name, option)?) {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        other => Ok(Value::Bool(test(str_arg(name, other)?))),
    }
}

fn string_method(s: &str, name: &str, args: &[Value]) -> Result<Value, FormatError> {
    let text = |t: String| -> Result<Value, FormatError> { Ok(Value::Str(t)) };
    match name {
        "upper" => {
            arity(name, args, 0, 0)?;
            text(s.to_uppercase())
        }
        "lower" => {
            arity(name, args, 0, 0)?;
            text(s.to_lowercase())
        }
        "title" => {
            arity(name, args, 0, 0)?;
            text(title(s))
        }
        "capitalize" => {
            arity(name, args, 0, 0)?;
            text(capitalize(s))
        }
        "strip" | "lstrip" | "rstrip" => {
            arity(name, args, 0, 1)?;
            let chars = match args.first() {
                None | Some(Value::None) => None,
                Some(value) => Some(str_arg(name, value)?),
            };
            let stripped = strip(s, chars, name != "rstrip", name != "lstrip");
            text(stripped.to_string())
        }
        "ljust" | "rjust" | "center" => {
            arity(name, args, 1, 2)?;
            let width = width_arg(name, &args[0])?;
            let fill = fill_arg(name, args, 1)?;
            text(match name {
                "ljust" => ljust(s, width, fill),
                "rjust" => rjust(s, width, fill),
                _ => center(s, width, fill),
            })
        }
        "zfill" => {
            arity(name, args, 1, 1)?;
            text(zfill(s, width_arg(name, &args[0])?))
        }
        "replace" => {
            arity(name, args, 2, 3)?;
            let old = str_arg(name, &args[0])?;
            let new = str_arg(name, &args[1])?;
            match args.get(2).map(|count| int_arg(name, count)).transpose()? {
                Some(count) if count >= 0 => text(s.replacen(old, new, count as usize)),
                _ => text(s.replace(old, new)),
            }
        }
        "split" => {
            arity(name, args, 0, 2)?;
            let sep = match args.first() {
                None | Some(Value::None) => None,
                Some(value) => Some(str_arg(name, value)?),
            };
            let maxsplit = match args.get(1) {
                Some(value) => int_arg(name, value)?,
                None => -1,
            };
            Ok(Value::list(split(s, sep, maxsplit)?))
        }
        "join" => {
            arity(name, args, 1, 1)?;
            let parts = args[0]
                .iterate()?
                .iter()
                .map(|item| match item {
                    Value::Str(part) => Ok(part.clone()),
                    other => Err(FormatError::evaluation(format!(
                        "sequence item: expected str instance, {} found",
                        other.type_name()
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            text(parts.join(s))
        }
        "startswith" => {
            arity(name, args, 1, 1)?;
            affix_test(name, &args[0], |prefix| s.starts_with(prefix))
        }
        "endswith" => {
            arity(name, args, 1, 1)?;
            affix_test(name, &args[0], |suffix| s.ends_with(suffix))
        }
        "find" => {
            arity(name, args, 1, 1)?;
            let needle = str_arg(name, &args[0])?;
            Ok(Value::Int(match s.find(needle) {
                Some(byte) => s[..byte].chars().count() as i64,
                None => -1,
            }))
        }
        "count" => {
            arity(name, args, 1, 1)?;
            let needle = str_arg(name, &args[0])?;
            let count = if needle.is_empty() {
                s.chars().count() + 1
            } else {
                s.matches(needle).count()
            };
            Ok(Value::Int(count as i64))
        }
        "isdigit" | "isalpha" | "isspace" => {
            arity(name, args, 0, 0)?;
            let test: fn(char) -> bool = match name {
                "isdigit" => |c: char| c.is_ascii_digit(),
                "isalpha" => char::is_alphabetic,
                _ => char::is_whitespace,
            };
            Ok(Value::Bool(!s.is_empty() && s.chars().all(test)))
        }
        _ => Err(no_attribute(&Value::Str(String::new()), name)),
    }
}

/// `index` and `count`, shared by lists and tuples
fn sequence_method(
    items: &[Value],
    type_name: &str,
    name: &str,
    args: &[Value],
) -> Result<Value, FormatError> {
    match name {
        "index" => {
            arity(name, args, 1, 1)?;
            items
                .iter()
                .position(|item| item == &args[0])
                .map(|i| Value::Int(i as i64))
                .ok_or_else(|| {
                    FormatError::evaluation(format!(
                        "{} is not in {}",
                        args[0].repr(),
                        type_name
                    ))
                })
        }
        "count" => {
            arity(name, args, 1, 1)?;
            Ok(Value::Int(
                items.iter().filter(|item| *item == &args[0]).count() as i64,
            ))
        }
        _ => Err(FormatError::evaluation(format!(
            "'{}' object has no attribute '{}'",
            type_name, name
        ))),
    }
}

/// Resolve a possibly negative index against `len`
pub(crate) fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let index = if index < 0 { index + len } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

/// Stable merge sort with the `<` ordering; the first incomparable pair is an error
pub(crate) fn sort_values(mut items: Vec<Value>) -> Result<Vec<Value>, FormatError> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = sort_values(items)?;
    let mut right = sort_values(right)?.into_iter().peekable();
    let mut merged = Vec::with_capacity(left.len() + right.len());
    for item in left {
        loop {
            let smaller = match right.peek() {
                Some(next) => next.order(&item, "<")?.is_lt(),
                None => false,
            };
            if !smaller {
                break;
            }
            merged.extend(right.next());
        }
        merged.push(item);
    }
    merged.extend(right);
    Ok(merged)
}

fn list_method(object: &Value, name: &str, args: &[Value]) -> Result<Value, FormatError> {
    let Value::List(list) = object else {
        return Err(no_attribute(object, name));
    };
    match name {
        "append" => {
            arity(name, args, 1, 1)?;
            list.borrow_mut().push(args[0].clone());
            Ok(Value::None)
        }
        "extend" => {
            arity(name, args, 1, 1)?;
            let items = args[0].iterate()?;
            list.borrow_mut().extend(items);
            Ok(Value::None)
        }
        "pop" => {
            arity(name, args, 0, 1)?;
            let mut items = list.borrow_mut();
            if items.is_empty() {
                return Err(FormatError::evaluation("pop from empty list"));
            }
            let index = match args.first() {
                Some(value) => int_arg(name, value)?,
                None => -1,
            };
            let index = normalize_index(index, items.len())
                .ok_or_else(|| FormatError::evaluation("pop index out of range"))?;
            Ok(items.remove(index))
        }
        "insert" => {
            arity(name, args, 2, 2)?;
            let mut items = list.borrow_mut();
            let len = items.len() as i64;
            let index = int_arg(name, &args[0])?;
            let index = if index < 0 { (index + len).max(0) } else { index.min(len) };
            items.insert(index as usize, args[1].clone());
            Ok(Value::None)
        }
        "reverse" => {
            arity(name, args, 0, 0)?;
            list.borrow_mut().reverse();
            Ok(Value::None)
        }
        "sort" => {
            arity(name, args, 0, 0)?;
            // Sort a copy: the list may contain itself, so comparisons borrow it.
            let items = list.borrow().clone();
            *list.borrow_mut() = sort_values(items)?;
            Ok(Value::None)
        }
        _ => sequence_method(&list.borrow(), "list", name, args),
    }
}

fn dict_method(object: &Value, name: &str, args: &[Value]) -> Result<Value, FormatError> {
    let Value::Dict(dict) = object else {
        return Err(no_attribute(object, name));
    };
    match name {
        "keys" => {
            arity(name, args, 0, 0)?;
            Ok(Value::list(
                dict.borrow().keys().cloned().map(Value::Str).collect(),
            ))
        }
        "values" => {
            arity(name, args, 0, 0)?;
            Ok(Value::list(dict.borrow().values().cloned().collect()))
        }
        "items" => {
            arity(name, args, 0, 0)?;
            Ok(Value::list(
                dict.borrow()
                    .iter()
                    .map(|(key, value)| Value::tuple(vec![Value::Str(key.clone()), value.clone()]))
                    .collect(),
            ))
        }
        "get" => {
            arity(name, args, 1, 2)?;
            let key = str_arg(name, &args[0])?;
            Ok(dict
                .borrow()
                .get(key)
                .cloned()
                .unwrap_or_else(|| args.get(1).cloned().unwrap_or(Value::None)))
        }
        "update" => {
            arity(name, args, 1, 1)?;
            let Value::Dict(other) = &args[0] else {
                return Err(FormatError::evaluation(format!(
                    "update() argument must be dict, not {}",
                    args[0].type_name()
                )));
            };
            let entries: Vec<(String, Value)> = other
                .borrow()
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            dict.borrow_mut().extend(entries);
            Ok(Value::None)
        }
        _ => Err(no_attribute(object, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn call(object: &Value, name: &str, args: &[Value]) -> Value {
        call_method(object, name, args).unwrap_or_else(|e| panic!("{}: {}", name, e))
    }

    fn s(text: &str) -> Value {
        Value::from(text)
    }

    #[rstest]
    #[case("why not?", "rjust", vec![Value::from(10)], "  why not?")]
    #[case("ab", "center", vec![Value::from(5), s("*")], "**ab*")]
    #[case("abc", "center", vec![Value::from(6)], " abc  ")]
    #[case("ab", "ljust", vec![Value::from(4), s("-")], "ab--")]
    #[case("hello world", "title", vec![], "Hello World")]
    #[case("they're", "title", vec![], "They'Re")]
    #[case("hELLO", "capitalize", vec![], "Hello")]
    #[case("  pad  ", "strip", vec![], "pad")]
    #[case("xxpadxx", "lstrip", vec![s("x")], "padxx")]
    #[case("-42", "zfill", vec![Value::from(5)], "-0042")]
    #[case("aaa", "replace", vec![s("a"), s("b"), Value::from(2)], "bba")]
    #[case(", ", "join", vec![Value::from(vec!["a", "b"])], "a, b")]
    fn test_string_methods(
        #[case] subject: &str,
        #[case] method: &str,
        #[case] args: Vec<Value>,
        #[case] expected: &str,
    ) {
        assert_eq!(call(&s(subject), method, &args), s(expected));
    }

    #[test]
    fn test_split() {
        assert_eq!(call(&s(" a  b "), "split", &[]).to_string(), "['a', 'b']");
        assert_eq!(
            call(&s("a,b,c"), "split", &[s(","), Value::from(1)]).to_string(),
            "['a', 'b,c']"
        );
        assert_eq!(
            call(&s("a b  c"), "split", &[Value::None, Value::from(1)]).to_string(),
            "['a', 'b  c']"
        );
    }

    #[test]
    fn test_find_counts_characters() {
        assert_eq!(call(&s("🔥ab"), "find", &[s("b")]), Value::from(2));
        assert_eq!(call(&s("ab"), "find", &[s("z")]), Value::from(-1));
    }

    #[test]
    fn test_predicates() {
        assert_eq!(call(&s("123"), "isdigit", &[]), Value::Bool(true));
        assert_eq!(call(&s(""), "isalpha", &[]), Value::Bool(false));
        assert_eq!(
            call(&s("abc"), "startswith", &[Value::tuple(vec![s("x"), s("a")])]),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_list_mutation_is_shared() {
        let list = Value::from(vec![3, 1]);
        call(&list, "append", &[Value::from(2)]);
        call(&list, "sort", &[]);
        assert_eq!(list.to_string(), "[1, 2, 3]");
        assert_eq!(call(&list, "pop", &[]), Value::from(3));
        call(&list, "insert", &[Value::from(0), Value::from(0)]);
        assert_eq!(list.to_string(), "[0, 1, 2]");
        assert_eq!(call(&list, "index", &[Value::from(2)]), Value::from(2));
    }

    #[test]
    fn test_list_errors() {
        let empty = Value::from(Vec::<Value>::new());
        assert_eq!(
            call_method(&empty, "pop", &[]).unwrap_err().to_string(),
            "pop from empty list"
        );
        assert!(call_method(&Value::from(vec![1, 2]), "index", &[Value::from(9)]).is_err());
    }

    #[test]
    fn test_sort_is_stable() {
        let list = Value::from(vec![Value::from(2), Value::from(1.0), Value::from(1), Value::from(0)]);
        call(&list, "sort", &[]);
        assert_eq!(list.to_string(), "[0, 1.0, 1, 2]");
    }

    #[test]
    fn test_sort_rejects_incomparable_items_anywhere() {
        let list = Value::from(vec![
            Value::from(vec![Value::from(1)]),
            Value::from(vec![Value::from(2), s("x")]),
            Value::from(vec![Value::from(2), Value::from(3)]),
        ]);
        let err = call_method(&list, "sort", &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'<' not supported between instances of 'int' and 'str'"
        );
        assert_eq!(list.to_string(), "[[1], [2, 'x'], [2, 3]]");
    }

    #[test]
    fn test_sort_list_containing_itself() {
        let list = Value::from(vec![Value::from(vec![0])]);
        call(&list, "append", &[list.clone()]);
        assert!(call_method(&list, "sort", &[]).is_err());
        assert_eq!(list.to_string(), "[[0], [...]]");
    }

    #[rstest]
    #[case("ljust")]
    #[case("rjust")]
    #[case("center")]
    #[case("zfill")]
    fn test_oversized_width_is_an_error(#[case] method: &str) {
        let err = call_method(&s("ab"), method, &[Value::from(1i64 << 40)]).unwrap_err();
        assert_eq!(err.to_string(), "result too large to build");
    }

    #[test]
    fn test_dict_methods() {
        let dict = Value::dict(
            [("a".to_string(), Value::from(1))]
                .into_iter()
                .collect(),
        );
        assert_eq!(call(&dict, "keys", &[]).to_string(), "['a']");
        assert_eq!(call(&dict, "items", &[]).to_string(), "[('a', 1)]");
        assert_eq!(call(&dict, "get", &[s("b"), Value::from(0)]), Value::from(0));
    }

    #[test]
    fn test_unknown_method() {
        assert_eq!(
            call_method(&Value::from(1), "upper", &[])
                .unwrap_err()
                .to_string(),
            "'int' object has no attribute 'upper'"
        );
        assert!(call_method(&s("x"), "nope", &[]).is_err());
    }
}
