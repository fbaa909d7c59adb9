//! Decoding of number and string literal source text

/// How string literals inside field code are decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralOptions {
    /// Collapse `{{` / `}}` inside string literals to a single brace
    pub collapse_braces: bool,
}

impl Default for LiteralOptions {
    fn default() -> Self {
        Self {
            collapse_braces: true,
        }
    }
}

/// Parse an integer literal (decimal, `0x`, `0o` or `0b`, `_` separators allowed)
pub fn parse_int(text: &str) -> Result<i64, String> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    let lower = digits.to_ascii_lowercase();
    let (radix, body) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest.to_string())
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest.to_string())
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest.to_string())
    } else {
        (10, lower)
    };
    i64::from_str_radix(&body, radix)
        .map_err(|_| format!("integer literal `{}` is out of range", text))
}

/// Parse a float literal
pub fn parse_float(text: &str) -> Result<f64, String> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    digits
        .parse::<f64>()
        .map_err(|_| format!("invalid float literal `{}`", text))
}

/// Decode a string literal exactly as lexed: optional raw prefix, quotes, body
pub fn decode_string(raw: &str, options: LiteralOptions) -> Result<String, String> {
    let (is_raw, quoted) = match raw.chars().next() {
        Some('r') | Some('R') => (true, &raw[1..]),
        _ => (false, raw),
    };
    let quote_len = if quoted.starts_with("\"\"\"") || quoted.starts_with("'''") {
        3
    } else {
        1
    };
    if quoted.len() < quote_len * 2 {
        return Err(format!("malformed string literal {}", raw));
    }
    let body = &quoted[quote_len..quoted.len() - quote_len];

    let text = if is_raw {
        body.to_string()
    } else {
        unescape(body)?
    };

    Ok(if options.collapse_braces {
        text.replace("{{", "{").replace("}}", "}")
    } else {
        text
    })
}

/// Resolve backslash escapes; unknown escapes keep their backslash
fn unescape(body: &str) -> Result<String, String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escape) = chars.next() else {
            out.push('\\');
            break;
        };
        match escape {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            '0'..='7' => {
                let mut value = escape.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(code_point(value, "octal")?);
            }
            'x' => out.push(hex_escape(&mut chars, 2, "\\xXX")?),
            'u' => out.push(hex_escape(&mut chars, 4, "\\uXXXX")?),
            'U' => out.push(hex_escape(&mut chars, 8, "\\UXXXXXXXX")?),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }

    Ok(out)
}

fn hex_escape(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    len: usize,
    name: &str,
) -> Result<char, String> {
    let mut value = 0u32;
    for _ in 0..len {
        let digit = chars
            .next()
            .and_then(|d| d.to_digit(16))
            .ok_or_else(|| format!("truncated {} escape", name))?;
        value = value * 16 + digit;
    }
    code_point(value, name)
}

fn code_point(value: u32, name: &str) -> Result<char, String> {
    char::from_u32(value).ok_or_else(|| format!("invalid code point in {} escape", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: LiteralOptions = LiteralOptions {
        collapse_braces: false,
    };

    #[test]
    fn test_parse_int_radixes() {
        assert_eq!(parse_int("1_000"), Ok(1000));
        assert_eq!(parse_int("0x1F"), Ok(31));
        assert_eq!(parse_int("0o17"), Ok(15));
        assert_eq!(parse_int("0b101"), Ok(5));
        assert!(parse_int("99999999999999999999").is_err());
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("1.5"), Ok(1.5));
        assert_eq!(parse_float(".5"), Ok(0.5));
        assert_eq!(parse_float("2e3"), Ok(2000.0));
        assert_eq!(parse_float("1."), Ok(1.0));
    }

    #[test]
    fn test_decode_simple_strings() {
        assert_eq!(decode_string("\"mid\"", PLAIN), Ok("mid".to_string()));
        assert_eq!(decode_string("''", PLAIN), Ok(String::new()));
    }

    #[test]
    fn test_decode_escapes() {
        assert_eq!(
            decode_string(r"'don\'t'", PLAIN),
            Ok("don't".to_string())
        );
        assert_eq!(
            decode_string(r"'a\nb\t\x41é\101'", PLAIN),
            Ok("a\nb\tAéA".to_string())
        );
        assert_eq!(decode_string(r"'\q'", PLAIN), Ok("\\q".to_string()));
        assert_eq!(decode_string("'a\\\nb'", PLAIN), Ok("ab".to_string()));
    }

    #[test]
    fn test_decode_raw_and_triple() {
        assert_eq!(decode_string(r"r'\n'", PLAIN), Ok("\\n".to_string()));
        assert_eq!(
            decode_string("'''a\n'b'\n'''", PLAIN),
            Ok("a\n'b'\n".to_string())
        );
    }

    #[test]
    fn test_bad_escape() {
        assert!(decode_string(r"'\x4'", PLAIN).is_err());
    }

    #[test]
    fn test_collapse_braces() {
        let options = LiteralOptions::default();
        assert_eq!(
            decode_string("\"false brace ending}}\"", options),
            Ok("false brace ending}".to_string())
        );
        assert_eq!(
            decode_string("\"single } stays\"", options),
            Ok("single } stays".to_string())
        );
        assert_eq!(
            decode_string("'{{x}}'", PLAIN),
            Ok("{{x}}".to_string())
        );
    }
}
