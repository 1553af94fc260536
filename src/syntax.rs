//! Grammar primitives shared by the decoder and the encoder.
//!
//! Everything here works on a single line (or a fragment of one): measuring
//! indentation, quote-aware scanning, splitting delimited values, string
//! escaping, literal classification and array headers. The line-oriented
//! state machines live in [`crate::de`] and [`crate::ser`].
//!
//! ## Array headers
//!
//! ```text
//! [ "key" | key ]? "[" "#"? digits delim? "]" ( "{" field (delim field)* "}" )? ":"
//! ```
//!
//! ```rust
//! use toon_value::syntax::parse_header;
//! use toon_value::Delimiter;
//!
//! let header = parse_header("users[#2|]{id|name}:", 1).unwrap().unwrap();
//! assert_eq!(header.key.as_deref(), Some("users"));
//! assert_eq!(header.count, 2);
//! assert_eq!(header.delimiter, Delimiter::Pipe);
//! assert_eq!(header.fields, Some(vec!["id".to_string(), "name".to_string()]));
//! ```

use crate::options::{Delimiter, ToonOptions};
use crate::{Error, Result, Value};

/// A parsed `key[N]{fields}:` array header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayHeader {
    /// `None` for anonymous arrays (document root or list-item elements)
    pub key: Option<String>,
    /// The key was written in double quotes
    pub key_quoted: bool,
    /// Declared element count
    pub count: usize,
    pub delimiter: Delimiter,
    /// Field names of a tabular array, in column order
    pub fields: Option<Vec<String>>,
    /// Byte offset just past the header's closing `:`
    pub value_offset: usize,
}

/// Number of leading space characters on a line.
#[must_use]
pub fn indentation(line: &str) -> usize {
    line.bytes().take_while(|b| *b == b' ').count()
}

/// Finds the first `:` that is outside quotes and outside `[...]`.
///
/// ```rust
/// use toon_value::syntax::find_key_separator;
///
/// assert_eq!(find_key_separator("name: Ada"), Some(4));
/// assert_eq!(find_key_separator("\"a:b\": 1"), Some(5));
/// assert_eq!(find_key_separator("hello"), None);
/// ```
#[must_use]
pub fn find_key_separator(s: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    let mut depth = 0usize;

    for (i, ch) in s.char_indices() {
        if in_quotes {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_quotes = false;
            }
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Finds the first unquoted occurrence of `target`.
fn find_unquoted(s: &str, target: char) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, ch) in s.char_indices() {
        if in_quotes {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_quotes = false;
            }
        } else if ch == '"' {
            in_quotes = true;
        } else if ch == target {
            return Some(i);
        }
    }
    None
}

/// Index of the quote closing a quoted string that opens at byte 0.
fn closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, ch) in s.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '"' {
            return Some(i);
        }
    }
    None
}

/// Splits on every unquoted `delimiter`, trimming each token.
///
/// Quoted tokens are returned with their quotes so that
/// [`classify_primitive`] can tell `"10"` from `10`.
///
/// ```rust
/// use toon_value::syntax::split_delimited;
/// use toon_value::Delimiter;
///
/// let tokens = split_delimited(r#"a, "b,c" ,d"#, Delimiter::Comma);
/// assert_eq!(tokens, vec!["a", "\"b,c\"", "d"]);
/// ```
#[must_use]
pub fn split_delimited(s: &str, delimiter: Delimiter) -> Vec<&str> {
    let delim = delimiter.as_char();
    let mut tokens = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, ch) in s.char_indices() {
        if in_quotes {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_quotes = false;
            }
        } else if ch == '"' {
            in_quotes = true;
        } else if ch == delim {
            tokens.push(s[start..i].trim());
            start = i + ch.len_utf8();
        }
    }
    tokens.push(s[start..].trim());
    tokens
}

/// Resolves the five recognised escapes: `\\`, `\"`, `\n`, `\r` and `\t`.
///
/// ```rust
/// use toon_value::syntax::unescape;
///
/// assert_eq!(unescape(r"line1\nline2").unwrap(), "line1\nline2");
/// assert!(unescape(r"invalid\x").is_err());
/// assert!(unescape("dangling\\").is_err());
/// ```
pub fn unescape(s: &str) -> Result<String> {
    if !s.contains('\\') {
        return Ok(s.to_string());
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => return Err(Error::InvalidEscapeSequence(format!("\\{}", other))),
            None => {
                return Err(Error::InvalidEscapeSequence(
                    "trailing backslash".to_string(),
                ))
            }
        }
    }
    Ok(out)
}

#[must_use]
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

fn quote(s: &str) -> String {
    format!("\"{}\"", escape(s))
}

/// Parses a key token: quoted keys are unescaped, unquoted keys are taken verbatim.
///
/// Returns the key and whether it was quoted.
pub fn parse_key(raw: &str) -> Result<(String, bool)> {
    let raw = raw.trim();
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        Ok((unescape(&raw[1..raw.len() - 1])?, true))
    } else {
        Ok((raw.to_string(), false))
    }
}

/// Classifies a single value token.
///
/// ```rust
/// use toon_value::syntax::classify_primitive;
/// use toon_value::Value;
///
/// assert_eq!(classify_primitive("42").unwrap(), Value::Int(42));
/// assert_eq!(classify_primitive("4.5e1").unwrap(), Value::Float(45.0));
/// assert_eq!(classify_primitive("\"10\"").unwrap(), Value::from("10"));
/// assert_eq!(classify_primitive("").unwrap(), Value::from(""));
/// assert_eq!(classify_primitive("hello world").unwrap(), Value::from("hello world"));
/// ```
pub fn classify_primitive(token: &str) -> Result<Value> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(Value::String(String::new()));
    }
    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        return unescape(&token[1..token.len() - 1]).map(Value::String);
    }
    match token {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" => return Ok(Value::Null),
        _ => {}
    }
    if let Ok(i) = token.parse::<i64>() {
        return Ok(Value::Int(i));
    }
    if token.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        if let Ok(f) = token.parse::<f64>() {
            if f.is_finite() {
                return Ok(Value::Float(f));
            }
        }
    }
    Ok(Value::String(token.to_string()))
}

/// `[A-Za-z_][A-Za-z0-9_.]*`
#[must_use]
pub fn is_valid_unquoted_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// `[A-Za-z_][A-Za-z0-9_]*`, the shape of one dotted-path segment.
#[must_use]
pub fn is_identifier(segment: &str) -> bool {
    !segment.contains('.') && is_valid_unquoted_key(segment)
}

fn looks_numeric(s: &str) -> bool {
    s.parse::<i64>().is_ok()
        || s.parse::<f64>().is_ok()
        || (s.len() > 1 && s.starts_with('0') && s.bytes().all(|b| b.is_ascii_digit()))
}

/// Returns `true` when `s` cannot be written bare without changing its meaning.
///
/// ```rust
/// use toon_value::syntax::needs_quotes;
/// use toon_value::Delimiter;
///
/// assert!(!needs_quotes("hello world", Delimiter::Comma));
/// assert!(needs_quotes("true", Delimiter::Comma));
/// assert!(needs_quotes("007", Delimiter::Comma));
/// assert!(needs_quotes("a|b", Delimiter::Pipe));
/// assert!(!needs_quotes("a|b", Delimiter::Comma));
/// ```
#[must_use]
pub fn needs_quotes(s: &str, delimiter: Delimiter) -> bool {
    let delim = delimiter.as_char();
    s.is_empty()
        || s.starts_with(char::is_whitespace)
        || s.ends_with(char::is_whitespace)
        || matches!(s, "true" | "false" | "null")
        || s.starts_with('-')
        || looks_numeric(s)
        || s.chars().any(|c| {
            matches!(
                c,
                ':' | '"' | '\\' | '[' | ']' | '{' | '}' | '\n' | '\r' | '\t'
            ) || c == delim
        })
}

#[must_use]
pub fn encode_key(key: &str) -> String {
    if is_valid_unquoted_key(key) {
        key.to_string()
    } else {
        quote(key)
    }
}

#[must_use]
pub fn encode_string(s: &str, delimiter: Delimiter) -> String {
    if needs_quotes(s, delimiter) {
        quote(s)
    } else {
        s.to_string()
    }
}

/// Parses an array header at the start of `content`.
///
/// Returns `Ok(None)` when the line is not header-shaped (no `[` in key
/// position), and `InvalidHeader` when it is header-shaped but malformed.
pub fn parse_header(content: &str, line: usize) -> Result<Option<ArrayHeader>> {
    let (key, key_quoted, open) = if content.starts_with('"') {
        let Some(close) = closing_quote(content) else {
            return Ok(None);
        };
        if !content[close + 1..].starts_with('[') {
            return Ok(None);
        }
        (Some(unescape(&content[1..close])?), true, close + 1)
    } else {
        let Some(open) = content.find('[') else {
            return Ok(None);
        };
        let raw = &content[..open];
        if raw.contains(':') || raw.contains('"') {
            return Ok(None);
        }
        let raw = raw.trim();
        let key = (!raw.is_empty()).then(|| raw.to_string());
        (key, false, open)
    };

    let after_open = open + 1;
    let close = content[after_open..]
        .find(']')
        .map(|i| after_open + i)
        .ok_or_else(|| Error::invalid_header(line, "missing ']'"))?;

    let mut length = &content[after_open..close];
    let mut delimiter = Delimiter::Comma;
    if let Some(last) = length.chars().last() {
        if let Some(d) = Delimiter::from_header_char(last) {
            delimiter = d;
            length = &length[..length.len() - last.len_utf8()];
        }
    }
    let digits = length.strip_prefix('#').unwrap_or(length);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::invalid_header(
            line,
            format!("invalid array length '{}'", length),
        ));
    }
    let count = digits
        .parse::<usize>()
        .map_err(|_| Error::invalid_header(line, format!("array length '{}' out of range", digits)))?;

    let mut pos = close + 1;
    let mut fields = None;
    if content[pos..].starts_with('{') {
        let body_start = pos + 1;
        let body_end = find_unquoted(&content[body_start..], '}')
            .map(|i| body_start + i)
            .ok_or_else(|| Error::invalid_header(line, "missing '}' after field list"))?;
        let body = &content[body_start..body_end];
        if body.trim().is_empty() {
            return Err(Error::invalid_header(line, "empty field list"));
        }
        let names = split_delimited(body, delimiter)
            .into_iter()
            .map(|field| parse_key(field).map(|(name, _)| name))
            .collect::<Result<Vec<_>>>()?;
        fields = Some(names);
        pos = body_end + 1;
    }

    if !content[pos..].starts_with(':') {
        return Err(Error::invalid_header(line, "expected ':' after array header"));
    }

    Ok(Some(ArrayHeader {
        key,
        key_quoted,
        count,
        delimiter,
        fields,
        value_offset: pos + 1,
    }))
}

/// Renders an array header for the given options.
///
/// ```rust
/// use toon_value::syntax::format_header;
/// use toon_value::{Delimiter, LengthMarker, ToonOptions};
///
/// let opts = ToonOptions::new().with_delimiter(Delimiter::Tab);
/// let fields = vec!["id".to_string(), "full name".to_string()];
/// assert_eq!(
///     format_header(Some("users"), 2, Some(&fields), &opts),
///     "users[2\t]{id\t\"full name\"}:"
/// );
/// assert_eq!(format_header(None, 0, None, &ToonOptions::new()), "[0]:");
/// ```
#[must_use]
pub fn format_header(
    key: Option<&str>,
    count: usize,
    fields: Option<&[String]>,
    options: &ToonOptions,
) -> String {
    let mut out = String::new();
    if let Some(key) = key {
        out.push_str(&encode_key(key));
    }
    out.push('[');
    out.push_str(options.length_marker.as_str());
    out.push_str(&count.to_string());
    out.push_str(options.delimiter.header_suffix());
    out.push(']');
    if let Some(fields) = fields {
        let names: Vec<String> = fields.iter().map(|f| encode_key(f)).collect();
        out.push('{');
        out.push_str(&names.join(options.delimiter.as_str()));
        out.push('}');
    }
    out.push(':');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LengthMarker;

    #[test]
    fn test_indentation() {
        assert_eq!(indentation("abc"), 0);
        assert_eq!(indentation("    abc"), 4);
        assert_eq!(indentation("\tabc"), 0);
    }

    #[test]
    fn test_key_separator_skips_brackets() {
        assert_eq!(find_key_separator("see [a:b]: x"), Some(9));
        assert_eq!(find_key_separator("{x: 1}"), Some(2));
        assert_eq!(find_key_separator("a{b: 1"), Some(3));
        assert_eq!(find_key_separator(r#""a\":b": 1"#), Some(7));
        assert_eq!(find_key_separator("[3]"), None);
    }

    #[test]
    fn test_split_keeps_trailing_empty_token() {
        assert_eq!(split_delimited("a,b,", Delimiter::Comma), vec!["a", "b", ""]);
        assert_eq!(split_delimited("a\tb c", Delimiter::Tab), vec!["a", "b c"]);
        assert_eq!(split_delimited(r#""x\"|y"|z"#, Delimiter::Pipe), vec![r#""x\"|y""#, "z"]);
    }

    #[test]
    fn test_escape_round_trip() {
        let raw = "tab\there \"quoted\" back\\slash\r\n";
        assert_eq!(unescape(&escape(raw)).unwrap(), raw);
    }

    #[test]
    fn test_unescape_errors() {
        assert_eq!(
            unescape(r"bad\u0041"),
            Err(Error::InvalidEscapeSequence("\\u".to_string()))
        );
        assert!(matches!(
            unescape("end\\"),
            Err(Error::InvalidEscapeSequence(_))
        ));
    }

    #[test]
    fn test_classify_literals() {
        assert_eq!(classify_primitive("true").unwrap(), Value::Bool(true));
        assert_eq!(classify_primitive("null").unwrap(), Value::Null);
        assert_eq!(classify_primitive("-12").unwrap(), Value::Int(-12));
        assert_eq!(classify_primitive("1.5").unwrap(), Value::Float(1.5));
        assert_eq!(classify_primitive("1E3").unwrap(), Value::Float(1000.0));
        assert_eq!(classify_primitive("\"true\"").unwrap(), Value::from("true"));
        assert_eq!(classify_primitive("inf").unwrap(), Value::from("inf"));
        assert_eq!(classify_primitive("1e999").unwrap(), Value::from("1e999"));
        assert_eq!(classify_primitive("12abc").unwrap(), Value::from("12abc"));
        assert!(classify_primitive(r#""a\qb""#).is_err());
    }

    #[test]
    fn test_unquoted_key_rule() {
        assert!(is_valid_unquoted_key("user_name"));
        assert!(is_valid_unquoted_key("_a.b1"));
        assert!(!is_valid_unquoted_key("1abc"));
        assert!(!is_valid_unquoted_key("full name"));
        assert!(!is_valid_unquoted_key(""));
        assert!(is_identifier("abc_1"));
        assert!(!is_identifier("a.b"));
    }

    #[test]
    fn test_needs_quotes() {
        for s in ["", " pad", "pad ", "null", "-x", "3.14", "1e5", "a:b", "[x]", "{y}", "q\"", "a\\b", "l\nl"] {
            assert!(needs_quotes(s, Delimiter::Comma), "{s:?} should be quoted");
        }
        for s in ["hello", "hello world", "a.b", "café", "x-y"] {
            assert!(!needs_quotes(s, Delimiter::Comma), "{s:?} should stay bare");
        }
        assert!(needs_quotes("a,b", Delimiter::Comma));
        assert!(needs_quotes("a\tb", Delimiter::Pipe));
    }

    #[test]
    fn test_parse_header_variants() {
        let h = parse_header("[3]: a,b,c", 1).unwrap().unwrap();
        assert_eq!(h.key, None);
        assert_eq!(h.count, 3);
        assert_eq!(h.value_offset, 4);

        let h = parse_header("\"my key\"[#2\t]:", 1).unwrap().unwrap();
        assert_eq!(h.key.as_deref(), Some("my key"));
        assert!(h.key_quoted);
        assert_eq!(h.delimiter, Delimiter::Tab);

        let h = parse_header("rows[1]{\"a,b\",c}:", 1).unwrap().unwrap();
        assert_eq!(h.fields, Some(vec!["a,b".to_string(), "c".to_string()]));
    }

    #[test]
    fn test_parse_header_not_a_header() {
        assert_eq!(parse_header("name: Ada", 1).unwrap(), None);
        assert_eq!(parse_header("note: see [1]", 1).unwrap(), None);
        assert_eq!(parse_header("\"quoted\": 1", 1).unwrap(), None);
    }

    #[test]
    fn test_parse_header_malformed() {
        assert!(matches!(
            parse_header("items[x]: 1", 4),
            Err(Error::InvalidHeader { line: 4, .. })
        ));
        assert!(matches!(
            parse_header("items[2 a", 1),
            Err(Error::InvalidHeader { .. })
        ));
        assert!(matches!(
            parse_header("items[2]{}:", 1),
            Err(Error::InvalidHeader { .. })
        ));
        assert!(matches!(
            parse_header("items[2] a,b", 1),
            Err(Error::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_format_header_marker_and_pipe() {
        let opts = ToonOptions::new()
            .with_delimiter(Delimiter::Pipe)
            .with_length_marker(LengthMarker::Hash);
        let fields = vec!["a".to_string(), "b".to_string()];
        let header = format_header(Some("1st"), 3, Some(&fields), &opts);
        assert_eq!(header, "\"1st\"[#3|]{a|b}:");

        let parsed = parse_header(&header, 1).unwrap().unwrap();
        assert_eq!(parsed.key.as_deref(), Some("1st"));
        assert_eq!(parsed.count, 3);
        assert_eq!(parsed.delimiter, Delimiter::Pipe);
        assert_eq!(parsed.fields, Some(fields));
    }
}
