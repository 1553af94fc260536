//! TOON deserialization.
//!
//! Decoding happens in two stages:
//!
//! 1. [`Parser`] turns TOON text into a [`Value`] tree, enforcing indentation,
//!    declared array lengths and field counts, and the configured
//!    [`DecodingLimits`].
//! 2. [`Deserializer`] walks a `Value` tree and drives serde, so any
//!    `T: Deserialize` can be built from it.
//!
//! ## Usage
//!
//! Most users should use the high-level functions in the crate root:
//!
//! ```rust
//! use toon_value::from_str;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, Debug, PartialEq)]
//! struct Data { x: i32, y: i32 }
//!
//! let data: Data = from_str("x: 1\ny: 2").unwrap();
//! assert_eq!(data, Data { x: 1, y: 2 });
//!
//! let nums: Vec<i32> = from_str("[3]: 1,2,3").unwrap();
//! assert_eq!(nums, vec![1, 2, 3]);
//! ```

use crate::options::{DecodeOptions, DecodingLimits, PathExpansion};
use crate::syntax::{self, ArrayHeader};
use crate::{Error, Result, ToonMap, Value};
use serde::{de, forward_to_deserialize_any};
use tracing::{debug, trace};

#[derive(Clone, Copy, Debug)]
struct Line<'a> {
    /// 1-based
    number: usize,
    depth: usize,
    /// Line text after the leading spaces
    content: &'a str,
    blank: bool,
}

/// Line-oriented TOON parser producing a [`Value`] tree.
///
/// A parser owns its cursor and is consumed by [`Parser::parse`]; create one
/// per document.
///
/// # Examples
///
/// ```rust
/// use toon_value::de::Parser;
/// use toon_value::{DecodeOptions, Value};
///
/// let value = Parser::new("a:\n  b: 1", &DecodeOptions::default()).parse().unwrap();
/// assert_eq!(value.get("a").and_then(|a| a.get("b")), Some(&Value::Int(1)));
/// ```
pub struct Parser<'a> {
    input: &'a str,
    indent: usize,
    lines: Vec<Line<'a>>,
    pos: usize,
    expand_paths: PathExpansion,
    limits: DecodingLimits,
}

impl<'a> Parser<'a> {
    /// Creates a parser; the input is not scanned until [`Parser::parse`].
    pub fn new(input: &'a str, options: &DecodeOptions) -> Self {
        Parser {
            input,
            indent: options.indent_width(),
            lines: Vec::new(),
            pos: 0,
            expand_paths: options.expand_paths,
            limits: options.limits,
        }
    }

    /// Parses the whole document.
    pub fn parse(mut self) -> Result<Value> {
        check_input_size(self.input.len(), &self.limits)?;
        self.lines = split_lines(self.input, self.indent);

        let Some(first_idx) = self.peek_nonblank() else {
            trace!("empty document, decoding as empty object");
            return Ok(Value::Object(ToonMap::new()));
        };
        let first = self.lines[first_idx];

        if let Ok(Some(header)) = syntax::parse_header(first.content, first.number) {
            if header.key.is_none() {
                trace!(count = header.count, "root array");
                self.pos = first_idx + 1;
                let value = self.parse_array(&header, first.content, first.number, 0)?;
                if let Some(extra) = self.peek_nonblank() {
                    return Err(Error::invalid_format(
                        self.lines[extra].number,
                        "unexpected content after root array",
                    ));
                }
                return Ok(value);
            }
        }

        let nonblank = self.lines.iter().filter(|l| !l.blank).count();
        if nonblank == 1 && syntax::find_key_separator(first.content).is_none() {
            trace!("root primitive");
            return syntax::classify_primitive(first.content);
        }

        trace!("root object");
        let mut root = ToonMap::new();
        self.parse_object_into(0, &mut root)?;
        Ok(Value::Object(root))
    }

    fn peek_nonblank(&self) -> Option<usize> {
        (self.pos..self.lines.len()).find(|&i| !self.lines[i].blank)
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.limits.max_depth {
            debug!(depth, limit = self.limits.max_depth, "nesting rejected by depth limit");
            return Err(Error::DepthLimitExceeded {
                depth,
                limit: self.limits.max_depth,
            });
        }
        Ok(())
    }

    fn check_keys(&self, count: usize) -> Result<()> {
        if count > self.limits.max_object_keys {
            debug!(count, limit = self.limits.max_object_keys, "object rejected by key limit");
            return Err(Error::ObjectKeyLimitExceeded {
                count,
                limit: self.limits.max_object_keys,
            });
        }
        Ok(())
    }

    /// Reads `key: value` lines at exactly `depth` until a shallower line or EOF.
    /// An object that turns out empty is not subject to the depth limit.
    fn parse_object_into(&mut self, depth: usize, map: &mut ToonMap) -> Result<()> {
        while let Some(idx) = self.peek_nonblank() {
            let line = self.lines[idx];
            if line.depth < depth {
                break;
            }
            if line.depth > depth {
                return Err(Error::invalid_indentation(line.number, depth, line.depth));
            }
            self.check_depth(depth)?;
            self.pos = idx + 1;
            self.parse_field(line.content, line.number, depth, map)?;
        }
        Ok(())
    }

    fn parse_field(
        &mut self,
        content: &str,
        number: usize,
        depth: usize,
        map: &mut ToonMap,
    ) -> Result<()> {
        if content.trim_end() == "-" || content.starts_with("- ") {
            return Err(Error::invalid_format(number, "list item outside of an array"));
        }

        if let Some(header) = syntax::parse_header(content, number)? {
            let Some(key) = header.key.clone() else {
                return Err(Error::invalid_header(
                    number,
                    "array header without a key inside an object",
                ));
            };
            let value = self.parse_array(&header, content, number, depth)?;
            return self.insert(map, key, header.key_quoted, value, number);
        }

        let sep = syntax::find_key_separator(content)
            .ok_or_else(|| Error::invalid_format(number, "expected 'key: value'"))?;
        let (key, quoted) = syntax::parse_key(&content[..sep])?;
        let rest = content[sep + 1..].trim();
        let value = if rest.is_empty() {
            let mut nested = ToonMap::new();
            self.parse_object_into(depth + 1, &mut nested)?;
            Value::Object(nested)
        } else {
            syntax::classify_primitive(rest)?
        };
        self.insert(map, key, quoted, value, number)
    }

    fn insert(
        &self,
        map: &mut ToonMap,
        key: String,
        quoted: bool,
        value: Value,
        number: usize,
    ) -> Result<()> {
        let expand = self.expand_paths == PathExpansion::Safe
            && !quoted
            && key.contains('.')
            && key.split('.').all(syntax::is_identifier);

        if expand {
            let segments: Vec<&str> = key.split('.').collect();
            return self.insert_path(map, &segments, 0, value, number);
        }

        map.insert(key, value);
        self.check_keys(map.len())
    }

    fn insert_path(
        &self,
        map: &mut ToonMap,
        segments: &[&str],
        index: usize,
        value: Value,
        number: usize,
    ) -> Result<()> {
        let segment = segments[index];
        if index + 1 == segments.len() {
            map.insert(segment.to_string(), value);
            return self.check_keys(map.len());
        }

        if !map.contains_key(segment) {
            map.insert(segment.to_string(), Value::Object(ToonMap::new()));
            self.check_keys(map.len())?;
        }
        match map.get_mut(segment) {
            Some(Value::Object(child)) => self.insert_path(child, segments, index + 1, value, number),
            _ => Err(Error::PathCollision {
                path: segments[..=index].join("."),
                line: number,
            }),
        }
    }

    /// Parses the body of an array whose header sits on a line at `depth`.
    fn parse_array(
        &mut self,
        header: &ArrayHeader,
        content: &str,
        number: usize,
        depth: usize,
    ) -> Result<Value> {
        if header.count > self.limits.max_array_length {
            debug!(
                length = header.count,
                limit = self.limits.max_array_length,
                "array rejected by length limit"
            );
            return Err(Error::ArrayLengthLimitExceeded {
                length: header.count,
                limit: self.limits.max_array_length,
            });
        }
        self.check_depth(depth + 1)?;

        let inline = content[header.value_offset..].trim();
        if !inline.is_empty() {
            let tokens = syntax::split_delimited(inline, header.delimiter);
            if tokens.len() != header.count {
                return Err(Error::CountMismatch {
                    expected: header.count,
                    actual: tokens.len(),
                    line: number,
                });
            }
            return tokens
                .into_iter()
                .map(syntax::classify_primitive)
                .collect::<Result<Vec<_>>>()
                .map(Value::Array);
        }

        if header.count == 0 {
            return Ok(Value::Array(Vec::new()));
        }

        match &header.fields {
            Some(fields) => self.parse_tabular_rows(header, fields, number, depth + 1),
            None => self.parse_list_items(header, number, depth + 1),
        }
    }

    /// Returns the next line of an array block, which must sit at `item_depth`.
    fn next_block_line(
        &mut self,
        item_depth: usize,
        expected: usize,
        found: usize,
        header_line: usize,
    ) -> Result<Line<'a>> {
        let short = Error::CountMismatch {
            expected,
            actual: found,
            line: header_line,
        };
        let Some(line) = self.lines.get(self.pos).copied() else {
            return Err(short);
        };
        if line.blank {
            return match self.peek_nonblank() {
                Some(idx) if self.lines[idx].depth >= item_depth => {
                    Err(Error::UnexpectedBlankLine { line: line.number })
                }
                _ => Err(short),
            };
        }
        if line.depth != item_depth {
            return Err(Error::invalid_indentation(line.number, item_depth, line.depth));
        }
        self.pos += 1;
        Ok(line)
    }

    /// Counts items beyond the declared length that still sit in the block.
    fn trailing_items(&self, item_depth: usize, list: bool) -> usize {
        self.lines[self.pos..]
            .iter()
            .filter(|l| !l.blank)
            .take_while(|l| l.depth >= item_depth)
            .filter(|l| l.depth == item_depth && (!list || l.content.starts_with('-')))
            .count()
    }

    fn parse_tabular_rows(
        &mut self,
        header: &ArrayHeader,
        fields: &[String],
        number: usize,
        item_depth: usize,
    ) -> Result<Value> {
        self.check_depth(item_depth + 1)?;
        self.check_keys(fields.len())?;

        let remaining = self.lines.len() - self.pos;
        let mut rows = Vec::with_capacity(header.count.min(remaining));
        for _ in 0..header.count {
            let line = self.next_block_line(item_depth, header.count, rows.len(), number)?;
            let cells = syntax::split_delimited(line.content, header.delimiter);
            if cells.len() != fields.len() {
                return Err(Error::FieldCountMismatch {
                    expected: fields.len(),
                    actual: cells.len(),
                    line: line.number,
                });
            }
            let mut row = ToonMap::with_capacity(fields.len());
            for (field, cell) in fields.iter().zip(cells) {
                row.insert(field.clone(), syntax::classify_primitive(cell)?);
            }
            rows.push(Value::Object(row));
        }

        let extra = self.trailing_items(item_depth, false);
        if extra > 0 {
            return Err(Error::CountMismatch {
                expected: header.count,
                actual: header.count + extra,
                line: number,
            });
        }
        Ok(Value::Array(rows))
    }

    fn parse_list_items(
        &mut self,
        header: &ArrayHeader,
        number: usize,
        item_depth: usize,
    ) -> Result<Value> {
        let remaining = self.lines.len() - self.pos;
        let mut items = Vec::with_capacity(header.count.min(remaining));
        for _ in 0..header.count {
            let line = self.next_block_line(item_depth, header.count, items.len(), number)?;
            let item = if line.content.trim_end() == "-" {
                self.check_depth(item_depth + 1)?;
                Value::Object(ToonMap::new())
            } else if let Some(rest) = line.content.strip_prefix("- ") {
                self.parse_list_item(rest, line.number, item_depth)?
            } else {
                return Err(Error::invalid_format(
                    line.number,
                    "expected list item starting with '- '",
                ));
            };
            items.push(item);
        }

        let extra = self.trailing_items(item_depth, true);
        if extra > 0 {
            return Err(Error::CountMismatch {
                expected: header.count,
                actual: header.count + extra,
                line: number,
            });
        }
        Ok(Value::Array(items))
    }

    /// Parses the text after a `- ` marker on a line at `depth`.
    fn parse_list_item(&mut self, rest: &str, number: usize, depth: usize) -> Result<Value> {
        let rest = rest.trim_start();
        if rest.trim().is_empty() {
            return Ok(Value::Object(ToonMap::new()));
        }

        let has_separator = syntax::find_key_separator(rest).is_some();
        let header = match syntax::parse_header(rest, number) {
            Ok(header) => header,
            Err(_) if !has_separator => None,
            Err(err) => return Err(err),
        };

        match header {
            Some(header) if header.key.is_none() => self.parse_array(&header, rest, number, depth),
            Some(_) => self.parse_list_object(rest, number, depth),
            None if has_separator => self.parse_list_object(rest, number, depth),
            None => syntax::classify_primitive(rest),
        }
    }

    /// An object whose first field shares the dash line; the rest follow one level deeper.
    fn parse_list_object(&mut self, first: &str, number: usize, depth: usize) -> Result<Value> {
        let field_depth = depth + 1;
        self.check_depth(field_depth)?;
        let mut map = ToonMap::new();
        self.parse_field(first, number, field_depth, &mut map)?;
        self.parse_object_into(field_depth, &mut map)?;
        Ok(Value::Object(map))
    }
}

/// Rejects documents larger than `max_input_size` before any scanning.
pub(crate) fn check_input_size(size: usize, limits: &DecodingLimits) -> Result<()> {
    if size > limits.max_input_size {
        debug!(
            size,
            limit = limits.max_input_size,
            "input rejected by size limit"
        );
        return Err(Error::InputTooLarge {
            size,
            limit: limits.max_input_size,
        });
    }
    Ok(())
}

fn split_lines(input: &str, indent: usize) -> Vec<Line<'_>> {
    input
        .lines()
        .enumerate()
        .map(|(i, raw)| {
            let spaces = syntax::indentation(raw);
            let content = &raw[spaces..];
            Line {
                number: i + 1,
                depth: spaces / indent,
                content,
                blank: content.trim().is_empty(),
            }
        })
        .collect()
}

/// A serde deserializer that reads from a [`Value`].
///
/// Integer targets accept only `Int` values that fit their width; wider
/// unsigned and 128-bit targets also accept a decimal string, which is how
/// [`crate::to_value`] stores values outside the `i64` range.
///
/// # Examples
///
/// ```rust
/// use serde::Deserialize;
/// use toon_value::{de::Deserializer, toon};
///
/// #[derive(Deserialize)]
/// struct Point { x: i8, y: i8 }
///
/// let point = Point::deserialize(Deserializer::new(toon!({ "x": 1, "y": -2 }))).unwrap();
/// assert_eq!((point.x, point.y), (1, -2));
///
/// let err = i8::deserialize(Deserializer::new(toon!(200))).unwrap_err();
/// assert!(err.to_string().contains("does not fit in i8"));
/// ```
pub struct Deserializer {
    value: Value,
}

impl Deserializer {
    pub fn new(value: Value) -> Self {
        Deserializer { value }
    }

    /// Parses `input` and wraps the resulting tree.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(input: &str, options: &DecodeOptions) -> Result<Self> {
        Parser::new(input, options).parse().map(Deserializer::new)
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::type_mismatch(expected, self.value.type_name())
    }

    /// Reads an integer that must fit `T`, naming `ty` in overflow errors.
    fn integer<T>(self, ty: &str) -> Result<T>
    where
        T: TryFrom<i64>,
    {
        match self.value {
            Value::Int(i) => T::try_from(i)
                .map_err(|_| Error::data_corrupted(format!("Value {} does not fit in {}", i, ty))),
            _ => Err(self.mismatch(ty)),
        }
    }

    /// Like [`Deserializer::integer`] but also accepts a decimal string whose
    /// value lies outside the `i64` range.
    fn wide_integer<T>(self, ty: &str) -> Result<T>
    where
        T: TryFrom<i64> + std::str::FromStr,
    {
        if let Value::String(s) = &self.value {
            let digits = s.strip_prefix('-').unwrap_or(s);
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                if s.parse::<i64>().is_ok() {
                    return Err(self.mismatch(ty));
                }
                return s.parse::<T>().map_err(|_| {
                    Error::data_corrupted(format!("Value {} does not fit in {}", s, ty))
                });
            }
        }
        self.integer(ty)
    }
}

macro_rules! deserialize_integer {
    ($($method:ident => $visit:ident($ty:ty) via $read:ident;)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                visitor.$visit(self.$read::<$ty>(stringify!($ty))?)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for Deserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Int(i) => visitor.visit_i64(i),
            Value::Float(f) => visitor.visit_f64(f),
            Value::String(s) => visitor.visit_string(s),
            Value::Array(arr) => visitor.visit_seq(SeqDeserializer::new(arr)),
            Value::Object(obj) => visitor.visit_map(MapDeserializer::new(obj)),
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Bool(b) => visitor.visit_bool(b),
            _ => Err(self.mismatch("bool")),
        }
    }

    deserialize_integer! {
        deserialize_i8 => visit_i8(i8) via integer;
        deserialize_i16 => visit_i16(i16) via integer;
        deserialize_i32 => visit_i32(i32) via integer;
        deserialize_i64 => visit_i64(i64) via integer;
        deserialize_u8 => visit_u8(u8) via integer;
        deserialize_u16 => visit_u16(u16) via integer;
        deserialize_u32 => visit_u32(u32) via integer;
        deserialize_u64 => visit_u64(u64) via wide_integer;
        deserialize_i128 => visit_i128(i128) via wide_integer;
        deserialize_u128 => visit_u128(u128) via wide_integer;
    }

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Float(f) => visitor.visit_f32(f as f32),
            Value::Int(i) => visitor.visit_f32(i as f32),
            _ => Err(self.mismatch("f32")),
        }
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Float(f) => visitor.visit_f64(f),
            Value::Int(i) => visitor.visit_f64(i as f64),
            _ => Err(self.mismatch("f64")),
        }
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        if let Value::String(s) = &self.value {
            let mut chars = s.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return visitor.visit_char(c);
            }
        }
        Err(self.mismatch("char"))
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::String(s) => visitor.visit_string(s),
            _ => Err(self.mismatch("string")),
        }
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_unit(),
            _ => Err(self.mismatch("null")),
        }
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Array(arr) => visitor.visit_seq(SeqDeserializer::new(arr)),
            _ => Err(self.mismatch("array")),
        }
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Object(obj) => visitor.visit_map(MapDeserializer::new(obj)),
            _ => Err(self.mismatch("object")),
        }
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::String(variant) => visitor.visit_enum(EnumDeserializer::new(variant, None)),
            Value::Object(obj) if obj.len() == 1 => {
                let Some((variant, value)) = obj.into_iter().next() else {
                    return Err(Error::custom("empty enum object"));
                };
                visitor.visit_enum(EnumDeserializer::new(variant, Some(value)))
            }
            _ => Err(self.mismatch("enum")),
        }
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_unit()
    }
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
}

impl SeqDeserializer {
    fn new(vec: Vec<Value>) -> Self {
        SeqDeserializer {
            iter: vec.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed.deserialize(Deserializer::new(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapDeserializer {
    iter: indexmap::map::IntoIter<String, Value>,
    value: Option<Value>,
}

impl MapDeserializer {
    fn new(map: ToonMap) -> Self {
        MapDeserializer {
            iter: map.into_iter(),
            value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(MapKeyDeserializer { key }).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(Deserializer::new(value)),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

/// Object keys are always strings; numeric map keys are parsed from them.
struct MapKeyDeserializer {
    key: String,
}

macro_rules! deserialize_key_number {
    ($($method:ident => $visit:ident($ty:ty);)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                let n = self.key.parse::<$ty>().map_err(|_| {
                    Error::type_mismatch(stringify!($ty), format!("key '{}'", self.key))
                })?;
                visitor.$visit(n)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for MapKeyDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_string(self.key)
    }

    deserialize_key_number! {
        deserialize_i8 => visit_i8(i8);
        deserialize_i16 => visit_i16(i16);
        deserialize_i32 => visit_i32(i32);
        deserialize_i64 => visit_i64(i64);
        deserialize_u8 => visit_u8(u8);
        deserialize_u16 => visit_u16(u16);
        deserialize_u32 => visit_u32(u32);
        deserialize_u64 => visit_u64(u64);
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_enum(EnumDeserializer::new(self.key, None))
    }

    forward_to_deserialize_any! {
        bool i128 u128 f32 f64 char str string bytes byte_buf unit unit_struct
        seq tuple tuple_struct map struct identifier ignored_any
    }
}

struct EnumDeserializer {
    variant: String,
    value: Option<Value>,
}

impl EnumDeserializer {
    fn new(variant: String, value: Option<Value>) -> Self {
        EnumDeserializer { variant, value }
    }
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(Deserializer::new(Value::String(self.variant)))?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: Option<Value>,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.value {
            Some(Value::Null) | None => Ok(()),
            Some(other) => Err(Error::type_mismatch("unit variant", other.type_name())),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.value {
            Some(value) => seed.deserialize(Deserializer::new(value)),
            None => Err(Error::type_mismatch("newtype variant", "unit variant")),
        }
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Some(Value::Array(arr)) => visitor.visit_seq(SeqDeserializer::new(arr)),
            Some(other) => Err(Error::type_mismatch("tuple variant", other.type_name())),
            None => Err(Error::type_mismatch("tuple variant", "unit variant")),
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Some(Value::Object(obj)) => visitor.visit_map(MapDeserializer::new(obj)),
            Some(other) => Err(Error::type_mismatch("struct variant", other.type_name())),
            None => Err(Error::type_mismatch("struct variant", "unit variant")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toon;

    fn parse(input: &str) -> Result<Value> {
        Parser::new(input, &DecodeOptions::default()).parse()
    }

    #[test]
    fn test_nested_objects() {
        let value = parse("user:\n  name: Ada\n  address:\n    city: London\nactive: true").unwrap();
        assert_eq!(
            value,
            toon!({
                "user": { "name": "Ada", "address": { "city": "London" } },
                "active": true
            })
        );
    }

    #[test]
    fn test_empty_nested_object() {
        let value = parse("meta:\nnext: 1").unwrap();
        assert_eq!(value, toon!({ "meta": {}, "next": 1 }));
    }

    #[test]
    fn test_blank_lines_between_fields() {
        let value = parse("a: 1\n\n\nb: 2\n\n").unwrap();
        assert_eq!(value, toon!({ "a": 1, "b": 2 }));
    }

    #[test]
    fn test_crlf_input() {
        let value = parse("a: 1\r\nb:\r\n  c: x\r\n").unwrap();
        assert_eq!(value, toon!({ "a": 1, "b": { "c": "x" } }));
    }

    #[test]
    fn test_list_item_object_layout() {
        let input = "items[2]:\n  - id: 1\n    tags[2]: a,b\n  - id: 2\n    meta:\n      ok: true";
        let value = parse(input).unwrap();
        assert_eq!(
            value,
            toon!({ "items": [
                { "id": 1, "tags": ["a", "b"] },
                { "id": 2, "meta": { "ok": true } }
            ] })
        );
    }

    #[test]
    fn test_list_item_first_field_nested_two_levels() {
        let input = "items[1]:\n  - info:\n      x: 1\n    y: 2";
        let value = parse(input).unwrap();
        assert_eq!(value, toon!({ "items": [ { "info": { "x": 1 }, "y": 2 } ] }));
    }

    #[test]
    fn test_bare_dash_is_empty_object() {
        let value = parse("items[2]:\n  -\n  - 3").unwrap();
        assert_eq!(value, toon!({ "items": [ {}, 3 ] }));
    }

    #[test]
    fn test_nested_anonymous_arrays() {
        let input = "[2]:\n  - [2]: 1,2\n  - [1]:\n    - x: 1";
        let value = parse(input).unwrap();
        assert_eq!(value, toon!([[1, 2], [{ "x": 1 }]]));
    }

    #[test]
    fn test_list_item_with_brackets_is_primitive() {
        let value = parse("todo[1]:\n  - [x] done").unwrap();
        assert_eq!(value, toon!({ "todo": ["[x] done"] }));
    }

    #[test]
    fn test_extra_rows_are_count_mismatch() {
        let err = parse("rows[1]{a}:\n  1\n  2").unwrap_err();
        assert_eq!(
            err,
            Error::CountMismatch {
                expected: 1,
                actual: 2,
                line: 1
            }
        );
    }

    #[test]
    fn test_blank_line_inside_block() {
        let err = parse("items[2]:\n  - a\n\n  - b").unwrap_err();
        assert_eq!(err, Error::UnexpectedBlankLine { line: 3 });

        let err = parse("items[3]:\n  - a\n  - b\n\n").unwrap_err();
        assert!(matches!(err, Error::CountMismatch { expected: 3, actual: 2, .. }));
    }

    #[test]
    fn test_list_item_in_object_context() {
        let err = parse("a: 1\n- b").unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { line: 2, .. }));
    }

    #[test]
    fn test_root_array_trailing_content() {
        let err = parse("[1]: a\nb: 2").unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { line: 2, .. }));
    }

    #[test]
    fn test_keyless_header_inside_object() {
        let err = parse("a: 1\n[2]: x,y").unwrap_err();
        assert!(matches!(err, Error::InvalidHeader { line: 2, .. }));
    }

    #[test]
    fn test_path_expansion_merges() {
        let options = DecodeOptions::new().with_expand_paths(PathExpansion::Safe);
        let value = Parser::new("a.b: 1\na.c: 2\n\"x.y\": 3\nz.1: 4", &options)
            .parse()
            .unwrap();
        assert_eq!(
            value,
            toon!({ "a": { "b": 1, "c": 2 }, "x.y": 3, "z.1": 4 })
        );
    }

    #[test]
    fn test_path_expansion_collision() {
        let options = DecodeOptions::new().with_expand_paths(PathExpansion::Safe);
        let err = Parser::new("a: 1\na.b: 2", &options).parse().unwrap_err();
        assert_eq!(
            err,
            Error::PathCollision {
                path: "a".to_string(),
                line: 2
            }
        );
    }

    #[test]
    fn test_depth_limit() {
        let options = DecodeOptions::new()
            .with_limits(DecodingLimits::default().with_max_depth(2));
        assert!(Parser::new("a:\n  b:\n    c: 1", &options).parse().is_ok());
        let err = Parser::new("a:\n  b:\n    c:\n      d: 1", &options)
            .parse()
            .unwrap_err();
        assert_eq!(err, Error::DepthLimitExceeded { depth: 3, limit: 2 });

        let value = Parser::new("a:\n  b:\n    c:", &options).parse().unwrap();
        assert_eq!(value, toon!({ "a": { "b": { "c": {} } } }));
    }

    #[test]
    fn test_input_size_checked_first() {
        let options =
            DecodeOptions::new().with_limits(DecodingLimits::default().with_max_input_size(8));
        let err = Parser::new("a:\n  b: [", &options).parse().unwrap_err();
        assert_eq!(err, Error::InputTooLarge { size: 9, limit: 8 });
        assert!(Parser::new("a: 1", &options).parse().is_ok());
    }

    #[test]
    fn test_key_limit() {
        let options = DecodeOptions::new()
            .with_limits(DecodingLimits::default().with_max_object_keys(2));
        let err = Parser::new("a: 1\nb: 2\nc: 3", &options).parse().unwrap_err();
        assert_eq!(err, Error::ObjectKeyLimitExceeded { count: 3, limit: 2 });
    }

    #[test]
    fn test_deserializer_enum_shapes() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        enum Shape {
            Empty,
            Circle(f64),
            Rect { w: u32, h: u32 },
        }

        let shapes: Vec<Shape> = de::Deserialize::deserialize(Deserializer::new(toon!([
            "Empty",
            { "Circle": 1.5 },
            { "Rect": { "w": 2, "h": 3 } }
        ])))
        .unwrap();
        assert_eq!(
            shapes,
            vec![Shape::Empty, Shape::Circle(1.5), Shape::Rect { w: 2, h: 3 }]
        );
    }

    #[test]
    fn test_deserializer_integer_widths() {
        use serde::Deserialize;

        let err = u8::deserialize(Deserializer::new(Value::Int(-1))).unwrap_err();
        assert_eq!(err, Error::DataCorrupted("Value -1 does not fit in u8".to_string()));

        let big = u64::deserialize(Deserializer::new(Value::from("18446744073709551615"))).unwrap();
        assert_eq!(big, u64::MAX);

        let err = i32::deserialize(Deserializer::new(Value::from("12"))).unwrap_err();
        assert_eq!(err, Error::type_mismatch("i32", "string"));

        let err = u64::deserialize(Deserializer::new(Value::from("12"))).unwrap_err();
        assert_eq!(err, Error::type_mismatch("u64", "string"));

        let err = i64::deserialize(Deserializer::new(Value::Float(1.0))).unwrap_err();
        assert_eq!(err, Error::type_mismatch("i64", "float"));
    }

    #[test]
    fn test_deserializer_numeric_map_keys() {
        use serde::Deserialize;
        use std::collections::BTreeMap;

        let map = BTreeMap::<u32, String>::deserialize(Deserializer::new(toon!({ "1": "a", "20": "b" })))
            .unwrap();
        assert_eq!(map.get(&20).map(String::as_str), Some("b"));
    }
}
