//! TOON serialization.
//!
//! Encoding also happens in two stages:
//!
//! 1. [`ValueSerializer`] turns any `T: Serialize` into a [`Value`] tree.
//! 2. [`Encoder`] writes a `Value` tree as TOON text, picking the most compact
//!    layout for every array:
//!
//! - **Inline**: all-primitive arrays on one line (`tags[3]: a,b,c`)
//! - **Array of arrays**: one `- [N]: ...` line per primitive inner array
//! - **Tabular**: uniform objects as a field header plus one row per object
//! - **List**: everything else as `- ` prefixed blocks
//!
//! ## Usage
//!
//! ```rust
//! use toon_value::{to_string, to_string_with_options, Delimiter, ToonOptions};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct User { id: u32, name: String }
//!
//! let users = vec![
//!     User { id: 1, name: "Ada".into() },
//!     User { id: 2, name: "Grace".into() },
//! ];
//! assert_eq!(to_string(&users).unwrap(), "[2]{id,name}:\n  1,Ada\n  2,Grace");
//!
//! let piped = to_string_with_options(&users, &ToonOptions::new().with_delimiter(Delimiter::Pipe)).unwrap();
//! assert_eq!(piped, "[2|]{id|name}:\n  1|Ada\n  2|Grace");
//! ```

use crate::syntax::{encode_key, encode_string, format_header};
use crate::{Error, Result, ToonMap, ToonOptions, Value};
use serde::{ser, Serialize};
use tracing::trace;

/// Writes a [`Value`] tree as TOON text.
///
/// # Examples
///
/// ```rust
/// use toon_value::ser::Encoder;
/// use toon_value::{toon, ToonOptions};
///
/// let options = ToonOptions::new();
/// let text = Encoder::new(&options).encode(&toon!({ "a": { "b": [1, 2] } }));
/// assert_eq!(text, "a:\n  b[2]: 1,2");
/// ```
pub struct Encoder<'o> {
    options: &'o ToonOptions,
    lines: Vec<String>,
}

impl<'o> Encoder<'o> {
    pub fn new(options: &'o ToonOptions) -> Self {
        Encoder {
            options,
            lines: Vec::new(),
        }
    }

    /// Consumes the encoder and renders `value` as lines joined by `\n`.
    pub fn encode(mut self, value: &Value) -> String {
        match value {
            Value::Object(obj) => self.encode_object(obj, 0),
            Value::Array(arr) => self.encode_array(None, arr, 0),
            primitive => {
                let line = self.primitive(primitive);
                self.lines.push(line);
            }
        }
        self.lines.join("\n")
    }

    fn indent(&self, depth: usize) -> String {
        " ".repeat(depth * self.options.indent_width())
    }

    fn push(&mut self, depth: usize, text: &str) {
        let mut line = self.indent(depth);
        line.push_str(text);
        self.lines.push(line);
    }

    fn primitive(&self, value: &Value) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::String(s) => encode_string(s, self.options.delimiter),
            // Callers only pass primitives here
            Value::Array(_) | Value::Object(_) => "null".to_string(),
        }
    }

    fn join_primitives<'v>(&self, values: impl Iterator<Item = &'v Value>) -> String {
        values
            .map(|v| self.primitive(v))
            .collect::<Vec<_>>()
            .join(self.options.delimiter.as_str())
    }

    fn encode_object(&mut self, obj: &ToonMap, depth: usize) {
        for (key, value) in obj.iter() {
            self.encode_field(key, value, depth);
        }
    }

    fn encode_field(&mut self, key: &str, value: &Value, depth: usize) {
        match value {
            Value::Object(obj) => {
                self.push(depth, &format!("{}:", encode_key(key)));
                self.encode_object(obj, depth + 1);
            }
            Value::Array(arr) => self.encode_array(Some(key), arr, depth),
            primitive => {
                let line = format!("{}: {}", encode_key(key), self.primitive(primitive));
                self.push(depth, &line);
            }
        }
    }

    /// `[N]: a,b,c` for an all-primitive array, header only when empty.
    fn inline_array(&self, key: Option<&str>, arr: &[Value]) -> String {
        let mut line = format_header(key, arr.len(), None, self.options);
        if !arr.is_empty() {
            line.push(' ');
            line.push_str(&self.join_primitives(arr.iter()));
        }
        line
    }

    /// Writes an array whose header sits on a line at `depth`.
    fn encode_array(&mut self, key: Option<&str>, arr: &[Value], depth: usize) {
        if arr.iter().all(Value::is_primitive) {
            trace!(len = arr.len(), "inline array");
            let line = self.inline_array(key, arr);
            self.push(depth, &line);
            return;
        }

        let options = self.options;
        let header = |fields: Option<&[String]>| format_header(key, arr.len(), fields, options);

        if arr.iter().all(is_primitive_array) {
            trace!(len = arr.len(), "array of primitive arrays");
            let line = header(None);
            self.push(depth, &line);
            for inner in arr {
                if let Value::Array(inner) = inner {
                    let line = format!("- {}", self.inline_array(None, inner));
                    self.push(depth + 1, &line);
                }
            }
            return;
        }

        if let Some(fields) = tabular_fields(arr) {
            trace!(len = arr.len(), fields = fields.len(), "tabular array");
            let line = header(Some(&fields));
            self.push(depth, &line);
            for row in arr {
                if let Value::Object(obj) = row {
                    let cells = self.join_primitives(fields.iter().filter_map(|f| obj.get(f)));
                    self.push(depth + 1, &cells);
                }
            }
            return;
        }

        trace!(len = arr.len(), "list array");
        let line = header(None);
        self.push(depth, &line);
        for item in arr {
            self.encode_list_item(item, depth + 1);
        }
    }

    /// Writes one `- ` element whose dash sits at `depth`.
    fn encode_list_item(&mut self, item: &Value, depth: usize) {
        match item {
            Value::Array(arr) if arr.iter().all(Value::is_primitive) => {
                let line = format!("- {}", self.inline_array(None, arr));
                self.push(depth, &line);
            }
            Value::Array(arr) => {
                let first = self.lines.len();
                self.encode_array(None, arr, depth);
                self.dash(first, depth);
            }
            Value::Object(obj) if obj.is_empty() => self.push(depth, "-"),
            Value::Object(obj) => {
                let mut fields = obj.iter();
                if let Some((key, value)) = fields.next() {
                    let first = self.lines.len();
                    self.encode_field(key, value, depth + 1);
                    self.dash(first, depth);
                }
                for (key, value) in fields {
                    self.encode_field(key, value, depth + 1);
                }
            }
            primitive => {
                let line = format!("- {}", self.primitive(primitive));
                self.push(depth, &line);
            }
        }
    }

    /// Re-indents line `index` to `depth` and puts the list marker in front.
    fn dash(&mut self, index: usize, depth: usize) {
        if let Some(line) = self.lines.get(index) {
            let rewritten = format!("{}- {}", self.indent(depth), line.trim_start_matches(' '));
            self.lines[index] = rewritten;
        }
    }
}

fn is_primitive_array(value: &Value) -> bool {
    matches!(value, Value::Array(inner) if inner.iter().all(Value::is_primitive))
}

/// Field order for a tabular array, taken from the first row.
///
/// Every row must be an object with the same number of keys, each header
/// field present, and only primitive values. Rows may list their keys in a
/// different order; they are written in header order.
fn tabular_fields(arr: &[Value]) -> Option<Vec<String>> {
    let first = match arr.first() {
        Some(Value::Object(obj)) if !obj.is_empty() => obj,
        _ => return None,
    };
    let fields: Vec<String> = first.keys().cloned().collect();

    let uniform = arr.iter().all(|row| match row {
        Value::Object(obj) => {
            obj.len() == fields.len()
                && fields
                    .iter()
                    .all(|f| obj.get(f).map_or(false, Value::is_primitive))
        }
        _ => false,
    });
    uniform.then_some(fields)
}

/// Plain decimal, `.0` on whole values, `0` for negative zero, `null` when not finite.
fn format_float(f: f64) -> String {
    if !f.is_finite() {
        return "null".to_string();
    }
    if f == 0.0 && f.is_sign_negative() {
        return "0".to_string();
    }
    let mut s = f.to_string();
    if !s.contains('.') {
        s.push_str(".0");
    }
    s
}

/// A serde serializer that produces a [`Value`].
///
/// Enums are externally tagged: unit variants become their name, every other
/// variant becomes a single-key object. Integers outside the `i64` range are
/// stored as decimal strings.
///
/// # Examples
///
/// ```rust
/// use serde::Serialize;
/// use toon_value::{ser::ValueSerializer, toon};
///
/// #[derive(Serialize)]
/// enum Event { Started, Moved { x: i32 } }
///
/// assert_eq!(Event::Started.serialize(ValueSerializer).unwrap(), toon!("Started"));
/// assert_eq!(
///     Event::Moved { x: -1 }.serialize(ValueSerializer).unwrap(),
///     toon!({ "Moved": { "x": -1 } })
/// );
/// assert_eq!(u64::MAX.serialize(ValueSerializer).unwrap(), toon!("18446744073709551615"));
/// ```
pub struct ValueSerializer;

pub struct SerializeVec {
    vec: Vec<Value>,
}

pub struct SerializeTupleVariant {
    variant: &'static str,
    vec: Vec<Value>,
}

pub struct SerializeMap {
    map: ToonMap,
    current_key: Option<String>,
}

pub struct SerializeStructVariant {
    variant: &'static str,
    map: ToonMap,
}

fn wide_int<T>(v: T) -> Value
where
    T: Copy + ToString,
    i64: TryFrom<T>,
{
    i64::try_from(v)
        .map(Value::Int)
        .unwrap_or_else(|_| Value::String(v.to_string()))
}

fn tagged(variant: &'static str, value: Value) -> Value {
    let mut map = ToonMap::with_capacity(1);
    map.insert(variant.to_string(), value);
    Value::Object(map)
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = SerializeVec;
    type SerializeTupleVariant = SerializeTupleVariant;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeMap;
    type SerializeStructVariant = SerializeStructVariant;

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value> {
        Ok(Value::Int(i64::from(v)))
    }

    fn serialize_i16(self, v: i16) -> Result<Value> {
        Ok(Value::Int(i64::from(v)))
    }

    fn serialize_i32(self, v: i32) -> Result<Value> {
        Ok(Value::Int(i64::from(v)))
    }

    fn serialize_i64(self, v: i64) -> Result<Value> {
        Ok(Value::Int(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value> {
        Ok(wide_int(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value> {
        Ok(Value::Int(i64::from(v)))
    }

    fn serialize_u16(self, v: u16) -> Result<Value> {
        Ok(Value::Int(i64::from(v)))
    }

    fn serialize_u32(self, v: u32) -> Result<Value> {
        Ok(Value::Int(i64::from(v)))
    }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        Ok(wide_int(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Value> {
        Ok(wide_int(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        Ok(Value::Float(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<Value> {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value> {
        Ok(Value::Array(
            v.iter().map(|&b| Value::Int(i64::from(b))).collect(),
        ))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        Ok(tagged(variant, to_value(value)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeVec> {
        Ok(SerializeVec {
            vec: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeVec> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SerializeVec> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeTupleVariant> {
        Ok(SerializeTupleVariant {
            variant,
            vec: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<SerializeMap> {
        Ok(SerializeMap {
            map: ToonMap::with_capacity(len.unwrap_or(0)),
            current_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<SerializeMap> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeStructVariant> {
        Ok(SerializeStructVariant {
            variant,
            map: ToonMap::with_capacity(len),
        })
    }
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.vec.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Array(self.vec))
    }
}

impl ser::SerializeTuple for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.vec.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(tagged(self.variant, Value::Array(self.vec)))
    }
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = match to_value(key)? {
            Value::String(s) => s,
            Value::Int(i) => i.to_string(),
            other => {
                return Err(Error::unsupported_type(&format!(
                    "map key of type {}",
                    other.type_name()
                )))
            }
        };
        self.current_key = Some(key);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .current_key
            .take()
            .ok_or_else(|| Error::custom("serialize_value called without serialize_key"))?;
        self.map.insert(key, to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Object(self.map))
    }
}

impl ser::SerializeStruct for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.map.insert(key.to_string(), to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Object(self.map))
    }
}

impl ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.map.insert(key.to_string(), to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(tagged(self.variant, Value::Object(self.map)))
    }
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    value.serialize(ValueSerializer)
}
