//! # toon_value
//!
//! A parser, encoder and serde binding for TOON (Token-Oriented Object Notation).
//!
//! ## What is TOON?
//!
//! TOON is a line-oriented, indentation-based text format for JSON-like data.
//! Arrays declare their length in a header, and uniform arrays of objects
//! collapse into a table with one field list and one row per element:
//!
//! ```text
//! users[2]{id,name}:
//!   1,Ada
//!   2,Grace
//! ```
//!
//! ## Key Features
//!
//! - **Dynamic values**: [`decode`] and [`encode`] convert between text and a [`Value`] tree
//! - **Serde compatible**: any `Serialize`/`Deserialize` type goes through [`to_string`] and [`from_str`]
//! - **Validated**: declared counts, field counts and indentation are checked on decode
//! - **Bounded**: [`DecodingLimits`] reject oversized or deeply nested input early
//! - **Ordered**: object keys keep their insertion order through a round trip
//!
//! ## Quick Start
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use toon_value::{from_str, to_string};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct User {
//!     id: u32,
//!     name: String,
//!     active: bool,
//! }
//!
//! let user = User { id: 123, name: "Alice".to_string(), active: true };
//!
//! let text = to_string(&user).unwrap();
//! assert_eq!(text, "id: 123\nname: Alice\nactive: true");
//!
//! let back: User = from_str(&text).unwrap();
//! assert_eq!(user, back);
//! ```
//!
//! ### Dynamic values
//!
//! ```rust
//! use toon_value::{decode, encode, toon, DecodeOptions, ToonOptions, Value};
//!
//! let value = decode("tags[3]: rust,serde,toon\nmeta:\n  stars: 5", &DecodeOptions::default()).unwrap();
//! assert_eq!(value.get("meta").and_then(|m| m.get("stars")), Some(&Value::Int(5)));
//!
//! let built = toon!({ "tags": ["rust", "serde", "toon"], "meta": { "stars": 5 } });
//! assert_eq!(value, built);
//! assert_eq!(encode(&built, &ToonOptions::default()), "tags[3]: rust,serde,toon\nmeta:\n  stars: 5");
//! ```
//!
//! ### Dotted keys
//!
//! ```rust
//! use toon_value::{decode, toon, DecodeOptions, PathExpansion};
//!
//! let options = DecodeOptions::new().with_expand_paths(PathExpansion::Safe);
//! let value = decode("server.host: localhost\nserver.port: 8080", &options).unwrap();
//! assert_eq!(value, toon!({ "server": { "host": "localhost", "port": 8080 } }));
//! ```

pub mod de;
pub mod error;
pub mod macros;
pub mod map;
pub mod options;
pub mod ser;
pub mod syntax;
pub mod value;

pub use de::{Deserializer, Parser};
pub use error::{Error, Result};
pub use map::ToonMap;
pub use options::{
    DecodeOptions, DecodingLimits, Delimiter, LengthMarker, PathExpansion, ToonOptions,
};
pub use ser::{Encoder, ValueSerializer};
pub use value::Value;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{self, Read};
use tracing::debug;

/// Decodes TOON text into a [`Value`] tree.
///
/// # Examples
///
/// ```rust
/// use toon_value::{decode, DecodeOptions, Value};
///
/// let value = decode("[2]{id,ok}:\n  1,true\n  2,false", &DecodeOptions::default()).unwrap();
/// let rows = value.as_array().unwrap();
/// assert_eq!(rows[1].get("ok"), Some(&Value::Bool(false)));
/// ```
///
/// # Errors
///
/// Returns the first grammar violation, count mismatch, escape error,
/// path collision or limit breach found in the input.
pub fn decode(text: &str, options: &DecodeOptions) -> Result<Value> {
    debug!(
        bytes = text.len(),
        indent = options.indent,
        expand_paths = ?options.expand_paths,
        "decoding TOON"
    );
    Parser::new(text, options).parse()
}

/// Encodes a [`Value`] tree as TOON text.
///
/// Encoding cannot fail: non-finite floats are written as `null`.
///
/// # Examples
///
/// ```rust
/// use toon_value::{encode, toon, ToonOptions};
///
/// let text = encode(&toon!({ "ratio": 2.0, "bad": (f64::NAN) }), &ToonOptions::default());
/// assert_eq!(text, "ratio: 2.0\nbad: null");
/// ```
#[must_use]
pub fn encode(value: &Value, options: &ToonOptions) -> String {
    debug!(
        indent = options.indent,
        delimiter = options.delimiter.as_str(),
        length_marker = options.length_marker.as_str(),
        "encoding TOON"
    );
    Encoder::new(options).encode(value)
}

/// Serialize any `T: Serialize` to a TOON string.
///
/// # Examples
///
/// ```rust
/// use toon_value::to_string;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// assert_eq!(to_string(&Point { x: 1, y: 2 }).unwrap(), "x: 1\ny: 2");
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be represented (e.g. a map with
/// non-string keys).
pub fn to_string<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    to_string_with_options(value, &ToonOptions::default())
}

/// Serialize any `T: Serialize` to a TOON string with custom options.
///
/// # Examples
///
/// ```rust
/// use toon_value::{to_string_with_options, Delimiter, LengthMarker, ToonOptions};
///
/// let options = ToonOptions::new()
///     .with_delimiter(Delimiter::Tab)
///     .with_length_marker(LengthMarker::Hash);
/// let text = to_string_with_options(&vec![1, 2], &options).unwrap();
/// assert_eq!(text, "[#2\t]: 1\t2");
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be represented.
pub fn to_string_with_options<T>(value: &T, options: &ToonOptions) -> Result<String>
where
    T: ?Sized + Serialize,
{
    Ok(encode(&to_value(value)?, options))
}

/// Convert any `T: Serialize` to a [`Value`].
///
/// # Examples
///
/// ```rust
/// use toon_value::{to_value, Value};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let value: Value = to_value(&Point { x: 1, y: 2 }).unwrap();
/// assert!(value.is_object());
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be represented.
pub fn to_value<T>(value: &T) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    value.serialize(ValueSerializer)
}

/// Serialize any `T: Serialize` to a writer in TOON format.
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
pub fn to_writer<W, T>(writer: W, value: &T) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    to_writer_with_options(writer, value, &ToonOptions::default())
}

/// Serialize any `T: Serialize` to a writer in TOON format with custom options.
///
/// # Examples
///
/// ```rust
/// use toon_value::{to_writer_with_options, ToonOptions};
///
/// let mut buffer = Vec::new();
/// to_writer_with_options(&mut buffer, &vec!["a", "b"], &ToonOptions::new()).unwrap();
/// assert_eq!(buffer, b"[2]: a,b");
/// ```
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
pub fn to_writer_with_options<W, T>(mut writer: W, value: &T, options: &ToonOptions) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    let text = to_string_with_options(value, options)?;
    writer
        .write_all(text.as_bytes())
        .map_err(|e| Error::io(&e.to_string()))?;
    Ok(())
}

/// Deserialize an instance of type `T` from a string of TOON text.
///
/// # Examples
///
/// ```rust
/// use toon_value::from_str;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, PartialEq, Debug)]
/// struct Point { x: i32, y: i32 }
///
/// let point: Point = from_str("x: 1\ny: 2").unwrap();
/// assert_eq!(point, Point { x: 1, y: 2 });
/// ```
///
/// # Errors
///
/// Returns an error if the input is not valid TOON or does not fit `T`.
pub fn from_str<T>(s: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    from_str_with_options(s, &DecodeOptions::default())
}

/// Deserialize an instance of type `T` from TOON text with custom decode options.
///
/// # Examples
///
/// ```rust
/// use toon_value::{from_str_with_options, DecodeOptions, DecodingLimits, Error};
///
/// let options = DecodeOptions::new().with_limits(DecodingLimits::default().with_max_array_length(2));
/// let err = from_str_with_options::<Vec<u8>>("[3]: 1,2,3", &options).unwrap_err();
/// assert!(matches!(err, Error::ArrayLengthLimitExceeded { length: 3, limit: 2 }));
/// ```
///
/// # Errors
///
/// Returns an error if the input is not valid TOON, breaks a limit, or does not fit `T`.
pub fn from_str_with_options<T>(s: &str, options: &DecodeOptions) -> Result<T>
where
    T: DeserializeOwned,
{
    T::deserialize(Deserializer::from_str(s, options)?)
}

/// Deserialize an instance of type `T` from an I/O stream of TOON.
///
/// # Examples
///
/// ```rust
/// use toon_value::from_reader;
/// use std::io::Cursor;
///
/// let nums: Vec<i32> = from_reader(Cursor::new(b"[3]: 1,2,3")).unwrap();
/// assert_eq!(nums, vec![1, 2, 3]);
/// ```
///
/// # Errors
///
/// Returns an error if reading fails, the stream exceeds the default input
/// size limit, the input is not valid TOON, or does not fit `T`.
pub fn from_reader<R, T>(reader: R) -> Result<T>
where
    R: io::Read,
    T: DeserializeOwned,
{
    let limit = DecodeOptions::default().limits.max_input_size;
    let bound = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let mut bytes = Vec::new();
    reader
        .take(bound)
        .read_to_end(&mut bytes)
        .map_err(|e| Error::io(&e.to_string()))?;
    from_slice(&bytes)
}

/// Deserialize an instance of type `T` from bytes of TOON text.
///
/// # Examples
///
/// ```rust
/// use toon_value::{from_slice, Error};
///
/// let point: (i32, i32) = from_slice(b"[2]: 1,2").unwrap();
/// assert_eq!(point, (1, 2));
///
/// let err = from_slice::<String>(&[0x61, 0xff]).unwrap_err();
/// assert!(matches!(err, Error::InvalidFormat { .. }));
/// ```
///
/// # Errors
///
/// Returns an error if the bytes exceed the default input size limit, are not
/// valid UTF-8, are not valid TOON, or do not fit `T`.
pub fn from_slice<T>(v: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    de::check_input_size(v.len(), &DecodeOptions::default().limits)?;
    let s = std::str::from_utf8(v)
        .map_err(|e| Error::invalid_format(0, format!("input is not valid UTF-8: {}", e)))?;
    from_str(s)
}

/// Build a `T: Deserialize` from an existing [`Value`] tree.
///
/// # Examples
///
/// ```rust
/// use toon_value::{from_value, toon, Error};
///
/// let pair: (String, bool) = from_value(toon!(["on", true])).unwrap();
/// assert_eq!(pair, ("on".to_string(), true));
///
/// let err = from_value::<u8>(toon!(300)).unwrap_err();
/// assert_eq!(err, Error::DataCorrupted("Value 300 does not fit in u8".into()));
/// ```
///
/// # Errors
///
/// Returns an error if the tree does not fit `T`.
pub fn from_value<T>(value: Value) -> Result<T>
where
    T: DeserializeOwned,
{
    T::deserialize(Deserializer::new(value))
}
