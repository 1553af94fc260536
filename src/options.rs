//! Configuration options for TOON encoding and decoding.
//!
//! - [`ToonOptions`]: encoder configuration (indent width, delimiter, length marker)
//! - [`DecodeOptions`]: decoder configuration (indent width, path expansion, limits)
//! - [`DecodingLimits`]: resource limits applied while decoding untrusted input
//!
//! ## Examples
//!
//! ```rust
//! use toon_value::{encode, toon, Delimiter, LengthMarker, ToonOptions};
//!
//! let options = ToonOptions::new()
//!     .with_delimiter(Delimiter::Pipe)
//!     .with_length_marker(LengthMarker::Hash);
//! let toon = encode(&toon!({ "tags": ["a", "b", "c"] }), &options);
//! assert_eq!(toon, "tags[#3|]: a|b|c");
//! ```

/// Delimiter choice for inline arrays and tabular rows.
///
/// Comma is the default and is never written into headers; tab and pipe are
/// announced by their literal character right before the closing `]`.
///
/// # Examples
///
/// ```rust
/// use toon_value::Delimiter;
///
/// assert_eq!(Delimiter::Comma.as_char(), ',');
/// assert_eq!(Delimiter::Tab.as_str(), "\t");
/// assert_eq!(Delimiter::from_header_char('|'), Some(Delimiter::Pipe));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Delimiter {
    #[default]
    Comma,
    Tab,
    Pipe,
}

impl Delimiter {
    /// All delimiters, in declaration order.
    pub const ALL: [Delimiter; 3] = [Delimiter::Comma, Delimiter::Tab, Delimiter::Pipe];

    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Tab => '\t',
            Delimiter::Pipe => '|',
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Delimiter::Comma => ",",
            Delimiter::Tab => "\t",
            Delimiter::Pipe => "|",
        }
    }

    /// The suffix written inside an array header's brackets.
    #[must_use]
    pub const fn header_suffix(self) -> &'static str {
        match self {
            Delimiter::Comma => "",
            Delimiter::Tab => "\t",
            Delimiter::Pipe => "|",
        }
    }

    /// Maps a header delimiter character (the one before `]`) back to a delimiter.
    #[must_use]
    pub const fn from_header_char(ch: char) -> Option<Delimiter> {
        match ch {
            '\t' => Some(Delimiter::Tab),
            '|' => Some(Delimiter::Pipe),
            _ => None,
        }
    }
}

/// Optional marker written before an array's declared length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LengthMarker {
    #[default]
    None,
    /// `[#3]` instead of `[3]`
    Hash,
}

impl LengthMarker {
    pub const ALL: [LengthMarker; 2] = [LengthMarker::None, LengthMarker::Hash];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LengthMarker::None => "",
            LengthMarker::Hash => "#",
        }
    }
}

/// Configuration options for TOON encoding.
///
/// # Examples
///
/// ```rust
/// use toon_value::{ToonOptions, Delimiter, LengthMarker};
///
/// let options = ToonOptions::new()
///     .with_delimiter(Delimiter::Tab)
///     .with_length_marker(LengthMarker::Hash)
///     .with_indent(4);
/// assert_eq!(options.indent, 4);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToonOptions {
    /// Spaces per nesting level
    pub indent: usize,
    pub delimiter: Delimiter,
    pub length_marker: LengthMarker,
}

impl Default for ToonOptions {
    fn default() -> Self {
        ToonOptions {
            indent: 2,
            delimiter: Delimiter::default(),
            length_marker: LengthMarker::default(),
        }
    }
}

impl ToonOptions {
    /// Creates default options (2-space indent, comma delimiter, no length marker).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the indentation size (number of spaces per level).
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the delimiter for inline arrays and tabular rows.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets the length marker written in array headers.
    #[must_use]
    pub fn with_length_marker(mut self, marker: LengthMarker) -> Self {
        self.length_marker = marker;
        self
    }

    pub(crate) fn indent_width(&self) -> usize {
        self.indent.max(1)
    }
}

/// Dotted-key handling while decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PathExpansion {
    /// Dotted keys stay literal strings.
    #[default]
    Disabled,
    /// Unquoted keys such as `a.b.c` whose segments are all identifiers are
    /// expanded into nested objects; overwriting a non-object is a collision.
    Safe,
}

/// Limits applied while decoding to guard against hostile or malformed input.
///
/// # Examples
///
/// ```rust
/// use toon_value::DecodingLimits;
///
/// let limits = DecodingLimits::default();
/// assert_eq!(limits.max_input_size, 10 * 1024 * 1024);
/// assert_eq!(limits.max_depth, 128);
///
/// let strict = DecodingLimits::default().with_max_array_length(2);
/// assert_eq!(strict.max_array_length, 2);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DecodingLimits {
    /// Maximum input size in bytes
    pub max_input_size: usize,
    /// Maximum nesting depth
    pub max_depth: usize,
    /// Maximum number of keys in a single object
    pub max_object_keys: usize,
    /// Maximum declared length of a single array
    pub max_array_length: usize,
}

impl Default for DecodingLimits {
    fn default() -> Self {
        DecodingLimits {
            max_input_size: 10 * 1024 * 1024,
            max_depth: 128,
            max_object_keys: 10_000,
            max_array_length: 100_000,
        }
    }
}

impl DecodingLimits {
    /// No limits. Use on trusted input only.
    #[must_use]
    pub const fn unlimited() -> Self {
        DecodingLimits {
            max_input_size: usize::MAX,
            max_depth: usize::MAX,
            max_object_keys: usize::MAX,
            max_array_length: usize::MAX,
        }
    }

    #[must_use]
    pub fn with_max_input_size(mut self, bytes: usize) -> Self {
        self.max_input_size = bytes;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    #[must_use]
    pub fn with_max_object_keys(mut self, keys: usize) -> Self {
        self.max_object_keys = keys;
        self
    }

    #[must_use]
    pub fn with_max_array_length(mut self, length: usize) -> Self {
        self.max_array_length = length;
        self
    }
}

/// Configuration options for TOON decoding.
///
/// # Examples
///
/// ```rust
/// use toon_value::{DecodeOptions, DecodingLimits, PathExpansion};
///
/// let options = DecodeOptions::new()
///     .with_expand_paths(PathExpansion::Safe)
///     .with_limits(DecodingLimits::unlimited());
/// assert_eq!(options.indent, 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Spaces per nesting level
    pub indent: usize,
    pub expand_paths: PathExpansion,
    pub limits: DecodingLimits,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            indent: 2,
            expand_paths: PathExpansion::default(),
            limits: DecodingLimits::default(),
        }
    }
}

impl DecodeOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    #[must_use]
    pub fn with_expand_paths(mut self, expand_paths: PathExpansion) -> Self {
        self.expand_paths = expand_paths;
        self
    }

    #[must_use]
    pub fn with_limits(mut self, limits: DecodingLimits) -> Self {
        self.limits = limits;
        self
    }

    pub(crate) fn indent_width(&self) -> usize {
        self.indent.max(1)
    }
}
