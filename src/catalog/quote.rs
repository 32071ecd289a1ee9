//! String literal quoting for catalog values.
//!
//! Catalog files quote every value the way Go's `strconv.Quote` does, and
//! third-party tooling reads them back with the same rules. Printable
//! characters are kept verbatim; everything else is escaped.

use thiserror::Error;
use unicode_general_category::{
    GeneralCategory,
    get_general_category,
};

/// Errors raised while unquoting a catalog value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    /// The literal is not wrapped in double quotes.
    #[error("missing surrounding double quotes: {0}")]
    NotQuoted(String),

    /// Unknown, truncated or out-of-range escape.
    #[error("invalid escape sequence at byte {offset}: {literal}")]
    InvalidEscape {
        /// The whole literal.
        literal: String,
        /// Byte offset of the escape.
        offset: usize,
    },

    /// A `"` or newline inside the literal.
    #[error("unescaped {found:?} at byte {offset}: {literal}")]
    UnescapedChar {
        /// The whole literal.
        literal: String,
        /// Offending character.
        found: char,
        /// Byte offset of the character.
        offset: usize,
    },

    /// Escaped bytes do not form UTF-8.
    #[error("quoted value is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Quotes `value` as a double-quoted literal.
#[must_use]
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{b}' => out.push_str("\\v"),
            c if is_printable(c) => out.push(c),
            c if c.is_ascii() => out.push_str(&format!("\\x{:02x}", u32::from(c))),
            c if u32::from(c) < 0x1_0000 => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push_str(&format!("\\U{:08x}", u32::from(c))),
        }
    }
    out.push('"');
    out
}

/// Characters written verbatim inside a quoted literal.
///
/// Mirrors `strconv.IsPrint`: letters, marks, numbers, punctuation, symbols
/// and U+0020. Other spaces, format, private-use and unassigned code points
/// are escaped.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    !matches!(
        get_general_category(c),
        GeneralCategory::SpaceSeparator
            | GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
            | GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Surrogate
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
    )
}

/// Parses a double-quoted literal produced by [`quote`] (or by hand).
///
/// # Errors
/// Returns [`QuoteError`] for a missing quote, an unknown or truncated
/// escape, a bare `"` or newline inside the literal, or bytes that do not
/// form valid UTF-8.
pub fn unquote(literal: &str) -> Result<String, QuoteError> {
    let inner = literal
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(|| QuoteError::NotQuoted(literal.to_string()))?;

    let invalid_escape =
        |offset: usize| QuoteError::InvalidEscape { literal: literal.to_string(), offset };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.char_indices().peekable();
    while let Some((offset, c)) = chars.next() {
        match c {
            '"' | '\n' => {
                return Err(QuoteError::UnescapedChar {
                    literal: literal.to_string(),
                    found: c,
                    offset: offset + 1,
                });
            }
            '\\' => {
                let (_, escape) = chars.next().ok_or_else(|| invalid_escape(offset + 1))?;
                match escape {
                    'a' => bytes.push(0x07),
                    'b' => bytes.push(0x08),
                    'f' => bytes.push(0x0c),
                    'n' => bytes.push(b'\n'),
                    'r' => bytes.push(b'\r'),
                    't' => bytes.push(b'\t'),
                    'v' => bytes.push(0x0b),
                    '\\' => bytes.push(b'\\'),
                    '"' => bytes.push(b'"'),
                    'x' => {
                        let value = take_digits(&mut chars, 2, 16)
                            .ok_or_else(|| invalid_escape(offset + 1))?;
                        bytes.push(u8::try_from(value).map_err(|_| invalid_escape(offset + 1))?);
                    }
                    'u' | 'U' => {
                        let width = if escape == 'u' { 4 } else { 8 };
                        let decoded = take_digits(&mut chars, width, 16)
                            .and_then(char::from_u32)
                            .ok_or_else(|| invalid_escape(offset + 1))?;
                        let mut buf = [0; 4];
                        bytes.extend_from_slice(decoded.encode_utf8(&mut buf).as_bytes());
                    }
                    '0'..='7' => {
                        let first = escape.to_digit(8).unwrap_or_default();
                        let rest = take_digits(&mut chars, 2, 8)
                            .ok_or_else(|| invalid_escape(offset + 1))?;
                        let value = first * 64 + rest;
                        bytes.push(u8::try_from(value).map_err(|_| invalid_escape(offset + 1))?);
                    }
                    _ => return Err(invalid_escape(offset + 1)),
                }
            }
            c => {
                let mut buf = [0; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }

    Ok(String::from_utf8(bytes)?)
}

/// Consumes exactly `count` digits in `radix`.
fn take_digits(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    count: usize,
    radix: u32,
) -> Option<u32> {
    let mut value = 0_u32;
    for _ in 0..count {
        let (_, c) = chars.next()?;
        value = value.checked_mul(radix)?.checked_add(c.to_digit(radix)?)?;
    }
    Some(value)
}
