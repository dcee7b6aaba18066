//! Built-in property types.
//!
//! A [`PropertyType`] is the format/parse pair that defines how one kind of
//! value is rendered as text and read back. Types are plain `static`s so a
//! property can hold a `&'static` reference to the one shared definition.

use std::fmt;

use thiserror::Error as ThisError;
use uuid::Uuid;

/// Text could not be parsed into a property value.
#[derive(ThisError, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{reason}")]
pub struct InvalidFormat {
    pub reason: &'static str,
}

impl InvalidFormat {
    pub const fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// Renders a value into a text sink.
pub type FormatFn<V> = fn(&V, &mut dyn fmt::Write) -> fmt::Result;

/// Parses text into a value.
pub type ParseFn<V> = fn(&str) -> Result<V, InvalidFormat>;

/// How values of type `V` are rendered to and parsed from text.
///
/// For every value produced by `parse`, `parse(format(v)) == v`.
pub struct PropertyType<V> {
    name: &'static str,
    format: FormatFn<V>,
    parse: ParseFn<V>,
}

impl<V> PropertyType<V> {
    pub const fn new(name: &'static str, format: FormatFn<V>, parse: ParseFn<V>) -> Self {
        Self {
            name,
            format,
            parse,
        }
    }

    /// Display name of the type (e.g. "boolean").
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Write `value` into `out`.
    pub fn write(&self, value: &V, out: &mut dyn fmt::Write) -> fmt::Result {
        (self.format)(value, out)
    }

    /// Format `value` as an owned string.
    pub fn format(&self, value: &V) -> String {
        let mut text = String::new();
        // Writing into a String cannot fail
        let _ = self.write(value, &mut text);
        text
    }

    /// Parse `text` into a value, rejecting malformed input.
    pub fn parse(&self, text: &str) -> Result<V, InvalidFormat> {
        (self.parse)(text)
    }
}

impl<V> fmt::Debug for PropertyType<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyType")
            .field("name", &self.name)
            .finish()
    }
}

/// `true` / `false`, also accepting `1` / `0`.
pub static BOOLEAN: PropertyType<bool> =
    PropertyType::new("boolean", format_boolean, parse_boolean);

/// Signed integer accepting decimal, `0x` hex and leading-zero octal input.
pub static INTEGER: PropertyType<i32> =
    PropertyType::new("integer", format_integer, parse_integer);

/// Free text, displayed in double quotes.
pub static STRING: PropertyType<String> =
    PropertyType::new("string", format_string, parse_string);

/// 128-bit UUID in canonical hyphenated form.
pub static UUID: PropertyType<Uuid> = PropertyType::new("uuid", format_uuid, parse_uuid);

fn format_boolean(value: &bool, out: &mut dyn fmt::Write) -> fmt::Result {
    out.write_str(if *value { "true" } else { "false" })
}

fn parse_boolean(text: &str) -> Result<bool, InvalidFormat> {
    if text.eq_ignore_ascii_case("true") || text == "1" {
        Ok(true)
    } else if text.eq_ignore_ascii_case("false") || text == "0" {
        Ok(false)
    } else {
        Err(InvalidFormat::new("expected true/false or 1/0"))
    }
}

fn format_integer(value: &i32, out: &mut dyn fmt::Write) -> fmt::Result {
    write!(out, "{value}")
}

fn parse_integer(text: &str) -> Result<i32, InvalidFormat> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let (radix, digits) = if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        (16, hex)
    } else if unsigned.len() > 1 && unsigned.starts_with('0') {
        (8, &unsigned[1..])
    } else {
        (10, unsigned)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(InvalidFormat::new("expected a number"));
    }

    let magnitude = i64::from_str_radix(digits, radix)
        .map_err(|_| InvalidFormat::new("number out of range"))?;
    let value = if negative { -magnitude } else { magnitude };

    i32::try_from(value).map_err(|_| InvalidFormat::new("number out of range"))
}

fn format_string(value: &String, out: &mut dyn fmt::Write) -> fmt::Result {
    out.write_char('"')?;
    out.write_str(value)?;
    out.write_char('"')
}

fn parse_string(text: &str) -> Result<String, InvalidFormat> {
    let unquoted = text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(text);

    Ok(unquoted.to_string())
}

fn format_uuid(value: &Uuid, out: &mut dyn fmt::Write) -> fmt::Result {
    write!(out, "{}", value.hyphenated())
}

fn parse_uuid(text: &str) -> Result<Uuid, InvalidFormat> {
    let mut bytes = [0u8; 16];
    let mut digits = text.chars().filter(|&c| c != '-');

    for i in 0..bytes.len() * 2 {
        let digit = digits
            .next()
            .ok_or(InvalidFormat::new("expected 32 hex digits"))?
            .to_digit(16)
            .ok_or(InvalidFormat::new("invalid hex digit"))?;

        let byte = &mut bytes[i / 2];
        *byte = (*byte << 4) | digit as u8;
    }

    if digits.next().is_some() {
        return Err(InvalidFormat::new("expected 32 hex digits"));
    }

    Ok(Uuid::from_bytes(bytes))
}
