//! Temperature units and conversions.
//!
//! Units are parsed leniently: any text containing exactly one of the key
//! letters `C`, `F` or `K` (in either case) names that unit. Each letter
//! occurs exactly once in its own unit's name ("Celsius", "Centigrade",
//! "Fahrenheit", "Kelvin") and never in the others, so "degC", "°F",
//! "kelvin" and plain "c" are all accepted without a fixed vocabulary.
//!
//! Integer conversions truncate toward zero at each step and are therefore
//! lossy; floating-point conversions are exact up to rounding.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::FromRepr;

use crate::property::{InvalidFormat, PropertyType};

/// Temperature units, represented by their key letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, Serialize, Deserialize)]
#[repr(u8)]
pub enum TemperatureUnits {
    Celsius = b'C',
    Fahrenheit = b'F',
    Kelvin = b'K',
}

impl TemperatureUnits {
    /// The unit's key letter.
    pub fn letter(self) -> char {
        self as u8 as char
    }

    /// Convert `value` from `self` to `target` units.
    pub fn convert<T: Temperature>(self, value: T, target: TemperatureUnits) -> T {
        match target {
            TemperatureUnits::Celsius => self.to_celsius(value),
            TemperatureUnits::Fahrenheit => self.to_fahrenheit(value),
            TemperatureUnits::Kelvin => self.to_kelvin(value),
        }
    }

    /// Convert `value`, expressed in `self` units, to Celsius.
    pub fn to_celsius<T: Temperature>(self, value: T) -> T {
        match self {
            TemperatureUnits::Celsius => value,
            TemperatureUnits::Fahrenheit => value.fahrenheit_to_celsius(),
            TemperatureUnits::Kelvin => value.kelvin_to_celsius(),
        }
    }

    /// Convert `value`, expressed in `self` units, to Fahrenheit.
    pub fn to_fahrenheit<T: Temperature>(self, value: T) -> T {
        match self {
            TemperatureUnits::Celsius => value.celsius_to_fahrenheit(),
            TemperatureUnits::Fahrenheit => value,
            TemperatureUnits::Kelvin => value.kelvin_to_fahrenheit(),
        }
    }

    /// Convert `value`, expressed in `self` units, to Kelvin.
    pub fn to_kelvin<T: Temperature>(self, value: T) -> T {
        match self {
            TemperatureUnits::Celsius => value.celsius_to_kelvin(),
            TemperatureUnits::Fahrenheit => value.fahrenheit_to_kelvin(),
            TemperatureUnits::Kelvin => value,
        }
    }
}

impl fmt::Display for TemperatureUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Numeric representations a temperature can be converted in.
pub trait Temperature: Copy {
    fn celsius_to_fahrenheit(self) -> Self;
    fn celsius_to_kelvin(self) -> Self;
    fn fahrenheit_to_celsius(self) -> Self;
    fn fahrenheit_to_kelvin(self) -> Self;
    fn kelvin_to_celsius(self) -> Self;
    fn kelvin_to_fahrenheit(self) -> Self;
}

/// Whole-degree conversions. 0 K is taken as -273 °C / -460 °F.
///
/// Results are exact (truncated toward zero) and saturate at the `i32`
/// bounds when the converted value does not fit.
impl Temperature for i32 {
    fn celsius_to_fahrenheit(self) -> Self {
        saturate(i64::from(self) * 9 / 5 + 32)
    }

    fn celsius_to_kelvin(self) -> Self {
        saturate(i64::from(self) + 273)
    }

    fn fahrenheit_to_celsius(self) -> Self {
        saturate((i64::from(self) - 32) * 5 / 9)
    }

    fn fahrenheit_to_kelvin(self) -> Self {
        saturate((i64::from(self) + 460) * 5 / 9)
    }

    fn kelvin_to_celsius(self) -> Self {
        saturate(i64::from(self) - 273)
    }

    fn kelvin_to_fahrenheit(self) -> Self {
        saturate(i64::from(self) * 9 / 5 - 460)
    }
}

fn saturate(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

impl Temperature for f64 {
    fn celsius_to_fahrenheit(self) -> Self {
        self * 1.8 + 32.0
    }

    fn celsius_to_kelvin(self) -> Self {
        self + 273.15
    }

    fn fahrenheit_to_celsius(self) -> Self {
        (self - 32.0) / 1.8
    }

    fn fahrenheit_to_kelvin(self) -> Self {
        (self + 459.67) / 1.8
    }

    fn kelvin_to_celsius(self) -> Self {
        self - 273.15
    }

    fn kelvin_to_fahrenheit(self) -> Self {
        self * 1.8 - 459.67
    }
}

/// Temperature units property type ("C/F/K").
pub static TEMPERATURE_UNITS: PropertyType<TemperatureUnits> =
    PropertyType::new("C/F/K", format_units, parse_units);

fn format_units(value: &TemperatureUnits, out: &mut dyn fmt::Write) -> fmt::Result {
    out.write_char(value.letter())
}

fn parse_units(text: &str) -> Result<TemperatureUnits, InvalidFormat> {
    let mut found = None;

    for c in text.chars().filter(char::is_ascii) {
        let Some(units) = TemperatureUnits::from_repr(c.to_ascii_uppercase() as u8) else {
            continue;
        };
        if found.is_some() {
            return Err(InvalidFormat::new("more than one of C/F/K"));
        }
        found = Some(units);
    }

    found.ok_or(InvalidFormat::new("expected one of C/F/K"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_free_form_names() {
        for text in ["Celsius", "Centigrade", "degC", "c", "°C"] {
            assert_eq!(
                TEMPERATURE_UNITS.parse(text),
                Ok(TemperatureUnits::Celsius),
                "{text}"
            );
        }
        for text in ["Fahrenheit", "°F", "f"] {
            assert_eq!(TEMPERATURE_UNITS.parse(text), Ok(TemperatureUnits::Fahrenheit));
        }
        for text in ["Kelvin", "kelvin", "K"] {
            assert_eq!(TEMPERATURE_UNITS.parse(text), Ok(TemperatureUnits::Kelvin));
        }
    }

    #[test]
    fn test_parse_rejects_ambiguous_or_missing() {
        assert!(TEMPERATURE_UNITS.parse("CF").is_err());
        assert!(TEMPERATURE_UNITS.parse("cc").is_err());
        assert!(TEMPERATURE_UNITS.parse("xyz").is_err());
        assert!(TEMPERATURE_UNITS.parse("").is_err());
    }

    #[test]
    fn test_units_round_trip() {
        for units in [
            TemperatureUnits::Celsius,
            TemperatureUnits::Fahrenheit,
            TemperatureUnits::Kelvin,
        ] {
            let text = TEMPERATURE_UNITS.format(&units);
            assert_eq!(text.len(), 1);
            assert_eq!(TEMPERATURE_UNITS.parse(&text), Ok(units));
        }
    }

    #[test]
    fn test_integer_conversions() {
        assert_eq!(TemperatureUnits::Celsius.to_fahrenheit(100), 212);
        assert_eq!(TemperatureUnits::Fahrenheit.to_celsius(212), 100);
        assert_eq!(TemperatureUnits::Fahrenheit.to_celsius(356), 180);
        assert_eq!(TemperatureUnits::Celsius.to_kelvin(0), 273);
        assert_eq!(TemperatureUnits::Kelvin.to_celsius(273), 0);
        assert_eq!(TemperatureUnits::Kelvin.to_fahrenheit(0), -460);
        assert_eq!(TemperatureUnits::Fahrenheit.to_kelvin(-460), 0);
        // Truncation: 100 F is 37.77 C
        assert_eq!(TemperatureUnits::Fahrenheit.to_celsius(100), 37);
    }

    #[test]
    fn test_integer_conversions_saturate() {
        assert_eq!(TemperatureUnits::Celsius.to_fahrenheit(i32::MAX), i32::MAX);
        assert_eq!(TemperatureUnits::Celsius.to_kelvin(i32::MAX), i32::MAX);
        assert_eq!(TemperatureUnits::Kelvin.to_celsius(i32::MIN), i32::MIN);
        assert_eq!(TemperatureUnits::Kelvin.to_fahrenheit(i32::MIN), i32::MIN);
        // Still exact when the result fits
        assert_eq!(
            TemperatureUnits::Fahrenheit.to_celsius(i32::MIN),
            -1_193_046_488
        );
        assert_eq!(
            TemperatureUnits::Fahrenheit.to_kelvin(i32::MAX),
            1_193_046_726
        );
    }

    #[test]
    fn test_floating_conversions() {
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;

        assert!(close(TemperatureUnits::Celsius.to_fahrenheit(37.0), 98.6));
        assert!(close(TemperatureUnits::Kelvin.to_celsius(0.0), -273.15));
        assert!(close(TemperatureUnits::Fahrenheit.to_kelvin(32.0), 273.15));
        assert!(close(TemperatureUnits::Kelvin.to_fahrenheit(273.15), 32.0));
        assert!(close(
            TemperatureUnits::Kelvin.convert(300.0, TemperatureUnits::Kelvin),
            300.0
        ));
    }
}
