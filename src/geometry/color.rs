//! 24-bit RGB colors as they appear in save files and configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CladeError, Result};

const COLOR_RANGE: i64 = 1 << 24;

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Decode a packed `0xRRGGBB` value. Negative values are the signed
    /// 32-bit form written by the simulator and wrap into the 24-bit range.
    pub fn from_packed(value: i64) -> Result<Self> {
        let value = if value < 0 { value + COLOR_RANGE } else { value };
        if !(0..COLOR_RANGE).contains(&value) {
            return Err(CladeError::InvalidColor(value.to_string()));
        }
        Ok(Self(
            (value >> 16) as u8,
            ((value >> 8) & 0xff) as u8,
            (value & 0xff) as u8,
        ))
    }

    /// Parse the trailing six hex digits of a string such as `#A9A9A9` or
    /// `0x253f3f`.
    pub fn parse_hex(text: &str) -> Result<Self> {
        let invalid = || CladeError::InvalidColor(text.to_string());

        let trimmed = text.trim();
        let start = trimmed.len().checked_sub(6).ok_or_else(invalid)?;
        let digits = trimmed.get(start..).ok_or_else(invalid)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let packed = i64::from_str_radix(digits, 16).map_err(|_| invalid())?;
        Self::from_packed(packed)
    }

    /// `#RRGGBB` form.
    pub fn html(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl TryFrom<String> for Rgb {
    type Error = CladeError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.html()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.html())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_packed() {
        assert_eq!(Rgb::from_packed(0xA9_A9_A9).unwrap(), Rgb(169, 169, 169));
        assert_eq!(Rgb::from_packed(0).unwrap(), Rgb(0, 0, 0));
    }

    #[test]
    fn test_from_packed_wraps_negative_values() {
        // -1 is white in the signed encoding.
        assert_eq!(Rgb::from_packed(-1).unwrap(), Rgb(255, 255, 255));
        assert_eq!(Rgb::from_packed(-0x10000).unwrap(), Rgb(255, 0, 0));
    }

    #[test]
    fn test_from_packed_rejects_out_of_range() {
        assert!(Rgb::from_packed(COLOR_RANGE).is_err());
        assert!(Rgb::from_packed(-COLOR_RANGE - 1).is_err());
    }

    #[test]
    fn test_parse_hex_uses_trailing_digits() {
        assert_eq!(Rgb::parse_hex("253F3F").unwrap(), Rgb(37, 63, 63));
        assert_eq!(Rgb::parse_hex("#a9a9a9").unwrap(), Rgb(169, 169, 169));
        assert_eq!(Rgb::parse_hex("0xFF0000").unwrap(), Rgb(255, 0, 0));
        assert!(Rgb::parse_hex("12345").is_err());
        assert!(Rgb::parse_hex("GGGGGG").is_err());
    }

    #[test]
    fn test_html_round_trip() {
        let color = Rgb(1, 2, 255);
        assert_eq!(color.html(), "#0102FF");
        assert_eq!(Rgb::parse_hex(&color.html()).unwrap(), color);
    }
}
