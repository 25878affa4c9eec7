//! Color primitives for avatar captions and brand accents.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An opaque RGB color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red component (0-255)
    pub r: u8,
    /// Green component (0-255)
    pub g: u8,
    /// Blue component (0-255)
    pub b: u8,
}

/// Hex parsing failure
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid hex color: {0}")]
pub struct ColorParseError(pub String);

impl Color {
    /// Create a color from RGB components
    ///
    /// # Examples
    ///
    /// ```
    /// use cecy_core::avatar::Color;
    ///
    /// let green = Color::rgb(0x53, 0xAB, 0x32);
    /// assert_eq!(green.to_hex(), "#53AB32");
    /// ```
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` (the leading `#` is optional)
    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(ColorParseError(hex.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| ColorParseError(hex.to_string()))
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Uppercase `#RRGGBB`
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Relative luminance in 0.0..=1.0
    #[must_use]
    pub fn luminance(self) -> f32 {
        let r = f32::from(self.r) / 255.0;
        let g = f32::from(self.g) / 255.0;
        let b = f32::from(self.b) / 255.0;
        0.2126 * r + 0.7152 * g + 0.0722 * b
    }

    /// Whether dark text should be drawn on top of this color
    #[must_use]
    pub fn is_light(self) -> bool {
        self.luminance() > 0.6
    }
}

/// Brand accents used for resource cards and topic headers
pub const PRINCIPAL_COLORS: [Color; 16] = [
    Color::rgb(0xF1, 0x94, 0x33),
    Color::rgb(0x53, 0xAB, 0x32),
    Color::rgb(0xFF, 0x37, 0xA1),
    Color::rgb(0x45, 0x6A, 0xE3),
    Color::rgb(0xEF, 0x44, 0x44),
    Color::rgb(0x8B, 0x5C, 0xF6),
    Color::rgb(0xEC, 0x48, 0x99),
    Color::rgb(0xF7, 0xAD, 0x44),
    Color::rgb(0xA6, 0xCD, 0x38),
    Color::rgb(0x9B, 0xBF, 0x36),
    Color::rgb(0xFF, 0x67, 0xB8),
    Color::rgb(0x45, 0xAA, 0xE3),
    Color::rgb(0xDC, 0x26, 0x26),
    Color::rgb(0xD9, 0x77, 0x06),
    Color::rgb(0x7C, 0x3A, 0xED),
    Color::rgb(0xDB, 0x27, 0x77),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let c = Color::from_hex("#f59e0b").unwrap();
        assert_eq!(c, Color::rgb(0xF5, 0x9E, 0x0B));
        assert_eq!(c.to_hex(), "#F59E0B");
    }

    #[test]
    fn test_hex_rejects_garbage() {
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("zzzzzz").is_err());
        assert!(Color::from_hex("#ñññ").is_err());
    }

    #[test]
    fn test_is_light() {
        assert!(Color::rgb(255, 255, 255).is_light());
        assert!(!Color::rgb(0, 0, 0).is_light());
        // Brand green sits just under the threshold
        assert!(!Color::from_hex("#53AB32").unwrap().is_light());
        assert!(Color::from_hex("#A6CD38").unwrap().is_light());
    }
}
