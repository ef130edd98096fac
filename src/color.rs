//! Color types for the style resolver
//!
//! `ColorRef` is what the parser records in a `StyleState`; `Rgb` is what the
//! resolver paints with. Keeping the two apart lets the palette change without
//! re-parsing anything.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 24-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create a color from a hex string (e.g., "#FF5500" or "FF5500")
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }

        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

        Some(Self::new(r, g, b))
    }

    /// Convert to a lowercase `#rrggbb` string
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// ANSI 16-color palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AnsiColor {
    Black = 0,
    Red = 1,
    Green = 2,
    Yellow = 3,
    Blue = 4,
    Magenta = 5,
    Cyan = 6,
    White = 7,
    BrightBlack = 8,
    BrightRed = 9,
    BrightGreen = 10,
    BrightYellow = 11,
    BrightBlue = 12,
    BrightMagenta = 13,
    BrightCyan = 14,
    BrightWhite = 15,
}

impl AnsiColor {
    pub const ALL: [AnsiColor; 16] = [
        Self::Black,
        Self::Red,
        Self::Green,
        Self::Yellow,
        Self::Blue,
        Self::Magenta,
        Self::Cyan,
        Self::White,
        Self::BrightBlack,
        Self::BrightRed,
        Self::BrightGreen,
        Self::BrightYellow,
        Self::BrightBlue,
        Self::BrightMagenta,
        Self::BrightCyan,
        Self::BrightWhite,
    ];

    /// Convert ANSI color index to enum
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Kebab-case name used for CSS class names (`bright-red`)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::Red => "red",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
            Self::Magenta => "magenta",
            Self::Cyan => "cyan",
            Self::White => "white",
            Self::BrightBlack => "bright-black",
            Self::BrightRed => "bright-red",
            Self::BrightGreen => "bright-green",
            Self::BrightYellow => "bright-yellow",
            Self::BrightBlue => "bright-blue",
            Self::BrightMagenta => "bright-magenta",
            Self::BrightCyan => "bright-cyan",
            Self::BrightWhite => "bright-white",
        }
    }

    /// Get default color for this ANSI color
    pub fn default_color(&self) -> Rgb {
        match self {
            Self::Black => Rgb::new(0x00, 0x00, 0x00),
            Self::Red => Rgb::new(0xff, 0x00, 0x00),
            Self::Green => Rgb::new(0x00, 0xff, 0x00),
            Self::Yellow => Rgb::new(0xff, 0xff, 0x00),
            Self::Blue => Rgb::new(0x00, 0x00, 0xff),
            Self::Magenta => Rgb::new(0xff, 0x00, 0xff),
            Self::Cyan => Rgb::new(0x00, 0xff, 0xff),
            Self::White => Rgb::new(0xff, 0xff, 0xff),
            Self::BrightBlack => Rgb::new(0x80, 0x80, 0x80),
            Self::BrightRed => Rgb::new(0xff, 0x80, 0x80),
            Self::BrightGreen => Rgb::new(0x80, 0xff, 0x80),
            Self::BrightYellow => Rgb::new(0xff, 0xff, 0x80),
            Self::BrightBlue => Rgb::new(0x80, 0x80, 0xff),
            Self::BrightMagenta => Rgb::new(0xff, 0x80, 0xff),
            Self::BrightCyan => Rgb::new(0x80, 0xff, 0xff),
            Self::BrightWhite => Rgb::new(0xff, 0xff, 0xff),
        }
    }
}

/// Color reference carried by a `StyleState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorRef {
    /// ANSI 16-color palette (SGR 30-37, 90-97 and their backgrounds)
    Ansi(AnsiColor),
    /// ANSI 256-color palette (SGR 38;5;n / 48;5;n)
    Indexed(u8),
    /// True color (SGR 38;2;r;g;b / 48;2;r;g;b)
    Rgb(Rgb),
}

impl ColorRef {
    /// Convert to actual color using the given palette
    pub fn to_rgb(&self, palette: &AnsiPalette) -> Rgb {
        match self {
            Self::Ansi(ansi) => palette.get(*ansi),
            Self::Indexed(idx) => {
                if let Some(ansi) = AnsiColor::from_index(*idx) {
                    palette.get(ansi)
                } else if *idx < 232 {
                    // 216 color cube (6x6x6)
                    let idx = *idx - 16;
                    let level = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
                    Rgb::new(level(idx / 36), level((idx / 6) % 6), level(idx % 6))
                } else {
                    // 24 grayscale colors
                    let gray = (*idx - 232) * 10 + 8;
                    Rgb::new(gray, gray, gray)
                }
            }
            Self::Rgb(rgb) => *rgb,
        }
    }

    /// Class-name fragment (`red`, `bright-blue`, `idx-123`, `rgb-102030`)
    pub fn class_name(&self) -> String {
        match self {
            Self::Ansi(ansi) => ansi.name().to_string(),
            Self::Indexed(idx) => format!("idx-{idx}"),
            Self::Rgb(rgb) => format!("rgb-{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b),
        }
    }
}

/// ANSI 16-color palette
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsiPalette {
    colors: [Rgb; 16],
}

impl AnsiPalette {
    /// Create a new palette with default colors
    pub fn new() -> Self {
        Self::default()
    }

    /// Get color for an ANSI color
    pub fn get(&self, ansi: AnsiColor) -> Rgb {
        self.colors[ansi as usize]
    }

    /// Set color for an ANSI color
    pub fn set(&mut self, ansi: AnsiColor, color: Rgb) {
        self.colors[ansi as usize] = color;
    }
}

impl Default for AnsiPalette {
    fn default() -> Self {
        Self {
            colors: AnsiColor::ALL.map(|c| c.default_color()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_from_hex() {
        assert_eq!(Rgb::from_hex("#FF8000"), Some(Rgb::new(255, 128, 0)));
        assert_eq!(Rgb::from_hex("00ff00"), Some(Rgb::new(0, 255, 0)));
        assert_eq!(Rgb::from_hex("#fff"), None);
        assert_eq!(Rgb::from_hex("#zzzzzz"), None);
    }

    #[test]
    fn test_rgb_to_hex() {
        assert_eq!(Rgb::new(255, 128, 0).to_hex(), "#ff8000");
    }

    #[test]
    fn test_ansi_names() {
        assert_eq!(AnsiColor::Red.name(), "red");
        assert_eq!(AnsiColor::BrightRed.name(), "bright-red");
        assert_eq!(AnsiColor::from_index(12), Some(AnsiColor::BrightBlue));
        assert_eq!(AnsiColor::from_index(16), None);
    }

    #[test]
    fn test_ansi_256_color_cube() {
        let palette = AnsiPalette::default();

        assert_eq!(ColorRef::Indexed(16).to_rgb(&palette), Rgb::new(0, 0, 0));
        assert_eq!(ColorRef::Indexed(196).to_rgb(&palette), Rgb::new(255, 0, 0));
        assert_eq!(ColorRef::Indexed(232).to_rgb(&palette), Rgb::new(8, 8, 8));
        assert_eq!(
            ColorRef::Indexed(1).to_rgb(&palette),
            AnsiColor::Red.default_color()
        );
    }

    #[test]
    fn test_palette_override() {
        let mut palette = AnsiPalette::new();
        palette.set(AnsiColor::Red, Rgb::new(1, 2, 3));
        assert_eq!(ColorRef::Ansi(AnsiColor::Red).to_rgb(&palette), Rgb::new(1, 2, 3));
    }
}
