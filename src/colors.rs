use anyhow::{bail, Context, Result};
use std::fmt;
use std::str::FromStr;

/// 24-bit color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrueColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

// Card palette
pub const RED: TrueColor = TrueColor::new(0xFF, 0x66, 0x66); // #FF6666
pub const GREEN: TrueColor = TrueColor::new(0x8E, 0xD4, 0x6B); // #8ED46B
pub const YELLOW: TrueColor = TrueColor::new(0xF5, 0xC5, 0x42); // #F5C542
pub const GOLD: TrueColor = TrueColor::new(0xE0, 0xC0, 0x6A); // #E0C06A
pub const GREY: TrueColor = TrueColor::new(0xD4, 0xD4, 0xD4); // #D4D4D4
pub const WHITE: TrueColor = TrueColor::new(0xFF, 0xFF, 0xFF); // #FFFFFF

impl TrueColor {
    /// Create a new true color from RGB values
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert to hex string
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Wrap `text` in a 24-bit ANSI foreground sequence
    #[must_use]
    pub fn paint(self, text: impl fmt::Display) -> String {
        format!("\x1b[38;2;{};{};{}m{text}\x1b[0m", self.r, self.g, self.b)
    }

    /// Parse `#RRGGBB` or `RRGGBB`
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            bail!("Invalid hex color: {hex}");
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .with_context(|| format!("Invalid hex color: {hex}"))
        };

        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl FromStr for TrueColor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for TrueColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
