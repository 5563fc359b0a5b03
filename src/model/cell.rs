//! Cell definitions
//!
//! A cell is the text plus styling of one grid position. Every field is
//! optional; absent fields resolve to the defaults below.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Default font size in points
pub const DEFAULT_FONT_SIZE: u32 = 10;

// =============================================================================
// Color
// =============================================================================

/// An RGB color, written `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color { r: 0xff, g: 0xff, b: 0xff };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Color {
    type Err = GridError;

    /// Parse `#rrggbb` or the `#rgb` shorthand
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || GridError::MalformedPayload(format!("Invalid color: {:?}", s));

        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        match hex.len() {
            6 => {
                let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
                Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?))
            }
            3 => {
                // #abc == #aabbcc
                let channel = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 1], 16)
                        .map(|v| v * 0x11)
                        .map_err(|_| invalid())
                };
                Ok(Color::rgb(channel(0)?, channel(1)?, channel(2)?))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Color {
    type Error = GridError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

// =============================================================================
// Alignment
// =============================================================================

/// Horizontal alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HAlign {
    #[default]
    Left,
    Right,
    Center,
    Justify,
}

/// Vertical alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VAlign {
    Top,
    Bottom,
    #[default]
    Middle,
}

/// Bit flags used by grid widgets for text alignment
mod flags {
    pub const LEFT: u32 = 0x0001;
    pub const RIGHT: u32 = 0x0002;
    pub const HCENTER: u32 = 0x0004;
    pub const JUSTIFY: u32 = 0x0008;
    pub const TOP: u32 = 0x0020;
    pub const BOTTOM: u32 = 0x0040;
    pub const VCENTER: u32 = 0x0080;
}

/// Horizontal x vertical alignment of a cell's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Alignment {
    pub horizontal: HAlign,
    pub vertical: VAlign,
}

impl Alignment {
    pub const fn new(horizontal: HAlign, vertical: VAlign) -> Self {
        Self { horizontal, vertical }
    }

    /// Decode widget alignment flags. Missing halves fall back to left/middle.
    pub fn from_flags(bits: u32) -> Self {
        let horizontal = if bits & flags::LEFT != 0 {
            HAlign::Left
        } else if bits & flags::RIGHT != 0 {
            HAlign::Right
        } else if bits & flags::HCENTER != 0 {
            HAlign::Center
        } else if bits & flags::JUSTIFY != 0 {
            HAlign::Justify
        } else {
            HAlign::default()
        };

        let vertical = if bits & flags::TOP != 0 {
            VAlign::Top
        } else if bits & flags::BOTTOM != 0 {
            VAlign::Bottom
        } else if bits & flags::VCENTER != 0 {
            VAlign::Middle
        } else {
            VAlign::default()
        };

        Self { horizontal, vertical }
    }

    /// Encode as widget alignment flags
    pub fn to_flags(self) -> u32 {
        let h = match self.horizontal {
            HAlign::Left => flags::LEFT,
            HAlign::Right => flags::RIGHT,
            HAlign::Center => flags::HCENTER,
            HAlign::Justify => flags::JUSTIFY,
        };
        let v = match self.vertical {
            VAlign::Top => flags::TOP,
            VAlign::Bottom => flags::BOTTOM,
            VAlign::Middle => flags::VCENTER,
        };
        h | v
    }
}

// =============================================================================
// Font
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Font {
    pub bold: Option<bool>,
    /// Point size, always > 0 once validated
    pub size: Option<u32>,
}

// =============================================================================
// Cell
// =============================================================================

/// One styled grid cell
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cell {
    pub text: Option<String>,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub alignment: Option<Alignment>,
    pub font: Option<Font>,
    pub row_height: Option<u32>,
    pub column_width: Option<u32>,
}

impl Cell {
    /// A cell carrying only text
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_foreground(mut self, color: Color) -> Self {
        self.foreground = Some(color);
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn with_font(mut self, font: Font) -> Self {
        self.font = Some(font);
        self
    }

    // =========================================================================
    // Resolved values (defaults applied)
    // =========================================================================

    pub fn text_or_default(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn foreground_or_default(&self) -> Color {
        self.foreground.unwrap_or(Color::BLACK)
    }

    pub fn background_or_default(&self) -> Color {
        self.background.unwrap_or(Color::WHITE)
    }

    pub fn alignment_or_default(&self) -> Alignment {
        self.alignment.unwrap_or_default()
    }

    pub fn is_bold(&self) -> bool {
        self.font.and_then(|f| f.bold).unwrap_or(false)
    }

    pub fn font_size(&self) -> u32 {
        self.font.and_then(|f| f.size).unwrap_or(DEFAULT_FONT_SIZE)
    }
}
