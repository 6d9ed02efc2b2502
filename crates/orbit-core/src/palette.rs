//! Deterministic particle colours.
//!
//! A particle's colour pair is a pure function of its id and the active
//! theme, so nothing colour-related is stored on the particle itself.

use serde::{Deserialize, Serialize};

use crate::particle::ParticleId;

/// RGBA color representation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque colour from a `0xRRGGBB` literal.
    pub const fn hex(rgb: u32) -> Self {
        Self::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8, 255)
    }

    /// CSS-style `#rrggbb` string.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Gradient endpoints used to paint a particle and its explosion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ColorPair {
    pub start: Color,
    pub end: Color,
}

impl ColorPair {
    const fn hex(start: u32, end: u32) -> Self {
        Self {
            start: Color::hex(start),
            end: Color::hex(end),
        }
    }
}

/// Visual theme selecting the palette.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    /// Saturated neon gradients (dark mode).
    #[default]
    Vibrant,
    /// Muted earth tones (light mode).
    Warm,
}

impl Theme {
    pub fn palette(self) -> &'static [ColorPair] {
        match self {
            Self::Vibrant => &VIBRANT,
            Self::Warm => &WARM,
        }
    }
}

/// Colour pair for `id` under `theme`.
pub fn color_pair(id: ParticleId, theme: Theme) -> ColorPair {
    let palette = theme.palette();
    #[allow(clippy::cast_possible_truncation)]
    let index = (id.0 % palette.len() as u64) as usize;
    palette[index]
}

const VIBRANT: [ColorPair; 40] = [
    ColorPair::hex(0x00D4FF, 0x8B5CF6),
    ColorPair::hex(0x8B5CF6, 0xEC4899),
    ColorPair::hex(0xEC4899, 0xF59E0B),
    ColorPair::hex(0xF59E0B, 0x10B981),
    ColorPair::hex(0x10B981, 0x00D4FF),
    ColorPair::hex(0xEF4444, 0xF97316),
    ColorPair::hex(0x8B5CF6, 0x06B6D4),
    ColorPair::hex(0xEC4899, 0x84CC16),
    ColorPair::hex(0xF59E0B, 0xEF4444),
    ColorPair::hex(0x10B981, 0x8B5CF6),
    ColorPair::hex(0x06B6D4, 0xEC4899),
    ColorPair::hex(0x84CC16, 0x8B5CF6),
    ColorPair::hex(0xF97316, 0x10B981),
    ColorPair::hex(0xEF4444, 0x00D4FF),
    ColorPair::hex(0x8B5CF6, 0xF59E0B),
    ColorPair::hex(0xEC4899, 0x06B6D4),
    ColorPair::hex(0x10B981, 0xEF4444),
    ColorPair::hex(0xF59E0B, 0x8B5CF6),
    ColorPair::hex(0x00D4FF, 0x84CC16),
    ColorPair::hex(0x06B6D4, 0xF97316),
    ColorPair::hex(0xA855F7, 0xEC4899),
    ColorPair::hex(0xF59E0B, 0x06B6D4),
    ColorPair::hex(0x10B981, 0xF97316),
    ColorPair::hex(0xEF4444, 0x8B5CF6),
    ColorPair::hex(0x84CC16, 0xEC4899),
    ColorPair::hex(0x06B6D4, 0x10B981),
    ColorPair::hex(0xF97316, 0x8B5CF6),
    ColorPair::hex(0xEC4899, 0xF59E0B),
    ColorPair::hex(0x8B5CF6, 0x84CC16),
    ColorPair::hex(0x00D4FF, 0xEF4444),
    ColorPair::hex(0xDC2626, 0xF59E0B),
    ColorPair::hex(0x059669, 0x8B5CF6),
    ColorPair::hex(0x7C3AED, 0xEC4899),
    ColorPair::hex(0xF59E0B, 0x84CC16),
    ColorPair::hex(0x06B6D4, 0xDC2626),
    ColorPair::hex(0x10B981, 0x7C3AED),
    ColorPair::hex(0xEC4899, 0x059669),
    ColorPair::hex(0x8B5CF6, 0xF59E0B),
    ColorPair::hex(0x84CC16, 0xDC2626),
    ColorPair::hex(0x00D4FF, 0x7C3AED),
];

const WARM: [ColorPair; 20] = [
    ColorPair::hex(0xB68B63, 0xD9A066),
    ColorPair::hex(0xA1704F, 0xD4B08A),
    ColorPair::hex(0x9C6B4F, 0xC79A73),
    ColorPair::hex(0x8B5E3C, 0xB88760),
    ColorPair::hex(0xA87B58, 0xE0C199),
    ColorPair::hex(0xB68668, 0xF1D6B8),
    ColorPair::hex(0x8C6849, 0xC29874),
    ColorPair::hex(0xA6724C, 0xDABA94),
    ColorPair::hex(0xB48A68, 0xF3DEC2),
    ColorPair::hex(0x9F7456, 0xCFAA84),
    ColorPair::hex(0xB5845F, 0xE7C7A4),
    ColorPair::hex(0x8B6041, 0xB88A69),
    ColorPair::hex(0xA47449, 0xD2B08B),
    ColorPair::hex(0xC4926A, 0xF4DDBF),
    ColorPair::hex(0xA97C56, 0xDFC19D),
    ColorPair::hex(0x8F684A, 0xC29D7C),
    ColorPair::hex(0xB0805D, 0xE2C7A5),
    ColorPair::hex(0x9A6F52, 0xCDAC88),
    ColorPair::hex(0xBA906A, 0xF6E3C7),
    ColorPair::hex(0x936548, 0xBE996F),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_pair_is_deterministic() {
        let id = ParticleId(0x1234_5678);
        for theme in [Theme::Vibrant, Theme::Warm] {
            let first = color_pair(id, theme);
            for _ in 0..10 {
                assert_eq!(color_pair(id, theme), first);
            }
        }
    }

    #[test]
    fn test_color_pair_wraps_palette() {
        assert_eq!(color_pair(ParticleId(0), Theme::Vibrant), VIBRANT[0]);
        assert_eq!(color_pair(ParticleId(41), Theme::Vibrant), VIBRANT[1]);
        assert_eq!(color_pair(ParticleId(20), Theme::Warm), WARM[0]);
    }

    #[test]
    fn test_hex_formatting() {
        let color = Color::hex(0x00D4FF);
        assert_eq!(color, Color::new(0, 212, 255, 255));
        assert_eq!(color.to_hex(), "#00d4ff");
    }
}
