use std::fmt::Display;

use crate::error::{Result, StampError};

/// 8-bit per channel RGB color.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// Channels scaled into `[0, 1]`, as used by PDF color operators.
    pub fn normalized(self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

impl Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", hex::encode_upper([self.r, self.g, self.b]))
    }
}

/// Parses a `#RRGGBB` color. The leading `#` is optional.
pub fn parse_color(value: &str) -> Result<Rgb> {
    let invalid = |reason| StampError::InvalidColor {
        value: value.to_string(),
        reason,
    };

    let digits = value.strip_prefix('#').unwrap_or(value);
    if digits.len() != 6 {
        return Err(invalid("expected 6 hexadecimal digits"));
    }

    let mut channels = [0u8; 3];
    hex::decode_to_slice(digits, &mut channels)
        .map_err(|_| invalid("contains non-hexadecimal characters"))?;
    let [r, g, b] = channels;
    Ok(Rgb { r, g, b })
}
