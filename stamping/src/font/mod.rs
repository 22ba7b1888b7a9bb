//! Supported fonts and font validation.
//!
//! Only the PDF standard fonts are supported, which every conforming reader provides, so nothing
//! needs embedding in the output.

pub mod encoding;
pub mod metrics;

use strum::IntoEnumIterator;

use crate::{
    color::{self, Rgb},
    error::{Result, StampError},
    fmtutil,
};

/// Typefaces that may be selected, independent of style.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    strum_macros::Display,
    strum_macros::EnumIter,
    strum_macros::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum FontFamily {
    #[strum(to_string = "Times-Roman", serialize = "Times")]
    Times,
    Helvetica,
    Courier,
    Symbol,
}

impl FontFamily {
    /// Returns the variant of this family with the given style. [FontFamily::Symbol] has no
    /// styled variants, so the style is ignored for it.
    pub fn styled(self, bold: bool, italic: bool) -> StandardFont {
        use StandardFont::*;
        match (self, bold, italic) {
            (FontFamily::Times, false, false) => TimesRoman,
            (FontFamily::Times, true, false) => TimesBold,
            (FontFamily::Times, false, true) => TimesItalic,
            (FontFamily::Times, true, true) => TimesBoldItalic,
            (FontFamily::Helvetica, false, false) => Helvetica,
            (FontFamily::Helvetica, true, false) => HelveticaBold,
            (FontFamily::Helvetica, false, true) => HelveticaOblique,
            (FontFamily::Helvetica, true, true) => HelveticaBoldOblique,
            (FontFamily::Courier, false, false) => Courier,
            (FontFamily::Courier, true, false) => CourierBold,
            (FontFamily::Courier, false, true) => CourierOblique,
            (FontFamily::Courier, true, true) => CourierBoldOblique,
            (FontFamily::Symbol, _, _) => Symbol,
        }
    }
}

/// A specific standard font, named by its PostScript `BaseFont` name.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    strum_macros::Display,
    strum_macros::EnumIter,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum StandardFont {
    #[strum(serialize = "Times-Roman")]
    TimesRoman,
    #[strum(serialize = "Times-Bold")]
    TimesBold,
    #[strum(serialize = "Times-Italic")]
    TimesItalic,
    #[strum(serialize = "Times-BoldItalic")]
    TimesBoldItalic,
    #[strum(serialize = "Helvetica")]
    Helvetica,
    #[strum(serialize = "Helvetica-Bold")]
    HelveticaBold,
    #[strum(serialize = "Helvetica-Oblique")]
    HelveticaOblique,
    #[strum(serialize = "Helvetica-BoldOblique")]
    HelveticaBoldOblique,
    #[strum(serialize = "Courier")]
    Courier,
    #[strum(serialize = "Courier-Bold")]
    CourierBold,
    #[strum(serialize = "Courier-Oblique")]
    CourierOblique,
    #[strum(serialize = "Courier-BoldOblique")]
    CourierBoldOblique,
    #[strum(serialize = "Symbol")]
    Symbol,
}

impl StandardFont {
    /// The `BaseFont` name written into the PDF font dictionary.
    pub fn base_font(self) -> &'static str {
        self.into()
    }

    pub fn family(self) -> FontFamily {
        use StandardFont::*;
        match self {
            TimesRoman | TimesBold | TimesItalic | TimesBoldItalic => FontFamily::Times,
            Helvetica | HelveticaBold | HelveticaOblique | HelveticaBoldOblique => {
                FontFamily::Helvetica
            }
            Courier | CourierBold | CourierOblique | CourierBoldOblique => FontFamily::Courier,
            Symbol => FontFamily::Symbol,
        }
    }

    pub fn is_bold(self) -> bool {
        use StandardFont::*;
        matches!(
            self,
            TimesBold
                | TimesBoldItalic
                | HelveticaBold
                | HelveticaBoldOblique
                | CourierBold
                | CourierBoldOblique
        )
    }

    pub fn is_italic(self) -> bool {
        use StandardFont::*;
        matches!(
            self,
            TimesItalic
                | TimesBoldItalic
                | HelveticaOblique
                | HelveticaBoldOblique
                | CourierOblique
                | CourierBoldOblique
        )
    }

    /// Symbolic fonts use their built-in encoding rather than WinAnsiEncoding.
    pub fn is_symbolic(self) -> bool {
        self == StandardFont::Symbol
    }
}

/// Returns the font named by `name`, which is either a family name (e.g. `Helvetica`) selecting
/// its regular variant, or a specific variant (e.g. `Helvetica-BoldOblique`).
pub fn validate_font(name: &str) -> Result<StandardFont> {
    let trimmed = name.trim();
    if let Ok(family) = trimmed.parse::<FontFamily>() {
        return Ok(family.styled(false, false));
    }
    trimmed
        .parse::<StandardFont>()
        .map_err(|_| StampError::UnsupportedFont {
            name: name.to_string(),
            expected: supported_font_names(),
        })
}

/// Human readable list of every accepted font name.
pub fn supported_font_names() -> String {
    fmtutil::join_display(
        FontFamily::iter()
            .map(|family| family.to_string())
            .chain(
                StandardFont::iter()
                    .filter(|font| font.is_bold() || font.is_italic())
                    .map(|font| font.to_string()),
            ),
        ", ",
    )
}

/// Validated font selection for stamped text.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontSpec {
    font: StandardFont,
    size: u32,
    color: Rgb,
}

impl FontSpec {
    /// Typical size range offered to operators. Sizes outside it are allowed, but are likely
    /// mistakes.
    pub const TYPICAL_SIZES: std::ops::RangeInclusive<u32> = 8..=72;

    /// Validates the raw font settings. Style flags add to any style already named by `name`.
    pub fn new(name: &str, size: i64, bold: bool, italic: bool, color: &str) -> Result<Self> {
        let named = validate_font(name)?;
        let color = color::parse_color(color)?;
        let size = u32::try_from(size)
            .ok()
            .filter(|size| *size > 0)
            .ok_or(StampError::InvalidFontSize { size })?;

        let bold = named.is_bold() || bold;
        let italic = named.is_italic() || italic;
        let font = named.family().styled(bold, italic);
        if font.is_symbolic() && (bold || italic) {
            log::warn!("Font {font} has no bold or italic variants, using it unstyled.");
        }
        if !Self::TYPICAL_SIZES.contains(&size) {
            log::warn!(
                "Font size {size} is outside the typical range {}-{}.",
                Self::TYPICAL_SIZES.start(),
                Self::TYPICAL_SIZES.end()
            );
        }

        Ok(Self { font, size, color })
    }

    pub fn font(&self) -> StandardFont {
        self.font
    }

    /// Size in points.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn is_bold(&self) -> bool {
        self.font.is_bold()
    }

    pub fn is_italic(&self) -> bool {
        self.font.is_italic()
    }

    /// Width of `text` in points when set in this font and size.
    pub fn text_width(&self, text: &str) -> f32 {
        metrics::text_width(self.font, text, self.size as f32)
    }
}
