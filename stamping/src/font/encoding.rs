//! Conversion of text into the single-byte encodings used with the standard fonts.

use super::StandardFont;

/// Characters of WinAnsiEncoding in the 0x80-0x9F range, which differs from Latin-1.
const WIN_ANSI_HIGH: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('‘', 0x91),
    ('’', 0x92),
    ('“', 0x93),
    ('”', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

/// WinAnsiEncoding byte of `c`, if it has one and is printable.
pub(super) fn win_ansi_byte(c: char) -> Option<u8> {
    match c as u32 {
        0x20..=0x7E | 0xA0..=0xFF => Some(c as u32 as u8),
        _ => WIN_ANSI_HIGH
            .iter()
            .find(|(mapped, _)| *mapped == c)
            .map(|(_, byte)| *byte),
    }
}

/// Encodes `text` for showing in `font`. Symbolic fonts accept printable ASCII only, others use
/// WinAnsiEncoding.
///
/// Returns the first character that cannot be encoded on failure.
pub fn encode_text(font: StandardFont, text: &str) -> Result<Vec<u8>, char> {
    text.chars()
        .map(|c| {
            let byte = if font.is_symbolic() {
                (c.is_ascii_graphic() || c == ' ').then_some(c as u8)
            } else {
                win_ansi_byte(c)
            };
            byte.ok_or(c)
        })
        .collect()
}
