//! Drawing encoded text onto a template page.

mod direct;
mod overlay;

use anyhow::Result;
use lopdf::{
    Dictionary, Document, Object, ObjectId, StringFormat,
    content::{Content, Operation},
    dictionary,
};
use serde::Deserialize;

use crate::{color::Rgb, font::StandardFont, stamp::Position};

pub use direct::DirectRenderer;
pub use overlay::OverlayRenderer;

/// Selects how stamped text is composited onto the template page.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    PartialEq,
    strum_macros::Display,
    strum_macros::EnumIter,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RenderStrategy {
    /// Appends a text content stream to the page.
    #[default]
    Direct,
    /// Renders the text into a separate transparent PDF page, and composites it onto the page as
    /// a form.
    Overlay,
}

impl RenderStrategy {
    pub fn renderer(self) -> &'static dyn Renderer {
        match self {
            RenderStrategy::Direct => &DirectRenderer,
            RenderStrategy::Overlay => &OverlayRenderer,
        }
    }
}

/// Text ready to be drawn: already encoded for its font, with its baseline origin resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedText {
    pub font: StandardFont,
    pub size: f32,
    pub color: Rgb,
    pub origin: Position,
    pub encoded: Vec<u8>,
}

/// Draws [PlacedText] onto a page of a document.
pub trait Renderer: Sync {
    fn render(&self, doc: &mut Document, page_id: ObjectId, text: &PlacedText) -> Result<()>;
}

/// Font dictionary for a standard font, which needs no embedded font program.
fn font_dictionary(font: StandardFont) -> Dictionary {
    let mut dict = dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
    };
    if !font.is_symbolic() {
        dict.set("Encoding", "WinAnsiEncoding");
    }
    dict
}

/// Content stream that shows `text` using the font resource named `font_resource`. Graphics state
/// changes are confined by `q`/`Q`.
fn text_content(font_resource: &[u8], text: &PlacedText) -> Result<Vec<u8>> {
    let (r, g, b) = text.color.normalized();
    let operations = vec![
        Operation::new("q", vec![]),
        Operation::new("rg", vec![r.into(), g.into(), b.into()]),
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(font_resource.to_vec()), text.size.into()],
        ),
        Operation::new("Td", vec![text.origin.x.into(), text.origin.y.into()]),
        Operation::new(
            "Tj",
            vec![Object::String(text.encoded.clone(), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ];
    Ok(Content { operations }.encode()?)
}
