use anyhow::{Context, Result};
use lopdf::{Document, Object, ObjectId};

use super::{PlacedText, Renderer, font_dictionary, text_content};
use crate::pdfpage;

/// Draws text by appending a content stream to the page itself.
pub struct DirectRenderer;

impl Renderer for DirectRenderer {
    fn render(&self, doc: &mut Document, page_id: ObjectId, text: &PlacedText) -> Result<()> {
        let font_id = doc.add_object(font_dictionary(text.font));
        let font_name =
            pdfpage::add_resource(doc, page_id, b"Font", "FSignit", Object::Reference(font_id))
                .context("adding font resource")?;
        let content = text_content(&font_name, text)?;
        pdfpage::append_content(doc, page_id, content).context("appending text content")
    }
}
