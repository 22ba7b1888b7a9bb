use std::{io::Write, path::Path};

use anyhow::{Context, Result};
use lopdf::{
    Dictionary, Document, Object, ObjectId, Stream,
    content::{Content, Operation},
    dictionary,
};

use super::{PlacedText, Renderer, font_dictionary, text_content};
use crate::pdfpage;

/// Draws text onto a transparent single page PDF of the same size, then composites that page
/// onto the target page as a Form XObject.
///
/// The overlay PDF passes through a temporary file, which is removed once the overlay has been
/// read back, or on failure.
pub struct OverlayRenderer;

impl Renderer for OverlayRenderer {
    fn render(&self, doc: &mut Document, page_id: ObjectId, text: &PlacedText) -> Result<()> {
        self.render_in(&std::env::temp_dir(), doc, page_id, text, overlay_form)
    }
}

impl OverlayRenderer {
    /// Renders as [Renderer::render], placing the temporary overlay file in `temp_dir` and
    /// turning the read back overlay into a form with `to_form`.
    fn render_in<F>(
        &self,
        temp_dir: &Path,
        doc: &mut Document,
        page_id: ObjectId,
        text: &PlacedText,
        to_form: F,
    ) -> Result<()>
    where
        F: FnOnce(&Document, [f32; 4]) -> Result<Stream>,
    {
        let media_box = pdfpage::media_box(doc, page_id)?;

        let mut overlay_file = tempfile::Builder::new()
            .prefix("signit-overlay-")
            .suffix(".pdf")
            .tempfile_in(temp_dir)
            .context("creating temporary overlay file")?;
        let mut overlay = overlay_document(media_box, text)?;
        overlay
            .save_to(&mut overlay_file)
            .context("writing overlay PDF")?;
        overlay_file.flush()?;
        log::trace!("Wrote overlay to {:?}.", overlay_file.path());

        let overlay = Document::load(overlay_file.path()).context("reading back overlay PDF")?;
        let form = to_form(&overlay, media_box).context("converting overlay to a form")?;
        drop(overlay_file);

        let form_id = doc.add_object(form);
        let form_name =
            pdfpage::add_resource(doc, page_id, b"XObject", "XSignit", Object::Reference(form_id))
                .context("adding overlay form resource")?;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("Do", vec![Object::Name(form_name)]),
                Operation::new("Q", vec![]),
            ],
        }
        .encode()?;
        pdfpage::append_content(doc, page_id, content).context("appending overlay form")
    }
}

/// A single page document of `media_box` showing only `text`.
fn overlay_document(media_box: [f32; 4], text: &PlacedText) -> Result<Document> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(font_dictionary(text.font));
    let content_id = doc.add_object(Stream::new(
        Dictionary::new(),
        text_content(b"F1", text)?,
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => media_box.iter().map(|v| Object::Real(*v)).collect::<Vec<_>>(),
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    Ok(doc)
}

/// Converts the first page of `overlay` into a Form XObject that can be added to another
/// document.
fn overlay_form(overlay: &Document, media_box: [f32; 4]) -> Result<Stream> {
    let page_id = *overlay
        .get_pages()
        .values()
        .next()
        .context("overlay has no pages")?;
    let content = overlay.get_page_content(page_id)?;
    let resources = pdfpage::detach(
        overlay,
        &Object::Dictionary(pdfpage::effective_resources(overlay, page_id)?),
    )?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => media_box.iter().map(|v| Object::Real(*v)).collect::<Vec<_>>(),
        "Resources" => resources,
    };
    Ok(Stream::new(dict, content))
}
