//! PDF fixtures, and inspection of the text shown on a stamped page.

use anyhow::{Context, Result, anyhow};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, content::Content, dictionary};

pub const LETTER: [f32; 4] = [0.0, 0.0, 612.0, 792.0];
pub const A4: [f32; 4] = [0.0, 0.0, 595.0, 842.0];

fn media_box_object(media_box: [f32; 4]) -> Object {
    Object::Array(media_box.iter().map(|v| Object::Real(*v)).collect())
}

/// Builds a document from a page tree. `page_dicts` are given `Type` and `Parent`.
fn build(page_dicts: Vec<Dictionary>, mut doc: Document) -> Vec<u8> {
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = page_dicts
        .into_iter()
        .map(|mut page| {
            page.set("Type", "Page");
            page.set("Parent", pages_id);
            doc.add_object(page).into()
        })
        .collect();
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("saving fixture PDF");
    buffer
}

/// A PDF of `page_count` empty pages of the given media box.
pub fn blank_pdf(media_box: [f32; 4], page_count: usize) -> Vec<u8> {
    let pages = (0..page_count)
        .map(|_| dictionary! { "MediaBox" => media_box_object(media_box) })
        .collect();
    build(pages, Document::with_version("1.5"))
}

/// A single US Letter page whose content stream is `content`, with Times-Roman available as
/// `/F1`, resembling a template with pre-printed text.
pub fn certificate_pdf(content: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });
    let content_id = doc.add_object(Stream::new(
        Dictionary::new(),
        content.as_bytes().to_vec(),
    ));
    let page = dictionary! {
        "MediaBox" => media_box_object(LETTER),
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        "Contents" => content_id,
    };
    build(vec![page], doc)
}

/// A structurally valid PDF with no pages.
pub fn pageless_pdf() -> Vec<u8> {
    build(Vec::new(), Document::with_version("1.5"))
}

/// Text shown by a `Tj` operator, with the state in effect when it was shown.
#[derive(Clone, Debug, PartialEq)]
pub struct ShownText {
    /// Shown bytes, decoded as Latin-1.
    pub text: String,
    pub base_font: String,
    pub size: f32,
    /// Start of the baseline.
    pub x: f32,
    pub y: f32,
    /// Nonstroking RGB color.
    pub color: [f32; 3],
}

/// Returns all text shown on the first page of `pdf`, following Form XObjects.
///
/// Only the operators used by stamping and the fixtures are interpreted: transformation matrices
/// other than `Td` translation are ignored.
pub fn shown_text(pdf: &[u8]) -> Result<Vec<ShownText>> {
    let doc = Document::load_mem(pdf).context("loading PDF")?;
    let page_id = *doc
        .get_pages()
        .values()
        .next()
        .ok_or_else(|| anyhow!("PDF has no pages"))?;
    let resources = page_resources(&doc, page_id)?;
    let content = doc.get_page_content(page_id)?;

    let mut shown = Vec::new();
    interpret(&doc, &content, &resources, [0.0; 3], &mut shown, 0)?;
    Ok(shown)
}

fn resolve<'d>(doc: &'d Document, object: &'d Object) -> Result<&'d Object> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    match doc.get_dictionary(page_id)?.get(b"Resources") {
        Ok(resources) => Ok(resolve(doc, resources)?.as_dict()?.clone()),
        Err(_) => Ok(Dictionary::new()),
    }
}

fn resource<'d>(
    doc: &'d Document,
    resources: &'d Dictionary,
    category: &[u8],
    name: &[u8],
) -> Result<&'d Object> {
    let entries = resolve(doc, resources.get(category)?)?.as_dict()?;
    resolve(doc, entries.get(name)?)
}

fn interpret(
    doc: &Document,
    content: &[u8],
    resources: &Dictionary,
    initial_color: [f32; 3],
    shown: &mut Vec<ShownText>,
    depth: usize,
) -> Result<()> {
    if depth > 8 {
        return Err(anyhow!("Form XObjects nested too deeply"));
    }

    let mut color = initial_color;
    let mut saved_colors = Vec::new();
    let mut font: Option<(String, f32)> = None;
    let (mut x, mut y) = (0.0, 0.0);

    for op in Content::decode(content)?.operations {
        let operand = |i: usize| {
            op.operands
                .get(i)
                .ok_or_else(|| anyhow!("{} is missing operand {i}", op.operator))
        };
        let number = |i: usize| -> Result<f32> { Ok(operand(i)?.as_float()?) };

        match op.operator.as_str() {
            "q" => saved_colors.push(color),
            "Q" => color = saved_colors.pop().unwrap_or(initial_color),
            "rg" => color = [number(0)?, number(1)?, number(2)?],
            "BT" => (x, y) = (0.0, 0.0),
            "Td" => {
                x += number(0)?;
                y += number(1)?;
            }
            "Tf" => {
                let font_dict = resource(doc, resources, b"Font", operand(0)?.as_name()?)?;
                let base_font = font_dict.as_dict()?.get(b"BaseFont")?.as_name()?;
                font = Some((String::from_utf8_lossy(base_font).into_owned(), number(1)?));
            }
            "Tj" => {
                let (base_font, size) = font.clone().ok_or_else(|| anyhow!("Tj before Tf"))?;
                shown.push(ShownText {
                    text: operand(0)?.as_str()?.iter().map(|b| *b as char).collect(),
                    base_font,
                    size,
                    x,
                    y,
                    color,
                });
            }
            "Do" => {
                let form = resource(doc, resources, b"XObject", operand(0)?.as_name()?)?
                    .as_stream()?;
                let form_resources = match form.dict.get(b"Resources") {
                    Ok(value) => resolve(doc, value)?.as_dict()?.clone(),
                    Err(_) => resources.clone(),
                };
                let form_content = if form.dict.has(b"Filter") {
                    form.decompressed_content()?
                } else {
                    form.content.clone()
                };
                interpret(doc, &form_content, &form_resources, color, shown, depth + 1)?;
            }
            _ => {}
        }
    }
    Ok(())
}
