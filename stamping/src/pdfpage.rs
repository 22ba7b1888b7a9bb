//! Page tree helpers over [lopdf::Document].
//!
//! Page attributes such as `Resources` and `MediaBox` may be inherited from ancestors in the page
//! tree, and their values may be indirect references. These helpers resolve both.

use anyhow::{Context, Result, anyhow};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// US Letter, used when no media box can be found.
pub const LETTER_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Page attributes that a page may inherit from its ancestors.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

const MAX_DEPTH: usize = 32;

/// Follows `object` if it is a reference.
pub fn resolve<'d>(doc: &'d Document, object: &'d Object) -> Result<&'d Object> {
    match object {
        Object::Reference(id) => doc
            .get_object(*id)
            .with_context(|| format!("resolving reference {id:?}")),
        other => Ok(other),
    }
}

/// Returns the value of `key` on the page, or on its nearest ancestor that has it.
pub fn inherited_attribute<'d>(
    doc: &'d Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'d Object>> {
    let mut node = doc.get_dictionary(page_id)?;
    for _ in 0..MAX_DEPTH {
        if let Ok(value) = node.get(key) {
            return Ok(Some(value));
        }
        match node.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent_id) => node = doc.get_dictionary(parent_id)?,
            Err(_) => return Ok(None),
        }
    }
    Err(anyhow!("page tree is deeper than {MAX_DEPTH} levels"))
}

/// Media box of the page as `[llx, lly, urx, ury]`.
pub fn media_box(doc: &Document, page_id: ObjectId) -> Result<[f32; 4]> {
    let Some(value) = inherited_attribute(doc, page_id, b"MediaBox")? else {
        log::debug!("Page {page_id:?} has no media box, assuming US Letter.");
        return Ok(LETTER_MEDIA_BOX);
    };
    read_rectangle(doc, value, "MediaBox")
}

/// Visible region of the page as `[llx, lly, urx, ury]`: the crop box clipped to the media box,
/// or the media box if there is no crop box.
pub fn crop_box(doc: &Document, page_id: ObjectId) -> Result<[f32; 4]> {
    let media = media_box(doc, page_id)?;
    let Some(value) = inherited_attribute(doc, page_id, b"CropBox")? else {
        return Ok(media);
    };
    let crop = read_rectangle(doc, value, "CropBox")?;
    let clipped = [
        crop[0].max(media[0]),
        crop[1].max(media[1]),
        crop[2].min(media[2]),
        crop[3].min(media[3]),
    ];
    if clipped[0] >= clipped[2] || clipped[1] >= clipped[3] {
        log::debug!("Page {page_id:?} crop box lies outside its media box, ignoring it.");
        return Ok(media);
    }
    Ok(clipped)
}

/// Clockwise rotation of the page when displayed, in degrees: one of 0, 90, 180 or 270.
pub fn rotation(doc: &Document, page_id: ObjectId) -> Result<u16> {
    let Some(value) = inherited_attribute(doc, page_id, b"Rotate")? else {
        return Ok(0);
    };
    let degrees = resolve(doc, value)?
        .as_i64()
        .context("Rotate is not an integer")?;
    if degrees % 90 != 0 {
        return Err(anyhow!("Rotate is {degrees}, expected a multiple of 90"));
    }
    // Always in 0..360, so it fits.
    Ok(degrees.rem_euclid(360) as u16)
}

/// Reads a rectangle, normalising it so that the lower left corner comes first.
fn read_rectangle(doc: &Document, value: &Object, key: &str) -> Result<[f32; 4]> {
    let values = resolve(doc, value)?
        .as_array()
        .with_context(|| format!("{key} is not an array"))?
        .iter()
        .map(|v| resolve(doc, v).and_then(|v| Ok(v.as_float()?)))
        .collect::<Result<Vec<f32>>>()
        .with_context(|| format!("reading {key}"))?;
    let [x1, y1, x2, y2] = <[f32; 4]>::try_from(values)
        .map_err(|values| anyhow!("{key} has {} values, expected 4", values.len()))?;
    Ok([x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)])
}

/// Returns a copy of the resources in effect for the page.
pub fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    match inherited_attribute(doc, page_id, b"Resources")? {
        Some(value) => Ok(resolve(doc, value)?
            .as_dict()
            .context("Resources is not a dictionary")?
            .clone()),
        None => Ok(Dictionary::new()),
    }
}

/// Returns a copy of the dictionary at `key` in `dict`, or an empty one if absent.
fn resolved_subdict(doc: &Document, dict: &Dictionary, key: &[u8]) -> Result<Dictionary> {
    match dict.get(key) {
        Ok(value) => Ok(resolve(doc, value)?
            .as_dict()
            .with_context(|| format!("{} is not a dictionary", String::from_utf8_lossy(key)))?
            .clone()),
        Err(_) => Ok(Dictionary::new()),
    }
}

fn dict_mut(doc: &mut Document, id: ObjectId) -> Result<&mut Dictionary> {
    Ok(doc.get_object_mut(id)?.as_dict_mut()?)
}

/// First name `<prefix><n>` not already used in `dict`.
fn unused_name(dict: &Dictionary, prefix: &str) -> Vec<u8> {
    let mut n = 1;
    loop {
        let name = format!("{prefix}{n}").into_bytes();
        if !dict.has(&name) {
            return name;
        }
        n += 1;
    }
}

/// Adds `value` to the page's resources under `category` (e.g. `Font`), returning the name it was
/// given.
///
/// The page gets its own copy of its resources, so resources shared with other pages are left
/// untouched.
pub fn add_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &[u8],
    prefix: &str,
    value: Object,
) -> Result<Vec<u8>> {
    let mut resources = effective_resources(doc, page_id)?;
    let mut entries = resolved_subdict(doc, &resources, category)?;
    let name = unused_name(&entries, prefix);
    entries.set(name.clone(), value);
    resources.set(category.to_vec(), Object::Dictionary(entries));
    dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(resources));
    Ok(name)
}

fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc.get_dictionary(page_id)?;
    Ok(match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(streams)) => streams.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(streams)) => streams.clone(),
        _ => Vec::new(),
    })
}

/// Draws `content` over the page's existing content.
///
/// The existing content is wrapped in `q`/`Q` so any graphics state it leaves behind does not
/// affect `content`.
pub fn append_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let existing = existing_contents(doc, page_id)?;

    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let mut close = b"Q\n".to_vec();
    close.extend(content);
    let close_id = doc.add_object(Stream::new(Dictionary::new(), close));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(close_id));

    dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}

/// Copies `object`, replacing references with the objects they refer to, so it can be used in
/// another document. Streams cannot be inlined and are rejected.
pub fn detach(doc: &Document, object: &Object) -> Result<Object> {
    detach_depth(doc, object, MAX_DEPTH)
}

fn detach_depth(doc: &Document, object: &Object, depth: usize) -> Result<Object> {
    if depth == 0 {
        return Err(anyhow!("object nesting is deeper than {MAX_DEPTH} levels"));
    }
    match object {
        Object::Reference(_) => detach_depth(doc, resolve(doc, object)?, depth - 1),
        Object::Array(items) => Ok(Object::Array(
            items
                .iter()
                .map(|item| detach_depth(doc, item, depth - 1))
                .collect::<Result<_>>()?,
        )),
        Object::Dictionary(dict) => {
            let mut detached = Dictionary::new();
            for (key, value) in dict.iter() {
                detached.set(key.clone(), detach_depth(doc, value, depth - 1)?);
            }
            Ok(Object::Dictionary(detached))
        }
        Object::Stream(_) => Err(anyhow!("cannot detach a stream object")),
        other => Ok(other.clone()),
    }
}

/// Reduces the document to the single page `page_id`, keeping any attributes it inherited, and
/// drops objects that are no longer reachable.
pub fn isolate_page(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    for key in INHERITABLE {
        if doc.get_dictionary(page_id)?.has(key) {
            continue;
        }
        let inherited = inherited_attribute(doc, page_id, key)?.cloned();
        if let Some(value) = inherited {
            dict_mut(doc, page_id)?.set(key.to_vec(), value);
        }
    }

    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .context("document has no catalog")?;
    let pages_id = doc
        .get_dictionary(catalog_id)?
        .get(b"Pages")
        .and_then(Object::as_reference)
        .context("catalog has no page tree")?;

    let pages = dict_mut(doc, pages_id)?;
    pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    pages.set("Count", Object::Integer(1));
    dict_mut(doc, page_id)?.set("Parent", Object::Reference(pages_id));

    let pruned = doc.prune_objects();
    log::trace!("Pruned {} unreachable objects.", pruned.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;
    use lopdf::dictionary;
    use test_casing::test_casing;

    use super::*;

    /// Two pages under an intermediate node that carries the media box and resources.
    fn nested_tree() -> (Document, ObjectId, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let root_pages_id = doc.new_object_id();
        let inner_pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let first_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => inner_pages_id,
        });
        let second_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => inner_pages_id,
        });
        doc.objects.insert(
            inner_pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Parent" => root_pages_id,
                "Kids" => vec![first_id.into(), second_id.into()],
                "Count" => 2,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                "Resources" => resources_id,
            }),
        );
        doc.objects.insert(
            root_pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![inner_pages_id.into()],
                "Count" => 2,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => root_pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        (doc, first_id, second_id)
    }

    #[gtest]
    fn test_media_box_is_inherited() -> anyhow::Result<()> {
        let (doc, first_id, _) = nested_tree();
        expect_that!(media_box(&doc, first_id)?, eq([0.0, 0.0, 595.0, 842.0]));
        Ok(())
    }

    #[gtest]
    fn test_crop_box_defaults_to_media_box() -> anyhow::Result<()> {
        let (doc, first_id, _) = nested_tree();
        expect_that!(crop_box(&doc, first_id)?, eq([0.0, 0.0, 595.0, 842.0]));
        expect_that!(rotation(&doc, first_id)?, eq(0));
        Ok(())
    }

    #[gtest]
    fn test_crop_box_is_clipped_to_media_box() -> anyhow::Result<()> {
        let (mut doc, first_id, _) = nested_tree();
        dict_mut(&mut doc, first_id)?.set(
            "CropBox",
            vec![(-10).into(), 600.into(), 300.into(), 100.into()],
        );

        expect_that!(crop_box(&doc, first_id)?, eq([0.0, 100.0, 300.0, 600.0]));
        Ok(())
    }

    #[test_casing(5, [(0, 0), (90, 90), (-90, 270), (540, 180), (-720, 0)])]
    fn test_rotation_is_normalised(rotate: i64, expected: u16) {
        let (mut doc, first_id, _) = nested_tree();
        let inner_pages_id = doc
            .get_dictionary(first_id)
            .and_then(|page| page.get(b"Parent"))
            .and_then(Object::as_reference)
            .expect("page has a parent");
        dict_mut(&mut doc, inner_pages_id)
            .expect("parent dictionary")
            .set("Rotate", rotate);

        assert_that!(rotation(&doc, first_id), ok(eq(&expected)));
    }

    #[gtest]
    fn test_rotation_must_be_right_angle() -> anyhow::Result<()> {
        let (mut doc, first_id, _) = nested_tree();
        dict_mut(&mut doc, first_id)?.set("Rotate", 45);

        expect_that!(rotation(&doc, first_id), err(displays_as(contains_substring("45"))));
        Ok(())
    }

    #[gtest]
    fn test_add_resource_avoids_existing_names() -> anyhow::Result<()> {
        let (mut doc, first_id, second_id) = nested_tree();
        let name = add_resource(&mut doc, first_id, b"Font", "F", Object::Null)?;
        expect_that!(name, eq(&b"F2".to_vec()));

        let fonts = resolved_subdict(&doc, &effective_resources(&doc, first_id)?, b"Font")?;
        expect_that!(fonts.has(b"F1"), eq(true));
        expect_that!(fonts.has(b"F2"), eq(true));

        // The sibling page still sees the shared, unmodified resources.
        let sibling_fonts =
            resolved_subdict(&doc, &effective_resources(&doc, second_id)?, b"Font")?;
        expect_that!(sibling_fonts.has(b"F2"), eq(false));
        Ok(())
    }

    #[gtest]
    fn test_append_content_wraps_existing() -> anyhow::Result<()> {
        let (mut doc, first_id, _) = nested_tree();
        let existing_id = doc.add_object(Stream::new(Dictionary::new(), b"1 0 0 1 5 5 cm\n".to_vec()));
        dict_mut(&mut doc, first_id)?.set("Contents", existing_id);

        append_content(&mut doc, first_id, b"BT ET\n".to_vec())?;

        let content = String::from_utf8(doc.get_page_content(first_id)?)?;
        expect_that!(content, starts_with("q\n"));
        expect_that!(content, contains_substring("1 0 0 1 5 5 cm\n"));
        expect_that!(content, ends_with("Q\nBT ET\n"));
        Ok(())
    }

    #[gtest]
    fn test_isolate_page_keeps_inherited_attributes() -> anyhow::Result<()> {
        let (mut doc, first_id, second_id) = nested_tree();

        isolate_page(&mut doc, first_id)?;

        let pages = doc.get_pages();
        expect_that!(pages.len(), eq(1));
        expect_that!(pages.get(&1), some(eq(&first_id)));
        expect_that!(doc.get_object(second_id).is_err(), eq(true));
        expect_that!(media_box(&doc, first_id)?, eq([0.0, 0.0, 595.0, 842.0]));
        let fonts = resolved_subdict(&doc, &effective_resources(&doc, first_id)?, b"Font")?;
        expect_that!(fonts.has(b"F1"), eq(true));
        Ok(())
    }

    #[gtest]
    fn test_detach_inlines_references() -> anyhow::Result<()> {
        let (doc, first_id, _) = nested_tree();
        let resources = Object::Dictionary(effective_resources(&doc, first_id)?);

        let detached = detach(&doc, &resources)?;

        let font = detached
            .as_dict()?
            .get(b"Font")?
            .as_dict()?
            .get(b"F1")?
            .as_dict()?;
        expect_that!(font.get(b"BaseFont")?.as_name()?, eq(b"Courier".as_slice()));
        Ok(())
    }
}
