use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use lopdf::{Document, ObjectId};

use crate::{
    error::{Result, StampError},
    pdfpage,
};

/// A certificate template, loaded once and shared read-only by every job of a batch. Only its
/// first page is used.
#[derive(Debug)]
pub struct Template {
    path: PathBuf,
    bytes: Arc<[u8]>,
    document: Document,
    first_page: ObjectId,
    page_count: usize,
    media_box: [f32; 4],
    crop_box: [f32; 4],
    rotation: u16,
}

impl Template {
    /// Loads the template PDF at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StampError::TemplateNotFound {
                path: path.to_owned(),
            });
        }
        let bytes = std::fs::read(path).map_err(|err| StampError::TemplateUnreadable {
            path: path.to_owned(),
            cause: err.to_string(),
        })?;
        Self::from_bytes(path, &bytes)
    }

    /// Loads a template from PDF bytes. `path` is only used to identify it in messages.
    pub fn from_bytes<P>(path: P, bytes: &[u8]) -> Result<Self>
    where
        P: Into<PathBuf>,
    {
        let template = Self::parse(path.into(), bytes.into())?;
        if template.page_count > 1 {
            log::warn!(
                "Template {:?} has {} pages, only the first page is used.",
                template.path,
                template.page_count
            );
        }
        Ok(template)
    }

    /// Parses a separate copy of a template from its [Template::path] and [Template::bytes], for
    /// use on another thread. Unlike [Template::from_bytes], nothing is logged.
    pub fn reparse(path: &Path, bytes: &[u8]) -> Result<Self> {
        Self::parse(path.to_owned(), bytes.into())
    }

    fn parse(path: PathBuf, bytes: Arc<[u8]>) -> Result<Self> {
        let unreadable = |cause: String| StampError::TemplateUnreadable {
            path: path.clone(),
            cause,
        };

        let document = Document::load_mem(&bytes).map_err(|err| unreadable(err.to_string()))?;

        if document.is_encrypted() {
            return Err(unreadable("encrypted documents are not supported".into()));
        }

        let pages = document.get_pages();
        let Some(&first_page) = pages.values().next() else {
            return Err(unreadable("document has no pages".into()));
        };

        let media_box = pdfpage::media_box(&document, first_page)
            .map_err(|err| unreadable(format!("{err:#}")))?;
        let crop_box = pdfpage::crop_box(&document, first_page)
            .map_err(|err| unreadable(format!("{err:#}")))?;
        let rotation = pdfpage::rotation(&document, first_page)
            .map_err(|err| unreadable(format!("{err:#}")))?;

        Ok(Self {
            page_count: pages.len(),
            path,
            bytes,
            document,
            first_page,
            media_box,
            crop_box,
            rotation,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The template file as read.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn first_page_id(&self) -> ObjectId {
        self.first_page
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Media box of the first page as `[llx, lly, urx, ury]`.
    pub fn media_box(&self) -> [f32; 4] {
        self.media_box
    }

    /// Visible region of the first page, which is what viewers display.
    pub fn crop_box(&self) -> [f32; 4] {
        self.crop_box
    }

    /// Clockwise rotation of the first page when displayed, in degrees.
    pub fn rotation(&self) -> u16 {
        self.rotation
    }

    /// Width and height of the first page in points.
    pub fn page_size(&self) -> (f32, f32) {
        let [llx, lly, urx, ury] = self.media_box;
        (urx - llx, ury - lly)
    }
}
