use std::path::PathBuf;

pub type Result<T, E = StampError> = std::result::Result<T, E>;

/// Errors produced while configuring or running a stamping batch.
///
/// Template, source and configuration errors abort a batch before any job starts. The remaining
/// kinds are reported per job, wrapped in a [JobError].
#[derive(Debug, thiserror::Error, strum_macros::EnumDiscriminants)]
#[strum_discriminants(name(ErrorKind), derive(Hash, strum_macros::Display))]
pub enum StampError {
    #[error("template {path:?} does not exist")]
    TemplateNotFound { path: PathBuf },

    #[error("template {path:?} could not be read: {cause}")]
    TemplateUnreadable { path: PathBuf, cause: String },

    #[error("name source {path:?} could not be read: {cause}")]
    SourceUnreadable { path: PathBuf, cause: String },

    #[error("name source {path:?} contains no entries")]
    SourceListEmpty { path: PathBuf },

    #[error("unsupported font {name:?}, expected one of: {expected}")]
    UnsupportedFont { name: String, expected: String },

    #[error("invalid color {value:?}: {reason}")]
    InvalidColor { value: String, reason: &'static str },

    #[error("invalid font size {size}: must be a positive number of points")]
    InvalidFontSize { size: i64 },

    #[error("invalid position ({x}, {y}): coordinates must be finite numbers of points")]
    InvalidPosition { x: f32, y: f32 },

    #[error("invalid name format {format:?}: {reason}")]
    InvalidNameFormat { format: String, reason: String },

    #[error("rendering {text:?}: {cause}")]
    Render { text: String, cause: String },

    #[error("writing {path:?}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output path {path:?} is already taken")]
    OutputPathCollision { path: PathBuf },
}

impl StampError {
    pub fn kind(&self) -> ErrorKind {
        self.into()
    }

    /// Wraps an internal rendering failure, keeping its full context chain.
    pub(crate) fn render(text: &str, err: anyhow::Error) -> Self {
        Self::Render {
            text: text.to_string(),
            cause: format!("{err:#}"),
        }
    }
}

/// Failure of a single job within a batch. Other jobs are unaffected.
#[derive(Debug, thiserror::Error)]
#[error("entry {} ({:?}): {}", .index + 1, .input, .error)]
pub struct JobError {
    /// Zero-based position of the entry within the name source.
    pub index: usize,
    /// The entry as read from the name source, before formatting.
    pub input: String,
    pub error: StampError,
}

impl JobError {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}
