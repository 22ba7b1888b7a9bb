//! Stamps personalised text onto the first page of a PDF certificate template, one output PDF
//! per entry of a name list.

pub mod batch;
pub mod color;
pub mod error;
pub mod fmtutil;
pub mod font;
pub mod nameformat;
pub mod naming;
pub mod output;
pub mod pdfpage;
pub mod render;
pub mod settings;
pub mod source;
pub mod stamp;
pub mod template;

pub use error::{ErrorKind, JobError, Result, StampError};
