//! Reading the list of names to stamp from a CSV file.

use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use crate::error::{Result, StampError};

/// Header cells that mark a column as holding names, compared case-insensitively.
const NAME_HEADERS: [&str; 5] = ["name", "names", "full name", "full_name", "fullname"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Controls how entries are read from a name source.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceOptions {
    /// Header of the column to read. If unset, a column with a recognised name header is used,
    /// or else the first column of every row.
    pub column: Option<String>,
}

/// Reads the names in the CSV file at `path`.
pub fn read_names(path: &Path, options: &SourceOptions) -> Result<Vec<String>> {
    let bytes = std::fs::read(path).map_err(|err| StampError::SourceUnreadable {
        path: path.to_owned(),
        cause: err.to_string(),
    })?;
    parse_names(path, &bytes, options)
}

/// Reads names from CSV `bytes`. `path` only identifies the source in errors.
pub fn parse_names(path: &Path, bytes: &[u8], options: &SourceOptions) -> Result<Vec<String>> {
    let unreadable = |cause: String| StampError::SourceUnreadable {
        path: path.to_owned(),
        cause,
    };

    let text = decode(path, bytes);
    let records = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes())
        .into_records()
        .collect::<std::result::Result<Vec<csv::StringRecord>, csv::Error>>()
        .map_err(|err| unreadable(err.to_string()))?;

    let (column, skip) = match (&options.column, records.first()) {
        (Some(wanted), first) => {
            let wanted = wanted.trim();
            let column = first
                .and_then(|header| find_column(header, |cell| cell.eq_ignore_ascii_case(wanted)))
                .ok_or_else(|| unreadable(format!("no column headed {wanted:?}")))?;
            (column, 1)
        }
        (None, Some(header)) => match find_column(header, is_name_header) {
            Some(column) => (column, 1),
            None => (0, 0),
        },
        (None, None) => (0, 0),
    };
    log::debug!("Reading names from column {column} of {path:?}, skipping {skip} header rows.");

    let names: Vec<String> = records
        .iter()
        .skip(skip)
        .filter_map(|record| record.get(column))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();

    if names.is_empty() {
        return Err(StampError::SourceListEmpty {
            path: PathBuf::from(path),
        });
    }
    log::info!("Read {} names from {path:?}.", names.len());
    Ok(names)
}

/// Decodes `bytes` as UTF-8 without any byte order mark, falling back to Latin-1 if it is not
/// valid UTF-8.
fn decode<'b>(path: &Path, bytes: &'b [u8]) -> Cow<'b, str> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(err) => {
            log::info!("{path:?} is not valid UTF-8 ({err}), reading it as Latin-1.");
            Cow::Owned(bytes.iter().map(|b| *b as char).collect())
        }
    }
}

fn find_column<F>(header: &csv::StringRecord, matches: F) -> Option<usize>
where
    F: Fn(&str) -> bool,
{
    header.iter().position(|cell| matches(cell.trim()))
}

fn is_name_header(cell: &str) -> bool {
    NAME_HEADERS
        .iter()
        .any(|header| cell.eq_ignore_ascii_case(header))
}
