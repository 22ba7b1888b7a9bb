//! Text templates that turn a name source entry into the text stamped on its certificate.

use std::str::FromStr;

use hashbrown::HashMap;
use lazy_regex::regex;
use strum::IntoEnumIterator;

use crate::{
    error::{Result, StampError},
    fmtutil,
};

/// Values that may be substituted into a [NameFormat], written as `{name}` or `{index}`.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    strum_macros::Display,
    strum_macros::EnumIter,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum Placeholder {
    /// The entry as read from the name source.
    Name,
    /// 1-based position of the entry in the name source.
    Index,
}

#[derive(Clone, Debug, PartialEq)]
enum Segment {
    Literal(String),
    Value(Placeholder),
}

/// Parsed text template, such as `Certificate for {name}`. Literal braces are written `{{` and
/// `}}`.
#[derive(Clone, Debug, PartialEq)]
pub struct NameFormat {
    source: String,
    segments: Vec<Segment>,
}

impl NameFormat {
    /// Parses and validates `format`.
    pub fn parse(format: &str) -> Result<Self> {
        let invalid = |reason: String| StampError::InvalidNameFormat {
            format: format.to_string(),
            reason,
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut last_end = 0;
        for captures in regex!(r"\{\{|\}\}|\{([^{}]*)\}|[{}]").captures_iter(format) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            literal.push_str(&format[last_end..whole.start()]);
            last_end = whole.end();

            match (whole.as_str(), captures.get(1)) {
                ("{{", _) => literal.push('{'),
                ("}}", _) => literal.push('}'),
                (_, Some(key)) => {
                    let placeholder = Placeholder::from_str(key.as_str().trim()).map_err(|_| {
                        invalid(format!(
                            "unknown placeholder {{{}}}, expected one of: {}",
                            key.as_str(),
                            fmtutil::join_display(
                                Placeholder::iter().map(|p| format!("{{{p}}}")),
                                ", "
                            )
                        ))
                    })?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Value(placeholder));
                }
                (brace, None) => {
                    return Err(invalid(format!(
                        "unbalanced {brace:?} at position {}; write {brace}{brace} for a literal brace",
                        whole.start()
                    )));
                }
            }
        }
        literal.push_str(&format[last_end..]);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let format = Self {
            source: format.to_string(),
            segments,
        };
        if !format.uses(Placeholder::Name) {
            log::warn!(
                "Name format {:?} does not include {{name}}, so every certificate gets the same name.",
                format.source
            );
        }
        Ok(format)
    }

    /// The format as originally written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` if `placeholder` appears in the format.
    pub fn uses(&self, placeholder: Placeholder) -> bool {
        self.segments
            .iter()
            .any(|segment| *segment == Segment::Value(placeholder))
    }

    /// Substitutes placeholders from `values`. Placeholders without a value are left empty.
    pub fn render(&self, values: &HashMap<Placeholder, String>) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.as_str(),
                Segment::Value(placeholder) => {
                    values.get(placeholder).map(String::as_str).unwrap_or("")
                }
            })
            .collect()
    }

    /// Renders the text for the entry `name` at zero-based position `index` in its name source.
    pub fn format_entry(&self, name: &str, index: usize) -> String {
        let values = HashMap::from([
            (Placeholder::Name, name.to_string()),
            (Placeholder::Index, (index + 1).to_string()),
        ]);
        self.render(&values)
    }
}

impl Default for NameFormat {
    fn default() -> Self {
        Self {
            source: "{name}".to_string(),
            segments: vec![Segment::Value(Placeholder::Name)],
        }
    }
}

impl FromStr for NameFormat {
    type Err = StampError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
