//! Output file naming within a batch.

use std::path::{Path, PathBuf};

use hashbrown::HashSet;
use serde::Deserialize;

use crate::error::{Result, StampError};

/// Default prefix of output file names.
pub const DEFAULT_PREFIX: &str = "certificate_";

/// Longest slug used in a file name, in UTF-8 bytes. File names are limited to 255 bytes on
/// most filesystems, which leaves room for the prefix and any suffix.
const MAX_SLUG_BYTES: usize = 150;

/// How output file names are derived from each entry.
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
pub enum OutputNaming {
    /// The entry's 1-based position, zero-padded to the width of the batch size.
    Sequence,
    /// A filesystem-safe form of the stamped text.
    #[default]
    Slug,
}

/// What to do when two entries of a batch would be written to the same file.
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
pub enum CollisionPolicy {
    /// Appends `_2`, `_3`, ... to the later entry's name.
    #[default]
    Suffix,
    /// Fails the later entry with [StampError::OutputPathCollision].
    Fail,
}

/// Replaces every character other than alphanumerics, space, hyphen and underscore with `_`.
/// Long text is cut at a character boundary to fit [MAX_SLUG_BYTES].
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for c in text.chars() {
        let c = if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_') {
            c
        } else {
            '_'
        };
        if slug.len() + c.len_utf8() > MAX_SLUG_BYTES {
            break;
        }
        slug.push(c);
    }
    slug
}

/// Assigns output paths to the entries of a batch, resolving collisions between them.
///
/// Names are compared case-insensitively, so outputs also stay distinct on case-insensitive
/// filesystems.
#[derive(Debug)]
pub struct OutputNamer {
    dir: PathBuf,
    prefix: String,
    naming: OutputNaming,
    collisions: CollisionPolicy,
    sequence_width: usize,
    taken: HashSet<String>,
}

impl OutputNamer {
    /// Creates a namer for a batch of `total` entries written into `dir`.
    pub fn new(
        dir: &Path,
        prefix: &str,
        naming: OutputNaming,
        collisions: CollisionPolicy,
        total: usize,
    ) -> Self {
        Self {
            dir: dir.to_owned(),
            prefix: prefix.to_string(),
            naming,
            collisions,
            sequence_width: total.max(1).to_string().len(),
            taken: HashSet::new(),
        }
    }

    /// Returns the path for the entry at zero-based `index`, whose stamped text is `text`.
    pub fn assign(&mut self, index: usize, text: &str) -> Result<PathBuf> {
        let sequence = || format!("{:0width$}", index + 1, width = self.sequence_width);
        let stem = match self.naming {
            OutputNaming::Sequence => sequence(),
            OutputNaming::Slug => match slugify(text) {
                slug if slug.trim().is_empty() => {
                    log::debug!("Text {text:?} has no usable slug, naming by position.");
                    sequence()
                }
                slug => slug,
            },
        };

        let mut file_name = format!("{}{stem}.pdf", self.prefix);
        let mut attempt = 1;
        while self.taken.contains(&file_name.to_lowercase()) {
            match self.collisions {
                CollisionPolicy::Fail => {
                    return Err(StampError::OutputPathCollision {
                        path: self.dir.join(file_name),
                    });
                }
                CollisionPolicy::Suffix => {
                    attempt += 1;
                    file_name = format!("{}{stem}_{attempt}.pdf", self.prefix);
                }
            }
        }

        self.taken.insert(file_name.to_lowercase());
        Ok(self.dir.join(file_name))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;
    use googletest::prelude::*;
    use test_casing::test_casing;

    use super::*;
    use crate::error::ErrorKind;

    fn namer(naming: OutputNaming, collisions: CollisionPolicy, total: usize) -> OutputNamer {
        OutputNamer::new(Path::new("out"), DEFAULT_PREFIX, naming, collisions, total)
    }

    #[test_casing(6, [
        ("John Smith", "John Smith"),
        ("Zoë-Ann_Lee", "Zoë-Ann_Lee"),
        ("O'Brien", "O_Brien"),
        ("a/b\\c", "a_b_c"),
        ("Dr. Who?", "Dr_ Who_"),
        ("", ""),
    ])]
    fn test_slugify(text: &str, expected: &str) {
        assert_that!(slugify(text), eq(expected));
    }

    #[gtest]
    fn test_slugify_truncates() {
        expect_that!(slugify(&"x".repeat(500)).len(), eq(MAX_SLUG_BYTES));
    }

    #[gtest]
    fn test_slugify_truncates_multibyte_by_bytes() {
        let slug = slugify(&"é".repeat(150));
        expect_that!(slug.len(), eq(MAX_SLUG_BYTES));
        expect_that!(slug.chars().count(), eq(MAX_SLUG_BYTES / 2));

        // Three byte characters cannot fill the limit exactly, so the last one is dropped whole.
        let slug = slugify(&format!("a{}", "李".repeat(100)));
        expect_that!(slug.len(), eq(148));
        expect_that!(slug, ends_with("李"));
    }

    #[gtest]
    fn test_long_latin_name_fits_file_name_limit() -> anyhow::Result<()> {
        let mut namer = namer(OutputNaming::Slug, CollisionPolicy::Suffix, 2);
        let name = "Ñ".repeat(150);

        namer.assign(0, &name)?;
        let path = namer.assign(1, &name)?;

        let file_name = path.file_name().context("no file name")?;
        expect_that!(file_name.len(), le(255));
        expect_that!(file_name.to_string_lossy().into_owned(), ends_with("_2.pdf"));
        Ok(())
    }

    #[gtest]
    fn test_slug_collisions_get_suffixes() {
        let mut namer = namer(OutputNaming::Slug, CollisionPolicy::Suffix, 3);

        expect_that!(
            namer.assign(0, "John Smith"),
            ok(eq(&PathBuf::from("out/certificate_John Smith.pdf")))
        );
        expect_that!(
            namer.assign(1, "John Smith"),
            ok(eq(&PathBuf::from("out/certificate_John Smith_2.pdf")))
        );
        expect_that!(
            namer.assign(2, "John Smith"),
            ok(eq(&PathBuf::from("out/certificate_John Smith_3.pdf")))
        );
    }

    #[gtest]
    fn test_slug_collision_fails() {
        let mut namer = namer(OutputNaming::Slug, CollisionPolicy::Fail, 2);

        expect_that!(
            namer.assign(0, "John Smith"),
            ok(eq(&PathBuf::from("out/certificate_John Smith.pdf")))
        );
        expect_that!(
            namer.assign(1, "John Smith").map_err(|e| e.kind()),
            err(eq(&ErrorKind::OutputPathCollision))
        );
    }

    #[gtest]
    fn test_collisions_ignore_case() {
        let mut namer = namer(OutputNaming::Slug, CollisionPolicy::Suffix, 2);

        namer.assign(0, "ada lovelace").expect("first name");

        expect_that!(
            namer.assign(1, "Ada Lovelace"),
            ok(eq(&PathBuf::from("out/certificate_Ada Lovelace_2.pdf")))
        );
    }

    #[gtest]
    fn test_suffix_skips_names_already_taken() {
        let mut namer = namer(OutputNaming::Slug, CollisionPolicy::Suffix, 3);

        namer.assign(0, "Ann_2").expect("first name");
        namer.assign(1, "Ann").expect("second name");

        expect_that!(
            namer.assign(2, "Ann"),
            ok(eq(&PathBuf::from("out/certificate_Ann_3.pdf")))
        );
    }

    #[test_casing(4, [(1, 0, "1"), (9, 8, "9"), (10, 0, "01"), (250, 41, "042")])]
    fn test_sequence_is_zero_padded(total: usize, index: usize, expected: &str) {
        let mut namer = namer(OutputNaming::Sequence, CollisionPolicy::Fail, total);
        assert_that!(
            namer.assign(index, "ignored"),
            ok(eq(&PathBuf::from(format!("out/certificate_{expected}.pdf"))))
        );
    }

    #[gtest]
    fn test_blank_slug_falls_back_to_sequence() {
        let mut namer = namer(OutputNaming::Slug, CollisionPolicy::Suffix, 12);
        expect_that!(
            namer.assign(4, ""),
            ok(eq(&PathBuf::from("out/certificate_05.pdf")))
        );
    }

    #[gtest]
    fn test_custom_prefix() {
        let mut namer = OutputNamer::new(
            Path::new("out"),
            "award-",
            OutputNaming::Slug,
            CollisionPolicy::Suffix,
            1,
        );
        expect_that!(
            namer.assign(0, "Jane Doe"),
            ok(eq(&PathBuf::from("out/award-Jane Doe.pdf")))
        );
    }

    #[gtest]
    fn test_policy_names() {
        expect_that!("suffix".parse::<CollisionPolicy>(), ok(eq(CollisionPolicy::Suffix)));
        expect_that!("SEQUENCE".parse::<OutputNaming>(), ok(eq(OutputNaming::Sequence)));
        expect_that!(OutputNaming::Slug.to_string(), eq("slug"));
    }
}
