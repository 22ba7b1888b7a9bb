use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use stamping::{
    naming::{CollisionPolicy, OutputNaming},
    render::RenderStrategy,
    settings::Settings,
};

/// Name of the settings file looked up in the XDG configuration directories.
const SETTINGS_FILE: &str = "settings.yaml";

/// CLI arguments selecting the [Settings], with overrides for each of them.
#[derive(Args, Clone, Debug, Default)]
pub struct StampArgs {
    /// Path to a YAML settings file. If not given, `signit/settings.yaml` is used from the XDG
    /// configuration directories if it exists, otherwise the default settings.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Font to stamp with: a family name (e.g. Helvetica), or a specific variant (e.g.
    /// Helvetica-BoldOblique). The fonts command lists them.
    #[arg(long)]
    font: Option<String>,

    /// Font size in points.
    #[arg(long)]
    font_size: Option<i64>,

    /// Use the bold variant of the font.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    bold: Option<bool>,

    /// Use the italic variant of the font.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    italic: Option<bool>,

    /// Text color as six hex digits, e.g. #1F3A5C.
    #[arg(long)]
    color: Option<String>,

    /// Horizontal position of the text, in points from the left of the page.
    #[arg(long, allow_negative_numbers = true)]
    x: Option<f32>,

    /// Vertical position of the text, in points from the bottom of the page.
    #[arg(long, allow_negative_numbers = true)]
    y: Option<f32>,

    /// Center the text on the position, rather than starting its baseline there.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    centered: Option<bool>,

    /// How the text is composited onto the page: direct or overlay.
    #[arg(long)]
    strategy: Option<RenderStrategy>,

    /// Text to stamp for each name, e.g. "Awarded to {name}". {index} is the 1-based position of
    /// the name in the list.
    #[arg(long)]
    name_format: Option<String>,

    /// How output files are named: slug (from the stamped text) or sequence.
    #[arg(long)]
    naming: Option<OutputNaming>,

    /// What to do when two names would be written to the same file: suffix or fail.
    #[arg(long)]
    collisions: Option<CollisionPolicy>,

    /// Prefix of every output file name.
    #[arg(long)]
    file_prefix: Option<String>,

    /// Replace output files that already exist.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    overwrite_existing: Option<bool>,

    /// Header of the CSV column to read names from.
    #[arg(long)]
    column: Option<String>,

    /// Number of certificates to stamp at once. 0 uses every available CPU.
    #[arg(long)]
    jobs: Option<usize>,
}

impl StampArgs {
    /// Loads the settings file, and applies the overrides given on the command line.
    pub fn resolve_settings(&self, xdg_dirs: &xdg::BaseDirectories) -> Result<Settings> {
        let path = self
            .settings
            .clone()
            .or_else(|| xdg_dirs.find_config_file(SETTINGS_FILE));

        let mut settings = match path {
            Some(path) => {
                log::info!("Reading settings from {path:?}.");
                Settings::load(&path)?
            }
            None => {
                log::debug!("No settings file found, using defaults.");
                Settings::default()
            }
        };
        self.apply(&mut settings);
        Ok(settings)
    }

    fn apply(&self, settings: &mut Settings) {
        set(&mut settings.font, &self.font);
        set(&mut settings.font_size, &self.font_size);
        set(&mut settings.bold, &self.bold);
        set(&mut settings.italic, &self.italic);
        set(&mut settings.color, &self.color);
        set(&mut settings.position.x, &self.x);
        set(&mut settings.position.y, &self.y);
        set(&mut settings.centered, &self.centered);
        set(&mut settings.strategy, &self.strategy);
        set(&mut settings.name_format, &self.name_format);
        set(&mut settings.naming, &self.naming);
        set(&mut settings.collisions, &self.collisions);
        set(&mut settings.file_prefix, &self.file_prefix);
        set(&mut settings.overwrite_existing, &self.overwrite_existing);
        set(&mut settings.jobs, &self.jobs);
        if self.column.is_some() {
            settings.column = self.column.clone();
        }
    }
}

fn set<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use googletest::prelude::*;
    use stamping::stamp::Position;
    use tempfile::tempdir;

    use super::*;

    #[derive(Parser, Debug)]
    struct TestArgs {
        #[command(flatten)]
        stamp: StampArgs,
    }

    fn parse(args: &[&str]) -> StampArgs {
        TestArgs::try_parse_from(std::iter::once("test").chain(args.iter().copied()))
            .expect("valid arguments")
            .stamp
    }

    fn apply(args: &[&str], settings: &Settings) -> Settings {
        let mut settings = settings.clone();
        parse(args).apply(&mut settings);
        settings
    }

    #[gtest]
    fn test_no_overrides() {
        expect_that!(apply(&[], &Settings::default()), eq(&Settings::default()));
    }

    #[gtest]
    fn test_overrides() {
        let settings = apply(
            &[
                "--font=Courier",
                "--font-size=18",
                "--bold",
                "--italic=false",
                "--color=#FF0000",
                "--x=-10",
                "--y",
                "250.5",
                "--centered",
                "--strategy=OVERLAY",
                "--name-format={index}: {name}",
                "--naming=sequence",
                "--collisions=fail",
                "--file-prefix=award-",
                "--overwrite-existing=false",
                "--column=Full Name",
                "--jobs=4",
            ],
            &Settings {
                italic: true,
                ..Default::default()
            },
        );

        expect_that!(
            settings,
            eq(&Settings {
                font: "Courier".to_string(),
                font_size: 18,
                bold: true,
                italic: false,
                color: "#FF0000".to_string(),
                position: Position { x: -10.0, y: 250.5 },
                centered: true,
                strategy: RenderStrategy::Overlay,
                name_format: "{index}: {name}".to_string(),
                naming: OutputNaming::Sequence,
                collisions: CollisionPolicy::Fail,
                file_prefix: "award-".to_string(),
                overwrite_existing: false,
                column: Some("Full Name".to_string()),
                jobs: 4,
            })
        );
    }

    #[gtest]
    fn test_invalid_choice_rejected() {
        expect_that!(
            TestArgs::try_parse_from(["test", "--naming=random"]).is_err(),
            eq(true)
        );
    }

    #[gtest]
    fn test_settings_file_then_overrides() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("custom.yaml");
        std::fs::write(&path, "font: Helvetica\nfont_size: 30\n")?;
        let path_arg = format!("--settings={}", path.display());

        let settings = parse(&[&path_arg, "--font-size=12"])
            .resolve_settings(&xdg::BaseDirectories::with_prefix("signit-test"))?;

        expect_that!(settings.font, eq("Helvetica"));
        expect_that!(settings.font_size, eq(12));
        Ok(())
    }

    #[gtest]
    fn test_invalid_settings_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("custom.yaml");
        std::fs::write(&path, "typeface: Helvetica\n")?;
        let path_arg = format!("--settings={}", path.display());

        expect_that!(
            parse(&[&path_arg]).resolve_settings(&xdg::BaseDirectories::with_prefix("signit-test")),
            err(displays_as(contains_substring("custom.yaml")))
        );
        Ok(())
    }
}
