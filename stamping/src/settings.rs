//! User settings, read from YAML and prepared into the validated values a batch runs with.

use std::{num::NonZeroUsize, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{
    batch::BatchOptions,
    font::FontSpec,
    nameformat::NameFormat,
    naming::{CollisionPolicy, DEFAULT_PREFIX, OutputNaming},
    render::RenderStrategy,
    source::SourceOptions,
    stamp::{Position, StampConfig},
};

/// Settings as written in a `settings.yaml`. Every key is optional, and missing keys take their
/// default value.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Settings {
    pub font: String,
    pub font_size: i64,
    pub bold: bool,
    pub italic: bool,
    pub color: String,
    pub position: Position,
    pub centered: bool,
    pub strategy: RenderStrategy,
    pub name_format: String,
    pub naming: OutputNaming,
    pub collisions: CollisionPolicy,
    pub file_prefix: String,
    pub overwrite_existing: bool,
    /// Header of the name source column to read.
    pub column: Option<String>,
    /// Number of certificates to stamp at once. `0` uses every available CPU.
    pub jobs: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font: "Times-Roman".to_string(),
            font_size: 24,
            bold: false,
            italic: false,
            color: "#000000".to_string(),
            position: Position { x: 300.0, y: 400.0 },
            centered: false,
            strategy: RenderStrategy::default(),
            name_format: "{name}".to_string(),
            naming: OutputNaming::default(),
            collisions: CollisionPolicy::default(),
            file_prefix: DEFAULT_PREFIX.to_string(),
            overwrite_existing: true,
            column: None,
            jobs: 1,
        }
    }
}

/// Validated settings, ready to run a batch with.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedSettings {
    pub stamp: StampConfig,
    pub name_format: NameFormat,
    pub batch: BatchOptions,
    pub source: SourceOptions,
}

impl Settings {
    /// Loads settings from the YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {path:?}"))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing settings file {path:?}"))
    }

    /// Parses settings from YAML `text`. An empty document gives the default settings.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml_ng::from_str(text)?;
        Ok(settings)
    }

    /// Validates the settings, failing on the first invalid value.
    pub fn prepare(&self) -> crate::Result<PreparedSettings> {
        let font = FontSpec::new(
            &self.font,
            self.font_size,
            self.bold,
            self.italic,
            &self.color,
        )?;
        let position = self.position.validate()?;
        let name_format = NameFormat::parse(&self.name_format)?;

        Ok(PreparedSettings {
            stamp: StampConfig {
                font,
                position,
                centered: self.centered,
                strategy: self.strategy,
            },
            name_format,
            batch: BatchOptions {
                naming: self.naming,
                collisions: self.collisions,
                file_prefix: self.file_prefix.clone(),
                overwrite_existing: self.overwrite_existing,
                jobs: self.effective_jobs(),
            },
            source: SourceOptions {
                column: self.column.clone(),
            },
        })
    }

    fn effective_jobs(&self) -> usize {
        if self.jobs != 0 {
            return self.jobs;
        }
        match std::thread::available_parallelism() {
            Ok(n) => n.get(),
            Err(err) => {
                log::warn!("Could not determine available parallelism ({err}), using 1 job.");
                NonZeroUsize::MIN.get()
            }
        }
    }
}
