use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::parser::{ParseOptions, SequencePolicy};

const ENV_PREFIX: &str = "COMMENTARY";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db_path: PathBuf,
    pub verse_table: PathBuf,
    pub min_content_chars: usize,
    pub fallback_min_chars: usize,
    pub resync: bool,
    /// Used when a page title does not name its commentary.
    pub commentary_name: String,
}

impl Settings {
    /// Defaults, then `commentary.toml` if present, then `COMMENTARY_*` env vars.
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .set_default("db_path", "data/commentary.sqlite")?
            .set_default("verse_table", "data/bible_verse_counts.json")?
            .set_default("min_content_chars", 10_i64)?
            .set_default("fallback_min_chars", 100_i64)?
            .set_default("resync", false)?
            .set_default("commentary_name", "호크마 주석")?
            .add_source(File::with_name("commentary").required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to build settings")?;
        settings
            .try_deserialize()
            .context("Failed to deserialize settings")
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            min_content_chars: self.min_content_chars,
            fallback_min_chars: self.fallback_min_chars,
            sequence: if self.resync {
                SequencePolicy::Resync
            } else {
                SequencePolicy::Strict
            },
        }
    }
}
