use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub annotation: AnnotationConfig,
    #[serde(default)]
    pub backfill: BackfillConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,
    #[serde(default = "default_results_root")]
    pub results_root: PathBuf,
    #[serde(default = "default_library_dir")]
    pub library_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            results_root: default_results_root(),
            library_dir: default_library_dir(),
        }
    }
}

impl PathsConfig {
    /// Where the ledger writes `<slug>/page_<label>.json`.
    pub fn library_root(&self) -> PathBuf {
        self.results_root.join(&self.library_dir)
    }
}

fn default_source_root() -> PathBuf {
    PathBuf::from("books")
}
fn default_results_root() -> PathBuf {
    PathBuf::from("results")
}
fn default_library_dir() -> String {
    "Organized_Library".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    #[serde(default = "default_word_threshold")]
    pub word_threshold: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            word_threshold: default_word_threshold(),
            batch_size: default_batch_size(),
            image_extensions: default_image_extensions(),
        }
    }
}

fn default_word_threshold() -> usize {
    200
}
fn default_batch_size() -> usize {
    100
}
fn default_image_extensions() -> Vec<String> {
    vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()]
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OcrConfig {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    /// Credentials the command needs; checked once before any work starts.
    #[serde(default)]
    pub required_env: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AnnotationConfig {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub required_env: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackfillConfig {
    #[serde(default = "default_fallback_limit")]
    pub fallback_limit: usize,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            fallback_limit: default_fallback_limit(),
        }
    }
}

fn default_fallback_limit() -> usize {
    10
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.extraction.batch_size == 0 {
            bail!("extraction.batch_size must be at least 1");
        }
        if self.extraction.image_extensions.is_empty() {
            bail!("extraction.image_extensions must not be empty");
        }
        Ok(())
    }

    pub fn ocr_command(&self) -> Result<&str> {
        let Some(command) = self.ocr.command.as_deref().filter(|c| !c.trim().is_empty()) else {
            bail!("no OCR command configured (set [ocr].command or pass --ocr-command)");
        };
        require_env(&self.ocr.required_env)?;
        Ok(command)
    }
}

pub fn require_env(names: &[String]) -> Result<()> {
    for name in names {
        let present = std::env::var_os(name)
            .map(|value| !value.is_empty())
            .unwrap_or(false);
        if !present {
            bail!("required environment variable {name} is not set");
        }
    }
    Ok(())
}
