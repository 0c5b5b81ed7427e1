//! Data models and structures
//!
//! Defines the assets flowing through the compressor, the user-facing
//! compression options, and environment configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Webp,
    Jpeg,
    Png,
    Avif,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Webp => "image/webp",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Avif => "image/avif",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Avif => "avif",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Avif => "avif",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webp" => Ok(OutputFormat::Webp),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "avif" => Ok(OutputFormat::Avif),
            other => Err(Error::Config(format!("Unknown output format '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    Contain,
    Cover,
    Fill,
    Inside,
    Outside,
}

impl FromStr for ResizeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contain" => Ok(ResizeMode::Contain),
            "cover" => Ok(ResizeMode::Cover),
            "fill" => Ok(ResizeMode::Fill),
            "inside" => Ok(ResizeMode::Inside),
            "outside" => Ok(ResizeMode::Outside),
            other => Err(Error::Config(format!("Unknown resize mode '{}'", other))),
        }
    }
}

/// User-editable compression parameters, unvalidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompressionOptions {
    #[serde(rename = "maxSizeMB")]
    pub max_size_mb: f64,
    pub format: OutputFormat,
    pub resize: ResizeMode,
    pub max_width: u32,
    pub max_height: u32,
    pub quality: f64,
    pub progressive: bool,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            max_size_mb: 1.0,
            format: OutputFormat::Webp,
            resize: ResizeMode::Contain,
            max_width: 1920,
            max_height: 1080,
            quality: 0.8,
            progressive: false,
        }
    }
}

impl CompressionOptions {
    /// Parse options in the web form's JSON shape. Missing fields take defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// An ingested upload. Only [`crate::ingest::AssetIngestion`] creates these.
#[derive(Debug, Clone)]
pub struct Asset {
    bytes: Arc<Vec<u8>>,
    mime_type: String,
    name: String,
    generation: u64,
}

impl Asset {
    pub(crate) fn new(bytes: Vec<u8>, mime_type: String, name: String, generation: u64) -> Self {
        Self {
            bytes: Arc::new(bytes),
            mime_type,
            name,
            generation,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Immutable codec output, tagged with the generation of its source asset.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedAsset {
    bytes: Vec<u8>,
    format: OutputFormat,
    original_name: String,
    generation: u64,
}

impl CompressedAsset {
    /// Wrap encoded bytes produced from `source`.
    pub fn from_source(source: &Asset, format: OutputFormat, bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            format,
            original_name: source.name().to_string(),
            generation: source.generation(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Summary printed by the CLI after a compression run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionReport {
    pub name: String,
    pub format: OutputFormat,
    pub original_size: usize,
    pub compressed_size: usize,
    pub original_size_label: String,
    pub compressed_size_label: String,
    pub ratio: f64,
    pub artifact: Option<String>,
}

impl CompressionReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewMode {
    File,
    DataUrl,
}

impl FromStr for PreviewMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(PreviewMode::File),
            "data-url" | "data_url" | "dataurl" => Ok(PreviewMode::DataUrl),
            other => Err(Error::Config(format!("Unknown preview mode '{}'", other))),
        }
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub output_dir: PathBuf,
    pub preview_mode: PreviewMode,
    pub default_options: CompressionOptions,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        load_env_file(dotenvy::dotenv())?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut default_options = CompressionOptions::default();

        if let Some(format) = lookup("COMPRESSOR_DEFAULT_FORMAT") {
            default_options.format = format.parse()?;
        }
        if let Some(quality) = lookup("COMPRESSOR_DEFAULT_QUALITY") {
            default_options.quality = quality.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "COMPRESSOR_DEFAULT_QUALITY must be a number, got '{}'",
                    quality
                ))
            })?;
        }

        let preview_mode = match lookup("COMPRESSOR_PREVIEW_MODE") {
            Some(mode) => mode.parse()?,
            None => PreviewMode::File,
        };

        Ok(Self {
            output_dir: lookup("COMPRESSOR_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output")),
            preview_mode,
            default_options,
        })
    }
}

/// A missing `.env` is fine; an unreadable or malformed one is not.
fn load_env_file<T>(loaded: dotenvy::Result<T>) -> Result<()> {
    match loaded {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_options_serialization_uses_original_field_names() {
        let json = serde_json::to_string(&CompressionOptions::default()).unwrap();
        assert!(json.contains("\"maxSizeMB\":1.0"));
        assert!(json.contains("\"format\":\"webp\""));
        assert!(json.contains("\"resize\":\"contain\""));
        assert!(json.contains("\"maxWidth\":1920"));
        assert!(json.contains("\"progressive\":false"));
    }

    #[test]
    fn test_partial_options_fill_defaults() {
        let options: CompressionOptions =
            serde_json::from_str(r#"{"format":"jpeg","quality":0.5}"#).unwrap();

        assert_eq!(
            options,
            CompressionOptions {
                format: OutputFormat::Jpeg,
                quality: 0.5,
                ..CompressionOptions::default()
            }
        );
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JPG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("avif".parse::<OutputFormat>().unwrap(), OutputFormat::Avif);
        assert!("gif".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Webp.mime_type(), "image/webp");
    }

    #[test]
    fn test_compressed_asset_inherits_source_tag() {
        let source = Asset::new(vec![1, 2, 3, 4], "image/png".into(), "cat.png".into(), 7);
        let compressed = CompressedAsset::from_source(&source, OutputFormat::Jpeg, vec![9, 9]);

        assert_eq!(compressed.generation(), 7);
        assert_eq!(compressed.original_name(), "cat.png");
        assert_eq!(compressed.mime_type(), "image/jpeg");
        assert_eq!(compressed.len(), 2);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.preview_mode, PreviewMode::File);
        assert_eq!(config.default_options, CompressionOptions::default());
    }

    #[test]
    fn test_config_reads_overrides() {
        let vars: HashMap<&str, &str> = [
            ("COMPRESSOR_OUTPUT_DIR", "/tmp/out"),
            ("COMPRESSOR_PREVIEW_MODE", "data-url"),
            ("COMPRESSOR_DEFAULT_FORMAT", "png"),
            ("COMPRESSOR_DEFAULT_QUALITY", "0.6"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.preview_mode, PreviewMode::DataUrl);
        assert_eq!(config.default_options.format, OutputFormat::Png);
        assert_eq!(config.default_options.quality, 0.6);
    }

    #[test]
    fn test_options_from_json() {
        let options = CompressionOptions::from_json(r#"{"format": "png", "quality": 0.4}"#).unwrap();
        assert_eq!(options.format, OutputFormat::Png);
        assert_eq!(options.quality, 0.4);
        assert_eq!(options.max_width, 1920);

        let err = CompressionOptions::from_json(r#"{"format": "gif"}"#).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_report_to_json_uses_camel_case() {
        let report = CompressionReport {
            name: "a.png".to_string(),
            format: OutputFormat::Webp,
            original_size: 2048,
            compressed_size: 1024,
            original_size_label: "2 KB".to_string(),
            compressed_size_label: "1 KB".to_string(),
            ratio: 50.0,
            artifact: None,
        };
        let json = report.to_json().unwrap();
        assert!(json.contains("\"compressedSizeLabel\": \"1 KB\""));
        assert!(json.contains("\"format\": \"webp\""));
    }

    #[test]
    fn test_missing_env_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = dotenvy::from_path(dir.path().join(".env"));
        assert!(load_env_file(loaded).is_ok());
    }

    #[test]
    fn test_malformed_env_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "COMPRESSOR_TEST_UNTERMINATED=\"oops\n").unwrap();

        let result = load_env_file(dotenvy::from_path(&path));
        assert!(matches!(result, Err(Error::EnvVar(_))));
    }

    #[test]
    fn test_config_rejects_bad_quality() {
        let result = Config::from_lookup(|key| {
            (key == "COMPRESSOR_DEFAULT_QUALITY").then(|| "high".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
