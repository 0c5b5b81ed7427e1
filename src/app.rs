//! Application wiring for one compress-and-download pass over a file.

use crate::codec::{CodecService, ImageCodec};
use crate::download::{DownloadEmitter, FileSaveService, SaveService};
use crate::mime::detect_image_mime;
use crate::models::{CompressionOptions, CompressionReport, Config, PreviewMode};
use crate::options::OptionsValidator;
use crate::orchestrator::{CompressionOrchestrator, CompressionState};
use crate::preview::{DataUrlPreviewBackend, FilePreviewBackend, PreviewBackend, PreviewSlot};
use crate::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Owns the orchestrator and the download emitter for a session.
pub struct App {
    orchestrator: CompressionOrchestrator,
    emitter: DownloadEmitter,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub codec: Arc<dyn CodecService>,
    pub previews: Box<dyn PreviewBackend>,
    pub saver: Box<dyn SaveService>,
}

impl App {
    pub fn with_services(services: AppServices) -> Self {
        Self {
            orchestrator: CompressionOrchestrator::new(services.codec, services.previews),
            emitter: DownloadEmitter::new(services.saver),
        }
    }

    /// Real services: the `image` codec, configured previews, files on disk.
    pub fn from_config(config: &Config) -> Result<Self> {
        let previews: Box<dyn PreviewBackend> = match config.preview_mode {
            PreviewMode::File => Box::new(FilePreviewBackend::new()?),
            PreviewMode::DataUrl => Box::new(DataUrlPreviewBackend::new()),
        };
        info!("Saving artifacts to {}", config.output_dir.display());

        Ok(Self::with_services(AppServices {
            codec: Arc::new(ImageCodec::new()),
            previews,
            saver: Box::new(FileSaveService::new(&config.output_dir)),
        }))
    }

    pub fn orchestrator(&self) -> &CompressionOrchestrator {
        &self.orchestrator
    }

    /// Ingest `input`, compress it and save the download artifact.
    ///
    /// With `clamp` set, out-of-range options are pulled into range instead
    /// of rejected.
    pub async fn run(
        &mut self,
        input: &Path,
        options: CompressionOptions,
        clamp: bool,
    ) -> Result<CompressionReport> {
        let bytes = tokio::fs::read(input).await?;
        let mime_type = detect_image_mime(&bytes, input);
        let name = input
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::Config(format!("Invalid input path: {}", input.display())))?
            .to_string();

        let validated = if clamp {
            OptionsValidator::clamp(options)
        } else {
            OptionsValidator::validate(options)?
        };

        self.orchestrator.ingest(bytes, mime_type, &name)?;
        if let Some(preview) = self.orchestrator.preview(PreviewSlot::Original) {
            debug!("Original preview at {}", truncate(preview.location()));
        }

        match self.orchestrator.compress(validated).await? {
            CompressionState::Completed => {}
            CompressionState::Failed => {
                return Err(match self.orchestrator.error() {
                    Some(Error::Codec(reason)) => Error::Codec(reason.clone()),
                    Some(other) => Error::Codec(other.to_string()),
                    None => Error::InvalidState {
                        expected: "a recorded failure",
                        actual: "none",
                    },
                });
            }
            other => {
                return Err(Error::InvalidState {
                    expected: "Completed",
                    actual: other.name(),
                })
            }
        }
        if let Some(preview) = self.orchestrator.preview(PreviewSlot::Result) {
            debug!("Compressed preview at {}", truncate(preview.location()));
        }

        let result = self.orchestrator.result().ok_or(Error::InvalidState {
            expected: "an attached result",
            actual: "none",
        })?;
        let artifact = self.emitter.emit(result).await?;

        self.orchestrator
            .report(Some(artifact))
            .ok_or(Error::InvalidState {
                expected: "an attached result",
                actual: "none",
            })
    }

    /// Release every preview held for the session.
    pub fn finish(&mut self) {
        self.orchestrator.teardown();
    }
}

fn truncate(location: &str) -> &str {
    const MAX: usize = 96;
    match location.char_indices().nth(MAX) {
        Some((idx, _)) => &location[..idx],
        None => location,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MockCodec;
    use crate::download::MockSaveService;
    use crate::models::OutputFormat;
    use crate::preview::MockPreviewBackend;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    struct Harness {
        app: App,
        codec: MockCodec,
        previews: MockPreviewBackend,
        saver: MockSaveService,
    }

    fn harness(codec: MockCodec) -> Harness {
        let previews = MockPreviewBackend::new();
        let saver = MockSaveService::new();
        let app = App::with_services(AppServices {
            codec: Arc::new(codec.clone()),
            previews: Box::new(previews.clone()),
            saver: Box::new(saver.clone()),
        });
        Harness {
            app,
            codec,
            previews,
            saver,
        }
    }

    fn write_png(dir: &Path, name: &str, len: usize) -> std::path::PathBuf {
        let mut bytes = vec![0x89, 0x50, 0x4E, 0x47];
        bytes.resize(len, 0);
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn test_run_saves_artifact_and_reports() {
        let dir = tempdir().unwrap();
        let input = write_png(dir.path(), "photo.png", 2000);
        let mut h = harness(MockCodec::new().with_output(vec![7; 500]));

        let report = h
            .app
            .run(&input, CompressionOptions::default(), false)
            .await
            .unwrap();

        assert_eq!(report.name, "photo.png");
        assert_eq!(report.format, OutputFormat::Webp);
        assert_eq!(report.original_size, 2000);
        assert_eq!(report.compressed_size, 500);
        assert_eq!(report.ratio, 75.0);
        assert_eq!(report.artifact.as_deref(), Some("compressed-photo.png"));
        assert_eq!(h.saver.get_saved("compressed-photo.png"), Some(vec![7; 500]));

        h.app.finish();
        assert!(h.previews.live_locations().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_options_are_rejected_before_ingest() {
        let dir = tempdir().unwrap();
        let input = write_png(dir.path(), "photo.png", 100);
        let mut h = harness(MockCodec::new());

        let options = CompressionOptions {
            quality: 3.0,
            ..CompressionOptions::default()
        };
        let result = h.app.run(&input, options, false).await;

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(h.app.orchestrator().state(), CompressionState::Idle);
        assert_eq!(h.codec.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_clamp_accepts_out_of_range_options() {
        let dir = tempdir().unwrap();
        let input = write_png(dir.path(), "photo.png", 100);
        let mut h = harness(MockCodec::new());

        let options = CompressionOptions {
            quality: 3.0,
            max_width: 1,
            ..CompressionOptions::default()
        };
        let report = h.app.run(&input, options, true).await.unwrap();
        assert_eq!(report.compressed_size, 50);
    }

    #[tokio::test]
    async fn test_non_image_input_is_rejected() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        fs::write(&input, b"just text").unwrap();
        let mut h = harness(MockCodec::new());

        let result = h.app.run(&input, CompressionOptions::default(), false).await;

        assert!(matches!(result, Err(Error::InvalidAssetType { .. })));
        assert_eq!(h.saver.get_save_count(), 0);
    }

    #[tokio::test]
    async fn test_codec_failure_is_surfaced() {
        let dir = tempdir().unwrap();
        let input = write_png(dir.path(), "photo.png", 100);
        let mut h = harness(MockCodec::new().with_failure(true));

        let result = h.app.run(&input, CompressionOptions::default(), false).await;

        let err = result.unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
        assert_eq!(err.to_string(), "Codec error: Mock codec failure");
        assert_eq!(h.app.orchestrator().state(), CompressionState::Failed);
        assert_eq!(h.saver.get_save_count(), 0);
    }

    #[test]
    fn test_truncate_long_locations() {
        let long = "x".repeat(200);
        assert_eq!(truncate(&long).len(), 96);
        assert_eq!(truncate("short"), "short");
    }
}
