//! One-shot download of a compressed result
//!
//! The emitter stages the bytes in a transient file, hands it to a
//! [`SaveService`], and drops the staging file whichever way the save ends.

pub mod file;
pub mod mock;

pub use file::FileSaveService;
pub use mock::MockSaveService;

use crate::models::CompressedAsset;
use crate::Result;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{error, info};

#[async_trait]
pub trait SaveService: Send + Sync {
    /// Persist the staged file under `artifact_name`. `staged` is only valid
    /// for the duration of the call.
    async fn save(&self, artifact_name: &str, staged: &Path) -> Result<()>;
}

pub fn artifact_name(compressed: &CompressedAsset) -> String {
    format!("compressed-{}", compressed.original_name())
}

pub struct DownloadEmitter {
    saver: Box<dyn SaveService>,
    staging_dir: Option<PathBuf>,
}

impl DownloadEmitter {
    pub fn new(saver: Box<dyn SaveService>) -> Self {
        Self {
            saver,
            staging_dir: None,
        }
    }

    pub fn with_staging_dir(mut self, dir: PathBuf) -> Self {
        self.staging_dir = Some(dir);
        self
    }

    /// Save `compressed` and return the artifact name it was saved under.
    pub async fn emit(&self, compressed: &CompressedAsset) -> Result<String> {
        let name = artifact_name(compressed);

        let mut staged = match &self.staging_dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };
        staged.write_all(compressed.bytes())?;
        staged.flush()?;

        let saved = self.saver.save(&name, staged.path()).await;
        // Staging file is removed here on success and failure alike.
        drop(staged);

        match saved {
            Ok(()) => {
                info!("Saved {} ({} bytes)", name, compressed.len());
                Ok(name)
            }
            Err(e) => {
                error!("Failed to save {}: {}", name, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::AssetIngestion;
    use crate::models::OutputFormat;

    fn compressed(name: &str) -> CompressedAsset {
        let source = AssetIngestion::new()
            .ingest(vec![1, 2, 3, 4], "image/png", name)
            .unwrap();
        CompressedAsset::from_source(&source, OutputFormat::Webp, vec![5, 6])
    }

    #[test]
    fn test_artifact_name_prefixes_original() {
        assert_eq!(artifact_name(&compressed("cat.png")), "compressed-cat.png");
    }

    #[tokio::test]
    async fn test_emit_saves_bytes_and_removes_staging_file() {
        let saver = MockSaveService::new();
        let emitter = DownloadEmitter::new(Box::new(saver.clone()));

        let name = emitter.emit(&compressed("dog.jpg")).await.unwrap();

        assert_eq!(name, "compressed-dog.jpg");
        assert_eq!(saver.get_saved("compressed-dog.jpg"), Some(vec![5, 6]));
        let staged = saver.get_staged_paths();
        assert_eq!(staged.len(), 1);
        assert!(!staged[0].exists());
    }

    #[test]
    fn test_emit_failure_still_removes_staging_file() {
        let saver = MockSaveService::new().with_failure(true);
        let staging = tempfile::tempdir().unwrap();
        let emitter = DownloadEmitter::new(Box::new(saver.clone()))
            .with_staging_dir(staging.path().to_path_buf());

        let result = tokio_test::block_on(emitter.emit(&compressed("bird.png")));

        assert!(result.is_err());
        assert_eq!(saver.get_staged_paths().len(), 1);
        assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
    }
}
