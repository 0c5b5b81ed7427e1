use super::SaveService;
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Copies artifacts into an output directory, creating it on first save.
pub struct FileSaveService {
    output_dir: PathBuf,
}

impl FileSaveService {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }

    pub fn path_for(&self, artifact_name: &str) -> Result<PathBuf> {
        let file_name = Path::new(artifact_name)
            .file_name()
            .filter(|name| *name == artifact_name)
            .ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("Artifact name '{}' is not a plain file name", artifact_name),
                ))
            })?;
        Ok(self.output_dir.join(file_name))
    }
}

#[async_trait]
impl SaveService for FileSaveService {
    async fn save(&self, artifact_name: &str, staged: &Path) -> Result<()> {
        let target = self.path_for(artifact_name)?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::copy(staged, &target).await?;
        tracing::debug!("Copied {} to {}", staged.display(), target.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_copies_into_output_dir() {
        let dir = TempDir::new().unwrap();
        let output_dir = dir.path().join("nested/output");
        let staged = dir.path().join("staged.bin");
        std::fs::write(&staged, b"compressed bytes").unwrap();

        let service = FileSaveService::new(&output_dir);
        service.save("compressed-a.webp", &staged).await.unwrap();

        let saved = std::fs::read(output_dir.join("compressed-a.webp")).unwrap();
        assert_eq!(saved, b"compressed bytes");
    }

    #[test]
    fn test_rejects_path_like_names() {
        let service = FileSaveService::new(Path::new("/tmp/out"));

        assert!(service.path_for("compressed-a.png").is_ok());
        assert!(service.path_for("compressed-../../etc/passwd").is_err());
        assert!(service.path_for("..").is_err());
    }
}
