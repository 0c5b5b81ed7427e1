use super::PreviewBackend;
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

/// Writes each preview to its own file inside a private temporary directory.
///
/// The directory (and anything left in it) is removed when the backend drops.
pub struct FilePreviewBackend {
    dir: TempDir,
}

impl FilePreviewBackend {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    pub fn in_dir(parent: &Path) -> Result<Self> {
        Ok(Self {
            dir: TempDir::new_in(parent)?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn owns(&self, path: &Path) -> bool {
        path.parent() == Some(self.dir.path())
    }
}

fn extension_for(mime_type: &str) -> &str {
    match mime_type.strip_prefix("image/") {
        Some("jpeg") => "jpg",
        Some("svg+xml") => "svg",
        Some(subtype) if !subtype.is_empty() => subtype,
        _ => "bin",
    }
}

impl PreviewBackend for FilePreviewBackend {
    fn allocate(&self, id: Uuid, bytes: &[u8], mime_type: &str) -> Result<String> {
        let path = self
            .dir
            .path()
            .join(format!("{}.{}", id, extension_for(mime_type)));
        fs::write(&path, bytes)
            .map_err(|e| Error::Resource(format!("Failed to write preview {}: {}", id, e)))?;
        Ok(path.to_string_lossy().into_owned())
    }

    fn release(&self, location: &str) -> Result<()> {
        let path = PathBuf::from(location);
        if !self.owns(&path) {
            return Err(Error::Resource(format!(
                "Preview {} is outside {}",
                location,
                self.dir.path().display()
            )));
        }
        fs::remove_file(&path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_release_file() {
        let backend = FilePreviewBackend::new().unwrap();

        let location = backend
            .allocate(Uuid::new_v4(), b"preview bytes", "image/jpeg")
            .unwrap();
        let path = PathBuf::from(&location);

        assert!(path.exists());
        assert!(location.ends_with(".jpg"));
        assert_eq!(fs::read(&path).unwrap(), b"preview bytes");

        backend.release(&location).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_release_twice_fails() {
        let backend = FilePreviewBackend::new().unwrap();
        let location = backend.allocate(Uuid::new_v4(), b"x", "image/png").unwrap();

        backend.release(&location).unwrap();
        assert!(backend.release(&location).is_err());
    }

    #[test]
    fn test_refuses_foreign_paths() {
        let backend = FilePreviewBackend::new().unwrap();
        let outside = tempfile::NamedTempFile::new().unwrap();

        let result = backend.release(&outside.path().to_string_lossy());
        assert!(matches!(result, Err(Error::Resource(_))));
        assert!(outside.path().exists());
    }

    #[test]
    fn test_extension_mapping() {
        assert_eq!(extension_for("image/webp"), "webp");
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/"), "bin");
        assert_eq!(extension_for("application/octet-stream"), "bin");
    }
}
