//! Upload ingestion
//!
//! Turns a raw `(bytes, mime, name)` triple into an [`Asset`] carrying a
//! fresh generation id.

use crate::models::Asset;
use crate::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Issues assets with process-wide, strictly increasing generation ids.
#[derive(Debug, Default)]
pub struct AssetIngestion {
    issued: usize,
}

impl AssetIngestion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, bytes: Vec<u8>, declared_mime_type: &str, name: &str) -> Result<Asset> {
        if !declared_mime_type.starts_with("image/") {
            warn!("Rejected upload '{}' with type '{}'", name, declared_mime_type);
            return Err(Error::InvalidAssetType {
                mime_type: declared_mime_type.to_string(),
            });
        }

        let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
        self.issued += 1;
        debug!(
            "Ingested '{}' ({} bytes, {}) as generation {}",
            name,
            bytes.len(),
            declared_mime_type,
            generation
        );

        Ok(Asset::new(
            bytes,
            declared_mime_type.to_string(),
            name.to_string(),
            generation,
        ))
    }

    /// Number of assets this ingestion point has accepted.
    pub fn issued(&self) -> usize {
        self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_accepts_image_types() {
        let mut ingestion = AssetIngestion::new();
        let asset = ingestion
            .ingest(vec![1, 2, 3], "image/png", "dot.png")
            .unwrap();

        assert_eq!(asset.name(), "dot.png");
        assert_eq!(asset.mime_type(), "image/png");
        assert_eq!(asset.len(), 3);
        assert_eq!(ingestion.issued(), 1);
    }

    #[test]
    fn test_ingest_rejects_non_images() {
        let mut ingestion = AssetIngestion::new();
        let err = ingestion
            .ingest(b"hello".to_vec(), "text/plain", "notes.txt")
            .unwrap_err();

        assert!(matches!(err, Error::InvalidAssetType { ref mime_type } if mime_type == "text/plain"));
        assert_eq!(ingestion.issued(), 0);
    }

    #[test]
    fn test_prefix_match_is_exact() {
        let mut ingestion = AssetIngestion::new();
        assert!(ingestion.ingest(vec![0], "Image/png", "a").is_err());
        assert!(ingestion.ingest(vec![0], "application/image", "b").is_err());
        assert!(ingestion.ingest(vec![0], "image/", "c").is_ok());
    }

    #[test]
    fn test_generations_strictly_increase_across_instances() {
        let mut first = AssetIngestion::new();
        let mut second = AssetIngestion::new();

        let a = first.ingest(vec![0], "image/jpeg", "a.jpg").unwrap();
        let b = second.ingest(vec![0], "image/jpeg", "b.jpg").unwrap();
        let c = first.ingest(vec![0], "image/jpeg", "c.jpg").unwrap();

        assert!(b.generation() > a.generation());
        assert!(c.generation() > b.generation());
    }
}
