use super::PreviewBackend;
use crate::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use uuid::Uuid;

/// Inline `data:` URL previews. Nothing is held outside the URL itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataUrlPreviewBackend;

impl DataUrlPreviewBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PreviewBackend for DataUrlPreviewBackend {
    fn allocate(&self, _id: Uuid, bytes: &[u8], mime_type: &str) -> Result<String> {
        Ok(format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes)))
    }

    fn release(&self, _location: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_encoding() {
        let url = DataUrlPreviewBackend::new()
            .allocate(Uuid::new_v4(), b"hi", "image/png")
            .unwrap();
        assert_eq!(url, "data:image/png;base64,aGk=");
    }
}
