//! Codec boundary
//!
//! The orchestrator hands an asset and validated options to a
//! [`CodecService`] and suspends until it settles. How pixels are encoded is
//! entirely the codec's concern.

pub mod image_codec;
pub mod mock;

pub use image_codec::ImageCodec;
pub use mock::MockCodec;

use crate::models::{Asset, CompressedAsset};
use crate::options::ValidatedOptions;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CodecService: Send + Sync {
    /// Failures are reported as [`crate::Error::Codec`].
    async fn compress(&self, asset: &Asset, options: &ValidatedOptions)
        -> Result<CompressedAsset>;
}
