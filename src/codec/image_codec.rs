use super::CodecService;
use crate::models::{Asset, CompressedAsset, OutputFormat, ResizeMode};
use crate::options::{ValidatedOptions, QUALITY_RANGE};
use crate::{Error, Result};
use async_trait::async_trait;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use tracing::debug;

const QUALITY_STEP: f64 = 0.1;
const AVIF_SPEED: u8 = 8;

/// Default codec backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCodec {
    filter: Option<FilterType>,
}

impl ImageCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = Some(filter);
        self
    }

    fn compress_sync(
        bytes: &[u8],
        options: &ValidatedOptions,
        filter: FilterType,
    ) -> Result<Vec<u8>> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| Error::Codec(format!("Failed to decode input: {}", e)))?;
        let resized = resize(
            decoded,
            options.resize,
            options.max_width,
            options.max_height,
            filter,
        );

        if options.progressive {
            debug!("Progressive encoding requested; encoder writes baseline output");
        }

        let limit = (options.max_size_mb * 1024.0 * 1024.0) as usize;
        encode_within_limit(options.format, options.quality, limit, |quality| {
            encode(&resized, options.format, quality)
        })
    }
}

/// Encode at `quality`, stepping down until the output fits in `limit`
/// bytes. Stops at the quality floor and returns whatever it produced there.
fn encode_within_limit<F>(
    format: OutputFormat,
    quality: f64,
    limit: usize,
    mut encode: F,
) -> Result<Vec<u8>>
where
    F: FnMut(f64) -> Result<Vec<u8>>,
{
    let mut quality = quality;
    loop {
        let encoded = encode(quality)?;
        let can_step_down = supports_quality(format) && quality > QUALITY_RANGE.0;
        if encoded.len() <= limit || !can_step_down {
            debug!(
                "Encoded {} bytes as {} at quality {:.2} (limit {} bytes)",
                encoded.len(),
                format,
                quality,
                limit
            );
            return Ok(encoded);
        }
        quality = (quality - QUALITY_STEP).max(QUALITY_RANGE.0);
    }
}

fn supports_quality(format: OutputFormat) -> bool {
    matches!(format, OutputFormat::Jpeg | OutputFormat::Avif)
}

fn quality_byte(quality: f64) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

fn encode(image: &DynamicImage, format: OutputFormat, quality: f64) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let written = match format {
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
            .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality_byte(quality))),
        OutputFormat::Png => image.write_with_encoder(PngEncoder::new(&mut buf)),
        OutputFormat::Webp => DynamicImage::ImageRgba8(image.to_rgba8())
            .write_with_encoder(WebPEncoder::new_lossless(&mut buf)),
        OutputFormat::Avif => DynamicImage::ImageRgba8(image.to_rgba8()).write_with_encoder(
            AvifEncoder::new_with_speed_quality(&mut buf, AVIF_SPEED, quality_byte(quality)),
        ),
    };
    written.map_err(|e| Error::Codec(format!("Failed to encode {}: {}", format, e)))?;
    Ok(buf)
}

fn resize(
    image: DynamicImage,
    mode: ResizeMode,
    width: u32,
    height: u32,
    filter: FilterType,
) -> DynamicImage {
    match mode {
        ResizeMode::Contain => {
            let fitted = image.resize(width, height, filter).to_rgba8();
            let mut canvas = RgbaImage::new(width, height);
            let x = i64::from((width - fitted.width()) / 2);
            let y = i64::from((height - fitted.height()) / 2);
            imageops::overlay(&mut canvas, &fitted, x, y);
            DynamicImage::ImageRgba8(canvas)
        }
        ResizeMode::Inside => {
            if image.width() <= width && image.height() <= height {
                image
            } else {
                image.resize(width, height, filter)
            }
        }
        ResizeMode::Cover => image.resize_to_fill(width, height, filter),
        ResizeMode::Fill => image.resize_exact(width, height, filter),
        ResizeMode::Outside => {
            let scale = f64::max(
                f64::from(width) / f64::from(image.width().max(1)),
                f64::from(height) / f64::from(image.height().max(1)),
            );
            let target_w = (f64::from(image.width()) * scale).ceil() as u32;
            let target_h = (f64::from(image.height()) * scale).ceil() as u32;
            image.resize_exact(target_w.max(width), target_h.max(height), filter)
        }
    }
}

#[async_trait]
impl CodecService for ImageCodec {
    async fn compress(
        &self,
        asset: &Asset,
        options: &ValidatedOptions,
    ) -> Result<CompressedAsset> {
        let filter = self.filter.unwrap_or(FilterType::Lanczos3);
        let source = asset.clone();
        let options = options.clone();

        tokio::task::spawn_blocking(move || {
            let bytes = Self::compress_sync(source.bytes(), &options, filter)?;
            Ok(CompressedAsset::from_source(&source, options.format, bytes))
        })
        .await
        .map_err(|e| Error::Codec(format!("Compression task join error: {}", e)))?
    }
}
