//! Declared MIME type detection for uploads read from disk.

use std::path::Path;

pub const UNKNOWN_MIME: &str = "application/octet-stream";

/// Sniff the image type from magic bytes, falling back to the file extension.
pub fn detect_image_mime(bytes: &[u8], path: &Path) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, 0x50, 0x4E, 0x47, ..] => "image/png",
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => "image/webp",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'B', b'M', ..] => "image/bmp",
        [_, _, _, _, b'f', b't', b'y', b'p', b'a', b'v', b'i', b'f', ..] => "image/avif",
        _ => {
            let mime = mime_from_extension(path);
            tracing::debug!(
                "Unrecognized magic bytes (first 4 bytes: {:02X?}), using extension: {}",
                &bytes[..bytes.len().min(4)],
                mime
            );
            mime
        }
    }
}

fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("avif") => "image/avif",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("txt") => "text/plain",
        _ => UNKNOWN_MIME,
    }
}
