//! Result metrics shown alongside a compression run.

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Size reduction in percent, rounded to one decimal place.
///
/// Negative when the output grew. Zero for an empty original.
pub fn compression_ratio(original_size: usize, compressed_size: usize) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    let ratio = (1.0 - compressed_size as f64 / original_size as f64) * 100.0;
    (ratio * 10.0).round() / 10.0
}

/// Human-readable byte count: `1536 -> "1.5 KB"`.
pub fn format_file_size(bytes: usize) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut scale = 1u64;
    while unit + 1 < SIZE_UNITS.len() && bytes as u64 >= scale * 1024 {
        scale *= 1024;
        unit += 1;
    }

    let value = ((bytes as f64 / scale as f64) * 100.0).round() / 100.0;
    format!("{} {}", value, SIZE_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ratio_examples() {
        assert_eq!(compression_ratio(1_000_000, 400_000), 60.0);
        assert_eq!(compression_ratio(100, 150), -50.0);
        assert_eq!(compression_ratio(0, 12345), 0.0);
        assert_eq!(compression_ratio(3, 1), 66.7);
    }

    #[test]
    fn test_format_file_size_examples() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1_048_576), "1 MB");
        assert_eq!(format_file_size(1023), "1023 Bytes");
        assert_eq!(format_file_size(1_500_000), "1.43 MB");
    }

    #[test]
    fn test_format_file_size_caps_at_gigabytes() {
        assert_eq!(format_file_size(2 * 1024 * 1024 * 1024 * 1024), "2048 GB");
    }

    proptest! {
        #[test]
        fn ratio_never_exceeds_one_hundred(original in 1usize..10_000_000, compressed in 0usize..10_000_000) {
            prop_assert!(compression_ratio(original, compressed) <= 100.0);
        }
    }
}
