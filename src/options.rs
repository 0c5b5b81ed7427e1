//! Compression option validation
//!
//! Range-checks every numeric field of [`CompressionOptions`]. `format`,
//! `resize` and `progressive` pass through untouched.

use crate::error::FieldViolation;
use crate::models::CompressionOptions;
use crate::{Error, Result};
use std::ops::Deref;

pub const MAX_SIZE_MB_RANGE: (f64, f64) = (0.1, 50.0);
pub const DIMENSION_RANGE: (u32, u32) = (100, 4000);
pub const QUALITY_RANGE: (f64, f64) = (0.1, 1.0);

/// Options that passed [`OptionsValidator`]; the codec accepts nothing else.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOptions(CompressionOptions);

impl ValidatedOptions {
    pub fn into_inner(self) -> CompressionOptions {
        self.0
    }
}

impl Deref for ValidatedOptions {
    type Target = CompressionOptions;

    fn deref(&self) -> &CompressionOptions {
        &self.0
    }
}

pub struct OptionsValidator;

impl OptionsValidator {
    pub fn validate(options: CompressionOptions) -> Result<ValidatedOptions> {
        let mut violations = Vec::new();

        check_float(&mut violations, "maxSizeMB", options.max_size_mb, MAX_SIZE_MB_RANGE);
        check_dimension(&mut violations, "maxWidth", options.max_width);
        check_dimension(&mut violations, "maxHeight", options.max_height);
        check_float(&mut violations, "quality", options.quality, QUALITY_RANGE);

        if violations.is_empty() {
            Ok(ValidatedOptions(options))
        } else {
            Err(Error::Validation(violations))
        }
    }

    /// Pull every numeric field into range. NaN falls back to the default.
    pub fn clamp(options: CompressionOptions) -> ValidatedOptions {
        let defaults = CompressionOptions::default();
        let (min_dim, max_dim) = DIMENSION_RANGE;

        ValidatedOptions(CompressionOptions {
            max_size_mb: clamp_float(options.max_size_mb, defaults.max_size_mb, MAX_SIZE_MB_RANGE),
            max_width: options.max_width.clamp(min_dim, max_dim),
            max_height: options.max_height.clamp(min_dim, max_dim),
            quality: clamp_float(options.quality, defaults.quality, QUALITY_RANGE),
            ..options
        })
    }
}

fn check_float(
    violations: &mut Vec<FieldViolation>,
    field: &'static str,
    value: f64,
    (min, max): (f64, f64),
) {
    // NaN fails both comparisons, so test containment rather than exclusion.
    if !(min..=max).contains(&value) {
        violations.push(FieldViolation {
            field,
            value,
            min,
            max,
        });
    }
}

fn check_dimension(violations: &mut Vec<FieldViolation>, field: &'static str, value: u32) {
    let (min, max) = DIMENSION_RANGE;
    if !(min..=max).contains(&value) {
        violations.push(FieldViolation {
            field,
            value: f64::from(value),
            min: f64::from(min),
            max: f64::from(max),
        });
    }
}

fn clamp_float(value: f64, fallback: f64, (min, max): (f64, f64)) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}
