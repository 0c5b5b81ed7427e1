//! Error handling and custom error types
//!
//! Provides unified error handling across the compressor using thiserror.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A single out-of-range option field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {} (expected {}..={})",
            self.field, self.value, self.min, self.max
        )
    }
}

fn join_violations(fields: &[FieldViolation]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid asset type '{mime_type}': please select an image file")]
    InvalidAssetType { mime_type: String },

    #[error("Invalid compression options: {}", join_violations(.0))]
    Validation(Vec<FieldViolation>),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Preview resource error: {0}")]
    Resource(String),

    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
