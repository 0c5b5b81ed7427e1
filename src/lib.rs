//! Image compressor - asset lifecycle and compression orchestration
//!
//! Ingests an image upload, validates compression options, runs a single
//! in-flight compression against a pluggable codec, and manages the preview
//! and download resources around the result.

pub mod app;
pub mod codec;
pub mod download;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod mime;
pub mod models;
pub mod options;
pub mod orchestrator;
pub mod preview;

pub use error::{Error, Result};
