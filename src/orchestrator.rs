//! Compression orchestration
//!
//! [`CompressionOrchestrator`] owns the live asset, the latest result and the
//! preview registry, and only changes them through its transition methods.
//! A compression is split into [`CompressionOrchestrator::start_compression`],
//! which hands back a [`PendingCompression`] that can be awaited without
//! borrowing the orchestrator, and [`CompressionOrchestrator::settle`]. Every
//! start is stamped with a fresh [`RequestId`], and a completion is applied
//! only if it carries the id of the request currently in flight and the
//! generation of the live asset. Anything else is dropped as stale.

use crate::codec::CodecService;
use crate::ingest::AssetIngestion;
use crate::metrics::{compression_ratio, format_file_size};
use crate::models::{Asset, CompressedAsset, CompressionReport};
use crate::options::ValidatedOptions;
use crate::preview::{PreviewBackend, PreviewHandle, PreviewRegistry, PreviewSlot, PreviewSource};
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompressionState {
    Idle,
    Ready,
    Compressing,
    Completed,
    Failed,
}

impl CompressionState {
    pub fn name(self) -> &'static str {
        match self {
            CompressionState::Idle => "Idle",
            CompressionState::Ready => "Ready",
            CompressionState::Compressing => "Compressing",
            CompressionState::Completed => "Completed",
            CompressionState::Failed => "Failed",
        }
    }
}

static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

/// Identity of one `start_compression` call.
///
/// Re-selecting an asset with an old generation still gets a new request id,
/// so an outcome from before the re-selection can never match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        RequestId(NEXT_REQUEST.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

enum Stage {
    Idle,
    Ready,
    Compressing { request: RequestId, generation: u64 },
    Completed(CompressedAsset),
    Failed(Error),
}

/// Whether a completion callback was applied or dropped as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Applied,
    Discarded,
}

#[must_use = "a compression outcome must be passed to CompressionOrchestrator::settle"]
#[derive(Debug)]
pub enum CompressionOutcome {
    Succeeded {
        request: RequestId,
        result: CompressedAsset,
    },
    Failed {
        request: RequestId,
        generation: u64,
        error: Error,
    },
}

impl CompressionOutcome {
    pub fn request(&self) -> RequestId {
        match self {
            CompressionOutcome::Succeeded { request, .. }
            | CompressionOutcome::Failed { request, .. } => *request,
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            CompressionOutcome::Succeeded { result, .. } => result.generation(),
            CompressionOutcome::Failed { generation, .. } => *generation,
        }
    }
}

/// A codec invocation captured at `start_compression` time.
///
/// The orchestrator stays in `Compressing` until the outcome of
/// [`PendingCompression::run`] is settled or a new asset is selected.
#[must_use = "the orchestrator stays Compressing until this is run and settled"]
pub struct PendingCompression {
    request: RequestId,
    codec: Arc<dyn CodecService>,
    asset: Asset,
    options: ValidatedOptions,
}

impl PendingCompression {
    pub fn request(&self) -> RequestId {
        self.request
    }

    pub fn generation(&self) -> u64 {
        self.asset.generation()
    }

    /// Invoke the codec. Always resolves, success or failure.
    pub async fn run(self) -> CompressionOutcome {
        let request = self.request;
        let generation = self.asset.generation();
        match self.codec.compress(&self.asset, &self.options).await {
            Ok(result) if result.format() != self.options.format => CompressionOutcome::Failed {
                request,
                generation,
                error: Error::Codec(format!(
                    "codec returned {} output for a {} request",
                    result.format(),
                    self.options.format
                )),
            },
            Ok(result) if result.generation() != generation => CompressionOutcome::Failed {
                request,
                generation,
                error: Error::Codec(format!(
                    "codec returned a result for generation {} instead of {}",
                    result.generation(),
                    generation
                )),
            },
            Ok(result) => CompressionOutcome::Succeeded { request, result },
            Err(error) => CompressionOutcome::Failed {
                request,
                generation,
                error,
            },
        }
    }
}

pub struct CompressionOrchestrator {
    codec: Arc<dyn CodecService>,
    ingestion: AssetIngestion,
    previews: PreviewRegistry,
    asset: Option<Asset>,
    stage: Stage,
}

impl CompressionOrchestrator {
    pub fn new(codec: Arc<dyn CodecService>, preview_backend: Box<dyn PreviewBackend>) -> Self {
        Self {
            codec,
            ingestion: AssetIngestion::new(),
            previews: PreviewRegistry::new(preview_backend),
            asset: None,
            stage: Stage::Idle,
        }
    }

    pub fn state(&self) -> CompressionState {
        match self.stage {
            Stage::Idle => CompressionState::Idle,
            Stage::Ready => CompressionState::Ready,
            Stage::Compressing { .. } => CompressionState::Compressing,
            Stage::Completed(_) => CompressionState::Completed,
            Stage::Failed(_) => CompressionState::Failed,
        }
    }

    pub fn asset(&self) -> Option<&Asset> {
        self.asset.as_ref()
    }

    pub fn result(&self) -> Option<&CompressedAsset> {
        match &self.stage {
            Stage::Completed(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match &self.stage {
            Stage::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn preview(&self, slot: PreviewSlot) -> Option<&PreviewHandle> {
        self.previews.get(slot)
    }

    /// Size reduction of the attached result in percent, 0 without one.
    pub fn compression_ratio(&self) -> f64 {
        match (&self.asset, self.result()) {
            (Some(asset), Some(result)) => compression_ratio(asset.len(), result.len()),
            _ => 0.0,
        }
    }

    pub fn report(&self, artifact: Option<String>) -> Option<CompressionReport> {
        let asset = self.asset.as_ref()?;
        let result = self.result()?;
        Some(CompressionReport {
            name: asset.name().to_string(),
            format: result.format(),
            original_size: asset.len(),
            compressed_size: result.len(),
            original_size_label: format_file_size(asset.len()),
            compressed_size_label: format_file_size(result.len()),
            ratio: self.compression_ratio(),
            artifact,
        })
    }

    /// Ingest an upload and select it. A rejected upload changes nothing.
    pub fn ingest(&mut self, bytes: Vec<u8>, declared_mime_type: &str, name: &str) -> Result<&Asset> {
        let asset = self.ingestion.ingest(bytes, declared_mime_type, name)?;
        Ok(self.select_asset(asset))
    }

    /// Make `asset` the live asset and return to `Ready`, from any state.
    ///
    /// Any result or error is dropped along with its preview. An in-flight
    /// compression keeps running but its outcome will be discarded.
    pub fn select_asset(&mut self, asset: Asset) -> &Asset {
        let previous = self.state();
        self.stage = Stage::Ready;
        self.previews.revoke_slot(PreviewSlot::Result);

        let asset: &Asset = self.asset.insert(asset);
        if let Err(e) = self.previews.create(PreviewSource::Asset(asset)) {
            warn!("No preview for '{}': {}", asset.name(), e);
        }

        info!(
            "Selected '{}' ({}, generation {}) from {}",
            asset.name(),
            format_file_size(asset.len()),
            asset.generation(),
            previous.name()
        );
        asset
    }

    /// Begin compressing the live asset.
    ///
    /// Returns `Ok(None)` without doing anything while a compression is
    /// already in flight. Only `Ready` and `Failed` may start one.
    pub fn start_compression(
        &mut self,
        options: ValidatedOptions,
    ) -> Result<Option<PendingCompression>> {
        match self.stage {
            Stage::Compressing {
                request,
                generation,
            } => {
                debug!(
                    "Compression {} of generation {} in flight; ignoring request",
                    request, generation
                );
                return Ok(None);
            }
            Stage::Ready | Stage::Failed(_) => {}
            Stage::Idle | Stage::Completed(_) => {
                return Err(Error::InvalidState {
                    expected: "Ready or Failed",
                    actual: self.state().name(),
                });
            }
        }

        let asset = self.asset.clone().ok_or(Error::InvalidState {
            expected: "a selected asset",
            actual: "no asset",
        })?;
        let request = RequestId::next();
        let generation = asset.generation();
        self.stage = Stage::Compressing {
            request,
            generation,
        };
        info!(
            "Compressing '{}' (request {}, generation {}) to {} at quality {}",
            asset.name(),
            request,
            generation,
            options.format,
            options.quality
        );

        Ok(Some(PendingCompression {
            request,
            codec: Arc::clone(&self.codec),
            asset,
            options,
        }))
    }

    pub fn compression_succeeded(
        &mut self,
        request: RequestId,
        result: CompressedAsset,
    ) -> Settlement {
        let generation = result.generation();
        if !self.is_in_flight(request, generation) {
            debug!(
                "Discarding stale result of request {} for generation {}",
                request, generation
            );
            return Settlement::Discarded;
        }

        self.stage = Stage::Completed(result);
        if let Stage::Completed(result) = &self.stage {
            if let Err(e) = self.previews.create(PreviewSource::Compressed(result)) {
                warn!("No preview for compressed result: {}", e);
            }
            info!(
                "Compression complete: {} ({:.1}% reduction)",
                format_file_size(result.len()),
                self.compression_ratio()
            );
        }
        Settlement::Applied
    }

    pub fn compression_failed(
        &mut self,
        request: RequestId,
        generation: u64,
        error: Error,
    ) -> Settlement {
        if !self.is_in_flight(request, generation) {
            debug!(
                "Discarding stale failure of request {} for generation {}: {}",
                request, generation, error
            );
            return Settlement::Discarded;
        }

        error!("Compression failed: {}", error);
        self.stage = Stage::Failed(error);
        Settlement::Applied
    }

    pub fn settle(&mut self, outcome: CompressionOutcome) -> Settlement {
        match outcome {
            CompressionOutcome::Succeeded { request, result } => {
                self.compression_succeeded(request, result)
            }
            CompressionOutcome::Failed {
                request,
                generation,
                error,
            } => self.compression_failed(request, generation, error),
        }
    }

    /// Start, run and settle a compression in one step.
    pub async fn compress(&mut self, options: ValidatedOptions) -> Result<CompressionState> {
        if let Some(pending) = self.start_compression(options)? {
            let outcome = pending.run().await;
            self.settle(outcome);
        }
        Ok(self.state())
    }

    /// Release every preview and forget the asset.
    pub fn teardown(&mut self) {
        self.previews.teardown();
        self.asset = None;
        self.stage = Stage::Idle;
        debug!("Orchestrator torn down");
    }

    fn is_in_flight(&self, request: RequestId, generation: u64) -> bool {
        let live = self.asset.as_ref().map(Asset::generation);
        matches!(
            self.stage,
            Stage::Compressing { request: r, generation: g } if r == request && g == generation
        ) && live == Some(generation)
    }
}
