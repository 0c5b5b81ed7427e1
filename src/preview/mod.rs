//! Ephemeral preview handles
//!
//! The registry is the only owner of preview resources. It keeps at most one
//! live handle per slot and releases every handle it allocated exactly once,
//! either when the slot is replaced or on teardown.

pub mod data_url;
pub mod file;
pub mod mock;

pub use data_url::DataUrlPreviewBackend;
pub use file::FilePreviewBackend;
pub use mock::MockPreviewBackend;

use crate::models::{Asset, CompressedAsset};
use crate::{Error, Result};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// Allocates the display-side resource behind a preview.
pub trait PreviewBackend: Send + Sync {
    /// Returns an opaque location (file path, URL) the display layer can load.
    fn allocate(&self, id: Uuid, bytes: &[u8], mime_type: &str) -> Result<String>;
    fn release(&self, location: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreviewSlot {
    Original,
    Result,
}

#[derive(Debug, Clone, Copy)]
pub enum PreviewSource<'a> {
    Asset(&'a Asset),
    Compressed(&'a CompressedAsset),
}

impl PreviewSource<'_> {
    pub fn slot(&self) -> PreviewSlot {
        match self {
            PreviewSource::Asset(_) => PreviewSlot::Original,
            PreviewSource::Compressed(_) => PreviewSlot::Result,
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            PreviewSource::Asset(asset) => asset.bytes(),
            PreviewSource::Compressed(result) => result.bytes(),
        }
    }

    fn mime_type(&self) -> &str {
        match self {
            PreviewSource::Asset(asset) => asset.mime_type(),
            PreviewSource::Compressed(result) => result.mime_type(),
        }
    }

    fn generation(&self) -> u64 {
        match self {
            PreviewSource::Asset(asset) => asset.generation(),
            PreviewSource::Compressed(result) => result.generation(),
        }
    }
}

/// A live display reference. Not `Clone`: only the registry holds these.
#[derive(Debug, PartialEq)]
pub struct PreviewHandle {
    id: Uuid,
    slot: PreviewSlot,
    generation: u64,
    location: String,
}

impl PreviewHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn slot(&self) -> PreviewSlot {
        self.slot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

pub struct PreviewRegistry {
    backend: Box<dyn PreviewBackend>,
    live: HashMap<PreviewSlot, PreviewHandle>,
}

impl PreviewRegistry {
    pub fn new(backend: Box<dyn PreviewBackend>) -> Self {
        Self {
            backend,
            live: HashMap::new(),
        }
    }

    /// Replace the preview in `source`'s slot.
    ///
    /// The previous handle is released before the new one is allocated, so
    /// the slot is empty if allocation fails.
    pub fn create(&mut self, source: PreviewSource<'_>) -> Result<&PreviewHandle> {
        let slot = source.slot();
        self.revoke_slot(slot);

        let id = Uuid::new_v4();
        let location = self
            .backend
            .allocate(id, source.bytes(), source.mime_type())?;
        debug!("Created {:?} preview {} at {}", slot, id, location);

        let handle = PreviewHandle {
            id,
            slot,
            generation: source.generation(),
            location,
        };
        let handle: &PreviewHandle = self.live.entry(slot).or_insert(handle);
        Ok(handle)
    }

    /// Release the handle with `id`. A handle may only be revoked once.
    pub fn revoke(&mut self, id: Uuid) -> Result<()> {
        let slot = self
            .live
            .iter()
            .find(|(_, handle)| handle.id == id)
            .map(|(slot, _)| *slot)
            .ok_or_else(|| Error::Resource(format!("Preview {} is not live", id)))?;

        self.revoke_slot(slot);
        Ok(())
    }

    /// Release whatever occupies `slot`. Returns whether anything was live.
    pub fn revoke_slot(&mut self, slot: PreviewSlot) -> bool {
        match self.live.remove(&slot) {
            Some(handle) => {
                self.release(handle);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, slot: PreviewSlot) -> Option<&PreviewHandle> {
        self.live.get(&slot)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn teardown(&mut self) {
        let handles: Vec<_> = self.live.drain().map(|(_, handle)| handle).collect();
        for handle in handles {
            self.release(handle);
        }
    }

    fn release(&self, handle: PreviewHandle) {
        match self.backend.release(&handle.location) {
            Ok(()) => debug!("Revoked {:?} preview {}", handle.slot, handle.id),
            Err(e) => warn!("Failed to release preview {}: {}", handle.id, e),
        }
    }
}

impl Drop for PreviewRegistry {
    fn drop(&mut self) {
        self.teardown();
    }
}
