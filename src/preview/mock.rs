use super::PreviewBackend;
use crate::{Error, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Clone)]
pub struct MockPreviewBackend {
    live: Arc<Mutex<HashSet<String>>>,
    allocation_count: Arc<Mutex<usize>>,
    release_count: Arc<Mutex<usize>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockPreviewBackend {
    pub fn new() -> Self {
        Self {
            live: Arc::new(Mutex::new(HashSet::new())),
            allocation_count: Arc::new(Mutex::new(0)),
            release_count: Arc::new(Mutex::new(0)),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        self.set_failure(should_fail);
        self
    }

    pub fn set_failure(&self, should_fail: bool) {
        *self.should_fail.lock().unwrap() = should_fail;
    }

    pub fn get_allocation_count(&self) -> usize {
        *self.allocation_count.lock().unwrap()
    }

    pub fn get_release_count(&self) -> usize {
        *self.release_count.lock().unwrap()
    }

    pub fn live_locations(&self) -> HashSet<String> {
        self.live.lock().unwrap().clone()
    }
}

impl Default for MockPreviewBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewBackend for MockPreviewBackend {
    fn allocate(&self, id: Uuid, _bytes: &[u8], mime_type: &str) -> Result<String> {
        if *self.should_fail.lock().unwrap() {
            return Err(Error::Resource("Mock allocation failure".to_string()));
        }

        *self.allocation_count.lock().unwrap() += 1;
        let location = format!("mock://{}/{}", mime_type, id);
        self.live.lock().unwrap().insert(location.clone());
        Ok(location)
    }

    fn release(&self, location: &str) -> Result<()> {
        if !self.live.lock().unwrap().remove(location) {
            return Err(Error::Resource(format!("Double release of {}", location)));
        }
        *self.release_count.lock().unwrap() += 1;
        Ok(())
    }
}
