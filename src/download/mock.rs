use super::SaveService;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MockSaveService {
    saved: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    staged_paths: Arc<Mutex<Vec<PathBuf>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockSaveService {
    pub fn new() -> Self {
        Self {
            saved: Arc::new(Mutex::new(HashMap::new())),
            staged_paths: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn get_saved(&self, artifact_name: &str) -> Option<Vec<u8>> {
        self.saved.lock().unwrap().get(artifact_name).cloned()
    }

    pub fn get_save_count(&self) -> usize {
        self.saved.lock().unwrap().len()
    }

    /// Every staging path the service was handed, in call order.
    pub fn get_staged_paths(&self) -> Vec<PathBuf> {
        self.staged_paths.lock().unwrap().clone()
    }
}

impl Default for MockSaveService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SaveService for MockSaveService {
    async fn save(&self, artifact_name: &str, staged: &Path) -> Result<()> {
        self.staged_paths
            .lock()
            .unwrap()
            .push(staged.to_path_buf());

        if *self.should_fail.lock().unwrap() {
            return Err(Error::Io(std::io::Error::other("Mock save failure")));
        }

        let bytes = std::fs::read(staged)?;
        self.saved
            .lock()
            .unwrap()
            .insert(artifact_name.to_string(), bytes);
        Ok(())
    }
}
