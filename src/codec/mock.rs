use super::CodecService;
use crate::models::{Asset, CompressedAsset};
use crate::options::ValidatedOptions;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
pub struct MockCodec {
    outputs: Arc<Mutex<Vec<Vec<u8>>>>,
    call_count: Arc<Mutex<usize>>,
    in_flight: Arc<Mutex<usize>>,
    max_in_flight: Arc<Mutex<usize>>,
    should_fail: Arc<Mutex<bool>>,
    delay: Option<Duration>,
}

impl MockCodec {
    pub fn new() -> Self {
        Self {
            outputs: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            in_flight: Arc::new(Mutex::new(0)),
            max_in_flight: Arc::new(Mutex::new(0)),
            should_fail: Arc::new(Mutex::new(false)),
            delay: None,
        }
    }

    /// Queue an output; outputs cycle once exhausted.
    pub fn with_output(self, output: Vec<u8>) -> Self {
        self.outputs.lock().unwrap().push(output);
        self
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        self.set_failure(should_fail);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_failure(&self, should_fail: bool) {
        *self.should_fail.lock().unwrap() = should_fail;
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn get_max_in_flight(&self) -> usize {
        *self.max_in_flight.lock().unwrap()
    }

    fn enter(&self) -> usize {
        let call = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };
        let mut in_flight = self.in_flight.lock().unwrap();
        *in_flight += 1;
        let mut max = self.max_in_flight.lock().unwrap();
        *max = (*max).max(*in_flight);
        call
    }

    fn exit(&self) {
        *self.in_flight.lock().unwrap() -= 1;
    }
}

impl Default for MockCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodecService for MockCodec {
    async fn compress(
        &self,
        asset: &Asset,
        options: &ValidatedOptions,
    ) -> Result<CompressedAsset> {
        let call = self.enter();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.exit();

        if *self.should_fail.lock().unwrap() {
            return Err(Error::Codec("Mock codec failure".to_string()));
        }

        let bytes = {
            let outputs = self.outputs.lock().unwrap();
            if outputs.is_empty() {
                // Half the input by default
                asset.bytes()[..asset.len() / 2].to_vec()
            } else {
                outputs[(call - 1) % outputs.len()].clone()
            }
        };

        Ok(CompressedAsset::from_source(asset, options.format, bytes))
    }
}
