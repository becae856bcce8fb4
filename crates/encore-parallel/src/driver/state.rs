use std::collections::HashMap;

use encore_cache::CacheRef;
use log::warn;

use crate::batch::{Batch, BatchKey, CallRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverMode {
    /// The driver has not started running.
    Idle,
    /// The first run of the user body: parallelizable calls are recorded
    /// and answered with placeholders.
    Capturing,
    /// The driver is dispatching batches and waiting for their completion.
    Computing,
    /// The second run of the user body: parallelizable calls are answered
    /// from the cache.
    Replaying,
    /// The driver has finished and absorbs further runs.
    Done,
}

impl std::fmt::Display for DriverMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverMode::Idle => write!(f, "IDLE"),
            DriverMode::Capturing => write!(f, "CAPTURING"),
            DriverMode::Computing => write!(f, "COMPUTING"),
            DriverMode::Replaying => write!(f, "REPLAYING"),
            DriverMode::Done => write!(f, "DONE"),
        }
    }
}

/// The mutable state of a driver: its mode, the cache handle for the
/// current run, and the pending registry of captured batches.
///
/// The pending registry is populated only while capturing and is drained
/// when computing begins, so it is empty outside those two modes.
pub(crate) struct DriverState {
    mode: DriverMode,
    cache: Option<CacheRef>,
    pending: HashMap<(String, BatchKey), Batch>,
    order: Vec<(String, BatchKey)>,
}

impl DriverState {
    pub fn new() -> Self {
        Self {
            mode: DriverMode::Idle,
            cache: None,
            pending: HashMap::new(),
            order: vec![],
        }
    }

    pub fn mode(&self) -> DriverMode {
        self.mode
    }

    pub fn cache(&self) -> Option<CacheRef> {
        self.cache.clone()
    }

    pub fn begin_capture(&mut self, cache: CacheRef) {
        self.mode = DriverMode::Capturing;
        self.cache = Some(cache);
        self.pending.clear();
        self.order.clear();
    }

    pub fn record(&mut self, record: CallRecord) {
        if self.mode != DriverMode::Capturing {
            warn!(
                "a call to {} was recorded while the driver was {}; ignoring it",
                record.function, self.mode
            );
            return;
        }
        let slot = (record.function, record.key);
        if !self.pending.contains_key(&slot) {
            self.order.push(slot.clone());
            self.pending
                .insert(slot.clone(), Batch::new(slot.0.clone(), slot.1));
        }
        if let Some(batch) = self.pending.get_mut(&slot) {
            batch.calls.push(record.arguments);
        }
    }

    /// Freeze the pending registry and return its batches in first-arrival
    /// order of their keys.
    pub fn begin_compute(&mut self) -> Vec<Batch> {
        self.mode = DriverMode::Computing;
        let mut batches = Vec::with_capacity(self.order.len());
        for slot in self.order.drain(..) {
            if let Some(batch) = self.pending.remove(&slot) {
                batches.push(batch);
            }
        }
        batches
    }

    pub fn begin_replay(&mut self) {
        self.mode = DriverMode::Replaying;
    }

    pub fn finish(&mut self) {
        self.mode = DriverMode::Done;
        self.cache = None;
        self.pending.clear();
        self.order.clear();
    }
}
