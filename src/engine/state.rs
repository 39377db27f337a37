use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::domain::CollectedItem;
use crate::engine::batch::BatchAccumulator;
use crate::engine::dedup::SeenSet;
use crate::engine::dispatch::{DeliveryStats, Dispatcher};

/// Cooperative stop request shared between a run and whoever controls it.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Counters readable while a run is in flight.
#[derive(Debug, Default)]
pub struct RunProgress {
    collected: AtomicUsize,
    batches: AtomicUsize,
}

impl RunProgress {
    pub fn collected(&self) -> usize {
        self.collected.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }
}

/// Mutable state of one run, owned by the run task.
pub struct RunState {
    pub seen: SeenSet,
    collected: usize,
    limit: usize,
    items: Vec<CollectedItem>,
    accumulator: BatchAccumulator,
    dispatcher: Dispatcher,
    cancel: CancelFlag,
    progress: Arc<RunProgress>,
}

impl RunState {
    /// `limit` of 0 means unlimited
    pub fn new(
        limit: usize,
        accumulator: BatchAccumulator,
        dispatcher: Dispatcher,
        cancel: CancelFlag,
        progress: Arc<RunProgress>,
    ) -> Self {
        Self {
            seen: SeenSet::new(),
            collected: 0,
            limit,
            items: Vec::new(),
            accumulator,
            dispatcher,
            cancel,
            progress,
        }
    }

    pub fn collected(&self) -> usize {
        self.collected
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn limit_reached(&self) -> bool {
        self.limit > 0 && self.collected >= self.limit
    }

    /// Take in a collected item, dispatching a batch if one filled up.
    ///
    /// Returns true once the run's limit is reached.
    pub fn record(&mut self, item: CollectedItem) -> bool {
        self.items.push(item.clone());
        self.accumulator.add(item);
        self.collected += 1;
        self.progress.collected.store(self.collected, Ordering::SeqCst);

        if let Some(envelope) = self.accumulator.flush_if_full() {
            self.dispatch(envelope);
        }

        self.limit_reached()
    }

    /// Flush the remaining buffer and wait for delivery to drain
    pub async fn finish(mut self) -> (Vec<CollectedItem>, DeliveryStats) {
        if let Some(envelope) = self.accumulator.flush_final() {
            self.dispatch(envelope);
        }
        let stats = self.dispatcher.finish().await;
        (self.items, stats)
    }

    fn dispatch(&mut self, envelope: crate::domain::BatchEnvelope) {
        self.dispatcher.dispatch(envelope);
        self.progress
            .batches
            .store(self.accumulator.batches_emitted() as usize, Ordering::SeqCst);
    }
}
