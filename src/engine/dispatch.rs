use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::domain::BatchEnvelope;
use crate::sink::{DeliverySink, MediaDownloader};

/// Outcome counters for the batches of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryStats {
    pub dispatched: u32,
    pub delivered: u32,
    pub failed: u32,
    pub failed_batches: Vec<u32>,
    pub media_saved: u32,
    pub media_failed: u32,
}

/// Hands envelopes to a sink on a background task.
///
/// `dispatch` never waits for the sink; envelopes are delivered one at a
/// time in the order they were dispatched. With a [`MediaDownloader`],
/// each batch's images are saved before the sink sees it.
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<BatchEnvelope>,
    stats: Arc<Mutex<DeliveryStats>>,
    task: JoinHandle<()>,
}

impl Dispatcher {
    pub fn spawn(sink: Arc<dyn DeliverySink>, media: Option<Arc<MediaDownloader>>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<BatchEnvelope>();
        let stats = Arc::new(Mutex::new(DeliveryStats::default()));
        let task_stats = stats.clone();

        let task = tokio::spawn(async move {
            while let Some(mut envelope) = rx.recv().await {
                let number = envelope.batch_number;
                let tally = match &media {
                    Some(media) => media.localize(&mut envelope).await,
                    None => Default::default(),
                };
                let result = sink.deliver(&envelope).await;

                let mut stats = match task_stats.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                stats.media_saved += tally.downloaded;
                stats.media_failed += tally.failed;
                match result {
                    Ok(()) => {
                        stats.delivered += 1;
                        info!(
                            "Delivered batch {} ({} items) to {}",
                            number,
                            envelope.len(),
                            sink.name()
                        );
                    }
                    Err(e) => {
                        stats.failed += 1;
                        stats.failed_batches.push(number);
                        warn!("Failed to deliver batch {} to {}: {}", number, sink.name(), e);
                    }
                }
            }
        });

        Self { tx, stats, task }
    }

    pub fn dispatch(&self, envelope: BatchEnvelope) {
        self.with_stats(|s| s.dispatched += 1);
        if let Err(e) = self.tx.send(envelope) {
            let number = e.0.batch_number;
            error!("Dispatcher is gone, batch {} dropped", number);
            self.with_stats(|s| {
                s.failed += 1;
                s.failed_batches.push(number);
            });
        }
    }

    /// Wait for queued envelopes to be delivered and return the totals
    pub async fn finish(self) -> DeliveryStats {
        let Self { tx, stats, task } = self;
        drop(tx);

        if let Err(e) = task.await {
            error!("Delivery task join error: {}", e);
        }

        let guard = match stats.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone()
    }

    fn with_stats(&self, f: impl FnOnce(&mut DeliveryStats)) {
        match self.stats.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}
