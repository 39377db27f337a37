use chrono::{DateTime, Utc};

use crate::domain::{BatchEnvelope, CollectedItem, CollectionMode, ProfileSummary};

/// Run-wide fields stamped onto every envelope.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub mode: CollectionMode,
    pub started_at: DateTime<Utc>,
    pub profile: Option<ProfileSummary>,
}

impl BatchContext {
    pub fn new(mode: CollectionMode) -> Self {
        Self {
            mode,
            started_at: Utc::now(),
            profile: None,
        }
    }
}

/// Buffers collected items and cuts them into envelopes of `batch_size`.
///
/// The buffer is moved into each envelope, never shared with it.
#[derive(Debug)]
pub struct BatchAccumulator {
    batch_size: usize,
    buffer: Vec<CollectedItem>,
    next_batch: u32,
    emitted: usize,
    context: BatchContext,
}

impl BatchAccumulator {
    pub fn new(batch_size: usize, context: BatchContext) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            buffer: Vec::with_capacity(batch_size.min(1024)),
            next_batch: 1,
            emitted: 0,
            context,
        }
    }

    pub fn add(&mut self, item: CollectedItem) {
        self.buffer.push(item);
    }

    /// Emit an envelope if the buffer reached the batch size
    pub fn flush_if_full(&mut self) -> Option<BatchEnvelope> {
        if self.buffer.len() >= self.batch_size {
            Some(self.cut())
        } else {
            None
        }
    }

    /// Emit whatever remains at the end of a run
    pub fn flush_final(&mut self) -> Option<BatchEnvelope> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.cut())
        }
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Envelopes emitted so far
    pub fn batches_emitted(&self) -> u32 {
        self.next_batch - 1
    }

    fn cut(&mut self) -> BatchEnvelope {
        let items = std::mem::take(&mut self.buffer);
        let start_index = self.emitted;
        let end_index = start_index + items.len();

        let envelope = BatchEnvelope {
            batch_number: self.next_batch,
            start_index,
            end_index,
            total_so_far: end_index,
            mode: self.context.mode,
            started_at: self.context.started_at,
            profile: self.context.profile.clone(),
            items,
        };

        self.next_batch += 1;
        self.emitted = end_index;
        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NoteDetail;

    fn item(n: usize) -> CollectedItem {
        CollectedItem::new(format!("https://x/explore/{n}"), NoteDetail::default())
    }

    fn fill(acc: &mut BatchAccumulator, count: usize) -> Vec<BatchEnvelope> {
        let mut out = Vec::new();
        for n in 0..count {
            acc.add(item(n));
            out.extend(acc.flush_if_full());
        }
        out.extend(acc.flush_final());
        out
    }

    #[test]
    fn test_batches_of_ten_with_remainder() {
        let mut acc = BatchAccumulator::new(10, BatchContext::new(CollectionMode::Profile));
        let batches = fill(&mut acc, 25);

        let sizes: Vec<_> = batches.iter().map(BatchEnvelope::len).collect();
        assert_eq!(sizes, vec![10, 10, 5]);

        let numbers: Vec<_> = batches.iter().map(|b| b.batch_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);

        assert_eq!((batches[1].start_index, batches[1].end_index), (10, 20));
        assert_eq!((batches[2].start_index, batches[2].end_index), (20, 25));
        assert_eq!(batches[2].total_so_far, 25);
        assert_eq!(acc.batches_emitted(), 3);
    }

    #[test]
    fn test_even_split_has_no_empty_final_batch() {
        let mut acc = BatchAccumulator::new(5, BatchContext::new(CollectionMode::Feed));
        let batches = fill(&mut acc, 10);
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 5));
        assert!(acc.flush_final().is_none());
    }

    #[test]
    fn test_items_keep_discovery_order() {
        let mut acc = BatchAccumulator::new(3, BatchContext::new(CollectionMode::Feed));
        let batches = fill(&mut acc, 7);
        let keys: Vec<_> = batches
            .iter()
            .flat_map(|b| b.items.iter().map(|i| i.identity_key.clone()))
            .collect();
        let expected: Vec<_> = (0..7).map(|n| format!("https://x/explore/{n}")).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_buffer_is_reset_after_cut() {
        let mut acc = BatchAccumulator::new(2, BatchContext::new(CollectionMode::Feed));
        acc.add(item(0));
        assert!(acc.flush_if_full().is_none());
        assert_eq!(acc.pending(), 1);
        acc.add(item(1));
        assert!(acc.flush_if_full().is_some());
        assert_eq!(acc.pending(), 0);
    }

    #[test]
    fn test_profile_is_stamped_on_envelopes() {
        let mut context = BatchContext::new(CollectionMode::Profile);
        context.profile = Some(ProfileSummary {
            nickname: "walker".into(),
            ..Default::default()
        });
        let mut acc = BatchAccumulator::new(1, context);
        acc.add(item(0));
        let batch = acc.flush_if_full().unwrap();
        assert_eq!(batch.profile.unwrap().nickname, "walker");
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let mut acc = BatchAccumulator::new(0, BatchContext::new(CollectionMode::Feed));
        acc.add(item(0));
        assert_eq!(acc.flush_if_full().map(|b| b.len()), Some(1));
    }
}
