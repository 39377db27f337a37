use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CollectedItem, CollectionMode, ProfileSummary};

/// A group of collected items handed to a delivery sink in one piece.
///
/// `start_index` and `end_index` are positions within the whole run,
/// `end_index` exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEnvelope {
    pub batch_number: u32,
    pub start_index: usize,
    pub end_index: usize,
    pub total_so_far: usize,
    pub mode: CollectionMode,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileSummary>,
    pub items: Vec<CollectedItem>,
}

impl BatchEnvelope {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
