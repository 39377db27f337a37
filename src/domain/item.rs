use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::NoteDetail;

/// One collected post: its identity plus the detail read from its overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedItem {
    pub id: String,
    pub identity_key: String,
    pub collected_at: DateTime<Utc>,
    pub detail: NoteDetail,
}

impl CollectedItem {
    pub fn new(identity_key: impl Into<String>, detail: NoteDetail) -> Self {
        let identity_key = identity_key.into();
        Self {
            id: Self::generate_id(&identity_key),
            identity_key,
            collected_at: Utc::now(),
            detail,
        }
    }

    /// Generate a deterministic ID from the identity key
    pub fn generate_id(identity_key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(identity_key.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn display_title(&self) -> &str {
        if self.detail.title.is_empty() {
            "(Untitled)"
        } else {
            &self.detail.title
        }
    }
}
