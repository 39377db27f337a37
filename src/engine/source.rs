use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app::Result;
use crate::domain::{NoteDetail, ProfileSummary};

/// A listed element that may become a collected item.
///
/// `handle` addresses the element within the page adapter; the other fields
/// are the raw material for its identity key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Candidate {
    pub handle: String,
    pub link: Option<String>,
    pub image: Option<String>,
    pub markup: Option<String>,
}

impl Candidate {
    /// First non-empty of link, image and markup.
    ///
    /// `None` means the candidate can't be identified and must be skipped.
    pub fn identity_key(&self) -> Option<&str> {
        [&self.link, &self.image, &self.markup]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .map(str::trim)
            .find(|v| !v.is_empty())
    }
}

/// An opened detail container, identified by the selector that matched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub selector: String,
}

/// Ways to dismiss a detail overlay, tried in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// The overlay's dedicated close control
    CloseButton,
    /// A generic dismiss target such as the backdrop mask
    Dismiss,
    /// A synthetic Escape keystroke
    Escape,
}

impl CloseAction {
    pub const ORDER: [CloseAction; 3] = [
        CloseAction::CloseButton,
        CloseAction::Dismiss,
        CloseAction::Escape,
    ];
}

/// How far to move the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollStep {
    ViewportFraction(f64),
    Pixels(i64),
}

/// The page the engine drives.
///
/// Implementations wrap a live browser tab; tests use a scripted fake.
/// Nothing here touches run state, so an adapter can't affect dedup.
#[async_trait]
pub trait DetailSource: Send + Sync {
    /// Candidate elements currently in the document, in document order
    async fn list_candidates(&self) -> Result<Vec<Candidate>>;

    /// Scroll the candidate to the middle of the viewport
    async fn reveal(&self, candidate: &Candidate) -> Result<()>;

    /// Trigger the candidate's detail overlay
    async fn open(&self, candidate: &Candidate) -> Result<()>;

    /// Check once for a detail container, trying `selectors` in order
    async fn probe_container(&self, selectors: &[String]) -> Result<Option<ContainerHandle>>;

    /// Read the detail record out of an open container
    async fn extract(&self, container: &ContainerHandle) -> Result<NoteDetail>;

    /// Attempt one way of closing the overlay; `Ok(false)` if it wasn't available
    async fn close(&self, action: CloseAction) -> Result<bool>;

    async fn advance(&self, step: ScrollStep) -> Result<()>;

    /// Header info of the page the run is anchored to, if it has one
    async fn profile_summary(&self) -> Result<Option<ProfileSummary>> {
        Ok(None)
    }
}
