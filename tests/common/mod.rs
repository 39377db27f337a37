#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use notecrawl::app::{CrawlError, Result};
use notecrawl::control::SourceProvider;
use notecrawl::domain::{BatchEnvelope, CollectionMode, NoteDetail, ProfileSummary};
use notecrawl::engine::{
    Candidate, CloseAction, ContainerHandle, DetailSource, EngineSettings, NoDelay,
    RunController, ScrollStep, StopHandle,
};
use notecrawl::sink::DeliverySink;

pub fn card(n: usize) -> Candidate {
    Candidate {
        handle: n.to_string(),
        link: Some(format!("https://site.test/explore/{n}")),
        image: Some(format!("https://img.site.test/{n}.jpg")),
        markup: Some(format!("<div>{n}</div>")),
    }
}

pub fn cards(range: std::ops::Range<usize>) -> Vec<Candidate> {
    range.map(card).collect()
}

/// A card with nothing to identify it by
pub fn blank_card(handle: &str) -> Candidate {
    Candidate {
        handle: handle.to_string(),
        ..Default::default()
    }
}

pub fn controller() -> RunController {
    RunController::new(EngineSettings::immediate(), Arc::new(NoDelay))
}

#[derive(Default)]
struct PageState {
    position: usize,
    open: Option<String>,
    extracted: usize,
    listings: usize,
    opened: Vec<String>,
    advances: Vec<ScrollStep>,
}

/// A page scripted as a list of screens.
///
/// Each advance moves to the next screen; past the end the last screen
/// keeps being listed, like the bottom of a page.
#[derive(Default)]
pub struct FakeSource {
    screens: Vec<Vec<Candidate>>,
    state: Mutex<PageState>,
    no_overlay: HashSet<String>,
    stop_after: Option<(usize, StopHandle)>,
    fail_listing_from: Option<usize>,
    profile: Option<ProfileSummary>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeSource {
    pub fn new(screens: Vec<Vec<Candidate>>) -> Self {
        Self {
            screens,
            ..Default::default()
        }
    }

    /// Request a stop right after the `n`th extraction
    pub fn stop_after(mut self, n: usize, handle: StopHandle) -> Self {
        self.stop_after = Some((n, handle));
        self
    }

    /// Clicking these cards never shows an overlay
    pub fn without_overlay(mut self, handles: &[&str]) -> Self {
        self.no_overlay = handles.iter().map(|h| h.to_string()).collect();
        self
    }

    pub fn failing_listing(self) -> Self {
        self.failing_listing_from(1)
    }

    /// Every listing from the `n`th call on fails
    pub fn failing_listing_from(mut self, n: usize) -> Self {
        self.fail_listing_from = Some(n);
        self
    }

    pub fn with_profile(mut self, profile: ProfileSummary) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Listing blocks until the returned semaphore gets a permit
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn opened(&self) -> Vec<String> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn advances(&self) -> Vec<ScrollStep> {
        self.state.lock().unwrap().advances.clone()
    }
}

#[async_trait]
impl DetailSource for FakeSource {
    async fn list_candidates(&self) -> Result<Vec<Candidate>> {
        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| CrawlError::Other(e.to_string()))?;
        }
        let position = {
            let mut state = self.state.lock().unwrap();
            state.listings += 1;
            if self.fail_listing_from.is_some_and(|n| state.listings >= n) {
                return Err(CrawlError::Browser("page crashed".to_string()));
            }
            state.position
        };
        let screen = self
            .screens
            .get(position)
            .or_else(|| self.screens.last())
            .cloned()
            .unwrap_or_default();
        Ok(screen)
    }

    async fn reveal(&self, _candidate: &Candidate) -> Result<()> {
        Ok(())
    }

    async fn open(&self, candidate: &Candidate) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.opened.push(candidate.handle.clone());
        if !self.no_overlay.contains(&candidate.handle) {
            state.open = Some(candidate.handle.clone());
        }
        Ok(())
    }

    async fn probe_container(&self, selectors: &[String]) -> Result<Option<ContainerHandle>> {
        let state = self.state.lock().unwrap();
        Ok(state.open.as_ref().map(|_| ContainerHandle {
            selector: selectors[0].clone(),
        }))
    }

    async fn extract(&self, _container: &ContainerHandle) -> Result<NoteDetail> {
        let (handle, extracted) = {
            let mut state = self.state.lock().unwrap();
            state.extracted += 1;
            (state.open.clone().unwrap_or_default(), state.extracted)
        };

        if let Some((n, stop)) = &self.stop_after {
            if extracted == *n {
                stop.stop();
            }
        }

        Ok(NoteDetail {
            title: format!("note {handle}"),
            description: format!("body of {handle}"),
            ..Default::default()
        })
    }

    async fn close(&self, action: CloseAction) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if action == CloseAction::CloseButton && state.open.is_some() {
            state.open = None;
            return Ok(true);
        }
        Ok(false)
    }

    async fn advance(&self, step: ScrollStep) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.position += 1;
        state.advances.push(step);
        Ok(())
    }

    async fn profile_summary(&self) -> Result<Option<ProfileSummary>> {
        Ok(self.profile.clone())
    }
}

/// Hands the same fake page to every run
pub struct FakeProvider(pub Arc<FakeSource>);

#[async_trait]
impl SourceProvider for FakeProvider {
    async fn source_for(&self, _mode: CollectionMode) -> Result<Arc<dyn DetailSource>> {
        let source: Arc<dyn DetailSource> = self.0.clone();
        Ok(source)
    }
}

/// Keeps every envelope it's given; fails the batch numbers it's told to.
#[derive(Default)]
pub struct RecordingSink {
    envelopes: Mutex<Vec<BatchEnvelope>>,
    fail: HashSet<u32>,
}

impl RecordingSink {
    pub fn failing(batches: &[u32]) -> Self {
        Self {
            fail: batches.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn envelopes(&self) -> Vec<BatchEnvelope> {
        self.envelopes.lock().unwrap().clone()
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.envelopes().iter().map(|e| e.items.len()).collect()
    }
}

#[async_trait]
impl DeliverySink for RecordingSink {
    async fn deliver(&self, envelope: &BatchEnvelope) -> Result<()> {
        self.envelopes.lock().unwrap().push(envelope.clone());
        if self.fail.contains(&envelope.batch_number) {
            return Err(CrawlError::Delivery(format!(
                "batch {} refused",
                envelope.batch_number
            )));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
