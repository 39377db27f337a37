use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app::Result;
use crate::domain::CollectedItem;
use crate::engine::collector::DetailCollector;
use crate::engine::config::{CollectorSettings, ScrollPolicy};
use crate::engine::pacing::Pacer;
use crate::engine::source::{DetailSource, ScrollStep};
use crate::engine::state::RunState;

/// Why the discovery loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The run's item limit was reached
    LimitReached,
    /// Too many consecutive screens without new candidates
    Exhausted,
    /// The scroll step ceiling was hit
    StepBudgetSpent,
    /// A stop was requested
    Cancelled,
}

/// The scroll-driven collection loop shared by both modes.
pub struct Discovery<'a> {
    source: &'a dyn DetailSource,
    pacer: &'a dyn Pacer,
    policy: &'a ScrollPolicy,
    collector: DetailCollector<'a>,
}

impl<'a> Discovery<'a> {
    pub fn new(
        source: &'a dyn DetailSource,
        pacer: &'a dyn Pacer,
        policy: &'a ScrollPolicy,
        collector_settings: &'a CollectorSettings,
    ) -> Self {
        Self {
            source,
            pacer,
            policy,
            collector: DetailCollector::new(source, pacer, collector_settings),
        }
    }

    /// Scroll and collect until the limit, the end of content, the step
    /// ceiling or a stop request.
    ///
    /// Only listing and scrolling failures escape; anything that goes wrong
    /// with a single candidate just skips it.
    pub async fn run(&self, state: &mut RunState) -> Result<Termination> {
        if state.limit_reached() {
            return Ok(Termination::LimitReached);
        }

        self.pacer.pause(self.policy.warmup).await;

        let mut idle_screens = 0;

        for step in 0..self.policy.max_steps {
            if state.is_cancelled() {
                return Ok(Termination::Cancelled);
            }

            let candidates = self.source.list_candidates().await?;

            if candidates.is_empty() {
                if let Some(px) = self.policy.empty_retry_px {
                    warn!("No candidates on screen {}, scrolling to trigger loading", step + 1);
                    self.source.advance(ScrollStep::Pixels(px)).await?;
                    self.pacer.pause(self.policy.empty_retry).await;
                    continue;
                }
            }

            let mut found_new = false;

            for candidate in &candidates {
                if state.is_cancelled() {
                    return Ok(Termination::Cancelled);
                }

                let Some(key) = candidate.identity_key() else {
                    debug!("Candidate {} has no identity, skipping", candidate.handle);
                    continue;
                };

                if !state.seen.insert_new(key) {
                    continue;
                }
                found_new = true;

                if let Err(e) = self.source.reveal(candidate).await {
                    warn!("Failed to scroll to candidate {}: {}", candidate.handle, e);
                    continue;
                }
                self.pacer.pause(self.policy.reveal).await;

                let Some(detail) = self.collector.collect(candidate).await else {
                    continue;
                };

                let item = CollectedItem::new(key, detail);
                info!(
                    "Collected [{}{}]: {}",
                    state.collected() + 1,
                    Self::limit_suffix(state.limit()),
                    item.display_title()
                );

                if state.record(item) {
                    info!("Reached limit of {} items", state.limit());
                    return Ok(Termination::LimitReached);
                }
            }

            if found_new {
                idle_screens = 0;
            } else {
                idle_screens += 1;
                debug!(
                    "No new candidates on screen {} ({}/{})",
                    step + 1,
                    idle_screens,
                    self.policy.max_idle_screens
                );
            }

            if self.policy.max_idle_screens > 0 && idle_screens >= self.policy.max_idle_screens {
                info!(
                    "No new candidates in {} consecutive screens, treating content as exhausted",
                    idle_screens
                );
                return Ok(Termination::Exhausted);
            }

            if state.is_cancelled() {
                return Ok(Termination::Cancelled);
            }

            self.source
                .advance(ScrollStep::ViewportFraction(self.policy.advance_fraction))
                .await?;
            self.pacer.pause(self.policy.screen).await;
        }

        info!("Scroll budget of {} steps spent", self.policy.max_steps);
        Ok(Termination::StepBudgetSpent)
    }

    fn limit_suffix(limit: usize) -> String {
        if limit > 0 {
            format!("/{}", limit)
        } else {
            String::new()
        }
    }
}
