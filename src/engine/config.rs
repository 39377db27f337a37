use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::{CrawlError, Result};
use crate::domain::CollectionMode;

/// Default number of items per delivered batch
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Item quota for feed runs that don't set a total limit
pub const DEFAULT_FEED_QUOTA: usize = 10;

/// Inclusive range a randomized pause is drawn from, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const ZERO: DelayRange = DelayRange::new(0, 0);

    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Bounds in ascending order, tolerating a swapped config entry
    pub fn bounds(&self) -> (u64, u64) {
        if self.min_ms <= self.max_ms {
            (self.min_ms, self.max_ms)
        } else {
            (self.max_ms, self.min_ms)
        }
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.bounds().1)
    }
}

/// Parameters of a single collection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfiguration {
    pub mode: CollectionMode,
    /// Maximum items to collect, 0 for unlimited
    pub total_limit: usize,
    pub batch_size: usize,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            mode: CollectionMode::Profile,
            total_limit: 0,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl RunConfiguration {
    pub fn new(mode: CollectionMode, total_limit: usize, batch_size: usize) -> Self {
        Self {
            mode,
            total_limit,
            batch_size,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CrawlError::InvalidRun(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The limit the discovery loop enforces, 0 meaning none.
    ///
    /// Feed runs always carry a quota; without an explicit total limit
    /// they fall back to `feed_quota`.
    pub fn effective_limit(&self, feed_quota: usize) -> usize {
        match (self.mode, self.total_limit) {
            (CollectionMode::Feed, 0) => feed_quota,
            (_, limit) => limit,
        }
    }
}

/// Timing and container lookup for opening a detail overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorSettings {
    /// How long to wait for a detail container to appear (default: 6000)
    pub open_timeout_ms: u64,

    /// Interval between container probes (default: 100)
    pub poll_interval_ms: u64,

    /// Accepted detail container selectors, first match wins
    pub container_selectors: Vec<String>,

    /// Pause after the container appears, before extraction
    pub settle: DelayRange,

    /// Pause after closing the overlay
    pub close: DelayRange,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            open_timeout_ms: 6000,
            poll_interval_ms: 100,
            container_selectors: vec![
                ".note-detail-container".to_string(),
                ".note-container".to_string(),
            ],
            settle: DelayRange::new(1500, 3000),
            close: DelayRange::new(1000, 2000),
        }
    }
}

impl CollectorSettings {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Upper bound of one open-extract-close sequence, excluding adapter latency
    pub fn worst_case(&self) -> Duration {
        self.open_timeout() + self.settle.max_duration() + self.close.max_duration()
    }
}

/// How the discovery loop scrolls and when it gives up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollPolicy {
    /// Hard ceiling on screens processed
    pub max_steps: usize,
    /// Consecutive screens without new items before the content counts as exhausted, 0 disables
    pub max_idle_screens: usize,
    /// Viewport heights to advance after each screen
    pub advance_fraction: f64,
    /// Pixels to scroll when the listing comes back empty; `None` treats an empty listing like any other screen
    pub empty_retry_px: Option<i64>,
    pub warmup: DelayRange,
    pub reveal: DelayRange,
    pub screen: DelayRange,
    pub empty_retry: DelayRange,
}

impl ScrollPolicy {
    pub fn profile() -> Self {
        Self {
            max_steps: 100,
            max_idle_screens: 3,
            advance_fraction: 0.8,
            empty_retry_px: None,
            warmup: DelayRange::ZERO,
            reveal: DelayRange::new(500, 1000),
            screen: DelayRange::new(2000, 4000),
            empty_retry: DelayRange::new(2000, 3000),
        }
    }

    pub fn feed() -> Self {
        Self {
            max_steps: 20,
            max_idle_screens: 0,
            advance_fraction: 1.0,
            empty_retry_px: Some(500),
            warmup: DelayRange::new(1000, 2000),
            reveal: DelayRange::new(800, 1500),
            screen: DelayRange::new(2000, 3000),
            empty_retry: DelayRange::new(2000, 3000),
        }
    }

    /// Same control flow with every pause removed
    pub fn without_delays(mut self) -> Self {
        self.warmup = DelayRange::ZERO;
        self.reveal = DelayRange::ZERO;
        self.screen = DelayRange::ZERO;
        self.empty_retry = DelayRange::ZERO;
        self
    }

    pub fn apply(mut self, overrides: &PolicyOverrides) -> Self {
        if let Some(v) = overrides.max_steps {
            self.max_steps = v;
        }
        if let Some(v) = overrides.max_idle_screens {
            self.max_idle_screens = v;
        }
        if let Some(v) = overrides.advance_fraction {
            self.advance_fraction = v;
        }
        if let Some(v) = overrides.empty_retry_px {
            self.empty_retry_px = (v > 0).then_some(v);
        }
        if let Some(v) = overrides.warmup {
            self.warmup = v;
        }
        if let Some(v) = overrides.reveal {
            self.reveal = v;
        }
        if let Some(v) = overrides.screen {
            self.screen = v;
        }
        if let Some(v) = overrides.empty_retry {
            self.empty_retry = v;
        }
        self
    }
}

/// Per-mode policy adjustments as written in the config file.
///
/// Unset fields keep the mode's built-in value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOverrides {
    pub max_steps: Option<usize>,
    pub max_idle_screens: Option<usize>,
    pub advance_fraction: Option<f64>,
    /// 0 disables the empty-listing retry
    pub empty_retry_px: Option<i64>,
    pub warmup: Option<DelayRange>,
    pub reveal: Option<DelayRange>,
    pub screen: Option<DelayRange>,
    pub empty_retry: Option<DelayRange>,
}

/// Everything the run controller needs besides the per-run parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub collector: CollectorSettings,
    pub profile: ScrollPolicy,
    pub feed: ScrollPolicy,
    pub feed_quota: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            collector: CollectorSettings::default(),
            profile: ScrollPolicy::profile(),
            feed: ScrollPolicy::feed(),
            feed_quota: DEFAULT_FEED_QUOTA,
        }
    }
}

impl EngineSettings {
    pub fn policy(&self, mode: CollectionMode) -> &ScrollPolicy {
        match mode {
            CollectionMode::Profile => &self.profile,
            CollectionMode::Feed => &self.feed,
        }
    }

    /// Settings with every pause zeroed and a short open timeout
    pub fn immediate() -> Self {
        let collector = CollectorSettings {
            open_timeout_ms: 50,
            poll_interval_ms: 5,
            settle: DelayRange::ZERO,
            close: DelayRange::ZERO,
            ..CollectorSettings::default()
        };
        Self {
            collector,
            profile: ScrollPolicy::profile().without_delays(),
            feed: ScrollPolicy::feed().without_delays(),
            feed_quota: DEFAULT_FEED_QUOTA,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_range_bounds_sorted() {
        assert_eq!(DelayRange::new(100, 50).bounds(), (50, 100));
        assert_eq!(DelayRange::new(10, 20).bounds(), (10, 20));
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let config = RunConfiguration::new(CollectionMode::Profile, 0, 0);
        assert!(matches!(config.validate(), Err(CrawlError::InvalidRun(_))));
        assert!(RunConfiguration::default().validate().is_ok());
    }

    #[test]
    fn test_effective_limit() {
        let profile = RunConfiguration::new(CollectionMode::Profile, 0, 5);
        assert_eq!(profile.effective_limit(10), 0);

        let feed = RunConfiguration::new(CollectionMode::Feed, 0, 5);
        assert_eq!(feed.effective_limit(10), 10);

        let feed_limited = RunConfiguration::new(CollectionMode::Feed, 3, 5);
        assert_eq!(feed_limited.effective_limit(10), 3);
    }

    #[test]
    fn test_mode_policies() {
        let profile = ScrollPolicy::profile();
        assert_eq!(profile.max_steps, 100);
        assert_eq!(profile.max_idle_screens, 3);
        assert_eq!(profile.empty_retry_px, None);

        let feed = ScrollPolicy::feed();
        assert_eq!(feed.max_steps, 20);
        assert_eq!(feed.max_idle_screens, 0);
        assert_eq!(feed.empty_retry_px, Some(500));
    }

    #[test]
    fn test_overrides_apply_only_set_fields() {
        let overrides = PolicyOverrides {
            max_steps: Some(7),
            empty_retry_px: Some(0),
            ..Default::default()
        };
        let policy = ScrollPolicy::feed().apply(&overrides);
        assert_eq!(policy.max_steps, 7);
        assert_eq!(policy.empty_retry_px, None);
        assert_eq!(policy.reveal, ScrollPolicy::feed().reveal);
    }

    #[test]
    fn test_worst_case_sums_timeouts() {
        let settings = CollectorSettings::default();
        assert_eq!(settings.worst_case(), Duration::from_millis(6000 + 3000 + 2000));
    }
}
