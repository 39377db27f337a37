use tracing::{debug, warn};

use crate::app::Result;
use crate::domain::NoteDetail;
use crate::engine::config::CollectorSettings;
use crate::engine::pacing::{wait_for, Pacer};
use crate::engine::source::{Candidate, CloseAction, DetailSource};

/// Runs the open → wait → extract → close sequence for one candidate.
pub struct DetailCollector<'a> {
    source: &'a dyn DetailSource,
    pacer: &'a dyn Pacer,
    settings: &'a CollectorSettings,
}

impl<'a> DetailCollector<'a> {
    pub fn new(
        source: &'a dyn DetailSource,
        pacer: &'a dyn Pacer,
        settings: &'a CollectorSettings,
    ) -> Self {
        Self {
            source,
            pacer,
            settings,
        }
    }

    /// Collect the detail behind `candidate`.
    ///
    /// Every failure is logged and turned into `None`; a single candidate
    /// can never abort the run.
    pub async fn collect(&self, candidate: &Candidate) -> Option<NoteDetail> {
        match self.try_collect(candidate).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!("Failed to collect candidate {}: {}", candidate.handle, e);
                None
            }
        }
    }

    async fn try_collect(&self, candidate: &Candidate) -> Result<Option<NoteDetail>> {
        self.source.open(candidate).await?;

        let selectors = &self.settings.container_selectors;
        let container = wait_for(
            self.settings.open_timeout(),
            self.settings.poll_interval(),
            || self.source.probe_container(selectors),
        )
        .await?;

        let Some(container) = container else {
            warn!(
                "Detail view for {} did not open within {:?}, skipping",
                candidate.handle,
                self.settings.open_timeout()
            );
            return Ok(None);
        };

        self.pacer.pause(self.settings.settle).await;

        let extracted = self.source.extract(&container).await;

        self.close_overlay().await;
        self.pacer.pause(self.settings.close).await;

        match extracted {
            Ok(detail) => Ok(Some(detail)),
            Err(e) => {
                warn!("Extraction failed for {}: {}", candidate.handle, e);
                Ok(None)
            }
        }
    }

    async fn close_overlay(&self) {
        for action in CloseAction::ORDER {
            match self.source.close(action).await {
                Ok(true) => return,
                Ok(false) => debug!("Close action {:?} not available", action),
                Err(e) => debug!("Close action {:?} failed: {}", action, e),
            }
        }
        debug!("No close action took effect");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::app::CrawlError;
    use crate::engine::config::DelayRange;
    use crate::engine::pacing::NoDelay;
    use crate::engine::source::{ContainerHandle, ScrollStep};

    /// Records every call; container appears after `appear_after` probes.
    struct OverlaySource {
        appear_after: Option<usize>,
        matching_selector: &'static str,
        fail_extract: bool,
        close_available: Vec<CloseAction>,
        calls: Mutex<Vec<String>>,
        probes: Mutex<usize>,
    }

    impl OverlaySource {
        fn new(appear_after: Option<usize>) -> Self {
            Self {
                appear_after,
                matching_selector: ".note-container",
                fail_extract: false,
                close_available: vec![CloseAction::Escape],
                calls: Mutex::new(Vec::new()),
                probes: Mutex::new(0),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl DetailSource for OverlaySource {
        async fn list_candidates(&self) -> Result<Vec<Candidate>> {
            Ok(Vec::new())
        }

        async fn reveal(&self, _candidate: &Candidate) -> Result<()> {
            Ok(())
        }

        async fn open(&self, candidate: &Candidate) -> Result<()> {
            self.record(format!("open {}", candidate.handle));
            Ok(())
        }

        async fn probe_container(&self, selectors: &[String]) -> Result<Option<ContainerHandle>> {
            let mut probes = self.probes.lock().unwrap();
            *probes += 1;
            let ready = self.appear_after.is_some_and(|n| *probes > n);
            Ok(selectors
                .iter()
                .find(|s| ready && s.as_str() == self.matching_selector)
                .map(|s| ContainerHandle {
                    selector: s.clone(),
                }))
        }

        async fn extract(&self, container: &ContainerHandle) -> Result<NoteDetail> {
            self.record(format!("extract {}", container.selector));
            if self.fail_extract {
                return Err(CrawlError::Extraction("title missing".into()));
            }
            Ok(NoteDetail {
                title: "note".into(),
                ..Default::default()
            })
        }

        async fn close(&self, action: CloseAction) -> Result<bool> {
            self.record(format!("close {:?}", action));
            if action == CloseAction::CloseButton {
                return Err(CrawlError::Browser("detached".into()));
            }
            Ok(self.close_available.contains(&action))
        }

        async fn advance(&self, _step: ScrollStep) -> Result<()> {
            Ok(())
        }
    }

    fn settings() -> CollectorSettings {
        CollectorSettings {
            open_timeout_ms: 40,
            poll_interval_ms: 2,
            settle: DelayRange::ZERO,
            close: DelayRange::ZERO,
            ..CollectorSettings::default()
        }
    }

    fn candidate() -> Candidate {
        Candidate {
            handle: "7".into(),
            link: Some("https://x/explore/7".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_collect_uses_second_selector_and_closes() {
        let source = OverlaySource::new(Some(2));
        let settings = settings();
        let collector = DetailCollector::new(&source, &NoDelay, &settings);

        let detail = collector.collect(&candidate()).await;

        assert_eq!(detail.map(|d| d.title), Some("note".to_string()));
        assert_eq!(
            source.calls(),
            vec![
                "open 7",
                "extract .note-container",
                "close CloseButton",
                "close Dismiss",
                "close Escape",
            ]
        );
    }

    #[tokio::test]
    async fn test_collect_times_out_without_container() {
        let source = OverlaySource::new(None);
        let settings = settings();
        let collector = DetailCollector::new(&source, &NoDelay, &settings);

        assert!(collector.collect(&candidate()).await.is_none());
        assert_eq!(source.calls(), vec!["open 7"]);
        assert!(*source.probes.lock().unwrap() > 1);
    }

    #[tokio::test]
    async fn test_extraction_failure_still_closes() {
        let mut source = OverlaySource::new(Some(0));
        source.fail_extract = true;
        source.close_available = vec![CloseAction::Dismiss];
        let settings = settings();
        let collector = DetailCollector::new(&source, &NoDelay, &settings);

        assert!(collector.collect(&candidate()).await.is_none());
        assert_eq!(
            source.calls(),
            vec![
                "open 7",
                "extract .note-container",
                "close CloseButton",
                "close Dismiss",
            ]
        );
    }
}
