use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::app::{CrawlError, Result};
use crate::domain::{CollectedItem, CollectionMode, ProfileSummary};
use crate::engine::batch::{BatchAccumulator, BatchContext};
use crate::engine::config::{EngineSettings, RunConfiguration};
use crate::engine::discovery::{Discovery, Termination};
use crate::engine::dispatch::{DeliveryStats, Dispatcher};
use crate::engine::pacing::Pacer;
use crate::engine::source::DetailSource;
use crate::engine::state::{CancelFlag, RunProgress, RunState};
use crate::sink::{DeliverySink, MediaDownloader};

/// Lifecycle of the controller's current or most recent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "phase", content = "message")]
pub enum RunPhase {
    Idle,
    Running,
    Completed,
    Stopped,
    Errored(String),
}

impl RunPhase {
    pub fn is_running(&self) -> bool {
        matches!(self, RunPhase::Running)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Running => "running",
            RunPhase::Completed => "completed",
            RunPhase::Stopped => "stopped",
            RunPhase::Errored(_) => "errored",
        }
    }
}

/// How a run ended, as reported to the caller that started it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Complete,
    Stopped,
    Error,
}

/// Final result of a run. Partial items are always included.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: TerminalStatus,
    pub mode: CollectionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination: Option<Termination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileSummary>,
    pub items: Vec<CollectedItem>,
    pub delivery: DeliveryStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    fn aborted(mode: CollectionMode, started_at: DateTime<Utc>, message: String) -> Self {
        Self {
            status: TerminalStatus::Error,
            mode,
            termination: None,
            message: Some(message),
            profile: None,
            items: Vec::new(),
            delivery: DeliveryStats::default(),
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub phase: RunPhase,
    pub collected: usize,
    pub batches: usize,
}

/// Requests a cooperative stop of whatever run is in flight.
#[derive(Debug, Clone)]
pub struct StopHandle {
    cancel: CancelFlag,
}

impl StopHandle {
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Awaitable result of a started run.
pub struct RunHandle {
    mode: CollectionMode,
    started_at: DateTime<Utc>,
    task: JoinHandle<RunReport>,
}

impl RunHandle {
    pub async fn wait(self) -> RunReport {
        match self.task.await {
            Ok(report) => report,
            Err(e) => {
                error!("Run task failed: {}", e);
                RunReport::aborted(self.mode, self.started_at, format!("run task failed: {}", e))
            }
        }
    }
}

/// Owns run lifecycle: at most one run at a time, cooperative stop, status.
pub struct RunController {
    settings: EngineSettings,
    pacer: Arc<dyn Pacer>,
    phase: Arc<Mutex<RunPhase>>,
    cancel: CancelFlag,
    progress: Mutex<Arc<RunProgress>>,
    media: Option<Arc<MediaDownloader>>,
}

impl RunController {
    pub fn new(settings: EngineSettings, pacer: Arc<dyn Pacer>) -> Self {
        Self {
            settings,
            pacer,
            phase: Arc::new(Mutex::new(RunPhase::Idle)),
            cancel: CancelFlag::new(),
            progress: Mutex::new(Arc::new(RunProgress::default())),
            media: None,
        }
    }

    /// Save each batch's images before it is delivered
    pub fn with_media(mut self, media: Option<Arc<MediaDownloader>>) -> Self {
        self.media = media;
        self
    }

    /// Start a run on a background task.
    ///
    /// Rejected with [`CrawlError::Busy`] while another run is in flight.
    pub fn start(
        &self,
        run: RunConfiguration,
        source: Arc<dyn DetailSource>,
        sink: Arc<dyn DeliverySink>,
    ) -> Result<RunHandle> {
        run.validate()?;

        {
            let mut phase = lock(&self.phase);
            if phase.is_running() {
                return Err(CrawlError::Busy);
            }
            // A stop that sees `Running` must land after this reset
            self.cancel.reset();
            *phase = RunPhase::Running;
        }

        let progress = Arc::new(RunProgress::default());
        *lock(&self.progress) = progress.clone();

        let started_at = Utc::now();
        let job = RunJob {
            run,
            settings: self.settings.clone(),
            pacer: self.pacer.clone(),
            source,
            sink,
            media: self.media.clone(),
            cancel: self.cancel.clone(),
            progress,
            started_at,
        };
        let guard = PhaseGuard {
            phase: self.phase.clone(),
            settled: false,
        };

        info!(
            "Starting {} run (limit: {}, batch size: {})",
            run.mode,
            run.effective_limit(self.settings.feed_quota),
            run.batch_size
        );

        let task = tokio::spawn(async move {
            let mut guard = guard;
            let (report, phase) = job.execute().await;
            guard.settle(phase);
            report
        });

        Ok(RunHandle {
            mode: run.mode,
            started_at,
            task,
        })
    }

    /// Ask the current run to stop. Returns whether a run was in flight.
    pub fn stop(&self) -> bool {
        let phase = lock(&self.phase);
        let running = phase.is_running();
        if running {
            info!("Stop requested");
            self.cancel.cancel();
        }
        running
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            cancel: self.cancel.clone(),
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        let phase = lock(&self.phase).clone();
        let progress = lock(&self.progress).clone();
        StatusSnapshot {
            phase,
            collected: progress.collected(),
            batches: progress.batches(),
        }
    }
}

/// Everything a run task owns.
struct RunJob {
    run: RunConfiguration,
    settings: EngineSettings,
    pacer: Arc<dyn Pacer>,
    source: Arc<dyn DetailSource>,
    sink: Arc<dyn DeliverySink>,
    media: Option<Arc<MediaDownloader>>,
    cancel: CancelFlag,
    progress: Arc<RunProgress>,
    started_at: DateTime<Utc>,
}

impl RunJob {
    async fn execute(self) -> (RunReport, RunPhase) {
        let mode = self.run.mode;

        let profile = match mode {
            CollectionMode::Profile => match self.source.profile_summary().await {
                Ok(profile) => {
                    if let Some(p) = &profile {
                        info!("Collecting profile of {}", p.display_name());
                    }
                    profile
                }
                Err(e) => {
                    warn!("Failed to read profile summary: {}", e);
                    None
                }
            },
            CollectionMode::Feed => None,
        };

        let mut context = BatchContext::new(mode);
        context.started_at = self.started_at;
        context.profile = profile.clone();

        let mut state = RunState::new(
            self.run.effective_limit(self.settings.feed_quota),
            BatchAccumulator::new(self.run.batch_size, context),
            Dispatcher::spawn(self.sink.clone(), self.media.clone()),
            self.cancel.clone(),
            self.progress.clone(),
        );

        let outcome = Discovery::new(
            self.source.as_ref(),
            self.pacer.as_ref(),
            self.settings.policy(mode),
            &self.settings.collector,
        )
        .run(&mut state)
        .await;

        let (items, delivery) = state.finish().await;

        let (status, phase, termination, message) = match outcome {
            Ok(Termination::Cancelled) => {
                info!("Run stopped after {} items", items.len());
                (
                    TerminalStatus::Stopped,
                    RunPhase::Stopped,
                    Some(Termination::Cancelled),
                    None,
                )
            }
            Ok(termination) => {
                info!("Run complete: {} items ({:?})", items.len(), termination);
                (
                    TerminalStatus::Complete,
                    RunPhase::Completed,
                    Some(termination),
                    None,
                )
            }
            Err(e) => {
                error!("Run failed after {} items: {}", items.len(), e);
                let message = e.to_string();
                (
                    TerminalStatus::Error,
                    RunPhase::Errored(message.clone()),
                    None,
                    Some(message),
                )
            }
        };

        if delivery.failed > 0 {
            warn!(
                "{} of {} batches failed to deliver: {:?}",
                delivery.failed, delivery.dispatched, delivery.failed_batches
            );
        }

        let report = RunReport {
            status,
            mode,
            termination,
            message,
            profile,
            items,
            delivery,
            started_at: self.started_at,
            finished_at: Utc::now(),
        };
        (report, phase)
    }
}

/// Leaves the controller in `Errored` if a run task dies without settling.
struct PhaseGuard {
    phase: Arc<Mutex<RunPhase>>,
    settled: bool,
}

impl PhaseGuard {
    fn settle(&mut self, phase: RunPhase) {
        *lock(&self.phase) = phase;
        self.settled = true;
    }
}

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        if !self.settled {
            *lock(&self.phase) = RunPhase::Errored("run aborted".to_string());
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_labels() {
        assert_eq!(RunPhase::Idle.label(), "idle");
        assert_eq!(RunPhase::Errored("x".into()).label(), "errored");
        assert!(RunPhase::Running.is_running());
        assert!(!RunPhase::Stopped.is_running());
    }

    #[test]
    fn test_phase_guard_marks_abort() {
        let phase = Arc::new(Mutex::new(RunPhase::Running));
        drop(PhaseGuard {
            phase: phase.clone(),
            settled: false,
        });
        assert_eq!(
            *phase.lock().unwrap(),
            RunPhase::Errored("run aborted".to_string())
        );
    }

    #[test]
    fn test_phase_guard_keeps_settled_phase() {
        let phase = Arc::new(Mutex::new(RunPhase::Running));
        let mut guard = PhaseGuard {
            phase: phase.clone(),
            settled: false,
        };
        guard.settle(RunPhase::Completed);
        drop(guard);
        assert_eq!(*phase.lock().unwrap(), RunPhase::Completed);
    }
}
