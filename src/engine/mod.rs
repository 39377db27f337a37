//! Scroll-driven collection engine.
//!
//! # Architecture
//!
//! ```text
//! RunController → Discovery loop → DetailCollector → DetailSource (page)
//!                      │
//!                      └→ BatchAccumulator → Dispatcher → DeliverySink
//! ```
//!
//! The engine never touches a DOM directly: everything page-specific sits
//! behind [`DetailSource`], delivery behind [`crate::sink::DeliverySink`],
//! and every pause behind [`Pacer`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use notecrawl::engine::{EngineSettings, RandomPacer, RunConfiguration, RunController};
//!
//! let controller = RunController::new(EngineSettings::default(), Arc::new(RandomPacer));
//! let handle = controller.start(RunConfiguration::default(), source, sink)?;
//! let report = handle.wait().await;
//! ```

mod batch;
mod collector;
mod config;
mod controller;
mod dedup;
mod discovery;
mod dispatch;
mod pacing;
mod source;
mod state;

pub use batch::{BatchAccumulator, BatchContext};
pub use collector::DetailCollector;
pub use config::{
    CollectorSettings, DelayRange, EngineSettings, PolicyOverrides, RunConfiguration,
    ScrollPolicy, DEFAULT_BATCH_SIZE, DEFAULT_FEED_QUOTA,
};
pub use controller::{
    RunController, RunHandle, RunPhase, RunReport, StatusSnapshot, StopHandle, TerminalStatus,
};
pub use dedup::SeenSet;
pub use discovery::{Discovery, Termination};
pub use dispatch::{DeliveryStats, Dispatcher};
pub use pacing::{wait_for, NoDelay, Pacer, RandomPacer};
pub use source::{Candidate, CloseAction, ContainerHandle, DetailSource, ScrollStep};
pub use state::{CancelFlag, RunProgress, RunState};
