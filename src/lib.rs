//! # notecrawl
//!
//! A scroll-driven collector for notes and their comment threads.
//!
//! ## Architecture
//!
//! notecrawl drives a live browser tab the way a reader would:
//!
//! ```text
//! Scroll → List cards → Open overlay → Extract → Close → Batch → Deliver
//! ```
//!
//! - [`engine`]: the collection loop, deduplication, batching and run control
//! - [`browser`]: Chrome adapter the engine drives
//! - [`sink`]: file and HTTP delivery of batches
//! - [`control`]: JSON start/stop/status channel
//!
//! ## Quick Start
//!
//! ```bash
//! # Collect a profile into ~/Downloads, 5 notes per file
//! notecrawl run --url https://www.xiaohongshu.com/user/profile/<id>
//!
//! # Collect 30 notes from the feed and POST them
//! notecrawl run --mode feed --limit 30 --endpoint http://localhost:8080/api/notes
//!
//! # Drive runs over stdin/stdout
//! notecrawl serve --url https://www.xiaohongshu.com/explore
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the config,
/// delivery sink, pacer and run controller.
pub mod app;

/// Chrome adapter.
///
/// - [`ChromeBrowser`](browser::ChromeBrowser): launches Chrome and opens pages
/// - [`ChromeSource`](browser::ChromeSource): a page as a [`DetailSource`](engine::DetailSource)
/// - [`PageSelectors`](browser::PageSelectors): overridable CSS selectors
pub mod browser;

/// Command-line interface using clap.
///
/// - `run` - Collect once and exit
/// - `serve` - Accept control messages on stdin
/// - `config [--init]` - Show or create the config file
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/notecrawl/config.toml`, creating a commented
/// default when missing.
pub mod config;

/// Line-oriented JSON control channel.
pub mod control;

/// Core domain models.
///
/// - [`CollectedItem`](domain::CollectedItem): one collected note with a SHA256 id
/// - [`NoteDetail`](domain::NoteDetail): fields read from a detail overlay
/// - [`BatchEnvelope`](domain::BatchEnvelope): a delivered batch
pub mod domain;

/// The collection engine.
pub mod engine;

/// Batch delivery.
///
/// - [`DeliverySink`](sink::DeliverySink): async trait for backends
/// - [`FileSink`](sink::FileSink) and [`HttpSink`](sink::HttpSink)
/// - [`MediaDownloader`](sink::MediaDownloader): optional image download per batch
pub mod sink;
