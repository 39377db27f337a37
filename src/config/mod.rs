//! Configuration management for notecrawl.
//!
//! Configuration is read from `~/.config/notecrawl/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::browser::{BrowserConfig, PageSelectors};
use crate::domain::CollectionMode;
use crate::engine::{
    CollectorSettings, EngineSettings, PolicyOverrides, RunConfiguration, ScrollPolicy,
    DEFAULT_BATCH_SIZE, DEFAULT_FEED_QUOTA,
};
use crate::sink::DeliveryConfig;

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub run: RunDefaults,
    pub collector: CollectorSettings,
    pub profile: PolicyOverrides,
    pub feed: PolicyOverrides,
    pub browser: BrowserConfig,
    pub selectors: PageSelectors,
    pub delivery: DeliveryConfig,
}

/// Run parameters used when the command line doesn't give them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunDefaults {
    pub mode: CollectionMode,
    /// 0 means no limit (feed runs fall back to `feed_quota`)
    pub total_limit: usize,
    pub batch_size: usize,
    pub feed_quota: usize,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            mode: CollectionMode::Profile,
            total_limit: 0,
            batch_size: DEFAULT_BATCH_SIZE,
            feed_quota: DEFAULT_FEED_QUOTA,
        }
    }
}

impl RunDefaults {
    pub fn run_configuration(&self) -> RunConfiguration {
        RunConfiguration::new(self.mode, self.total_limit, self.batch_size)
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load from `path`, creating it with defaults when missing
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            Self::create_default_config(path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/notecrawl/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("notecrawl").join("config.toml"))
    }

    /// Engine settings with the per-mode overrides applied
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            collector: self.collector.clone(),
            profile: ScrollPolicy::profile().apply(&self.profile),
            feed: ScrollPolicy::feed().apply(&self.feed),
            feed_quota: self.run.feed_quota,
        }
    }

    /// Write the commented default config to `path`, creating parent directories.
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    pub fn default_config_content() -> String {
        r##"# notecrawl configuration
#
# Delay ranges are written as { min_ms = ..., max_ms = ... }; each pause
# is drawn uniformly from the range.

[run]
# "profile" collects a user's grid, "feed" collects the discovery feed
mode = "profile"

# Items per run, 0 for no limit
total_limit = 0

# Items per delivered batch
batch_size = 5

# Item quota for feed runs when total_limit is 0
feed_quota = 10

[collector]
# How long to wait for a detail overlay after clicking a card (milliseconds)
open_timeout_ms = 6000
poll_interval_ms = 100
container_selectors = [".note-detail-container", ".note-container"]
settle = { min_ms = 1500, max_ms = 3000 }
close = { min_ms = 1000, max_ms = 2000 }

# Scroll policy overrides; anything left out keeps the built-in value.
[profile]
# max_steps = 100
# Screens in a row without new items before stopping, 0 disables
# max_idle_screens = 3
# advance_fraction = 0.8
# screen = { min_ms = 2000, max_ms = 4000 }

[feed]
# max_steps = 20
# advance_fraction = 1.0
# Pixels to scroll when no cards are listed yet, 0 disables
# empty_retry_px = 500
# warmup = { min_ms = 1000, max_ms = 2000 }

[browser]
# The site needs a logged-in window, so the browser is visible by default
headless = false

# Page load timeout in seconds
timeout_secs = 30

# Wait time after page load for dynamic content (milliseconds)
wait_after_load_ms = 2000

# Keep a profile directory so the login survives between runs
# user_data_dir = "/home/me/.local/share/notecrawl/chrome"

# Page opened when no --url is given
# start_url = "https://www.xiaohongshu.com/explore"

# Comment list scrolls before a note is read
comment_scroll_rounds = 3

[selectors]
# CSS selectors the page scripts use; lists are tried in order.
# candidates = [".note-item", "section.note-item", ".feed-item"]
# close_controls = [".close-circle", ".close"]

[delivery]
# "file" or "http"
target = "file"

# Defaults to the download directory
# output_dir = "/home/me/Downloads"

file_prefix = "notecrawl"

# "per_batch" writes {prefix}_batch{n}.json, "append" writes {prefix}.jsonl
layout = "per_batch"

# endpoint = "http://localhost:8080/api/notes"
timeout_secs = 30
max_attempts = 3
retry_delay_ms = 1000

# Save note images to {output_dir}/media/{id}_image_{n}.{ext}; webp is converted to jpg
download_media = false
media_referer = "https://www.xiaohongshu.com/"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
