use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where collected batches go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryTarget {
    #[default]
    File,
    Http,
}

/// How the file sink lays batches out on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileLayout {
    /// One pretty-printed JSON file per batch
    #[default]
    PerBatch,
    /// One JSON line per batch appended to a single file
    Append,
}

/// Configuration for batch delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Delivery backend (default: file)
    pub target: DeliveryTarget,

    /// Directory for exported files (default: the user's download directory)
    pub output_dir: Option<PathBuf>,

    /// File name prefix for exported batches (default: "notecrawl")
    pub file_prefix: String,

    pub layout: FileLayout,

    /// Endpoint receiving batches as JSON POST requests
    pub endpoint: Option<String>,

    /// HTTP request timeout in seconds (default: 30)
    pub timeout_secs: u64,

    /// Attempts per batch before it counts as failed (default: 3)
    pub max_attempts: u32,

    /// Delay before the first retry, doubled after each one (default: 1000)
    pub retry_delay_ms: u64,

    /// Save each note's images under `{output_dir}/media` before delivering (default: false)
    pub download_media: bool,

    /// Referer sent with image requests, empty for none
    pub media_referer: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            target: DeliveryTarget::File,
            output_dir: None,
            file_prefix: "notecrawl".to_string(),
            layout: FileLayout::PerBatch,
            endpoint: None,
            timeout_secs: 30,
            max_attempts: 3,
            retry_delay_ms: 1000,
            download_media: false,
            media_referer: "https://www.xiaohongshu.com/".to_string(),
        }
    }
}

impl DeliveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Configured output directory, else the download directory, else the working directory
    pub fn resolved_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn media_dir(&self) -> PathBuf {
        self.resolved_output_dir().join("media")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_delivery_config() {
        let config = DeliveryConfig::default();
        assert_eq!(config.target, DeliveryTarget::File);
        assert_eq!(config.layout, FileLayout::PerBatch);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay(), Duration::from_millis(1000));
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_explicit_output_dir_wins() {
        let config = DeliveryConfig {
            output_dir: Some(PathBuf::from("/tmp/exports")),
            ..Default::default()
        };
        assert_eq!(config.resolved_output_dir(), PathBuf::from("/tmp/exports"));
        assert_eq!(config.media_dir(), PathBuf::from("/tmp/exports/media"));
    }
}
