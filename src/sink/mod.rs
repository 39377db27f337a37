//! Delivery backends for collected batches.
//!
//! - [`FileSink`]: JSON files on disk
//! - [`HttpSink`]: JSON POST to an endpoint
//! - [`MediaDownloader`]: saves note images before a batch is delivered
//!
//! A sink may see the same batch twice if a caller retries; neither
//! backend deduplicates.

mod config;
mod file;
mod http;
mod media;

pub use config::{DeliveryConfig, DeliveryTarget, FileLayout};
pub use file::FileSink;
pub use http::HttpSink;
pub use media::{MediaDownloader, MediaTally};

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::{CrawlError, Result};
use crate::domain::BatchEnvelope;

#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Deliver one batch; an error marks the batch as failed
    async fn deliver(&self, envelope: &BatchEnvelope) -> Result<()>;

    /// Short description for logs
    fn name(&self) -> &str {
        "sink"
    }
}

/// The image downloader, when `config` asks for one
pub fn build_media(config: &DeliveryConfig) -> Result<Option<Arc<MediaDownloader>>> {
    if !config.download_media {
        return Ok(None);
    }
    Ok(Some(Arc::new(MediaDownloader::new(config.media_dir(), config)?)))
}

/// Build the sink selected by `config`
pub fn build_sink(config: &DeliveryConfig) -> Result<Arc<dyn DeliverySink>> {
    match config.target {
        DeliveryTarget::File => Ok(Arc::new(FileSink::new(
            config.resolved_output_dir(),
            config.file_prefix.clone(),
            config.layout,
        ))),
        DeliveryTarget::Http => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                CrawlError::Config("HTTP delivery needs an endpoint".to_string())
            })?;
            Ok(Arc::new(HttpSink::new(endpoint, config)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_target_requires_endpoint() {
        let config = DeliveryConfig {
            target: DeliveryTarget::Http,
            ..Default::default()
        };
        assert!(matches!(build_sink(&config), Err(CrawlError::Config(_))));
    }

    #[test]
    fn test_file_target_builds() {
        let config = DeliveryConfig {
            output_dir: Some("/tmp/notecrawl-out".into()),
            ..Default::default()
        };
        let sink = build_sink(&config).unwrap();
        assert_eq!(sink.name(), "file:/tmp/notecrawl-out");
    }

    #[test]
    fn test_media_only_when_enabled() {
        let mut config = DeliveryConfig::default();
        assert!(build_media(&config).unwrap().is_none());
        config.download_media = true;
        assert!(build_media(&config).unwrap().is_some());
    }
}
