use std::io::Cursor;
use std::path::PathBuf;

use image::{DynamicImage, ImageFormat};
use reqwest::header::{CONTENT_TYPE, REFERER};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app::Result;
use crate::domain::{BatchEnvelope, LocalMedia};
use crate::sink::config::DeliveryConfig;

/// Images saved and lost while localizing one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MediaTally {
    pub downloaded: u32,
    pub failed: u32,
}

/// Saves the images of collected notes to disk.
///
/// Files are named `{item id}_image_{n}.{ext}` with `n` starting at 1.
/// WebP images are re-encoded as JPEG.
pub struct MediaDownloader {
    client: Client,
    dir: PathBuf,
    referer: String,
}

impl MediaDownloader {
    pub fn new(dir: impl Into<PathBuf>, config: &DeliveryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("notecrawl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            dir: dir.into(),
            referer: config.media_referer.clone(),
        })
    }

    /// Download every image in the batch, recording local copies on each note.
    ///
    /// A failed image is logged and counted; the rest of the batch still goes out.
    pub async fn localize(&self, envelope: &mut BatchEnvelope) -> MediaTally {
        let mut tally = MediaTally::default();

        if envelope.items.iter().all(|item| item.detail.images.is_empty()) {
            return tally;
        }
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!("Cannot create media directory {}: {}", self.dir.display(), e);
            tally.failed = envelope
                .items
                .iter()
                .map(|item| item.detail.images.len() as u32)
                .sum();
            return tally;
        }

        for item in &mut envelope.items {
            let mut media = Vec::with_capacity(item.detail.images.len());

            for (n, url) in item.detail.images.iter().enumerate() {
                let stem = format!("{}_image_{}", item.id, n + 1);
                match self.download(url, &stem).await {
                    Ok(path) => {
                        debug!("Saved {} to {}", url, path.display());
                        tally.downloaded += 1;
                        media.push(LocalMedia {
                            url: url.clone(),
                            path: path.to_string_lossy().into_owned(),
                        });
                    }
                    Err(e) => {
                        warn!("Failed to download {}: {}", url, e);
                        tally.failed += 1;
                    }
                }
            }

            item.detail.media = media;
        }

        info!(
            "Batch {}: saved {} images ({} failed)",
            envelope.batch_number, tally.downloaded, tally.failed
        );
        tally
    }

    async fn download(&self, url: &str, stem: &str) -> Result<PathBuf> {
        let mut request = self.client.get(url);
        if !self.referer.is_empty() {
            request = request.header(REFERER, self.referer.as_str());
        }
        let response = request.send().await?.error_for_status()?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        let (body, ext) = match media_extension(content_type.as_deref(), url) {
            "webp" => match webp_to_jpeg(&body) {
                Ok(jpeg) => (jpeg, "jpg"),
                Err(e) => {
                    debug!("Keeping {} as webp: {}", url, e);
                    (body, "webp")
                }
            },
            ext => (body, ext),
        };

        let path = self.dir.join(format!("{}.{}", stem, ext));
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }
}

/// File extension from the response type, else the URL, else jpg
fn media_extension(content_type: Option<&str>, url: &str) -> &'static str {
    let from_type = content_type
        .and_then(|ct| ct.split(';').next())
        .and_then(|mime| known_extension(mime.trim().rsplit('/').next().unwrap_or_default()));

    let from_url = || {
        let parsed = url::Url::parse(url).ok()?;
        let (_, ext) = parsed.path().rsplit_once('.')?;
        known_extension(ext)
    };

    from_type.or_else(from_url).unwrap_or("jpg")
}

fn known_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpeg" | "jpg" => Some("jpg"),
        "png" => Some("png"),
        "gif" => Some("gif"),
        "webp" => Some("webp"),
        "avif" => Some("avif"),
        "mp4" => Some("mp4"),
        _ => None,
    }
}

fn webp_to_jpeg(body: &[u8]) -> std::result::Result<Vec<u8>, image::ImageError> {
    let decoded = image::load_from_memory_with_format(body, ImageFormat::WebP)?;
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(decoded.to_rgb8()).write_to(&mut out, ImageFormat::Jpeg)?;
    Ok(out.into_inner())
}
