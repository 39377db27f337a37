use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::app::{CrawlError, Result};
use crate::domain::BatchEnvelope;
use crate::sink::config::DeliveryConfig;
use crate::sink::DeliverySink;

/// POSTs each batch as JSON to an endpoint.
///
/// Server errors and transport failures are retried with exponential
/// backoff; 4xx responses are not.
pub struct HttpSink {
    client: Client,
    endpoint: Url,
    max_attempts: u32,
    retry_delay: Duration,
}

impl HttpSink {
    pub fn new(endpoint: &str, config: &DeliveryConfig) -> Result<Self> {
        let endpoint = Url::parse(endpoint)?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(CrawlError::Config(format!(
                "Delivery endpoint must be http or https: {}",
                endpoint
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("notecrawl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay(),
        })
    }
}

#[async_trait]
impl DeliverySink for HttpSink {
    async fn deliver(&self, envelope: &BatchEnvelope) -> Result<()> {
        let mut delay = self.retry_delay;
        let mut last_error = CrawlError::Delivery("no attempt made".to_string());

        for attempt in 1..=self.max_attempts {
            debug!(
                "POST batch {} to {} (attempt {}/{})",
                envelope.batch_number, self.endpoint, attempt, self.max_attempts
            );

            match self
                .client
                .post(self.endpoint.clone())
                .json(envelope)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) if response.status().is_client_error() => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(CrawlError::Delivery(format!(
                        "endpoint rejected batch {} with {}: {}",
                        envelope.batch_number, status, body
                    )));
                }
                Ok(response) => {
                    last_error = CrawlError::Delivery(format!(
                        "endpoint answered {}",
                        response.status()
                    ));
                }
                Err(e) => {
                    last_error = CrawlError::Http(e);
                }
            }

            if attempt < self.max_attempts {
                warn!(
                    "Batch {} delivery attempt {}/{} failed: {}, retrying in {:?}",
                    envelope.batch_number, attempt, self.max_attempts, last_error, delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        Err(last_error)
    }

    fn name(&self) -> &str {
        self.endpoint.as_str()
    }
}
