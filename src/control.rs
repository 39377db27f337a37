//! Line-oriented JSON control channel.
//!
//! Each input line is one request:
//!
//! ```text
//! {"action":"start","mode":"profile","totalLimit":20,"batchSize":5}
//! {"action":"stop"}
//! {"action":"status"}
//! ```
//!
//! Each output line is an acknowledgement, a status snapshot, a batch
//! event, or the terminal message of a run.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::{CrawlError, Result};
use crate::domain::{BatchEnvelope, CollectedItem, CollectionMode};
use crate::engine::{
    DeliveryStats, DetailSource, RunConfiguration, RunController, RunReport, StatusSnapshot,
    TerminalStatus, DEFAULT_BATCH_SIZE,
};
use crate::sink::DeliverySink;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlRequest {
    #[serde(rename_all = "camelCase")]
    Start {
        #[serde(default)]
        mode: CollectionMode,
        #[serde(default)]
        total_limit: usize,
        #[serde(default)]
        batch_size: Option<usize>,
    },
    Stop,
    Status,
}

impl ControlRequest {
    pub fn parse(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    Running,
    Busy,
    Stopped,
    Error,
}

/// Everything written to the output side of the channel
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ControlMessage {
    Ack {
        status: AckStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Status {
        status: &'static str,
        collected: usize,
        batches: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Batch {
        event: &'static str,
        #[serde(flatten)]
        envelope: BatchEnvelope,
    },
    Finished {
        status: TerminalStatus,
        items: Vec<CollectedItem>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        delivery: DeliveryStats,
    },
}

impl ControlMessage {
    fn ack(status: AckStatus) -> Self {
        ControlMessage::Ack {
            status,
            message: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        ControlMessage::Ack {
            status: AckStatus::Error,
            message: Some(message.into()),
        }
    }
}

impl From<StatusSnapshot> for ControlMessage {
    fn from(snapshot: StatusSnapshot) -> Self {
        let message = match &snapshot.phase {
            crate::engine::RunPhase::Errored(message) => Some(message.clone()),
            _ => None,
        };
        ControlMessage::Status {
            status: snapshot.phase.label(),
            collected: snapshot.collected,
            batches: snapshot.batches,
            message,
        }
    }
}

impl From<RunReport> for ControlMessage {
    fn from(report: RunReport) -> Self {
        ControlMessage::Finished {
            status: report.status,
            items: report.items,
            message: report.message,
            delivery: report.delivery,
        }
    }
}

/// Supplies the page a run in `mode` should drive
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn source_for(&self, mode: CollectionMode) -> Result<Arc<dyn DetailSource>>;
}

/// Emits each batch as an event line, then hands it to the real sink.
pub struct BatchEventSink {
    inner: Arc<dyn DeliverySink>,
    out: mpsc::UnboundedSender<ControlMessage>,
}

impl BatchEventSink {
    pub fn new(inner: Arc<dyn DeliverySink>, out: mpsc::UnboundedSender<ControlMessage>) -> Self {
        Self { inner, out }
    }
}

#[async_trait]
impl DeliverySink for BatchEventSink {
    async fn deliver(&self, envelope: &BatchEnvelope) -> Result<()> {
        let event = ControlMessage::Batch {
            event: "batch",
            envelope: envelope.clone(),
        };
        if self.out.send(event).is_err() {
            debug!("Control output closed, batch {} not announced", envelope.batch_number);
        }
        self.inner.deliver(envelope).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Answers control requests against one controller.
pub struct ControlServer {
    controller: Arc<RunController>,
    sources: Arc<dyn SourceProvider>,
    sink: Arc<dyn DeliverySink>,
    out: mpsc::UnboundedSender<ControlMessage>,
    /// Used when a start request carries no `batchSize`
    default_batch_size: usize,
}

impl ControlServer {
    /// Returns the server and the receiver for asynchronous output
    pub fn new(
        controller: Arc<RunController>,
        sources: Arc<dyn SourceProvider>,
        sink: Arc<dyn DeliverySink>,
    ) -> (Self, mpsc::UnboundedReceiver<ControlMessage>) {
        let (out, rx) = mpsc::unbounded_channel();
        let server = Self {
            controller,
            sources,
            sink,
            out,
            default_batch_size: DEFAULT_BATCH_SIZE,
        };
        (server, rx)
    }

    pub fn with_default_batch_size(mut self, batch_size: usize) -> Self {
        self.default_batch_size = batch_size;
        self
    }

    pub fn controller(&self) -> &RunController {
        &self.controller
    }

    /// Handle one input line and return the immediate reply
    pub async fn handle_line(&self, line: &str) -> ControlMessage {
        match ControlRequest::parse(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                warn!("Bad control request {:?}: {}", line, e);
                ControlMessage::error(format!("invalid request: {}", e))
            }
        }
    }

    pub async fn handle(&self, request: ControlRequest) -> ControlMessage {
        match request {
            ControlRequest::Start {
                mode,
                total_limit,
                batch_size,
            } => {
                let run = RunConfiguration::new(
                    mode,
                    total_limit,
                    batch_size.unwrap_or(self.default_batch_size),
                );
                match self.start(run).await {
                    Ok(()) => ControlMessage::ack(AckStatus::Running),
                    Err(CrawlError::Busy) => ControlMessage::ack(AckStatus::Busy),
                    Err(e) => ControlMessage::error(e.to_string()),
                }
            }
            ControlRequest::Stop => {
                self.controller.stop();
                ControlMessage::ack(AckStatus::Stopped)
            }
            ControlRequest::Status => self.controller.status().into(),
        }
    }

    async fn start(&self, run: RunConfiguration) -> Result<()> {
        run.validate()?;
        if self.controller.status().phase.is_running() {
            return Err(CrawlError::Busy);
        }

        let source = self.sources.source_for(run.mode).await?;
        let sink = Arc::new(BatchEventSink::new(self.sink.clone(), self.out.clone()));
        let handle = self.controller.start(run, source, sink)?;

        let out = self.out.clone();
        tokio::spawn(async move {
            let report = handle.wait().await;
            info!(
                "Run finished with {:?}: {} items",
                report.status,
                report.items.len()
            );
            let _ = out.send(report.into());
        });
        Ok(())
    }
}

/// Serve requests from `input` until it closes, writing every message to `output`.
///
/// On end of input any run in flight is stopped and its terminal message
/// is still written before returning.
pub async fn serve<R, W>(
    server: ControlServer,
    mut events: mpsc::UnboundedReceiver<ControlMessage>,
    input: R,
    mut output: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) if line.trim().is_empty() => continue,
                    Some(line) => {
                        let reply = server.handle_line(line.trim()).await;
                        write_message(&mut output, &reply).await?;
                    }
                    None => break,
                }
            }
            Some(message) = events.recv() => {
                write_message(&mut output, &message).await?;
            }
        }
    }

    info!("Control input closed");
    server.controller().stop();
    drop(server);

    // Drains once every in-flight run has reported and dropped its sink
    while let Some(message) = events.recv().await {
        write_message(&mut output, &message).await?;
    }
    Ok(())
}

async fn write_message<W: AsyncWrite + Unpin>(output: &mut W, message: &ControlMessage) -> Result<()> {
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await?;
    Ok(())
}
