use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::app::Result;
use crate::domain::BatchEnvelope;
use crate::sink::config::FileLayout;
use crate::sink::DeliverySink;

/// Writes batches to JSON files on disk.
///
/// Redelivering a batch overwrites its file in per-batch layout and adds
/// a second line in append layout.
pub struct FileSink {
    dir: PathBuf,
    prefix: String,
    layout: FileLayout,
    label: String,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, layout: FileLayout) -> Self {
        let dir = dir.into();
        let label = format!("file:{}", dir.display());
        Self {
            dir,
            prefix: prefix.into(),
            layout,
            label,
        }
    }

    /// File a batch lands in for the per-batch layout
    pub fn batch_path(&self, batch_number: u32) -> PathBuf {
        self.dir
            .join(format!("{}_batch{}.json", self.prefix, batch_number))
    }

    /// File every batch is appended to for the append layout
    pub fn append_path(&self) -> PathBuf {
        self.dir.join(format!("{}.jsonl", self.prefix))
    }
}

#[async_trait]
impl DeliverySink for FileSink {
    async fn deliver(&self, envelope: &BatchEnvelope) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        match self.layout {
            FileLayout::PerBatch => {
                let body = serde_json::to_vec_pretty(envelope)?;
                tokio::fs::write(self.batch_path(envelope.batch_number), body).await?;
            }
            FileLayout::Append => {
                let mut line = serde_json::to_vec(envelope)?;
                line.push(b'\n');
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(self.append_path())
                    .await?;
                file.write_all(&line).await?;
                file.flush().await?;
            }
        }

        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}
