//! Thread export snapshots

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::messages::ThreadId;
use crate::thread::{Message, Thread};

/// Prefix of every export file name
const FILE_PREFIX: &str = "weather-chat";

/// The exported thread
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedThread {
    /// Thread ID
    pub id: ThreadId,
    /// Title at export time
    pub title: String,
    /// When the thread was created
    pub created_at: DateTime<Utc>,
    /// Messages at export time
    pub messages: Vec<Message>,
}

/// Serializable snapshot of one thread
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadExport {
    /// The thread
    pub thread: ExportedThread,
    /// When the snapshot was taken
    pub exported_at: DateTime<Utc>,
    /// Number of messages in the snapshot
    pub total_messages: usize,
}

impl ThreadExport {
    /// Snapshot `thread` as of `now`
    #[must_use]
    pub fn from_thread(thread: &Thread, now: DateTime<Utc>) -> Self {
        Self {
            thread: ExportedThread {
                id: thread.id.clone(),
                title: thread.title.clone(),
                created_at: thread.created_at,
                messages: thread.messages.clone(),
            },
            exported_at: now,
            total_messages: thread.messages.len(),
        }
    }

    /// Indented JSON document
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// `weather-chat-<title>-<YYYY-MM-DD>.json`, dated by the export time
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{FILE_PREFIX}-{}-{}.json",
            sanitize_title(&self.thread.title),
            self.exported_at.format("%Y-%m-%d")
        )
    }

    /// Write the document into `dir` under [`Self::file_name`]
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub async fn write_to_dir(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        let json = self
            .to_json_pretty()
            .context("Failed to serialize export")?;
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let path = dir.join(self.file_name());
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!(path = %path.display(), messages = self.total_messages, "Exported thread");
        Ok(path)
    }
}

/// Replace path separators so the title stays a single path component
fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect()
}
