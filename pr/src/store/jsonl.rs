//! JSONL file-backed store
//!
//! Input is one JSON object per line: `{"system": "...", "user": "..."}`, with
//! an optional explicit `id`. Lines without an id take their 1-based line
//! number. Blank lines are skipped. Outputs are appended as `{"id", "output"}`
//! lines.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{LoadPage, Store, StoreError};
use crate::domain::WorkItem;

#[derive(Debug, Deserialize)]
struct InputRecord {
    id: Option<u64>,
    #[serde(default)]
    system: String,
    user: String,
}

#[derive(Debug, Serialize)]
struct OutputRecord<'a> {
    id: u64,
    output: &'a str,
}

/// Store reading work from a JSONL file and appending results to another
pub struct JsonlStore {
    /// Items sorted by id
    items: Vec<WorkItem>,
    output_path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlStore {
    /// Read and index the input file
    pub async fn open(input: impl AsRef<Path>, output: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let input = input.as_ref();
        debug!(input = %input.display(), "JsonlStore::open: called");
        let content = tokio::fs::read_to_string(input).await?;
        let items = Self::parse(&content)?;
        info!(count = items.len(), input = %input.display(), "Loaded work items");

        Ok(Self {
            items,
            output_path: output.into(),
            write_lock: Mutex::new(()),
        })
    }

    fn parse(content: &str) -> Result<Vec<WorkItem>, StoreError> {
        let mut items = Vec::new();
        for (n, line) in content.lines().enumerate() {
            let line_no = n + 1;
            if line.trim().is_empty() {
                continue;
            }
            let record: InputRecord = serde_json::from_str(line).map_err(|e| StoreError::InvalidRecord {
                line: line_no,
                message: e.to_string(),
            })?;
            let id = record.id.unwrap_or(line_no as u64);
            if id == 0 {
                return Err(StoreError::InvalidRecord {
                    line: line_no,
                    message: "id must be greater than zero".to_string(),
                });
            }
            items.push(WorkItem::new(id, record.system, record.user));
        }

        items.sort_by_key(|item| item.id);
        if let Some(pair) = items.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(StoreError::InvalidRecord {
                line: 0,
                message: format!("duplicate id {}", pair[0].id),
            });
        }
        Ok(items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl Store for JsonlStore {
    async fn load(&self, cursor: u64, limit: usize) -> Result<LoadPage, StoreError> {
        debug!(cursor, limit, "JsonlStore::load: called");
        let start = self.items.partition_point(|item| item.id <= cursor);
        let page: Vec<WorkItem> = self.items[start..].iter().take(limit).cloned().collect();

        if page.is_empty() {
            debug!(cursor, "JsonlStore::load: exhausted");
            return Ok(LoadPage::done());
        }
        Ok(LoadPage::items(page))
    }

    async fn save(&self, item: &WorkItem, output: &str) -> Result<(), StoreError> {
        debug!(id = item.id, "JsonlStore::save: called");
        let mut line = serde_json::to_string(&OutputRecord { id: item.id, output })?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output_path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
