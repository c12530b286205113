//! Task assignment and completion tracking over a task table and an output
//! table.
//!
//! Every call reads the tables fresh from the store. The output table is the
//! only record of progress, so a restart (or a hand edit of the output file)
//! is picked up on the next request.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::completion::CompletionIndex;
use crate::integrity::{check_output, FlashMessage};
use crate::record::Record;
use crate::selector::{RandomOrder, TaskOrder, TaskSelector, TaskStats};
use crate::store::{StoreError, TabularStore};

#[derive(Debug, Error)]
pub enum TurkError {
    #[error("No output rows to remove in {0}")]
    NothingToUndo(PathBuf),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct LocalTurk {
    store: Arc<dyn TabularStore>,
    tasks_table: PathBuf,
    outputs_table: PathBuf,
    selector: Mutex<TaskSelector<Box<dyn TaskOrder>>>,
    flash: FlashMessage,
}

impl LocalTurk {
    pub fn new(
        store: Arc<dyn TabularStore>,
        tasks_table: impl Into<PathBuf>,
        outputs_table: impl Into<PathBuf>,
    ) -> Self {
        Self::with_order(
            store,
            tasks_table,
            outputs_table,
            Box::new(RandomOrder::from_entropy()),
        )
    }

    /// Same as [`LocalTurk::new`] with a caller-supplied task order.
    pub fn with_order(
        store: Arc<dyn TabularStore>,
        tasks_table: impl Into<PathBuf>,
        outputs_table: impl Into<PathBuf>,
        order: Box<dyn TaskOrder>,
    ) -> Self {
        Self {
            store,
            tasks_table: tasks_table.into(),
            outputs_table: outputs_table.into(),
            selector: Mutex::new(TaskSelector::new(order)),
            flash: FlashMessage::new(),
        }
    }

    /// Output rows so far. A missing output table means nothing is done yet.
    pub async fn completed(&self) -> Result<Vec<Record>, TurkError> {
        match self.store.read_all(&self.outputs_table).await {
            Ok(rows) => Ok(rows),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn task_headers(&self) -> Result<Vec<String>, TurkError> {
        Ok(self.store.read_headers(&self.tasks_table).await?)
    }

    /// Pick a random task that has no matching output row yet.
    pub async fn next_task(&self) -> Result<TaskStats, TurkError> {
        let tasks = self.store.read_all(&self.tasks_table).await?;
        let index = CompletionIndex::build(self.completed().await?);

        let mut selector = self.selector.lock().unwrap_or_else(|e| e.into_inner());
        let stats = selector.select_next(tasks, &index);
        tracing::debug!(
            "{} / {} completed, next task: {:?}",
            stats.num_completed,
            stats.num_total,
            stats.task
        );
        Ok(stats)
    }

    /// Append a submission to the output table.
    ///
    /// Returns the data-quality warning, if any. The same warning is also left
    /// in the flash slot for the next rendered page. Once the row is saved the
    /// call succeeds, even if the task header cannot be read for the check.
    pub async fn submit(&self, record: &Record) -> Result<Option<String>, TurkError> {
        self.store.append(&self.outputs_table, record).await?;
        tracing::info!("Saved {}", serde_json::to_string(record).unwrap_or_default());

        let headers = match self.task_headers().await {
            Ok(headers) => headers,
            Err(e) => {
                tracing::warn!("Skipping output check, cannot read task header: {}", e);
                return Ok(None);
            }
        };
        let warning = check_output(record.keys(), &headers);
        if let Some(message) = &warning {
            tracing::warn!("Submission added no new columns: {:?}", record);
            self.flash.set(message.clone());
        }
        Ok(warning)
    }

    /// Remove the most recently appended output row.
    pub async fn undo_last(&self) -> Result<Record, TurkError> {
        match self.store.remove_last(&self.outputs_table).await {
            Ok(row) => {
                tracing::info!("Deleting {:?}", row);
                Ok(row)
            }
            Err(StoreError::EmptyTable(path)) | Err(StoreError::NotFound(path)) => {
                Err(TurkError::NothingToUndo(path))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Pending warning for the page being rendered; cleared once read.
    pub fn take_flash(&self) -> Option<String> {
        self.flash.take()
    }
}
