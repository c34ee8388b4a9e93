//! crates/fundiq_core/src/queue.rs
//!
//! The upload queue controller. It validates a batch of files, runs them one at
//! a time through the configured ingestion, tracks per-file progress, and clears
//! finished entries from view after a delay.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{IncomingFile, UploadProgress, UploadStatus};
use crate::ingestion::{validate_file, DocumentIngestion};

pub const DEFAULT_MAX_FILE_BYTES: usize = 50 * 1024 * 1024;
pub const DEFAULT_REMOVAL_DELAY: Duration = Duration::from_secs(5);

//=========================================================================================
// Progress Board
//=========================================================================================

/// The visible list of upload entries. Cloning shares the same list.
#[derive(Clone, Default)]
pub struct ProgressBoard {
    entries: Arc<Mutex<Vec<UploadProgress>>>,
}

impl ProgressBoard {
    pub async fn push(&self, entry: UploadProgress) {
        self.entries.lock().await.push(entry);
    }

    pub async fn snapshot(&self) -> Vec<UploadProgress> {
        self.entries.lock().await.clone()
    }

    pub async fn get(&self, id: Uuid) -> Option<UploadProgress> {
        self.entries.lock().await.iter().find(|e| e.id == id).cloned()
    }

    pub fn handle(&self, id: Uuid) -> ProgressHandle {
        ProgressHandle {
            board: self.clone(),
            id,
        }
    }

    async fn update<F>(&self, id: Uuid, f: F) -> bool
    where
        F: FnOnce(&mut UploadProgress) -> bool,
    {
        let mut entries = self.entries.lock().await;
        match entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => f(entry),
            None => false,
        }
    }

    /// Drops the listed entries that have reached a terminal status. Entries still
    /// in flight stay. Returns how many were removed.
    pub async fn remove_terminal(&self, ids: &[Uuid]) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|e| !(ids.contains(&e.id) && e.status.is_terminal()));
        before - entries.len()
    }
}

/// Write access to one entry on the board.
#[derive(Clone)]
pub struct ProgressHandle {
    board: ProgressBoard,
    id: Uuid,
}

impl ProgressHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn advance(&self, status: UploadStatus, progress: u8) -> bool {
        self.board
            .update(self.id, |e| e.advance(status, progress))
            .await
    }

    pub async fn attach_document(&self, document_id: Uuid) {
        self.board
            .update(self.id, |e| {
                e.document_id = Some(document_id);
                true
            })
            .await;
    }

    pub async fn complete(&self) -> bool {
        self.board.update(self.id, |e| e.complete()).await
    }

    pub async fn fail(&self, message: impl Into<String>) -> bool {
        let message = message.into();
        self.board.update(self.id, |e| e.fail(message)).await
    }

    pub async fn current(&self) -> Option<UploadProgress> {
        self.board.get(self.id).await
    }
}

//=========================================================================================
// Batch Completion
//=========================================================================================

/// The terminal state of every entry in a finished batch.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub entries: Vec<UploadProgress>,
}

impl BatchSummary {
    pub fn completed(&self) -> usize {
        self.count(UploadStatus::Completed)
    }

    pub fn failed(&self) -> usize {
        self.count(UploadStatus::Error)
    }

    fn count(&self, status: UploadStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }
}

/// Notified once every file of a batch has reached a terminal status.
#[async_trait]
pub trait BatchObserver: Send + Sync {
    async fn on_batch_complete(&self, summary: &BatchSummary);
}

//=========================================================================================
// The Queue Controller
//=========================================================================================

#[derive(Debug, Clone, Copy)]
pub struct QueueSettings {
    pub max_file_bytes: usize,
    /// How long finished entries stay visible.
    pub removal_delay: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            removal_delay: DEFAULT_REMOVAL_DELAY,
        }
    }
}

pub struct UploadQueue {
    ingestion: Arc<dyn DocumentIngestion>,
    settings: QueueSettings,
    board: ProgressBoard,
    observers: Vec<Arc<dyn BatchObserver>>,
    /// Held for a whole batch so files never run in parallel, even across submissions.
    run_lock: Mutex<()>,
}

impl UploadQueue {
    pub fn new(ingestion: Arc<dyn DocumentIngestion>, settings: QueueSettings) -> Self {
        Self {
            ingestion,
            settings,
            board: ProgressBoard::default(),
            observers: Vec::new(),
            run_lock: Mutex::new(()),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    pub fn board(&self) -> &ProgressBoard {
        &self.board
    }

    pub async fn snapshot(&self) -> Vec<UploadProgress> {
        self.board.snapshot().await
    }

    /// Enqueues the files and processes them on a background task. Returns the
    /// freshly created entries.
    pub async fn submit(self: &Arc<Self>, files: Vec<IncomingFile>) -> Vec<UploadProgress> {
        let entries = self.enqueue(&files).await;
        let ids = entries.iter().map(|e| e.id).collect();
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            queue.process(files, ids).await;
        });
        entries
    }

    /// Enqueues the files and processes them before returning.
    pub async fn run_batch(&self, files: Vec<IncomingFile>) -> BatchSummary {
        let ids = self
            .enqueue(&files)
            .await
            .into_iter()
            .map(|e| e.id)
            .collect();
        self.process(files, ids).await
    }

    async fn enqueue(&self, files: &[IncomingFile]) -> Vec<UploadProgress> {
        let mut created = Vec::with_capacity(files.len());
        for file in files {
            let entry = UploadProgress::new(file.name.clone());
            self.board.push(entry.clone()).await;
            created.push(entry);
        }
        created
    }

    async fn process(&self, files: Vec<IncomingFile>, ids: Vec<Uuid>) -> BatchSummary {
        let _running = self.run_lock.lock().await;
        info!(
            files = files.len(),
            mode = %self.ingestion.mode(),
            "Processing upload batch"
        );

        for (file, id) in files.iter().zip(ids.iter()) {
            self.process_file(file, self.board.handle(*id)).await;
        }

        let mut entries = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(entry) = self.board.get(*id).await {
                entries.push(entry);
            }
        }
        let summary = BatchSummary { entries };
        info!(
            completed = summary.completed(),
            failed = summary.failed(),
            "Upload batch finished"
        );

        for observer in &self.observers {
            observer.on_batch_complete(&summary).await;
        }
        self.schedule_removal(ids);
        summary
    }

    /// Runs one file to a terminal status. Errors stay with the file.
    async fn process_file(&self, file: &IncomingFile, progress: ProgressHandle) {
        let result = match validate_file(file, self.settings.max_file_bytes) {
            Ok(file_type) => self.ingestion.ingest(file, file_type, &progress).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(report) => {
                info!(
                    file = %file.name,
                    rows = report.rows_extracted,
                    "File processed"
                );
                progress.complete().await;
            }
            Err(e) => {
                warn!(file = %file.name, "File failed: {}", e);
                progress.fail(e.to_string()).await;
            }
        }
    }

    fn schedule_removal(&self, ids: Vec<Uuid>) {
        let board = self.board.clone();
        let delay = self.settings.removal_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            board.remove_terminal(&ids).await;
        });
    }
}
