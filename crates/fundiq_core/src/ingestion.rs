//! crates/fundiq_core/src/ingestion.rs
//!
//! The "document ingestion" capability: how one validated file gets from raw
//! bytes to parsed rows. Two implementations exist, chosen once at startup:
//! local-first (bytes go straight to the parsing gateway) and cloud-storage
//! (bytes go to object storage, a document record tracks the parse).

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{
    FileType, IncomingFile, NewDocument, ParseOutcome, ParseRequest, StatusUpdate, UploadStatus,
    UserContext,
};
use crate::ports::{DocumentStore, ObjectStorage, ParsingGateway, PortError};
use crate::queue::ProgressHandle;

/// Shown when the gateway reports a failure without saying why.
pub const GENERIC_PARSE_FAILURE: &str = "Document parsing failed";

//=========================================================================================
// Upload Error Taxonomy
//=========================================================================================

/// Everything that can go wrong with a single file. Caught per file by the queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("Unsupported file type: {0}. Accepted types are PDF, CSV and XLSX")]
    UnsupportedFileType(String),
    #[error("{name} is {size} bytes, which exceeds the {limit} byte limit")]
    FileTooLarge {
        name: String,
        size: usize,
        limit: usize,
    },
    #[error("Upload failed: {0}")]
    Upload(String),
    /// Carries the gateway's own message so it reaches the user verbatim.
    #[error("{0}")]
    Parse(String),
    #[error("Status update failed: {0}")]
    StatusUpdate(String),
}

/// Checks a file against the accepted types and the size limit, before any network call.
pub fn validate_file(file: &IncomingFile, max_bytes: usize) -> Result<FileType, UploadError> {
    let file_type = FileType::from_file_name(&file.name)
        .ok_or_else(|| UploadError::UnsupportedFileType(file.name.clone()))?;
    if file.size() > max_bytes {
        return Err(UploadError::FileTooLarge {
            name: file.name.clone(),
            size: file.size(),
            limit: max_bytes,
        });
    }
    Ok(file_type)
}

/// Turns a gateway response into a row count, or the most specific failure message.
fn interpret_outcome(outcome: ParseOutcome) -> Result<i64, UploadError> {
    if outcome.success {
        Ok(outcome.rows_extracted.unwrap_or(0))
    } else {
        let message = outcome
            .error
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| GENERIC_PARSE_FAILURE.to_string());
        Err(UploadError::Parse(message))
    }
}

fn parse_failure(e: PortError) -> UploadError {
    UploadError::Parse(e.detail().to_string())
}

//=========================================================================================
// The Ingestion Port
//=========================================================================================

/// Which ingestion implementation the deployment runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionMode {
    LocalFirst,
    CloudStorage,
}

impl fmt::Display for IngestionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestionMode::LocalFirst => f.write_str("local"),
            IngestionMode::CloudStorage => f.write_str("cloud"),
        }
    }
}

impl FromStr for IngestionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "local-first" => Ok(IngestionMode::LocalFirst),
            "cloud" | "cloud-storage" => Ok(IngestionMode::CloudStorage),
            other => Err(format!("'{}' is not one of: local, cloud", other)),
        }
    }
}

/// What a successful ingestion produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub document_id: Option<Uuid>,
    pub rows_extracted: i64,
}

#[async_trait]
pub trait DocumentIngestion: Send + Sync {
    fn mode(&self) -> IngestionMode;

    /// Drives one validated file through upload and parsing, reporting progress
    /// along the way. The caller marks the entry completed or failed afterwards.
    async fn ingest(
        &self,
        file: &IncomingFile,
        file_type: FileType,
        progress: &ProgressHandle,
    ) -> Result<IngestReport, UploadError>;
}

//=========================================================================================
// Local-first
//=========================================================================================

/// Sends raw bytes to the gateway in one multipart request. No record is created
/// up front, so progress moves in coarse steps.
pub struct LocalFirstIngestion {
    gateway: Arc<dyn ParsingGateway>,
}

impl LocalFirstIngestion {
    pub fn new(gateway: Arc<dyn ParsingGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl DocumentIngestion for LocalFirstIngestion {
    fn mode(&self) -> IngestionMode {
        IngestionMode::LocalFirst
    }

    async fn ingest(
        &self,
        file: &IncomingFile,
        _file_type: FileType,
        progress: &ProgressHandle,
    ) -> Result<IngestReport, UploadError> {
        progress.advance(UploadStatus::Uploading, 20).await;

        let outcome = self
            .gateway
            .parse_upload(file)
            .await
            .map_err(parse_failure)?;
        progress.advance(UploadStatus::Processing, 50).await;

        let rows_extracted = interpret_outcome(outcome)?;
        Ok(IngestReport {
            document_id: None,
            rows_extracted,
        })
    }
}

//=========================================================================================
// Cloud-storage
//=========================================================================================

/// Stores the bytes remotely, registers a document record, and asks the gateway
/// to parse the stored copy while keeping the record's status in step.
pub struct CloudStorageIngestion {
    user: UserContext,
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn ObjectStorage>,
    gateway: Arc<dyn ParsingGateway>,
}

impl CloudStorageIngestion {
    pub fn new(
        user: UserContext,
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn ObjectStorage>,
        gateway: Arc<dyn ParsingGateway>,
    ) -> Self {
        Self {
            user,
            store,
            storage,
            gateway,
        }
    }

    /// Records the failure on the document. If that write fails too, the parse
    /// message still wins; the store error is only logged.
    async fn mark_failed(&self, document_id: Uuid, message: &str) {
        if let Err(e) = self
            .store
            .update_document_status(document_id, StatusUpdate::failed(message))
            .await
        {
            error!(%document_id, "Failed to mark document as failed: {}", e);
        }
    }
}

#[async_trait]
impl DocumentIngestion for CloudStorageIngestion {
    fn mode(&self) -> IngestionMode {
        IngestionMode::CloudStorage
    }

    async fn ingest(
        &self,
        file: &IncomingFile,
        file_type: FileType,
        progress: &ProgressHandle,
    ) -> Result<IngestReport, UploadError> {
        let stored = self
            .storage
            .upload(&self.user, file)
            .await
            .map_err(|e| UploadError::Upload(e.detail().to_string()))?;
        progress.advance(UploadStatus::Uploading, 30).await;

        let document = self
            .store
            .create_document(
                &self.user,
                NewDocument {
                    file_name: file.name.clone(),
                    file_type,
                    file_url: Some(stored.url.clone()),
                },
            )
            .await
            .map_err(|e| UploadError::Upload(e.detail().to_string()))?;
        progress.attach_document(document.id).await;
        progress.advance(UploadStatus::Uploading, 50).await;
        info!(document_id = %document.id, path = %stored.path, "Document record created");

        if let Err(e) = self
            .store
            .update_document_status(document.id, StatusUpdate::processing())
            .await
        {
            let message = e.detail().to_string();
            self.mark_failed(document.id, &message).await;
            return Err(UploadError::StatusUpdate(message));
        }
        progress.advance(UploadStatus::Processing, 70).await;

        let request = ParseRequest {
            document_id: document.id,
            file_url: stored.url,
            file_type,
        };
        let parsed = match self.gateway.parse_reference(&request).await {
            Ok(outcome) => interpret_outcome(outcome),
            Err(e) => Err(parse_failure(e)),
        };
        let rows_extracted = match parsed {
            Ok(rows) => rows,
            Err(err) => {
                self.mark_failed(document.id, &err.to_string()).await;
                return Err(err);
            }
        };

        self.store
            .update_document_status(document.id, StatusUpdate::completed(rows_extracted))
            .await
            .map_err(|e| UploadError::StatusUpdate(e.detail().to_string()))?;

        Ok(IngestReport {
            document_id: Some(document.id),
            rows_extracted,
        })
    }
}
