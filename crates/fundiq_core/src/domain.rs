//! crates/fundiq_core/src/domain.rs
//!
//! Defines the core data structures for the application: uploaded documents,
//! the rows extracted from them, and the ephemeral per-file upload progress.
//! These structs are independent of any database or transport.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Identity
//=========================================================================================

/// The identity every data-access call is made on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: Uuid,
}

impl UserContext {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

//=========================================================================================
// File Types
//=========================================================================================

/// The kinds of document the parsing gateway understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Csv,
    Xlsx,
}

impl FileType {
    pub const ALL: [FileType; 3] = [FileType::Pdf, FileType::Csv, FileType::Xlsx];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Csv => "csv",
            FileType::Xlsx => "xlsx",
        }
    }

    /// Maps a file name to its type by extension, case-insensitively.
    ///
    /// Legacy `.xls` workbooks are accepted and treated as spreadsheets.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, ext) = file_name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(FileType::Pdf),
            "csv" => Some(FileType::Csv),
            "xlsx" | "xls" => Some(FileType::Xlsx),
            _ => None,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(FileType::Pdf),
            "csv" => Ok(FileType::Csv),
            "xlsx" => Ok(FileType::Xlsx),
            other => Err(format!("unknown file type '{}'", other)),
        }
    }
}

//=========================================================================================
// Documents
//=========================================================================================

/// Lifecycle of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Failed)
    }

    /// Status only moves forward: uploaded -> processing -> {completed | failed}.
    /// A document may also fail straight from `uploaded`.
    pub fn can_transition_to(&self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        matches!(
            (self, next),
            (Uploaded, Processing) | (Uploaded, Failed) | (Processing, Completed) | (Processing, Failed)
        )
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(DocumentStatus::Uploaded),
            "processing" => Ok(DocumentStatus::Processing),
            "completed" => Ok(DocumentStatus::Completed),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(format!("unknown document status '{}'", other)),
        }
    }
}

/// One uploaded file and where it is in the parsing lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub file_type: FileType,
    pub file_url: Option<String>,
    pub format_detected: Option<String>,
    pub upload_date: DateTime<Utc>,
    pub status: DocumentStatus,
    pub rows_count: i64,
    /// Written by the parsing service alongside the anomaly records.
    pub anomalies_count: i64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fields needed to register a freshly uploaded file.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub file_name: String,
    pub file_type: FileType,
    pub file_url: Option<String>,
}

/// A status change requested for a document.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: DocumentStatus,
    pub rows_count: Option<i64>,
    pub error_message: Option<String>,
}

impl StatusUpdate {
    pub fn processing() -> Self {
        Self {
            status: DocumentStatus::Processing,
            rows_count: None,
            error_message: None,
        }
    }

    pub fn completed(rows_count: i64) -> Self {
        Self {
            status: DocumentStatus::Completed,
            rows_count: Some(rows_count),
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: DocumentStatus::Failed,
            rows_count: None,
            error_message: Some(message.into()),
        }
    }
}

/// A single structured record parsed out of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRow {
    pub id: Uuid,
    pub document_id: Uuid,
    pub row_index: i64,
    pub raw_json: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Anomalies
//=========================================================================================

/// How serious a flagged anomaly is. Ordered low < medium < high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
}

impl AnomalySeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalySeverity::Low => "low",
            AnomalySeverity::Medium => "medium",
            AnomalySeverity::High => "high",
        }
    }
}

impl fmt::Display for AnomalySeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnomalySeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(AnomalySeverity::Low),
            "medium" => Ok(AnomalySeverity::Medium),
            "high" => Ok(AnomalySeverity::High),
            other => Err(format!("unknown anomaly severity '{}'", other)),
        }
    }
}

/// Something the parsing service flagged in a document, optionally tied to a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: Uuid,
    pub document_id: Uuid,
    pub row_index: Option<i64>,
    pub anomaly_type: String,
    pub severity: AnomalySeverity,
    pub description: String,
    pub raw_json: Option<Value>,
    pub evidence: Option<Value>,
    pub detected_at: DateTime<Utc>,
}

/// Most severe first, then most recently detected.
pub fn sort_anomalies(anomalies: &mut [Anomaly]) {
    anomalies.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.detected_at.cmp(&a.detected_at))
    });
}

//=========================================================================================
// Storage and Parsing
//=========================================================================================

/// Where an uploaded file landed in object storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
    pub url: String,
}

/// A file handed to the upload queue.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub bytes: Bytes,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// The body of a URL-reference parse request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseRequest {
    pub document_id: Uuid,
    pub file_url: String,
    pub file_type: FileType,
}

/// The parsing gateway's answer, in both modes.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ParseOutcome {
    pub success: bool,
    #[serde(default)]
    pub rows_extracted: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

//=========================================================================================
// Upload Progress
//=========================================================================================

/// Where a single queued file is in its upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploading,
    Processing,
    Completed,
    Error,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Uploading => "uploading",
            UploadStatus::Processing => "processing",
            UploadStatus::Completed => "completed",
            UploadStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Completed | UploadStatus::Error)
    }

    fn rank(&self) -> u8 {
        match self {
            UploadStatus::Uploading => 0,
            UploadStatus::Processing => 1,
            UploadStatus::Completed | UploadStatus::Error => 2,
        }
    }
}

/// Client-side progress for one file in the current batch. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadProgress {
    pub id: Uuid,
    pub file_name: String,
    pub progress: u8,
    pub status: UploadStatus,
    pub error: Option<String>,
    pub document_id: Option<Uuid>,
}

impl UploadProgress {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            progress: 0,
            status: UploadStatus::Uploading,
            error: None,
            document_id: None,
        }
    }

    /// Moves the entry forward. Returns false, leaving the entry untouched, if the
    /// entry is already terminal or the move would go backward.
    pub fn advance(&mut self, status: UploadStatus, progress: u8) -> bool {
        if self.status.is_terminal() || status.rank() < self.status.rank() {
            return false;
        }
        self.status = status;
        self.progress = progress.min(100).max(self.progress);
        true
    }

    pub fn complete(&mut self) -> bool {
        self.advance(UploadStatus::Completed, 100)
    }

    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = UploadStatus::Error;
        self.error = Some(message.into());
        true
    }
}
