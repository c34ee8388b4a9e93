//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the browser client and the API
//! server, with their OpenAPI schemas.

use chrono::{DateTime, Utc};
use fundiq_core::domain::{Anomaly, Document, UploadProgress};
use fundiq_core::review::{SortDirection, ViewMode};
use fundiq_core::ExportFormat;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Responses
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub service: String,
    pub version: String,
    pub ingestion_mode: String,
    pub database: String,
    pub accepted_types: Vec<String>,
}

/// A stored document as shown in the document list.
#[derive(Serialize, ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    /// One of `pdf`, `csv`, `xlsx`.
    pub file_type: String,
    pub file_url: Option<String>,
    pub format_detected: Option<String>,
    pub upload_date: DateTime<Utc>,
    /// One of `uploaded`, `processing`, `completed`, `failed`.
    pub status: String,
    pub rows_count: i64,
    pub anomalies_count: i64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            user_id: doc.user_id,
            file_name: doc.file_name,
            file_type: doc.file_type.to_string(),
            file_url: doc.file_url,
            format_detected: doc.format_detected,
            upload_date: doc.upload_date,
            status: doc.status.to_string(),
            rows_count: doc.rows_count,
            anomalies_count: doc.anomalies_count,
            error_message: doc.error_message,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

/// The document list and whether it could be loaded.
#[derive(Serialize, ToSchema)]
pub struct DocumentListResponse {
    /// One of `loading`, `loaded`, `error`.
    pub state: String,
    pub documents: Vec<DocumentResponse>,
    pub error: Option<String>,
}

/// An anomaly the parsing service flagged in a document.
#[derive(Serialize, ToSchema)]
pub struct AnomalyResponse {
    pub id: Uuid,
    pub row_index: Option<i64>,
    pub anomaly_type: String,
    /// One of `low`, `medium`, `high`.
    pub severity: String,
    pub description: String,
    #[schema(value_type = Option<Object>)]
    pub raw_json: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub evidence: Option<serde_json::Value>,
    pub detected_at: DateTime<Utc>,
}

impl From<Anomaly> for AnomalyResponse {
    fn from(anomaly: Anomaly) -> Self {
        Self {
            id: anomaly.id,
            row_index: anomaly.row_index,
            anomaly_type: anomaly.anomaly_type,
            severity: anomaly.severity.to_string(),
            description: anomaly.description,
            raw_json: anomaly.raw_json,
            evidence: anomaly.evidence,
            detected_at: anomaly.detected_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AnomalyListResponse {
    pub document_id: Uuid,
    pub anomalies: Vec<AnomalyResponse>,
}

/// One file's place in the current upload batch.
#[derive(Serialize, ToSchema)]
pub struct UploadProgressResponse {
    pub id: Uuid,
    pub file_name: String,
    pub progress: u8,
    /// One of `uploading`, `processing`, `completed`, `error`.
    pub status: String,
    pub error: Option<String>,
    pub document_id: Option<Uuid>,
}

impl From<UploadProgress> for UploadProgressResponse {
    fn from(entry: UploadProgress) -> Self {
        Self {
            id: entry.id,
            file_name: entry.file_name,
            progress: entry.progress,
            status: entry.status.as_str().to_string(),
            error: entry.error,
            document_id: entry.document_id,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UploadQueueResponse {
    pub entries: Vec<UploadProgressResponse>,
}

//=========================================================================================
// Query Parameters
//=========================================================================================

/// Search, sort, page and view options for the review surface.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ReviewQuery {
    /// Case-insensitive substring matched against every field.
    pub search: Option<String>,
    /// Column to sort by.
    pub sort: Option<String>,
    /// `asc` (default) or `desc`.
    #[param(value_type = Option<String>)]
    pub direction: Option<SortDirection>,
    /// 1-based page number; clamped to the available pages.
    pub page: Option<usize>,
    /// `table` (default) or `raw`.
    #[param(value_type = Option<String>)]
    pub view: Option<ViewMode>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ExportQuery {
    /// `csv` (default) or `json`.
    #[serde(default)]
    #[param(value_type = Option<String>)]
    pub format: ExportFormat,
}
