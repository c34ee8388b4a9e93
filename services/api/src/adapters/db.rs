//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DocumentStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fundiq_core::domain::{
    Anomaly, Document, DocumentStatus, ExtractedRow, NewDocument, StatusUpdate, UserContext,
};
use fundiq_core::ports::{DocumentStore, PortError, PortResult};
use serde_json::{Map, Value};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const DOCUMENT_COLUMNS: &str = "id, user_id, file_name, file_type, file_url, format_detected, \
     upload_date, status, rows_count, anomalies_count, error_message, created_at, updated_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DocumentStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(document_id: Uuid) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::RowNotFound => {
            PortError::NotFound(format!("Document {} not found", document_id))
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    user_id: Uuid,
    file_name: String,
    file_type: String,
    file_url: Option<String>,
    format_detected: Option<String>,
    upload_date: DateTime<Utc>,
    status: String,
    rows_count: i64,
    anomalies_count: i64,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl DocumentRecord {
    fn to_domain(self) -> PortResult<Document> {
        Ok(Document {
            id: self.id,
            user_id: self.user_id,
            file_name: self.file_name,
            file_type: self.file_type.parse().map_err(PortError::Unexpected)?,
            file_url: self.file_url,
            format_detected: self.format_detected,
            upload_date: self.upload_date,
            status: self.status.parse().map_err(PortError::Unexpected)?,
            rows_count: self.rows_count,
            anomalies_count: self.anomalies_count,
            error_message: self.error_message,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ExtractedRowRecord {
    id: Uuid,
    document_id: Uuid,
    row_index: i32,
    raw_json: Value,
    created_at: DateTime<Utc>,
}
impl ExtractedRowRecord {
    fn to_domain(self) -> ExtractedRow {
        let raw_json = match self.raw_json {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        ExtractedRow {
            id: self.id,
            document_id: self.document_id,
            row_index: i64::from(self.row_index),
            raw_json,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct AnomalyRecord {
    id: Uuid,
    document_id: Uuid,
    row_index: Option<i32>,
    anomaly_type: String,
    severity: String,
    description: String,
    raw_json: Option<Value>,
    evidence: Option<Value>,
    detected_at: DateTime<Utc>,
}
impl AnomalyRecord {
    fn to_domain(self) -> PortResult<Anomaly> {
        Ok(Anomaly {
            id: self.id,
            document_id: self.document_id,
            row_index: self.row_index.map(i64::from),
            anomaly_type: self.anomaly_type,
            severity: self.severity.parse().map_err(PortError::Unexpected)?,
            description: self.description,
            raw_json: self.raw_json,
            evidence: self.evidence,
            detected_at: self.detected_at,
        })
    }
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for DbAdapter {
    async fn create_document(
        &self,
        user: &UserContext,
        new_doc: NewDocument,
    ) -> PortResult<Document> {
        let record = sqlx::query_as::<_, DocumentRecord>(&format!(
            "INSERT INTO documents (id, user_id, file_name, file_type, file_url, status) \
             VALUES ($1, $2, $3, $4, $5, 'uploaded') RETURNING {}",
            DOCUMENT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(user.user_id)
        .bind(&new_doc.file_name)
        .bind(new_doc.file_type.as_str())
        .bind(&new_doc.file_url)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_document(&self, document_id: Uuid) -> PortResult<Document> {
        let record = sqlx::query_as::<_, DocumentRecord>(&format!(
            "SELECT {} FROM documents WHERE id = $1",
            DOCUMENT_COLUMNS
        ))
        .bind(document_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(document_id))?;
        record.to_domain()
    }

    async fn update_document_status(
        &self,
        document_id: Uuid,
        update: StatusUpdate,
    ) -> PortResult<Document> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let current: String =
            sqlx::query_scalar("SELECT status FROM documents WHERE id = $1 FOR UPDATE")
                .bind(document_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(not_found_or_unexpected(document_id))?;
        let current: DocumentStatus = current.parse().map_err(PortError::Unexpected)?;
        if !current.can_transition_to(update.status) {
            return Err(PortError::InvalidTransition(format!(
                "document {} cannot move from {} to {}",
                document_id, current, update.status
            )));
        }

        // Row counts only land together with a completed status.
        let rows_count = match update.status {
            DocumentStatus::Completed => update.rows_count,
            _ => None,
        };
        let record = sqlx::query_as::<_, DocumentRecord>(&format!(
            "UPDATE documents SET status = $1, rows_count = COALESCE($2, rows_count), \
             error_message = COALESCE($3, error_message), updated_at = NOW() \
             WHERE id = $4 RETURNING {}",
            DOCUMENT_COLUMNS
        ))
        .bind(update.status.as_str())
        .bind(rows_count)
        .bind(&update.error_message)
        .bind(document_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }

    async fn list_documents(&self, user: &UserContext) -> PortResult<Vec<Document>> {
        let records = sqlx::query_as::<_, DocumentRecord>(&format!(
            "SELECT {} FROM documents WHERE user_id = $1 ORDER BY upload_date DESC",
            DOCUMENT_COLUMNS
        ))
        .bind(user.user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn list_extracted_rows(&self, document_id: Uuid) -> PortResult<Vec<ExtractedRow>> {
        let records = sqlx::query_as::<_, ExtractedRowRecord>(
            "SELECT id, document_id, row_index, raw_json, created_at FROM extracted_rows \
             WHERE document_id = $1 ORDER BY row_index ASC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let rows = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(rows)
    }

    async fn list_anomalies(&self, document_id: Uuid) -> PortResult<Vec<Anomaly>> {
        let records = sqlx::query_as::<_, AnomalyRecord>(
            "SELECT id, document_id, row_index, anomaly_type, severity, description, \
             raw_json, evidence, detected_at FROM anomalies WHERE document_id = $1 \
             ORDER BY CASE severity WHEN 'high' THEN 3 WHEN 'medium' THEN 2 ELSE 1 END DESC, \
             detected_at DESC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn delete_document(&self, document_id: Uuid) -> PortResult<()> {
        // extracted_rows and anomalies cascade on their foreign keys.
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Document {} not found",
                document_id
            )));
        }
        Ok(())
    }

    async fn ping(&self) -> PortResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
