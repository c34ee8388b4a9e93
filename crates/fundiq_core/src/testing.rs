//! In-memory fakes of the ports, shared by the unit tests.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    sort_anomalies, Anomaly, Document, DocumentStatus, ExtractedRow, FileType, IncomingFile, NewDocument, ParseOutcome,
    ParseRequest, StatusUpdate, StoredObject, UserContext,
};
use crate::ports::{DocumentStore, ObjectStorage, ParsingGateway, PortError, PortResult};

#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<Vec<Document>>,
    rows: Mutex<Vec<ExtractedRow>>,
    anomalies: Mutex<Vec<Anomaly>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> PortResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(PortError::Unexpected("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    pub async fn seed_document(&self, user: &UserContext, file_name: &str) -> Document {
        let file_type = FileType::from_file_name(file_name).unwrap_or(FileType::Csv);
        self.create_document(
            user,
            NewDocument {
                file_name: file_name.to_string(),
                file_type,
                file_url: None,
            },
        )
        .await
        .expect("seed document")
    }

    /// Stores rows with contiguous indexes, the way the parser writes them.
    pub async fn seed_rows(&self, document_id: Uuid, rows: Vec<Value>) {
        let mut stored = self.rows.lock().await;
        for (idx, value) in rows.into_iter().enumerate() {
            let raw_json = match value {
                Value::Object(map) => map,
                other => {
                    let mut map = Map::new();
                    map.insert("value".to_string(), other);
                    map
                }
            };
            stored.push(ExtractedRow {
                id: Uuid::new_v4(),
                document_id,
                row_index: idx as i64,
                raw_json,
                created_at: Utc::now(),
            });
        }
    }

    /// Stores anomalies and bumps the document's count, the way the parser does.
    pub async fn seed_anomalies(&self, document_id: Uuid, anomalies: Vec<Anomaly>) {
        let added = anomalies.len() as i64;
        self.anomalies.lock().await.extend(anomalies);
        if let Some(doc) = self
            .documents
            .lock()
            .await
            .iter_mut()
            .find(|d| d.id == document_id)
        {
            doc.anomalies_count += added;
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_document(
        &self,
        user: &UserContext,
        new_doc: NewDocument,
    ) -> PortResult<Document> {
        self.check()?;
        let now = Utc::now();
        let doc = Document {
            id: Uuid::new_v4(),
            user_id: user.user_id,
            file_name: new_doc.file_name,
            file_type: new_doc.file_type,
            file_url: new_doc.file_url,
            format_detected: None,
            upload_date: now,
            status: DocumentStatus::Uploaded,
            rows_count: 0,
            anomalies_count: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        self.documents.lock().await.push(doc.clone());
        Ok(doc)
    }

    async fn get_document(&self, document_id: Uuid) -> PortResult<Document> {
        self.check()?;
        self.documents
            .lock()
            .await
            .iter()
            .find(|d| d.id == document_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", document_id)))
    }

    async fn update_document_status(
        &self,
        document_id: Uuid,
        update: StatusUpdate,
    ) -> PortResult<Document> {
        self.check()?;
        let mut docs = self.documents.lock().await;
        let doc = docs
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", document_id)))?;
        if !doc.status.can_transition_to(update.status) {
            return Err(PortError::InvalidTransition(format!(
                "{} -> {}",
                doc.status, update.status
            )));
        }
        doc.status = update.status;
        if update.status == DocumentStatus::Completed {
            doc.rows_count = update.rows_count.unwrap_or(0);
        }
        if update.error_message.is_some() {
            doc.error_message = update.error_message;
        }
        doc.updated_at = Utc::now();
        Ok(doc.clone())
    }

    async fn list_documents(&self, user: &UserContext) -> PortResult<Vec<Document>> {
        self.check()?;
        let mut docs: Vec<Document> = self
            .documents
            .lock()
            .await
            .iter()
            .filter(|d| d.user_id == user.user_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        Ok(docs)
    }

    async fn list_extracted_rows(&self, document_id: Uuid) -> PortResult<Vec<ExtractedRow>> {
        self.check()?;
        let mut rows: Vec<ExtractedRow> = self
            .rows
            .lock()
            .await
            .iter()
            .filter(|r| r.document_id == document_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.row_index);
        Ok(rows)
    }

    async fn list_anomalies(&self, document_id: Uuid) -> PortResult<Vec<Anomaly>> {
        self.check()?;
        let mut found: Vec<Anomaly> = self
            .anomalies
            .lock()
            .await
            .iter()
            .filter(|a| a.document_id == document_id)
            .cloned()
            .collect();
        sort_anomalies(&mut found);
        Ok(found)
    }

    async fn delete_document(&self, document_id: Uuid) -> PortResult<()> {
        self.check()?;
        self.documents.lock().await.retain(|d| d.id != document_id);
        self.rows.lock().await.retain(|r| r.document_id != document_id);
        self.anomalies
            .lock()
            .await
            .retain(|a| a.document_id != document_id);
        Ok(())
    }

    async fn ping(&self) -> PortResult<()> {
        self.check()
    }
}

#[derive(Default)]
pub struct FakeStorage {
    failure: Option<String>,
    uploads: Mutex<Vec<String>>,
}

impl FakeStorage {
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            uploads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(&self, user: &UserContext, file: &IncomingFile) -> PortResult<StoredObject> {
        if let Some(message) = &self.failure {
            return Err(PortError::Unexpected(message.clone()));
        }
        self.uploads.lock().await.push(file.name.clone());
        let path = format!("{}/{}", user.user_id, file.name);
        Ok(StoredObject {
            url: format!("https://storage.test/{}", path),
            path,
        })
    }
}

pub struct FakeGateway {
    outcome: Result<ParseOutcome, String>,
    uploads: Mutex<Vec<String>>,
    references: Mutex<Vec<ParseRequest>>,
}

impl FakeGateway {
    pub fn responding(outcome: ParseOutcome) -> Self {
        Self {
            outcome: Ok(outcome),
            uploads: Mutex::new(Vec::new()),
            references: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding(rows: i64) -> Self {
        Self::responding(ParseOutcome {
            success: true,
            rows_extracted: Some(rows),
            error: None,
        })
    }

    pub fn erroring(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            uploads: Mutex::new(Vec::new()),
            references: Mutex::new(Vec::new()),
        }
    }

    pub async fn uploads(&self) -> Vec<String> {
        self.uploads.lock().await.clone()
    }

    pub async fn references(&self) -> Vec<ParseRequest> {
        self.references.lock().await.clone()
    }

    fn respond(&self) -> PortResult<ParseOutcome> {
        self.outcome.clone().map_err(PortError::Unexpected)
    }
}

#[async_trait]
impl ParsingGateway for FakeGateway {
    async fn parse_upload(&self, file: &IncomingFile) -> PortResult<ParseOutcome> {
        self.uploads.lock().await.push(file.name.clone());
        self.respond()
    }

    async fn parse_reference(&self, request: &ParseRequest) -> PortResult<ParseOutcome> {
        self.references.lock().await.push(request.clone());
        self.respond()
    }
}
