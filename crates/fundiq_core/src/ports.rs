//! crates/fundiq_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete database, object store and parsing service.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Anomaly, Document, ExtractedRow, IncomingFile, NewDocument, ParseOutcome, ParseRequest, StatusUpdate,
    StoredObject, UserContext,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// The message without the variant prefix, for surfacing to users.
    pub fn detail(&self) -> &str {
        match self {
            PortError::NotFound(m)
            | PortError::Timeout(m)
            | PortError::InvalidTransition(m)
            | PortError::Unexpected(m) => m,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Document metadata and extracted rows held by the remote relational store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_document(&self, user: &UserContext, new_doc: NewDocument)
        -> PortResult<Document>;

    async fn get_document(&self, document_id: Uuid) -> PortResult<Document>;

    /// Applies a forward-only status change and returns the updated document.
    async fn update_document_status(
        &self,
        document_id: Uuid,
        update: StatusUpdate,
    ) -> PortResult<Document>;

    /// All documents owned by the user, newest upload first.
    async fn list_documents(&self, user: &UserContext) -> PortResult<Vec<Document>>;

    /// All rows of a document, ordered by `row_index` ascending.
    async fn list_extracted_rows(&self, document_id: Uuid) -> PortResult<Vec<ExtractedRow>>;

    /// Anomalies flagged for a document, most severe first, then newest.
    async fn list_anomalies(&self, document_id: Uuid) -> PortResult<Vec<Anomaly>>;

    /// Deletes a document together with its extracted rows and anomalies.
    async fn delete_document(&self, document_id: Uuid) -> PortResult<()>;

    /// Cheap connectivity probe used by the health endpoint.
    async fn ping(&self) -> PortResult<()>;
}

/// Raw file bytes held by the remote object store.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, user: &UserContext, file: &IncomingFile) -> PortResult<StoredObject>;
}

/// The external service that turns documents into rows.
#[async_trait]
pub trait ParsingGateway: Send + Sync {
    /// Sends the raw file in one multipart request (local-first mode).
    async fn parse_upload(&self, file: &IncomingFile) -> PortResult<ParseOutcome>;

    /// Asks the gateway to fetch and parse an already stored file (cloud-storage mode).
    async fn parse_reference(&self, request: &ParseRequest) -> PortResult<ParseOutcome>;
}
