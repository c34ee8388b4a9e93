//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the upload and document endpoints and the
//! master definition for the OpenAPI specification.

use crate::web::protocol::{
    AnomalyListResponse, AnomalyResponse, DocumentListResponse, DocumentResponse, HealthResponse,
    UploadProgressResponse, UploadQueueResponse,
};
use crate::web::review::{self, ReviewResponse};
use crate::web::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use fundiq_core::domain::{FileType, IncomingFile};
use fundiq_core::ports::PortError;
use fundiq_core::ListState;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        upload_handler,
        list_uploads_handler,
        list_documents_handler,
        get_document_handler,
        delete_document_handler,
        review::review_rows_handler,
        review::export_handler,
        review::anomalies_handler,
    ),
    components(
        schemas(
            HealthResponse,
            DocumentResponse,
            DocumentListResponse,
            UploadProgressResponse,
            UploadQueueResponse,
            ReviewResponse,
            AnomalyResponse,
            AnomalyListResponse,
        )
    ),
    tags(
        (name = "FundIQ API", description = "Upload financial documents, track parsing, review and export extracted rows.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Maps a port failure onto the HTTP status the client should see.
pub fn port_error_response(e: PortError) -> (StatusCode, String) {
    let status = match &e {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        PortError::InvalidTransition(_) => StatusCode::CONFLICT,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Request failed: {:?}", e);
    }
    (status, e.detail().to_string())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Service and database health.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match state.db.ping().await {
        Ok(()) => "connected".to_string(),
        Err(e) => {
            warn!("Database health check failed: {}", e);
            format!("error: {}", e.detail())
        }
    };

    Json(HealthResponse {
        service: "FundIQ API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ingestion_mode: state.config.ingestion_mode.to_string(),
        database,
        accepted_types: FileType::ALL.iter().map(|t| t.to_string()).collect(),
    })
}

/// Upload one or more documents for parsing.
///
/// Accepts a multipart/form-data request with one file part per document. Files
/// are processed one at a time in the background; poll `GET /uploads` for progress.
#[utoipa::path(
    post,
    path = "/uploads",
    request_body(content_type = "multipart/form-data", description = "The documents to upload."),
    responses(
        (status = 202, description = "Files queued", body = UploadQueueResponse),
        (status = 400, description = "Bad request (e.g., no file parts)"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field.bytes().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read file bytes: {}", e),
            )
        })?;
        files.push(IncomingFile::new(name, data));
    }

    if files.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Multipart form must include at least one file".to_string(),
        ));
    }

    info!(files = files.len(), "Upload batch received");
    let entries = state.queue.submit(files).await;
    let response = UploadQueueResponse {
        entries: entries.into_iter().map(UploadProgressResponse::from).collect(),
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// The current upload queue, including recently finished files.
#[utoipa::path(
    get,
    path = "/uploads",
    responses(
        (status = 200, description = "Upload progress entries", body = UploadQueueResponse)
    )
)]
pub async fn list_uploads_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let entries = state.queue.snapshot().await;
    Json(UploadQueueResponse {
        entries: entries.into_iter().map(UploadProgressResponse::from).collect(),
    })
}

/// The user's documents, newest upload first.
#[utoipa::path(
    get,
    path = "/documents",
    responses(
        (status = 200, description = "Document list state", body = DocumentListResponse)
    )
)]
pub async fn list_documents_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(list_response(state.documents.refresh().await))
}

fn list_response(list: ListState) -> DocumentListResponse {
    match list {
        ListState::Loading => DocumentListResponse {
            state: "loading".to_string(),
            documents: Vec::new(),
            error: None,
        },
        ListState::Loaded(docs) => DocumentListResponse {
            state: "loaded".to_string(),
            documents: docs.into_iter().map(DocumentResponse::from).collect(),
            error: None,
        },
        ListState::Error(message) => DocumentListResponse {
            state: "error".to_string(),
            documents: Vec::new(),
            error: Some(message),
        },
    }
}

/// A single document.
#[utoipa::path(
    get,
    path = "/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "The document", body = DocumentResponse),
        (status = 404, description = "No such document")
    )
)]
pub async fn get_document_handler(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, (StatusCode, String)> {
    let doc = state
        .db
        .get_document(document_id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(doc.into()))
}

/// Delete a document and its extracted rows.
#[utoipa::path(
    delete,
    path = "/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such document")
    )
)]
pub async fn delete_document_handler(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .documents
        .delete(document_id)
        .await
        .map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}
