//! services/api/src/web/review.rs
//!
//! Handlers for the data review surface: the searchable, sortable, paginated
//! row view of one document, its CSV/JSON export, and the anomalies flagged in it.

use crate::web::protocol::{
    AnomalyListResponse, AnomalyResponse, DocumentResponse, ExportQuery, ReviewQuery,
};
use crate::web::rest::port_error_response;
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use fundiq_core::{DataReview, ReviewContent};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

/// The document plus whatever the review surface shows for it. `state` is one of
/// `loading`, `error`, `no_data`, `table`, `raw`.
#[derive(Serialize, ToSchema)]
pub struct ReviewResponse {
    pub document: DocumentResponse,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub content: ReviewContent,
}

async fn open_review(
    state: &AppState,
    document_id: Uuid,
) -> Result<DataReview, (StatusCode, String)> {
    let document = state
        .db
        .get_document(document_id)
        .await
        .map_err(port_error_response)?;
    Ok(DataReview::open(state.db.as_ref(), document).await)
}

/// Extracted rows of one document, searched, sorted and paginated.
#[utoipa::path(
    get,
    path = "/documents/{id}/rows",
    params(
        ("id" = Uuid, Path, description = "Document id"),
        ReviewQuery
    ),
    responses(
        (status = 200, description = "Review content for the document", body = ReviewResponse),
        (status = 404, description = "No such document")
    )
)]
pub async fn review_rows_handler(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<Uuid>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<ReviewResponse>, (StatusCode, String)> {
    let mut review = open_review(&state, document_id).await?;

    if let Some(term) = query.search {
        review.set_search(term);
    }
    if let Some(column) = query.sort.as_deref().filter(|c| !c.is_empty()) {
        review.sort_by(column, query.direction.unwrap_or_default());
    }
    review.set_mode(query.view.unwrap_or_default());
    if let Some(page) = query.page {
        review.set_page(page);
    }

    Ok(Json(ReviewResponse {
        document: review.document().clone().into(),
        content: review.content(),
    }))
}

/// Download every extracted row of a document as CSV or JSON.
#[utoipa::path(
    get,
    path = "/documents/{id}/export",
    params(
        ("id" = Uuid, Path, description = "Document id"),
        ExportQuery
    ),
    responses(
        (status = 200, description = "Attachment named `<file_name>_extracted.<ext>`"),
        (status = 404, description = "No such document"),
        (status = 502, description = "Rows could not be loaded")
    )
)]
pub async fn export_handler(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, (StatusCode, String)> {
    let review = open_review(&state, document_id).await?;
    if let ReviewContent::Error { message } = review.content() {
        return Err((StatusCode::BAD_GATEWAY, message));
    }

    let export = review.export(query.format).map_err(|e| {
        error!(%document_id, "Failed to render export: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to render export".to_string(),
        )
    })?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        export.file_name.replace('"', "'")
    );
    Ok((
        [
            (header::CONTENT_TYPE, export.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    )
        .into_response())
}

/// Anomalies the parsing service flagged, most severe first.
#[utoipa::path(
    get,
    path = "/documents/{id}/anomalies",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "Flagged anomalies", body = AnomalyListResponse),
        (status = 404, description = "No such document")
    )
)]
pub async fn anomalies_handler(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<AnomalyListResponse>, (StatusCode, String)> {
    state
        .db
        .get_document(document_id)
        .await
        .map_err(port_error_response)?;
    let anomalies = state
        .db
        .list_anomalies(document_id)
        .await
        .map_err(port_error_response)?;

    Ok(Json(AnomalyListResponse {
        document_id,
        anomalies: anomalies.into_iter().map(AnomalyResponse::from).collect(),
    }))
}
