//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, HttpObjectStorage, HttpParsingGateway},
    config::Config,
    error::ApiError,
    web::{
        anomalies_handler, delete_document_handler, export_handler, get_document_handler,
        health_handler, list_documents_handler, list_uploads_handler, rest::ApiDoc,
        review_rows_handler, state::AppState, upload_handler,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::get,
    Router,
};
use fundiq_core::{
    CloudStorageIngestion, DocumentIngestion, DocumentListView, DocumentStore, IngestionMode,
    LocalFirstIngestion, QueueSettings, UploadQueue, UserContext,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Room for a multi-file batch; oversized files must still reach validation.
const BATCH_BODY_FACTOR: usize = 8;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");
    let store: Arc<dyn DocumentStore> = db_adapter;

    // --- 3. Initialize Service Adapters ---
    let user = UserContext::new(config.user_id);
    let gateway = Arc::new(HttpParsingGateway::new(
        config.parser_url.clone(),
        config.parser_timeout,
    )?);

    let ingestion: Arc<dyn DocumentIngestion> = match config.ingestion_mode {
        IngestionMode::LocalFirst => Arc::new(LocalFirstIngestion::new(gateway)),
        IngestionMode::CloudStorage => {
            let storage_config = config.storage.clone().ok_or_else(|| {
                ApiError::Internal("Cloud ingestion requires storage settings".to_string())
            })?;
            let storage = Arc::new(HttpObjectStorage::new(
                reqwest::Client::new(),
                storage_config,
            ));
            Arc::new(CloudStorageIngestion::new(
                user,
                store.clone(),
                storage,
                gateway,
            ))
        }
    };
    info!(mode = %config.ingestion_mode, parser = %config.parser_url, "Ingestion configured");

    // --- 4. Build the Shared AppState ---
    let documents = Arc::new(DocumentListView::new(store.clone(), user));
    let settings = QueueSettings {
        max_file_bytes: config.max_file_bytes,
        removal_delay: config.progress_clear_delay,
    };
    let queue = Arc::new(UploadQueue::new(ingestion, settings).with_observer(documents.clone()));

    let app_state = Arc::new(AppState {
        db: store,
        config: config.clone(),
        queue,
        documents,
    });

    // --- 5. Configure CORS ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    // --- 6. Create the Web Router ---
    let api_router = Router::new()
        .route("/health", get(health_handler))
        .route("/uploads", get(list_uploads_handler).post(upload_handler))
        .route("/documents", get(list_documents_handler))
        .route(
            "/documents/{id}",
            get(get_document_handler).delete(delete_document_handler),
        )
        .route("/documents/{id}/rows", get(review_rows_handler))
        .route("/documents/{id}/export", get(export_handler))
        .route("/documents/{id}/anomalies", get(anomalies_handler))
        .layer(DefaultBodyLimit::max(
            config.max_file_bytes.saturating_mul(BATCH_BODY_FACTOR),
        ))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
