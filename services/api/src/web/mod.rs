pub mod protocol;
pub mod rest;
pub mod review;
pub mod state;

// Re-export the handlers so the binary can build the router from one place.
pub use rest::{
    delete_document_handler, get_document_handler, health_handler, list_documents_handler,
    list_uploads_handler, upload_handler,
};
pub use review::{anomalies_handler, export_handler, review_rows_handler};
