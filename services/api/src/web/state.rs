//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use fundiq_core::{DocumentListView, DocumentStore, UploadQueue};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// The service runs a single upload session: one queue, one document list, on
/// behalf of one configured user.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DocumentStore>,
    pub config: Arc<Config>,
    pub queue: Arc<UploadQueue>,
    pub documents: Arc<DocumentListView>,
}
