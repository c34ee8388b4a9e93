//! services/api/src/adapters/storage.rs
//!
//! This module contains the object storage adapter. It uploads raw files to a
//! Supabase-style storage REST API and implements the `ObjectStorage` port.

use async_trait::async_trait;
use chrono::Utc;
use fundiq_core::domain::{FileType, IncomingFile, StoredObject, UserContext};
use fundiq_core::ports::{ObjectStorage, PortError, PortResult};
use reqwest::Client;
use tracing::debug;

use crate::config::StorageConfig;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct HttpObjectStorage {
    client: Client,
    config: StorageConfig,
}

impl HttpObjectStorage {
    pub fn new(client: Client, config: StorageConfig) -> Self {
        Self { client, config }
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// The address the stored object can be fetched from by the parsing service.
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base(),
            self.config.bucket,
            path
        )
    }
}

/// Keeps object keys URL-safe: anything outside `[A-Za-z0-9._-]` becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn content_type_for(file_name: &str) -> &'static str {
    match FileType::from_file_name(file_name) {
        Some(FileType::Pdf) => "application/pdf",
        Some(FileType::Csv) => "text/csv",
        Some(FileType::Xlsx) => {
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        }
        None => "application/octet-stream",
    }
}

//=========================================================================================
// `ObjectStorage` Trait Implementation
//=========================================================================================

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn upload(&self, user: &UserContext, file: &IncomingFile) -> PortResult<StoredObject> {
        let path = format!(
            "{}/{}_{}",
            user.user_id,
            Utc::now().timestamp_millis(),
            sanitize_file_name(&file.name)
        );
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base(),
            self.config.bucket,
            path
        );
        debug!(%path, bytes = file.size(), "Uploading file to object storage");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.service_key)
            .header("apikey", &self.config.service_key)
            .header("Content-Type", content_type_for(&file.name))
            .body(file.bytes.clone())
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Storage request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PortError::Unexpected(format!(
                "Storage upload failed with status {}: {}",
                status, error_text
            )));
        }

        Ok(StoredObject {
            url: self.public_url(&path),
            path,
        })
    }
}
