//! services/api/src/adapters/parser.rs
//!
//! This module contains the adapter for the external parsing service.
//! It implements the `ParsingGateway` port from the `core` crate.

use async_trait::async_trait;
use fundiq_core::domain::{IncomingFile, ParseOutcome, ParseRequest};
use fundiq_core::ports::{ParsingGateway, PortError, PortResult};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ParsingGateway` port over HTTP.
#[derive(Clone)]
pub struct HttpParsingGateway {
    client: Client,
    base_url: String,
    timeout: Duration,
}

/// Error bodies the parsing service may send with a non-2xx status.
#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
    error: Option<String>,
}

impl HttpParsingGateway {
    /// Creates a new `HttpParsingGateway` with its own client bound to `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    fn parse_url(&self) -> String {
        format!("{}/parse", self.base_url.trim_end_matches('/'))
    }

    /// Sends the request and maps every failure mode to the most specific message.
    async fn send(&self, request: RequestBuilder) -> PortResult<ParseOutcome> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                PortError::Timeout(format!(
                    "Parsing timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            } else {
                PortError::Unexpected(format!("Parsing service unreachable: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(status, &body);
            warn!(%status, "Parsing service rejected request: {}", message);
            return Err(PortError::Unexpected(message));
        }

        response.json::<ParseOutcome>().await.map_err(|e| {
            if e.is_timeout() {
                PortError::Timeout(format!(
                    "Parsing timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            } else {
                PortError::Unexpected(format!("Invalid response from parsing service: {}", e))
            }
        })
    }
}

/// Prefers the service's own `detail` or `error` text over a generic status line.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail.or(b.error))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Parsing service returned {}", status))
}

//=========================================================================================
// `ParsingGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl ParsingGateway for HttpParsingGateway {
    async fn parse_upload(&self, file: &IncomingFile) -> PortResult<ParseOutcome> {
        debug!(file = %file.name, bytes = file.size(), "Sending file to parsing service");
        let part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone());
        let form = reqwest::multipart::Form::new().part("file", part);

        self.send(self.client.post(self.parse_url()).multipart(form))
            .await
    }

    async fn parse_reference(&self, request: &ParseRequest) -> PortResult<ParseOutcome> {
        debug!(document_id = %request.document_id, "Requesting parse of stored file");
        self.send(self.client.post(self.parse_url()).json(request))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_service_detail() {
        assert_eq!(
            error_message(
                StatusCode::BAD_REQUEST,
                r#"{"detail":"Unsupported file type: doc"}"#
            ),
            "Unsupported file type: doc"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, r#"{"error":"upstream down"}"#),
            "upstream down"
        );
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>"),
            "Parsing service returned 500 Internal Server Error"
        );
    }
}
