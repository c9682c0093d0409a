//! CouchDB-style HTTP document mirror

use crate::{check_new, require_rev, AllDocsPage, DocumentMirror};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use taxsync_core::{
    is_blank, ConfigError, MirrorConfig, MirrorError, TaxRateCacheDocument, TaxSyncError,
    TaxSyncResult, ValidationError,
};

/// Build the `Authorization` header value for basic auth.
pub fn basic_auth_header(username: &str, password: &str) -> String {
    let credentials = format!("{}:{}", username, password);
    format!("Basic {}", STANDARD.encode(credentials))
}

/// Body returned by document writes.
#[derive(Debug, Deserialize)]
struct WriteResponse {
    rev: String,
}

/// Error body returned by the document store.
#[derive(Debug, Deserialize)]
struct StoreError {
    error: String,
    #[serde(default)]
    reason: String,
}

/// Document mirror backed by a CouchDB-compatible HTTP API.
///
/// Documents live at `{hostname}/{database}/{id}`; the bulk listing is
/// `{hostname}/{database}/_all_docs`.
pub struct HttpDocumentMirror {
    client: Client,
    base_url: String,
    database: String,
    authorization: String,
}

impl HttpDocumentMirror {
    /// Create a mirror client from configuration.
    ///
    /// A zero timeout leaves requests unbounded.
    pub fn new(config: &MirrorConfig) -> TaxSyncResult<Self> {
        if is_blank(&config.hostname) {
            return Err(ConfigError::MissingRequired {
                field: "mirror.hostname".to_string(),
            }
            .into());
        }
        if is_blank(&config.database) {
            return Err(ConfigError::MissingRequired {
                field: "mirror.database".to_string(),
            }
            .into());
        }

        let mut builder = Client::builder();
        if config.timeout_ms > 0 {
            builder = builder.timeout(config.timeout());
        }
        let client = builder.build().map_err(|e| MirrorError::Transport {
            reason: format!("Failed to build HTTP client: {}", e),
        })?;

        Ok(Self {
            client,
            base_url: config.hostname.trim().trim_end_matches('/').to_string(),
            database: config.database.trim().to_string(),
            authorization: basic_auth_header(&config.username, &config.password),
        })
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/{}", self.database_url(), id)
    }

    /// Send a request and decode a successful JSON body.
    ///
    /// `id` names the document in conflict and not-found errors.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, id: &str) -> TaxSyncResult<T> {
        let response = request
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| MirrorError::Transport {
                reason: format!("HTTP request failed: {}", e),
            })?;

        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(|e| {
                MirrorError::InvalidResponse {
                    reason: format!("Failed to parse response: {}", e),
                }
                .into()
            });
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = match serde_json::from_str::<StoreError>(&error_text) {
            Ok(body) if body.reason.is_empty() => body.error,
            Ok(body) => format!("{}: {}", body.error, body.reason),
            Err(_) => error_text,
        };

        tracing::debug!(status = status.as_u16(), id, message = %message, "Mirror request rejected");

        Err(match status {
            StatusCode::CONFLICT => MirrorError::Conflict { id: id.to_string() },
            StatusCode::NOT_FOUND => MirrorError::NotFound { id: id.to_string() },
            _ => MirrorError::RequestFailed {
                status: status.as_u16(),
                message,
            },
        }
        .into())
    }

    async fn put(&self, document: &TaxRateCacheDocument) -> TaxSyncResult<TaxRateCacheDocument> {
        let request = self.client.put(self.document_url(&document.id)).json(document);
        let written: WriteResponse = self.send(request, &document.id).await?;

        let mut stored = document.clone();
        stored.rev = Some(written.rev);
        Ok(stored)
    }
}

#[async_trait]
impl DocumentMirror for HttpDocumentMirror {
    async fn create(&self, document: &TaxRateCacheDocument) -> TaxSyncResult<TaxRateCacheDocument> {
        check_new(document)?;
        tracing::debug!(id = %document.id, "Creating mirror document");
        self.put(document).await
    }

    async fn update(&self, document: &TaxRateCacheDocument) -> TaxSyncResult<TaxRateCacheDocument> {
        require_rev(document)?;
        tracing::debug!(id = %document.id, "Updating mirror document");
        self.put(document).await
    }

    async fn delete(&self, document: &TaxRateCacheDocument) -> TaxSyncResult<TaxRateCacheDocument> {
        let rev = require_rev(document)?;
        tracing::debug!(id = %document.id, rev, "Deleting mirror document");

        let request = self
            .client
            .delete(self.document_url(&document.id))
            .query(&[("rev", rev)]);
        let written: WriteResponse = self.send(request, &document.id).await?;

        let mut removed = document.clone();
        removed.rev = Some(written.rev);
        Ok(removed)
    }

    async fn get(&self, id: &str) -> TaxSyncResult<Option<TaxRateCacheDocument>> {
        if is_blank(id) {
            return Err(ValidationError::RequiredFieldMissing {
                field: "_id".to_string(),
            }
            .into());
        }

        let request = self.client.get(self.document_url(id));
        match self.send(request, id).await {
            Ok(document) => Ok(Some(document)),
            Err(TaxSyncError::Mirror(MirrorError::NotFound { .. })) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_all(&self, skip: usize, limit: usize) -> TaxSyncResult<AllDocsPage> {
        let request = self
            .client
            .get(format!("{}/_all_docs", self.database_url()))
            .query(&[("limit", limit), ("skip", skip)]);
        self.send(request, "_all_docs").await
    }
}

impl std::fmt::Debug for HttpDocumentMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDocumentMirror")
            .field("base_url", &self.base_url)
            .field("database", &self.database)
            .field("authorization", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MirrorConfig {
        MirrorConfig {
            hostname: "http://couch.internal:5984/".to_string(),
            database: "tax_rates".to_string(),
            username: "admin".to_string(),
            password: "s3cret".to_string(),
            timeout_ms: 1_000,
        }
    }

    #[test]
    fn test_basic_auth_header() {
        assert_eq!(basic_auth_header("admin", "s3cret"), "Basic YWRtaW46czNjcmV0");
        assert_eq!(basic_auth_header("", ""), "Basic Og==");
    }

    #[test]
    fn test_urls_strip_trailing_slash() {
        let mirror = HttpDocumentMirror::new(&config()).unwrap();
        assert_eq!(mirror.document_url("17"), "http://couch.internal:5984/tax_rates/17");
    }

    #[test]
    fn test_requires_hostname_and_database() {
        let mut missing_host = config();
        missing_host.hostname = "  ".to_string();
        assert!(HttpDocumentMirror::new(&missing_host).is_err());

        let mut missing_db = config();
        missing_db.database = String::new();
        assert!(HttpDocumentMirror::new(&missing_db).is_err());
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let mirror = HttpDocumentMirror::new(&config()).unwrap();
        let debug = format!("{:?}", mirror);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("YWRtaW46czNjcmV0"));
    }
}
