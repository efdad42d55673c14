use std::time::Duration;

use async_trait::async_trait;
use mc_core::validation::validate_upload;
use mc_core::{
    DocumentStats, DocumentSummary, DocumentUploadResponse, ErrorResponse, HealthResponse,
    QueryRequest, QueryResponse,
};
use mc_error::{McError, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::upload::{progress_stream, UploadFile};

/// Receives upload percentages (0-100) for a single file.
pub type ProgressSender = tokio::sync::mpsc::UnboundedSender<u8>;

/// Operations exposed by the document question-answering service.
#[async_trait]
pub trait KnowledgeApi: Send + Sync {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse>;

    /// Uploads one file as a multipart request, reporting progress while
    /// the body is streamed.
    async fn upload_document(
        &self,
        file: UploadFile,
        progress: ProgressSender,
    ) -> Result<DocumentUploadResponse>;

    async fn health(&self) -> Result<HealthResponse>;

    async fn document_stats(&self) -> Result<DocumentStats>;

    async fn document_summary(&self, document_id: &str) -> Result<DocumentSummary>;

    async fn delete_document(&self, document_id: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String, // e.g. http://localhost:8000
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Clone)]
pub struct HttpKnowledgeClient {
    http: Client,
    base: Url,
    timeout: Duration,
}

#[derive(Deserialize)]
struct DeleteResp {
    message: String,
}

impl HttpKnowledgeClient {
    pub fn new(cfg: ClientConfig) -> Result<Self> {
        let base = Url::parse(&cfg.base_url).map_err(|e| McError::Configuration {
            key: "api.base_url".to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(McError::Configuration {
                key: "api.base_url".to_string(),
                reason: format!("{} cannot be used as a base URL", cfg.base_url),
            });
        }
        let http = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| McError::Configuration {
                key: "http_client".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            base,
            timeout: cfg.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| McError::Configuration {
                key: "api.base_url".to_string(),
                reason: "cannot be used as a base URL".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn send_error(&self, operation: &str, err: reqwest::Error) -> McError {
        if err.is_timeout() {
            McError::Timeout {
                operation: operation.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            McError::Network {
                operation: operation.to_string(),
                message: err.to_string(),
            }
        }
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        operation: &str,
        resp: reqwest::Response,
    ) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&txt)
                .ok()
                .and_then(|e| e.message())
                .unwrap_or_else(|| txt.trim().to_string());
            debug!(operation, status = status.as_u16(), %detail, "service rejected request");
            return Err(McError::Api {
                status: status.as_u16(),
                detail,
            });
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| self.send_error(operation, e))?;
        serde_json::from_slice(&body).map_err(|e| McError::Serialization {
            format: "json".to_string(),
            message: format!("{}: {}", operation, e),
        })
    }
}

#[async_trait]
impl KnowledgeApi for HttpKnowledgeClient {
    #[instrument(skip(self, request), fields(max_results = request.max_results))]
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let url = self.endpoint(&["query", ""])?;
        let resp = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.send_error("query", e))?;
        let data: QueryResponse = self.decode("query", resp).await?;
        if !data.respects(request) {
            warn!(
                sources = data.sources.len(),
                max_results = request.max_results,
                "response sources outside requested bounds"
            );
        }
        Ok(data)
    }

    #[instrument(skip(self, file, progress), fields(filename = %file.name, size = file.size))]
    async fn upload_document(
        &self,
        file: UploadFile,
        progress: ProgressSender,
    ) -> Result<DocumentUploadResponse> {
        validate_upload(&file.name, file.size)?;
        let url = self.endpoint(&["documents", "upload"])?;
        let name = file.name.clone();
        let mime = file.mime_type();
        let data = file.read().await?;
        let len = data.len() as u64;

        let part = Part::stream_with_length(Body::wrap_stream(progress_stream(data, progress)), len)
            .file_name(name)
            .mime_str(mime)
            .map_err(|e| self.send_error("upload_document", e))?;
        let form = Form::new().part("file", part);

        let resp = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.send_error("upload_document", e))?;
        self.decode("upload_document", resp).await
    }

    #[instrument(skip(self))]
    async fn health(&self) -> Result<HealthResponse> {
        let url = self.endpoint(&["health"])?;
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.send_error("health", e))?;
        self.decode("health", resp).await
    }

    #[instrument(skip(self))]
    async fn document_stats(&self) -> Result<DocumentStats> {
        let url = self.endpoint(&["documents", "stats"])?;
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.send_error("document_stats", e))?;
        self.decode("document_stats", resp).await
    }

    #[instrument(skip(self))]
    async fn document_summary(&self, document_id: &str) -> Result<DocumentSummary> {
        let url = self.endpoint(&["documents", document_id, "summary"])?;
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.send_error("document_summary", e))?;
        self.decode("document_summary", resp).await
    }

    #[instrument(skip(self))]
    async fn delete_document(&self, document_id: &str) -> Result<String> {
        let url = self.endpoint(&["documents", document_id])?;
        let resp = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|e| self.send_error("delete_document", e))?;
        let data: DeleteResp = self.decode("delete_document", resp).await?;
        Ok(data.message)
    }
}
