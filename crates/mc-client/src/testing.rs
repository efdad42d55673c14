use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use mc_core::{
    DocumentStats, DocumentSummary, DocumentUploadResponse, HealthResponse, QueryRequest,
    QueryResponse, Source,
};
use mc_error::{McError, Result};

use crate::api::{KnowledgeApi, ProgressSender};
use crate::upload::UploadFile;

/// In-memory service. Upload names containing `fail` are rejected, a
/// `slow` name delays completion so uploads finish out of order and a
/// `crash` name panics the upload task.
#[derive(Default)]
pub struct FakeApi {
    pub query_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub health_calls: AtomicUsize,
    pub fail_query: bool,
    pub health_status: Mutex<Option<String>>,
}

impl FakeApi {
    pub fn healthy() -> Self {
        Self {
            health_status: Mutex::new(Some("healthy".to_string())),
            ..Self::default()
        }
    }

    pub fn set_health(&self, status: Option<&str>) {
        *self.health_status.lock().unwrap() = status.map(str::to_string);
    }
}

#[async_trait]
impl KnowledgeApi for FakeApi {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_query {
            return Err(McError::Api {
                status: 500,
                detail: "Error processing query: llm offline".to_string(),
            });
        }
        let sources = (0..request.max_results.min(3))
            .map(|i| Source {
                filename: "paracetamol.pdf".to_string(),
                chunk_index: i,
                content_preview: "Side effects include...".to_string(),
                relevance_score: 0.9 - i as f32 * 0.1,
                document_id: "doc-1".to_string(),
            })
            .collect();
        Ok(QueryResponse {
            answer: format!("answer to {}", request.question),
            sources,
            query: request.question.clone(),
            timestamp: "2025-01-01T00:00:00".to_string(),
        })
    }

    async fn upload_document(
        &self,
        file: UploadFile,
        progress: ProgressSender,
    ) -> Result<DocumentUploadResponse> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let _ = progress.send(50);
        if file.name.contains("crash") {
            panic!("upload of {} crashed", file.name);
        }
        if file.name.contains("slow") {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        if file.name.contains("fail") {
            return Err(McError::Api {
                status: 500,
                detail: format!("Error processing document: {} is corrupt", file.name),
            });
        }
        let _ = progress.send(100);
        Ok(DocumentUploadResponse {
            document_id: format!("id-{}", file.name),
            filename: file.name.clone(),
            chunks_created: 2,
            message: format!("Document '{}' processed successfully with 2 chunks", file.name),
        })
    }

    async fn health(&self) -> Result<HealthResponse> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        match self.health_status.lock().unwrap().clone() {
            Some(status) => Ok(HealthResponse {
                status,
                weaviate_status: "ok".to_string(),
                api_status: "ok".to_string(),
                timestamp: "2025-01-01T00:00:00".to_string(),
            }),
            None => Err(McError::Network {
                operation: "connect".to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }

    async fn document_stats(&self) -> Result<DocumentStats> {
        Ok(DocumentStats {
            total_chunks: 0,
            total_documents: None,
            last_updated: None,
        })
    }

    async fn document_summary(&self, document_id: &str) -> Result<DocumentSummary> {
        Err(McError::Api {
            status: 404,
            detail: format!("{} not found", document_id),
        })
    }

    async fn delete_document(&self, document_id: &str) -> Result<String> {
        Ok(format!("Document {} deleted successfully", document_id))
    }
}
