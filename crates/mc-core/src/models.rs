use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::validation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

fn default_max_results() -> u32 {
    validation::DEFAULT_MAX_RESULTS
}

impl QueryRequest {
    /// Builds a request from raw form input. The question is trimmed and
    /// `max_results` is clamped into range.
    pub fn new(question: &str, max_results: Option<u32>) -> crate::Result<Self> {
        Ok(Self {
            question: validation::validate_question(question)?,
            max_results: validation::normalize_max_results(max_results),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub filename: String,
    pub chunk_index: u32,
    pub content_preview: String,
    pub relevance_score: f32,
    pub document_id: String,
}

/// Display identity of a source passage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceKey {
    pub document_id: String,
    pub chunk_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelevanceBand {
    High,
    Medium,
    Low,
}

impl RelevanceBand {
    pub fn from_score(score: f32) -> Self {
        if score >= 0.8 {
            RelevanceBand::High
        } else if score >= 0.6 {
            RelevanceBand::Medium
        } else {
            RelevanceBand::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RelevanceBand::High => "High",
            RelevanceBand::Medium => "Medium",
            RelevanceBand::Low => "Low",
        }
    }
}

impl Source {
    pub fn key(&self) -> SourceKey {
        SourceKey {
            document_id: self.document_id.clone(),
            chunk_index: self.chunk_index,
        }
    }

    pub fn relevance(&self) -> RelevanceBand {
        RelevanceBand::from_score(self.relevance_score)
    }

    pub fn has_valid_score(&self) -> bool {
        (0.0..=1.0).contains(&self.relevance_score)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    pub query: String,
    pub timestamp: String,
}

impl QueryResponse {
    /// True when the service kept to the requested limit and score range.
    pub fn respects(&self, request: &QueryRequest) -> bool {
        self.sources.len() <= request.max_results as usize
            && self.sources.iter().all(Source::has_valid_score)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentUploadResponse {
    pub document_id: String,
    pub filename: String,
    pub chunks_created: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub weaviate_status: String,
    pub api_status: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub total_chunks: u64,
    #[serde(default)]
    pub total_documents: Option<u64>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document_id: String,
    pub filename: String,
    pub total_chunks: u64,
    #[serde(default)]
    pub total_content_length: Option<u64>,
    pub status: String,
}

/// Error body returned by the service. Framework-level rejections only
/// carry `detail`, which may be a string or a list of field errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ErrorResponse {
    pub fn message(&self) -> Option<String> {
        let detail = self.detail.as_ref().and_then(|d| match d {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(items) => {
                let msgs: Vec<String> = items
                    .iter()
                    .filter_map(|i| i.get("msg").and_then(|m| m.as_str()).map(str::to_string))
                    .collect();
                if msgs.is_empty() {
                    None
                } else {
                    Some(msgs.join("; "))
                }
            }
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        });
        match (self.error.as_deref(), detail) {
            (Some(err), Some(detail)) => Some(format!("{}: {}", err, detail)),
            (None, Some(detail)) => Some(detail),
            (Some(err), None) => Some(err.to_string()),
            (None, None) => None,
        }
    }
}

/// Renders an ISO-8601 timestamp in local time. Timestamps without an
/// offset are already local; anything unparsable is returned verbatim.
pub fn format_local_timestamp(ts: &str) -> String {
    const DISPLAY: &str = "%Y-%m-%d %H:%M:%S";
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return dt.with_timezone(&Local).format(DISPLAY).to_string();
    }
    match NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => naive.format(DISPLAY).to_string(),
        Err(_) => ts.to_string(),
    }
}
