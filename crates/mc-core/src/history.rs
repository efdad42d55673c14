use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{QueryRequest, QueryResponse, Source};

pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHistory {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub timestamp: String,
    pub sources: Vec<Source>,
}

impl QueryHistory {
    pub fn record(request: &QueryRequest, response: &QueryResponse, at: DateTime<Utc>) -> Self {
        Self {
            // v7 ids are time ordered
            id: uuid::Uuid::now_v7().to_string(),
            question: request.question.clone(),
            answer: response.answer.clone(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            sources: response.sources.clone(),
        }
    }

    /// Rebuilds the response shown when this entry is selected.
    pub fn to_response(&self) -> QueryResponse {
        QueryResponse {
            answer: self.answer.clone(),
            sources: self.sources.clone(),
            query: self.question.clone(),
            timestamp: self.timestamp.clone(),
        }
    }
}

/// Most-recent-first list of successful queries for this session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryLog {
    entries: Vec<QueryHistory>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: QueryHistory) {
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_LIMIT);
    }

    pub fn find(&self, id: &str) -> Option<&QueryHistory> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn get(&self, index: usize) -> Option<&QueryHistory> {
        self.entries.get(index)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryHistory> {
        self.entries.iter()
    }
}
