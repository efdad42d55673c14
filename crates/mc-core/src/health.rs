use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::HealthResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusLevel {
    Positive,
    Negative,
    Indeterminate,
}

impl StatusLevel {
    pub fn classify(status: &str) -> Self {
        match status {
            "healthy" | "ok" => StatusLevel::Positive,
            "unhealthy" | "error" => StatusLevel::Negative,
            _ => StatusLevel::Indeterminate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthIndicator {
    Online,
    Offline,
    Warning,
}

impl HealthIndicator {
    pub fn label(&self) -> &'static str {
        match self {
            HealthIndicator::Online => "Online",
            HealthIndicator::Offline => "Offline",
            HealthIndicator::Warning => "Degraded",
        }
    }
}

/// Last known health. `last == None` means unknown: either nothing has
/// been checked yet or the latest check failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthState {
    pub last: Option<HealthResponse>,
    pub last_checked: Option<DateTime<Utc>>,
    pub checking: bool,
}

impl HealthState {
    pub fn begin_check(&mut self) {
        self.checking = true;
    }

    pub fn record(&mut self, result: Option<HealthResponse>, at: DateTime<Utc>) {
        self.checking = false;
        if result.is_some() {
            self.last_checked = Some(at);
        }
        self.last = result;
    }

    pub fn indicator(&self) -> HealthIndicator {
        match &self.last {
            None => HealthIndicator::Offline,
            Some(h) => match StatusLevel::classify(&h.status) {
                StatusLevel::Positive => HealthIndicator::Online,
                StatusLevel::Negative => HealthIndicator::Offline,
                StatusLevel::Indeterminate => HealthIndicator::Warning,
            },
        }
    }

    /// Per-dependency levels shown next to the indicator.
    pub fn components(&self) -> Vec<(&'static str, StatusLevel)> {
        match &self.last {
            None => Vec::new(),
            Some(h) => vec![
                ("vector store", StatusLevel::classify(&h.weaviate_status)),
                ("api", StatusLevel::classify(&h.api_status)),
            ],
        }
    }
}
