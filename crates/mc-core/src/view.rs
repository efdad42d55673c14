//! Session view model. All state the front end renders lives here and only
//! changes through [`ViewModel::apply`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::health::HealthState;
use crate::history::{HistoryLog, QueryHistory};
use crate::models::{DocumentUploadResponse, HealthResponse, QueryRequest, QueryResponse, SourceKey};
use crate::uploads::{UploadId, UploadList, UploadProgress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Non-blocking message for the user; the front end drains these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notification {
    fn success(message: String) -> Self {
        Self {
            level: NoticeLevel::Success,
            message,
        }
    }

    fn error(message: String) -> Self {
        Self {
            level: NoticeLevel::Error,
            message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ViewEvent {
    QueryStarted,
    QueryCompleted {
        request: QueryRequest,
        response: QueryResponse,
        at: DateTime<Utc>,
    },
    QueryFailed {
        message: String,
    },
    HistorySelected {
        id: String,
    },
    HistoryCleared,
    SourceToggled(SourceKey),
    UploadQueued(UploadProgress),
    UploadProgressed {
        id: UploadId,
        percent: u8,
    },
    UploadSucceeded {
        id: UploadId,
        response: DocumentUploadResponse,
    },
    UploadFailed {
        id: UploadId,
        message: String,
    },
    UploadRemoved {
        id: UploadId,
    },
    HealthChecking,
    HealthUpdated {
        health: Option<HealthResponse>,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewModel {
    pub response: Option<QueryResponse>,
    pub loading: bool,
    pub history: HistoryLog,
    pub uploads: UploadList,
    pub health: HealthState,
    pub expanded_sources: BTreeSet<SourceKey>,
    notifications: Vec<Notification>,
}

impl ViewModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_submit(&self) -> bool {
        !self.loading
    }

    pub fn apply(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::QueryStarted => {
                self.loading = true;
            }
            ViewEvent::QueryCompleted {
                request,
                response,
                at,
            } => {
                self.loading = false;
                self.history
                    .push(QueryHistory::record(&request, &response, at));
                self.show_response(response);
                self.notifications
                    .push(Notification::success("Query processed successfully!".into()));
            }
            ViewEvent::QueryFailed { message } => {
                self.loading = false;
                self.notifications
                    .push(Notification::error(format!("Query failed: {}", message)));
            }
            ViewEvent::HistorySelected { id } => {
                match self.history.find(&id).map(QueryHistory::to_response) {
                    Some(response) => self.show_response(response),
                    None => debug!(%id, "history entry no longer present"),
                }
            }
            ViewEvent::HistoryCleared => self.history.clear(),
            ViewEvent::SourceToggled(key) => {
                if !self.expanded_sources.remove(&key) {
                    self.expanded_sources.insert(key);
                }
            }
            ViewEvent::UploadQueued(item) => self.uploads.add(item),
            ViewEvent::UploadProgressed { id, percent } => {
                self.uploads.set_progress(id, percent);
            }
            ViewEvent::UploadSucceeded { id, response } => {
                let message = format!("Document \"{}\" uploaded successfully!", response.filename);
                if self.uploads.complete(id, response) {
                    self.notifications.push(Notification::success(message));
                }
            }
            ViewEvent::UploadFailed { id, message } => {
                let name = self.uploads.get(id).map(|i| i.file.name.clone());
                if self.uploads.fail(id, message.clone()) {
                    let name = name.unwrap_or_default();
                    self.notifications.push(Notification::error(format!(
                        "Upload of \"{}\" failed: {}",
                        name, message
                    )));
                }
            }
            ViewEvent::UploadRemoved { id } => {
                self.uploads.remove(id);
            }
            ViewEvent::HealthChecking => self.health.begin_check(),
            ViewEvent::HealthUpdated { health, at } => self.health.record(health, at),
        }
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn show_response(&mut self, response: QueryResponse) {
        self.expanded_sources.clear();
        self.response = Some(response);
    }
}
