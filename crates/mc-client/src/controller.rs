//! Interaction handlers. Each handler validates locally, runs the remote
//! call on its own task and reports back through [`ViewEvent`]s.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mc_core::validation::validate_upload;
use mc_core::{QueryRequest, UploadId, UploadProgress, ViewEvent};
use mc_error::{ErrorMetadataBuilder, McError, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::api::KnowledgeApi;
use crate::poller::{self, PollerHandle};
use crate::upload::UploadFile;

pub type EventSender = mpsc::UnboundedSender<ViewEvent>;

pub struct Assistant<A> {
    api: Arc<A>,
    events: EventSender,
}

/// Uploads started from one selection.
pub struct UploadBatch {
    pub ids: Vec<UploadId>,
    tasks: Vec<(UploadId, JoinHandle<()>)>,
    events: EventSender,
}

impl UploadBatch {
    /// Waits until every started upload reached a terminal state. A task
    /// that died without reporting is marked failed here.
    pub async fn wait(self) {
        for (id, task) in self.tasks {
            if let Err(e) = task.await {
                let err = McError::from(e);
                let meta = ErrorMetadataBuilder::new("uploads")
                    .operation("wait")
                    .context("upload_id", &id.to_string())
                    .build(&err);
                err.log(&meta);
                let _ = self.events.send(ViewEvent::UploadFailed {
                    id,
                    message: err.user_message(),
                });
            }
        }
    }
}

impl<A: KnowledgeApi + 'static> Assistant<A> {
    pub fn new(api: Arc<A>, events: EventSender) -> Self {
        Self { api, events }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    fn emit(&self, event: ViewEvent) {
        // the view is gone; nothing left to update
        let _ = self.events.send(event);
    }

    /// Blocked submissions return the validation error and emit nothing.
    pub fn submit_query(&self, question: &str, max_results: Option<u32>) -> Result<JoinHandle<()>> {
        let request = QueryRequest::new(question, max_results)?;
        self.emit(ViewEvent::QueryStarted);

        let api = self.api.clone();
        let events = self.events.clone();
        Ok(tokio::spawn(async move {
            let event = match api.query(&request).await {
                Ok(response) => {
                    info!(sources = response.sources.len(), "query answered");
                    ViewEvent::QueryCompleted {
                        request,
                        response,
                        at: Utc::now(),
                    }
                }
                Err(err) => {
                    let meta = ErrorMetadataBuilder::new("query")
                        .operation("query")
                        .build(&err);
                    err.log(&meta);
                    ViewEvent::QueryFailed {
                        message: err.user_message(),
                    }
                }
            };
            let _ = events.send(event);
        }))
    }

    /// Lists every file, rejecting invalid ones in place, and uploads the
    /// rest concurrently, one request per file.
    pub fn upload_files(&self, files: Vec<UploadFile>) -> UploadBatch {
        let mut batch = UploadBatch {
            ids: Vec::with_capacity(files.len()),
            tasks: Vec::new(),
            events: self.events.clone(),
        };
        for file in files {
            let id = UploadId::new();
            batch.ids.push(id);
            if let Err(err) = validate_upload(&file.name, file.size) {
                let meta = ErrorMetadataBuilder::new("uploads")
                    .operation("validate_upload")
                    .context("filename", &file.name)
                    .build(&err);
                err.log(&meta);
                self.emit(ViewEvent::UploadQueued(UploadProgress::rejected(
                    id,
                    file.file_ref(),
                    err.user_message(),
                )));
                continue;
            }
            self.emit(ViewEvent::UploadQueued(UploadProgress::uploading(
                id,
                file.file_ref(),
            )));
            let task = tokio::spawn(upload_one(self.api.clone(), self.events.clone(), id, file));
            batch.tasks.push((id, task));
        }
        batch
    }

    pub fn remove_upload(&self, id: UploadId) {
        self.emit(ViewEvent::UploadRemoved { id });
    }

    /// Re-displays a stored answer. No request is made.
    pub fn select_history(&self, id: &str) {
        self.emit(ViewEvent::HistorySelected { id: id.to_string() });
    }

    pub fn clear_history(&self) {
        self.emit(ViewEvent::HistoryCleared);
    }

    pub async fn check_health(&self) {
        poller::check_once(self.api.as_ref(), &self.events).await;
    }

    pub fn start_health_polling(&self, interval: Duration) -> PollerHandle {
        poller::start_health_polling(self.api.clone(), interval, self.events.clone())
    }
}

async fn upload_one<A: KnowledgeApi + 'static>(
    api: Arc<A>,
    events: EventSender,
    id: UploadId,
    file: UploadFile,
) {
    let name = file.name.clone();
    let (tx, mut rx) = mpsc::unbounded_channel::<u8>();
    let upload = api.upload_document(file, tx);
    tokio::pin!(upload);

    let result = loop {
        tokio::select! {
            biased;
            Some(percent) = rx.recv() => {
                let _ = events.send(ViewEvent::UploadProgressed { id, percent });
            }
            res = &mut upload => break res,
        }
    };
    while let Ok(percent) = rx.try_recv() {
        let _ = events.send(ViewEvent::UploadProgressed { id, percent });
    }

    let event = match result {
        Ok(response) => {
            info!(filename = %name, chunks = response.chunks_created, "document uploaded");
            ViewEvent::UploadSucceeded { id, response }
        }
        Err(err) => {
            report_upload_error(&name, &err);
            ViewEvent::UploadFailed {
                id,
                message: err.user_message(),
            }
        }
    };
    let _ = events.send(event);
}

fn report_upload_error(filename: &str, err: &McError) {
    let meta = ErrorMetadataBuilder::new("uploads")
        .operation("upload_document")
        .context("filename", filename)
        .build(err);
    err.log(&meta);
}
