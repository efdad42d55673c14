pub mod api;
pub mod controller;
pub mod poller;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ClientConfig, HttpKnowledgeClient, KnowledgeApi, ProgressSender};
pub use controller::{Assistant, UploadBatch};
pub use poller::{start_health_polling, PollerHandle, DEFAULT_HEALTH_INTERVAL};
pub use upload::UploadFile;

pub use mc_error::{McError, Result};
