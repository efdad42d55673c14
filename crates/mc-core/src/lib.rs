pub mod health;
pub mod history;
pub mod models;
pub mod uploads;
pub mod validation;
pub mod view;

pub use health::{HealthIndicator, HealthState, StatusLevel};
pub use history::{HistoryLog, QueryHistory, HISTORY_LIMIT};
pub use models::{
    format_local_timestamp, DocumentStats, DocumentSummary, DocumentUploadResponse,
    ErrorResponse, HealthResponse, QueryRequest, QueryResponse, RelevanceBand, Source,
    SourceKey,
};
pub use uploads::{FileRef, UploadId, UploadList, UploadProgress, UploadStatus};
pub use view::{NoticeLevel, Notification, ViewEvent, ViewModel};

pub use mc_error::{McError as Error, Result};
