use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// Unified error type for the client workspace.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum McError {
    // === Validation errors (never reach the network) ===
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("File type {extension} not supported. Allowed types: {}", .allowed.join(", "))]
    UnsupportedFileType {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("File too large. Maximum size: {}MB", .limit / (1024 * 1024))]
    FileTooLarge { size: u64, limit: u64 },

    // === Remote service errors ===
    #[error("server returned {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("network error: {operation}")]
    Network { operation: String, message: String },

    #[error("timeout: {operation} exceeded {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("serialization error: {format}")]
    Serialization { format: String, message: String },

    // === Local system errors ===
    #[error("configuration error: {key} - {reason}")]
    Configuration { key: String, reason: String },

    #[error("io error: {operation}")]
    Io { operation: String, message: String },

    #[error("concurrency error: {operation}")]
    Concurrency { operation: String, message: String },

    #[error("internal error: {message}")]
    Internal {
        message: String,
        details: Option<String>,
    },
}

/// Error severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Low,      // expected input problems
    Medium,   // remote failures the user can re-trigger
    High,     // local failures that break an operation
    Critical, // broken setup
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMetadata {
    pub error_id: String,
    pub severity: ErrorSeverity,
    pub component: String,
    pub operation: Option<String>,
    pub request_id: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub context: std::collections::HashMap<String, String>,
}

impl McError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        McError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            McError::Validation { .. }
            | McError::UnsupportedFileType { .. }
            | McError::FileTooLarge { .. } => ErrorSeverity::Low,
            McError::Api { .. } | McError::Network { .. } | McError::Timeout { .. } => {
                ErrorSeverity::Medium
            }
            McError::Serialization { .. } | McError::Io { .. } | McError::Concurrency { .. } => {
                ErrorSeverity::High
            }
            McError::Configuration { .. } | McError::Internal { .. } => ErrorSeverity::Critical,
        }
    }

    /// Client-side validation failures are detected before any request is made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            McError::Validation { .. }
                | McError::UnsupportedFileType { .. }
                | McError::FileTooLarge { .. }
        )
    }

    /// Whether repeating the same action may succeed. Nothing retries on
    /// its own; this only shapes what the user is told.
    pub fn is_retryable(&self) -> bool {
        match self {
            McError::Network { .. } | McError::Timeout { .. } => true,
            McError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// HTTP status of a server-side rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            McError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for showing next to the affected upload or query.
    pub fn user_message(&self) -> String {
        match self {
            McError::Validation { .. }
            | McError::UnsupportedFileType { .. }
            | McError::FileTooLarge { .. } => self.to_string(),
            McError::Api { status, detail } if detail.trim().is_empty() => {
                format!("Request failed with status {}", status)
            }
            McError::Api { detail, .. } => detail.clone(),
            McError::Network { message, .. } => {
                format!("Unable to reach the server: {}", message)
            }
            McError::Timeout { .. } => "The server took too long to respond".to_string(),
            McError::Serialization { .. } => "Unexpected response from the server".to_string(),
            McError::Io { message, .. } => message.clone(),
            McError::Configuration { key, reason } => {
                format!("Invalid configuration for {}: {}", key, reason)
            }
            McError::Concurrency { .. } | McError::Internal { .. } => {
                "An unexpected error occurred".to_string()
            }
        }
    }

    pub fn log(&self, metadata: &ErrorMetadata) {
        match metadata.severity {
            ErrorSeverity::Low => {
                warn!(
                    error_id = %metadata.error_id,
                    component = %metadata.component,
                    operation = ?metadata.operation,
                    error = %self,
                    "rejected input"
                );
            }
            ErrorSeverity::Medium => {
                warn!(
                    error_id = %metadata.error_id,
                    component = %metadata.component,
                    operation = ?metadata.operation,
                    request_id = ?metadata.request_id,
                    error = %self,
                    context = ?metadata.context,
                    retryable = self.is_retryable(),
                    "remote call failed"
                );
            }
            ErrorSeverity::High | ErrorSeverity::Critical => {
                error!(
                    error_id = %metadata.error_id,
                    component = %metadata.component,
                    operation = ?metadata.operation,
                    request_id = ?metadata.request_id,
                    error = %self,
                    context = ?metadata.context,
                    severity = ?metadata.severity,
                    "client error"
                );
            }
        }
    }
}

pub struct ErrorMetadataBuilder {
    metadata: ErrorMetadata,
}

impl ErrorMetadataBuilder {
    pub fn new(component: &str) -> Self {
        Self {
            metadata: ErrorMetadata {
                error_id: uuid::Uuid::new_v4().to_string(),
                severity: ErrorSeverity::Medium,
                component: component.to_string(),
                operation: None,
                request_id: None,
                timestamp: chrono::Utc::now(),
                context: std::collections::HashMap::new(),
            },
        }
    }

    pub fn operation(mut self, operation: &str) -> Self {
        self.metadata.operation = Some(operation.to_string());
        self
    }

    pub fn request_id(mut self, request_id: &str) -> Self {
        self.metadata.request_id = Some(request_id.to_string());
        self
    }

    pub fn context(mut self, key: &str, value: &str) -> Self {
        self.metadata
            .context
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(mut self, error: &McError) -> ErrorMetadata {
        self.metadata.severity = error.severity();
        self.metadata
    }
}

pub type Result<T> = std::result::Result<T, McError>;

// === Conversions ===

impl From<serde_json::Error> for McError {
    fn from(err: serde_json::Error) -> Self {
        McError::Serialization {
            format: "json".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for McError {
    fn from(err: serde_yaml::Error) -> Self {
        McError::Serialization {
            format: "yaml".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for McError {
    fn from(err: std::io::Error) -> Self {
        McError::Io {
            operation: format!("{:?}", err.kind()),
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for McError {
    fn from(err: tokio::task::JoinError) -> Self {
        McError::Concurrency {
            operation: "task_join".to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_errors_name_the_limits() {
        let err = McError::UnsupportedFileType {
            extension: ".exe".to_string(),
            allowed: vec![".pdf".into(), ".txt".into(), ".docx".into(), ".doc".into()],
        };
        assert_eq!(
            err.user_message(),
            "File type .exe not supported. Allowed types: .pdf, .txt, .docx, .doc"
        );

        let err = McError::FileTooLarge {
            size: 11 * 1024 * 1024,
            limit: 10 * 1024 * 1024,
        };
        assert_eq!(err.user_message(), "File too large. Maximum size: 10MB");
        assert!(err.is_validation());
        assert_eq!(err.severity(), ErrorSeverity::Low);
    }

    #[test]
    fn test_api_error_surfaces_detail() {
        let err = McError::Api {
            status: 500,
            detail: "Error processing query: boom".to_string(),
        };
        assert_eq!(err.user_message(), "Error processing query: boom");
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_validation());
        assert!(err.is_retryable());

        let empty = McError::Api {
            status: 502,
            detail: String::new(),
        };
        assert_eq!(empty.user_message(), "Request failed with status 502");

        let not_found = McError::Api {
            status: 404,
            detail: "Document not found".to_string(),
        };
        assert!(!not_found.is_retryable());
    }

    #[tokio::test]
    async fn test_join_error_becomes_concurrency() {
        let join_err = tokio::spawn(async { panic!("worker crashed") })
            .await
            .unwrap_err();
        let err = McError::from(join_err);
        assert!(matches!(
            err,
            McError::Concurrency { ref operation, .. } if operation == "task_join"
        ));
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.user_message(), "An unexpected error occurred");
    }

    #[test]
    fn test_metadata_builder_takes_error_severity() {
        let err = McError::Internal {
            message: "x".into(),
            details: None,
        };
        let meta = ErrorMetadataBuilder::new("uploads")
            .operation("upload_document")
            .context("filename", "a.pdf")
            .build(&err);
        assert_eq!(meta.severity, ErrorSeverity::Critical);
        assert_eq!(meta.operation.as_deref(), Some("upload_document"));
        assert_eq!(meta.context.get("filename").map(String::as_str), Some("a.pdf"));
    }
}
