//! Local checks run before anything is sent to the service.

use mc_error::McError;

use crate::Result;

pub const MAX_QUESTION_CHARS: usize = 1000;
pub const DEFAULT_MAX_RESULTS: u32 = 5;
pub const MIN_RESULTS: u32 = 1;
pub const MAX_RESULTS: u32 = 10;

pub const ALLOWED_EXTENSIONS: [&str; 4] = [".pdf", ".txt", ".docx", ".doc"];
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Returns the trimmed question, or a validation error naming the problem.
pub fn validate_question(raw: &str) -> Result<String> {
    let question = raw.trim();
    if question.is_empty() {
        return Err(McError::validation("question", "Please enter a question"));
    }
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(McError::validation("question", "Question too long"));
    }
    Ok(question.to_string())
}

pub fn normalize_max_results(value: Option<u32>) -> u32 {
    value
        .unwrap_or(DEFAULT_MAX_RESULTS)
        .clamp(MIN_RESULTS, MAX_RESULTS)
}

/// Lowercased extension including the dot, taken after the last `.`.
/// A name without any dot yields the whole name, so it never matches.
pub fn file_extension(filename: &str) -> String {
    let last = filename.rsplit('.').next().unwrap_or_default();
    format!(".{}", last.to_lowercase())
}

pub fn validate_upload(filename: &str, size: u64) -> Result<()> {
    let extension = file_extension(filename);
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(McError::UnsupportedFileType {
            extension,
            allowed: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        });
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(McError::FileTooLarge {
            size,
            limit: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}
