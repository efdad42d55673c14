use std::collections::BTreeSet;
use std::fmt::Write;

use mc_core::{
    format_local_timestamp, DocumentStats, DocumentSummary, HealthIndicator, HealthState,
    HistoryLog, NoticeLevel, Notification, QueryResponse, SourceKey, StatusLevel, UploadList,
    UploadStatus,
};

const PREVIEW_CHARS: usize = 160;

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

pub fn response(resp: &QueryResponse, expanded: &BTreeSet<SourceKey>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Answer  ({} | {} sources)",
        format_local_timestamp(&resp.timestamp),
        resp.sources.len()
    );
    let _ = writeln!(out, "{}", resp.answer.trim());
    if resp.sources.is_empty() {
        return out;
    }
    let _ = writeln!(out, "\nSources ({})", resp.sources.len());
    for (i, source) in resp.sources.iter().enumerate() {
        let _ = writeln!(
            out,
            "  [{}] {} (chunk {})  relevance: {} {:.0}%",
            i + 1,
            source.filename,
            source.chunk_index,
            source.relevance().label(),
            source.relevance_score * 100.0
        );
        let preview = if expanded.contains(&source.key()) {
            source.content_preview.clone()
        } else {
            truncate(&source.content_preview, PREVIEW_CHARS)
        };
        let _ = writeln!(out, "      {}", preview.replace('\n', " "));
    }
    out
}

pub fn uploads(list: &UploadList) -> String {
    let mut out = String::new();
    for (i, item) in list.iter().enumerate() {
        let state = match item.status {
            UploadStatus::Uploading => format!("uploading {:>3}%", item.progress),
            UploadStatus::Success => match &item.result {
                Some(r) => format!("success ({} chunks)", r.chunks_created),
                None => "success".to_string(),
            },
            UploadStatus::Error => format!(
                "error: {}",
                item.error.as_deref().unwrap_or("upload failed")
            ),
        };
        let _ = writeln!(
            out,
            "  {}. {}  {:.1} MB  {}",
            i + 1,
            item.file.name,
            item.file.size_mb(),
            state
        );
    }
    out
}

pub fn history(log: &HistoryLog) -> String {
    if log.is_empty() {
        return "  (no queries yet)\n".to_string();
    }
    let mut out = String::new();
    for (i, entry) in log.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {}  [{} | {} sources]",
            i + 1,
            truncate(&entry.question, 80),
            format_local_timestamp(&entry.timestamp),
            entry.sources.len()
        );
    }
    out
}

fn level(level: StatusLevel) -> &'static str {
    match level {
        StatusLevel::Positive => "ok",
        StatusLevel::Negative => "error",
        StatusLevel::Indeterminate => "unknown",
    }
}

pub fn health(state: &HealthState) -> String {
    let mark = match state.indicator() {
        HealthIndicator::Online => "+",
        HealthIndicator::Offline => "x",
        HealthIndicator::Warning => "!",
    };
    let mut out = format!("[{}] {}", mark, state.indicator().label());
    for (name, status) in state.components() {
        let _ = write!(out, " | {}: {}", name, level(status));
    }
    if let Some(at) = state.last_checked {
        let local = at.with_timezone(&chrono::Local);
        let _ = write!(out, " | checked {}", local.format("%H:%M:%S"));
    }
    out
}

pub fn notification(note: &Notification) -> String {
    let tag = match note.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "ok",
        NoticeLevel::Error => "error",
    };
    format!("[{}] {}", tag, note.message)
}

pub fn stats(stats: &DocumentStats) -> String {
    let mut out = format!("chunks: {}", stats.total_chunks);
    if let Some(docs) = stats.total_documents {
        let _ = write!(out, "\ndocuments: {}", docs);
    }
    if let Some(updated) = &stats.last_updated {
        let _ = write!(out, "\nlast updated: {}", format_local_timestamp(updated));
    }
    out
}

pub fn summary(summary: &DocumentSummary) -> String {
    let mut out = format!(
        "{} ({})\nstatus: {}\nchunks: {}",
        summary.filename, summary.document_id, summary.status, summary.total_chunks
    );
    if let Some(len) = summary.total_content_length {
        let _ = write!(out, "\ncharacters: {}", len);
    }
    out
}
