use std::path::{Path, PathBuf};

use futures::{Stream, StreamExt};
use mc_core::validation::file_extension;
use mc_core::FileRef;
use mc_error::{McError, Result};

use crate::api::ProgressSender;

const PROGRESS_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone)]
enum UploadSource {
    Path(PathBuf),
    Memory(Vec<u8>),
}

/// A file chosen for upload. Size is known up front so oversize files are
/// rejected without being read.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub size: u64,
    source: UploadSource,
}

impl UploadFile {
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path).await.map_err(|e| McError::Io {
            operation: "stat".to_string(),
            message: format!("{}: {}", path.display(), e),
        })?;
        if !meta.is_file() {
            return Err(McError::Io {
                operation: "stat".to_string(),
                message: format!("{} is not a file", path.display()),
            });
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        Ok(Self {
            name,
            size: meta.len(),
            source: UploadSource::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: data.len() as u64,
            source: UploadSource::Memory(data),
        }
    }

    pub fn file_ref(&self) -> FileRef {
        FileRef {
            name: self.name.clone(),
            size: self.size,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match file_extension(&self.name).as_str() {
            ".pdf" => "application/pdf",
            ".txt" => "text/plain",
            ".docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ".doc" => "application/msword",
            _ => "application/octet-stream",
        }
    }

    pub async fn read(self) -> Result<Vec<u8>> {
        match self.source {
            UploadSource::Memory(data) => Ok(data),
            UploadSource::Path(path) => tokio::fs::read(&path).await.map_err(|e| McError::Io {
                operation: "read".to_string(),
                message: format!("{}: {}", path.display(), e),
            }),
        }
    }
}

pub(crate) fn percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent as u64 * 100) / total as u64).min(100) as u8
}

/// Splits the payload into chunks and reports the share handed to the
/// transport as each chunk is pulled.
pub(crate) fn progress_stream(
    data: Vec<u8>,
    progress: ProgressSender,
) -> impl Stream<Item = std::io::Result<Vec<u8>>> + Send + Sync + 'static {
    let total = data.len();
    let chunks: Vec<Vec<u8>> = data.chunks(PROGRESS_CHUNK).map(<[u8]>::to_vec).collect();
    let mut sent = 0usize;
    futures::stream::iter(chunks).map(move |chunk| {
        sent += chunk.len();
        // receiver may be gone if the caller stopped listening
        let _ = progress.send(percent(sent, total));
        Ok(chunk)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 0), 100);
        assert_eq!(percent(0, 10), 0);
        assert_eq!(percent(5, 10), 50);
        assert_eq!(percent(10, 10), 100);
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(UploadFile::from_bytes("a.PDF", vec![]).mime_type(), "application/pdf");
        assert_eq!(UploadFile::from_bytes("a.doc", vec![]).mime_type(), "application/msword");
        assert_eq!(
            UploadFile::from_bytes("a.bin", vec![]).mime_type(),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_progress_stream_reports_monotonic_percentages() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let data = vec![7u8; PROGRESS_CHUNK * 2 + 10];
        let chunks: Vec<_> = progress_stream(data.clone(), tx).collect().await;
        let total: usize = chunks.iter().map(|c| c.as_ref().unwrap().len()).sum();
        assert_eq!(total, data.len());

        let mut seen = Vec::new();
        while let Ok(p) = rx.try_recv() {
            seen.push(p);
        }
        assert_eq!(seen.len(), 3);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 100);
    }

    #[tokio::test]
    async fn test_from_path_reads_size_without_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"aspirin").unwrap();

        let file = UploadFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "notes.txt");
        assert_eq!(file.size, 7);
        assert_eq!(file.read().await.unwrap(), b"aspirin");

        let err = UploadFile::from_path(dir.path()).await.unwrap_err();
        assert!(matches!(err, McError::Io { .. }));
    }
}
