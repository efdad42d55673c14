use serde::{Deserialize, Serialize};

use crate::models::DocumentUploadResponse;

/// Identity of one selected file. Updates are routed by this id, never by
/// position, so completions may arrive in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UploadId(uuid::Uuid);

impl UploadId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
    pub size: u64,
}

impl FileRef {
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploading,
    Success,
    Error,
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, UploadStatus::Uploading)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Uploading => "uploading",
            UploadStatus::Success => "success",
            UploadStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadProgress {
    pub id: UploadId,
    pub file: FileRef,
    pub progress: u8,
    pub status: UploadStatus,
    pub error: Option<String>,
    pub result: Option<DocumentUploadResponse>,
}

impl UploadProgress {
    pub fn uploading(id: UploadId, file: FileRef) -> Self {
        Self {
            id,
            file,
            progress: 0,
            status: UploadStatus::Uploading,
            error: None,
            result: None,
        }
    }

    /// An item that failed local validation and was never sent.
    pub fn rejected(id: UploadId, file: FileRef, message: String) -> Self {
        Self {
            id,
            file,
            progress: 0,
            status: UploadStatus::Error,
            error: Some(message),
            result: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadList {
    items: Vec<UploadProgress>,
}

impl UploadList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: UploadProgress) {
        self.items.push(item);
    }

    /// Progress only moves an item that is still uploading; late reports
    /// for a finished item are dropped.
    pub fn set_progress(&mut self, id: UploadId, percent: u8) -> bool {
        match self.get_mut(id) {
            Some(item) if item.status == UploadStatus::Uploading => {
                item.progress = percent.min(100);
                true
            }
            _ => false,
        }
    }

    pub fn complete(&mut self, id: UploadId, response: DocumentUploadResponse) -> bool {
        match self.get_mut(id) {
            Some(item) => {
                item.status = UploadStatus::Success;
                item.progress = 100;
                item.error = None;
                item.result = Some(response);
                true
            }
            None => false,
        }
    }

    pub fn fail(&mut self, id: UploadId, message: String) -> bool {
        match self.get_mut(id) {
            Some(item) => {
                item.status = UploadStatus::Error;
                item.error = Some(message);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: UploadId) -> Option<UploadProgress> {
        let pos = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(pos))
    }

    pub fn get(&self, id: UploadId) -> Option<&UploadProgress> {
        self.items.iter().find(|i| i.id == id)
    }

    fn get_mut(&mut self, id: UploadId) -> Option<&mut UploadProgress> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UploadProgress> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_uploading(&self) -> bool {
        self.items
            .iter()
            .any(|i| i.status == UploadStatus::Uploading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> FileRef {
        FileRef {
            name: name.into(),
            size: 2048,
        }
    }

    fn done(name: &str) -> DocumentUploadResponse {
        DocumentUploadResponse {
            document_id: format!("id-{name}"),
            filename: name.into(),
            chunks_created: 4,
            message: "ok".into(),
        }
    }

    #[test]
    fn test_out_of_order_completion_keyed_by_id() {
        let mut list = UploadList::new();
        let ids: Vec<UploadId> = (0..3).map(|_| UploadId::new()).collect();
        for (i, id) in ids.iter().enumerate() {
            list.add(UploadProgress::uploading(*id, file(&format!("f{i}.pdf"))));
        }

        list.set_progress(ids[0], 40);
        assert!(list.complete(ids[2], done("f2.pdf")));
        assert!(list.fail(ids[0], "Error processing document".into()));
        list.set_progress(ids[1], 70);

        assert_eq!(list.get(ids[0]).unwrap().status, UploadStatus::Error);
        assert_eq!(list.get(ids[0]).unwrap().progress, 40);
        assert_eq!(list.get(ids[1]).unwrap().progress, 70);
        assert_eq!(list.get(ids[2]).unwrap().status, UploadStatus::Success);
        assert_eq!(list.get(ids[2]).unwrap().progress, 100);
        assert!(list.is_uploading());
    }

    #[test]
    fn test_late_progress_ignored_after_terminal() {
        let mut list = UploadList::new();
        let id = UploadId::new();
        list.add(UploadProgress::uploading(id, file("a.txt")));
        list.complete(id, done("a.txt"));
        assert!(!list.set_progress(id, 30));
        assert_eq!(list.get(id).unwrap().progress, 100);
    }

    #[test]
    fn test_remove_leaves_others() {
        let mut list = UploadList::new();
        let a = UploadId::new();
        let b = UploadId::new();
        list.add(UploadProgress::uploading(a, file("a.pdf")));
        list.add(UploadProgress::rejected(b, file("b.exe"), "bad type".into()));

        let removed = list.remove(a).unwrap();
        assert_eq!(removed.file.name, "a.pdf");
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(b).unwrap().error.as_deref(), Some("bad type"));
        assert!(!list.is_uploading());
        assert!(list.remove(a).is_none());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UploadStatus::Uploading).unwrap(),
            "\"uploading\""
        );
    }
}
