//! Caller-owned list of PDFs waiting to be merged.

use crate::error::SuiteError;
use crate::tools::pdf::{merge_pdfs, NamedFile};
use tracing::debug;

/// Ordered merge queue. Pages are appended in queue order.
#[derive(Debug, Default, Clone)]
pub struct MergeQueue {
    files: Vec<NamedFile>,
}

impl MergeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: NamedFile) {
        debug!("Queued {} for merge", file.name);
        self.files.push(file);
    }

    pub fn extend(&mut self, files: impl IntoIterator<Item = NamedFile>) {
        for file in files {
            self.push(file);
        }
    }

    /// Remove the file at `index`; `None` if out of bounds.
    pub fn remove(&mut self, index: usize) -> Option<NamedFile> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    pub fn files(&self) -> &[NamedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Merge the queue. The queue is emptied only when the merge succeeds.
    pub async fn merge(&mut self) -> Result<NamedFile, SuiteError> {
        if self.files.len() < 2 {
            return Err(SuiteError::NotEnoughFiles {
                count: self.files.len(),
            });
        }
        let merged = merge_pdfs(self.files.clone()).await?;
        self.files.clear();
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> NamedFile {
        NamedFile::new(name, b"%PDF-1.7".to_vec())
    }

    #[test]
    fn push_extend_remove_keep_order() {
        let mut q = MergeQueue::new();
        q.push(file("a.pdf"));
        q.extend([file("b.pdf"), file("c.pdf")]);
        assert_eq!(q.remove(1).map(|f| f.name), Some("b.pdf".to_string()));
        assert!(q.remove(5).is_none());
        let names: Vec<_> = q.files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a.pdf", "c.pdf"]);
    }

    #[tokio::test]
    async fn short_queue_is_kept_on_error() {
        let mut q = MergeQueue::new();
        q.push(file("only.pdf"));
        let err = q.merge().await.unwrap_err();
        assert!(matches!(err, SuiteError::NotEnoughFiles { count: 1 }));
        assert_eq!(q.len(), 1);
    }
}
