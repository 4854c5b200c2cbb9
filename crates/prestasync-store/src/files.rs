//! Local-directory file hosting: uploads land under a configured directory
//! and come back as `file://` URLs. Stands in for a real CDN-backed file
//! service when running the sync from the CLI.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use prestasync_core::store::{FileStore, StoreError};

pub struct LocalFiles {
    root: PathBuf,
    seq: AtomicU64,
}

impl LocalFiles {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            seq: AtomicU64::new(0),
        }
    }
}

impl FileStore for LocalFiles {
    async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<String, StoreError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(StoreError::backend)?;

        // A sequence prefix keeps same-named uploads (every image of a
        // product shares its handle-derived filename) from clobbering each
        // other within a run.
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let path = self.root.join(format!("{seq}-{filename}"));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(StoreError::backend)?;

        Ok(format!("file://{}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_writes_bytes_and_returns_file_url() {
        let dir = std::env::temp_dir().join(format!("prestasync-files-{}", std::process::id()));
        let files = LocalFiles::new(&dir);

        let url = files.upload("shirt.jpeg", &[1, 2, 3]).await.unwrap();
        assert!(url.starts_with("file://"));

        let path = url.trim_start_matches("file://");
        let written = tokio::fs::read(path).await.unwrap();
        assert_eq!(written, vec![1, 2, 3]);

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn repeated_uploads_do_not_clobber() {
        let dir = std::env::temp_dir().join(format!("prestasync-files2-{}", std::process::id()));
        let files = LocalFiles::new(&dir);

        let a = files.upload("shirt.jpeg", b"first").await.unwrap();
        let b = files.upload("shirt.jpeg", b"second").await.unwrap();
        assert_ne!(a, b);

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
