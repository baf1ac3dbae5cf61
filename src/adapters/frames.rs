use crate::domain::model::Frame;
use crate::domain::ports::FrameSource;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Serves JPEG files from disk as camera frames, one per call.
#[derive(Debug)]
pub struct LocalFrameSource {
    files: Vec<PathBuf>,
    cursor: AtomicUsize,
    cycle: bool,
}

impl LocalFrameSource {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            cursor: AtomicUsize::new(0),
            cycle: false,
        }
    }

    /// Collects `*.jpg` / `*.jpeg` files of a directory in name order.
    pub async fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let mut entries = tokio::fs::read_dir(dir.as_ref()).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_jpeg = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "jpg" | "jpeg"))
                .unwrap_or(false);
            if is_jpeg {
                files.push(path);
            }
        }
        files.sort();
        tracing::debug!("📷 {} frames found in {}", files.len(), dir.as_ref().display());
        Ok(Self::new(files))
    }

    /// Start over from the first file once every file has been served.
    pub fn cycle(mut self, cycle: bool) -> Self {
        self.cycle = cycle;
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn next_path(&self) -> Option<&PathBuf> {
        if self.files.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        if self.cycle {
            self.files.get(index % self.files.len())
        } else {
            self.files.get(index)
        }
    }
}

impl FrameSource for LocalFrameSource {
    async fn next_frame(&self) -> Option<Frame> {
        let path = self.next_path()?;
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "frame.jpg".to_string());
                Some(Frame::new(file_name, bytes))
            }
            Err(e) => {
                tracing::warn!("📷 Cannot read frame {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_frames_served_in_name_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.jpg"), b"second").unwrap();
        std::fs::write(dir.path().join("a.JPG"), b"first").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"skip").unwrap();

        let source = LocalFrameSource::from_dir(dir.path()).await.unwrap();
        assert_eq!(source.len(), 2);

        let first = source.next_frame().await.unwrap();
        assert_eq!(first.file_name, "a.JPG");
        assert_eq!(first.bytes, b"first");
        assert_eq!(source.next_frame().await.unwrap().bytes, b"second");
        assert!(source.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn test_cycle_restarts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shelf.jpg");
        std::fs::write(&path, b"jpeg").unwrap();

        let source = LocalFrameSource::new(vec![path]).cycle(true);
        for _ in 0..3 {
            assert!(source.next_frame().await.is_some());
        }
    }

    #[tokio::test]
    async fn test_missing_file_gives_no_frame() {
        let source = LocalFrameSource::new(vec![PathBuf::from("/nonexistent/frame.jpg")]);
        assert!(source.next_frame().await.is_none());
        assert!(LocalFrameSource::new(Vec::new()).next_frame().await.is_none());
    }
}
