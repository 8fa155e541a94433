//! Transport seam between the loader and wherever content lives.

use async_trait::async_trait;

use crate::error::ContentError;

#[cfg(any(test, feature = "mock"))]
pub use self::memory::MemorySource;

/// Something that can return the text at a content path.
///
/// Paths are absolute site paths such as `/content/blog/en/manifest.json`.
/// Implementations map them onto their own storage and report failures as
/// [`ContentError`]: non-2xx answers as `HttpStatus`, connection trouble as
/// `NetworkError`. Deadlines are applied by the loader, so an implementation
/// does not need its own per-request timeout.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    async fn fetch_text(&self, path: &str) -> Result<String, ContentError>;
}

#[cfg(any(test, feature = "mock"))]
mod memory {
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::ContentSource;
    use crate::error::ContentError;

    #[derive(Debug, Clone)]
    enum MemoryEntry {
        Text(String),
        Status(u16),
        Delayed(Duration, String),
    }

    /// In-memory content source for testing.
    ///
    /// Paths that were never inserted answer `404`. Every fetch is counted,
    /// so tests can assert on how many requests the loader issued.
    ///
    /// # Examples
    ///
    /// ```
    /// use teresita_core::source::{ContentSource, MemorySource};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let source = MemorySource::with_files([
    ///     ("/content/blog/en/manifest.json", r#"{"files": []}"#),
    /// ]);
    /// assert!(source.fetch_text("/content/blog/en/manifest.json").await.is_ok());
    /// assert!(source.fetch_text("/content/blog/es/manifest.json").await.is_err());
    /// assert_eq!(source.hits("/content/blog/es/manifest.json"), 1);
    /// # }
    /// ```
    #[derive(Debug, Default)]
    pub struct MemorySource {
        entries: Mutex<HashMap<String, MemoryEntry>>,
        hits: Mutex<HashMap<String, usize>>,
    }

    impl MemorySource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_files(
            files: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
        ) -> Self {
            let source = Self::new();
            for (path, text) in files {
                source.insert(path, text);
            }
            source
        }

        pub fn insert(&self, path: impl Into<String>, text: impl Into<String>) {
            self.entries
                .lock()
                .insert(path.into(), MemoryEntry::Text(text.into()));
        }

        /// Makes `path` answer with the given HTTP status.
        pub fn fail(&self, path: impl Into<String>, status: u16) {
            self.entries
                .lock()
                .insert(path.into(), MemoryEntry::Status(status));
        }

        /// Makes `path` answer `text` only after `delay`.
        pub fn delay(&self, path: impl Into<String>, delay: Duration, text: impl Into<String>) {
            self.entries
                .lock()
                .insert(path.into(), MemoryEntry::Delayed(delay, text.into()));
        }

        pub fn remove(&self, path: &str) {
            self.entries.lock().remove(path);
        }

        /// Number of fetches issued for `path`.
        pub fn hits(&self, path: &str) -> usize {
            self.hits.lock().get(path).copied().unwrap_or(0)
        }

        pub fn total_hits(&self) -> usize {
            self.hits.lock().values().sum()
        }
    }

    #[async_trait]
    impl ContentSource for MemorySource {
        fn name(&self) -> &str {
            "memory"
        }

        async fn fetch_text(&self, path: &str) -> Result<String, ContentError> {
            *self.hits.lock().entry(path.to_string()).or_default() += 1;

            let entry = self.entries.lock().get(path).cloned();
            match entry {
                Some(MemoryEntry::Text(text)) => Ok(text),
                Some(MemoryEntry::Delayed(delay, text)) => {
                    tokio::time::sleep(delay).await;
                    Ok(text)
                }
                Some(MemoryEntry::Status(status)) => Err(ContentError::HttpStatus {
                    status,
                    url: path.to_string(),
                }),
                None => Err(ContentError::HttpStatus {
                    status: 404,
                    url: path.to_string(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_source_counts_hits() {
        let source = MemorySource::with_files([("/a.md", "---\ntitle: A\n---\n")]);

        assert!(source.fetch_text("/a.md").await.is_ok());
        assert!(source.fetch_text("/a.md").await.is_ok());
        assert_eq!(source.hits("/a.md"), 2);
        assert_eq!(source.hits("/b.md"), 0);
    }

    #[tokio::test]
    async fn test_memory_source_failures() {
        let source = MemorySource::new();
        source.fail("/down.md", 503);

        match source.fetch_text("/down.md").await {
            Err(ContentError::HttpStatus { status, url }) => {
                assert_eq!(status, 503);
                assert_eq!(url, "/down.md");
            }
            other => panic!("Expected HttpStatus, got {:?}", other),
        }
        assert!(matches!(
            source.fetch_text("/missing.md").await,
            Err(ContentError::HttpStatus { status: 404, .. })
        ));
        assert_eq!(source.total_hits(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_source_delay() {
        let source = MemorySource::new();
        source.delay("/slow.md", std::time::Duration::from_secs(20), "late");

        let start = tokio::time::Instant::now();
        assert_eq!(source.fetch_text("/slow.md").await.unwrap(), "late");
        assert!(start.elapsed() >= std::time::Duration::from_secs(20));
    }
}
