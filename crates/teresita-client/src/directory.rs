use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use teresita_core::error::ContentError;
use teresita_core::source::ContentSource;
use tracing::debug;

/// Content source that reads site paths from a local directory, typically
/// the site's `public/` folder during development.
///
/// A missing file answers like a web server would, with a 404
/// `ContentError::HttpStatus`, so the loader treats both sources alike.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a site path onto the root directory.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::InvalidPath` for paths that would leave the
    /// root (`..` segments, drive prefixes).
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ContentError> {
        let relative = Path::new(path.trim_start_matches('/'));

        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(segment) => resolved.push(segment),
                Component::CurDir => {}
                _ => return Err(ContentError::InvalidPath(path.to_string())),
            }
        }

        Ok(resolved)
    }
}

#[async_trait]
impl ContentSource for DirectorySource {
    fn name(&self) -> &str {
        "directory"
    }

    async fn fetch_text(&self, path: &str) -> Result<String, ContentError> {
        let file = self.resolve(path)?;
        debug!("Reading {}", file.display());

        match tokio::fs::read_to_string(&file).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ContentError::HttpStatus {
                status: 404,
                url: path.to_string(),
            }),
            Err(e) => Err(ContentError::ClientError(format!(
                "Failed to read {}: {}",
                file.display(),
                e
            ))),
        }
    }
}
