use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::ContentError;
use crate::models::{ContentType, Language, DOCUMENT_EXTENSION};

/// Listing of the content files of one (content type, language) bucket.
///
/// Served as `<content_root>/<type>/<lang>/manifest.json`:
///
/// ```json
/// { "files": ["welcome.md", "breakfast.md"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub files: Vec<String>,
}

#[derive(Deserialize)]
struct RawManifest {
    files: Vec<Value>,
}

impl Manifest {
    /// Parses a manifest body, dropping every entry that is not a `.md`
    /// filename.
    ///
    /// An empty file list is logged but accepted.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::InvalidManifest` if the body is not a JSON
    /// object with a `files` array.
    ///
    /// # Examples
    ///
    /// ```
    /// use teresita_core::manifest::Manifest;
    /// use teresita_core::models::{ContentType, Language};
    ///
    /// let manifest = Manifest::parse(
    ///     r#"{"files": ["a.md", "notes.txt", 3, "b.md"]}"#,
    ///     ContentType::Blog,
    ///     Language::En,
    /// ).unwrap();
    /// assert_eq!(manifest.files, vec!["a.md", "b.md"]);
    /// ```
    pub fn parse(
        text: &str,
        content_type: ContentType,
        language: Language,
    ) -> Result<Self, ContentError> {
        let raw: RawManifest = serde_json::from_str(text).map_err(|e| {
            ContentError::InvalidManifest(format!(
                "{}/{}: invalid manifest structure: {}",
                content_type, language, e
            ))
        })?;

        if raw.files.is_empty() {
            warn!("Empty manifest for {}/{}", content_type, language);
        }

        let files = raw
            .files
            .into_iter()
            .filter_map(|entry| match entry {
                Value::String(name) if is_document_filename(&name) => Some(name),
                other => {
                    warn!(
                        "Invalid file in manifest {}/{}: {}",
                        content_type, language, other
                    );
                    None
                }
            })
            .collect();

        Ok(Self { files })
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

fn is_document_filename(name: &str) -> bool {
    name.len() > DOCUMENT_EXTENSION.len() && name.ends_with(DOCUMENT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_manifest() {
        let manifest = Manifest::parse(
            r#"{"files": ["a.md", "b.md", "c.md"]}"#,
            ContentType::Museum,
            Language::Es,
        )
        .unwrap();
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest.files[1], "b.md");
    }

    #[test]
    fn test_parse_filters_invalid_entries() {
        let manifest = Manifest::parse(
            r#"{"files": ["a.md", "", ".md", null, "README", "b.MD", "c.md"]}"#,
            ContentType::Blog,
            Language::En,
        )
        .unwrap();
        assert_eq!(manifest.files, vec!["a.md", "c.md"]);
    }

    #[test]
    fn test_parse_empty_files_is_accepted() {
        let manifest =
            Manifest::parse(r#"{"files": []}"#, ContentType::Blog, Language::En).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_parse_extra_keys_are_ignored() {
        let manifest = Manifest::parse(
            r#"{"generated": "2024-01-01", "files": ["a.md"]}"#,
            ContentType::Blog,
            Language::En,
        )
        .unwrap();
        assert_eq!(manifest.files, vec!["a.md"]);
    }

    #[test]
    fn test_parse_rejects_bad_structure() {
        for body in [
            r#"{"files": "a.md"}"#,
            r#"{"entries": []}"#,
            r#"["a.md"]"#,
            "<!doctype html><html></html>",
        ] {
            let result = Manifest::parse(body, ContentType::Blog, Language::En);
            assert!(
                matches!(result, Err(ContentError::InvalidManifest(_))),
                "accepted {}",
                body
            );
        }
    }
}
