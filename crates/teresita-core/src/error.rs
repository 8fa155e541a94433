use std::time::Duration;

use thiserror::Error;

/// Content loader error types.
///
/// This enum represents every failure the loader can observe while fetching,
/// validating and caching content. It uses the `thiserror` crate for ergonomic
/// error handling and automatic conversion from underlying library errors.
///
/// Most of these never reach a UI caller: the loader converts them into an
/// empty result plus an entry in the error ledger. They do surface in the
/// operator CLI and in [`recent_errors`](crate::ContentLoader::recent_errors).
///
/// # Error Conversion
///
/// - `serde_json::Error` → `ContentError::SerializationError`
///
/// # Examples
///
/// ```
/// use teresita_core::error::ContentError;
///
/// fn example() -> Result<(), ContentError> {
///     Err(ContentError::Generic("Something went wrong".to_string()))
/// }
/// assert!(example().is_err());
/// ```
#[derive(Error, Debug)]
pub enum ContentError {
    /// Transport-level failure that is neither a timeout nor a connection
    /// problem (body decoding, redirect loops, I/O on a local source...).
    #[error("Content client error: {0}")]
    ClientError(String),

    /// Network or connection error.
    ///
    /// DNS resolution failures, refused connections, unreachable hosts.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The request did not complete within its deadline.
    #[error("Request timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// A manifest could not be used (bad JSON shape, missing `files` list).
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// A markdown document failed validation.
    #[error("Failed to parse {filename}: {reason}")]
    InvalidDocument { filename: String, reason: String },

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A content path or slug is malformed or escapes the content root.
    #[error("Invalid content path: {0}")]
    InvalidPath(String),

    /// Language code outside the supported set.
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Content type other than `blog` or `museum`.
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// Configuration file missing or malformed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A collection load produced zero valid documents.
    #[error("No {content_type} documents loaded for language {language}")]
    EmptyCollection {
        content_type: String,
        language: String,
    },

    /// Generic error for cases not covered by specific variants.
    ///
    /// Use this sparingly - prefer creating specific error variants.
    #[error("Error: {0}")]
    Generic(String),
}

impl ContentError {
    /// Shorthand for [`ContentError::InvalidDocument`].
    pub fn invalid_document(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        ContentError::InvalidDocument {
            filename: filename.into(),
            reason: reason.into(),
        }
    }

    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            ContentError::NetworkError(msg) => {
                format!(
                    "Network error: {}\n   Check your internet connection and the site URL.",
                    msg
                )
            }
            ContentError::Timeout(duration) => {
                format!(
                    "Request timed out after {} ms.\n   The site may be slow or unreachable. Try again later.",
                    duration.as_millis()
                )
            }
            ContentError::HttpStatus { status: 404, url } => {
                format!(
                    "Not found: {}\n   Check that the manifest lists only files that exist.",
                    url
                )
            }
            ContentError::HttpStatus { status, url } if *status >= 500 => {
                format!(
                    "Server error (HTTP {}) from {}\n   The site may be temporarily unavailable.",
                    status, url
                )
            }
            ContentError::InvalidUrl(url) => {
                format!(
                    "Invalid site URL: {}\n   Example: https://lacasadeteresita.com",
                    url
                )
            }
            ContentError::UnsupportedLanguage(code) => {
                format!("Unsupported language: {}\n   Supported: en, es", code)
            }
            ContentError::ConfigError(msg) => {
                format!("Configuration error: {}\n   Check your loader.toml file.", msg)
            }
            _ => self.to_string(),
        }
    }

    /// Returns true for failures raised by the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ContentError::ClientError(_)
                | ContentError::NetworkError(_)
                | ContentError::Timeout(_)
                | ContentError::HttpStatus { .. }
        )
    }
}
