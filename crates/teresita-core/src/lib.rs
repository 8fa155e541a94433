//! Teresita Core - Content loading, caching, and domain types.
//!
//! The site's blog posts and museum artworks are markdown files with YAML
//! front-matter, listed per content type and language in a `manifest.json`.
//! [`ContentLoader`] fetches them through a [`ContentSource`], validates them,
//! caches the results and keeps a ledger of recent failures.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod frontmatter;
pub mod health;
pub mod loader;
pub mod manifest;
pub mod models;
pub mod source;
pub mod stats;

#[cfg(test)]
mod test_support;

pub use cache::{ContentCache, ErrorRecord};
pub use catalog::{ALL_CATEGORIES, DEFAULT_RELATED_LIMIT};
pub use config::{
    default_config_path, load_loader_config, CacheConfig, HttpConfig, LoaderConfig, RetryConfig,
    TimeoutConfig,
};
pub use error::ContentError;
pub use health::{CheckStatus, HealthReport, HealthStatus};
pub use loader::{ContentLoader, ManifestOrigin};
pub use manifest::Manifest;
pub use models::{
    calculate_reading_time, BlogPost, ContentKind, ContentType, Document, FeaturedImage, Language,
    Metadata, MuseumArtwork, Order,
};
pub use source::ContentSource;
pub use stats::{EntryOutcome, LoadStats};
