//! The content loader service.
//!
//! [`ContentLoader`] owns the cache and a [`ContentSource`] and implements the
//! fetch pipeline: manifest resolution, document fetch with retry, front-matter
//! validation, collection fan-out and single-document lookup. None of the
//! public operations fail: transport and validation problems end up in the
//! error ledger and the caller gets stale data, an empty collection or `None`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::cache::{keys, CacheSlot, ContentCache, ErrorRecord};
use crate::config::LoaderConfig;
use crate::error::ContentError;
use crate::frontmatter;
use crate::manifest::Manifest;
use crate::models::{ContentKind, ContentType, Document, Language, DOCUMENT_EXTENSION};
use crate::source::ContentSource;
use crate::stats::{EntryOutcome, LoadStats};

/// Where a resolved manifest came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestOrigin {
    /// Fresh cache entry
    Cache,
    /// Just fetched
    Network,
    /// Refresh failed, previous value served
    Stale,
}

/// Cached, fault-tolerant access to blog and museum content.
///
/// Construct one per application and share it (it is `Send + Sync`); each
/// instance has its own cache, so tests get isolation by building a fresh
/// loader.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use teresita_core::{ContentLoader, Language, LoaderConfig};
/// # use teresita_core::source::ContentSource;
///
/// # async fn example(source: Arc<dyn ContentSource>) {
/// let loader = ContentLoader::new(source, LoaderConfig::default());
/// let posts = loader.blog_posts(Language::Es).await;
/// println!("{} posts", posts.len());
/// # }
/// ```
pub struct ContentLoader {
    source: Arc<dyn ContentSource>,
    config: LoaderConfig,
    cache: ContentCache,
}

impl ContentLoader {
    pub fn new(source: Arc<dyn ContentSource>, config: LoaderConfig) -> Self {
        Self {
            source,
            config,
            cache: ContentCache::new(),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    fn content_root(&self) -> &str {
        self.config.content_root.trim_end_matches('/')
    }

    /// `<content_root>/<type>/<lang>/manifest.json`
    pub fn manifest_path(&self, content_type: ContentType, language: Language) -> String {
        format!(
            "{}/{}/{}/manifest.json",
            self.content_root(),
            content_type,
            language
        )
    }

    /// `<content_root>/<type>/<lang>/<filename>`
    pub fn document_path(
        &self,
        content_type: ContentType,
        language: Language,
        filename: &str,
    ) -> String {
        format!(
            "{}/{}/{}/{}",
            self.content_root(),
            content_type,
            language,
            filename
        )
    }

    pub(crate) fn record_error(&self, record: ErrorRecord) {
        error!("[{}] {}", record.context, record.message);
        self.cache.record_error(record);
    }

    /// Fetches `path` with a deadline, the configured default one when
    /// `deadline` is `None`.
    ///
    /// Every failure, including the deadline expiring, is recorded under
    /// `fetch:<path>` before being returned. No retry happens here.
    pub async fn safe_fetch(
        &self,
        path: &str,
        deadline: Option<Duration>,
    ) -> Result<String, ContentError> {
        let deadline = deadline.unwrap_or_else(|| self.config.timeouts.default_timeout());
        let result = match timeout(deadline, self.source.fetch_text(path)).await {
            Ok(result) => result,
            Err(_) => Err(ContentError::Timeout(deadline)),
        };

        if let Err(e) = &result {
            self.record_error(
                ErrorRecord::new(keys::fetch(path), e, Instant::now()).with_url(path),
            );
        }

        result
    }

    /// Returns the file list of one bucket, or `None` if no manifest was
    /// ever obtained.
    pub async fn fetch_manifest(
        &self,
        content_type: ContentType,
        language: Language,
    ) -> Option<Arc<Manifest>> {
        self.resolve_manifest(content_type, language)
            .await
            .map(|(manifest, _)| manifest)
    }

    pub(crate) async fn resolve_manifest(
        &self,
        content_type: ContentType,
        language: Language,
    ) -> Option<(Arc<Manifest>, ManifestOrigin)> {
        let ttl = self.config.cache.manifest_ttl();
        if let Some(manifest) = self
            .cache
            .fresh_manifest(content_type, language, ttl, Instant::now())
        {
            debug!("Cache HIT: manifest {}/{}", content_type, language);
            return Some((manifest, ManifestOrigin::Cache));
        }

        let path = self.manifest_path(content_type, language);
        match self.download_manifest(content_type, language, &path).await {
            Ok(manifest) => {
                let manifest = Arc::new(manifest);
                self.cache
                    .store_manifest(content_type, language, manifest.clone(), Instant::now());
                Some((manifest, ManifestOrigin::Network))
            }
            Err(e) => {
                self.record_error(
                    ErrorRecord::new(keys::manifest(content_type, language), &e, Instant::now())
                        .with_url(&path),
                );
                let stale = self.cache.stale_manifest(content_type, language)?;
                warn!("Using stale manifest for {}/{}", content_type, language);
                Some((stale, ManifestOrigin::Stale))
            }
        }
    }

    async fn download_manifest(
        &self,
        content_type: ContentType,
        language: Language,
        path: &str,
    ) -> Result<Manifest, ContentError> {
        let text = self
            .safe_fetch(path, Some(self.config.timeouts.manifest()))
            .await?;
        Manifest::parse(&text, content_type, language)
    }

    /// Fetches the raw text of one markdown file, retrying with a linear
    /// backoff.
    ///
    /// Returns `None` without any request while a previous failure of the
    /// same path is younger than the suppression delay. A body containing
    /// neither `---` nor `title:` (typically an HTML error page) counts as a
    /// failed attempt.
    pub async fn fetch_markdown(&self, path: &str) -> Option<String> {
        let key = keys::file(path);
        let retry = &self.config.retry;

        if !self.cache.can_retry(&key, retry.suppression(), Instant::now()) {
            warn!("Skipping {} - retry delay not elapsed", path);
            return None;
        }

        let attempts = retry.max_retries + 1;
        let mut last_error = ContentError::Generic("No attempts made".to_string());

        for attempt in 1..=attempts {
            let result = self
                .safe_fetch(path, Some(self.config.timeouts.document()))
                .await
                .and_then(|text| {
                    if text.contains("---") || text.contains("title:") {
                        Ok(text)
                    } else {
                        Err(ContentError::invalid_document(path, "Invalid markdown format"))
                    }
                });

            match result {
                Ok(text) => return Some(text),
                Err(e) => {
                    last_error = e;
                    if attempt < attempts {
                        let delay = retry.delay_after(attempt);
                        debug!(
                            "Attempt {}/{} for {} failed, retrying in {} ms",
                            attempt,
                            attempts,
                            path,
                            delay.as_millis()
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        self.record_error(
            ErrorRecord::new(key, &last_error, Instant::now())
                .with_url(path)
                .with_attempts(attempts),
        );
        None
    }

    /// Fetches and validates one file into a typed record.
    async fn load_entry<C: ContentKind>(
        &self,
        language: Language,
        filename: &str,
    ) -> Result<C, ContentError> {
        let path = self.document_path(C::CONTENT_TYPE, language, filename);

        let text = self
            .fetch_markdown(&path)
            .await
            .ok_or_else(|| ContentError::Generic(format!("No content returned for {}", path)))?;

        let parsed = frontmatter::parse(&text, filename).inspect_err(|e| {
            self.record_error(ErrorRecord::new(keys::parse(&path), e, Instant::now()));
        })?;

        let slug = filename
            .strip_suffix(DOCUMENT_EXTENSION)
            .unwrap_or(filename)
            .to_string();

        Ok(C::from_document(Document {
            slug,
            language,
            filename: filename.to_string(),
            metadata: parsed.metadata,
            body: parsed.body,
            loaded_at: Utc::now(),
        }))
    }

    /// Returns the published documents of one kind and language, sorted.
    ///
    /// Serves the cached collection while it is fresh. Otherwise fetches
    /// every file named in the manifest concurrently; a file that fails is
    /// left out and logged. When nothing usable comes back the previous
    /// collection (however old) or an empty one is returned.
    pub async fn collection<C: CacheSlot>(&self, language: Language) -> Arc<[C]> {
        let content_type = C::CONTENT_TYPE;
        let store = self.cache.store::<C>();
        let ttl = self.config.cache.collection_ttl();

        if let Some(cached) = store.fresh_collection(language, ttl, Instant::now()) {
            debug!("Cache HIT: {} ({})", content_type, language);
            return cached;
        }

        let previous = || {
            store
                .stale_collection(language)
                .unwrap_or_else(|| Arc::from(Vec::new()))
        };

        info!("Loading {} documents ({})...", content_type, language);

        let manifest = match self.fetch_manifest(content_type, language).await {
            Some(manifest) if !manifest.is_empty() => manifest,
            _ => {
                warn!("No manifest files for {}/{}", content_type, language);
                return previous();
            }
        };

        let results = join_all(
            manifest
                .files
                .iter()
                .map(|filename| self.load_entry::<C>(language, filename)),
        )
        .await;

        let mut stats = LoadStats::new();
        let mut items = Vec::with_capacity(results.len());
        for (filename, result) in manifest.files.iter().zip(results) {
            match result {
                Ok(item) if item.document().is_published() => {
                    stats.record(EntryOutcome::Loaded);
                    items.push(item);
                }
                Ok(_) => stats.record(EntryOutcome::Unpublished),
                Err(e) => {
                    warn!("Failed to load {}: {}", filename, e);
                    stats.record(EntryOutcome::Failed);
                }
            }
        }

        if stats.failed > 0 {
            warn!(
                "Failed to load {}/{} {} documents ({})",
                stats.failed,
                stats.total(),
                content_type,
                language
            );
        }

        if items.is_empty() {
            let err = ContentError::EmptyCollection {
                content_type: content_type.to_string(),
                language: language.to_string(),
            };
            self.record_error(ErrorRecord::new(
                keys::collection(content_type, language),
                &err,
                Instant::now(),
            ));
            return previous();
        }

        items.sort_by(C::collection_order);
        let items: Arc<[C]> = Arc::from(items);
        store.store_collection(language, items.clone(), Instant::now());

        info!(
            "Loaded {} {} documents ({}): {} unpublished, {} failed",
            stats.loaded, content_type, language, stats.unpublished, stats.failed
        );

        items
    }

    /// Looks up one document by slug.
    ///
    /// Tries the single-document cache, then the collection, then a direct
    /// fetch of `<slug>.md`. The direct fetch skips both the manifest and the
    /// publish filter, so an unpublished document stays reachable by its
    /// slug.
    pub async fn document<C: CacheSlot>(&self, slug: &str, language: Language) -> Option<C> {
        let content_type = C::CONTENT_TYPE;

        if !is_valid_slug(slug) {
            warn!("Rejected invalid {} slug '{}'", content_type, slug);
            return None;
        }

        let store = self.cache.store::<C>();
        let ttl = self.config.cache.document_ttl();
        if let Some(document) = store.fresh_document(language, slug, ttl, Instant::now()) {
            debug!("Cache HIT: {} {} ({})", content_type, slug, language);
            return Some(document);
        }

        let collection = self.collection::<C>(language).await;
        if let Some(found) = collection.iter().find(|item| item.document().slug == slug) {
            store.store_document(language, slug.to_string(), found.clone(), Instant::now());
            return Some(found.clone());
        }

        debug!(
            "{} '{}' not in collection ({}), trying direct load",
            content_type, slug, language
        );

        let filename = format!("{}{}", slug, DOCUMENT_EXTENSION);
        match self.load_entry::<C>(language, &filename).await {
            Ok(document) => {
                store.store_document(language, slug.to_string(), document.clone(), Instant::now());
                Some(document)
            }
            Err(e) => {
                let key = keys::document(content_type, language, slug);
                self.record_error(
                    ErrorRecord::new(key, &e, Instant::now())
                        .with_url(self.document_path(content_type, language, &filename)),
                );
                None
            }
        }
    }
}

/// Slugs are single path segments.
fn is_valid_slug(slug: &str) -> bool {
    !slug.trim().is_empty() && !slug.contains(['/', '\\']) && !slug.contains("..")
}
