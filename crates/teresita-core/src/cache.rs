//! In-memory content cache and error ledger.
//!
//! The cache has three logical partitions: manifests, whole collections and
//! single-document lookups, each entry stamped with the instant it was
//! written. The error ledger sits next to them, keyed like the fetch
//! operations, and drives retry suppression.
//!
//! Every partition is behind its own `parking_lot::Mutex`. Locks are taken
//! for one read or one write and never held across an `.await`, so two
//! overlapping loads of the same key may both fetch; the last one to finish
//! wins the write.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use crate::error::ContentError;
use crate::manifest::Manifest;
use crate::models::{BlogPost, ContentKind, ContentType, Language, MuseumArtwork};

#[derive(Debug)]
struct Entry<V> {
    value: V,
    written_at: Instant,
}

/// A key/value map whose entries remember when they were written.
#[derive(Debug)]
pub struct Tier<K, V> {
    entries: HashMap<K, Entry<V>>,
}

impl<K: Eq + Hash, V: Clone> Tier<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the value if it was written less than `ttl` before `now`.
    pub fn fresh(&self, key: &K, ttl: Duration, now: Instant) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| now.saturating_duration_since(entry.written_at) < ttl)
            .map(|entry| entry.value.clone())
    }

    /// Returns the value regardless of age.
    pub fn stale(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn insert(&mut self, key: K, value: V, now: Instant) {
        self.entries.insert(
            key,
            Entry {
                value,
                written_at: now,
            },
        );
    }

    pub fn remove(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.entries.retain(|key, _| keep(key));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash, V: Clone> Default for Tier<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Collection and single-document partitions for one content kind.
#[derive(Debug)]
pub struct CollectionStore<C> {
    collections: Mutex<Tier<Language, Arc<[C]>>>,
    documents: Mutex<Tier<(Language, String), C>>,
}

impl<C: Clone> CollectionStore<C> {
    fn new() -> Self {
        Self {
            collections: Mutex::new(Tier::new()),
            documents: Mutex::new(Tier::new()),
        }
    }

    pub fn fresh_collection(
        &self,
        language: Language,
        ttl: Duration,
        now: Instant,
    ) -> Option<Arc<[C]>> {
        self.collections.lock().fresh(&language, ttl, now)
    }

    pub fn stale_collection(&self, language: Language) -> Option<Arc<[C]>> {
        self.collections.lock().stale(&language)
    }

    pub fn store_collection(&self, language: Language, items: Arc<[C]>, now: Instant) {
        self.collections.lock().insert(language, items, now);
    }

    pub fn fresh_document(
        &self,
        language: Language,
        slug: &str,
        ttl: Duration,
        now: Instant,
    ) -> Option<C> {
        self.documents
            .lock()
            .fresh(&(language, slug.to_string()), ttl, now)
    }

    pub fn store_document(&self, language: Language, slug: String, document: C, now: Instant) {
        self.documents.lock().insert((language, slug), document, now);
    }

    pub fn cached_documents(&self) -> usize {
        self.documents.lock().len()
    }

    /// Drops the collection and every single-document entry of `language`.
    pub fn invalidate(&self, language: Language) {
        self.collections.lock().remove(&language);
        self.documents.lock().retain(|(lang, _)| *lang != language);
    }

    pub fn clear(&self) {
        self.collections.lock().clear();
        self.documents.lock().clear();
    }
}

/// Selects the [`CollectionStore`] of a content kind.
pub trait CacheSlot: ContentKind {
    fn store(cache: &ContentCache) -> &CollectionStore<Self>;
}

impl CacheSlot for BlogPost {
    fn store(cache: &ContentCache) -> &CollectionStore<Self> {
        &cache.blog
    }
}

impl CacheSlot for MuseumArtwork {
    fn store(cache: &ContentCache) -> &CollectionStore<Self> {
        &cache.museum
    }
}

/// One recorded failure.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    /// Ledger key, e.g. `file:/content/blog/en/a.md`.
    pub context: String,
    pub message: String,
    /// Messages of the underlying error sources, outermost first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    pub at: Instant,
}

impl ErrorRecord {
    pub fn new(context: impl Into<String>, error: &ContentError, at: Instant) -> Self {
        let mut chain = Vec::new();
        let mut source = std::error::Error::source(error);
        while let Some(err) = source {
            chain.push(err.to_string());
            source = std::error::Error::source(err);
        }

        Self {
            context: context.into(),
            message: error.to_string(),
            chain,
            url: None,
            attempts: None,
            timestamp: Utc::now(),
            at,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }
}

/// Latest failure per key.
#[derive(Debug, Default)]
pub struct ErrorLedger {
    records: HashMap<String, ErrorRecord>,
}

impl ErrorLedger {
    /// Stores `record`, replacing any previous failure for the same key.
    pub fn record(&mut self, record: ErrorRecord) {
        self.records.insert(record.context.clone(), record);
    }

    pub fn get(&self, key: &str) -> Option<&ErrorRecord> {
        self.records.get(key)
    }

    /// True unless `key` failed less than `delay` before `now`.
    pub fn can_retry(&self, key: &str, delay: Duration, now: Instant) -> bool {
        match self.records.get(key) {
            Some(record) => now.saturating_duration_since(record.at) > delay,
            None => true,
        }
    }

    /// Failures younger than `window`, most recent first.
    pub fn recent(&self, window: Duration, now: Instant) -> Vec<ErrorRecord> {
        let mut recent: Vec<_> = self
            .records
            .values()
            .filter(|record| now.saturating_duration_since(record.at) < window)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.at.cmp(&a.at).then_with(|| a.context.cmp(&b.context)));
        recent
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Ledger keys, one scheme per fetch operation.
pub mod keys {
    use crate::models::{ContentType, Language};

    pub fn fetch(path: &str) -> String {
        format!("fetch:{}", path)
    }

    pub fn file(path: &str) -> String {
        format!("file:{}", path)
    }

    pub fn parse(filename: &str) -> String {
        format!("parse:{}", filename)
    }

    pub fn manifest(content_type: ContentType, language: Language) -> String {
        format!("manifest:{}/{}", content_type, language)
    }

    pub fn collection(content_type: ContentType, language: Language) -> String {
        format!("collection:{}/{}", content_type, language)
    }

    pub fn document(content_type: ContentType, language: Language, slug: &str) -> String {
        format!("document:{}/{}/{}", content_type, language, slug)
    }
}

/// Process-wide content cache, owned by a [`ContentLoader`](crate::ContentLoader).
#[derive(Debug)]
pub struct ContentCache {
    manifests: Mutex<Tier<(ContentType, Language), Arc<Manifest>>>,
    blog: CollectionStore<BlogPost>,
    museum: CollectionStore<MuseumArtwork>,
    errors: Mutex<ErrorLedger>,
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentCache {
    pub fn new() -> Self {
        Self {
            manifests: Mutex::new(Tier::new()),
            blog: CollectionStore::new(),
            museum: CollectionStore::new(),
            errors: Mutex::new(ErrorLedger::default()),
        }
    }

    pub fn fresh_manifest(
        &self,
        content_type: ContentType,
        language: Language,
        ttl: Duration,
        now: Instant,
    ) -> Option<Arc<Manifest>> {
        self.manifests
            .lock()
            .fresh(&(content_type, language), ttl, now)
    }

    pub fn stale_manifest(
        &self,
        content_type: ContentType,
        language: Language,
    ) -> Option<Arc<Manifest>> {
        self.manifests.lock().stale(&(content_type, language))
    }

    pub fn store_manifest(
        &self,
        content_type: ContentType,
        language: Language,
        manifest: Arc<Manifest>,
        now: Instant,
    ) {
        self.manifests
            .lock()
            .insert((content_type, language), manifest, now);
    }

    /// Collection partitions of the content kind `C`.
    pub fn store<C: CacheSlot>(&self) -> &CollectionStore<C> {
        C::store(self)
    }

    /// Drops the manifest, collection and single documents of one bucket.
    pub fn invalidate(&self, content_type: ContentType, language: Language) {
        self.manifests.lock().remove(&(content_type, language));
        match content_type {
            ContentType::Blog => self.blog.invalidate(language),
            ContentType::Museum => self.museum.invalidate(language),
        }
    }

    /// Drops every cached value and every recorded error.
    pub fn invalidate_all(&self) {
        self.manifests.lock().clear();
        self.blog.clear();
        self.museum.clear();
        self.errors.lock().clear();
    }

    pub fn record_error(&self, record: ErrorRecord) {
        self.errors.lock().record(record);
    }

    pub fn can_retry(&self, key: &str, delay: Duration, now: Instant) -> bool {
        self.errors.lock().can_retry(key, delay, now)
    }

    pub fn recent_errors(&self, window: Duration, now: Instant) -> Vec<ErrorRecord> {
        self.errors.lock().recent(window, now)
    }

    pub fn error(&self, key: &str) -> Option<ErrorRecord> {
        self.errors.lock().get(key).cloned()
    }
}
