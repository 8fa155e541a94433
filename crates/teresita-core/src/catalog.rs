//! Query operations used by the site pages, plus health and cache
//! maintenance.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::time::{timeout, Instant};
use tracing::{error, info};

use crate::cache::ErrorRecord;
use crate::health::{CheckStatus, HealthReport};
use crate::loader::{ContentLoader, ManifestOrigin};
use crate::models::{BlogPost, ContentType, Language, MuseumArtwork};

/// Category filter value that disables filtering.
pub const ALL_CATEGORIES: &str = "All";

/// Default number of entries returned by [`ContentLoader::related_posts`].
pub const DEFAULT_RELATED_LIMIT: usize = 3;

fn matches_category(category: Option<&str>, value: &str) -> bool {
    match category {
        None | Some(ALL_CATEGORIES) => true,
        Some(wanted) => value == wanted,
    }
}

impl ContentLoader {
    /// Published blog posts, most recent first.
    pub async fn blog_posts(&self, language: Language) -> Arc<[BlogPost]> {
        self.collection::<BlogPost>(language).await
    }

    pub async fn blog_post(&self, slug: &str, language: Language) -> Option<BlogPost> {
        self.document::<BlogPost>(slug, language).await
    }

    /// The same post in the other language, matched by slug.
    pub async fn alternate_blog_post(
        &self,
        slug: &str,
        current: Language,
    ) -> Option<BlogPost> {
        self.blog_post(slug, current.alternate()).await
    }

    /// Published posts in `category`; `None` or `"All"` returns everything.
    pub async fn blog_posts_by_category(
        &self,
        category: Option<&str>,
        language: Language,
    ) -> Vec<BlogPost> {
        self.blog_posts(language)
            .await
            .iter()
            .filter(|post| matches_category(category, post.category()))
            .cloned()
            .collect()
    }

    /// Up to `limit` other posts sharing the category of `post`, in
    /// collection order.
    pub async fn related_posts(
        &self,
        post: &BlogPost,
        language: Language,
        limit: usize,
    ) -> Vec<BlogPost> {
        self.blog_posts(language)
            .await
            .iter()
            .filter(|other| other.slug != post.slug && other.category() == post.category())
            .take(limit)
            .cloned()
            .collect()
    }

    /// Published artworks, by `order` with unordered entries last.
    pub async fn museum_artworks(&self, language: Language) -> Arc<[MuseumArtwork]> {
        self.collection::<MuseumArtwork>(language).await
    }

    pub async fn museum_artwork(&self, slug: &str, language: Language) -> Option<MuseumArtwork> {
        self.document::<MuseumArtwork>(slug, language).await
    }

    /// Artworks that are published and open to every visitor.
    pub async fn public_museum_artworks(&self, language: Language) -> Vec<MuseumArtwork> {
        self.museum_artworks(language)
            .await
            .iter()
            .filter(|artwork| artwork.is_public())
            .cloned()
            .collect()
    }

    /// Public artworks in `category`; `None` or `"All"` returns every public
    /// artwork.
    pub async fn artworks_by_category(
        &self,
        category: Option<&str>,
        language: Language,
    ) -> Vec<MuseumArtwork> {
        self.public_museum_artworks(language)
            .await
            .into_iter()
            .filter(|artwork| matches_category(category, artwork.category()))
            .collect()
    }

    /// Probes every manifest concurrently.
    ///
    /// Each check is keyed `<type>_<lang>`. If the probes together exceed
    /// the health deadline the report has status `error` and no checks.
    pub async fn health_check(&self) -> HealthReport {
        let probes = ContentType::ALL.iter().flat_map(move |&content_type| {
            Language::ALL.iter().map(move |&language| async move {
                let status = match self.resolve_manifest(content_type, language).await {
                    Some((_, ManifestOrigin::Stale)) => CheckStatus::Stale,
                    Some(_) => CheckStatus::Ok,
                    None => CheckStatus::Missing,
                };
                (format!("{}_{}", content_type, language), status)
            })
        });

        let deadline = self.config().timeouts.health();
        match timeout(deadline, join_all(probes)).await {
            Ok(results) => {
                let checks: BTreeMap<_, _> = results.into_iter().collect();
                let report = HealthReport::new(checks, self.recent_errors());
                info!(
                    "Health check: {} ({} recent errors)",
                    report.status.as_str(),
                    report.errors.len()
                );
                report
            }
            Err(_) => {
                let message = format!(
                    "Health probes did not finish within {} ms",
                    deadline.as_millis()
                );
                error!("{}", message);
                HealthReport::failed(message, self.recent_errors())
            }
        }
    }

    /// Drops cached content.
    ///
    /// With both arguments unset every entry and the whole error ledger are
    /// cleared. Otherwise only the matching buckets are dropped and recorded
    /// errors are kept, so retry suppression still applies.
    pub fn clear_cache(&self, content_type: Option<ContentType>, language: Option<Language>) {
        if content_type.is_none() && language.is_none() {
            self.cache().invalidate_all();
            info!("Cleared all cached content");
            return;
        }

        let types: Vec<_> = content_type.map_or(ContentType::ALL.to_vec(), |t| vec![t]);
        let languages: Vec<_> = language.map_or(Language::ALL.to_vec(), |l| vec![l]);
        for &content_type in &types {
            for &language in &languages {
                self.cache().invalidate(content_type, language);
                info!("Cleared cache for {}/{}", content_type, language);
            }
        }
    }

    /// Failures recorded within the error window, most recent first.
    pub fn recent_errors(&self) -> Vec<ErrorRecord> {
        self.cache()
            .recent_errors(self.config().cache.error_window(), Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cache::keys;
    use crate::config::LoaderConfig;
    use crate::health::HealthStatus;
    use crate::source::MemorySource;
    use crate::test_support::{artwork, blog_loader, manifest, post, BLOG_EN};

    const MUSEUM_EN: &str = "/content/museum/en";

    fn museum_loader() -> (Arc<MemorySource>, ContentLoader) {
        let source = Arc::new(MemorySource::new());
        source.insert(
            format!("{}/manifest.json", MUSEUM_EN),
            manifest(&["virgen.md", "retablo.md", "llama.md", "hidden.md"]),
        );
        source.insert(
            format!("{}/virgen.md", MUSEUM_EN),
            artwork("Virgen", "2", "Painting", "public"),
        );
        source.insert(
            format!("{}/retablo.md", MUSEUM_EN),
            artwork("Retablo", "1", "Folk Art", "public"),
        );
        source.insert(
            format!("{}/llama.md", MUSEUM_EN),
            artwork("Llama", "auto", "Textile", "members"),
        );
        source.insert(
            format!("{}/hidden.md", MUSEUM_EN),
            "---\ntitle: Hidden\npublished: false\n---\n",
        );
        let loader = ContentLoader::new(source.clone(), LoaderConfig::default());
        (source, loader)
    }

    fn travel_blog() -> (Arc<MemorySource>, ContentLoader) {
        blog_loader(
            &["lima.md", "cusco.md", "ceviche.md", "puno.md"],
            &[
                ("lima.md", post("Lima", "2024-01-10", "Travel")),
                ("cusco.md", post("Cusco", "2024-03-10", "Travel")),
                ("ceviche.md", post("Ceviche", "2024-02-10", "Food")),
                ("puno.md", post("Puno", "2023-12-01", "Travel")),
            ],
        )
    }

    fn slugs<T: std::ops::Deref<Target = crate::models::Document>>(items: &[T]) -> Vec<&str> {
        items.iter().map(|item| item.slug.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_blog_posts_by_category() {
        let (_source, loader) = travel_blog();

        let travel = loader
            .blog_posts_by_category(Some("Travel"), Language::En)
            .await;
        assert_eq!(slugs(&travel), vec!["cusco", "lima", "puno"]);

        let all = loader
            .blog_posts_by_category(Some(ALL_CATEGORIES), Language::En)
            .await;
        assert_eq!(all.len(), 4);
        assert_eq!(loader.blog_posts_by_category(None, Language::En).await.len(), 4);
        assert!(loader
            .blog_posts_by_category(Some("Music"), Language::En)
            .await
            .is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_related_posts() {
        let (_source, loader) = travel_blog();
        let lima = loader.blog_post("lima", Language::En).await.unwrap();

        let related = loader
            .related_posts(&lima, Language::En, DEFAULT_RELATED_LIMIT)
            .await;
        assert_eq!(slugs(&related), vec!["cusco", "puno"]);

        let limited = loader.related_posts(&lima, Language::En, 1).await;
        assert_eq!(slugs(&limited), vec!["cusco"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_alternate_blog_post() {
        let (source, loader) = travel_blog();
        source.insert("/content/blog/es/manifest.json", manifest(&["lima.md"]));
        source.insert(
            "/content/blog/es/lima.md",
            post("Lima en español", "2024-01-10", "Viajes"),
        );

        let alternate = loader
            .alternate_blog_post("lima", Language::En)
            .await
            .unwrap();
        assert_eq!(alternate.language, Language::Es);
        assert_eq!(alternate.title(), "Lima en español");

        assert!(loader
            .alternate_blog_post("cusco", Language::En)
            .await
            .is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_museum_queries() {
        let (_source, loader) = museum_loader();

        let all = loader.museum_artworks(Language::En).await;
        assert_eq!(slugs(&all[..]), vec!["retablo", "virgen", "llama"]);

        let public = loader.public_museum_artworks(Language::En).await;
        assert_eq!(slugs(&public), vec!["retablo", "virgen"]);

        let painting = loader
            .artworks_by_category(Some("Painting"), Language::En)
            .await;
        assert_eq!(slugs(&painting), vec!["virgen"]);

        let textile = loader
            .artworks_by_category(Some("Textile"), Language::En)
            .await;
        assert!(textile.is_empty(), "members-only artwork leaked");

        assert_eq!(loader.artworks_by_category(None, Language::En).await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_museum_artwork_by_slug() {
        let (_source, loader) = museum_loader();

        let virgen = loader.museum_artwork("virgen", Language::En).await.unwrap();
        assert_eq!(virgen.title(), "Virgen");

        let hidden = loader.museum_artwork("hidden", Language::En).await.unwrap();
        assert!(!hidden.is_published());

        assert!(loader
            .museum_artwork("nonexistent-slug", Language::En)
            .await
            .is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cache_forces_refetch() {
        let (source, loader) = travel_blog();
        let manifest_path = format!("{}/manifest.json", BLOG_EN);
        let lima_path = format!("{}/lima.md", BLOG_EN);

        loader.blog_posts(Language::En).await;
        loader.blog_posts(Language::En).await;
        assert_eq!(source.hits(&manifest_path), 1);
        assert_eq!(source.hits(&lima_path), 1);

        loader.clear_cache(Some(ContentType::Blog), Some(Language::En));
        loader.blog_posts(Language::En).await;
        assert_eq!(source.hits(&manifest_path), 2);
        assert_eq!(source.hits(&lima_path), 2);

        loader.clear_cache(Some(ContentType::Museum), None);
        loader.blog_posts(Language::En).await;
        assert_eq!(source.hits(&manifest_path), 2);
        assert_eq!(source.hits(&lima_path), 2);

        loader.clear_cache(None, Some(Language::En));
        loader.blog_posts(Language::En).await;
        assert_eq!(source.hits(&manifest_path), 3);
        assert_eq!(source.hits(&lima_path), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cache_errors_only_on_full_clear() {
        let (source, loader) = blog_loader(
            &["a.md", "b.md"],
            &[("a.md", post("A", "2024-01-10", "Travel"))],
        );
        let b_path = format!("{}/b.md", BLOG_EN);

        loader.blog_posts(Language::En).await;
        assert!(loader.cache().error(&keys::file(&b_path)).is_some());

        loader.clear_cache(Some(ContentType::Blog), Some(Language::En));
        assert!(loader.cache().error(&keys::file(&b_path)).is_some());

        loader.clear_cache(None, None);
        assert!(loader.recent_errors().is_empty());

        source.insert(b_path.clone(), post("B", "2024-02-10", "Travel"));
        let posts = loader.blog_posts(Language::En).await;
        assert_eq!(posts.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recent_errors_window() {
        let (_source, loader) = blog_loader(&["a.md"], &[]);

        loader.blog_posts(Language::En).await;
        let errors = loader.recent_errors();
        assert!(!errors.is_empty());
        assert!(errors.windows(2).all(|w| w[0].at >= w[1].at));

        tokio::time::advance(Duration::from_secs(3601)).await;
        assert!(loader.recent_errors().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_statuses() {
        let source = Arc::new(MemorySource::new());
        let loader = ContentLoader::new(source.clone(), LoaderConfig::default());

        let report = loader.health_check().await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.checks.len(), 4);
        assert!(!report.errors.is_empty());

        source.insert("/content/blog/en/manifest.json", manifest(&["a.md"]));
        let report = loader.health_check().await;
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.checks["blog_en"], CheckStatus::Ok);
        assert_eq!(report.checks["museum_es"], CheckStatus::Missing);

        for content_type in ContentType::ALL {
            for language in Language::ALL {
                source.insert(
                    format!("/content/{}/{}/manifest.json", content_type, language),
                    manifest(&["a.md"]),
                );
            }
        }
        let report = loader.health_check().await;
        assert!(report.is_healthy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_reports_stale_manifest() {
        let source = Arc::new(MemorySource::new());
        for content_type in ContentType::ALL {
            for language in Language::ALL {
                source.insert(
                    format!("/content/{}/{}/manifest.json", content_type, language),
                    manifest(&["a.md"]),
                );
            }
        }
        let loader = ContentLoader::new(source.clone(), LoaderConfig::default());
        assert!(loader.health_check().await.is_healthy());

        source.fail("/content/museum/es/manifest.json", 502);
        tokio::time::advance(Duration::from_secs(11 * 60)).await;

        let report = loader.health_check().await;
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.checks["museum_es"], CheckStatus::Stale);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_deadline() {
        let source = Arc::new(MemorySource::new());
        source.delay(
            "/content/blog/en/manifest.json",
            Duration::from_secs(4),
            manifest(&["a.md"]),
        );
        let mut config = LoaderConfig::default();
        config.timeouts.health_ms = 1000;
        let loader = ContentLoader::new(source, config);

        let report = loader.health_check().await;

        assert_eq!(report.status, HealthStatus::Error);
        assert!(report.checks.is_empty());
        assert_eq!(
            report.error.as_deref(),
            Some("Health probes did not finish within 1000 ms")
        );
    }
}
