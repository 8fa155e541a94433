//! Fixtures shared by the loader and catalog tests.

use std::sync::Arc;

use crate::config::LoaderConfig;
use crate::loader::ContentLoader;
use crate::source::MemorySource;

pub const BLOG_EN: &str = "/content/blog/en";

pub fn post(title: &str, date: &str, category: &str) -> String {
    format!(
        "---\ntitle: {}\ndate: {}\ncategory: {}\nauthor: Teresita\n---\n# {}\n\nA visit to the market.\n",
        title, date, category, title
    )
}

pub fn artwork(title: &str, order: &str, category: &str, accessibility: &str) -> String {
    format!(
        "---\ntitle: {}\norder: {}\ncategory: {}\naccessibility: {}\n---\nOil on canvas.\n",
        title, order, category, accessibility
    )
}

pub fn manifest(files: &[&str]) -> String {
    serde_json::json!({ "files": files }).to_string()
}

/// A loader over the English blog bucket with the given manifest entries
/// and files (names relative to the bucket).
pub fn blog_loader(
    manifest_files: &[&str],
    files: &[(&str, String)],
) -> (Arc<MemorySource>, ContentLoader) {
    let source = Arc::new(MemorySource::new());
    source.insert(format!("{}/manifest.json", BLOG_EN), manifest(manifest_files));
    for (name, text) in files {
        source.insert(format!("{}/{}", BLOG_EN, name), text.clone());
    }
    let loader = ContentLoader::new(source.clone(), LoaderConfig::default());
    (source, loader)
}
