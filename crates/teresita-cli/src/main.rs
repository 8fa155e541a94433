use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use dotenvy::dotenv;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use teresita::output::{
    artwork_detail, artwork_line, error_line, failure_message, health_summary, post_detail,
    post_line,
};
use teresita::{Command, Config, OutputFormat};
use teresita_client::{DirectorySource, HttpSource};
use teresita_core::source::ContentSource;
use teresita_core::{load_loader_config, ContentLoader, HealthStatus, Language};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::parse();

    // Logs go to stderr to keep stdout clean for JSON output
    let default_level = if config.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match execute(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", failure_message(&err));
            ExitCode::FAILURE
        }
    }
}

async fn execute(config: Config) -> anyhow::Result<()> {
    let loader_config = load_loader_config(config.config.as_deref())
        .context("Failed to load loader configuration")?;
    let source = build_source(&config)?;
    info!("Reading content through the {} source", source.name());

    let loader = ContentLoader::new(source, loader_config);
    run(&loader, config.command, config.format).await
}

fn build_source(config: &Config) -> anyhow::Result<Arc<dyn ContentSource>> {
    if let Some(dir) = &config.content_dir {
        if !dir.is_dir() {
            bail!("Content directory {} does not exist", dir.display());
        }
        return Ok(Arc::new(DirectorySource::new(dir.clone())));
    }

    match &config.base_url {
        Some(base_url) => {
            let source = HttpSource::new(base_url)?;
            Ok(Arc::new(source))
        }
        None => bail!("Either --base-url (TERESITA_BASE_URL) or --content-dir is required"),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

async fn run(
    loader: &ContentLoader,
    command: Command,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match command {
        Command::Blog { lang, category } => {
            let posts = loader
                .blog_posts_by_category(category.as_deref(), lang)
                .await;
            match format {
                OutputFormat::Json => print_json(&posts)?,
                OutputFormat::Text => {
                    if posts.is_empty() {
                        println!("No blog posts found ({})", lang);
                    }
                    for (i, post) in posts.iter().enumerate() {
                        println!("{}", post_line(i, post));
                    }
                }
            }
        }
        Command::Post {
            slug,
            lang,
            alternate,
        } => {
            let post = if alternate {
                loader.alternate_blog_post(&slug, lang).await
            } else {
                loader.blog_post(&slug, lang).await
            };
            let Some(post) = post else {
                bail!("Blog post '{}' not found", slug);
            };
            match format {
                OutputFormat::Json => print_json(&post)?,
                OutputFormat::Text => print!("{}", post_detail(&post)),
            }
        }
        Command::Related { slug, lang, limit } => {
            let Some(post) = loader.blog_post(&slug, lang).await else {
                bail!("Blog post '{}' not found", slug);
            };
            let related = loader.related_posts(&post, lang, limit).await;
            match format {
                OutputFormat::Json => print_json(&related)?,
                OutputFormat::Text => {
                    println!("Related to '{}' [{}]:", post.title(), post.category());
                    for (i, other) in related.iter().enumerate() {
                        println!("{}", post_line(i, other));
                    }
                }
            }
        }
        Command::Museum {
            lang,
            category,
            all,
        } => {
            let artworks = if all {
                loader.museum_artworks(lang).await.to_vec()
            } else {
                loader.artworks_by_category(category.as_deref(), lang).await
            };
            match format {
                OutputFormat::Json => print_json(&artworks)?,
                OutputFormat::Text => {
                    if artworks.is_empty() {
                        println!("No artworks found ({})", lang);
                    }
                    for artwork in &artworks {
                        println!("{}", artwork_line(artwork));
                    }
                }
            }
        }
        Command::Artwork { slug, lang } => {
            let Some(artwork) = loader.museum_artwork(&slug, lang).await else {
                bail!("Artwork '{}' not found", slug);
            };
            match format {
                OutputFormat::Json => print_json(&artwork)?,
                OutputFormat::Text => print!("{}", artwork_detail(&artwork)),
            }
        }
        Command::Manifest { content_type, lang } => {
            let Some(manifest) = loader.fetch_manifest(content_type, lang).await else {
                bail!("No manifest available for {}/{}", content_type, lang);
            };
            match format {
                OutputFormat::Json => print_json(&*manifest)?,
                OutputFormat::Text => {
                    for file in &manifest.files {
                        println!("{}", file);
                    }
                }
            }
        }
        Command::Health => {
            let report = loader.health_check().await;
            match format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Text => print!("{}", health_summary(&report)),
            }
            if matches!(report.status, HealthStatus::Unhealthy | HealthStatus::Error) {
                bail!("Content is {}", report.status.as_str());
            }
        }
        Command::Errors => {
            for lang in Language::ALL {
                loader.blog_posts(lang).await;
                loader.museum_artworks(lang).await;
            }
            let errors = loader.recent_errors();
            debug!("{} errors in the ledger window", errors.len());
            match format {
                OutputFormat::Json => print_json(&errors)?,
                OutputFormat::Text => {
                    if errors.is_empty() {
                        println!("No errors recorded");
                    }
                    for record in &errors {
                        println!("{}", error_line(record));
                    }
                }
            }
        }
    }

    Ok(())
}
