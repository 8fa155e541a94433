use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use teresita_core::{ContentType, Language};

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "teresita")]
#[command(
    author,
    version,
    about = "Inspect the blog and museum content of La Casa de Teresita"
)]
#[command(after_help = "Examples:
  teresita --base-url https://lacasadeteresita.pe blog --lang en
  teresita --content-dir ./public museum --category Painting
  teresita post desayuno-andino --alternate
  teresita --format json health")]
pub struct Config {
    /// Base URL of the deployed site
    #[arg(long, env = "TERESITA_BASE_URL", conflicts_with = "content_dir")]
    pub base_url: Option<String>,

    /// Local folder holding the site's public files (contains `content/`)
    #[arg(long, env = "TERESITA_CONTENT_DIR", value_name = "PATH")]
    pub content_dir: Option<PathBuf>,

    /// Custom path to loader.toml configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List published blog posts, most recent first
    Blog {
        #[arg(short, long, default_value = "es")]
        lang: Language,
        /// Only posts in this category ("All" disables the filter)
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show one blog post
    #[command(after_help = "Example: teresita post desayuno-andino --lang en --alternate")]
    Post {
        slug: String,
        #[arg(short, long, default_value = "es")]
        lang: Language,
        /// Show the same post in the other language
        #[arg(short, long)]
        alternate: bool,
    },
    /// List posts related to a post by category
    Related {
        slug: String,
        #[arg(short, long, default_value = "es")]
        lang: Language,
        /// Maximum number of related posts
        #[arg(short = 'n', long, default_value = "3")]
        limit: usize,
    },
    /// List public museum artworks in display order
    Museum {
        #[arg(short, long, default_value = "es")]
        lang: Language,
        /// Only artworks in this category ("All" disables the filter)
        #[arg(short, long, conflicts_with = "all")]
        category: Option<String>,
        /// Include artworks that are not public
        #[arg(short, long)]
        all: bool,
    },
    /// Show one museum artwork
    Artwork {
        slug: String,
        #[arg(short, long, default_value = "es")]
        lang: Language,
    },
    /// Show the file list of one manifest
    Manifest {
        content_type: ContentType,
        #[arg(short, long, default_value = "es")]
        lang: Language,
    },
    /// Probe every manifest and report overall health
    Health,
    /// Load every collection and show the failures recorded along the way
    Errors,
}

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing
    Text,
    /// Pretty-printed JSON
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blog_command() {
        let config = Config::try_parse_from([
            "teresita",
            "--base-url",
            "https://example.org",
            "blog",
            "--lang",
            "en",
            "--category",
            "Travel",
        ])
        .unwrap();

        assert_eq!(config.base_url.as_deref(), Some("https://example.org"));
        match config.command {
            Command::Blog { lang, category } => {
                assert_eq!(lang, Language::En);
                assert_eq!(category.as_deref(), Some("Travel"));
            }
            other => panic!("Expected Blog, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["teresita", "artwork", "virgen"]).unwrap();
        assert_eq!(config.format, OutputFormat::Text);
        assert!(!config.verbose);
        match config.command {
            Command::Artwork { slug, lang } => {
                assert_eq!(slug, "virgen");
                assert_eq!(lang, Language::Es);
            }
            other => panic!("Expected Artwork, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_language() {
        let result = Config::try_parse_from(["teresita", "blog", "--lang", "fr"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_source_options_conflict() {
        let result = Config::try_parse_from([
            "teresita",
            "--base-url",
            "https://example.org",
            "--content-dir",
            "./public",
            "health",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_manifest_command() {
        let config =
            Config::try_parse_from(["teresita", "--format", "json", "manifest", "museum"]).unwrap();
        assert_eq!(config.format, OutputFormat::Json);
        assert!(matches!(
            config.command,
            Command::Manifest {
                content_type: ContentType::Museum,
                lang: Language::Es
            }
        ));
    }
}
