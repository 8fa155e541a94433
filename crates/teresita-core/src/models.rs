//! Domain types: languages, content types, validated front-matter and the
//! typed document records handed to callers.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::ContentError;

/// Extension every content file carries.
pub const DOCUMENT_EXTENSION: &str = ".md";

/// Category assigned to documents that do not declare one.
pub const DEFAULT_CATEGORY: &str = "Others";

/// Accessibility assigned to documents that do not declare one.
pub const DEFAULT_ACCESSIBILITY: &str = "public";

/// Reading speed used by [`calculate_reading_time`].
pub const WORDS_PER_MINUTE: usize = 200;

/// Languages the site is published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Es,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Es];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
        }
    }

    /// The other published language, used for "read this in ..." links.
    pub fn alternate(&self) -> Language {
        match self {
            Language::En => Language::Es,
            Language::Es => Language::En,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "es" => Ok(Language::Es),
            _ => Err(ContentError::UnsupportedLanguage(s.to_string())),
        }
    }
}

/// Kinds of content served from `<content_root>/<type>/<lang>/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Blog,
    Museum,
}

impl ContentType {
    pub const ALL: [ContentType; 2] = [ContentType::Blog, ContentType::Museum];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Blog => "blog",
            ContentType::Museum => "museum",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blog" => Ok(ContentType::Blog),
            "museum" => Ok(ContentType::Museum),
            _ => Err(ContentError::UnsupportedContentType(s.to_string())),
        }
    }
}

/// Display position of a document.
///
/// Variant order matters: every `Position` sorts before `Auto`, so
/// unordered documents end up after all numbered ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Order {
    Position(i64),
    #[default]
    Auto,
}

impl Serialize for Order {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Order::Position(n) => serializer.serialize_i64(*n),
            Order::Auto => serializer.serialize_str("auto"),
        }
    }
}

/// Image shown on cards and at the top of a document page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeaturedImage {
    pub src: String,
    pub alt: String,
}

/// Validated front-matter with every default applied.
///
/// Produced only by [`frontmatter::parse`](crate::frontmatter::parse);
/// downstream code never needs to re-check optional fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub title: String,
    pub category: String,
    pub order: Order,
    pub published: bool,
    pub accessibility: String,
    pub featured_image: Option<FeaturedImage>,
    /// Front-matter keys without a dedicated field (author, excerpt, tags...).
    #[serde(flatten)]
    pub extras: serde_json::Map<String, Value>,
}

/// A parsed content unit, common to every content kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub slug: String,
    pub language: Language,
    pub filename: String,
    #[serde(flatten)]
    pub metadata: Metadata,
    pub body: String,
    pub loaded_at: DateTime<Utc>,
}

impl Document {
    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn category(&self) -> &str {
        &self.metadata.category
    }

    pub fn is_published(&self) -> bool {
        self.metadata.published
    }
}

/// Behaviour shared by the typed content records.
pub trait ContentKind: Clone + Send + Sync + 'static {
    const CONTENT_TYPE: ContentType;

    /// Builds the typed record, pulling kind-specific keys out of the
    /// front-matter extras.
    fn from_document(document: Document) -> Self;

    fn document(&self) -> &Document;

    /// Ordering used for a whole collection. Applied with a stable sort.
    fn collection_order(a: &Self, b: &Self) -> Ordering;
}

/// A blog article.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlogPost {
    #[serde(flatten)]
    pub document: Document,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl BlogPost {
    /// Estimated minutes needed to read the body.
    pub fn reading_time(&self) -> usize {
        calculate_reading_time(&self.document.body)
    }
}

impl ContentKind for BlogPost {
    const CONTENT_TYPE: ContentType = ContentType::Blog;

    fn from_document(mut document: Document) -> Self {
        let date = match document.metadata.extras.remove("date") {
            Some(Value::String(raw)) => match parse_date(&raw) {
                Some(date) => Some(date),
                None => {
                    tracing::warn!(
                        "Unparseable date '{}' in {}, post will sort last",
                        raw,
                        document.filename
                    );
                    document
                        .metadata
                        .extras
                        .insert("date".to_string(), Value::String(raw));
                    None
                }
            },
            Some(Value::Null) | None => None,
            Some(other) => {
                tracing::warn!("Non-string date in {}, ignoring", document.filename);
                document.metadata.extras.insert("date".to_string(), other);
                None
            }
        };

        Self { document, date }
    }

    fn document(&self) -> &Document {
        &self.document
    }

    /// Most recent first; undated posts last.
    fn collection_order(a: &Self, b: &Self) -> Ordering {
        b.date.cmp(&a.date)
    }
}

impl Deref for BlogPost {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.document
    }
}

/// A museum catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MuseumArtwork {
    #[serde(flatten)]
    pub document: Document,
}

impl MuseumArtwork {
    pub fn order(&self) -> Order {
        self.document.metadata.order
    }

    /// Published and open to every visitor.
    pub fn is_public(&self) -> bool {
        self.document.metadata.published
            && self.document.metadata.accessibility == DEFAULT_ACCESSIBILITY
    }
}

impl ContentKind for MuseumArtwork {
    const CONTENT_TYPE: ContentType = ContentType::Museum;

    fn from_document(document: Document) -> Self {
        Self { document }
    }

    fn document(&self) -> &Document {
        &self.document
    }

    fn collection_order(a: &Self, b: &Self) -> Ordering {
        a.order().cmp(&b.order())
    }
}

impl Deref for MuseumArtwork {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.document
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` and plain `YYYY-MM-DD` dates.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Estimated reading time in whole minutes, never less than one.
///
/// # Examples
///
/// ```
/// use teresita_core::models::calculate_reading_time;
///
/// assert_eq!(calculate_reading_time(""), 1);
/// assert_eq!(calculate_reading_time(&"word ".repeat(450)), 3);
/// ```
pub fn calculate_reading_time(text: &str) -> usize {
    let words = text.split_whitespace().count().max(1);
    words.div_ceil(WORDS_PER_MINUTE)
}
