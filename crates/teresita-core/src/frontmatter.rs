//! Front-matter parsing and validation.
//!
//! A content file is a YAML block fenced by `---` lines followed by the
//! markdown body. [`parse`] splits the two, validates the metadata and applies
//! the defaults, producing a typed [`Metadata`] or a
//! [`ContentError::InvalidDocument`].

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ContentError;
use crate::models::{FeaturedImage, Metadata, Order, DEFAULT_ACCESSIBILITY, DEFAULT_CATEGORY};

const FENCE: &str = "---";

/// Metadata and body of a successfully validated document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub metadata: Metadata,
    pub body: String,
}

/// Parses and validates a raw markdown document.
///
/// `filename` is only used in warnings and error messages.
///
/// # Errors
///
/// Returns `ContentError::InvalidDocument` when the content is blank, the
/// front-matter is not a YAML mapping, or `title` is missing, empty or not a
/// string.
///
/// # Examples
///
/// ```
/// use teresita_core::frontmatter;
/// use teresita_core::models::Order;
///
/// let doc = frontmatter::parse("---\ntitle: Patio\norder: 2\n---\nBody", "patio.md").unwrap();
/// assert_eq!(doc.metadata.title, "Patio");
/// assert_eq!(doc.metadata.order, Order::Position(2));
/// assert_eq!(doc.metadata.category, "Others");
/// assert_eq!(doc.body, "Body");
///
/// assert!(frontmatter::parse("---\ncategory: Art\n---\n", "untitled.md").is_err());
/// ```
pub fn parse(content: &str, filename: &str) -> Result<ParsedDocument, ContentError> {
    if content.trim().is_empty() {
        return Err(ContentError::invalid_document(
            filename,
            "Invalid content: must be a non-empty string",
        ));
    }

    let (front, body) = split(content);
    let fields = match front {
        Some(yaml) => parse_yaml(yaml, filename)?,
        None => Map::new(),
    };

    let metadata = normalize(fields, filename)?;

    Ok(ParsedDocument {
        metadata,
        body: body.to_string(),
    })
}

/// Splits a document into its front-matter block (without fences) and body.
///
/// Returns `None` for the block when the text does not open with a `---`
/// line or the block is never closed.
pub fn split(content: &str) -> (Option<&str>, &str) {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let Some(first_end) = content.find('\n') else {
        return (None, content);
    };
    let (first, rest) = content.split_at(first_end + 1);
    if first.trim_end() != FENCE {
        return (None, content);
    }

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }

    (None, content)
}

fn parse_yaml(yaml: &str, filename: &str) -> Result<Map<String, Value>, ContentError> {
    if yaml.trim().is_empty() {
        return Ok(Map::new());
    }

    let value: Value = serde_yaml::from_str(yaml).map_err(|e| {
        ContentError::invalid_document(filename, format!("Invalid front-matter: {}", e))
    })?;

    match value {
        Value::Object(fields) => Ok(fields),
        Value::Null => Ok(Map::new()),
        _ => Err(ContentError::invalid_document(
            filename,
            "Front-matter must be a mapping",
        )),
    }
}

/// Validates the raw front-matter fields and applies defaults.
fn normalize(mut fields: Map<String, Value>, filename: &str) -> Result<Metadata, ContentError> {
    let title = match fields.remove("title") {
        Some(Value::String(title)) if !title.trim().is_empty() => title,
        _ => {
            return Err(ContentError::invalid_document(
                filename,
                "Missing or invalid title field",
            ))
        }
    };

    let published = match fields.remove("published") {
        None | Some(Value::Null) => {
            warn!("No 'published' field in {}, defaulting to true", filename);
            true
        }
        Some(Value::Bool(published)) => published,
        Some(other) => {
            warn!(
                "Non-boolean 'published' value {} in {}, treating as published",
                other, filename
            );
            true
        }
    };

    let category = match fields.remove("category") {
        Some(Value::String(category)) if !category.trim().is_empty() => category,
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            warn!(
                "Missing category in {}, defaulting to '{}'",
                filename, DEFAULT_CATEGORY
            );
            DEFAULT_CATEGORY.to_string()
        }
    };

    let order = order_from_value(fields.remove("order"));

    let accessibility = match fields.remove("accessibility") {
        Some(Value::String(a)) if !a.trim().is_empty() => a,
        _ => DEFAULT_ACCESSIBILITY.to_string(),
    };

    let featured_image = match fields.remove("featuredImage") {
        None | Some(Value::Null) => match fields.get("image") {
            Some(Value::String(src)) if !src.trim().is_empty() => {
                let src = src.clone();
                fields.remove("image");
                Some(FeaturedImage {
                    src,
                    alt: title.clone(),
                })
            }
            _ => None,
        },
        Some(Value::Object(mut image)) => match image.remove("src") {
            Some(Value::String(src)) if !src.trim().is_empty() => {
                let alt = match image.remove("alt") {
                    Some(Value::String(alt)) if !alt.trim().is_empty() => alt,
                    _ => {
                        warn!("Missing featuredImage.alt in {}, using title", filename);
                        title.clone()
                    }
                };
                Some(FeaturedImage { src, alt })
            }
            _ => {
                warn!("Missing featuredImage.src in {}", filename);
                None
            }
        },
        Some(_) => {
            warn!("Missing featuredImage.src in {}", filename);
            None
        }
    };

    Ok(Metadata {
        title,
        category,
        order,
        published,
        accessibility,
        featured_image,
        extras: fields,
    })
}

fn order_from_value(value: Option<Value>) -> Order {
    match value {
        None | Some(Value::Null) => Order::Auto,
        Some(Value::Number(n)) => Order::Position(
            n.as_i64()
                .unwrap_or_else(|| n.as_f64().map_or(0, |f| f.trunc() as i64)),
        ),
        Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("auto") => Order::Auto,
        Some(Value::String(s)) => Order::Position(leading_integer(&s).unwrap_or(0)),
        Some(_) => Order::Position(0),
    }
}

/// Integer prefix of a string (`"12th"` → 12), like a lenient `parseInt`.
fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let sign_len = usize::from(s.starts_with('-') || s.starts_with('+'));
    let digits = s[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    s[..sign_len + digits].parse().ok()
}
