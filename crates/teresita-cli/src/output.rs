//! Text rendering for the CLI. JSON output goes straight through serde.

use teresita_core::{BlogPost, ContentError, ErrorRecord, HealthReport, MuseumArtwork, Order};

/// Truncate text to a maximum number of characters, adding ellipsis if needed
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if cleaned.chars().count() <= max_chars {
        cleaned
    } else {
        let cut: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}

pub fn post_line(index: usize, post: &BlogPost) -> String {
    let date = post
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "undated".to_string());
    format!(
        "{}. {} [{}] {} ({} min) - {}",
        index + 1,
        date,
        post.category(),
        post.title(),
        post.reading_time(),
        post.slug
    )
}

pub fn post_detail(post: &BlogPost) -> String {
    let mut out = format!("{}\n", post.title());
    out.push_str(&format!("  Slug:          {}\n", post.slug));
    out.push_str(&format!("  Language:      {}\n", post.language));
    out.push_str(&format!("  Category:      {}\n", post.category()));
    if let Some(date) = post.date {
        out.push_str(&format!("  Date:          {}\n", date.format("%Y-%m-%d")));
    }
    out.push_str(&format!("  Published:     {}\n", post.is_published()));
    out.push_str(&format!("  Reading time:  {} min\n", post.reading_time()));
    if let Some(image) = &post.metadata.featured_image {
        out.push_str(&format!("  Image:         {} ({})\n", image.src, image.alt));
    }
    out.push_str(&format!("\n{}\n", truncate_text(&post.body, 280)));
    out
}

fn order_label(order: Order) -> String {
    match order {
        Order::Position(n) => n.to_string(),
        Order::Auto => "-".to_string(),
    }
}

pub fn artwork_line(artwork: &MuseumArtwork) -> String {
    let mut line = format!(
        "{:>4}  [{}] {} - {}",
        order_label(artwork.order()),
        artwork.category(),
        artwork.title(),
        artwork.slug
    );
    if !artwork.is_public() {
        line.push_str(&format!(" ({})", artwork.metadata.accessibility));
    }
    line
}

pub fn artwork_detail(artwork: &MuseumArtwork) -> String {
    let mut out = format!("{}\n", artwork.title());
    out.push_str(&format!("  Slug:          {}\n", artwork.slug));
    out.push_str(&format!("  Category:      {}\n", artwork.category()));
    out.push_str(&format!("  Order:         {}\n", order_label(artwork.order())));
    out.push_str(&format!("  Accessibility: {}\n", artwork.metadata.accessibility));
    out.push_str(&format!("  Published:     {}\n", artwork.is_published()));
    out.push_str(&format!("\n{}\n", truncate_text(&artwork.body, 280)));
    out
}

pub fn error_line(record: &ErrorRecord) -> String {
    let mut line = format!(
        "{} {} {}",
        record.timestamp.format("%H:%M:%S"),
        record.context,
        record.message
    );
    if let Some(attempts) = record.attempts {
        line.push_str(&format!(" (after {} attempts)", attempts));
    }
    line
}

pub fn health_summary(report: &HealthReport) -> String {
    let mut out = format!("Status: {}\n", report.status.as_str());
    if let Some(error) = &report.error {
        out.push_str(&format!("  {}\n", error));
    }
    for (check, status) in &report.checks {
        let status = serde_json::to_value(status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        out.push_str(&format!("  {:<10} {}\n", check, status));
    }
    if !report.errors.is_empty() {
        out.push_str(&format!("\nRecent errors ({}):\n", report.errors.len()));
        for record in &report.errors {
            out.push_str(&format!("  {}\n", error_line(record)));
        }
    }
    out
}

/// Renders a command failure. A [`ContentError`] anywhere in the chain is
/// shown through its `user_message()`, after the contexts wrapping it.
pub fn failure_message(err: &anyhow::Error) -> String {
    let is_content = |cause: &&(dyn std::error::Error + 'static)| {
        cause.downcast_ref::<ContentError>().is_some()
    };

    match err.chain().find_map(|cause| cause.downcast_ref::<ContentError>()) {
        Some(content) => {
            let mut out = String::new();
            for context in err.chain().take_while(|cause| !is_content(cause)) {
                out.push_str(&format!("{}: ", context));
            }
            out.push_str(&content.user_message());
            out
        }
        None => format!("{:#}", err),
    }
}
