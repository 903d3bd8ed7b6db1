use std::path::Path;

use sha1::{Digest, Sha1};

use crate::config::CatalogConfig;
use crate::ebook::model::{CommitRecord, DerivedFields, EbookRecord, ImageUrls};
use crate::helpers::{format_file_size, normalize_indexable_text};

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("{} {}", n, unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

/// Estimated reading time, never less than one minute.
pub fn reading_time(word_count: i64, words_per_minute: u32) -> String {
    let wpm = u64::from(words_per_minute.max(1));
    let minutes = (word_count.max(0) as u64).div_ceil(wpm).max(1);

    if minutes < 60 {
        return plural(minutes, "minute");
    }

    let hours = minutes / 60;
    let remainder = minutes % 60;
    if remainder == 0 {
        plural(hours, "hour")
    } else {
        format!("{} {}", plural(hours, "hour"), plural(remainder, "minute"))
    }
}

/// Bucket a Flesch reading ease score.
pub fn reading_ease_description(score: f64) -> &'static str {
    if score > 89.0 {
        "very easy"
    } else if score >= 79.0 {
        "easy"
    } else if score > 69.0 {
        "fairly easy"
    } else if score > 59.0 {
        "average difficulty"
    } else if score > 49.0 {
        "fairly difficult"
    } else if score > 39.0 {
        "difficult"
    } else {
        "very difficult"
    }
}

pub fn url_safe_identifier(identifier: &str, prefix: &str) -> String {
    identifier.replace(prefix, "").replace('/', "_")
}

/// `/ebooks/{author}` for an identifier of the form `{prefix}{author}/{title}`.
/// Identifiers outside the prefix are returned unchanged.
pub fn authors_url(identifier: &str, prefix: &str) -> String {
    match identifier.strip_prefix(prefix).and_then(|rest| rest.split_once('/')) {
        Some((author, _)) if !author.is_empty() => format!("/ebooks/{}", author),
        _ => identifier.to_string(),
    }
}

/// Cache-busting token: SHA-1 of the latest commit's hash string, first 8 hex characters.
pub fn latest_commit_token(commits: &[CommitRecord]) -> Option<String> {
    let latest = commits.first()?;
    let digest = Sha1::digest(latest.hash.as_bytes());
    let hex = hex::encode(digest);
    Some(hex[..8].to_string())
}

/// Cover and hero image URLs. The avif variants are only offered when the
/// untokenized avif file exists in `covers_path`.
pub fn image_urls(url_safe_identifier: &str, token: Option<&str>, covers_path: &Path) -> ImageUrls {
    let url_for = |suffix: &str| match token {
        Some(t) => format!("/images/covers/{}-{}-{}", url_safe_identifier, t, suffix),
        None => format!("/images/covers/{}-{}", url_safe_identifier, suffix),
    };

    let avif_url_for = |suffix: &str| {
        let on_disk = covers_path.join(format!("{}-{}", url_safe_identifier, suffix));
        if on_disk.is_file() {
            Some(url_for(suffix))
        } else {
            None
        }
    };

    ImageUrls {
        hero_image_url: url_for("hero.jpg"),
        hero_image_2x_url: url_for("hero@2x.jpg"),
        hero_image_avif_url: avif_url_for("hero.avif"),
        hero_image_2x_avif_url: avif_url_for("hero@2x.avif"),
        cover_image_url: url_for("cover.jpg"),
        cover_image_2x_url: url_for("cover@2x.jpg"),
        cover_image_avif_url: avif_url_for("cover.avif"),
        cover_image_2x_avif_url: avif_url_for("cover@2x.avif"),
    }
}

/// The text a search query is matched against: titles, collections, authors,
/// tags, subjects and ToC entries, normalized.
pub fn indexable_text(record: &EbookRecord) -> String {
    let mut parts: Vec<&str> = Vec::new();

    parts.push(record.full_title.as_deref().unwrap_or(&record.title));
    if let Some(alt) = &record.alternate_title {
        parts.push(alt);
    }
    parts.extend(record.collections.iter().map(|cm| cm.collection.name.as_str()));
    parts.extend(record.authors.iter().map(|a| a.name.as_str()));
    parts.extend(record.tags.iter().map(|t| t.name.as_str()));
    parts.extend(record.loc_subjects.iter().map(|s| s.name.as_str()));
    if let Some(toc) = &record.toc_entries {
        parts.extend(toc.iter().map(|s| s.as_str()));
    }

    normalize_indexable_text(&parts.join(" "))
}

pub fn compute_derived(record: &EbookRecord, url: &str, config: &CatalogConfig) -> DerivedFields {
    let safe_id = url_safe_identifier(&record.identifier, &config.identifier_prefix);
    let token = latest_commit_token(&record.git_commits);
    let images = image_urls(&safe_id, token.as_deref(), &config.covers_path());

    let d = &record.downloads;
    let has_downloads = d.epub_url.is_some()
        || d.advanced_epub_url.is_some()
        || d.kepub_url.is_some()
        || d.azw3_url.is_some();

    DerivedFields {
        url: url.to_string(),
        text_url: format!("{}/text", url),
        text_single_page_url: format!("{}/text/single-page", url),
        authors_url: authors_url(&record.identifier, &config.identifier_prefix),
        latest_commit_token: token,
        images,
        reading_time: reading_time(record.word_count, config.words_per_minute),
        reading_ease_description: reading_ease_description(record.reading_ease).to_string(),
        indexable_text: indexable_text(record),
        has_downloads,
        text_single_page_size_formatted: record.text_single_page_byte_count
            .map(|n| format_file_size(n.max(0) as u64)),
        url_safe_identifier: safe_id,
    }
}
