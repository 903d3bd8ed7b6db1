use std::fs;
use std::path::Path;

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;

use crate::config::CatalogConfig;
use crate::ebook::model::EbookRecord;
use crate::error::{CatalogError, ValidationError, ValidationErrors};
use crate::types::ContributorRole;

lazy_static! {
    static ref RE_WIKIPEDIA_URL: Regex = Regex::new(r"(?i)^https://.*wiki.*").unwrap();
    static ref RE_GITHUB_URL: Regex = Regex::new(r"(?i)^https://github\.com/([^/]+)/\w+").unwrap();
}

fn trim_option(value: &mut Option<String>) {
    if let Some(s) = value {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            *value = None;
        } else if trimmed.len() != s.len() {
            *value = Some(trimmed.to_string());
        }
    }
}

/// Trim string fields and turn blank optional strings into `None`.
pub fn normalize_record(record: &mut EbookRecord) {
    record.identifier = record.identifier.trim().to_string();
    record.title = record.title.trim().to_string();

    for field in [
        &mut record.full_title,
        &mut record.alternate_title,
        &mut record.description,
        &mut record.long_description,
        &mut record.language,
        &mut record.github_url,
        &mut record.wikipedia_url,
        &mut record.downloads.kindle_cover_url,
        &mut record.downloads.epub_url,
        &mut record.downloads.advanced_epub_url,
        &mut record.downloads.kepub_url,
        &mut record.downloads.azw3_url,
        &mut record.downloads.dist_cover_url,
    ] {
        trim_option(field);
    }
}

/// A repository URL under `https://github.com/{org}/`, case insensitive.
fn is_github_url_for_org(url: &str, org: &str) -> bool {
    RE_GITHUB_URL
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().eq_ignore_ascii_case(org))
        .unwrap_or(false)
}

fn is_blank(s: Option<&str>) -> bool {
    s.map(|s| s.trim().is_empty()).unwrap_or(true)
}

fn is_readable(path: &Path) -> bool {
    fs::metadata(path).is_ok()
}

struct Checker<'a> {
    config: &'a CatalogConfig,
    errors: ValidationErrors,
}

impl Checker<'_> {
    fn max_len(&mut self, field: &'static str, value: Option<&str>, max: usize) {
        if let Some(v) = value {
            let len = v.trim().len();
            if len > max {
                self.errors.add(ValidationError::StringTooLong { field, len, max });
            }
        }
    }

    fn path(&mut self, field: &'static str, path: &Path) {
        let s = path.to_string_lossy();
        if s.trim().is_empty() {
            self.errors.add(ValidationError::PathRequired(field));
            return;
        }
        self.max_len(field, Some(&s), self.config.max_long_string_length);
        if !is_readable(path) {
            self.errors.add(ValidationError::PathUnreadable { field, path: s.to_string() });
        }
    }

    fn download_url(&mut self, field: &'static str, url: Option<&str>, suffix: &str) {
        let Some(url) = url.map(|u| u.trim()).filter(|u| !u.is_empty()) else {
            return;
        };
        if !url.to_lowercase().ends_with(&suffix.to_lowercase()) {
            self.errors.add(ValidationError::InvalidDownloadUrl { field, url: url.to_string() });
        }
        self.max_len(field, Some(url), self.config.max_long_string_length);
    }
}

/// Check every field-level invariant and collect all violations.
pub fn validation_errors(record: &EbookRecord, config: &CatalogConfig) -> ValidationErrors {
    let mut c = Checker { config, errors: ValidationErrors::new() };
    let max = config.max_string_length;
    let max_long = config.max_long_string_length;

    if record.identifier.trim().is_empty() {
        c.errors.add(ValidationError::IdentifierRequired);
    }
    c.max_len("Identifier", Some(&record.identifier), max_long);

    c.path("www filesystem", &record.www_filesystem_path);
    c.path("repo filesystem", &record.repo_filesystem_path);

    let d = &record.downloads;
    c.download_url("Kindle cover", d.kindle_cover_url.as_deref(), "_EBOK_portrait.jpg");
    c.download_url("epub", d.epub_url.as_deref(), ".epub");
    c.download_url("advanced epub", d.advanced_epub_url.as_deref(), "_advanced.epub");
    c.download_url("kepub", d.kepub_url.as_deref(), ".kepub.epub");
    c.download_url("azw3", d.azw3_url.as_deref(), ".azw3");
    c.download_url("dist cover", d.dist_cover_url.as_deref(), "cover.jpg");

    if record.title.trim().is_empty() {
        c.errors.add(ValidationError::TitleRequired);
    }
    c.max_len("Title", Some(&record.title), max);
    c.max_len("Full title", record.full_title.as_deref(), max);
    c.max_len("Alternate title", record.alternate_title.as_deref(), max);

    if is_blank(record.description.as_deref()) {
        c.errors.add(ValidationError::DescriptionRequired);
    }
    if is_blank(record.long_description.as_deref()) {
        c.errors.add(ValidationError::LongDescriptionRequired);
    }

    if is_blank(record.language.as_deref()) {
        c.errors.add(ValidationError::LanguageRequired);
    }
    c.max_len("Language", record.language.as_deref(), config.max_language_length);

    if record.word_count <= 0 {
        c.errors.add(ValidationError::InvalidWordCount(record.word_count));
    }
    if record.reading_ease <= 0.0 {
        c.errors.add(ValidationError::InvalidReadingEase(record.reading_ease));
    }

    if let Some(url) = record.github_url.as_deref().filter(|u| !u.trim().is_empty()) {
        if !is_github_url_for_org(url, &config.github_org) {
            c.errors.add(ValidationError::InvalidGitHubUrl(url.to_string()));
        }
        c.max_len("GitHub URL", Some(url), max);
    }

    if let Some(url) = record.wikipedia_url.as_deref().filter(|u| !u.trim().is_empty()) {
        if !RE_WIKIPEDIA_URL.is_match(url.trim()) {
            c.errors.add(ValidationError::InvalidWikipediaUrl(url.to_string()));
        }
        c.max_len("Wikipedia URL", Some(url), max);
    }

    let now = Utc::now();
    match record.ebook_created {
        Some(dt) if dt > now => c.errors.add(ValidationError::DateInFuture("Ebook created")),
        Some(_) => {}
        None => c.errors.add(ValidationError::DateRequired("Ebook created")),
    }
    match record.ebook_updated {
        Some(dt) if dt > now => c.errors.add(ValidationError::DateInFuture("Ebook updated")),
        Some(_) => {}
        None => c.errors.add(ValidationError::DateRequired("Ebook updated")),
    }

    match record.text_single_page_byte_count {
        Some(n) if n > 0 => {}
        _ => c.errors.add(ValidationError::SinglePageByteCountRequired),
    }

    if record.derived.indexable_text.trim().is_empty() {
        c.errors.add(ValidationError::IndexableTextRequired);
    }

    if record.authors.is_empty() {
        c.errors.add(ValidationError::AuthorRequired);
    }

    for contributor in record.all_contributors() {
        if contributor.name.trim().is_empty() {
            let label = match contributor.role {
                ContributorRole::Author => "Author",
                ContributorRole::Illustrator => "Illustrator",
                ContributorRole::Translator => "Translator",
                ContributorRole::Contributor => "Contributor",
            };
            c.errors.add(ValidationError::NameRequired(label));
        }
        c.max_len("Contributor", Some(&contributor.name), max);
    }

    for tag in &record.tags {
        if tag.name.trim().is_empty() || tag.url_name.is_empty() {
            c.errors.add(ValidationError::NameRequired("Tag"));
        }
        c.max_len("Tag", Some(&tag.name), max);
    }

    for cm in &record.collections {
        if cm.collection.name.trim().is_empty() || cm.collection.url_name.is_empty() {
            c.errors.add(ValidationError::NameRequired("Collection"));
        }
        c.max_len("Collection", Some(&cm.collection.name), max);
    }

    c.errors
}

impl EbookRecord {
    pub fn validation_errors(&self, config: &CatalogConfig) -> ValidationErrors {
        validation_errors(self, config)
    }

    /// Fails closed with every violation if any invariant doesn't hold.
    pub fn validate(&self, config: &CatalogConfig) -> Result<(), CatalogError> {
        validation_errors(self, config).into_result()
    }
}
