use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::CatalogConfig;
use crate::ebook::collections::resolve_collections;
use crate::ebook::contributors::resolve_contributors;
use crate::ebook::derived::compute_derived;
use crate::ebook::history::{load_history, GitHistoryReader, HistoryReader};
use crate::ebook::locator::{find_download_urls, locate_ebook, single_page_byte_count};
use crate::ebook::metadata::PackageMetadata;
use crate::ebook::model::{DerivedFields, EbookRecord, LocSubject, Tag};
use crate::ebook::sources::resolve_sources;
use crate::ebook::toc::read_toc_entries;
use crate::ebook::validation::normalize_record;
use crate::error::CatalogError;
use crate::logger::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExtractionStage {
    Started,
    Located,
    HistoryLoaded,
    Parsed,
    Resolved,
    Derived,
    Validated,
}

impl fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractionStage::Started => "Started",
            ExtractionStage::Located => "Located",
            ExtractionStage::HistoryLoaded => "HistoryLoaded",
            ExtractionStage::Parsed => "Parsed",
            ExtractionStage::Resolved => "Resolved",
            ExtractionStage::Derived => "Derived",
            ExtractionStage::Validated => "Validated",
        };
        write!(f, "{}", s)
    }
}

/// Builds validated `EbookRecord`s from title serving directories.
///
/// An extractor holds no per-title state and can be shared across threads.
pub struct EbookExtractor {
    config: CatalogConfig,
    history: Box<dyn HistoryReader>,
}

/// Manifest dates are RFC 3339 timestamps, occasionally bare dates.
fn parse_manifest_date(value: Option<String>, element: &str) -> Result<Option<DateTime<Utc>>, CatalogError> {
    let Some(s) = value else {
        return Ok(None);
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Some(dt.and_utc()))
        .ok_or_else(|| CatalogError::Parsing(format!("Invalid {} date: {}", element, s)))
}

impl EbookExtractor {
    pub fn new(config: CatalogConfig) -> Self {
        let history = GitHistoryReader::new(config.history_timeout());
        EbookExtractor {
            config,
            history: Box::new(history),
        }
    }

    pub fn with_history_reader(config: CatalogConfig, history: Box<dyn HistoryReader>) -> Self {
        EbookExtractor { config, history }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Extract and validate one title. No partial record is returned on failure.
    pub fn extract(&self, www_path: &Path) -> Result<EbookRecord, CatalogError> {
        let mut stage = ExtractionStage::Started;

        match self.run(www_path, &mut stage) {
            Ok(record) => Ok(record),
            Err(e) => {
                warn(&format!("Extraction of {} failed after stage {}: {}", www_path.display(), stage, e));
                Err(e)
            }
        }
    }

    fn advance(&self, www_path: &Path, stage: &mut ExtractionStage, next: ExtractionStage) {
        *stage = next;
        debug(&format!("{}: {}", www_path.display(), next));
    }

    fn run(&self, www_path: &Path, stage: &mut ExtractionStage) -> Result<EbookRecord, CatalogError> {
        let config = &self.config;

        let location = locate_ebook(www_path, config)?;
        let downloads = find_download_urls(&location.www_path, &location.url);
        let text_single_page_byte_count = single_page_byte_count(&location.www_path);
        self.advance(www_path, stage, ExtractionStage::Located);

        let git_commits = load_history(self.history.as_ref(), &location.repo_path, config.history_count);
        self.advance(www_path, stage, ExtractionStage::HistoryLoaded);

        let raw_metadata = fs::read_to_string(location.www_path.join("content.opf"))
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidData => CatalogError::Parsing(format!("content.opf is not valid UTF-8: {}", e)),
                _ => CatalogError::Io(e),
            })?;
        let meta = PackageMetadata::parse(&raw_metadata)?;

        let identifier = meta.value("dc:identifier")
            .ok_or_else(|| CatalogError::Parsing("Invalid <dc:identifier> element.".to_string()))?;

        let title = meta.value("dc:title")
            .ok_or_else(|| CatalogError::Parsing("Invalid <dc:title> element.".to_string()))?
            .replace('\'', "’");

        let ebook_created = parse_manifest_date(meta.value("dc:date"), "dc:date")?;
        let ebook_updated = parse_manifest_date(meta.meta_value("dcterms:modified"), "dcterms:modified")?;

        let word_count = meta.meta_value("se:word-count")
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);
        let reading_ease = meta.meta_value("se:reading-ease.flesch")
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);
        self.advance(www_path, stage, ExtractionStage::Parsed);

        let contributors = resolve_contributors(&meta)?;

        let toc_entries = if meta.has_meta("se:is-a-collection") {
            Some(read_toc_entries(&location.www_path)?)
        } else {
            None
        };

        let mut record = EbookRecord {
            identifier,
            www_filesystem_path: location.www_path.clone(),
            repo_filesystem_path: location.repo_path.clone(),
            title,
            full_title: meta.value_with_id("dc:title", "fulltitle"),
            alternate_title: meta.refinement("title", "dcterms:alternate"),
            description: meta.value("dc:description"),
            long_description: meta.meta_value("se:long-description"),
            language: meta.value("dc:language"),
            word_count,
            reading_ease,
            ebook_created,
            ebook_updated,
            github_url: meta.unrefined_meta_value("se:url.vcs.github"),
            wikipedia_url: meta.unrefined_meta_value("se:url.encyclopedia.wikipedia"),
            text_single_page_byte_count,
            downloads,
            tags: meta.meta_values("se:subject").iter().map(|s| Tag::from_name(s)).collect(),
            loc_subjects: meta.values("dc:subject").into_iter().map(|name| LocSubject { name }).collect(),
            collections: resolve_collections(&meta),
            authors: contributors.authors,
            illustrators: contributors.illustrators,
            translators: contributors.translators,
            contributors: contributors.contributors,
            sources: resolve_sources(&meta),
            toc_entries,
            git_commits,
            derived: DerivedFields::default(),
        };
        normalize_record(&mut record);
        self.advance(www_path, stage, ExtractionStage::Resolved);

        record.derived = compute_derived(&record, &location.url, config);
        self.advance(www_path, stage, ExtractionStage::Derived);

        record.validate(config)?;
        self.advance(www_path, stage, ExtractionStage::Validated);

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest_date() {
        let dt = parse_manifest_date(Some("2017-03-01T00:00:00Z".to_string()), "dc:date").unwrap().unwrap();
        assert_eq!(dt.timestamp(), 1488326400);

        let d = parse_manifest_date(Some("2017-03-01".to_string()), "dc:date").unwrap().unwrap();
        assert_eq!(d, dt);

        assert_eq!(parse_manifest_date(None, "dc:date").unwrap(), None);
        assert!(matches!(parse_manifest_date(Some("March 2017".to_string()), "dc:date"), Err(CatalogError::Parsing(_))));
    }

    #[test]
    fn test_extractor_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EbookExtractor>();
    }
}
