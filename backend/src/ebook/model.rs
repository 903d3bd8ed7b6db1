use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::helpers::make_url_safe;
use crate::types::{CollectionType, ContributorRole, SourceType};

/// A person credited on one title, in exactly one role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contributor {
    pub name: String,
    pub url_name: String,
    /// The "file-as" form. Authors fall back to `name` when it's missing.
    pub sort_name: Option<String>,
    pub full_name: Option<String>,
    pub wikipedia_url: Option<String>,
    pub nacoaf_url: Option<String>,
    pub role: ContributorRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collection {
    pub name: String,
    pub url_name: String,
}

impl Collection {
    pub fn from_name(name: &str) -> Self {
        Collection {
            name: name.to_string(),
            url_name: make_url_safe(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionMembership {
    pub collection: Collection,
    pub sequence_number: Option<i32>,
    /// `None` when the manifest doesn't say, `Unknown` when it says something unrecognized.
    pub collection_type: Option<CollectionType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EbookSource {
    pub url: String,
    pub source_type: SourceType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub created: DateTime<Utc>,
    pub hash: String,
    pub message: String,
}

/// An `se:subject` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub name: String,
    pub url_name: String,
}

impl Tag {
    pub fn from_name(name: &str) -> Self {
        Tag {
            name: name.to_string(),
            url_name: make_url_safe(name),
        }
    }
}

/// A Library of Congress subject heading, from `dc:subject`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocSubject {
    pub name: String,
}

/// Download locations, each present only if the file exists under `downloads/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadUrls {
    pub kindle_cover_url: Option<String>,
    pub epub_url: Option<String>,
    pub advanced_epub_url: Option<String>,
    pub kepub_url: Option<String>,
    pub azw3_url: Option<String>,
    pub dist_cover_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageUrls {
    pub hero_image_url: String,
    pub hero_image_2x_url: String,
    pub hero_image_avif_url: Option<String>,
    pub hero_image_2x_avif_url: Option<String>,
    pub cover_image_url: String,
    pub cover_image_2x_url: String,
    pub cover_image_avif_url: Option<String>,
    pub cover_image_2x_avif_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DerivedFields {
    pub url_safe_identifier: String,
    pub url: String,
    pub text_url: String,
    pub text_single_page_url: String,
    pub authors_url: String,
    /// First 8 hex characters of SHA-1 over the latest commit hash.
    pub latest_commit_token: Option<String>,
    pub images: ImageUrls,
    pub reading_time: String,
    pub reading_ease_description: String,
    pub indexable_text: String,
    pub has_downloads: bool,
    pub text_single_page_size_formatted: Option<String>,
}

/// One title, as extracted from its serving directory and repository.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EbookRecord {
    pub identifier: String,
    pub www_filesystem_path: PathBuf,
    pub repo_filesystem_path: PathBuf,

    pub title: String,
    pub full_title: Option<String>,
    pub alternate_title: Option<String>,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub language: Option<String>,
    pub word_count: i64,
    pub reading_ease: f64,
    pub ebook_created: Option<DateTime<Utc>>,
    pub ebook_updated: Option<DateTime<Utc>>,
    pub github_url: Option<String>,
    pub wikipedia_url: Option<String>,
    pub text_single_page_byte_count: Option<i64>,

    #[serde(flatten)]
    pub downloads: DownloadUrls,

    pub tags: Vec<Tag>,
    pub loc_subjects: Vec<LocSubject>,
    pub collections: Vec<CollectionMembership>,
    pub authors: Vec<Contributor>,
    pub illustrators: Vec<Contributor>,
    pub translators: Vec<Contributor>,
    pub contributors: Vec<Contributor>,
    pub sources: Vec<EbookSource>,
    /// `None` unless the title is flagged as a collection of works.
    pub toc_entries: Option<Vec<String>>,
    /// Most recent first. Empty if history was unavailable.
    pub git_commits: Vec<CommitRecord>,

    pub derived: DerivedFields,
}

impl EbookRecord {
    /// Every credit in persisted order: authors, illustrators, translators, contributors.
    pub fn all_contributors(&self) -> impl Iterator<Item = &Contributor> {
        self.authors.iter()
            .chain(self.illustrators.iter())
            .chain(self.translators.iter())
            .chain(self.contributors.iter())
    }

    pub fn collection_position(&self, collection_name: &str) -> Option<i32> {
        self.collections.iter()
            .find(|cm| cm.collection.name == collection_name)
            .and_then(|cm| cm.sequence_number)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
