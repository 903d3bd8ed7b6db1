use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The role a contributor plays on one title, stored as its MARC relator code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContributorRole {
    #[serde(rename = "aut")]
    Author,
    #[serde(rename = "ill")]
    Illustrator,
    #[serde(rename = "trl")]
    Translator,
    #[serde(rename = "ctb")]
    Contributor,
}

impl ContributorRole {
    pub fn marc_code(&self) -> &'static str {
        match self {
            ContributorRole::Author => "aut",
            ContributorRole::Illustrator => "ill",
            ContributorRole::Translator => "trl",
            ContributorRole::Contributor => "ctb",
        }
    }

    /// Only the four bucketed roles map to a variant. Other MARC codes such as
    /// "edt" or "cov" are ignored by the resolver.
    pub fn from_marc_code(code: &str) -> Option<Self> {
        match code {
            "aut" => Some(ContributorRole::Author),
            "ill" => Some(ContributorRole::Illustrator),
            "trl" => Some(ContributorRole::Translator),
            "ctb" => Some(ContributorRole::Contributor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionType {
    #[serde(rename = "series")]
    Series,
    #[serde(rename = "set")]
    Set,
    #[serde(rename = "unknown")]
    Unknown,
}

impl CollectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionType::Series => "series",
            CollectionType::Set => "set",
            CollectionType::Unknown => "unknown",
        }
    }
}

// Unrecognized values are advisory data, not an error.
impl From<&str> for CollectionType {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "series" => CollectionType::Series,
            "set" => CollectionType::Set,
            _ => CollectionType::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    ProjectGutenberg,
    ProjectGutenbergAustralia,
    ProjectGutenbergCanada,
    InternetArchive,
    HathiTrust,
    Wikisource,
    GoogleBooks,
    FadedPage,
    Other,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::ProjectGutenberg => "project_gutenberg",
            SourceType::ProjectGutenbergAustralia => "project_gutenberg_australia",
            SourceType::ProjectGutenbergCanada => "project_gutenberg_canada",
            SourceType::InternetArchive => "internet_archive",
            SourceType::HathiTrust => "hathi_trust",
            SourceType::Wikisource => "wikisource",
            SourceType::GoogleBooks => "google_books",
            SourceType::FadedPage => "faded_page",
            SourceType::Other => "other",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "project_gutenberg" => SourceType::ProjectGutenberg,
            "project_gutenberg_australia" => SourceType::ProjectGutenbergAustralia,
            "project_gutenberg_canada" => SourceType::ProjectGutenbergCanada,
            "internet_archive" => SourceType::InternetArchive,
            "hathi_trust" => SourceType::HathiTrust,
            "wikisource" => SourceType::Wikisource,
            "google_books" => SourceType::GoogleBooks,
            "faded_page" => SourceType::FadedPage,
            _ => SourceType::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EbookSortType {
    #[default]
    #[serde(rename = "newest")]
    Newest,
    #[serde(rename = "author-alpha")]
    AuthorAlpha,
    #[serde(rename = "reading-ease")]
    ReadingEase,
    #[serde(rename = "length")]
    Length,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid EbookSortType value: {0}")]
pub struct ParseEbookSortTypeError(String);

impl FromStr for EbookSortType {
    type Err = ParseEbookSortTypeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "newest" | "default" => Ok(EbookSortType::Newest),
            "author-alpha" => Ok(EbookSortType::AuthorAlpha),
            "reading-ease" => Ok(EbookSortType::ReadingEase),
            "length" => Ok(EbookSortType::Length),
            _ => Err(ParseEbookSortTypeError(s.to_string())),
        }
    }
}

impl fmt::Display for EbookSortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EbookSortType::Newest => "newest",
            EbookSortType::AuthorAlpha => "author-alpha",
            EbookSortType::ReadingEase => "reading-ease",
            EbookSortType::Length => "length",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_type_unknown_values() {
        assert_eq!(CollectionType::from("series"), CollectionType::Series);
        assert_eq!(CollectionType::from(" Set "), CollectionType::Set);
        assert_eq!(CollectionType::from("anthology"), CollectionType::Unknown);
        assert_eq!(CollectionType::from(""), CollectionType::Unknown);
    }

    #[test]
    fn test_marc_codes() {
        for role in [ContributorRole::Author, ContributorRole::Illustrator, ContributorRole::Translator, ContributorRole::Contributor] {
            assert_eq!(ContributorRole::from_marc_code(role.marc_code()), Some(role));
        }
        assert_eq!(ContributorRole::from_marc_code("edt"), None);
    }

    #[test]
    fn test_sort_type_from_str() {
        assert_eq!("author-alpha".parse::<EbookSortType>(), Ok(EbookSortType::AuthorAlpha));
        assert_eq!("newest".parse::<EbookSortType>(), Ok(EbookSortType::Newest));
        assert!("title".parse::<EbookSortType>().is_err());
    }
}
