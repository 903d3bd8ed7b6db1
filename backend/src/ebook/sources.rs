use crate::ebook::metadata::PackageMetadata;
use crate::ebook::model::EbookSource;
use crate::types::SourceType;

/// Ordered host rules. The first substring that matches wins.
const SOURCE_RULES: &[(&[&str], SourceType)] = &[
    (&["gutenberg.org/"], SourceType::ProjectGutenberg),
    (&["gutenberg.net.au/"], SourceType::ProjectGutenbergAustralia),
    (&["gutenberg.ca/"], SourceType::ProjectGutenbergCanada),
    (&["archive.org/details"], SourceType::InternetArchive),
    (&["hathitrust.org/"], SourceType::HathiTrust),
    (&["wikisource.org/"], SourceType::Wikisource),
    (&["books.google.com/", "google.com/books/"], SourceType::GoogleBooks),
    (&["www.fadedpage.com"], SourceType::FadedPage),
];

const WAYBACK_MACHINE: &str = "web.archive.org/web/";

pub fn classify_source_url(url: &str) -> SourceType {
    let url = url.to_lowercase();
    let is_wayback = url.contains(WAYBACK_MACHINE);

    for (needles, source_type) in SOURCE_RULES {
        // A Wayback capture of an item page is not an Internet Archive scan.
        if *source_type == SourceType::InternetArchive && is_wayback {
            continue;
        }
        if needles.iter().any(|n| url.contains(n)) {
            return *source_type;
        }
    }

    SourceType::Other
}

pub fn resolve_sources(meta: &PackageMetadata) -> Vec<EbookSource> {
    meta.values("dc:source")
        .into_iter()
        .map(|url| EbookSource {
            source_type: classify_source_url(&url),
            url,
        })
        .collect()
}
