use std::fs;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use tempfile::TempDir;

use shelfmark_backend::CatalogConfig;
use shelfmark_backend::db::{open_catalog, CatalogDbHandle};
use shelfmark_backend::ebook::history::{HistoryError, HistoryReader};
use shelfmark_backend::ebook::model::CommitRecord;

/// A history reader returning fixed commits, most recent first.
pub struct StaticHistory(pub Vec<CommitRecord>);

impl HistoryReader for StaticHistory {
    fn recent_commits(&self, _repo_path: &Path, count: usize) -> Result<Vec<CommitRecord>, HistoryError> {
        Ok(self.0.iter().take(count).cloned().collect())
    }
}

#[allow(dead_code)]
/// A history reader that always fails, like a missing git binary.
pub struct FailingHistory;

impl HistoryReader for FailingHistory {
    fn recent_commits(&self, _repo_path: &Path, _count: usize) -> Result<Vec<CommitRecord>, HistoryError> {
        Err(HistoryError::ExitStatus("fatal: not a git repository".to_string()))
    }
}

#[allow(dead_code)]
pub fn sample_commits() -> Vec<CommitRecord> {
    vec![
        CommitRecord {
            created: DateTime::from_timestamp(1700000000, 0).unwrap(),
            hash: "3f2a9c1d8e7b6a5f4c3d2e1f0a9b8c7d6e5f4a3b".to_string(),
            message: "Typo fixes".to_string(),
        },
        CommitRecord {
            created: DateTime::from_timestamp(1690000000, 0).unwrap(),
            hash: "0b1c2d3e4f5a6b7c8d9e0f1a2b3c4d5e6f7a8b9c".to_string(),
            message: "Initial commit".to_string(),
        },
    ]
}

/// A temporary site: `www/ebooks/...` serving directories, bare repos under
/// `repos/`, and a catalog database file.
pub struct TestCatalog {
    pub dir: TempDir,
    pub config: CatalogConfig,
}

impl TestCatalog {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = CatalogConfig {
            web_root: dir.path().join("www"),
            repos_root: dir.path().join("repos"),
            database_url: Some(dir.path().join("catalog.sqlite3").to_string_lossy().to_string()),
            ..Default::default()
        };
        fs::create_dir_all(config.ebooks_dist_path()).unwrap();
        fs::create_dir_all(config.covers_path()).unwrap();
        fs::create_dir_all(&config.repos_root).unwrap();
        TestCatalog { dir, config }
    }

    #[allow(dead_code)]
    pub fn open_db(&self) -> CatalogDbHandle {
        open_catalog(&self.config).unwrap()
    }

    /// Write a title with the given manifest, a single-page text, an epub
    /// download and a bare repository. Returns the serving directory.
    pub fn write_title(&self, author_slug: &str, title_slug: &str, opf: &str) -> PathBuf {
        let www = self.config.ebooks_dist_path().join(author_slug).join(title_slug);
        fs::create_dir_all(www.join("text")).unwrap();
        fs::create_dir_all(www.join("downloads")).unwrap();
        fs::write(www.join("content.opf"), opf).unwrap();
        fs::write(www.join("text/single-page.xhtml"), "<html><body><p>Text</p></body></html>").unwrap();
        fs::write(www.join("downloads").join(format!("{}_{}.epub", author_slug, title_slug)), "epub").unwrap();

        let repo = self.config.repos_root.join(format!("{}_{}.git", author_slug, title_slug));
        fs::create_dir_all(repo).unwrap();

        www
    }
}

/// Manifest fields a test may want to vary.
pub struct OpfFields<'a> {
    pub author_slug: &'a str,
    pub title_slug: &'a str,
    pub title: &'a str,
    pub author: &'a str,
    pub author_file_as: &'a str,
    pub date: &'a str,
    pub word_count: i64,
    pub reading_ease: f64,
    pub tags: &'a [&'a str],
    pub extra: &'a str,
}

impl Default for OpfFields<'_> {
    fn default() -> Self {
        OpfFields {
            author_slug: "jules-verne",
            title_slug: "around-the-world-in-eighty-days",
            title: "Around the World in Eighty Days",
            author: "Jules Verne",
            author_file_as: "Verne, Jules",
            date: "2017-03-01T00:00:00Z",
            word_count: 63000,
            reading_ease: 62.5,
            tags: &["Fiction", "Adventure"],
            extra: "",
        }
    }
}

pub fn sample_opf(f: &OpfFields) -> String {
    let tags: String = f.tags.iter()
        .map(|t| format!("<meta property=\"se:subject\">{}</meta>\n", t))
        .collect();

    format!(r##"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" dir="ltr" prefix="se: https://standardebooks.org/vocab/1.0" unique-identifier="uid" version="3.0" xml:lang="en-GB">
<metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
<dc:identifier id="uid">url:https://standardebooks.org/ebooks/{author_slug}/{title_slug}</dc:identifier>
<dc:date>{date}</dc:date>
<meta property="dcterms:modified">2023-01-15T10:20:30Z</meta>
<dc:title id="title">{title}</dc:title>
<meta property="file-as" refines="#title">{title}</meta>
<dc:subject id="subject-1">Voyages around the world -- Fiction</dc:subject>
<dc:subject id="subject-2">Adventure stories</dc:subject>
{tags}<dc:description id="description">A wager sends a gentleman around the globe.</dc:description>
<meta id="long-description" property="se:long-description" refines="#description">&lt;p&gt;Phileas Fogg bets his fortune.&lt;/p&gt;</meta>
<dc:language>en-GB</dc:language>
<dc:source>https://www.gutenberg.org/ebooks/103</dc:source>
<dc:source>https://archive.org/details/aroundworldineig00vern</dc:source>
<meta property="se:word-count">{word_count}</meta>
<meta property="se:reading-ease.flesch">{reading_ease}</meta>
<meta property="se:url.encyclopedia.wikipedia">https://en.wikipedia.org/wiki/Around_the_World_in_Eighty_Days</meta>
<meta property="se:url.vcs.github">https://github.com/standardebooks/{author_slug}_{title_slug}</meta>
<dc:creator id="author">{author}</dc:creator>
<meta property="file-as" refines="#author">{author_file_as}</meta>
<meta property="se:url.encyclopedia.wikipedia" refines="#author">https://en.wikipedia.org/wiki/Jules_Verne</meta>
<meta property="role" refines="#author" scheme="marc:relators">aut</meta>
<dc:contributor id="translator">George Makepeace Towle</dc:contributor>
<meta property="role" refines="#translator" scheme="marc:relators">trl</meta>
<dc:contributor id="artist">Alphonse de Neuville</dc:contributor>
<meta property="role" refines="#artist" scheme="marc:relators">art</meta>
<dc:contributor id="producer-1">Jane Producer</dc:contributor>
<meta property="role" refines="#producer-1" scheme="marc:relators">bkp</meta>
<meta property="display-seq" refines="#producer-1">0</meta>
{extra}
</metadata>
</package>
"##,
        author_slug = f.author_slug,
        title_slug = f.title_slug,
        date = f.date,
        title = f.title,
        tags = tags,
        word_count = f.word_count,
        reading_ease = f.reading_ease,
        author = f.author,
        author_file_as = f.author_file_as,
        extra = f.extra,
    )
}

#[allow(dead_code)]
pub const COLLECTION_TOC: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>Table of Contents</title></head>
<body epub:type="frontmatter">
<nav id="toc" epub:type="toc">
<h2 epub:type="title">Table of Contents</h2>
<ol>
<li><a href="text/titlepage.xhtml">Titlepage</a></li>
<li><a href="text/imprint.xhtml">Imprint</a></li>
<li><a href="text/halftitlepage.xhtml">Short Fiction</a></li>
<li><a href="text/the-diamond-lens.xhtml">The Diamond Lens</a></li>
<li><a href="text/what-was-it.xhtml">What Was It?</a></li>
<li><a href="text/colophon.xhtml">Colophon</a></li>
<li><a href="text/uncopyright.xhtml">Uncopyright</a></li>
</ol>
</nav>
<nav id="landmarks" epub:type="landmarks">
<ol><li><a href="text/body.xhtml" epub:type="bodymatter z3998:fiction">Short Fiction</a></li></ol>
</nav>
</body>
</html>
"#;
