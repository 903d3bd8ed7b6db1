use std::fs;

mod helpers;
use helpers as h;

use shelfmark_backend::ebook::EbookExtractor;
use shelfmark_backend::error::ValidationError;
use shelfmark_backend::types::SourceType;
use shelfmark_backend::CatalogError;

fn extractor(t: &h::TestCatalog) -> EbookExtractor {
    EbookExtractor::with_history_reader(t.config.clone(), Box::new(h::StaticHistory(h::sample_commits())))
}

#[test]
fn test_extract_complete_title() {
    let t = h::TestCatalog::new();
    let www = t.write_title("jules-verne", "around-the-world-in-eighty-days", &h::sample_opf(&h::OpfFields::default()));

    let record = extractor(&t).extract(&www).unwrap();

    assert_eq!(record.identifier, "url:https://standardebooks.org/ebooks/jules-verne/around-the-world-in-eighty-days");
    assert_eq!(record.title, "Around the World in Eighty Days");
    assert_eq!(record.language.as_deref(), Some("en-GB"));
    assert_eq!(record.word_count, 63000);
    assert_eq!(record.reading_ease, 62.5);
    assert_eq!(record.long_description.as_deref(), Some("<p>Phileas Fogg bets his fortune.</p>"));
    assert!(record.ebook_created.is_some());
    assert!(record.ebook_updated.is_some());

    assert_eq!(record.authors.len(), 1);
    assert_eq!(record.authors[0].name, "Jules Verne");
    assert_eq!(record.authors[0].sort_name.as_deref(), Some("Verne, Jules"));
    assert_eq!(record.authors[0].url_name, "jules-verne");
    assert_eq!(record.authors[0].wikipedia_url.as_deref(), Some("https://en.wikipedia.org/wiki/Jules_Verne"));

    // The artist role isn't bucketed and the producer is display-suppressed.
    assert_eq!(record.translators.len(), 1);
    assert_eq!(record.translators[0].name, "George Makepeace Towle");
    assert!(record.illustrators.is_empty());
    assert!(record.contributors.is_empty());

    let tags: Vec<&str> = record.tags.iter().map(|t| t.url_name.as_str()).collect();
    assert_eq!(tags, vec!["fiction", "adventure"]);
    assert_eq!(record.loc_subjects.len(), 2);

    let sources: Vec<SourceType> = record.sources.iter().map(|s| s.source_type).collect();
    assert_eq!(sources, vec![SourceType::ProjectGutenberg, SourceType::InternetArchive]);

    assert_eq!(record.toc_entries, None);
    assert_eq!(record.git_commits.len(), 2);

    let d = &record.derived;
    assert_eq!(d.url, "/ebooks/jules-verne/around-the-world-in-eighty-days");
    assert_eq!(d.text_single_page_url, "/ebooks/jules-verne/around-the-world-in-eighty-days/text/single-page");
    assert_eq!(d.url_safe_identifier, "jules-verne_around-the-world-in-eighty-days");
    assert_eq!(d.authors_url, "/ebooks/jules-verne");
    assert_eq!(d.reading_time, "3 hours 50 minutes");
    assert_eq!(d.reading_ease_description, "average difficulty");
    assert!(d.has_downloads);
    assert!(d.indexable_text.starts_with("Around the World in Eighty Days Jules Verne Fiction Adventure"));

    let token = d.latest_commit_token.as_deref().unwrap();
    assert_eq!(token.len(), 8);
    assert!(d.images.cover_image_url.contains(token));

    assert!(record.downloads.epub_url.as_deref().unwrap().ends_with("jules-verne_around-the-world-in-eighty-days.epub"));
    assert!(record.text_single_page_byte_count.unwrap() > 0);
}

#[test]
fn test_extraction_is_deterministic() {
    let t = h::TestCatalog::new();
    let www = t.write_title("jules-verne", "around-the-world-in-eighty-days", &h::sample_opf(&h::OpfFields::default()));

    let ex = extractor(&t);
    let a = ex.extract(&www).unwrap();
    let b = ex.extract(&www).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_title_apostrophes_are_curled() {
    let t = h::TestCatalog::new();
    let opf = h::sample_opf(&h::OpfFields {
        author_slug: "mark-twain",
        title_slug: "the-adventures-of-tom-sawyer",
        title: "Tom Sawyer's Adventures",
        ..Default::default()
    });
    let www = t.write_title("mark-twain", "the-adventures-of-tom-sawyer", &opf);

    let record = extractor(&t).extract(&www).unwrap();
    assert_eq!(record.title, "Tom Sawyer’s Adventures");
}

#[test]
fn test_missing_identifier_is_a_parsing_error() {
    let t = h::TestCatalog::new();
    let opf = h::sample_opf(&h::OpfFields::default())
        .replace("<dc:identifier", "<dc:x-identifier")
        .replace("</dc:identifier>", "</dc:x-identifier>");
    let www = t.write_title("jules-verne", "around-the-world-in-eighty-days", &opf);

    let err = extractor(&t).extract(&www).unwrap_err();
    assert!(err.is_parsing(), "{:?}", err);
}

#[test]
fn test_missing_author_is_a_parsing_error() {
    let t = h::TestCatalog::new();
    let opf = h::sample_opf(&h::OpfFields::default())
        .replace(r#"<dc:creator id="author">Jules Verne</dc:creator>"#, "");
    let www = t.write_title("jules-verne", "around-the-world-in-eighty-days", &opf);

    let err = extractor(&t).extract(&www).unwrap_err();
    assert!(err.is_parsing(), "{:?}", err);
}

#[test]
fn test_blank_author_fails_validation() {
    let t = h::TestCatalog::new();
    let opf = h::sample_opf(&h::OpfFields::default())
        .replace(r#"<dc:creator id="author">Jules Verne</dc:creator>"#, r#"<dc:creator id="author"> </dc:creator>"#);
    let www = t.write_title("jules-verne", "around-the-world-in-eighty-days", &opf);

    let err = extractor(&t).extract(&www).unwrap_err();
    let errors = err.validation_errors().expect("validation error");
    assert!(errors.contains(&ValidationError::NameRequired("Author")), "{:?}", errors);
}

#[test]
fn test_non_utf8_manifest_is_a_parsing_error() {
    let t = h::TestCatalog::new();
    let www = t.write_title("jules-verne", "around-the-world-in-eighty-days", &h::sample_opf(&h::OpfFields::default()));
    let mut bytes = fs::read(www.join("content.opf")).unwrap();
    bytes.extend_from_slice(&[0xff, 0xfe, 0xfd]);
    fs::write(www.join("content.opf"), bytes).unwrap();

    let err = extractor(&t).extract(&www).unwrap_err();
    assert!(err.is_parsing(), "{:?}", err);
}

#[test]
fn test_malformed_manifest_is_a_parsing_error() {
    let t = h::TestCatalog::new();
    let opf = h::sample_opf(&h::OpfFields::default()).replace("</metadata>", "");
    let www = t.write_title("jules-verne", "around-the-world-in-eighty-days", &opf);

    assert!(extractor(&t).extract(&www).unwrap_err().is_parsing());
}

#[test]
fn test_missing_repository_is_not_found() {
    let t = h::TestCatalog::new();
    let www = t.write_title("jules-verne", "around-the-world-in-eighty-days", &h::sample_opf(&h::OpfFields::default()));
    fs::remove_dir_all(t.config.repos_root.join("jules-verne_around-the-world-in-eighty-days.git")).unwrap();

    assert!(extractor(&t).extract(&www).unwrap_err().is_not_found());
}

#[test]
fn test_validation_errors_are_aggregated() {
    let t = h::TestCatalog::new();
    let long_repo = "x".repeat(300);
    let opf = h::sample_opf(&h::OpfFields::default())
        .replace(r#"<dc:description id="description">A wager sends a gentleman around the globe.</dc:description>"#, "")
        .replace(
            "https://github.com/standardebooks/jules-verne_around-the-world-in-eighty-days",
            &format!("https://github.com/standardebooks/{}", long_repo),
        );
    let www = t.write_title("jules-verne", "around-the-world-in-eighty-days", &opf);

    let err = extractor(&t).extract(&www).unwrap_err();
    let errors = err.validation_errors().expect("validation error");

    assert!(errors.len() >= 2, "{:?}", errors);
    assert!(errors.contains(&ValidationError::DescriptionRequired));
    assert!(errors.iter().any(|e| matches!(e, ValidationError::StringTooLong { field: "GitHub URL", .. })));
    assert!(err.to_string().contains("Description"));
}

#[test]
fn test_invalid_word_count_fails_validation() {
    let t = h::TestCatalog::new();
    let opf = h::sample_opf(&h::OpfFields { word_count: 0, reading_ease: -3.0, ..Default::default() });
    let www = t.write_title("jules-verne", "around-the-world-in-eighty-days", &opf);

    let err = extractor(&t).extract(&www).unwrap_err();
    let errors = err.validation_errors().unwrap();
    assert!(errors.contains(&ValidationError::InvalidWordCount(0)));
    assert!(errors.contains(&ValidationError::InvalidReadingEase(-3.0)));
}

#[test]
fn test_future_date_fails_validation() {
    let t = h::TestCatalog::new();
    let opf = h::sample_opf(&h::OpfFields { date: "2999-01-01T00:00:00Z", ..Default::default() });
    let www = t.write_title("jules-verne", "around-the-world-in-eighty-days", &opf);

    let err = extractor(&t).extract(&www).unwrap_err();
    assert!(err.validation_errors().unwrap().contains(&ValidationError::DateInFuture("Ebook created")));
}

#[test]
fn test_history_failure_gives_empty_history() {
    let t = h::TestCatalog::new();
    let www = t.write_title("jules-verne", "around-the-world-in-eighty-days", &h::sample_opf(&h::OpfFields::default()));

    let ex = EbookExtractor::with_history_reader(t.config.clone(), Box::new(h::FailingHistory));
    let record = ex.extract(&www).unwrap();

    assert!(record.git_commits.is_empty());
    assert_eq!(record.derived.latest_commit_token, None);
    assert_eq!(
        record.derived.images.cover_image_url,
        "/images/covers/jules-verne_around-the-world-in-eighty-days-cover.jpg"
    );
}

#[test]
fn test_collection_toc_entries() {
    let t = h::TestCatalog::new();
    let opf = h::sample_opf(&h::OpfFields {
        author_slug: "various-authors",
        title_slug: "short-fiction",
        extra: r#"<meta property="se:is-a-collection">true</meta>"#,
        ..Default::default()
    });
    let www = t.write_title("various-authors", "short-fiction", &opf);

    // Flagged as a collection but no navigation document.
    assert!(extractor(&t).extract(&www).unwrap_err().is_parsing());

    fs::write(www.join("toc.xhtml"), h::COLLECTION_TOC).unwrap();
    let record = extractor(&t).extract(&www).unwrap();
    assert_eq!(
        record.toc_entries,
        Some(vec!["The Diamond Lens".to_string(), "What Was It?".to_string()])
    );
    assert!(record.derived.indexable_text.contains("The Diamond Lens"));
}

#[test]
fn test_collection_toc_with_only_excluded_entries_is_empty() {
    let t = h::TestCatalog::new();
    let opf = h::sample_opf(&h::OpfFields {
        author_slug: "various-authors",
        title_slug: "short-fiction",
        extra: r#"<meta property="se:is-a-collection">true</meta>"#,
        ..Default::default()
    });
    let www = t.write_title("various-authors", "short-fiction", &opf);

    let toc = h::COLLECTION_TOC
        .replace(r#"<li><a href="text/the-diamond-lens.xhtml">The Diamond Lens</a></li>"#, "")
        .replace(r#"<li><a href="text/what-was-it.xhtml">What Was It?</a></li>"#, "");
    fs::write(www.join("toc.xhtml"), toc).unwrap();

    let record = extractor(&t).extract(&www).unwrap();
    assert_eq!(record.toc_entries, Some(Vec::new()));
}

#[test]
fn test_toc_ignored_unless_flagged() {
    let t = h::TestCatalog::new();
    let www = t.write_title("jules-verne", "around-the-world-in-eighty-days", &h::sample_opf(&h::OpfFields::default()));
    fs::write(www.join("toc.xhtml"), h::COLLECTION_TOC).unwrap();

    let record = extractor(&t).extract(&www).unwrap();
    assert_eq!(record.toc_entries, None);
}

#[test]
fn test_collections_and_role_exclusivity() {
    let t = h::TestCatalog::new();
    let opf = h::sample_opf(&h::OpfFields {
        extra: r##"
<meta property="belongs-to-collection" id="collection-1">The Voyages Extraordinaires</meta>
<meta property="collection-type" refines="#collection-1">series</meta>
<meta property="group-position" refines="#collection-1">11</meta>
<meta property="belongs-to-collection" id="collection-2">the voyages extraordinaires</meta>
<dc:contributor id="illustrator-1">George Makepeace Towle</dc:contributor>
<meta property="role" refines="#illustrator-1">ill</meta>
<dc:contributor id="illustrator-2">Léon Benett</dc:contributor>
<meta property="role" refines="#illustrator-2">ill</meta>
"##,
        ..Default::default()
    });
    let www = t.write_title("jules-verne", "around-the-world-in-eighty-days", &opf);

    let record = extractor(&t).extract(&www).unwrap();

    // Same slug, first name wins.
    assert_eq!(record.collections.len(), 1);
    assert_eq!(record.collections[0].collection.url_name, "the-voyages-extraordinaires");
    assert_eq!(record.collection_position("The Voyages Extraordinaires"), Some(11));
    assert!(record.derived.indexable_text.contains("The Voyages Extraordinaires"));

    // An illustrator who is also the translator is only credited as translator.
    let illustrators: Vec<&str> = record.illustrators.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(illustrators, vec!["Léon Benett"]);
    assert_eq!(record.illustrators[0].url_name, "leon-benett");
}

#[test]
fn test_wayback_source_is_not_internet_archive() {
    let t = h::TestCatalog::new();
    let opf = h::sample_opf(&h::OpfFields {
        extra: "<dc:source>https://web.archive.org/web/20200101000000/https://archive.org/details/foo</dc:source>",
        ..Default::default()
    });
    let www = t.write_title("jules-verne", "around-the-world-in-eighty-days", &opf);

    let record = extractor(&t).extract(&www).unwrap();
    let last = record.sources.last().unwrap();
    assert!(last.url.starts_with("https://web.archive.org/web/"));
    assert_eq!(last.source_type, SourceType::Other);
}

#[test]
fn test_missing_serving_directory() {
    let t = h::TestCatalog::new();
    let www = t.config.ebooks_dist_path().join("nobody/nothing");

    let err = extractor(&t).extract(&www).unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}
