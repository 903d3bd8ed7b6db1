use std::fs;
use std::path::Path;

use crate::ebook::metadata::XmlDocument;
use crate::error::CatalogError;

/// Front and back matter that never counts as a work in a collection.
const TOC_STOPLIST: [&str; 5] = ["Titlepage", "Imprint", "Colophon", "Endnotes", "Uncopyright"];

/// Entry titles of the `toc` landmark nav in a navigation document.
///
/// Anchors are skipped if they are Roman-numeral-only (`z3998:roman`), in the
/// stoplist, or link to the half title page.
pub fn parse_toc_entries(xml: &str) -> Result<Vec<String>, CatalogError> {
    let doc = XmlDocument::parse(xml)?;

    let Some(body) = doc.find_path(&["html", "body"]) else {
        return Ok(Vec::new());
    };

    let is_toc_nav = |idx: usize| {
        let el = doc.element(idx);
        el.name == "nav" && el.attr("epub:type") == Some("toc")
    };

    let mut entries = Vec::new();

    for idx in doc.descendants(body) {
        let el = doc.element(idx);
        if el.name != "a" {
            continue;
        }

        let in_toc = doc.ancestors(idx)
            .take_while(|&a| a != body)
            .any(is_toc_nav);
        if !in_toc {
            continue;
        }

        if el.attr("epub:type").is_some_and(|t| t.contains("z3998:roman")) {
            continue;
        }
        if TOC_STOPLIST.contains(&el.text.as_str()) {
            continue;
        }
        if el.attr("href").is_some_and(|h| h.contains("halftitle")) {
            continue;
        }

        entries.push(el.text.clone());
    }

    Ok(entries)
}

pub fn read_toc_entries(www_path: &Path) -> Result<Vec<String>, CatalogError> {
    let toc_path = www_path.join("toc.xhtml");
    let xml = fs::read_to_string(&toc_path)
        .map_err(|e| CatalogError::Parsing(format!("Couldn't read {}: {}", toc_path.display(), e)))?;
    parse_toc_entries(&xml)
}
