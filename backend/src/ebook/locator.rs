use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::CatalogConfig;
use crate::ebook::model::DownloadUrls;
use crate::error::CatalogError;

/// Where a title is served from and where its repository lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EbookLocation {
    pub www_path: PathBuf,
    pub repo_path: PathBuf,
    /// The serving path relative to the web root, e.g. `/ebooks/jules-verne/around-the-world-in-eighty-days`.
    pub url: String,
}

fn path_to_url(path: &Path) -> String {
    let parts: Vec<String> = path.components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .filter(|s| !s.is_empty() && s != "/")
        .collect();
    format!("/{}", parts.join("/"))
}

/// Pair the serving directory with its repository.
///
/// A serving directory with its own `.git` is its own repository. Otherwise
/// `{web_root}/ebooks/author/title` maps to `{repos_root}/author_title.git`,
/// falling back to `{repos_root}/author_title` for non-bare checkouts.
pub fn locate_ebook(www_path: &Path, config: &CatalogConfig) -> Result<EbookLocation, CatalogError> {
    if !www_path.is_dir() {
        return Err(CatalogError::NotFound(format!("Invalid www filesystem path: {}", www_path.display())));
    }

    let repo_path = if www_path.join(".git").is_dir() {
        www_path.to_path_buf()
    } else {
        let dist_path = config.ebooks_dist_path();
        let relative = www_path.strip_prefix(&dist_path)
            .map_err(|_| CatalogError::NotFound(format!(
                "{} is not under {}", www_path.display(), dist_path.display()
            )))?;

        let repo_name = relative.components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<String>>()
            .join("_");

        let bare = config.repos_root.join(format!("{}.git", repo_name));
        if bare.is_dir() {
            bare
        } else {
            config.repos_root.join(repo_name)
        }
    };

    if !repo_path.is_dir() {
        return Err(CatalogError::NotFound(format!("Invalid repo filesystem path: {}", repo_path.display())));
    }

    if !www_path.join("content.opf").is_file() {
        return Err(CatalogError::NotFound(format!("Invalid content.opf file: {}/content.opf", www_path.display())));
    }

    let url = match www_path.strip_prefix(&config.web_root) {
        Ok(relative) => path_to_url(relative),
        Err(_) => www_path.to_string_lossy().to_string(),
    };

    Ok(EbookLocation {
        www_path: www_path.to_path_buf(),
        repo_path,
        url,
    })
}

/// Byte size of `text/single-page.xhtml`, if it exists.
pub fn single_page_byte_count(www_path: &Path) -> Option<i64> {
    fs::metadata(www_path.join("text").join("single-page.xhtml"))
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len() as i64)
}

fn first_download_matching(names: &[String], matches: impl Fn(&str) -> bool) -> Option<&String> {
    names.iter().find(|n| matches(n))
}

/// Download URLs for whatever is present under `downloads/`. The first match
/// in file name order wins for each pattern.
pub fn find_download_urls(www_path: &Path, url: &str) -> DownloadUrls {
    let mut names: Vec<String> = match fs::read_dir(www_path.join("downloads")) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| !n.starts_with('.'))
            .collect(),
        Err(_) => return DownloadUrls::default(),
    };
    names.sort();

    let download_url = |name: &String| format!("{}/downloads/{}", url, name);

    DownloadUrls {
        kindle_cover_url: first_download_matching(&names, |n| n.ends_with("_EBOK_portrait.jpg")).map(download_url),
        epub_url: first_download_matching(&names, |n| n.ends_with(".epub")).map(download_url),
        advanced_epub_url: first_download_matching(&names, |n| n.ends_with("_advanced.epub")).map(download_url),
        kepub_url: first_download_matching(&names, |n| n.ends_with(".kepub.epub")).map(download_url),
        azw3_url: first_download_matching(&names, |n| n.ends_with(".azw3")).map(download_url),
        dist_cover_url: first_download_matching(&names, |n| n == "cover.jpg").map(download_url),
    }
}

/// Every title serving directory under `{web_root}/ebooks/`, i.e. every
/// directory holding a `content.opf`, in path order.
pub fn find_ebook_dirs(ebooks_path: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = WalkDir::new(ebooks_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == "content.opf")
        .filter_map(|e| e.path().parent().map(|p| p.to_path_buf()))
        .collect();
    dirs.sort();
    dirs
}
