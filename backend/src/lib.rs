pub mod types;
pub mod error;
pub mod config;
pub mod helpers;
pub mod logger;
pub mod ebook;
pub mod library;

pub mod db;

use std::env;
use std::fs::create_dir_all;
use std::path::PathBuf;
use std::error::Error;
use app_dirs::{get_app_root, AppDataType, AppInfo};

pub use crate::config::CatalogConfig;
pub use crate::ebook::{EbookExtractor, EbookRecord};
pub use crate::error::{CatalogError, ValidationError, ValidationErrors};
pub use crate::library::{Library, LibraryPage, LibraryParams};

pub const APP_INFO: AppInfo = AppInfo{name: "shelfmark", author: "shelfmark"};

/// The data directory holding the catalog database and log files.
///
/// `SHELFMARK_DIR` takes precedence over the platform user data directory.
pub fn get_create_shelfmark_dir() -> Result<PathBuf, Box<dyn Error>> {
    let p = match env::var("SHELFMARK_DIR") {
        Ok(s) if !s.trim().is_empty() => PathBuf::from(s),
        _ => get_app_root(AppDataType::UserData, &APP_INFO)?,
    };
    if !p.exists() {
        create_dir_all(&p)?;
    }
    Ok(p)
}

pub fn get_create_catalog_db_path() -> PathBuf {
    get_create_shelfmark_dir().unwrap_or(PathBuf::from(".")).join("catalog.sqlite3")
}
