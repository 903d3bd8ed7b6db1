//! Building a catalog record for one title from its serving directory,
//! `content.opf` manifest, navigation document and repository history.

pub mod model;
pub mod metadata;
pub mod locator;
pub mod history;
pub mod contributors;
pub mod collections;
pub mod sources;
pub mod toc;
pub mod derived;
pub mod validation;
pub mod extract;

pub use crate::ebook::extract::{EbookExtractor, ExtractionStage};
pub use crate::ebook::history::{GitHistoryReader, HistoryError, HistoryReader};
pub use crate::ebook::model::*;
