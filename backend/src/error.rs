use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    /// Serving directory, repository directory, manifest or catalog row is missing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed XML, or a required element (identifier, title, author) is missing.
    #[error("Parsing error: {0}")]
    Parsing(String),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("Duplicate ebook identifier: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound(_))
    }

    pub fn is_parsing(&self) -> bool {
        matches!(self, CatalogError::Parsing(_))
    }

    /// The collected violations, if this is a validation failure.
    pub fn validation_errors(&self) -> Option<&[ValidationError]> {
        match self {
            CatalogError::Validation(errors) => Some(&errors.0),
            _ => None,
        }
    }
}

/// One field-level constraint violation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Identifier is required")]
    IdentifierRequired,

    #[error("String too long for {field}: {len} bytes, maximum is {max}")]
    StringTooLong { field: &'static str, len: usize, max: usize },

    #[error("{0} path is required")]
    PathRequired(&'static str),

    #[error("{field} path is not readable: {path}")]
    PathUnreadable { field: &'static str, path: String },

    #[error("Invalid {field} URL: {url}")]
    InvalidDownloadUrl { field: &'static str, url: String },

    #[error("Title is required")]
    TitleRequired,

    #[error("Description is required")]
    DescriptionRequired,

    #[error("Long description is required")]
    LongDescriptionRequired,

    #[error("Language is required")]
    LanguageRequired,

    #[error("Word count must be greater than zero, got {0}")]
    InvalidWordCount(i64),

    #[error("Reading ease must be greater than zero, got {0}")]
    InvalidReadingEase(f64),

    #[error("Invalid GitHub URL: {0}")]
    InvalidGitHubUrl(String),

    #[error("Invalid Wikipedia URL: {0}")]
    InvalidWikipediaUrl(String),

    #[error("{0} date is required")]
    DateRequired(&'static str),

    #[error("{0} date is in the future")]
    DateInFuture(&'static str),

    #[error("Single page byte count is required")]
    SinglePageByteCountRequired,

    #[error("Indexable text is required")]
    IndexableTextRequired,

    #[error("At least one author is required")]
    AuthorRequired,

    #[error("{0} name is required")]
    NameRequired(&'static str),
}

/// All violations found for one record, in the order they were checked.
#[derive(Error, Debug, Clone, Default, PartialEq)]
#[error("Invalid ebook ({} error(s)): {}", .0.len(), join_validation_errors(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

fn join_validation_errors(errors: &[ValidationError]) -> String {
    errors.iter()
        .map(|e| e.to_string())
        .collect::<Vec<String>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn new() -> Self {
        ValidationErrors(Vec::new())
    }

    pub fn add(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    /// `Ok(())` when nothing was collected, otherwise the composite error.
    pub fn into_result(self) -> Result<(), CatalogError> {
        if self.has_errors() {
            Err(CatalogError::Validation(self))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_display_lists_all() {
        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::DescriptionRequired);
        errors.add(ValidationError::StringTooLong { field: "GitHub URL", len: 300, max: 255 });

        let msg = errors.to_string();
        assert!(msg.contains("2 error(s)"));
        assert!(msg.contains("Description is required"));
        assert!(msg.contains("GitHub URL: 300 bytes"));
    }

    #[test]
    fn test_empty_validation_errors_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::TitleRequired);
        let err = errors.into_result().unwrap_err();
        assert_eq!(err.validation_errors().map(|e| e.len()), Some(1));
    }
}
