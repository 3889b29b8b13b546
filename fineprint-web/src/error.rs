use thiserror::Error;

/// Every way an extraction can end without text.
///
/// The `Display` output is the exact message placed in the `error` field
/// of the JSON result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// Wrong command-line arguments; carries the program name.
    #[error("Usage: {0} <url>")]
    Usage(String),

    #[error("Invalid URL provided")]
    InvalidUrl,

    #[error("Could not fetch content from URL")]
    FetchFailed,

    #[error("Could not extract text content from page")]
    ExtractionFailed,

    /// Trimmed text shorter than the configured floor; carries its length.
    #[error("Insufficient content extracted: only {0} characters")]
    InsufficientContent(usize),

    /// Any other fault raised by a collaborator.
    #[error("Extraction failed: {0}")]
    Unexpected(String),
}

impl ExtractionError {
    pub fn unexpected(err: impl std::fmt::Display) -> Self {
        Self::Unexpected(err.to_string())
    }
}
