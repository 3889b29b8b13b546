use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::ExtractionError;

/// Text that passed every check, with its length fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    text: String,
    length: usize,
    url: String,
}

impl Extracted {
    pub fn new(text: String, url: impl Into<String>) -> Self {
        let length = text.chars().count();
        Self {
            text,
            length,
            url: url.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Character count of [`Extracted::text`], marker included.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Outcome of one extraction run.
///
/// Serialises to either
/// `{"success": true, "text": ..., "length": ..., "url": ...}` or
/// `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    Success(Extracted),
    Failure(ExtractionError),
}

impl ExtractionResult {
    /// Two-space indented JSON, the form written to stdout.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl From<Result<Extracted, ExtractionError>> for ExtractionResult {
    fn from(res: Result<Extracted, ExtractionError>) -> Self {
        match res {
            Ok(extracted) => Self::Success(extracted),
            Err(err) => Self::Failure(err),
        }
    }
}

impl Serialize for ExtractionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success(ok) => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("text", &ok.text)?;
                map.serialize_entry("length", &ok.length)?;
                map.serialize_entry("url", &ok.url)?;
                map.end()
            }
            Self::Failure(err) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", &err.to_string())?;
                map.end()
            }
        }
    }
}
