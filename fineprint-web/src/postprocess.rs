use fineprint_config::{DEFAULT_TRUNCATION_MARKER, LimitsConfig};

use crate::error::ExtractionError;

/// Character bounds applied to extracted text. Lengths count Unicode
/// scalar values, not bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLimits {
    pub min_chars: usize,
    pub max_chars: usize,
    /// Appended after clamping; not counted toward `max_chars`.
    pub truncation_marker: String,
}

impl Default for TextLimits {
    fn default() -> Self {
        Self {
            min_chars: 200,
            max_chars: 50_000,
            truncation_marker: DEFAULT_TRUNCATION_MARKER.to_string(),
        }
    }
}

impl From<&LimitsConfig> for TextLimits {
    fn from(cfg: &LimitsConfig) -> Self {
        Self {
            min_chars: cfg.min_chars,
            max_chars: cfg.max_chars,
            truncation_marker: cfg.truncation_marker.clone(),
        }
    }
}

/// Trim, enforce the length floor, then clamp.
///
/// ```
/// use fineprint_web::{postprocess, TextLimits, ExtractionError};
///
/// let limits = TextLimits::default();
/// let err = postprocess("  too short  ", &limits).unwrap_err();
/// assert_eq!(err, ExtractionError::InsufficientContent(9));
///
/// let long = "a".repeat(60_000);
/// let out = postprocess(&long, &limits).unwrap();
/// assert!(out.ends_with("... (content truncated for analysis)"));
/// ```
pub fn postprocess(raw: &str, limits: &TextLimits) -> Result<String, ExtractionError> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();

    if len < limits.min_chars {
        return Err(ExtractionError::InsufficientContent(len));
    }

    if len <= limits.max_chars {
        return Ok(trimmed.to_string());
    }

    let cut = trimmed
        .char_indices()
        .nth(limits.max_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(trimmed.len());
    let mut out = String::with_capacity(cut + limits.truncation_marker.len());
    out.push_str(&trimmed[..cut]);
    out.push_str(&limits.truncation_marker);
    Ok(out)
}
