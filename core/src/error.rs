use thiserror::Error;

/// Errors surfaced by [`crate::extract`] and its collaborators.
///
/// Per-row and per-slot failures (a character that doesn't match any
/// template, a stat that can't be sanitized) are never represented here —
/// they resolve to `None` fields on the returned record instead. Only
/// failures that abort the whole extraction are typed errors.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("OCR failed: {0}")]
    OcrFailure(String),

    #[error("OCR timed out after {0:?}")]
    OcrTimeout(std::time::Duration),

    #[error("custom layout invalid: {0}")]
    LayoutInvalid(String),

    #[error("failed to load templates: {0}")]
    TemplateLoadFailure(String),
}
