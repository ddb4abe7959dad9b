use thiserror::Error;

/// Errors surfaced by [`crate::LayoutRegistry`] operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("layout not found: {0}")]
    NotFound(crate::LayoutId),

    #[error("layout invalid: {0}")]
    Invalid(String),
}
