//! Crowd-sourced layout registry.
//!
//! Screen layouts (the five icon positions relative to image dimensions for
//! a given aspect ratio) vary across devices. Rather than shipping a static
//! table, callers submit candidate layouts observed at runtime; the registry
//! clusters similar submissions together and tracks how many times each has
//! been confirmed. [`LayoutResolver`] in the `core` crate consults a
//! `LayoutRegistry` as one of its layout sources.

mod error;
mod memory;
mod spec;

pub use error::RegistryError;
pub use memory::{similar, InMemoryLayoutRegistry};
pub use spec::{round4, IconRegion, LayoutId, LayoutSpec, RelativeIcon};

/// Storage and voting operations over [`LayoutSpec`] records.
///
/// Kept synchronous and object-safe (`&dyn LayoutRegistry`) so it can be
/// called from the middle of a synchronous pipeline regardless of whether
/// the embedding binary is running inside an async runtime. A production
/// deployment backs this with its own database-backed implementation; this
/// crate ships only [`InMemoryLayoutRegistry`].
pub trait LayoutRegistry: Send + Sync {
    /// Returns the highest-voted, most recently updated layout whose aspect
    /// ratio is within `tolerance` of `aspect_ratio`, if any.
    fn best_for(&self, aspect_ratio: f64, tolerance: f64) -> Option<LayoutSpec>;

    /// Persists `candidate`. If an existing layout is similar, that
    /// layout's vote count is incremented and returned instead of inserting
    /// a duplicate. Otherwise `candidate` is assigned an id and inserted
    /// with `vote_count = 1`.
    fn save(&self, candidate: LayoutSpec) -> Result<LayoutSpec, RegistryError>;

    /// Increments the vote count of the layout identified by `id`.
    fn vote(&self, id: &LayoutId) -> Result<LayoutSpec, RegistryError>;
}
