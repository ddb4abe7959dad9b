//! In-memory [`LayoutRegistry`] implementation.
//!
//! Ported from `backend/app/layouts/service.py`'s `LayoutService`, which
//! drove the same operations against a Postgres table through Supabase.
//! That persistence backend is out of scope for this crate;
//! this store is what a test harness or a single-process embedding uses
//! directly, and what a production `LayoutRegistry` impl backed by a real
//! database should match behaviorally.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;

use crate::{LayoutId, LayoutRegistry, LayoutSpec, RegistryError};

/// Default aspect-ratio tolerance for coalescing a saved candidate into an
/// existing layout (distinct from the tolerance a caller passes to
/// `best_for`, which can differ per read).
const DEFAULT_ASPECT_TOLERANCE: f64 = 0.05;
const DEFAULT_POSITION_TOLERANCE: f64 = 0.01;

/// Two layouts are "similar" when their aspect ratios are within
/// `aspect_tolerance` and every slot's x/y/size ratios are within
/// `position_tolerance`. Slot order matters; this is not a set comparison.
pub fn similar(a: &LayoutSpec, b: &LayoutSpec, aspect_tolerance: f64, position_tolerance: f64) -> bool {
    if (a.aspect_ratio - b.aspect_ratio).abs() > aspect_tolerance {
        return false;
    }

    a.icon_positions
        .iter()
        .zip(b.icon_positions.iter())
        .all(|(p, q)| {
            (p.x_ratio - q.x_ratio).abs() <= position_tolerance
                && (p.y_ratio - q.y_ratio).abs() <= position_tolerance
                && (p.size_ratio - q.size_ratio).abs() <= position_tolerance
        })
}

/// In-memory, single-process layout store.
///
/// Cloning is cheap (the inner store is `Arc`-shared); clone this to hand a
/// handle to multiple resolvers/threads instead of wrapping it again.
#[derive(Clone)]
pub struct InMemoryLayoutRegistry {
    layouts: Arc<RwLock<Vec<LayoutSpec>>>,
    next_id: Arc<AtomicU64>,
    aspect_tolerance: f64,
    position_tolerance: f64,
}

impl Default for InMemoryLayoutRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLayoutRegistry {
    /// Builds a store using the default tolerances (`aspect_tolerance =
    /// 0.05`, `position_tolerance = 0.01`) for coalescing similar
    /// candidates on `save`.
    pub fn new() -> Self {
        Self::with_tolerances(DEFAULT_ASPECT_TOLERANCE, DEFAULT_POSITION_TOLERANCE)
    }

    /// Builds a store with caller-supplied similarity tolerances, e.g. the
    /// same `aspect_tolerance`/`position_tolerance` an embedder loaded into
    /// its `ExtractorConfig`.
    pub fn with_tolerances(aspect_tolerance: f64, position_tolerance: f64) -> Self {
        Self {
            layouts: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            aspect_tolerance,
            position_tolerance,
        }
    }

    fn mint_id(&self) -> LayoutId {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        LayoutId(format!("layout-{n}"))
    }
}

impl LayoutRegistry for InMemoryLayoutRegistry {
    fn best_for(&self, aspect_ratio: f64, tolerance: f64) -> Option<LayoutSpec> {
        let layouts = self.layouts.read().expect("layout store lock poisoned");

        layouts
            .iter()
            .filter(|l| (l.aspect_ratio - aspect_ratio).abs() <= tolerance)
            .max_by(|a, b| {
                a.vote_count
                    .cmp(&b.vote_count)
                    .then(a.updated_at.cmp(&b.updated_at))
            })
            .cloned()
    }

    fn save(&self, mut candidate: LayoutSpec) -> Result<LayoutSpec, RegistryError> {
        if !candidate.is_valid() {
            return Err(RegistryError::Invalid(
                "icon positions out of range".to_string(),
            ));
        }

        let mut layouts = self.layouts.write().expect("layout store lock poisoned");

        if let Some(existing) = layouts
            .iter_mut()
            .find(|l| similar(l, &candidate, self.aspect_tolerance, self.position_tolerance))
        {
            existing.vote_count += 1;
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }

        candidate.id = self.mint_id();
        let now = Utc::now();
        candidate.created_at = now;
        candidate.updated_at = now;
        layouts.push(candidate.clone());
        Ok(candidate)
    }

    fn vote(&self, id: &LayoutId) -> Result<LayoutSpec, RegistryError> {
        let mut layouts = self.layouts.write().expect("layout store lock poisoned");

        let found = layouts
            .iter_mut()
            .find(|l| &l.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;

        found.vote_count += 1;
        found.updated_at = Utc::now();
        Ok(found.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RelativeIcon;

    fn icons(offset: f64) -> [RelativeIcon; 5] {
        [
            RelativeIcon::new(0.29 + offset, 0.29, 0.04),
            RelativeIcon::new(0.29 + offset, 0.42, 0.04),
            RelativeIcon::new(0.29 + offset, 0.555, 0.04),
            RelativeIcon::new(0.29 + offset, 0.69, 0.04),
            RelativeIcon::new(0.29 + offset, 0.825, 0.04),
        ]
    }

    #[test]
    fn save_twice_coalesces_votes() {
        let registry = InMemoryLayoutRegistry::new();
        let a = LayoutSpec::candidate(2.1695, 2556, 1179, icons(0.0));

        let first = registry.save(a.clone()).unwrap();
        assert_eq!(first.vote_count, 1);

        let second = registry.save(a).unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.vote_count, 2);

        let all_for_ratio = registry.best_for(2.1695, 0.05).unwrap();
        assert_eq!(all_for_ratio.vote_count, 2);
    }

    #[test]
    fn dissimilar_slot_creates_separate_record() {
        let registry = InMemoryLayoutRegistry::new();
        let a = LayoutSpec::candidate(2.1695, 2556, 1179, icons(0.0));
        let b = LayoutSpec::candidate(2.1695, 2556, 1179, icons(0.02));

        registry.save(a.clone()).unwrap();
        registry.save(a).unwrap();
        let b = registry.save(b).unwrap();
        assert_eq!(b.vote_count, 1);

        let best = registry.best_for(2.1695, 0.05).unwrap();
        assert_eq!(best.vote_count, 2);
        assert_ne!(best.id, b.id);
    }

    #[test]
    fn vote_unknown_id_fails() {
        let registry = InMemoryLayoutRegistry::new();
        let err = registry.vote(&LayoutId("nope".into())).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[test]
    fn vote_increments_by_exactly_one_each_call() {
        let registry = InMemoryLayoutRegistry::new();
        let saved = registry
            .save(LayoutSpec::candidate(1.439, 2360, 1640, icons(0.0)))
            .unwrap();

        for k in 1..=3 {
            let voted = registry.vote(&saved.id).unwrap();
            assert_eq!(voted.vote_count, 1 + k);
        }
    }

    #[test]
    fn best_for_prefers_most_votes_then_most_recent() {
        let registry = InMemoryLayoutRegistry::new();
        // Two dissimilar layouts at compatible aspect ratios.
        let a = registry
            .save(LayoutSpec::candidate(2.0, 2000, 1000, icons(0.0)))
            .unwrap();
        let b = registry
            .save(LayoutSpec::candidate(2.02, 2020, 1000, icons(0.1)))
            .unwrap();
        registry.vote(&b.id).unwrap();
        registry.vote(&b.id).unwrap();

        let best = registry.best_for(2.0, 0.05).unwrap();
        assert_eq!(best.id, b.id);
    }

    #[test]
    fn similarity_is_reflexive_and_symmetric() {
        let a = LayoutSpec::candidate(2.1695, 2556, 1179, icons(0.0));
        let b = LayoutSpec::candidate(2.1695, 2556, 1179, icons(0.005));
        assert!(similar(
            &a,
            &a,
            DEFAULT_ASPECT_TOLERANCE,
            DEFAULT_POSITION_TOLERANCE
        ));
        assert_eq!(
            similar(&a, &b, DEFAULT_ASPECT_TOLERANCE, DEFAULT_POSITION_TOLERANCE),
            similar(&b, &a, DEFAULT_ASPECT_TOLERANCE, DEFAULT_POSITION_TOLERANCE)
        );
    }
}
