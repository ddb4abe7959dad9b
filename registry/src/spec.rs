//! Layout data types: the five-icon geometry shared by every screen size,
//! and the persistent, voted-on form of it kept by the registry.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rounds to four fractional digits, matching the serialized decimal form
/// used throughout the registry.
pub fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// A single icon's center position and size, relative to image dimensions.
///
/// `x_ratio` and `size_ratio` are relative to image width; `y_ratio` is
/// relative to image height. All three lie in `(0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeIcon {
    pub x_ratio: f64,
    pub y_ratio: f64,
    pub size_ratio: f64,
}

impl RelativeIcon {
    pub fn new(x_ratio: f64, y_ratio: f64, size_ratio: f64) -> Self {
        Self {
            x_ratio,
            y_ratio,
            size_ratio,
        }
    }

    /// True iff `size_ratio` is in `(0, 1)` and the icon stays fully inside
    /// the unit square after center-to-corner conversion.
    pub fn is_valid(&self) -> bool {
        if !(0.0 < self.size_ratio && self.size_ratio < 1.0) {
            return false;
        }
        let half = self.size_ratio / 2.0;
        (self.x_ratio - half) >= 0.0
            && (self.x_ratio + half) <= 1.0
            && (self.y_ratio - half) >= 0.0
            && (self.y_ratio + half) <= 1.0
    }
}

/// An axis-aligned pixel rectangle inside the source image. `w == h` in
/// every region this crate emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconRegion {
    pub x: i64,
    pub y: i64,
    pub w: u32,
    pub h: u32,
}

impl IconRegion {
    pub fn center_y(&self) -> i64 {
        self.y + self.h as i64 / 2
    }
}

/// Stable identifier for a [`LayoutSpec`].
///
/// The original backend assigned a database UUID; no UUID crate is present
/// anywhere in the reference pack this crate was grounded on, so ids are
/// minted from an in-process monotonic counter instead (see
/// [`crate::memory::InMemoryLayoutRegistry`]). The newtype keeps a future
/// UUID-backed store a non-breaking change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutId(pub String);

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Five icon centers with sizes, relative to image dimensions, keyed by
/// aspect ratio, plus the voting/timestamp bookkeeping the registry needs.
///
/// `icon_positions` always has exactly 5 entries; slot order is significant
/// (slots 1..5 are physical top-to-bottom positions on screen).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub id: LayoutId,
    pub aspect_ratio: f64,
    pub screen_width: u32,
    pub screen_height: u32,
    pub icon_positions: [RelativeIcon; 5],
    pub vote_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LayoutSpec {
    /// Build a new candidate layout with `vote_count = 1`. `id` and the
    /// timestamps are assigned by the registry at save time.
    pub fn candidate(
        aspect_ratio: f64,
        screen_width: u32,
        screen_height: u32,
        icon_positions: [RelativeIcon; 5],
    ) -> Self {
        let now = Utc::now();
        Self {
            id: LayoutId(String::new()),
            aspect_ratio: round4(aspect_ratio),
            screen_width,
            screen_height,
            icon_positions,
            vote_count: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.icon_positions.iter().all(RelativeIcon::is_valid)
    }
}
