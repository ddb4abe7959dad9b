//! LayoutResolver: turns an image's aspect ratio into five icon
//! regions.

use resultshot_registry::{IconRegion, LayoutRegistry, RelativeIcon};

use crate::error::ExtractError;

/// A fallback layout bucket: x-center, size, and five y-centers, all ratios.
struct FallbackBucket {
    x_ratio: f64,
    size_ratio: f64,
    y_ratios: [f64; 5],
}

const PHONE: FallbackBucket = FallbackBucket {
    x_ratio: 0.29,
    size_ratio: 0.04,
    y_ratios: [0.29, 0.42, 0.555, 0.69, 0.825],
};

const TABLET: FallbackBucket = FallbackBucket {
    x_ratio: 0.23,
    size_ratio: 0.062,
    y_ratios: [0.33, 0.44, 0.555, 0.665, 0.78],
};

const MEDIUM: FallbackBucket = FallbackBucket {
    x_ratio: 0.29,
    size_ratio: 0.04,
    y_ratios: [0.25, 0.37, 0.49, 0.61, 0.73],
};

fn fallback_bucket(aspect_ratio: f64) -> &'static FallbackBucket {
    if aspect_ratio > 2.0 {
        &PHONE
    } else if aspect_ratio < 1.6 {
        &TABLET
    } else {
        &MEDIUM
    }
}

fn bucket_icons(bucket: &FallbackBucket) -> [RelativeIcon; 5] {
    bucket
        .y_ratios
        .map(|y| RelativeIcon::new(bucket.x_ratio, y, bucket.size_ratio))
}

pub struct LayoutResolver {
    pub aspect_tolerance: f64,
}

impl LayoutResolver {
    pub fn new(aspect_tolerance: f64) -> Self {
        Self { aspect_tolerance }
    }

    /// Produce five IconRegions for an image of size `(w, h)`, ordered
    /// top-to-bottom. Selection priority: caller override, then the
    /// registry's best layout for this aspect ratio, then the built-in
    /// fallback buckets.
    pub fn resolve(
        &self,
        w: u32,
        h: u32,
        custom_layout: Option<&[RelativeIcon; 5]>,
        registry: &dyn LayoutRegistry,
    ) -> Result<[IconRegion; 5], ExtractError> {
        let aspect_ratio = w as f64 / h.max(1) as f64;

        if let Some(icons) = custom_layout {
            for icon in icons {
                if !icon.is_valid() {
                    return Err(ExtractError::LayoutInvalid(
                        "custom icon position out of range".to_string(),
                    ));
                }
            }
            return Ok(to_regions(icons, w, h));
        }

        if let Some(layout) = registry.best_for(aspect_ratio, self.aspect_tolerance) {
            return Ok(to_regions(&layout.icon_positions, w, h));
        }

        let bucket = fallback_bucket(aspect_ratio);
        Ok(to_regions(&bucket_icons(bucket), w, h))
    }
}

fn to_regions(icons: &[RelativeIcon; 5], w: u32, h: u32) -> [IconRegion; 5] {
    let mut regions = [IconRegion { x: 0, y: 0, w: 0, h: 0 }; 5];
    for (i, icon) in icons.iter().enumerate() {
        let size = (icon.size_ratio * w as f64).round() as i64;
        let cx = (icon.x_ratio * w as f64).round() as i64;
        let cy = (icon.y_ratio * h as f64).round() as i64;
        regions[i] = IconRegion {
            x: cx - size / 2,
            y: cy - size / 2,
            w: size.max(0) as u32,
            h: size.max(0) as u32,
        };
    }
    regions
}
