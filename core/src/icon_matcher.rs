//! Multi-scale template identification.

use image::GrayImage;

use crate::image::Image;
use crate::templates::TemplateSet;

const SCALES: [f32; 7] = [0.5, 0.7, 0.9, 1.0, 1.1, 1.3, 1.5];
const MIN_TEMPLATE_PX: u32 = 30;
const MAX_TEMPLATE_PX: u32 = 150;
const EXPAND_FRACTION: f32 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconKind {
    Survivor,
    Killer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IconMatch {
    pub character: String,
    pub kind: IconKind,
    pub score: f32,
    /// `true` when the margin to the second-best score is under the
    /// ambiguity margin; the character is still returned, just flagged.
    pub low_confidence: bool,
}

pub struct IconMatcher<'a> {
    templates: &'a TemplateSet,
    match_threshold: f32,
    ambiguity_margin: f32,
}

impl<'a> IconMatcher<'a> {
    pub fn new(templates: &'a TemplateSet, match_threshold: f32, ambiguity_margin: f32) -> Self {
        Self {
            templates,
            match_threshold,
            ambiguity_margin,
        }
    }

    /// Identify the character icon occupying `region` of `image`.
    ///
    /// Empty regions or empty template sets yield `None`. `region` is
    /// expanded by 10% on all sides (clipped to image bounds) before
    /// matching.
    pub fn identify(&self, image: Image, region: (u32, u32, u32, u32)) -> Option<IconMatch> {
        if self.templates.is_empty() {
            return None;
        }
        let (x, y, w, h) = region;
        if w == 0 || h == 0 {
            return None;
        }

        let pad_w = (w as f32 * EXPAND_FRACTION).round() as u32;
        let pad_h = (h as f32 * EXPAND_FRACTION).round() as u32;
        let ex = x.saturating_sub(pad_w);
        let ey = y.saturating_sub(pad_h);
        let ew = (w + 2 * pad_w).min(image.width().saturating_sub(ex));
        let eh = (h + 2 * pad_h).min(image.height().saturating_sub(ey));
        if ew == 0 || eh == 0 {
            return None;
        }

        let region_gray = image.sub_image(ex, ey, ew, eh).to_owned_image().to_gray_image();

        let all = self
            .templates
            .survivors
            .iter()
            .map(|t| (t, IconKind::Survivor))
            .chain(self.templates.killers.iter().map(|t| (t, IconKind::Killer)));

        let mut per_character: Vec<(String, IconKind, f32)> = Vec::new();

        for (template, kind) in all {
            let tmpl_gray = template.image.to_gray_image();
            let (tw0, th0) = tmpl_gray.dimensions();
            if tw0 == 0 || th0 == 0 {
                continue;
            }

            let mut best_for_template = f32::MIN;
            for scale in SCALES {
                let tw = (tw0 as f32 * scale).round() as u32;
                let th = (th0 as f32 * scale).round() as u32;
                if tw < MIN_TEMPLATE_PX || tw > MAX_TEMPLATE_PX {
                    continue;
                }
                if tw > region_gray.width() || th > region_gray.height() {
                    continue;
                }

                let scaled = resize_gray(&tmpl_gray, tw, th);
                let score = max_ncc(&region_gray, &scaled);
                if score > best_for_template {
                    best_for_template = score;
                }
            }

            if best_for_template > f32::MIN {
                per_character.push((template.name.clone(), kind, best_for_template));
            }
        }

        per_character.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap());
        let (character, kind, score) = per_character.first().cloned()?;
        if score < self.match_threshold {
            return None;
        }
        let second_best_score = per_character.get(1).map(|(_, _, s)| *s).unwrap_or(f32::MIN);

        Some(IconMatch {
            character,
            kind,
            score,
            low_confidence: (score - second_best_score) < self.ambiguity_margin,
        })
    }
}

fn resize_gray(img: &GrayImage, w: u32, h: u32) -> GrayImage {
    image::imageops::resize(img, w.max(1), h.max(1), image::imageops::FilterType::CatmullRom)
}

/// Slides `template` over `region` and returns the maximum zero-mean
/// normalized cross-correlation score across all valid positions.
///
/// Implemented from scratch rather than via an OpenCV binding (none present
/// in the reference pack); the formula matches `cv2.TM_CCOEFF_NORMED`
/// semantics.
fn max_ncc(region: &GrayImage, template: &GrayImage) -> f32 {
    let (rw, rh) = region.dimensions();
    let (tw, th) = template.dimensions();
    if tw > rw || th > rh {
        return f32::MIN;
    }

    let t_mean = mean(template);
    let t_dev: Vec<f32> = template.pixels().map(|p| p.0[0] as f32 - t_mean).collect();
    let t_denom = t_dev.iter().map(|v| v * v).sum::<f32>().sqrt();
    if t_denom == 0.0 {
        return f32::MIN;
    }

    let mut best = f32::MIN;
    for oy in 0..=(rh - th) {
        for ox in 0..=(rw - tw) {
            let mut patch_sum = 0f32;
            for y in 0..th {
                for x in 0..tw {
                    patch_sum += region.get_pixel(ox + x, oy + y).0[0] as f32;
                }
            }
            let patch_mean = patch_sum / (tw * th) as f32;

            let mut numerator = 0f32;
            let mut patch_denom = 0f32;
            for y in 0..th {
                for x in 0..tw {
                    let r = region.get_pixel(ox + x, oy + y).0[0] as f32 - patch_mean;
                    let t = t_dev[(y * tw + x) as usize];
                    numerator += r * t;
                    patch_denom += r * r;
                }
            }

            let denom = patch_denom.sqrt() * t_denom;
            let score = if denom > 0.0 { numerator / denom } else { 0.0 };
            if score > best {
                best = score;
            }
        }
    }
    best
}

fn mean(img: &GrayImage) -> f32 {
    let sum: u64 = img.pixels().map(|p| p.0[0] as u64).sum();
    sum as f32 / (img.width() * img.height()) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::OwnedImage;
    use crate::templates::{Template, TemplateKind as TK};
    use image::{GenericImageView, GrayImage, Luma, RgbImage};

    fn solid_owned(w: u32, h: u32, shade: u8) -> OwnedImage {
        let mut img = RgbImage::new(w, h);
        for p in img.pixels_mut() {
            *p = image::Rgb([shade, shade, shade]);
        }
        OwnedImage::decode(&encode_png(&img)).unwrap()
    }

    fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img.clone())
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn empty_template_set_yields_none() {
        let set = TemplateSet::default();
        let matcher = IconMatcher::new(&set, 0.40, 0.05);
        let img = solid_owned(100, 100, 128);
        assert!(matcher.identify(img.as_image(), (10, 10, 40, 40)).is_none());
    }

    #[test]
    fn zero_size_region_yields_none() {
        let mut set = TemplateSet::default();
        set.survivors.push(Template {
            name: "a".into(),
            kind: TK::Survivor,
            image: solid_owned(40, 40, 200),
        });
        let matcher = IconMatcher::new(&set, 0.40, 0.05);
        let img = solid_owned(100, 100, 128);
        assert!(matcher.identify(img.as_image(), (10, 10, 0, 0)).is_none());
    }

    #[test]
    fn max_ncc_perfect_match_is_one() {
        let mut region = GrayImage::new(20, 20);
        for (i, p) in region.pixels_mut().enumerate() {
            *p = Luma([(i % 256) as u8]);
        }
        let template = region.view(2, 2, 10, 10).to_image();
        let score = max_ncc(&region, &template);
        assert!(score > 0.99, "expected near-perfect match, got {score}");
    }
}
