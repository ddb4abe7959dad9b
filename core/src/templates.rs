//! Template directory loading.
//!
//! Layout read at startup:
//! ```text
//! <templates_root>/survivors/<name>.png
//! <templates_root>/hunters/<name>.png
//! <templates_root>/<name>.png         <- legacy; treated as survivor
//! ```

use std::collections::HashMap;
use std::path::Path;

use crate::error::ExtractError;
use crate::image::OwnedImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Survivor,
    Killer,
}

/// A character's reference image plus which set it was loaded from.
pub struct Template {
    pub name: String,
    pub kind: TemplateKind,
    pub image: OwnedImage,
}

/// The two disjoint template sets consulted by [`crate::icon_matcher::IconMatcher`].
#[derive(Default)]
pub struct TemplateSet {
    pub survivors: Vec<Template>,
    pub killers: Vec<Template>,
}

impl TemplateSet {
    pub fn is_empty(&self) -> bool {
        self.survivors.is_empty() && self.killers.is_empty()
    }

    /// Load templates from `root`, per the directory layout above.
    ///
    /// A single template failing to decode is logged and skipped
    /// (`TemplateLoadFailure` does not abort startup). A character name
    /// appearing in both typed directories is ambiguous and refuses to
    /// start, surfacing `TemplateLoadFailure`.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let root = root.as_ref();
        let mut survivors = load_dir(root.join("survivors"), TemplateKind::Survivor);
        let killers = load_dir(root.join("hunters"), TemplateKind::Killer);

        let killer_names: std::collections::HashSet<&str> =
            killers.iter().map(|t| t.name.as_str()).collect();
        for t in &survivors {
            if killer_names.contains(t.name.as_str()) {
                return Err(ExtractError::TemplateLoadFailure(format!(
                    "character name {:?} present in both survivors/ and hunters/",
                    t.name
                )));
            }
        }

        let survivor_names: std::collections::HashSet<&str> =
            survivors.iter().map(|t| t.name.as_str()).collect();
        let legacy = load_legacy(root, &survivor_names, &killer_names);

        survivors.extend(legacy);
        Ok(Self { survivors, killers })
    }
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

fn load_dir(dir: impl AsRef<Path>, kind: TemplateKind) -> Vec<Template> {
    let dir = dir.as_ref();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut templates = HashMap::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !is_png(&path) {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        match std::fs::read(&path).ok().and_then(|b| OwnedImage::decode(&b).ok()) {
            Some(image) => {
                templates.insert(
                    name.to_string(),
                    Template {
                        name: name.to_string(),
                        kind,
                        image,
                    },
                );
            }
            None => {
                tracing::warn!(path = %path.display(), "failed to decode template, skipping");
            }
        }
    }
    templates.into_values().collect()
}

/// Loads legacy top-level templates, skipping any name already claimed by
/// `survivors/` or `hunters/` so a character can't end up with two
/// `Template`s under the same name.
fn load_legacy(
    root: &Path,
    survivor_names: &std::collections::HashSet<&str>,
    killer_names: &std::collections::HashSet<&str>,
) -> Vec<Template> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };

    let mut templates = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if !is_png(&path) {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if survivor_names.contains(name) || killer_names.contains(name) {
            continue;
        }

        match std::fs::read(&path).ok().and_then(|b| OwnedImage::decode(&b).ok()) {
            Some(image) => {
                tracing::warn!(
                    character = name,
                    "loaded from legacy top-level template directory; treated as survivor"
                );
                templates.push(Template {
                    name: name.to_string(),
                    kind: TemplateKind::Survivor,
                    image,
                });
            }
            None => {
                tracing::warn!(path = %path.display(), "failed to decode legacy template, skipping");
            }
        }
    }
    templates
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn png_bytes(shade: u8) -> Vec<u8> {
        let mut img = RgbImage::new(4, 4);
        for p in img.pixels_mut() {
            *p = image::Rgb([shade, shade, shade]);
        }
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("resultshot_templates_test_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn legacy_name_already_in_survivors_is_not_duplicated() {
        let root = scratch_dir("legacy_dedup");
        std::fs::create_dir_all(root.join("survivors")).unwrap();
        std::fs::write(root.join("survivors/claudette.png"), png_bytes(100)).unwrap();
        std::fs::write(root.join("claudette.png"), png_bytes(200)).unwrap();

        let set = TemplateSet::load(&root).unwrap();
        let matches: Vec<_> = set
            .survivors
            .iter()
            .filter(|t| t.name == "claudette")
            .collect();
        assert_eq!(matches.len(), 1);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn legacy_name_already_in_hunters_is_skipped() {
        let root = scratch_dir("legacy_vs_hunter");
        std::fs::create_dir_all(root.join("hunters")).unwrap();
        std::fs::write(root.join("hunters/trapper.png"), png_bytes(100)).unwrap();
        std::fs::write(root.join("trapper.png"), png_bytes(200)).unwrap();

        let set = TemplateSet::load(&root).unwrap();
        assert!(!set.survivors.iter().any(|t| t.name == "trapper"));
        assert_eq!(set.killers.iter().filter(|t| t.name == "trapper").count(), 1);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn uppercase_extension_is_loaded() {
        let root = scratch_dir("uppercase_ext");
        std::fs::create_dir_all(root.join("survivors")).unwrap();
        std::fs::write(root.join("survivors/feng.PNG"), png_bytes(100)).unwrap();

        let set = TemplateSet::load(&root).unwrap();
        assert!(set.survivors.iter().any(|t| t.name == "feng"));

        let _ = std::fs::remove_dir_all(&root);
    }
}
