//! MatchParser: orchestrates a single end-to-end extraction.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use resultshot_registry::LayoutRegistry;

use crate::datetime::{extract_duration, extract_played_at, jst};
use crate::error::ExtractError;
use crate::icon_matcher::IconMatcher;
use crate::image::OwnedImage;
use crate::ocr::{self, OcrBackend};
use crate::resolver::LayoutResolver;
use crate::templates::TemplateSet;
use crate::text_assembler::TextAssembler;
use crate::token::Token;

const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
const HEADER_BAND_FRACTION: f32 = 0.40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Victory,
    Defeat,
    Draw,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurvivorStats {
    pub position: u8,
    pub character: Option<String>,
    pub kite_time: Option<String>,
    pub decode_progress: Option<String>,
    pub board_hits: Option<u32>,
    pub rescues: Option<u32>,
    pub heals: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub outcome: Outcome,
    pub map_name: Option<String>,
    pub duration: Option<String>,
    pub played_at: Option<DateTime<FixedOffset>>,
    pub hunter_character: Option<String>,
    pub survivors: Vec<SurvivorStats>,
}

enum RegionOutput {
    Killer(Option<String>),
    Survivor(SurvivorStats),
}

/// The slot (0-based) playing the killer role, keyed by outcome. Data, not
/// control flow: adding an outcome variant is a single-line change.
fn killer_slot(outcome: Outcome) -> usize {
    match outcome {
        Outcome::Defeat => 4,
        _ => 0,
    }
}

pub struct MatchParser<'a> {
    pub templates: &'a TemplateSet,
    pub ocr_backend: Arc<OcrBackend>,
    pub resolver: &'a LayoutResolver,
    pub registry: &'a dyn LayoutRegistry,
    pub map_names: &'a [String],
    pub ocr_timeout: Duration,
    pub match_threshold: f32,
    pub ambiguity_margin: f32,
}

impl<'a> MatchParser<'a> {
    pub fn extract(
        &self,
        image_bytes: &[u8],
        custom_layout: Option<&[resultshot_registry::RelativeIcon; 5]>,
    ) -> Result<MatchRecord, ExtractError> {
        self.extract_at(image_bytes, custom_layout, now_jst())
    }

    /// Same as [`Self::extract`] but with an injectable "now", for
    /// deterministic datetime-rollover tests.
    pub fn extract_at(
        &self,
        image_bytes: &[u8],
        custom_layout: Option<&[resultshot_registry::RelativeIcon; 5]>,
        now: DateTime<FixedOffset>,
    ) -> Result<MatchRecord, ExtractError> {
        if image_bytes.len() > MAX_IMAGE_BYTES {
            return Err(ExtractError::InvalidImage(format!(
                "image is {} bytes, exceeds {} byte limit",
                image_bytes.len(),
                MAX_IMAGE_BYTES
            )));
        }

        let image = OwnedImage::decode(image_bytes)
            .map_err(|e| ExtractError::InvalidImage(e.to_string()))?;

        let mut tokens = ocr::recognize(self.ocr_backend.clone(), image.clone(), self.ocr_timeout)?;
        tokens.sort_by(|a, b| a.y_mid().partial_cmp(&b.y_mid()).unwrap());

        let outcome = detect_outcome(&tokens, image.height());
        let map_name = detect_map_name(&tokens, self.map_names);
        let played_at = tokens
            .iter()
            .find_map(|t| extract_played_at(&t.text, now));
        let duration = tokens.iter().find_map(|t| extract_duration(&t.text));

        let regions = self
            .resolver
            .resolve(image.width(), image.height(), custom_layout, self.registry)?;

        let matcher = IconMatcher::new(self.templates, self.match_threshold, self.ambiguity_margin);
        let killer_index = killer_slot(outcome);

        // Five regions, each independent: matched in its own thread rather
        // than pulling in rayon for a fixed, tiny fan-out.
        let outputs: Vec<RegionOutput> = std::thread::scope(|scope| {
            let image = &image;
            let tokens = &tokens;
            let matcher = &matcher;
            let handles: Vec<_> = regions
                .iter()
                .enumerate()
                .map(|(i, region)| {
                    scope.spawn(move || {
                        let rect = (
                            region.x.max(0) as u32,
                            region.y.max(0) as u32,
                            region.w,
                            region.h,
                        );
                        let matched = matcher.identify(image.as_image(), rect);

                        if i == killer_index {
                            return RegionOutput::Killer(matched.map(|m| m.character));
                        }

                        let fields =
                            TextAssembler::assemble(tokens, region.center_y() as f32, image.height());
                        RegionOutput::Survivor(SurvivorStats {
                            position: (i + 1) as u8,
                            character: matched.map(|m| m.character),
                            kite_time: fields.kite_time,
                            decode_progress: fields.decode_progress,
                            board_hits: fields.board_hits,
                            rescues: fields.rescues,
                            heals: fields.heals,
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().expect("region worker panicked")).collect()
        });

        let mut hunter_character = None;
        let mut survivors = Vec::new();
        for output in outputs {
            match output {
                RegionOutput::Killer(character) => hunter_character = character,
                RegionOutput::Survivor(stats) => survivors.push(stats),
            }
        }

        Ok(MatchRecord {
            outcome,
            map_name,
            duration,
            played_at,
            hunter_character,
            survivors,
        })
    }
}

fn now_jst() -> DateTime<FixedOffset> {
    chrono::Utc::now().with_timezone(&jst())
}

/// Walk sorted tokens top-to-bottom; within the top 40% of the image, test
/// outcome substrings in priority order. First match wins.
fn detect_outcome(tokens: &[Token], image_h: u32) -> Outcome {
    let header_limit = HEADER_BAND_FRACTION * image_h as f32;

    for token in tokens {
        if token.y_mid() > header_limit {
            continue;
        }
        if token.text.contains("相打") || token.text == "相" {
            return Outcome::Draw;
        }
        if token.text.contains("勝利") || token.text == "勝" {
            return Outcome::Victory;
        }
        if token.text.contains("敗北") || token.text == "敗" || token.text.contains("失敗") || token.text == "失" {
            return Outcome::Defeat;
        }
    }
    Outcome::Unknown
}

fn detect_map_name(tokens: &[Token], map_names: &[String]) -> Option<String> {
    for token in tokens {
        for name in map_names {
            if token.text.contains(name.as_str()) {
                return Some(name.clone());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Point;

    fn header_token(text: &str, y: f32) -> Token {
        Token::new(
            [
                Point::new(0.0, y - 5.0),
                Point::new(40.0, y - 5.0),
                Point::new(40.0, y + 5.0),
                Point::new(0.0, y + 5.0),
            ],
            text,
            0.95,
        )
    }

    #[test]
    fn draw_wins_priority_over_lower_defeat_token() {
        let tokens = vec![header_token("敗北", 300.0), header_token("相打ち", 120.0)];
        let mut sorted = tokens;
        sorted.sort_by(|a, b| a.y_mid().partial_cmp(&b.y_mid()).unwrap());
        assert_eq!(detect_outcome(&sorted, 1000), Outcome::Draw);
    }

    #[test]
    fn header_band_excludes_lower_tokens() {
        let tokens = vec![header_token("勝利", 900.0)];
        assert_eq!(detect_outcome(&tokens, 1000), Outcome::Unknown);
    }

    #[test]
    fn bare_glyph_substring_inside_another_word_does_not_match() {
        // "相手" ("opponent") contains 相 but isn't the one-character draw
        // token; it must not short-circuit the header scan as Draw.
        let tokens = vec![header_token("相手", 50.0), header_token("勝利", 100.0)];
        assert_eq!(detect_outcome(&tokens, 1000), Outcome::Victory);
    }

    #[test]
    fn bare_single_glyph_token_still_matches() {
        let tokens = vec![header_token("相", 50.0)];
        assert_eq!(detect_outcome(&tokens, 1000), Outcome::Draw);
    }

    #[test]
    fn killer_slot_is_last_on_defeat_first_otherwise() {
        assert_eq!(killer_slot(Outcome::Defeat), 4);
        assert_eq!(killer_slot(Outcome::Victory), 0);
        assert_eq!(killer_slot(Outcome::Draw), 0);
        assert_eq!(killer_slot(Outcome::Unknown), 0);
    }

    #[test]
    fn map_name_first_match_wins() {
        let tokens = vec![header_token("Asylum Grounds", 50.0)];
        let maps = vec!["Factory".to_string(), "Asylum".to_string()];
        assert_eq!(detect_map_name(&tokens, &maps), Some("Asylum".to_string()));
    }
}
