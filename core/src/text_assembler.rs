//! TextAssembler: associates OCR tokens with one icon row and
//! reconstructs its five numeric fields from label/value adjacency.

use regex::Regex;
use std::sync::LazyLock;

use crate::token::Token;

const ROW_BAND_FRACTION: f32 = 0.08;
const COLUMN_TOLERANCE_PX: f32 = 50.0;
const X_BUCKET_PX: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Decode,
    Kite,
    Rescue,
    Board,
    Heal,
}

fn classify(text: &str) -> Option<Label> {
    if text.contains("解読") || text.contains("進捗") || text.contains("進排") || text.contains("進度") {
        return Some(Label::Decode);
    }
    if text.contains("牽制") || text.contains("制") || text.contains("への") || text.contains("ハンターへの") {
        return Some(Label::Kite);
    }
    if text.contains("援助") || text.contains("救助") {
        return Some(Label::Rescue);
    }
    if text.contains('板') && text.contains("命中") {
        return Some(Label::Board);
    }
    if text.contains("治療") {
        return Some(Label::Heal);
    }
    None
}

/// The five numeric fields TextAssembler produces for one survivor row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFields {
    pub kite_time: Option<String>,
    pub decode_progress: Option<String>,
    pub board_hits: Option<u32>,
    pub rescues: Option<u32>,
    pub heals: Option<u32>,
}

pub struct TextAssembler;

impl TextAssembler {
    /// Build the row fields for a survivor whose icon center sits at
    /// `target_y` in an image of height `image_h`.
    pub fn assemble(tokens: &[Token], target_y: f32, image_h: u32) -> RowFields {
        let band = ROW_BAND_FRACTION * image_h as f32;
        let mut row: Vec<&Token> = tokens
            .iter()
            .filter(|t| (t.y_mid() - target_y).abs() <= band)
            .collect();

        row.sort_by(|a, b| {
            let key = |t: &&Token| ((t.x_mid() / X_BUCKET_PX).round() * X_BUCKET_PX, t.y_mid());
            key(a).partial_cmp(&key(b)).unwrap()
        });

        let mut fields = RowFields::default();

        for (i, token) in row.iter().enumerate() {
            let Some(label) = classify(&token.text) else {
                continue;
            };

            match label {
                Label::Decode if fields.decode_progress.is_none() => {
                    if let Some(next) = row.get(i + 1) {
                        fields.decode_progress = parse_decode(&next.text);
                    }
                }
                Label::Kite if fields.kite_time.is_none() => {
                    if let Some(next) = row.get(i + 1) {
                        fields.kite_time = parse_kite(&next.text);
                    }
                }
                Label::Rescue if fields.rescues.is_none() => {
                    if let Some(value) = find_column_value(&row, i, token.x_mid(), token.y_mid()) {
                        fields.rescues = parse_count(&value.text);
                    }
                }
                Label::Board if fields.board_hits.is_none() => {
                    if let Some(value) = find_column_value(&row, i, token.x_mid(), token.y_mid()) {
                        fields.board_hits = parse_count(&value.text);
                    }
                }
                Label::Heal if fields.heals.is_none() => {
                    if let Some(value) = find_column_value(&row, i, token.x_mid(), token.y_mid()) {
                        fields.heals = parse_count(&value.text);
                    }
                }
                _ => {}
            }
        }

        fields
    }
}

/// Scans the row after index `i` for the first token in the same column
/// (x-mid within `COLUMN_TOLERANCE_PX`) lying below `label_y`, skipping any
/// token that is itself a recognized label.
fn find_column_value<'a>(
    row: &[&'a Token],
    i: usize,
    label_x: f32,
    label_y: f32,
) -> Option<&'a Token> {
    row[i + 1..].iter().copied().find(|t| {
        (t.x_mid() - label_x).abs() <= COLUMN_TOLERANCE_PX
            && t.y_mid() > label_y
            && classify(&t.text).is_none()
    })
}

fn sanitize_base(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '.')
        .collect()
}

static DECODE_PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{1,3})\s*[%％]").unwrap());
static DECODE_TRAILING9_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{1,3})[9９]").unwrap());

/// Decode-progress sanitization: `o`/`O` -> `0`, `g`/`G` -> `%`, then
/// `NNN%` is matched directly; a bare trailing `9` (a common misread of `%`)
/// is accepted as a fallback.
fn parse_decode(raw: &str) -> Option<String> {
    let s = sanitize_base(raw)
        .chars()
        .map(|c| match c {
            'o' | 'O' => '0',
            'g' | 'G' => '%',
            other => other,
        })
        .collect::<String>();

    if let Some(caps) = DECODE_PERCENT_RE.captures(&s) {
        return Some(format!("{}%", &caps[1]));
    }
    if let Some(caps) = DECODE_TRAILING9_RE.captures(&s) {
        return Some(format!("{}%", &caps[1]));
    }
    None
}

static KITE_MIN_SEC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)分(\d+)[sS秒]$").unwrap());
static KITE_SEC_UNIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)[sS秒]$").unwrap());
// Fallback for when the unit glyph itself was misread and absorbed into the
// digit substitution below (seed case: "34G" -> "346", no unit glyph left).
static KITE_DIGITS_ONLY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)$").unwrap());

/// Kite-time sanitization: `O`/`o` -> `0`, `G`/`g` -> `6`, then
/// `M分SSs`/`NNs` forms are matched and normalized to whole seconds. No
/// upper bound is applied (an open question resolved by preserving source behavior).
fn parse_kite(raw: &str) -> Option<String> {
    let s = sanitize_base(raw)
        .chars()
        .map(|c| match c {
            'O' | 'o' => '0',
            'G' | 'g' => '6',
            other => other,
        })
        .collect::<String>();

    if let Some(caps) = KITE_MIN_SEC_RE.captures(&s) {
        let minutes: u64 = caps[1].parse().ok()?;
        let seconds: u64 = caps[2].parse().ok()?;
        return Some(format!("{}s", minutes * 60 + seconds));
    }
    if let Some(caps) = KITE_SEC_UNIT_RE.captures(&s) {
        let seconds: u64 = caps[1].parse().ok()?;
        return Some(format!("{}s", seconds));
    }
    if let Some(caps) = KITE_DIGITS_ONLY_RE.captures(&s) {
        let seconds: u64 = caps[1].parse().ok()?;
        return Some(format!("{}s", seconds));
    }
    None
}

static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{1,2})$").unwrap());

/// Board-hit/rescue/heal sanitization: plain 1-2 digit counts only; anything
/// reaching 3+ digits belongs to decode progress, not a count.
fn parse_count(raw: &str) -> Option<u32> {
    let s = sanitize_base(raw);
    COUNT_RE.captures(&s).and_then(|caps| caps[1].parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Point;

    fn token(x: f32, y: f32, text: &str) -> Token {
        let w = 20.0;
        let h = 10.0;
        Token::new(
            [
                Point::new(x - w / 2.0, y - h / 2.0),
                Point::new(x + w / 2.0, y - h / 2.0),
                Point::new(x + w / 2.0, y + h / 2.0),
                Point::new(x - w / 2.0, y + h / 2.0),
            ],
            text,
            0.95,
        )
    }

    #[test]
    fn decode_glyph_confusion_g_means_percent() {
        assert_eq!(parse_decode("112g"), Some("112%".to_string()));
    }

    #[test]
    fn kite_unit_absorbed_into_digits_seed_case() {
        assert_eq!(parse_kite("34G"), Some("346s".to_string()));
    }

    #[test]
    fn kite_minute_second_form() {
        assert_eq!(parse_kite("1分05s"), Some("65s".to_string()));
    }

    #[test]
    fn count_rejects_three_digits() {
        assert_eq!(parse_count("100"), None);
        assert_eq!(parse_count("7"), Some(7));
    }

    #[test]
    fn assembles_full_row_from_seed_case_one() {
        let y = 500.0;
        let tokens = vec![
            token(100.0, y, "牽制"),
            token(140.0, y, "34s"),
            token(200.0, y, "解読"),
            token(240.0, y, "112%"),
            token(300.0, y, "援助"),
            token(300.0, y + 40.0, "2"),
            token(360.0, y, "板命中"),
            token(360.0, y + 40.0, "3"),
            token(420.0, y, "治療"),
            token(420.0, y + 40.0, "1"),
        ];

        let fields = TextAssembler::assemble(&tokens, y, 2000);
        assert_eq!(fields.kite_time, Some("34s".to_string()));
        assert_eq!(fields.decode_progress, Some("112%".to_string()));
        assert_eq!(fields.rescues, Some(2));
        assert_eq!(fields.board_hits, Some(3));
        assert_eq!(fields.heals, Some(1));
    }

    #[test]
    fn tokens_outside_band_are_excluded() {
        let tokens = vec![token(100.0, 0.0, "治療"), token(100.0, 40.0, "9")];
        let fields = TextAssembler::assemble(&tokens, 1000.0, 2000);
        assert_eq!(fields.heals, None);
    }
}
