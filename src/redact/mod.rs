//! Position-blind text redaction.
//!
//! Glyph positions are never located. The engine searches the extracted text for
//! each phrase and then covers pages with opaque boxes according to a zone
//! density model. Coverage is best-effort: the named phrase is not guaranteed
//! to be fully covered, and other content may be covered too.

use rand::Rng;
use tracing::{info, warn};

use crate::error::TransformError;
use crate::geometry::{Rect, Rgb};
use crate::pdf::PdfDocument;
use crate::pdf::content::ContentBuilder;

/// ゾーン内側の左右余白（pt）。
const ZONE_MARGIN: f64 = 20.0;
const BOX_HEIGHT: f64 = 15.0;
const LINE_HEIGHT: f64 = 18.0;
const SLOT_GAP: f64 = 15.0;
const CHAR_WIDTH: f64 = 8.0;
const MIN_BOX_WIDTH: f64 = 40.0;
const JITTER_X: f64 = 3.0;
const JITTER_Y: f64 = 2.0;

/// (上端からの割合, 高さの割合, 密度)
const ZONES: [(f64, f64, f64); 3] = [(0.0, 0.15, 0.15), (0.15, 0.70, 0.25), (0.85, 0.15, 0.10)];

#[derive(Debug, Clone, Copy)]
enum Band {
    FromTop(f64),
    Middle,
    FromBottom(f64),
}

/// (帯の位置, 帯の高さ pt, 最大箱数)
const SAFETY_BANDS: [(Band, f64, u32); 3] = [
    (Band::FromTop(60.0), 50.0, 3),
    (Band::Middle, 300.0, 8),
    (Band::FromBottom(50.0), 50.0, 2),
];

const EMERGENCY_BOXES_PER_REGION: usize = 4;
const EMERGENCY_BOX_WIDTH: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedactionMode {
    /// 語句がテキスト中に見つかった: 全ページをゾーン密度で覆う。
    Comprehensive,
    /// 見つからなかった: 固定の3帯に少数の箱。
    Safety,
    /// テキスト抽出自体が失敗した。
    Emergency,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RedactionEntry {
    /// `Emergency` では `None`。
    pub word: Option<String>,
    pub mode: RedactionMode,
    pub boxes: Vec<Vec<Rect>>,
}

impl RedactionEntry {
    pub fn boxes_per_page(&self) -> Vec<usize> {
        self.boxes.iter().map(Vec::len).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedactionReport {
    pub entries: Vec<RedactionEntry>,
}

impl RedactionReport {
    pub fn total_boxes(&self) -> usize {
        self.entries
            .iter()
            .flat_map(|e| e.boxes.iter())
            .map(Vec::len)
            .sum()
    }
}

/// Redact `words` on every page of `doc`.
pub fn redact<R: Rng + ?Sized>(
    doc: &mut PdfDocument,
    words: &[String],
    rng: &mut R,
) -> crate::error::Result<RedactionReport> {
    let targets: Vec<&str> = words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .collect();
    if targets.is_empty() {
        return Err(TransformError::validation("redact_text requires at least one word"));
    }

    let areas = (0..doc.page_count())
        .map(|i| doc.page_info(i).map(|info| info.crop_box))
        .collect::<crate::error::Result<Vec<_>>>()?;

    let text = match doc.extract_text() {
        Ok(text) => text.to_lowercase(),
        Err(e) => {
            warn!(error = %e, "text extraction failed; applying emergency redaction");
            let boxes: Vec<Vec<Rect>> = areas.iter().map(|a| emergency_boxes(a, rng)).collect();
            draw_boxes(doc, &boxes)?;
            return Ok(RedactionReport {
                entries: vec![RedactionEntry {
                    word: None,
                    mode: RedactionMode::Emergency,
                    boxes,
                }],
            });
        }
    };

    let mut report = RedactionReport::default();
    for word in targets {
        let found = text.contains(&word.to_lowercase());
        let mode = if found {
            RedactionMode::Comprehensive
        } else {
            RedactionMode::Safety
        };
        let len = word.chars().count();
        let boxes: Vec<Vec<Rect>> = areas
            .iter()
            .map(|area| match mode {
                RedactionMode::Comprehensive => comprehensive_boxes(area, len, rng),
                _ => safety_boxes(area, len, rng),
            })
            .collect();
        draw_boxes(doc, &boxes)?;
        info!(
            word,
            ?mode,
            boxes = boxes.iter().map(Vec::len).sum::<usize>(),
            "redaction applied"
        );
        report.entries.push(RedactionEntry {
            word: Some(word.to_string()),
            mode,
            boxes,
        });
    }
    Ok(report)
}

pub fn box_width(phrase_len: usize) -> f64 {
    (phrase_len as f64 * CHAR_WIDTH).max(MIN_BOX_WIDTH)
}

/// ゾーンの (行数, 1行あたりのスロット数, 箱数)。
pub fn zone_capacity(zone_width: f64, zone_height: f64, phrase_len: usize, density: f64) -> (usize, usize, usize) {
    let lines = (zone_height / LINE_HEIGHT).floor().max(0.0) as usize;
    let slots = (zone_width / (box_width(phrase_len) + SLOT_GAP)).floor().max(0.0) as usize;
    let count = (slots as f64 * lines as f64 * density).floor() as usize;
    (lines, slots, count)
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, amount: f64) -> f64 {
    rng.gen_range(-amount..=amount)
}

pub fn comprehensive_boxes<R: Rng + ?Sized>(area: &Rect, phrase_len: usize, rng: &mut R) -> Vec<Rect> {
    let width = box_width(phrase_len);
    let zone_width = area.width - 2.0 * ZONE_MARGIN;
    let mut boxes = Vec::new();
    for (top_ratio, height_ratio, density) in ZONES {
        let zone_top = area.top() - area.height * top_ratio;
        let zone_height = area.height * height_ratio;
        let (lines, slots, count) = zone_capacity(zone_width, zone_height, phrase_len, density);
        if lines == 0 || slots == 0 {
            continue;
        }
        for _ in 0..count {
            let line = rng.gen_range(0..lines);
            let slot = rng.gen_range(0..slots);
            let x = area.x + ZONE_MARGIN + slot as f64 * (width + SLOT_GAP) + jitter(rng, JITTER_X);
            let y = zone_top - (line + 1) as f64 * LINE_HEIGHT + jitter(rng, JITTER_Y);
            boxes.push(Rect::new(x, y, width, BOX_HEIGHT));
        }
    }
    boxes
}

/// 帯の下端y座標（PDF座標）。
fn band_bottom(area: &Rect, band: Band, height: f64) -> f64 {
    match band {
        Band::FromTop(offset) => area.top() - offset - height,
        Band::Middle => area.y + (area.height - height) / 2.0,
        Band::FromBottom(offset) => area.y + offset,
    }
}

pub fn safety_boxes<R: Rng + ?Sized>(area: &Rect, phrase_len: usize, rng: &mut R) -> Vec<Rect> {
    let width = box_width(phrase_len);
    let span = (area.width - 2.0 * ZONE_MARGIN - width).max(0.0);
    let mut boxes = Vec::new();
    for (band, band_height, max_boxes) in SAFETY_BANDS {
        let bottom = band_bottom(area, band, band_height).max(area.y);
        let rise = (band_height - BOX_HEIGHT).max(0.0);
        let count = rng.gen_range(1..=max_boxes);
        for _ in 0..count {
            let x = area.x + ZONE_MARGIN + rng.gen_range(0.0..=span);
            let y = bottom + rng.gen_range(0.0..=rise);
            boxes.push(Rect::new(x, y, width, BOX_HEIGHT));
        }
    }
    boxes
}

/// 上半分と下半分に4個ずつ。
pub fn emergency_boxes<R: Rng + ?Sized>(area: &Rect, rng: &mut R) -> Vec<Rect> {
    let half = area.height / 2.0;
    let span = (area.width - 2.0 * ZONE_MARGIN - EMERGENCY_BOX_WIDTH).max(0.0);
    let rise = (half - 2.0 * ZONE_MARGIN - BOX_HEIGHT).max(0.0);
    let mut boxes = Vec::with_capacity(2 * EMERGENCY_BOXES_PER_REGION);
    for region_bottom in [area.y + half, area.y] {
        for _ in 0..EMERGENCY_BOXES_PER_REGION {
            let x = area.x + ZONE_MARGIN + rng.gen_range(0.0..=span);
            let y = region_bottom + ZONE_MARGIN + rng.gen_range(0.0..=rise);
            boxes.push(Rect::new(x, y, EMERGENCY_BOX_WIDTH, BOX_HEIGHT));
        }
    }
    boxes
}

fn draw_boxes(doc: &mut PdfDocument, boxes: &[Vec<Rect>]) -> crate::error::Result<()> {
    for (index, page_boxes) in boxes.iter().enumerate() {
        if page_boxes.is_empty() {
            continue;
        }
        let mut content = ContentBuilder::new();
        content.fill_color(Rgb::BLACK);
        for r in page_boxes {
            content.rect(r);
        }
        content.fill();
        doc.append_content(index, content.encode()?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const LETTER: Rect = Rect {
        x: 0.0,
        y: 0.0,
        width: 612.0,
        height: 792.0,
    };

    #[test]
    fn box_width_has_floor() {
        assert_eq!(box_width(2), 40.0);
        assert_eq!(box_width(10), 80.0);
    }

    #[test]
    fn body_zone_capacity_on_letter() {
        // 幅572、高さ554.4、"secret"(6文字 → 48pt)
        let (lines, slots, count) = zone_capacity(572.0, 792.0 * 0.7, 6, 0.25);
        assert_eq!(lines, 30);
        assert_eq!(slots, 9);
        assert_eq!(count, 67);
    }

    #[test]
    fn comprehensive_counts_are_deterministic_per_zone() {
        let mut rng = StdRng::seed_from_u64(7);
        let boxes = comprehensive_boxes(&LETTER, 6, &mut rng);
        // header 8 + body 67 + footer 5
        assert_eq!(boxes.len(), 80);
    }

    #[test]
    fn same_seed_same_boxes() {
        let a = comprehensive_boxes(&LETTER, 6, &mut StdRng::seed_from_u64(42));
        let b = comprehensive_boxes(&LETTER, 6, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn safety_stays_within_band_limits() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let boxes = safety_boxes(&LETTER, 6, &mut rng);
            assert!((3..=13).contains(&boxes.len()));
            for b in &boxes {
                assert!(b.y >= 0.0 && b.top() <= 792.0);
            }
        }
    }

    #[test]
    fn emergency_places_four_per_region() {
        let boxes = emergency_boxes(&LETTER, &mut StdRng::seed_from_u64(1));
        assert_eq!(boxes.len(), 8);
        assert_eq!(boxes.iter().filter(|b| b.y >= 396.0).count(), 4);
    }
}
