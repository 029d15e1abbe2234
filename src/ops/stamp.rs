// テキストスタンプ系: 透かし・ページ番号・ヘッダー/フッター・任意テキスト

use chrono::Local;
use tracing::debug;

use crate::error::TransformError;
use crate::geometry::{Anchor, Rect, Rgb, parse_color, ui_to_pdf_y};
use crate::pdf::PdfDocument;
use crate::pdf::content::{ContentBuilder, Matrix};
use crate::pdf::fonts::{StandardFont, encode_win_ansi};
use crate::rules::{
    AddHeaderFooter, AddPageNumbers, AddText, AddWatermark, Alignment, resolve_or_all,
};

/// アンカー配置時のデフォルト余白（pt）。
pub const DEFAULT_MARGIN: f64 = 30.0;

/// テキストの配置方法。
#[derive(Debug, Clone, Copy)]
pub enum Placement {
    /// 9点アンカー + 余白。
    Anchor { anchor: Anchor, margin: f64 },
    /// UI座標（可視領域の左上原点）。
    Ui { x: f64, y: f64 },
}

impl Placement {
    /// 要素の左下座標（PDF座標）を求める。
    pub fn locate(self, area: &Rect, width: f64, height: f64) -> (f64, f64) {
        match self {
            Placement::Anchor { anchor, margin } => anchor.resolve(area, width, height, margin),
            Placement::Ui { x, y } => (area.x + x, area.y + ui_to_pdf_y(area.height, y, height)),
        }
    }

    /// `x`/`y` が両方あればUI座標、なければアンカー。
    pub fn from_parts(x: Option<f64>, y: Option<f64>, anchor: Option<Anchor>, fallback: Anchor) -> Self {
        match (x, y) {
            (Some(x), Some(y)) => Placement::Ui { x, y },
            _ => Placement::Anchor {
                anchor: anchor.unwrap_or(fallback),
                margin: DEFAULT_MARGIN,
            },
        }
    }
}

/// 1行テキストの描画パラメータ。
#[derive(Debug, Clone)]
pub struct TextStamp<'a> {
    pub text: &'a str,
    pub font: StandardFont,
    pub size: f64,
    pub color: Rgb,
    pub opacity: f64,
    /// テキスト枠の中心まわりの回転（度、反時計回り）。
    pub rotation: f64,
}

impl TextStamp<'_> {
    /// 計測したテキスト幅・高さ。
    pub fn extent(&self) -> (f64, f64) {
        (
            self.font.text_width(self.text, self.size),
            self.font.text_height(self.size),
        )
    }
}

/// 1ページにテキストを描画する。
pub fn draw_text(
    doc: &mut PdfDocument,
    index: usize,
    stamp: &TextStamp<'_>,
    placement: Placement,
) -> crate::error::Result<()> {
    if stamp.size <= 0.0 {
        return Err(TransformError::validation("font size must be positive"));
    }
    let area = doc.page_info(index)?.crop_box;
    let (width, height) = stamp.extent();
    let (x, y) = placement.locate(&area, width, height);

    // ベースライン左端を原点とし、テキスト枠の中心で回転させる
    let descent = stamp.font.descent(stamp.size);
    let (cx, cy) = (x + width / 2.0, y + height / 2.0);
    let text_matrix = Matrix::translate(-width / 2.0, -height / 2.0 + descent)
        .multiply(&Matrix::rotate(stamp.rotation))
        .multiply(&Matrix::translate(cx, cy));

    let font_name = doc.use_font(index, stamp.font)?;
    let gs = doc.use_opacity(index, stamp.opacity)?;

    let mut content = ContentBuilder::new();
    if let Some(name) = &gs {
        content.graphics_state(name);
    }
    content.fill_color(stamp.color).text(
        font_name,
        stamp.size,
        &text_matrix,
        encode_win_ansi(stamp.text),
    );
    doc.append_content(index, content.encode()?)
}

pub fn add_watermark(doc: &mut PdfDocument, rule: &AddWatermark) -> crate::error::Result<()> {
    if rule.text.trim().is_empty() {
        return Err(TransformError::validation("watermark text cannot be empty"));
    }
    let rotation = rule
        .rotation
        .unwrap_or(if rule.position == Anchor::Center { 45.0 } else { 0.0 });
    let stamp = TextStamp {
        text: &rule.text,
        font: StandardFont::HelveticaBold,
        size: rule.font_size,
        color: parse_color(&rule.color)?,
        opacity: rule.opacity,
        rotation,
    };
    let placement = Placement::Anchor {
        anchor: rule.position,
        margin: DEFAULT_MARGIN,
    };
    let targets = resolve_or_all(rule.pages.as_ref(), doc.page_count())?;
    for &index in &targets {
        draw_text(doc, index, &stamp, placement)?;
    }
    debug!(pages = targets.len(), text = %rule.text, "watermark applied");
    Ok(())
}

/// `{n}`/`{page}` と `{total}` を置換する。
fn format_page_number(format: &str, n: i64, total: usize) -> String {
    format
        .replace("{n}", &n.to_string())
        .replace("{page}", &n.to_string())
        .replace("{total}", &total.to_string())
}

pub fn add_page_numbers(doc: &mut PdfDocument, rule: &AddPageNumbers) -> crate::error::Result<()> {
    let color = parse_color(&rule.color)?;
    let total = doc.page_count();
    let targets = resolve_or_all(rule.pages.as_ref(), total)?;
    let placement = Placement::Anchor {
        anchor: rule.position,
        margin: rule.margin,
    };
    for &index in &targets {
        let label = format_page_number(&rule.format, rule.start_number + index as i64, total);
        let stamp = TextStamp {
            text: &label,
            font: StandardFont::Helvetica,
            size: rule.font_size,
            color,
            opacity: 1.0,
            rotation: 0.0,
        };
        draw_text(doc, index, &stamp, placement)?;
    }
    debug!(pages = targets.len(), "page numbers applied");
    Ok(())
}

fn header_anchor(alignment: Alignment) -> Anchor {
    match alignment {
        Alignment::Left => Anchor::TopLeft,
        Alignment::Center => Anchor::TopCenter,
        Alignment::Right => Anchor::TopRight,
    }
}

fn footer_anchor(alignment: Alignment) -> Anchor {
    match alignment {
        Alignment::Left => Anchor::BottomLeft,
        Alignment::Center => Anchor::BottomCenter,
        Alignment::Right => Anchor::BottomRight,
    }
}

/// `{page}`, `{total}`, `{date}` を置換する。
pub fn expand_placeholders(template: &str, page: usize, total: usize, date: &str) -> String {
    template
        .replace("{page}", &page.to_string())
        .replace("{total}", &total.to_string())
        .replace("{date}", date)
}

pub fn add_header_footer(doc: &mut PdfDocument, rule: &AddHeaderFooter) -> crate::error::Result<()> {
    let header = rule.header_text.as_deref().filter(|t| !t.trim().is_empty());
    let footer = rule.footer_text.as_deref().filter(|t| !t.trim().is_empty());
    if header.is_none() && footer.is_none() {
        return Err(TransformError::validation(
            "headerText or footerText is required",
        ));
    }
    let color = parse_color(&rule.color)?;
    let total = doc.page_count();
    let date = Local::now().format("%Y-%m-%d").to_string();
    let targets = resolve_or_all(rule.pages.as_ref(), total)?;

    let slots = [
        (header, header_anchor(rule.alignment)),
        (footer, footer_anchor(rule.alignment)),
    ];
    for &index in &targets {
        for (template, anchor) in slots {
            let Some(template) = template else {
                continue;
            };
            let text = expand_placeholders(template, index + 1, total, &date);
            let stamp = TextStamp {
                text: &text,
                font: StandardFont::Helvetica,
                size: rule.font_size,
                color,
                opacity: 1.0,
                rotation: 0.0,
            };
            draw_text(
                doc,
                index,
                &stamp,
                Placement::Anchor {
                    anchor,
                    margin: rule.margin,
                },
            )?;
        }
    }
    Ok(())
}

pub fn add_text(doc: &mut PdfDocument, rule: &AddText) -> crate::error::Result<()> {
    if rule.text.is_empty() {
        return Err(TransformError::validation("text cannot be empty"));
    }
    let stamp = TextStamp {
        text: &rule.text,
        font: if rule.bold {
            StandardFont::HelveticaBold
        } else {
            StandardFont::Helvetica
        },
        size: rule.font_size,
        color: parse_color(&rule.color)?,
        opacity: rule.opacity,
        rotation: 0.0,
    };
    let placement = Placement::from_parts(rule.x, rule.y, rule.position, Anchor::TopLeft);
    let targets = resolve_or_all(rule.pages.as_ref(), doc.page_count())?;
    for &index in &targets {
        draw_text(doc, index, &stamp, placement)?;
    }
    Ok(())
}
