// 注釈・編集オーバーレイ（UI座標で指定された要素をページに描画する）

use lopdf::{Object, dictionary};
use tracing::debug;

use crate::error::TransformError;
use crate::geometry::{Anchor, Rect, Rgb, fit_size, parse_color, ui_to_pdf_y};
use crate::ops::decorate::image_content;
use crate::ops::metadata::text_string;
use crate::ops::stamp::{Placement, TextStamp, draw_text};
use crate::pdf::PdfDocument;
use crate::pdf::content::ContentBuilder;
use crate::pdf::fonts::StandardFont;
use crate::pdf::image::{decode_base64, embed_image};
use crate::rules::{Annotation, AnnotationKind, to_index};

const STICKY_NOTE_SIZE: f64 = 24.0;

fn default_size(kind: AnnotationKind) -> (f64, f64) {
    match kind {
        AnnotationKind::Highlight => (100.0, 20.0),
        AnnotationKind::StickyNote => (STICKY_NOTE_SIZE, STICKY_NOTE_SIZE),
        _ => (100.0, 50.0),
    }
}

fn default_color(kind: AnnotationKind) -> Rgb {
    match kind {
        AnnotationKind::Highlight | AnnotationKind::StickyNote => Rgb::YELLOW,
        AnnotationKind::Whiteout => Rgb::WHITE,
        _ => Rgb::BLACK,
    }
}

fn color_of(item: &Annotation) -> crate::error::Result<Rgb> {
    match item.color.as_deref() {
        Some(c) => parse_color(c),
        None => Ok(default_color(item.kind)),
    }
}

fn placement_of(item: &Annotation) -> Placement {
    Placement::from_parts(item.x, item.y, item.position, Anchor::Center)
}

/// 要素の矩形（PDF座標）を求める。
fn element_rect(item: &Annotation, area: &Rect, width: f64, height: f64) -> Rect {
    let (x, y) = placement_of(item).locate(area, width, height);
    Rect::new(x, y, width, height)
}

/// 注釈リストを順に適用する。`add_annotations` と `edit_pdf` で共通。
pub fn apply_annotations(doc: &mut PdfDocument, items: &[Annotation]) -> crate::error::Result<()> {
    let count = doc.page_count();
    for item in items {
        let index = to_index(item.page, count)?;
        apply_one(doc, index, item)?;
    }
    debug!(items = items.len(), "annotations applied");
    Ok(())
}

fn apply_one(doc: &mut PdfDocument, index: usize, item: &Annotation) -> crate::error::Result<()> {
    let area = doc.page_info(index)?.crop_box;
    let color = color_of(item)?;
    let (dw, dh) = default_size(item.kind);
    let width = item.width.unwrap_or(dw);
    let height = item.height.unwrap_or(dh);

    match item.kind {
        AnnotationKind::Text => {
            let text = item
                .text
                .as_deref()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| TransformError::validation("text annotation requires 'text'"))?;
            let stamp = TextStamp {
                text,
                font: StandardFont::Helvetica,
                size: item.font_size.unwrap_or(12.0),
                color,
                opacity: item.opacity.unwrap_or(1.0),
                rotation: 0.0,
            };
            draw_text(doc, index, &stamp, placement_of(item))
        }
        AnnotationKind::Highlight => {
            let r = element_rect(item, &area, width, height);
            let gs = doc.use_opacity(index, item.opacity.unwrap_or(0.4))?;
            let mut content = ContentBuilder::new();
            if let Some(gs) = &gs {
                content.graphics_state(gs);
            }
            content.fill_rect(&r, color);
            doc.append_content(index, content.encode()?)
        }
        AnnotationKind::StickyNote => {
            let r = element_rect(item, &area, width, height);
            let note = dictionary! {
                "Type" => "Annot",
                "Subtype" => "Text",
                "Rect" => rect_array(&r),
                "Contents" => text_string(item.text.as_deref().unwrap_or_default()),
                "Name" => "Comment",
                "C" => vec![Object::Real(color.r), Object::Real(color.g), Object::Real(color.b)],
                "F" => 4,
            };
            doc.add_annotation(index, note).map(|_| ())
        }
        AnnotationKind::Rectangle | AnnotationKind::Circle => {
            let r = element_rect(item, &area, width, height);
            let gs = doc.use_opacity(index, item.opacity.unwrap_or(1.0))?;
            let mut content = ContentBuilder::new();
            if let Some(gs) = &gs {
                content.graphics_state(gs);
            }
            content
                .stroke_color(color)
                .line_width(item.stroke_width.unwrap_or(2.0));
            if item.kind == AnnotationKind::Circle {
                content.ellipse(&r).stroke();
            } else {
                content.rect(&r).stroke();
            }
            doc.append_content(index, content.encode()?)
        }
        AnnotationKind::Line => {
            let (x1, y1) = match (item.x, item.y) {
                (Some(x), Some(y)) => (x, y),
                _ => return Err(TransformError::validation("line annotation requires x and y")),
            };
            let (x2, y2) = match (item.x2, item.y2) {
                (Some(x), Some(y)) => (x, y),
                _ => (x1 + width, y1),
            };
            let mut content = ContentBuilder::new();
            content
                .stroke_color(color)
                .line_width(item.stroke_width.unwrap_or(2.0))
                .move_to(area.x + x1, area.y + ui_to_pdf_y(area.height, y1, 0.0))
                .line_to(area.x + x2, area.y + ui_to_pdf_y(area.height, y2, 0.0))
                .stroke();
            doc.append_content(index, content.encode()?)
        }
        AnnotationKind::Image => {
            let data = item
                .image_data
                .as_deref()
                .ok_or_else(|| TransformError::validation("image annotation requires 'imageData'"))?;
            let image = embed_image(doc, &decode_base64(data)?)?;
            let (w, h) = fit_size(
                image.natural_size(),
                item.width,
                item.height,
                (area.width, area.height),
            );
            let r = element_rect(item, &area, w, h);
            let content = image_content(doc, index, &image, &r, item.opacity.unwrap_or(1.0))?;
            doc.append_content(index, content)
        }
        AnnotationKind::Redaction | AnnotationKind::Whiteout => {
            let r = element_rect(item, &area, width, height);
            let mut content = ContentBuilder::new();
            content.fill_rect(&r, color);
            doc.append_content(index, content.encode()?)
        }
    }
}

fn rect_array(r: &Rect) -> Vec<Object> {
    [r.x, r.y, r.right(), r.top()]
        .into_iter()
        .map(|v| Object::Real(v as f32))
        .collect()
}
