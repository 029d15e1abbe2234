// 枠線・背景・画像の描画

use tracing::debug;

use crate::error::TransformError;
use crate::geometry::{Anchor, Rect, fit_size, parse_color};
use crate::ops::stamp::{DEFAULT_MARGIN, Placement};
use crate::pdf::PdfDocument;
use crate::pdf::content::ContentBuilder;
use crate::pdf::image::{EmbeddedImage, decode_base64, embed_image};
use crate::rules::{AddBackground, AddBorder, AddImage, BorderStyle, resolve_or_all};

/// 線幅に対する破線パターン。
fn dash_pattern(style: BorderStyle, width: f64) -> Vec<f64> {
    match style {
        BorderStyle::Solid => Vec::new(),
        BorderStyle::Dashed => vec![width * 3.0, width * 2.0],
        BorderStyle::Dotted => vec![width, width * 1.5],
    }
}

pub fn add_border(doc: &mut PdfDocument, rule: &AddBorder) -> crate::error::Result<()> {
    if rule.width <= 0.0 {
        return Err(TransformError::validation("border width must be positive"));
    }
    let color = parse_color(&rule.color)?;
    let targets = resolve_or_all(rule.pages.as_ref(), doc.page_count())?;
    for &index in &targets {
        let area = doc.page_info(index)?.crop_box;
        let frame = Rect::new(
            area.x + rule.margin,
            area.y + rule.margin,
            area.width - 2.0 * rule.margin,
            area.height - 2.0 * rule.margin,
        );
        if frame.width <= 0.0 || frame.height <= 0.0 {
            return Err(TransformError::validation(format!(
                "border margin {} leaves no room on page {}",
                rule.margin,
                index + 1
            )));
        }
        let mut content = ContentBuilder::new();
        content
            .stroke_color(color)
            .line_width(rule.width)
            .dash(&dash_pattern(rule.style, rule.width))
            .rect(&frame)
            .stroke();
        doc.append_content(index, content.encode()?)?;
    }
    debug!(pages = targets.len(), style = ?rule.style, "border applied");
    Ok(())
}

/// 画像を矩形に描画するコンテンツを作る。
pub fn image_content(
    doc: &mut PdfDocument,
    index: usize,
    image: &EmbeddedImage,
    placed: &Rect,
    opacity: f64,
) -> crate::error::Result<Vec<u8>> {
    let name = format!("TfImg{}", image.id.0);
    doc.use_xobject(index, &name, image.id)?;
    let gs = doc.use_opacity(index, opacity)?;
    let mut content = ContentBuilder::new();
    if let Some(gs) = &gs {
        content.graphics_state(gs);
    }
    content.image(&name, placed);
    content.encode()
}

/// 背景色または背景画像を既存コンテンツの背面に敷く。
pub fn add_background(doc: &mut PdfDocument, rule: &AddBackground) -> crate::error::Result<()> {
    if rule.color.is_none() && rule.image_data.is_none() {
        return Err(TransformError::validation("color or imageData is required"));
    }
    let color = rule.color.as_deref().map(parse_color).transpose()?;
    let image = match &rule.image_data {
        Some(data) => Some(embed_image(doc, &decode_base64(data)?)?),
        None => None,
    };

    let targets = resolve_or_all(rule.pages.as_ref(), doc.page_count())?;
    for &index in &targets {
        let info = doc.page_info(index)?;
        let mut layers = Vec::new();
        if let Some(color) = color {
            let gs = doc.use_opacity(index, rule.opacity)?;
            let mut content = ContentBuilder::new();
            if let Some(gs) = &gs {
                content.graphics_state(gs);
            }
            content.fill_rect(&info.media_box, color);
            layers.push(content.encode()?);
        }
        if let Some(image) = &image {
            let area = info.crop_box;
            let (w, h) = fit_size(image.natural_size(), None, None, (area.width, area.height));
            let (x, y) = Anchor::Center.resolve(&area, w, h, 0.0);
            layers.push(image_content(doc, index, image, &Rect::new(x, y, w, h), rule.opacity)?);
        }
        // 背面から順に重なるよう逆順に前置する
        for layer in layers.into_iter().rev() {
            doc.prepend_content(index, layer)?;
        }
    }
    debug!(pages = targets.len(), "background applied");
    Ok(())
}

pub fn add_image(doc: &mut PdfDocument, rule: &AddImage) -> crate::error::Result<()> {
    let bytes = decode_base64(&rule.image_data)?;
    let image = embed_image(doc, &bytes)?;
    let placement = match (rule.x, rule.y) {
        (Some(x), Some(y)) => Placement::Ui { x, y },
        _ => Placement::Anchor {
            anchor: rule.position.unwrap_or_default(),
            margin: DEFAULT_MARGIN,
        },
    };

    let targets = resolve_or_all(rule.pages.as_ref(), doc.page_count())?;
    for &index in &targets {
        let area = doc.page_info(index)?.crop_box;
        let (w, h) = fit_size(
            image.natural_size(),
            rule.width,
            rule.height,
            (area.width, area.height),
        );
        if w <= 0.0 || h <= 0.0 {
            return Err(TransformError::validation("image width and height must be positive"));
        }
        let (x, y) = placement.locate(&area, w, h);
        let content = image_content(doc, index, &image, &Rect::new(x, y, w, h), rule.opacity)?;
        doc.append_content(index, content)?;
    }
    debug!(
        pages = targets.len(),
        width = image.width,
        height = image.height,
        "image stamped"
    );
    Ok(())
}
