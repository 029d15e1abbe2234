// CropBox変更（crop）とMediaBox変更（resize）

use tracing::debug;

use crate::error::TransformError;
use crate::geometry::{Margins, PagePreset, Rect};
use crate::pdf::PdfDocument;
use crate::pdf::content::Matrix;
use crate::rules::{CropPages, ResizePages, Size, resolve_or_all};

/// 1ルールにつき1つだけ指定される領域選択モード。
#[derive(Debug, Clone, Copy)]
enum BoxSelection {
    Explicit(Rect),
    Margins(Margins),
    Preset(PagePreset),
}

fn select_mode(
    explicit: Option<Rect>,
    margins: Option<Margins>,
    preset: Option<PagePreset>,
    explicit_name: &str,
) -> crate::error::Result<BoxSelection> {
    match (explicit, margins, preset) {
        (Some(r), None, None) => Ok(BoxSelection::Explicit(r)),
        (None, Some(m), None) => Ok(BoxSelection::Margins(m)),
        (None, None, Some(p)) => Ok(BoxSelection::Preset(p)),
        (None, None, None) => Err(TransformError::validation(format!(
            "one of {explicit_name}, margins or preset is required"
        ))),
        _ => Err(TransformError::validation(format!(
            "{explicit_name}, margins and preset are mutually exclusive"
        ))),
    }
}

fn ensure_positive(r: &Rect) -> crate::error::Result<()> {
    if r.width <= 0.0 || r.height <= 0.0 {
        return Err(TransformError::validation(format!(
            "resulting box {:.1}x{:.1} has no area",
            r.width, r.height
        )));
    }
    Ok(())
}

/// ページの可視領域（CropBox）を変更する。
///
/// 明示指定の矩形はMediaBox左下からの相対座標として解釈する。
pub fn crop_pages(doc: &mut PdfDocument, rule: &CropPages) -> crate::error::Result<()> {
    let mode = select_mode(rule.crop_box, rule.margins, rule.preset, "cropBox")?;
    let targets = resolve_or_all(rule.pages.as_ref(), doc.page_count())?;

    for &index in &targets {
        let media = doc.page_info(index)?.media_box;
        let crop = match mode {
            BoxSelection::Explicit(r) => Rect::new(media.x + r.x, media.y + r.y, r.width, r.height),
            BoxSelection::Margins(m) => Rect::new(
                media.x + m.left,
                media.y + m.bottom,
                media.width - m.left - m.right,
                media.height - m.top - m.bottom,
            ),
            BoxSelection::Preset(p) => {
                let (w, h) = p.dimensions();
                let (w, h) = (w.min(media.width), h.min(media.height));
                Rect::new(
                    media.x + (media.width - w) / 2.0,
                    media.y + (media.height - h) / 2.0,
                    w,
                    h,
                )
            }
        };
        ensure_positive(&crop)?;
        doc.set_crop_box(index, crop)?;
    }
    debug!(pages = targets.len(), ?mode, "cropped pages");
    Ok(())
}

fn cm_prefix(m: &Matrix) -> Vec<u8> {
    format!(
        "q {:.6} {:.6} {:.6} {:.6} {:.4} {:.4} cm\n",
        m.a, m.b, m.c, m.d, m.e, m.f
    )
    .into_bytes()
}

/// ページサイズ（MediaBox）を変更する。
///
/// - `size` / `preset`: 新しい寸法。`scaleContent` なら内容を縦横比を保って拡縮し中央に置く。
/// - `margins`: 四辺に余白を足してページを広げ、内容はそのまま平行移動する。
pub fn resize_pages(doc: &mut PdfDocument, rule: &ResizePages) -> crate::error::Result<()> {
    let explicit = rule
        .size
        .map(|Size { width, height }| Rect::new(0.0, 0.0, width, height));
    let mode = select_mode(explicit, rule.margins, rule.preset, "size")?;
    let targets = resolve_or_all(rule.pages.as_ref(), doc.page_count())?;

    for &index in &targets {
        let media = doc.page_info(index)?.media_box;
        let to_origin = Matrix::translate(-media.x, -media.y);

        let (new_box, placement) = match mode {
            BoxSelection::Margins(m) => {
                let new_box = Rect::new(
                    0.0,
                    0.0,
                    media.width + m.left + m.right,
                    media.height + m.top + m.bottom,
                );
                (new_box, Some(to_origin.multiply(&Matrix::translate(m.left, m.bottom))))
            }
            BoxSelection::Explicit(r) => (r, scale_to_fit(rule.scale_content, &media, &r)),
            BoxSelection::Preset(p) => {
                let (w, h) = p.dimensions();
                let r = Rect::new(0.0, 0.0, w, h);
                (r, scale_to_fit(rule.scale_content, &media, &r))
            }
        };
        ensure_positive(&new_box)?;

        if let Some(matrix) = placement {
            doc.enclose_content(index, cm_prefix(&matrix), b"\nQ\n".to_vec())?;
        }
        doc.set_media_box(index, new_box)?;
    }
    debug!(pages = targets.len(), ?mode, "resized pages");
    Ok(())
}

/// 元のMediaBoxを新しい寸法に収める変換。拡縮しない場合も原点だけは合わせる。
fn scale_to_fit(scale_content: bool, media: &Rect, target: &Rect) -> Option<Matrix> {
    let to_origin = Matrix::translate(-media.x, -media.y);
    if !scale_content {
        return (media.x != 0.0 || media.y != 0.0).then_some(to_origin);
    }
    if media.width <= 0.0 || media.height <= 0.0 {
        return None;
    }
    let s = (target.width / media.width).min(target.height / media.height);
    let offset_x = (target.width - media.width * s) / 2.0;
    let offset_y = (target.height - media.height * s) / 2.0;
    Some(
        to_origin
            .multiply(&Matrix::scale(s, s))
            .multiply(&Matrix::translate(offset_x, offset_y)),
    )
}
