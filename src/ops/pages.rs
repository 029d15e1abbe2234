// ページ集合を変更する操作: 削除・回転・抽出・並べ替え・反転・空白ページ挿入

use tracing::{debug, info};

use crate::error::TransformError;
use crate::pdf::PdfDocument;
use crate::rules::{
    AddBlankPage, ExtractPages, RearrangePages, RemovePages, RotatePages, resolve_or_all,
    to_index,
};

/// 回転として受け付ける角度。
pub const ALLOWED_ANGLES: [i64; 4] = [90, 180, 270, -90];

/// 指定ページを削除する。残りのページは元の相対順を保つ。
pub fn remove_pages(doc: &mut PdfDocument, rule: &RemovePages) -> crate::error::Result<()> {
    let count = doc.page_count();
    let mut targets = rule.pages.resolve(count)?;
    // 元のインデックスで削除できるよう降順に処理する
    targets.sort_unstable_by(|a, b| b.cmp(a));

    let mut order: Vec<usize> = (0..count).collect();
    for index in &targets {
        order.remove(*index);
    }
    if order.is_empty() {
        return Err(TransformError::validation("cannot remove every page of the document"));
    }
    info!(removed = targets.len(), remaining = order.len(), "removing pages");
    doc.rebuild_pages(&order)
}

/// 角度を検証して /Rotate の値に正規化する。
pub fn normalize_angle(angle: i64) -> crate::error::Result<i64> {
    if !ALLOWED_ANGLES.contains(&angle) {
        return Err(TransformError::unsupported(format!(
            "rotation angle {angle} is not supported (allowed: 90, 180, 270, -90)"
        )));
    }
    Ok(angle.rem_euclid(360))
}

/// 指定ページの回転を設定する（省略時は全ページ）。
pub fn rotate_pages(doc: &mut PdfDocument, rule: &RotatePages) -> crate::error::Result<()> {
    let rotation = normalize_angle(rule.angle)?;
    let targets = resolve_or_all(rule.pages.as_ref(), doc.page_count())?;
    for &index in &targets {
        doc.set_rotation(index, rotation)?;
    }
    debug!(pages = targets.len(), rotation, "rotated pages");
    Ok(())
}

/// 1始まり・両端含みの範囲だけを残す。
pub fn extract_pages(doc: &mut PdfDocument, rule: &ExtractPages) -> crate::error::Result<()> {
    let count = doc.page_count();
    let (start, end) = (rule.page_range.start, rule.page_range.end);
    if start < 1 || end as u64 > count as u64 || start > end {
        return Err(TransformError::range(format!(
            "invalid page range {start}-{end} for a document with {count} pages"
        )));
    }
    let order: Vec<usize> = ((start - 1) as usize..end as usize).collect();
    info!(start, end, "extracting pages");
    doc.rebuild_pages(&order)
}

/// 指定順にページを並べ替える。部分集合や重複指定も可。
pub fn rearrange_pages(doc: &mut PdfDocument, rule: &RearrangePages) -> crate::error::Result<()> {
    if rule.page_order.is_empty() {
        return Err(TransformError::validation("pageOrder cannot be empty"));
    }
    let count = doc.page_count();
    let order = rule
        .page_order
        .iter()
        .map(|&page| to_index(page, count))
        .collect::<crate::error::Result<Vec<_>>>()?;
    doc.rebuild_pages(&order)
}

pub fn reverse_pages(doc: &mut PdfDocument) -> crate::error::Result<()> {
    let order: Vec<usize> = (0..doc.page_count()).rev().collect();
    doc.rebuild_pages(&order)
}

/// 空白ページを挿入する。サイズ省略時は隣接ページと同じ寸法。
pub fn add_blank_page(doc: &mut PdfDocument, rule: &AddBlankPage) -> crate::error::Result<()> {
    if rule.count == 0 {
        return Err(TransformError::validation("count must be at least 1"));
    }
    let count = doc.page_count();
    let position = rule.position.unwrap_or(count as i64 + 1);
    if position < 1 || position as u64 > count as u64 + 1 {
        return Err(TransformError::range(format!(
            "blank page position {position} is outside 1..={}",
            count + 1
        )));
    }
    let at = (position - 1) as usize;
    let size = match rule.page_size {
        Some(preset) => preset.dimensions(),
        None => {
            let neighbour = at.min(count.saturating_sub(1));
            let info = doc.page_info(neighbour)?;
            (info.width, info.height)
        }
    };
    info!(position, count = rule.count, "inserting blank pages");
    doc.insert_blank_pages(at, rule.count, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_ninety_is_two_seventy() {
        assert_eq!(normalize_angle(-90).unwrap(), 270);
        assert_eq!(normalize_angle(180).unwrap(), 180);
    }

    #[test]
    fn odd_angles_list_allowed_set() {
        let err = normalize_angle(45).unwrap_err();
        assert!(matches!(err, TransformError::UnsupportedOperationError(_)));
        assert!(err.to_string().contains("90, 180, 270, -90"));
        assert!(normalize_angle(0).is_err());
        assert!(normalize_angle(360).is_err());
    }
}
