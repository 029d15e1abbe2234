use std::collections::HashSet;

use serde::Deserialize;

use crate::error::TransformError;

/// ページ番号として受け付ける上限。範囲文字列はこれを超えて展開しない。
pub const MAX_PAGE_NUMBER: u32 = 100_000;

/// ページ指定。整数配列または範囲文字列（`"1, 3, 5-10"`）を受け付ける。
/// ページ番号は1始まり。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PageSelection {
    List(Vec<i64>),
    Single(i64),
    Spec(String),
}

impl PageSelection {
    /// 1始まりのページ番号列を検証し、0始まりのインデックスに変換する。
    ///
    /// 重複は最初の出現のみ残す。範囲外は `RangeError`。
    pub fn resolve(&self, page_count: usize) -> crate::error::Result<Vec<usize>> {
        let numbers: Vec<i64> = match self {
            PageSelection::List(list) => list.clone(),
            PageSelection::Single(n) => vec![*n],
            PageSelection::Spec(s) => parse_page_range(s)?
                .into_iter()
                .map(i64::from)
                .collect(),
        };
        if numbers.is_empty() {
            return Err(TransformError::validation("page list cannot be empty"));
        }
        let mut seen = HashSet::new();
        let mut indices = Vec::with_capacity(numbers.len());
        for n in numbers {
            let index = to_index(n, page_count)?;
            if seen.insert(index) {
                indices.push(index);
            }
        }
        Ok(indices)
    }
}

/// 省略時は全ページ。
pub fn resolve_or_all(
    pages: Option<&PageSelection>,
    page_count: usize,
) -> crate::error::Result<Vec<usize>> {
    match pages {
        Some(selection) => selection.resolve(page_count),
        None => Ok((0..page_count).collect()),
    }
}

/// 1始まりのページ番号を0始まりのインデックスに変換する。
pub fn to_index(page: i64, page_count: usize) -> crate::error::Result<usize> {
    if page < 1 || page as u64 > page_count as u64 {
        return Err(TransformError::range(format!(
            "page {page} is outside 1..={page_count}"
        )));
    }
    Ok((page - 1) as usize)
}

/// ページ範囲文字列をパースしてページ番号のベクタに変換する。
///
/// 形式:
/// - 単一ページ: `"5"`
/// - 範囲: `"5-10"` (5, 6, 7, 8, 9, 10)
/// - 混合（カンマ区切り）: `"1, 3, 5-10, 15"`
///
/// 結果はソート済み・重複なし。`MAX_PAGE_NUMBER` を超える番号は展開前に拒否する。
pub fn parse_page_range(s: &str) -> crate::error::Result<Vec<u32>> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(TransformError::validation("page range cannot be empty"));
    }

    let mut pages = Vec::new();
    for part in trimmed.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some((start_str, end_str)) = part.split_once('-') {
            let start = parse_number(start_str)?;
            let end = parse_number(end_str)?;
            if start > end {
                return Err(TransformError::range(format!(
                    "invalid page range: start ({start}) > end ({end})"
                )));
            }
            pages.extend(start..=end);
        } else {
            pages.push(parse_number(part)?);
        }
    }

    if pages.is_empty() {
        return Err(TransformError::validation("page range resolved to empty set"));
    }
    pages.sort_unstable();
    pages.dedup();
    Ok(pages)
}

fn parse_number(s: &str) -> crate::error::Result<u32> {
    let n: u32 = s
        .trim()
        .parse()
        .map_err(|_| TransformError::validation(format!("invalid page number: '{}'", s.trim())))?;
    if n > MAX_PAGE_NUMBER {
        return Err(TransformError::validation(format!(
            "page number {n} exceeds the limit of {MAX_PAGE_NUMBER}"
        )));
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_ranges() {
        assert_eq!(
            parse_page_range("1, 3, 5-7, 3").unwrap(),
            vec![1, 3, 5, 6, 7]
        );
    }

    #[test]
    fn rejects_reversed_and_garbage() {
        assert!(matches!(
            parse_page_range("10-5"),
            Err(TransformError::RangeError(_))
        ));
        assert!(parse_page_range("abc").is_err());
        assert!(parse_page_range("  ").is_err());
    }

    #[test]
    fn huge_span_is_rejected_before_expansion() {
        let started = std::time::Instant::now();
        let err = parse_page_range("1-4000000000").unwrap_err();
        assert!(matches!(err, TransformError::ValidationError(_)));
        assert!(err.to_string().contains("exceeds the limit"));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));

        let max = parse_page_range(&format!("{MAX_PAGE_NUMBER}")).unwrap();
        assert_eq!(max, vec![MAX_PAGE_NUMBER]);
    }

    #[test]
    fn resolves_to_zero_based_and_dedups() {
        let sel = PageSelection::List(vec![3, 1, 3]);
        assert_eq!(sel.resolve(3).unwrap(), vec![2, 0]);
    }

    #[test]
    fn out_of_range_is_range_error() {
        let sel = PageSelection::List(vec![0]);
        assert!(matches!(sel.resolve(3), Err(TransformError::RangeError(_))));
        let sel = PageSelection::Spec("2-4".into());
        assert!(matches!(sel.resolve(3), Err(TransformError::RangeError(_))));
    }

    #[test]
    fn deserializes_both_forms() {
        let list: PageSelection = serde_json::from_str("[1,2]").unwrap();
        assert_eq!(list, PageSelection::List(vec![1, 2]));
        let spec: PageSelection = serde_json::from_str("\"1-2\"").unwrap();
        assert_eq!(spec.resolve(5).unwrap(), vec![0, 1]);
    }
}
