// ドキュメントを複数のサブドキュメントに分割し、ZIPアーカイブにまとめる

use std::collections::HashSet;

use tracing::{info, warn};

use crate::archive::write_zip;
use crate::error::TransformError;
use crate::pdf::PdfDocument;
use crate::rules::{SplitMode, SplitPdf, SplitRange};

/// 1つの出力サブドキュメント。`pages` は0始まり。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub name: String,
    pub pages: Vec<usize>,
}

/// 分割計画を立てる。ページ内容には触れない。
pub fn plan_chunks(rule: &SplitPdf, page_count: usize) -> crate::error::Result<Vec<Chunk>> {
    let chunks = match rule.split_by {
        SplitMode::PageCount => {
            let per = rule
                .pages_per_split
                .filter(|&n| n > 0)
                .ok_or_else(|| TransformError::validation("pagesPerSplit must be at least 1"))?;
            (0..page_count)
                .step_by(per)
                .enumerate()
                .map(|(i, start)| {
                    let end = (start + per).min(page_count);
                    Chunk {
                        name: format!("split_{}_pages_{}-{}", i + 1, start + 1, end),
                        pages: (start..end).collect(),
                    }
                })
                .collect()
        }
        SplitMode::PageRanges => range_chunks(&rule.split_ranges, page_count),
        SplitMode::IndividualPages => (0..page_count)
            .map(|i| Chunk {
                name: format!("page_{}", i + 1),
                pages: vec![i],
            })
            .collect(),
    };
    if chunks.is_empty() {
        return Err(TransformError::validation("no documents created"));
    }
    Ok(chunks)
}

/// 範囲外・逆転した範囲は警告して読み飛ばす。
fn range_chunks(ranges: &[SplitRange], page_count: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for range in ranges {
        let (start, end) = (range.start, range.end);
        if start < 1 || end as u64 > page_count as u64 || start > end {
            warn!(start, end, page_count, "skipping invalid split range");
            continue;
        }
        let name = range
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("pages_{start}-{end}"));
        chunks.push(Chunk {
            name,
            pages: ((start - 1) as usize..end as usize).collect(),
        });
    }
    chunks
}

/// アーカイブ内のファイル名を整える。パス区切りを除き `.pdf` を付け、重複には連番を付ける。
pub fn archive_names(chunks: &[Chunk]) -> Vec<String> {
    let mut used = HashSet::new();
    chunks
        .iter()
        .map(|chunk| {
            let cleaned: String = chunk
                .name
                .chars()
                .filter(|c| !matches!(c, '/' | '\\') && !c.is_control())
                .collect();
            let cleaned = cleaned.trim().trim_start_matches('.').to_string();
            let stem = match cleaned.len() {
                0 => "document".to_string(),
                _ if cleaned.to_ascii_lowercase().ends_with(".pdf") => {
                    cleaned[..cleaned.len() - 4].to_string()
                }
                _ => cleaned,
            };
            let mut candidate = format!("{stem}.pdf");
            let mut n = 2;
            while !used.insert(candidate.clone()) {
                candidate = format!("{stem}_{n}.pdf");
                n += 1;
            }
            candidate
        })
        .collect()
}

/// 分割してZIPアーカイブのバイト列を返す。
pub fn split(doc: &PdfDocument, rule: &SplitPdf) -> crate::error::Result<Vec<u8>> {
    let chunks = plan_chunks(rule, doc.page_count())?;
    let names = archive_names(&chunks);

    let mut entries = Vec::with_capacity(chunks.len());
    for (chunk, name) in chunks.iter().zip(names) {
        let mut part = doc.clone();
        part.rebuild_pages(&chunk.pages)?;
        entries.push((name, part.to_bytes()?));
    }
    info!(mode = ?rule.split_by, documents = entries.len(), "split complete");
    write_zip(&entries)
}
