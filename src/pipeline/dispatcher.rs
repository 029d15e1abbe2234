// ルール列の振り分けと実行順序の決定
//
// convert_to_word > split_pdf > remove_password(前処理) > 呼び出し順のハンドラ > compress
// の優先順位で処理する。

use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, instrument};

use crate::config::merged::PipelineConfig;
use crate::error::TransformError;
use crate::external::{compress, decrypt, linearize};
use crate::ops::{decorate, metadata, overlay, pages, resize, stamp};
use crate::pdf::PdfDocument;
use crate::pipeline::output::TransformOutput;
use crate::redact;
use crate::rules::Rule;
use crate::split;
use crate::word;

/// ルール列をソースPDFに適用し、結果のバイト列と種別を返す。
#[instrument(skip_all, fields(source_len = source.len(), rules = rules.len()))]
pub async fn apply(
    source: &[u8],
    rules: &[Rule],
    config: &PipelineConfig,
) -> crate::error::Result<TransformOutput> {
    if rules.is_empty() {
        return Err(TransformError::validation("rule list cannot be empty"));
    }

    if let Some(options) = rules.iter().find_map(|r| match r {
        Rule::ConvertToWord(o) => Some(o),
        _ => None,
    }) {
        info!("routing to word conversion");
        return Ok(TransformOutput::new(word::convert_pdf(source, options)?));
    }

    if let Some(split_rule) = rules.iter().find_map(|r| match r {
        Rule::SplitPdf(s) => Some(s),
        _ => None,
    }) {
        info!("routing to split");
        let doc = PdfDocument::load(source)?;
        return Ok(TransformOutput::new(split::split(&doc, split_rule)?));
    }

    // ガードはシリアライズ完了まで保持し、どの経路でもドロップ時に削除される。
    let decrypted = match rules.iter().find_map(|r| match r {
        Rule::RemovePassword(p) => Some(p),
        _ => None,
    }) {
        Some(p) => Some({
            decrypt::check_scope(p)?;
            decrypt::decrypt(
                &config.qpdf_path,
                &config.scratch_dir,
                source,
                &p.current_password,
            )
            .await?
        }),
        None => None,
    };

    let origin = match &decrypted {
        Some(guard) => Origin::File(guard.path().to_path_buf()),
        None => Origin::Bytes(source.to_vec()),
    };
    let owned_rules = rules.to_vec();
    let seed = config.redaction_seed;
    let mut bytes = tokio::task::spawn_blocking(move || {
        let doc = match origin {
            Origin::File(path) => PdfDocument::open(path)?,
            Origin::Bytes(bytes) => PdfDocument::load(&bytes)?,
        };
        apply_in_memory(doc, &owned_rules, seed)
    })
    .await
    .map_err(|e| TransformError::IoError(std::io::Error::other(format!("transform task failed: {e}"))))??;
    drop(decrypted);

    if let Some(compress_rule) = rules.iter().find_map(|r| match r {
        Rule::Compress(c) => Some(c),
        _ => None,
    }) {
        bytes = compress::compress(
            &config.ghostscript_path,
            &config.scratch_dir,
            &bytes,
            compress_rule,
        )
        .await;
    }

    if config.linearize {
        bytes = linearize::linearize_or_keep(&config.qpdf_path, &config.scratch_dir, bytes).await;
    }

    let output = TransformOutput::new(bytes);
    info!(kind = %output.kind, bytes = output.bytes.len(), "transformation complete");
    Ok(output)
}

/// メモリ上の処理に渡す入力。
enum Origin {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// 呼び出し順にハンドラを適用してシリアライズする。ドキュメントはここで消費される。
fn apply_in_memory(
    mut doc: PdfDocument,
    rules: &[Rule],
    redaction_seed: Option<u64>,
) -> crate::error::Result<Vec<u8>> {
    let mut rng = match redaction_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    for rule in rules {
        debug!(kind = rule.kind(), "applying rule");
        apply_rule(&mut doc, rule, &mut rng)?;
    }
    doc.to_bytes()
}

/// 1件のルールをドキュメントに適用する。
///
/// compress・remove_password・split_pdf・convert_to_word はループの外で扱うため何もしない。
pub fn apply_rule(
    doc: &mut PdfDocument,
    rule: &Rule,
    rng: &mut StdRng,
) -> crate::error::Result<()> {
    match rule {
        Rule::RemovePages(r) => pages::remove_pages(doc, r),
        Rule::RotatePages(r) => pages::rotate_pages(doc, r),
        Rule::ExtractPages(r) => pages::extract_pages(doc, r),
        Rule::RearrangePages(r) => pages::rearrange_pages(doc, r),
        Rule::ReversePages(_) => pages::reverse_pages(doc),
        Rule::AddBlankPage(r) => pages::add_blank_page(doc, r),
        Rule::CropPages(r) => resize::crop_pages(doc, r),
        Rule::ResizePages(r) => resize::resize_pages(doc, r),
        Rule::AddWatermark(r) => stamp::add_watermark(doc, r),
        Rule::AddPageNumbers(r) => stamp::add_page_numbers(doc, r),
        Rule::AddHeaderFooter(r) => stamp::add_header_footer(doc, r),
        Rule::AddText(r) => stamp::add_text(doc, r),
        Rule::AddBorder(r) => decorate::add_border(doc, r),
        Rule::AddBackground(r) => decorate::add_background(doc, r),
        Rule::AddImage(r) => decorate::add_image(doc, r),
        Rule::AddAnnotations(r) => overlay::apply_annotations(doc, &r.annotations),
        Rule::EditPdf(r) => overlay::apply_annotations(doc, &r.edits),
        Rule::RedactText(r) => {
            let report = redact::redact(doc, &r.words, rng)?;
            info!(total_boxes = report.total_boxes(), "redaction finished");
            Ok(())
        }
        Rule::SetMetadata(r) => metadata::set_metadata(doc, r),
        Rule::AddPassword(r) => {
            metadata::add_password(r);
            Ok(())
        }
        Rule::RemovePassword(_) | Rule::Compress(_) | Rule::SplitPdf(_) | Rule::ConvertToWord(_) => {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_rule_list_is_rejected() {
        let err = apply(b"%PDF-1.7", &[], &PipelineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::ValidationError(_)));
    }

    #[tokio::test]
    async fn unparseable_source_is_a_read_error() {
        let rules = vec![Rule::ReversePages(Default::default())];
        let err = apply(b"not a pdf", &rules, &PipelineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::PdfReadError(_)));
    }
}
