// External tool adapters: recompression, decryption, linearization
//
// Tests that need qpdf or Ghostscript are skipped when the binary is missing.

mod common;

use std::path::Path;
use std::process::Command;

use common::{letter_pdf, offline_config, rules, tool_available};
use pdf_transform::error::{DecryptFailure, TransformError};
use pdf_transform::external::{compress, decrypt, linearize};
use pdf_transform::pdf::PdfDocument;
use pdf_transform::pipeline::{OutputKind, apply};

fn compress_rule(json: &str) -> pdf_transform::rules::Compress {
    serde_json::from_str(json).expect("compress rule")
}

fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

/// Encrypt a PDF with qpdf (AES-256, user password "user").
fn encrypt_with_qpdf(dir: &Path, plain: &[u8]) -> Vec<u8> {
    let input = dir.join("plain.pdf");
    let output = dir.join("locked.pdf");
    std::fs::write(&input, plain).unwrap();
    let status = Command::new("qpdf")
        .args(["--encrypt", "user", "owner", "256", "--"])
        .arg(&input)
        .arg(&output)
        .status()
        .expect("run qpdf");
    assert!(status.success());
    std::fs::read(&output).unwrap()
}

// ============================================================
// 1. Recompression never fails the pipeline
// ============================================================

#[tokio::test]
async fn test_compress_with_missing_tool_returns_input() {
    let scratch = tempfile::tempdir().unwrap();
    let source = letter_pdf(2, "keep me");
    let rule = compress_rule(r#"{"compressionLevel":"high"}"#);

    let out = compress::compress(
        &scratch.path().join("no-such-gs"),
        scratch.path(),
        &source,
        &rule,
    )
    .await;

    assert_eq!(out, source);
    assert!(dir_is_empty(scratch.path()), "scratch files must be removed");
}

#[tokio::test]
async fn test_pipeline_compress_is_best_effort() {
    let scratch = tempfile::tempdir().unwrap();
    let out = apply(
        &letter_pdf(3, ""),
        &rules(r#"[{"type":"compress","compressionLevel":"custom","targetFileSize":1}]"#),
        &offline_config(scratch.path()),
    )
    .await
    .expect("missing ghostscript must not fail the request");

    assert_eq!(out.kind, OutputKind::Document);
    assert_eq!(PdfDocument::load(&out.bytes).unwrap().page_count(), 3);
}

#[tokio::test]
async fn test_compress_with_ghostscript() {
    if !tool_available("gs") {
        eprintln!("skipping: gs not available");
        return;
    }
    let scratch = tempfile::tempdir().unwrap();
    let source = letter_pdf(2, "compress me");
    let out = compress::compress(
        Path::new("gs"),
        scratch.path(),
        &source,
        &compress_rule(r#"{"compressionLevel":"maximum"}"#),
    )
    .await;

    assert!(out.starts_with(b"%PDF"));
    assert_eq!(PdfDocument::load(&out).unwrap().page_count(), 2);
    assert!(dir_is_empty(scratch.path()));
}

// ============================================================
// 2. Decryption
// ============================================================

#[tokio::test]
async fn test_remove_password_on_plain_pdf_is_not_encrypted() {
    let scratch = tempfile::tempdir().unwrap();
    let err = apply(
        &letter_pdf(1, ""),
        &rules(r#"[{"type":"remove_password","currentPassword":"x"}]"#),
        &offline_config(scratch.path()),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        TransformError::DecryptionError(DecryptFailure::NotEncrypted)
    ));
    assert!(err.user_message().contains("not password protected"));
}

#[tokio::test]
async fn test_remove_password_with_nothing_to_remove_is_rejected() {
    let scratch = tempfile::tempdir().unwrap();
    let err = apply(
        &letter_pdf(1, ""),
        &rules(
            r#"[{"type":"remove_password","currentPassword":"x",
                "removeUserPassword":false,"removeOwnerPassword":false}]"#,
        ),
        &offline_config(scratch.path()),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, TransformError::ValidationError(_)), "got {err:?}");
    assert!(dir_is_empty(scratch.path()));
}

#[tokio::test]
async fn test_decrypt_with_missing_tool_is_tool_failure() {
    let scratch = tempfile::tempdir().unwrap();
    let fake = b"%PDF-1.7\ntrailer << /Encrypt 5 0 R >>\n%%EOF".to_vec();

    let err = decrypt::decrypt(
        &scratch.path().join("no-such-qpdf"),
        scratch.path(),
        &fake,
        "pw",
    )
    .await
    .unwrap_err();

    assert!(
        matches!(err, TransformError::DecryptionError(DecryptFailure::ToolFailure(_))),
        "got {err:?}"
    );
    assert!(dir_is_empty(scratch.path()), "scratch files must be removed");
}

#[tokio::test]
async fn test_remove_password_then_transform() {
    if !tool_available("qpdf") {
        eprintln!("skipping: qpdf not available");
        return;
    }
    let fixtures = tempfile::tempdir().unwrap();
    let locked = encrypt_with_qpdf(fixtures.path(), &common::numbered_pdf(3));

    let scratch = tempfile::tempdir().unwrap();
    let mut config = offline_config(scratch.path());
    config.qpdf_path = "qpdf".into();

    let out = apply(
        &locked,
        &rules(r#"[{"type":"remove_password","currentPassword":"user"},{"type":"reverse_pages"}]"#),
        &config,
    )
    .await
    .expect("decrypt should succeed");

    let doc = PdfDocument::load(&out.bytes).unwrap();
    assert!(!doc.is_encrypted());
    assert_eq!(common::page_numbers(&out.bytes), vec![3, 2, 1]);
    assert!(dir_is_empty(scratch.path()), "decrypted copy must be removed");
}

#[tokio::test]
async fn test_remove_password_with_wrong_password() {
    if !tool_available("qpdf") {
        eprintln!("skipping: qpdf not available");
        return;
    }
    let fixtures = tempfile::tempdir().unwrap();
    let locked = encrypt_with_qpdf(fixtures.path(), &letter_pdf(1, ""));

    let scratch = tempfile::tempdir().unwrap();
    let err = decrypt::decrypt(Path::new("qpdf"), scratch.path(), &locked, "nope")
        .await
        .unwrap_err();

    assert!(
        matches!(err, TransformError::DecryptionError(DecryptFailure::WrongPassword)),
        "got {err:?}"
    );
    assert!(dir_is_empty(scratch.path()));
}

// ============================================================
// 3. Linearization
// ============================================================

#[tokio::test]
async fn test_linearize_failure_keeps_input() {
    let scratch = tempfile::tempdir().unwrap();
    let source = letter_pdf(1, "");
    let out = linearize::linearize_or_keep(
        &scratch.path().join("no-such-qpdf"),
        scratch.path(),
        source.clone(),
    )
    .await;
    assert_eq!(out, source);
}

#[tokio::test]
async fn test_linearize_with_qpdf() {
    if !tool_available("qpdf") {
        eprintln!("skipping: qpdf not available");
        return;
    }
    let scratch = tempfile::tempdir().unwrap();
    let out = linearize::linearize(Path::new("qpdf"), scratch.path(), &letter_pdf(2, ""))
        .await
        .expect("linearize should succeed");
    let head = String::from_utf8_lossy(&out[..out.len().min(1024)]).into_owned();
    assert!(head.contains("/Linearized"));
}
