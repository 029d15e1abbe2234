// crop_pages / resize_pages

mod common;

use common::{letter_pdf, page_content, run};
use pdf_transform::error::TransformError;
use pdf_transform::pdf::PdfDocument;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.01
}

// ============================================================
// 1. crop_pages
// ============================================================

#[tokio::test]
async fn test_crop_with_margins() {
    let out = run(
        &letter_pdf(2, ""),
        r#"[{"type":"crop_pages","pages":[2],"margins":{"top":10,"right":20,"bottom":30,"left":40}}]"#,
    )
    .await
    .expect("crop should succeed");

    let doc = PdfDocument::load(&out.bytes).unwrap();
    let untouched = doc.page_info(0).unwrap();
    assert_eq!(untouched.crop_box, untouched.media_box);

    let crop = doc.page_info(1).unwrap().crop_box;
    assert!(approx(crop.x, 40.0));
    assert!(approx(crop.y, 30.0));
    assert!(approx(crop.width, 552.0));
    assert!(approx(crop.height, 752.0));
}

#[tokio::test]
async fn test_crop_with_explicit_box() {
    let out = run(
        &letter_pdf(1, ""),
        r#"[{"type":"crop_pages","cropBox":{"x":50,"y":60,"width":200,"height":300}}]"#,
    )
    .await
    .unwrap();

    let crop = PdfDocument::load(&out.bytes).unwrap().page_info(0).unwrap().crop_box;
    assert!(approx(crop.x, 50.0) && approx(crop.y, 60.0));
    assert!(approx(crop.width, 200.0) && approx(crop.height, 300.0));
}

#[tokio::test]
async fn test_crop_with_preset_is_centered() {
    let out = run(&letter_pdf(1, ""), r#"[{"type":"crop_pages","preset":"square"}]"#)
        .await
        .unwrap();

    let crop = PdfDocument::load(&out.bytes).unwrap().page_info(0).unwrap().crop_box;
    assert!(approx(crop.width, 612.0));
    assert!(approx(crop.height, 612.0));
    assert!(approx(crop.y, 90.0));
}

#[tokio::test]
async fn test_crop_requires_exactly_one_mode() {
    let both = r#"[{"type":"crop_pages","preset":"a4","margins":{"top":10}}]"#;
    let none = r#"[{"type":"crop_pages"}]"#;
    for json in [both, none] {
        let err = run(&letter_pdf(1, ""), json).await.unwrap_err();
        assert!(matches!(err, TransformError::ValidationError(_)), "{json}: {err:?}");
    }
}

#[tokio::test]
async fn test_crop_margins_larger_than_page_are_rejected() {
    let err = run(
        &letter_pdf(1, ""),
        r#"[{"type":"crop_pages","margins":{"left":400,"right":400}}]"#,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, TransformError::ValidationError(_)));
}

// ============================================================
// 2. resize_pages
// ============================================================

#[tokio::test]
async fn test_resize_to_preset_scales_content() {
    let out = run(&letter_pdf(1, "hello"), r#"[{"type":"resize_pages","preset":"a4"}]"#)
        .await
        .expect("resize should succeed");

    let info = PdfDocument::load(&out.bytes).unwrap().page_info(0).unwrap();
    assert!(approx(info.media_box.width, 595.28));
    assert!(approx(info.media_box.height, 841.89));
    assert_eq!(info.crop_box, info.media_box);

    let content = page_content(&out.bytes, 0);
    assert!(content.contains(" cm"), "content should be transformed: {content}");
    assert!(content.contains("hello"));
}

#[tokio::test]
async fn test_resize_with_margins_expands_page() {
    let out = run(
        &letter_pdf(1, ""),
        r#"[{"type":"resize_pages","margins":{"top":10,"right":10,"bottom":20,"left":20}}]"#,
    )
    .await
    .unwrap();

    let info = PdfDocument::load(&out.bytes).unwrap().page_info(0).unwrap();
    assert!(approx(info.media_box.width, 642.0));
    assert!(approx(info.media_box.height, 822.0));
    assert!(page_content(&out.bytes, 0).contains("20.0000 20.0000 cm"));
}

#[tokio::test]
async fn test_resize_to_explicit_size_without_scaling() {
    let out = run(
        &letter_pdf(1, ""),
        r#"[{"type":"resize_pages","size":{"width":300,"height":400},"scaleContent":false}]"#,
    )
    .await
    .unwrap();

    let info = PdfDocument::load(&out.bytes).unwrap().page_info(0).unwrap();
    assert!(approx(info.media_box.width, 300.0));
    assert!(approx(info.media_box.height, 400.0));
}
