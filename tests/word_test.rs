// convert_to_word: routing precedence and DOCX contents

mod common;

use common::{letter_pdf, run};
use pdf_transform::archive::{entry_names, read_entry};
use pdf_transform::pipeline::OutputKind;

fn document_xml(docx: &[u8]) -> String {
    String::from_utf8(read_entry(docx, "word/document.xml").unwrap()).unwrap()
}

#[tokio::test]
async fn test_convert_to_word_produces_docx() {
    let out = run(
        &letter_pdf(2, "Quarterly results"),
        r#"[{"type":"convert_to_word","conversionQuality":"high","preserveLayout":true}]"#,
    )
    .await
    .expect("conversion should succeed");

    assert_eq!(out.kind, OutputKind::Word);
    let names = entry_names(&out.bytes).unwrap();
    assert_eq!(names[0], "[Content_Types].xml");
    assert!(names.contains(&"word/document.xml".to_string()));

    let xml = document_xml(&out.bytes);
    assert!(xml.contains("Quarterly results"));
    assert!(xml.contains("Pages: 2 | Quality: high | Layout preserved: yes"));
    assert!(xml.contains("Conversion summary"));
}

#[tokio::test]
async fn test_convert_to_word_takes_precedence_over_other_rules() {
    let out = run(
        &letter_pdf(3, ""),
        r#"[
            {"type":"split_pdf","splitBy":"individual_pages"},
            {"type":"remove_pages","pages":[1]},
            {"type":"convert_to_word"}
        ]"#,
    )
    .await
    .unwrap();

    assert_eq!(out.kind, OutputKind::Word);
    assert!(document_xml(&out.bytes).contains("Pages: 3"));
}

#[tokio::test]
async fn test_textless_pdf_gets_explanatory_document() {
    let blank = {
        let mut doc = pdf_transform::pdf::PdfDocument::load(&letter_pdf(1, "")).unwrap();
        doc.insert_blank_pages(0, 1, (612.0, 792.0)).unwrap();
        doc.rebuild_pages(&[0]).unwrap();
        doc.to_bytes().unwrap()
    };
    let out = run(&blank, r#"[{"type":"convert_to_word"}]"#).await.unwrap();

    let xml = document_xml(&out.bytes);
    assert!(xml.contains("No extractable text was found"), "{xml}");
    assert!(xml.contains("Conversion summary: 0 paragraphs"));
}
