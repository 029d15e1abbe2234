// Shared fixtures for integration tests.
//
// All test PDFs are generated with lopdf at runtime (no committed fixtures).

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use pdf_transform::config::merged::PipelineConfig;
use pdf_transform::pdf::PdfDocument;
use pdf_transform::pipeline::{TransformOutput, apply};
use pdf_transform::rules::Rule;

/// Build a PDF whose pages have the given (width, height) MediaBoxes.
///
/// Page `n` (1-based) shows the text `"Page n <body>"` in Helvetica.
pub fn build_pdf(sizes: &[(i64, i64)], body: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids: Vec<Object> = Vec::new();
    for (i, &(width, height)) in sizes.iter().enumerate() {
        let text = format!("Page {} {}", i + 1, body);
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), (height - 100).into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => Object::Integer(sizes.len() as i64),
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("save test PDF");
    buf
}

/// `count` Letter-height pages whose widths identify them: page n is `600 + n` wide.
pub fn numbered_pdf(count: usize) -> Vec<u8> {
    let sizes: Vec<(i64, i64)> = (1..=count as i64).map(|n| (600 + n, 792)).collect();
    build_pdf(&sizes, "")
}

pub fn letter_pdf(count: usize, body: &str) -> Vec<u8> {
    build_pdf(&vec![(612, 792); count], body)
}

/// Original 1-based page numbers of a PDF built by [`numbered_pdf`].
pub fn page_numbers(bytes: &[u8]) -> Vec<i64> {
    let doc = PdfDocument::load(bytes).expect("load output");
    (0..doc.page_count())
        .map(|i| doc.page_info(i).expect("page info").media_box.width as i64 - 600)
        .collect()
}

pub fn rules(json: &str) -> Vec<Rule> {
    Rule::parse_json(json).expect("parse rules")
}

/// Pipeline config that never finds external tools and uses a fixed redaction seed.
pub fn offline_config(scratch: &std::path::Path) -> PipelineConfig {
    PipelineConfig {
        qpdf_path: scratch.join("missing-qpdf"),
        ghostscript_path: scratch.join("missing-gs"),
        scratch_dir: scratch.to_path_buf(),
        redaction_seed: Some(7),
        linearize: false,
    }
}

pub async fn run(source: &[u8], json: &str) -> pdf_transform::error::Result<TransformOutput> {
    let scratch = tempfile::tempdir().expect("create temp dir");
    apply(source, &rules(json), &offline_config(scratch.path())).await
}

/// Decoded content of every content stream on a page, concatenated.
pub fn page_content(bytes: &[u8], index: usize) -> String {
    let doc = Document::load_mem(bytes).expect("load output");
    let page_id = *doc.get_pages().values().nth(index).expect("page exists");
    let content = doc.get_page_content(page_id).expect("page content");
    String::from_utf8_lossy(&content).into_owned()
}

/// Whether a program can be executed (used to skip qpdf/gs dependent tests).
pub fn tool_available(program: &str) -> bool {
    std::process::Command::new(program)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Decoded operations of a page's content.
pub fn operations(bytes: &[u8], index: usize) -> Vec<Operation> {
    let doc = Document::load_mem(bytes).expect("load output");
    let page_id = *doc.get_pages().values().nth(index).expect("page exists");
    let content = doc.get_page_content(page_id).expect("page content");
    Content::decode(&content).expect("decode content").operations
}

/// Strings shown with `Tj` on a page, in drawing order.
pub fn shown_text(bytes: &[u8], index: usize) -> Vec<String> {
    operations(bytes, index)
        .into_iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| match op.operands.first() {
            Some(Object::String(s, _)) => Some(String::from_utf8_lossy(s).into_owned()),
            _ => None,
        })
        .collect()
}

/// Numeric operands of an operation.
pub fn numbers(op: &Operation) -> Vec<f32> {
    op.operands.iter().filter_map(|o| o.as_float().ok()).collect()
}
