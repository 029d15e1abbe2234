//! Best-effort PDF to Word conversion.
//!
//! Only text is carried over: the extracted text is segmented into
//! paragraphs and written into a minimal DOCX container. Layout, images and
//! tables are not reproduced.

pub mod segment;

use std::fmt::Display;

use chrono::{SecondsFormat, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::{info, instrument, warn};

use crate::archive::write_zip;
use crate::error::TransformError;
use crate::pdf::PdfDocument;
use crate::rules::{ConvertToWord, WordFormat};

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const EMPTY_TEXT_NOTICE: [&str; 4] = [
    "No extractable text was found in this PDF.",
    "The pages may contain only scanned images, which require OCR to convert.",
    "The document may be password protected, which prevents reading its text.",
    "The text may use a non-standard font encoding that cannot be decoded.",
];

/// 段落の書式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Title,
    Meta,
    Body,
}

fn xml_error(e: impl Display) -> TransformError {
    TransformError::word(format!("failed to write DOCX XML: {e}"))
}

/// `word/document.xml` を組み立てる。
struct DocumentXml {
    writer: Writer<Vec<u8>>,
}

impl DocumentXml {
    fn begin() -> crate::error::Result<Self> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(xml_error)?;
        let mut root = BytesStart::new("w:document");
        root.push_attribute(("xmlns:w", WORD_NS));
        writer.write_event(Event::Start(root)).map_err(xml_error)?;
        writer
            .write_event(Event::Start(BytesStart::new("w:body")))
            .map_err(xml_error)?;
        Ok(Self { writer })
    }

    fn start(&mut self, name: &str) -> crate::error::Result<()> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(xml_error)
    }

    fn end(&mut self, name: &str) -> crate::error::Result<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_error)
    }

    fn empty(&mut self, name: &str, val: Option<&str>) -> crate::error::Result<()> {
        let mut tag = BytesStart::new(name);
        if let Some(val) = val {
            tag.push_attribute(("w:val", val));
        }
        self.writer.write_event(Event::Empty(tag)).map_err(xml_error)
    }

    fn paragraph(&mut self, text: &str, style: Style) -> crate::error::Result<()> {
        self.start("w:p")?;
        self.start("w:r")?;
        match style {
            Style::Title => {
                self.start("w:rPr")?;
                self.empty("w:b", None)?;
                self.empty("w:sz", Some("32"))?;
                self.end("w:rPr")?;
            }
            Style::Meta => {
                self.start("w:rPr")?;
                self.empty("w:i", None)?;
                self.empty("w:sz", Some("18"))?;
                self.end("w:rPr")?;
            }
            Style::Body => {}
        }
        let mut t = BytesStart::new("w:t");
        t.push_attribute(("xml:space", "preserve"));
        self.writer.write_event(Event::Start(t)).map_err(xml_error)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_error)?;
        self.end("w:t")?;
        self.end("w:r")?;
        self.end("w:p")
    }

    fn finish(mut self) -> crate::error::Result<Vec<u8>> {
        self.end("w:body")?;
        self.end("w:document")?;
        Ok(self.writer.into_inner())
    }
}

fn core_properties(title: &str) -> crate::error::Result<Vec<u8>> {
    let created = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(xml_error)?;
    let mut root = BytesStart::new("cp:coreProperties");
    root.push_attribute((
        "xmlns:cp",
        "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
    ));
    root.push_attribute(("xmlns:dc", "http://purl.org/dc/elements/1.1/"));
    root.push_attribute(("xmlns:dcterms", "http://purl.org/dc/terms/"));
    root.push_attribute(("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"));
    writer.write_event(Event::Start(root)).map_err(xml_error)?;

    for (name, value, typed) in [
        ("dc:title", title, false),
        ("dc:creator", "pdf_transform", false),
        ("dcterms:created", created.as_str(), true),
    ] {
        let mut tag = BytesStart::new(name);
        if typed {
            tag.push_attribute(("xsi:type", "dcterms:W3CDTF"));
        }
        writer.write_event(Event::Start(tag)).map_err(xml_error)?;
        writer
            .write_event(Event::Text(BytesText::new(value)))
            .map_err(xml_error)?;
        writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_error)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("cp:coreProperties")))
        .map_err(xml_error)?;
    Ok(writer.into_inner())
}

/// 抽出済みテキストからDOCXを生成する。
pub fn convert(
    page_count: usize,
    extracted_text: &str,
    options: &ConvertToWord,
) -> crate::error::Result<Vec<u8>> {
    let title = "Converted PDF Document";
    let mut body = DocumentXml::begin()?;
    body.paragraph(title, Style::Title)?;
    body.paragraph(
        &format!(
            "Pages: {page_count} | Quality: {} | Layout preserved: {}",
            segment::clean(&options.conversion_quality),
            if options.preserve_layout { "yes" } else { "no" }
        ),
        Style::Meta,
    )?;

    let paragraphs = if extracted_text.trim().is_empty() {
        warn!("no extractable text; emitting explanatory document");
        for line in EMPTY_TEXT_NOTICE {
            body.paragraph(line, Style::Body)?;
        }
        0
    } else {
        let paragraphs = segment::segment(extracted_text)?;
        for p in &paragraphs {
            body.paragraph(p, Style::Body)?;
        }
        paragraphs.len()
    };

    body.paragraph(
        &format!(
            "Conversion summary: {paragraphs} paragraphs from {page_count} pages. Text only; images and tables are not converted."
        ),
        Style::Meta,
    )?;

    let entries = vec![
        ("[Content_Types].xml".to_string(), CONTENT_TYPES.as_bytes().to_vec()),
        ("_rels/.rels".to_string(), ROOT_RELS.as_bytes().to_vec()),
        ("word/document.xml".to_string(), body.finish()?),
        ("docProps/core.xml".to_string(), core_properties(title)?),
    ];
    write_zip(&entries)
}

/// 元のPDFバイト列から直接変換する。他のルールは適用しない。
#[instrument(skip(source, options), fields(source_len = source.len()))]
pub fn convert_pdf(source: &[u8], options: &ConvertToWord) -> crate::error::Result<Vec<u8>> {
    if options.word_format == WordFormat::Doc {
        warn!("legacy .doc output is not supported; producing DOCX");
    }
    if options.extract_images || options.convert_tables {
        warn!(
            extract_images = options.extract_images,
            convert_tables = options.convert_tables,
            "image and table conversion are not supported; text only"
        );
    }
    let doc = PdfDocument::load(source)?;
    let text = doc.extract_text().unwrap_or_else(|e| {
        warn!(error = %e, "text extraction failed");
        String::new()
    });
    let bytes = convert(doc.page_count(), &text, options)?;
    info!(pages = doc.page_count(), bytes = bytes.len(), "converted to word");
    Ok(bytes)
}
