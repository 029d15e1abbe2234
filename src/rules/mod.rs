//! Transformation rules as they arrive over the boundary.
//!
//! A rule is a JSON (or YAML) object `{ "type": <kind>, ...camelCase fields }`.
//! [`Rule::from_value`] separates unknown kinds (unsupported operation) from
//! known kinds with bad fields (validation error).

pub mod pages;

use serde::Deserialize;
use serde_json::Value;

use crate::error::TransformError;
use crate::geometry::{Anchor, Margins, PagePreset, Rect};

pub use pages::{MAX_PAGE_NUMBER, PageSelection, parse_page_range, resolve_or_all, to_index};

/// 受け付けるルール種別。
pub const RULE_KINDS: [&str; 24] = [
    "remove_pages",
    "rotate_pages",
    "extract_pages",
    "rearrange_pages",
    "reverse_pages",
    "add_blank_page",
    "crop_pages",
    "resize_pages",
    "add_watermark",
    "add_page_numbers",
    "add_header_footer",
    "add_border",
    "add_background",
    "add_image",
    "add_text",
    "add_annotations",
    "edit_pdf",
    "redact_text",
    "set_metadata",
    "add_password",
    "remove_password",
    "compress",
    "split_pdf",
    "convert_to_word",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    RemovePages(RemovePages),
    RotatePages(RotatePages),
    ExtractPages(ExtractPages),
    RearrangePages(RearrangePages),
    ReversePages(ReversePages),
    AddBlankPage(AddBlankPage),
    CropPages(CropPages),
    ResizePages(ResizePages),
    AddWatermark(AddWatermark),
    AddPageNumbers(AddPageNumbers),
    AddHeaderFooter(AddHeaderFooter),
    AddBorder(AddBorder),
    AddBackground(AddBackground),
    AddImage(AddImage),
    AddText(AddText),
    AddAnnotations(AddAnnotations),
    EditPdf(EditPdf),
    RedactText(RedactText),
    SetMetadata(SetMetadata),
    AddPassword(AddPassword),
    RemovePassword(RemovePassword),
    Compress(Compress),
    SplitPdf(SplitPdf),
    ConvertToWord(ConvertToWord),
}

impl Rule {
    /// 1件のルールを検証付きでデシリアライズする。
    pub fn from_value(value: &Value) -> crate::error::Result<Self> {
        let kind = value
            .get("type")
            .ok_or_else(|| TransformError::validation("rule is missing its 'type' field"))?
            .as_str()
            .ok_or_else(|| TransformError::validation("rule 'type' must be a string"))?;
        if !RULE_KINDS.contains(&kind) {
            return Err(TransformError::unsupported(format!(
                "unknown rule type '{kind}'"
            )));
        }
        Rule::deserialize(value)
            .map_err(|e| TransformError::validation(format!("invalid '{kind}' rule: {e}")))
    }

    /// ルール列をデシリアライズする。空のリストはエラー。
    pub fn parse_list(values: &[Value]) -> crate::error::Result<Vec<Self>> {
        if values.is_empty() {
            return Err(TransformError::validation("rule list cannot be empty"));
        }
        values.iter().map(Rule::from_value).collect()
    }

    /// JSON文字列（ルール配列）からパースする。
    pub fn parse_json(json: &str) -> crate::error::Result<Vec<Self>> {
        let values: Vec<Value> = serde_json::from_str(json)?;
        Self::parse_list(&values)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Rule::RemovePages(_) => "remove_pages",
            Rule::RotatePages(_) => "rotate_pages",
            Rule::ExtractPages(_) => "extract_pages",
            Rule::RearrangePages(_) => "rearrange_pages",
            Rule::ReversePages(_) => "reverse_pages",
            Rule::AddBlankPage(_) => "add_blank_page",
            Rule::CropPages(_) => "crop_pages",
            Rule::ResizePages(_) => "resize_pages",
            Rule::AddWatermark(_) => "add_watermark",
            Rule::AddPageNumbers(_) => "add_page_numbers",
            Rule::AddHeaderFooter(_) => "add_header_footer",
            Rule::AddBorder(_) => "add_border",
            Rule::AddBackground(_) => "add_background",
            Rule::AddImage(_) => "add_image",
            Rule::AddText(_) => "add_text",
            Rule::AddAnnotations(_) => "add_annotations",
            Rule::EditPdf(_) => "edit_pdf",
            Rule::RedactText(_) => "redact_text",
            Rule::SetMetadata(_) => "set_metadata",
            Rule::AddPassword(_) => "add_password",
            Rule::RemovePassword(_) => "remove_password",
            Rule::Compress(_) => "compress",
            Rule::SplitPdf(_) => "split_pdf",
            Rule::ConvertToWord(_) => "convert_to_word",
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_opacity() -> f64 {
    1.0
}

fn black() -> String {
    "#000000".to_string()
}

// ============================================================
// 構造系
// ============================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovePages {
    pub pages: PageSelection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotatePages {
    #[serde(default)]
    pub pages: Option<PageSelection>,
    pub angle: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageRange {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractPages {
    pub page_range: PageRange,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RearrangePages {
    pub page_order: Vec<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReversePages {}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBlankPage {
    /// 挿入後に空白ページが占める位置（1始まり）。省略時は末尾。
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default = "default_blank_count")]
    pub count: usize,
    #[serde(default)]
    pub page_size: Option<PagePreset>,
}

fn default_blank_count() -> usize {
    1
}

// ============================================================
// 形状系
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropPages {
    #[serde(default)]
    pub pages: Option<PageSelection>,
    #[serde(default)]
    pub crop_box: Option<Rect>,
    #[serde(default)]
    pub margins: Option<Margins>,
    #[serde(default)]
    pub preset: Option<PagePreset>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizePages {
    #[serde(default)]
    pub pages: Option<PageSelection>,
    #[serde(default)]
    pub size: Option<Size>,
    #[serde(default)]
    pub margins: Option<Margins>,
    #[serde(default)]
    pub preset: Option<PagePreset>,
    /// 既存コンテンツを新しいサイズに合わせて拡縮するか。
    #[serde(default = "default_true")]
    pub scale_content: bool,
}

// ============================================================
// 装飾系
// ============================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWatermark {
    pub text: String,
    #[serde(default)]
    pub position: Anchor,
    #[serde(default = "default_watermark_opacity")]
    pub opacity: f64,
    #[serde(default = "default_watermark_size")]
    pub font_size: f64,
    #[serde(default = "default_watermark_color")]
    pub color: String,
    /// 省略時は中央配置なら45度、それ以外は0度。
    #[serde(default)]
    pub rotation: Option<f64>,
    #[serde(default)]
    pub pages: Option<PageSelection>,
}

fn default_watermark_opacity() -> f64 {
    0.3
}

fn default_watermark_size() -> f64 {
    48.0
}

fn default_watermark_color() -> String {
    "#808080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPageNumbers {
    #[serde(default = "default_number_position")]
    pub position: Anchor,
    /// `{n}` が番号、`{total}` が総ページ数に置換される。
    #[serde(default = "default_number_format")]
    pub format: String,
    #[serde(default = "default_start_number")]
    pub start_number: i64,
    #[serde(default = "default_number_size")]
    pub font_size: f64,
    #[serde(default = "black")]
    pub color: String,
    #[serde(default = "default_stamp_margin")]
    pub margin: f64,
    #[serde(default)]
    pub pages: Option<PageSelection>,
}

fn default_number_position() -> Anchor {
    Anchor::BottomCenter
}

fn default_number_format() -> String {
    "{n}".to_string()
}

fn default_start_number() -> i64 {
    1
}

fn default_number_size() -> f64 {
    12.0
}

fn default_stamp_margin() -> f64 {
    30.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddHeaderFooter {
    #[serde(default)]
    pub header_text: Option<String>,
    #[serde(default)]
    pub footer_text: Option<String>,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(default = "default_header_size")]
    pub font_size: f64,
    #[serde(default = "black")]
    pub color: String,
    #[serde(default = "default_stamp_margin")]
    pub margin: f64,
    #[serde(default)]
    pub pages: Option<PageSelection>,
}

fn default_header_size() -> f64 {
    10.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBorder {
    #[serde(default = "default_border_width")]
    pub width: f64,
    #[serde(default = "black")]
    pub color: String,
    #[serde(default = "default_border_margin")]
    pub margin: f64,
    #[serde(default)]
    pub style: BorderStyle,
    #[serde(default)]
    pub pages: Option<PageSelection>,
}

fn default_border_width() -> f64 {
    2.0
}

fn default_border_margin() -> f64 {
    20.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBackground {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub pages: Option<PageSelection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddImage {
    pub image_data: String,
    #[serde(default)]
    pub pages: Option<PageSelection>,
    #[serde(default)]
    pub position: Option<Anchor>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddText {
    pub text: String,
    #[serde(default)]
    pub pages: Option<PageSelection>,
    #[serde(default)]
    pub position: Option<Anchor>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default = "default_number_size")]
    pub font_size: f64,
    #[serde(default = "black")]
    pub color: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Text,
    Highlight,
    #[serde(alias = "note", alias = "sticky")]
    StickyNote,
    #[serde(alias = "rect", alias = "square")]
    Rectangle,
    #[serde(alias = "ellipse")]
    Circle,
    Line,
    Image,
    Redaction,
    Whiteout,
}

/// 位置付きのオーバーレイ要素。座標はUI座標（左上原点）。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    /// 1始まりのページ番号。
    pub page: i64,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub position: Option<Anchor>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub opacity: Option<f64>,
    #[serde(default)]
    pub font_size: Option<f64>,
    #[serde(default)]
    pub image_data: Option<String>,
    /// 線の終点（UI座標）。
    #[serde(default)]
    pub x2: Option<f64>,
    #[serde(default)]
    pub y2: Option<f64>,
    #[serde(default)]
    pub stroke_width: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAnnotations {
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPdf {
    pub edits: Vec<Annotation>,
}

// ============================================================
// セキュリティ・メタデータ
// ============================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactText {
    pub words: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPassword {
    pub user_password: String,
    #[serde(default)]
    pub owner_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovePassword {
    pub current_password: String,
    #[serde(default = "default_true")]
    pub remove_user_password: bool,
    #[serde(default = "default_true")]
    pub remove_owner_password: bool,
}

// ============================================================
// 出力系
// ============================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Low,
    #[default]
    Medium,
    High,
    Maximum,
    Custom,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compress {
    #[serde(default)]
    pub compression_level: CompressionLevel,
    /// 目標サイズ（KB）。
    #[serde(default)]
    pub target_file_size: Option<u64>,
    /// JPEG品質（%）。
    #[serde(default)]
    pub image_quality: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    #[serde(alias = "count")]
    PageCount,
    #[serde(alias = "ranges")]
    PageRanges,
    #[serde(alias = "individual")]
    IndividualPages,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SplitRange {
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitPdf {
    pub split_by: SplitMode,
    #[serde(default)]
    pub pages_per_split: Option<usize>,
    #[serde(default)]
    pub split_ranges: Vec<SplitRange>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordFormat {
    #[default]
    Docx,
    Doc,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertToWord {
    #[serde(default)]
    pub word_format: WordFormat,
    #[serde(default = "default_quality")]
    pub conversion_quality: String,
    #[serde(default)]
    pub preserve_layout: bool,
    #[serde(default)]
    pub extract_images: bool,
    #[serde(default)]
    pub convert_tables: bool,
}

fn default_quality() -> String {
    "standard".to_string()
}
