// 変換結果の種別判定（バイト列のシグネチャから）

use std::fmt;

/// ZIPローカルヘッダ・中央ディレクトリ・終端レコードの3バイト目。
const ZIP_SIGNATURE_BYTES: [u8; 3] = [0x03, 0x01, 0x05];

const WORD_CONTENT_TYPES: &[u8] = b"[Content_Types].xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Document,
    Archive,
    Word,
}

impl OutputKind {
    /// 出力バイト列から種別を判定する。呼び出し側のフラグには依存しない。
    pub fn detect(bytes: &[u8]) -> Self {
        let is_zip = bytes.len() >= 3
            && bytes[0] == b'P'
            && bytes[1] == b'K'
            && ZIP_SIGNATURE_BYTES.contains(&bytes[2]);
        if !is_zip {
            return OutputKind::Document;
        }
        if contains(bytes, WORD_CONTENT_TYPES) {
            OutputKind::Word
        } else {
            OutputKind::Archive
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputKind::Document => "document",
            OutputKind::Archive => "archive",
            OutputKind::Word => "word",
        }
    }

    /// ダウンロード時の表示名。
    pub fn default_file_name(self) -> &'static str {
        match self {
            OutputKind::Document => "transformed.pdf",
            OutputKind::Archive => "split_documents.zip",
            OutputKind::Word => "converted.docx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputKind::Document => "application/pdf",
            OutputKind::Archive => "application/zip",
            OutputKind::Word => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// パイプラインの出力。
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub bytes: Vec<u8>,
    pub kind: OutputKind,
}

impl TransformOutput {
    pub fn new(bytes: Vec<u8>) -> Self {
        let kind = OutputKind::detect(&bytes);
        TransformOutput { bytes, kind }
    }
}
