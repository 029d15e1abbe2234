use chrono::Utc;
use lopdf::{Object, StringFormat};
use tracing::warn;

use crate::error::TransformError;
use crate::pdf::PdfDocument;
use crate::rules::{AddPassword, SetMetadata};

/// PDFテキスト文字列に変換する。ASCII以外はUTF-16BE（BOM付き）。
pub(crate) fn text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::String(value.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// PDF日付形式 `D:YYYYMMDDHHmmSSZ`。
fn pdf_date_now() -> String {
    format!("D:{}Z", Utc::now().format("%Y%m%d%H%M%S"))
}

/// 文書情報辞書を更新する。ModDateは常に現在時刻。
pub fn set_metadata(doc: &mut PdfDocument, rule: &SetMetadata) -> crate::error::Result<()> {
    let fields = [
        ("Title", &rule.title),
        ("Author", &rule.author),
        ("Subject", &rule.subject),
        ("Keywords", &rule.keywords),
        ("Creator", &rule.creator),
    ];
    let mut entries: Vec<(&str, Object)> = fields
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, text_string(v))))
        .collect();
    if entries.is_empty() {
        return Err(TransformError::validation(
            "set_metadata requires at least one of title, author, subject, keywords, creator",
        ));
    }
    entries.push(("Producer", text_string("pdf_transform")));
    entries.push(("ModDate", text_string(&pdf_date_now())));
    doc.set_info(entries)
}

/// パスワード付与は行わない（暗号化は非対応）。警告のみ。
pub fn add_password(rule: &AddPassword) {
    warn!(
        owner_password = rule.owner_password.is_some(),
        user_password_len = rule.user_password.len(),
        "add_password requested but encryption is not supported; document left unencrypted"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_ascii_uses_utf16_bom() {
        match text_string("Ü") {
            Object::String(bytes, _) => assert_eq!(bytes, vec![0xFE, 0xFF, 0x00, 0xDC]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn date_has_pdf_prefix() {
        let d = pdf_date_now();
        assert!(d.starts_with("D:"));
        assert_eq!(d.len(), 2 + 14 + 1);
    }
}
