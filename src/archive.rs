// ZIPコンテナの書き出し（分割アーカイブとDOCXで共用）

use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// (エントリ名, 内容) の順序付きリストをZIPにまとめる。全エントリDeflate。
pub fn write_zip(entries: &[(String, Vec<u8>)]) -> crate::error::Result<Vec<u8>> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in entries {
        zip.start_file(name.as_str(), deflated)?;
        zip.write_all(data)?;
    }
    Ok(zip.finish()?.into_inner())
}

/// ZIPのエントリ名一覧を返す（検査・テスト用）。
pub fn entry_names(bytes: &[u8]) -> crate::error::Result<Vec<String>> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    Ok(archive.file_names().map(str::to_string).collect())
}

/// 指定エントリの内容を読み出す。
pub fn read_entry(bytes: &[u8], name: &str) -> crate::error::Result<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut file = archive.by_name(name)?;
    let mut out = Vec::new();
    std::io::copy(&mut file, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_entries_in_order() {
        let bytes = write_zip(&[
            ("b.txt".to_string(), b"two".to_vec()),
            ("a.txt".to_string(), b"one".to_vec()),
        ])
        .unwrap();
        assert_eq!(&bytes[..4], b"PK\x03\x04");
        let mut names = entry_names(&bytes).unwrap();
        names.sort();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(read_entry(&bytes, "a.txt").unwrap(), b"one");
    }
}
