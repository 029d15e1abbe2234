// ドキュメントストア: `<dir>/<uuid>.pdf`

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;
use uuid::Uuid;

use crate::error::TransformError;

/// アップロード済みドキュメントの識別子。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        DocumentId(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// UUID形式でない文字列はファイルシステムに触れる前に拒否する。
impl FromStr for DocumentId {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(DocumentId)
            .map_err(|_| TransformError::not_found(format!("unknown document id '{s}'")))
    }
}

/// ファイルシステムベースのドキュメントストア。
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, id: DocumentId) -> PathBuf {
        self.dir.join(format!("{id}.pdf"))
    }

    /// バイト列を保存して新しいIDを返す。
    ///
    /// 書き込みはアトミック: 一時ファイルに書いてからrenameする。
    pub fn put(&self, bytes: &[u8]) -> crate::error::Result<DocumentId> {
        fs::create_dir_all(&self.dir)?;
        let id = DocumentId::new();
        let path = self.path_for(id);
        let tmp = path.with_extension("pdf.tmp");
        fs::write(&tmp, bytes)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!(%id, bytes = bytes.len(), "document stored");
        Ok(id)
    }

    pub fn load(&self, id: DocumentId) -> crate::error::Result<Vec<u8>> {
        let path = self.path_for(id);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(TransformError::not_found(
                format!("document {id} has no stored file"),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// 文字列IDで読み込む。
    pub fn load_str(&self, id: &str) -> crate::error::Result<Vec<u8>> {
        self.load(id.parse()?)
    }

    /// 削除する。存在しなかった場合は false。
    pub fn remove(&self, id: DocumentId) -> crate::error::Result<bool> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_uuid_ids_are_rejected() {
        for bad in ["../etc/passwd", "", "abc", "00000000-0000-0000-0000-00000000000g"] {
            let err = bad.parse::<DocumentId>().unwrap_err();
            assert!(matches!(err, TransformError::NotFoundError(_)), "{bad}");
        }
    }

    #[test]
    fn display_round_trips_through_parse() {
        let id = DocumentId::new();
        let parsed: DocumentId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }
}
