//! 変換結果と入力ドキュメントの保管。
//!
//! - [`artifacts`]: TTL付きのインメモリ成果物ストアとバックグラウンド掃除タスク
//! - [`documents`]: ドキュメントIDからPDFバイト列を引くファイルシステムストア

pub mod artifacts;
pub mod documents;

pub use artifacts::{ArtifactStore, MemoryArtifactStore, TransformedArtifact, spawn_sweeper};
pub use documents::{DocumentId, DocumentStore};
