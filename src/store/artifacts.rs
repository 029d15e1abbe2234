// 成果物ストア: key → TransformedArtifact（TTL付き）

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::pipeline::output::{OutputKind, TransformOutput};

/// 1回の変換で生成された成果物。
#[derive(Debug, Clone)]
pub struct TransformedArtifact {
    pub bytes: Vec<u8>,
    pub kind: OutputKind,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// バイト列のSHA-256（小文字16進数）。
    pub digest: String,
}

impl TransformedArtifact {
    pub fn new(bytes: Vec<u8>, kind: OutputKind, name: impl Into<String>) -> Self {
        let digest = sha256_hex(&bytes);
        TransformedArtifact {
            bytes,
            kind,
            name: name.into(),
            created_at: Utc::now(),
            digest,
        }
    }

    /// 種別ごとの既定名で包む。
    pub fn from_output(output: TransformOutput) -> Self {
        let name = output.kind.default_file_name();
        Self::new(output.bytes, output.kind, name)
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// 成果物を一時的に保持するストア。複数のリクエストから同時に使われる。
pub trait ArtifactStore: Send + Sync {
    fn put(&self, key: &str, artifact: TransformedArtifact, ttl: Duration);

    /// 期限内なら複製を返す。
    fn get(&self, key: &str) -> Option<TransformedArtifact>;

    /// 取り出して削除する（1回限りの取得）。
    fn take(&self, key: &str) -> Option<TransformedArtifact>;

    /// `now` 時点で期限切れのエントリを削除し、その件数を返す。
    fn sweep(&self, now: Instant) -> usize;
}

struct Entry {
    artifact: TransformedArtifact,
    expires_at: Instant,
}

#[derive(Default)]
pub struct MemoryArtifactStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn put(&self, key: &str, artifact: TransformedArtifact, ttl: Duration) {
        let entry = Entry {
            artifact,
            expires_at: Instant::now() + ttl,
        };
        self.lock().insert(key.to_string(), entry);
    }

    fn get(&self, key: &str) -> Option<TransformedArtifact> {
        let now = Instant::now();
        self.lock()
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.artifact.clone())
    }

    fn take(&self, key: &str) -> Option<TransformedArtifact> {
        let now = Instant::now();
        self.lock()
            .remove(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.artifact)
    }

    fn sweep(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }
}

/// 一定間隔で `sweep` を呼ぶタスクを起動する。返されたハンドルを abort するまで動き続ける。
pub fn spawn_sweeper(store: Arc<dyn ArtifactStore>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let removed = store.sweep(Instant::now());
            if removed > 0 {
                debug!(removed, "expired artifacts swept");
            }
        }
    })
}
