//! 呼び出し側との境界: ドキュメントID + ルール列 → 成果物キー。

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::merged::PipelineConfig;
use crate::config::settings::Settings;
use crate::error::TransformError;
use crate::pipeline::dispatcher;
use crate::rules::Rule;
use crate::store::{ArtifactStore, DocumentStore, TransformedArtifact};

pub struct TransformService {
    documents: DocumentStore,
    artifacts: Arc<dyn ArtifactStore>,
    config: PipelineConfig,
    ttl: Duration,
}

impl TransformService {
    pub fn new(
        documents: DocumentStore,
        artifacts: Arc<dyn ArtifactStore>,
        config: PipelineConfig,
        ttl: Duration,
    ) -> Self {
        TransformService {
            documents,
            artifacts,
            config,
            ttl,
        }
    }

    /// Settingsからストアと設定を組み立てる。
    pub fn from_settings(settings: &Settings, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self::new(
            DocumentStore::new(&settings.document_dir),
            artifacts,
            PipelineConfig::from_settings(settings),
            Duration::from_secs(settings.artifact_ttl_secs),
        )
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    /// ルール列を検証・実行し、成果物を保存してそのキーを返す。
    #[instrument(skip(self, rules), fields(rules = rules.len()))]
    pub async fn submit(&self, document_id: &str, rules: &[Value]) -> crate::error::Result<String> {
        let rules = Rule::parse_list(rules)?;
        let source = self.documents.load_str(document_id)?;
        let output = dispatcher::apply(&source, &rules, &self.config).await?;

        let artifact = TransformedArtifact::from_output(output);
        let key = Uuid::new_v4().to_string();
        info!(
            key = %key,
            kind = %artifact.kind,
            bytes = artifact.bytes.len(),
            digest = %artifact.digest,
            "artifact stored"
        );
        self.artifacts.put(&key, artifact, self.ttl);
        Ok(key)
    }

    /// JSON文字列のルール配列で `submit` する。
    pub async fn submit_json(&self, document_id: &str, rules_json: &str) -> crate::error::Result<String> {
        let rules: Vec<Value> = serde_json::from_str(rules_json)?;
        self.submit(document_id, &rules).await
    }

    /// 成果物を1回だけ取り出す。
    pub fn fetch(&self, key: &str) -> crate::error::Result<TransformedArtifact> {
        self.artifacts
            .take(key)
            .ok_or_else(|| TransformError::not_found(format!("artifact '{key}' not found or expired")))
    }
}
