use serde::Deserialize;
use serde_json::Value;

use crate::rules::Rule;

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<Job>,
}

/// ジョブ1件。`rules` は種別の検証前の生データとして保持する。
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub input: String,
    pub output: String,
    pub rules: Vec<Value>,
    pub redaction_seed: Option<u64>,
    pub linearize: Option<bool>,
}

impl Job {
    /// ルールを検証してパースする。
    pub fn parse_rules(&self) -> crate::error::Result<Vec<Rule>> {
        Rule::parse_list(&self.rules)
    }
}

impl JobFile {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| {
            crate::error::TransformError::config(format!("Failed to parse job YAML: {e}"))
        })
    }

    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
