use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub qpdf_path: PathBuf,
    pub ghostscript_path: PathBuf,
    pub scratch_dir: PathBuf,
    pub redaction_seed: Option<u64>,
    pub linearize: bool,
    pub artifact_ttl_secs: u64,
    pub document_dir: PathBuf,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            qpdf_path: PathBuf::from("qpdf"),
            ghostscript_path: PathBuf::from("gs"),
            scratch_dir: std::env::temp_dir(),
            redaction_seed: None,
            linearize: false,
            artifact_ttl_secs: 3600,
            document_dir: PathBuf::from(".documents"),
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| {
            crate::error::TransformError::config(format!("Failed to parse settings YAML: {e}"))
        })
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
