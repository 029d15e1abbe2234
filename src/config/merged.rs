use std::path::PathBuf;

use super::job::Job;
use super::settings::Settings;

/// 1回の変換パイプライン実行に渡す設定。
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub qpdf_path: PathBuf,
    pub ghostscript_path: PathBuf,
    pub scratch_dir: PathBuf,
    pub redaction_seed: Option<u64>,
    pub linearize: bool,
}

impl PipelineConfig {
    /// Settingsの値だけで作る（サービス経由の呼び出し用）。
    pub fn from_settings(settings: &Settings) -> Self {
        PipelineConfig {
            qpdf_path: settings.qpdf_path.clone(),
            ghostscript_path: settings.ghostscript_path.clone(),
            scratch_dir: settings.scratch_dir.clone(),
            redaction_seed: settings.redaction_seed,
            linearize: settings.linearize,
        }
    }

    /// JobのOption値がSomeならJobの値を、NoneならSettingsの値を使用する。
    pub fn merge(settings: &Settings, job: &Job) -> Self {
        PipelineConfig {
            redaction_seed: job.redaction_seed.or(settings.redaction_seed),
            linearize: job.linearize.unwrap_or(settings.linearize),
            ..Self::from_settings(settings)
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}
