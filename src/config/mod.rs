//! 設定の読み込み。
//!
//! `settings.yaml` は外部ツールのパス・作業ディレクトリ・保存期間など実行環境側の値、
//! ジョブファイルは入出力とルール列を持つ。両者は `merged::PipelineConfig` に合成される。

pub mod job;
pub mod merged;
pub mod settings;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::TransformError;
use settings::Settings;

/// ジョブファイルと同じ場所で探す設定ファイル名。
pub const SETTINGS_FILE_NAME: &str = "settings.yaml";

/// ジョブファイルに対応する設定ファイルのパス。
pub fn settings_path_for_job(job_file_path: &Path) -> crate::error::Result<PathBuf> {
    let dir = job_file_path.parent().ok_or_else(|| {
        TransformError::config(format!(
            "job file {} has no parent directory",
            job_file_path.display()
        ))
    })?;
    Ok(dir.join(SETTINGS_FILE_NAME))
}

/// ジョブ隣の設定を読む。無ければ既定値（qpdf/gs はPATHから、一時ディレクトリはOS既定）。
pub fn load_settings_for_job(job_file_path: &Path) -> crate::error::Result<Settings> {
    let path = settings_path_for_job(job_file_path)?;
    if !path.is_file() {
        debug!(path = %path.display(), "no settings file; using defaults");
        return Ok(Settings::default());
    }
    Settings::from_file(&path)
}
