// ジョブ単位: 入力読込 -> ルール適用 -> 出力書込

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::config::job::JobFile;
use crate::config::merged::PipelineConfig;
use crate::config::{self};
use crate::pipeline::dispatcher;
use crate::pipeline::output::OutputKind;
use crate::rules::Rule;

/// Configuration for a single job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub rules: Vec<Rule>,
    pub pipeline: PipelineConfig,
}

/// Result of processing a single job.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub kind: OutputKind,
    pub bytes_written: usize,
}

/// ジョブファイルを読み込み、各ジョブの設定を組み立てる。
///
/// 同じディレクトリの settings.yaml とマージし、相対パスはジョブファイル基準で解決する。
pub fn load_jobs(job_file_path: &Path) -> crate::error::Result<Vec<JobConfig>> {
    let settings = config::load_settings_for_job(job_file_path)?;
    let job_file = JobFile::from_file(job_file_path)?;

    let job_dir = job_file_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    job_file
        .jobs
        .iter()
        .map(|job| {
            Ok(JobConfig {
                input_path: resolve_path(&job_dir, &job.input),
                output_path: resolve_path(&job_dir, &job.output),
                rules: job.parse_rules()?,
                pipeline: PipelineConfig::merge(&settings, job),
            })
        })
        .collect()
}

/// Run a single job: read the input, apply its rules, write the result.
#[instrument(skip_all, fields(input = %config.input_path.display()))]
pub async fn run_job(config: &JobConfig) -> crate::error::Result<JobResult> {
    let source = tokio::fs::read(&config.input_path).await?;
    let output = dispatcher::apply(&source, &config.rules, &config.pipeline).await?;

    if let Some(parent) = config.output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&config.output_path, &output.bytes).await?;
    info!(
        output = %config.output_path.display(),
        kind = %output.kind,
        bytes = output.bytes.len(),
        "job complete"
    );

    Ok(JobResult {
        input_path: config.input_path.clone(),
        output_path: config.output_path.clone(),
        kind: output.kind,
        bytes_written: output.bytes.len(),
    })
}

/// Resolve a potentially relative path against a base directory.
/// If the path is already absolute, return it as-is.
pub fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_resolve_against_job_dir() {
        let resolved = resolve_path(Path::new("/jobs"), "in/a.pdf");
        assert_eq!(resolved, PathBuf::from("/jobs/in/a.pdf"));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let resolved = resolve_path(Path::new("/jobs"), "/data/a.pdf");
        assert_eq!(resolved, PathBuf::from("/data/a.pdf"));
    }
}
