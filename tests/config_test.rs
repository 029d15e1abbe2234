// 設定ファイル・ジョブファイル解析テスト

use std::io::Write;
use std::path::{Path, PathBuf};

use pdf_transform::config::job::JobFile;
use pdf_transform::config::load_settings_for_job;
use pdf_transform::config::merged::PipelineConfig;
use pdf_transform::config::settings::Settings;
use pdf_transform::error::TransformError;
use pdf_transform::pipeline::job_runner::load_jobs;
use pdf_transform::rules::{MAX_PAGE_NUMBER, parse_page_range};

// ============================================================
// 1. ページ範囲パーサ
// ============================================================

#[test]
fn test_parse_page_range_mixed() {
    let result = parse_page_range("1, 3, 5-10, 15").expect("should parse mixed");
    assert_eq!(result, vec![1, 3, 5, 6, 7, 8, 9, 10, 15]);
}

#[test]
fn test_parse_page_range_rejects_bad_input() {
    for input in ["abc", "10-5", "", " , "] {
        assert!(parse_page_range(input).is_err(), "should reject {input:?}");
    }
}

#[test]
fn test_parse_page_range_rejects_huge_span() {
    let err = parse_page_range("1-4000000000").unwrap_err();
    assert!(matches!(err, TransformError::ValidationError(_)), "{err:?}");
    assert!(parse_page_range(&format!("1-{}", MAX_PAGE_NUMBER + 1)).is_err());
}

// ============================================================
// 2. Settings 構造体のデシリアライズ
// ============================================================

#[test]
fn test_settings_full_yaml() {
    let yaml = r#"
qpdf_path: /opt/qpdf/bin/qpdf
ghostscript_path: /usr/local/bin/gs
scratch_dir: /var/tmp/pdf
redaction_seed: 1234
linearize: true
artifact_ttl_secs: 600
document_dir: /srv/documents
log_filter: debug
"#;
    let settings = Settings::from_yaml(yaml).expect("should parse full settings");
    assert_eq!(settings.qpdf_path, PathBuf::from("/opt/qpdf/bin/qpdf"));
    assert_eq!(settings.ghostscript_path, PathBuf::from("/usr/local/bin/gs"));
    assert_eq!(settings.scratch_dir, PathBuf::from("/var/tmp/pdf"));
    assert_eq!(settings.redaction_seed, Some(1234));
    assert!(settings.linearize);
    assert_eq!(settings.artifact_ttl_secs, 600);
    assert_eq!(settings.document_dir, PathBuf::from("/srv/documents"));
    assert_eq!(settings.log_filter, "debug");
}

#[test]
fn test_settings_empty_yaml_uses_defaults() {
    let settings = Settings::from_yaml("{}").expect("should parse empty mapping");
    assert_eq!(settings.qpdf_path, PathBuf::from("qpdf"));
    assert_eq!(settings.ghostscript_path, PathBuf::from("gs"));
    assert_eq!(settings.redaction_seed, None);
    assert!(!settings.linearize);
    assert_eq!(settings.artifact_ttl_secs, 3600);
    assert_eq!(settings.log_filter, "info");
}

#[test]
fn test_settings_invalid_yaml_is_config_error() {
    let err = Settings::from_yaml("linearize: [1, 2").unwrap_err();
    assert!(matches!(err, TransformError::ConfigError(_)));
}

// ============================================================
// 3. ジョブファイル
// ============================================================

#[test]
fn test_job_file_with_rules() {
    let yaml = r#"
jobs:
  - input: in.pdf
    output: out.pdf
    rules:
      - type: rotate_pages
        pages: "1-2"
        angle: 90
      - type: add_watermark
        text: DRAFT
        position: top-right
  - input: b.pdf
    output: b.zip
    redaction_seed: 5
    linearize: true
    rules:
      - type: split_pdf
        splitBy: individual_pages
"#;
    let job_file = JobFile::from_yaml(yaml).expect("should parse jobs");
    assert_eq!(job_file.jobs.len(), 2);

    let rules = job_file.jobs[0].parse_rules().expect("rules should parse");
    let kinds: Vec<&str> = rules.iter().map(|r| r.kind()).collect();
    assert_eq!(kinds, vec!["rotate_pages", "add_watermark"]);
    assert_eq!(job_file.jobs[1].redaction_seed, Some(5));
}

#[test]
fn test_job_missing_required_field() {
    let yaml = "jobs:\n  - input: in.pdf\n    rules: []\n";
    assert!(JobFile::from_yaml(yaml).is_err());
}

#[test]
fn test_job_unknown_rule_kind() {
    let yaml = "jobs:\n  - input: a.pdf\n    output: b.pdf\n    rules:\n      - type: shred\n";
    let job_file = JobFile::from_yaml(yaml).unwrap();
    let err = job_file.jobs[0].parse_rules().unwrap_err();
    assert!(matches!(err, TransformError::UnsupportedOperationError(_)));
}

// ============================================================
// 4. Settings と Job のマージ
// ============================================================

#[test]
fn test_merge_job_overrides_settings() {
    let settings = Settings::from_yaml("redaction_seed: 1\nlinearize: false\n").unwrap();
    let job_file = JobFile::from_yaml(
        "jobs:\n  - input: a.pdf\n    output: b.pdf\n    redaction_seed: 9\n    linearize: true\n    rules: []\n",
    )
    .unwrap();

    let merged = PipelineConfig::merge(&settings, &job_file.jobs[0]);
    assert_eq!(merged.redaction_seed, Some(9));
    assert!(merged.linearize);
    assert_eq!(merged.qpdf_path, PathBuf::from("qpdf"));
}

#[test]
fn test_merge_falls_back_to_settings() {
    let settings = Settings::from_yaml("redaction_seed: 1\nlinearize: true\n").unwrap();
    let job_file =
        JobFile::from_yaml("jobs:\n  - input: a.pdf\n    output: b.pdf\n    rules: []\n").unwrap();

    let merged = PipelineConfig::merge(&settings, &job_file.jobs[0]);
    assert_eq!(merged.redaction_seed, Some(1));
    assert!(merged.linearize);
}

// ============================================================
// 5. settings.yaml自動検出とジョブ読み込み
// ============================================================

fn write_file(path: &Path, contents: &str) {
    let mut f = std::fs::File::create(path).expect("create file");
    f.write_all(contents.as_bytes()).expect("write file");
}

#[test]
fn test_auto_detect_settings_yaml_exists() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_file(&dir.path().join("settings.yaml"), "artifact_ttl_secs: 42\n");
    let job_path = dir.path().join("jobs.yaml");
    write_file(&job_path, "jobs: []\n");

    let settings = load_settings_for_job(&job_path).expect("should load settings");
    assert_eq!(settings.artifact_ttl_secs, 42);
}

#[test]
fn test_auto_detect_settings_yaml_missing() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let job_path = dir.path().join("jobs.yaml");
    write_file(&job_path, "jobs: []\n");

    let settings = load_settings_for_job(&job_path).expect("should return defaults");
    assert_eq!(settings.artifact_ttl_secs, 3600);
}

#[test]
fn test_load_jobs_resolves_relative_paths() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_file(&dir.path().join("settings.yaml"), "linearize: true\n");
    let job_path = dir.path().join("jobs.yaml");
    write_file(
        &job_path,
        "jobs:\n  - input: in/a.pdf\n    output: /abs/out.pdf\n    rules:\n      - type: reverse_pages\n",
    );

    let jobs = load_jobs(&job_path).expect("should load jobs");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].input_path, dir.path().join("in/a.pdf"));
    assert_eq!(jobs[0].output_path, PathBuf::from("/abs/out.pdf"));
    assert!(jobs[0].pipeline.linearize);
    assert_eq!(jobs[0].rules.len(), 1);
}
