use std::path::Path;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use pdf_transform::config::{self};
use pdf_transform::pipeline::job_runner::{JobConfig, load_jobs};
use pdf_transform::pipeline::orchestrator::run_all_jobs;

const USAGE: &str = "Usage: pdf_transform <jobs.yaml>...
  Apply transformation rules to PDF files according to job specifications.

Options:
  -h, --help     Print this help
  -V, --version  Print version";

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("{USAGE}");
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("pdf_transform {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    // ログフィルタは最初のジョブファイルの settings.yaml から取る（RUST_LOG が優先）。
    let default_filter = config::load_settings_for_job(Path::new(&args[0]))
        .map(|s| s.log_filter)
        .unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut job_configs: Vec<JobConfig> = Vec::new();
    for job_file_arg in &args {
        match load_jobs(Path::new(job_file_arg)) {
            Ok(jobs) => job_configs.extend(jobs),
            Err(e) => {
                eprintln!("ERROR: Failed to load job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let targets: Vec<_> = job_configs
        .iter()
        .map(|j| (j.input_path.clone(), j.output_path.clone()))
        .collect();
    let results = run_all_jobs(job_configs).await;

    let mut has_error = false;
    for ((input, output), result) in targets.iter().zip(&results) {
        match result {
            Ok(job_result) => {
                eprintln!(
                    "OK: {} -> {} ({}, {} bytes)",
                    job_result.input_path.display(),
                    job_result.output_path.display(),
                    job_result.kind,
                    job_result.bytes_written
                );
            }
            Err(e) => {
                eprintln!(
                    "ERROR: {} -> {}: {}",
                    input.display(),
                    output.display(),
                    e.user_message()
                );
                has_error = true;
            }
        }
    }

    if has_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
