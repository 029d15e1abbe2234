// 全ジョブ実行

use tokio::task::JoinSet;

use crate::error::TransformError;
use crate::pipeline::job_runner::{JobConfig, JobResult, run_job};

/// Run multiple jobs concurrently, collecting results in input order.
/// One job failure does NOT prevent other jobs from running.
pub async fn run_all_jobs(jobs: Vec<JobConfig>) -> Vec<crate::error::Result<JobResult>> {
    let mut set = JoinSet::new();
    for (index, job) in jobs.into_iter().enumerate() {
        set.spawn(async move { (index, run_job(&job).await) });
    }

    let mut results: Vec<Option<crate::error::Result<JobResult>>> = Vec::new();
    results.resize_with(set.len(), || None);
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => tracing::error!(error = %e, "job task panicked"),
        }
    }

    results
        .into_iter()
        .map(|r| {
            r.unwrap_or_else(|| Err(TransformError::IoError(std::io::Error::other("job task aborted"))))
        })
        .collect()
}
