// qpdf によるWeb表示用の線形化

use std::ffi::OsString;
use std::path::Path;

use tracing::{instrument, warn};

use crate::error::TransformError;
use crate::external::{ScratchFile, run_tool};

/// 線形化したバイト列を返す。
pub async fn linearize(qpdf: &Path, scratch_dir: &Path, bytes: &[u8]) -> crate::error::Result<Vec<u8>> {
    let input = ScratchFile::write(scratch_dir, "linearize-in", bytes).await?;
    let output = ScratchFile::reserve(scratch_dir, "linearize-out");
    let args = vec![
        OsString::from("--linearize"),
        input.path().as_os_str().to_owned(),
        output.path().as_os_str().to_owned(),
    ];
    let result = run_tool(qpdf, &args).await?;
    // 3 = 警告ありで成功
    if !(result.status.success() || result.status.code() == Some(3)) || !output.exists() {
        return Err(TransformError::external_tool(format!(
            "qpdf failed (exit code {}): {}",
            result.exit_code(),
            result.stderr
        )));
    }
    output.read().await
}

/// 線形化を試み、失敗したら入力をそのまま返す。
#[instrument(skip(bytes), fields(input_len = bytes.len()))]
pub async fn linearize_or_keep(qpdf: &Path, scratch_dir: &Path, bytes: Vec<u8>) -> Vec<u8> {
    match linearize(qpdf, scratch_dir, &bytes).await {
        Ok(out) => out,
        Err(e) => {
            warn!(error = %e, "linearization failed; keeping unlinearized output");
            bytes
        }
    }
}
