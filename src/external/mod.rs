//! External process boundary (qpdf, Ghostscript).
//!
//! Commands are always built as argument vectors and never pass through a
//! shell, so passwords and file names are not interpreted. Scratch files get
//! UUID names and are removed when their guard is dropped.

pub mod compress;
pub mod decrypt;
pub mod linearize;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::TransformError;

/// 一時ファイル。ドロップ時に削除される。
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// 一意な名前のパスを確保する（ファイル自体は作らない）。
    pub fn reserve(dir: &Path, label: &str) -> Self {
        let path = dir.join(format!("pdf_transform-{label}-{}.pdf", Uuid::new_v4()));
        Self { path }
    }

    /// 内容を書き込んだ一時ファイルを作る。
    pub async fn write(dir: &Path, label: &str, contents: &[u8]) -> crate::error::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let file = Self::reserve(dir, label);
        tokio::fs::write(&file.path, contents).await?;
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub async fn read(&self) -> crate::error::Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "scratch file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove scratch file"),
        }
    }
}

/// 外部コマンドの実行結果。
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stderr: String,
}

impl ToolOutput {
    pub fn exit_code(&self) -> String {
        self.status
            .code()
            .map_or_else(|| "unknown".to_string(), |c| c.to_string())
    }
}

/// 外部コマンドを実行して終了を待つ。起動できない場合はエラー。
pub async fn run_tool(program: &Path, args: &[OsString]) -> crate::error::Result<ToolOutput> {
    debug!(program = %program.display(), argc = args.len(), "running external tool");
    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            TransformError::external_tool(format!("failed to execute {}: {e}", program.display()))
        })?;
    Ok(ToolOutput {
        status: output.status,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// ツールがPATH上（または指定パス）で起動できるか。
pub async fn tool_available(program: &Path) -> bool {
    Command::new(program)
        .arg("--version")
        .output()
        .await
        .is_ok_and(|o| o.status.success())
}
