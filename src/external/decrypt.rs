// qpdf によるパスワード除去

use std::ffi::OsString;
use std::path::Path;

use tracing::{info, instrument, warn};

use crate::error::{DecryptFailure, TransformError};
use crate::external::{ScratchFile, run_tool};
use crate::rules::RemovePassword;

/// qpdf の終了コード3は「警告あり・成功」。
const QPDF_EXIT_WARNINGS: i32 = 3;

/// qpdf の診断メッセージから失敗理由を分類する。
pub fn classify_failure(stderr: &str) -> DecryptFailure {
    let lower = stderr.to_lowercase();
    if lower.contains("invalid password") {
        DecryptFailure::WrongPassword
    } else if lower.contains("not encrypted") {
        DecryptFailure::NotEncrypted
    } else {
        DecryptFailure::ToolFailure(stderr.trim().to_string())
    }
}

/// 暗号化辞書への参照（`/Encrypt`）を含むか。
pub fn looks_encrypted(bytes: &[u8]) -> bool {
    bytes.windows(8).any(|w| w == b"/Encrypt")
}

/// 除去対象のフラグを検証する。
///
/// qpdf の `--decrypt` は暗号化を丸ごと外すので、片方だけの除去はできない。
pub fn check_scope(rule: &RemovePassword) -> crate::error::Result<()> {
    match (rule.remove_user_password, rule.remove_owner_password) {
        (false, false) => Err(TransformError::validation(
            "remove_password needs removeUserPassword or removeOwnerPassword",
        )),
        (true, true) => Ok(()),
        (user, owner) => {
            warn!(
                remove_user_password = user,
                remove_owner_password = owner,
                "only one password requested; all encryption will be removed"
            );
            Ok(())
        }
    }
}

fn decrypt_args(password: &str, input: &Path, output: &Path) -> Vec<OsString> {
    vec![
        OsString::from(format!("--password={password}")),
        OsString::from("--decrypt"),
        input.as_os_str().to_owned(),
        output.as_os_str().to_owned(),
    ]
}

/// 復号した一時ファイルを返す。呼び出し側がガードを保持し、ドロップで削除される。
#[instrument(skip(source, password), fields(source_len = source.len()))]
pub async fn decrypt(
    qpdf: &Path,
    scratch_dir: &Path,
    source: &[u8],
    password: &str,
) -> crate::error::Result<ScratchFile> {
    if !looks_encrypted(source) {
        return Err(TransformError::DecryptionError(DecryptFailure::NotEncrypted));
    }
    let input = ScratchFile::write(scratch_dir, "encrypted", source).await?;
    let output = ScratchFile::reserve(scratch_dir, "decrypted");

    let result = run_tool(qpdf, &decrypt_args(password, input.path(), output.path()))
        .await
        .map_err(|e| TransformError::DecryptionError(DecryptFailure::ToolFailure(e.to_string())))?;

    let succeeded = result.status.success() || result.status.code() == Some(QPDF_EXIT_WARNINGS);
    if succeeded && output.exists() {
        info!(exit_code = %result.exit_code(), "password removed");
        return Ok(output);
    }
    Err(TransformError::DecryptionError(classify_failure(&result.stderr)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(user: bool, owner: bool) -> RemovePassword {
        RemovePassword {
            current_password: "pw".into(),
            remove_user_password: user,
            remove_owner_password: owner,
        }
    }

    #[test]
    fn scope_needs_at_least_one_password() {
        assert!(matches!(
            check_scope(&rule(false, false)),
            Err(TransformError::ValidationError(_))
        ));
        assert!(check_scope(&rule(true, true)).is_ok());
        assert!(check_scope(&rule(false, true)).is_ok());
    }

    #[test]
    fn classifies_qpdf_messages() {
        assert_eq!(
            classify_failure("qpdf: in.pdf: invalid password"),
            DecryptFailure::WrongPassword
        );
        assert_eq!(
            classify_failure("in.pdf: file is not encrypted"),
            DecryptFailure::NotEncrypted
        );
        assert_eq!(
            classify_failure("  damaged xref  "),
            DecryptFailure::ToolFailure("damaged xref".to_string())
        );
    }

    #[test]
    fn password_is_a_single_argument() {
        let args = decrypt_args("p'; rm -rf / #", Path::new("/a.pdf"), Path::new("/b.pdf"));
        assert_eq!(args.len(), 4);
        assert_eq!(args[0], OsString::from("--password=p'; rm -rf / #"));
    }

    #[test]
    fn detects_encrypt_entry() {
        assert!(looks_encrypted(b"trailer << /Root 1 0 R /Encrypt 5 0 R >>"));
        assert!(!looks_encrypted(b"trailer << /Root 1 0 R >>"));
    }
}
