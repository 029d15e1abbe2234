// Ghostscript による画像の再圧縮。失敗しても元のバイト列を返す

use std::ffi::OsString;
use std::path::Path;

use tracing::{info, instrument, warn};

use crate::error::TransformError;
use crate::external::{ScratchFile, run_tool};
use crate::rules::{Compress, CompressionLevel};

/// これより小さい目標サイズ（KB）が指定されたら custom は72dpiにする。
const SMALL_TARGET_KB: u64 = 500;

/// 2回目の圧縮を試みる削減率の閾値。
const SECOND_PASS_REDUCTION: f64 = 0.70;

/// 1回分のGhostscript設定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub dpi: u32,
    pub pdf_settings: &'static str,
    pub jpeg_quality: u8,
}

/// 圧縮レベルからプリセットを決める。
pub fn preset_for(level: CompressionLevel, target_kb: Option<u64>, quality: Option<u8>) -> Preset {
    let (dpi, pdf_settings, default_quality) = match level {
        CompressionLevel::Low => (300, "/printer", 90),
        CompressionLevel::Medium => (150, "/ebook", 75),
        CompressionLevel::High => (100, "/ebook", 60),
        CompressionLevel::Maximum => (72, "/screen", 40),
        CompressionLevel::Custom => match target_kb {
            Some(kb) if kb < SMALL_TARGET_KB => (72, "/screen", 50),
            _ => (150, "/ebook", 70),
        },
    };
    Preset {
        dpi,
        pdf_settings,
        jpeg_quality: quality.map_or(default_quality, |q| q.clamp(1, 100)),
    }
}

fn ghostscript_args(preset: &Preset, input: &Path, output: &Path) -> Vec<OsString> {
    let dpi = preset.dpi;
    let mut args: Vec<OsString> = [
        "-sDEVICE=pdfwrite".to_string(),
        "-dCompatibilityLevel=1.4".to_string(),
        format!("-dPDFSETTINGS={}", preset.pdf_settings),
        "-dNOPAUSE".to_string(),
        "-dQUIET".to_string(),
        "-dBATCH".to_string(),
        "-dSAFER".to_string(),
        "-dDownsampleColorImages=true".to_string(),
        "-dDownsampleGrayImages=true".to_string(),
        "-dDownsampleMonoImages=true".to_string(),
        "-dColorImageDownsampleType=/Bicubic".to_string(),
        "-dGrayImageDownsampleType=/Bicubic".to_string(),
        format!("-dColorImageResolution={dpi}"),
        format!("-dGrayImageResolution={dpi}"),
        format!("-dMonoImageResolution={}", dpi * 2),
        format!("-dJPEGQ={}", preset.jpeg_quality),
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    let mut output_arg = OsString::from("-sOutputFile=");
    output_arg.push(output.as_os_str());
    args.push(output_arg);
    args.push(input.as_os_str().to_owned());
    args
}

async fn run_pass(
    gs: &Path,
    preset: &Preset,
    input: &ScratchFile,
    output: &ScratchFile,
) -> crate::error::Result<Vec<u8>> {
    let result = run_tool(gs, &ghostscript_args(preset, input.path(), output.path())).await?;
    if !result.status.success() {
        return Err(TransformError::external_tool(format!(
            "ghostscript failed (exit code {}): {}",
            result.exit_code(),
            result.stderr
        )));
    }
    if !output.exists() {
        return Err(TransformError::external_tool("ghostscript produced no output"));
    }
    output.read().await
}

/// 2回目を実行すべきか（custom・目標超過・削減率70%未満）。
pub fn needs_second_pass(rule: &Compress, original_len: usize, first_len: usize) -> bool {
    let Some(target_kb) = rule.target_file_size else {
        return false;
    };
    if rule.compression_level != CompressionLevel::Custom || original_len == 0 {
        return false;
    }
    let reduction = 1.0 - first_len as f64 / original_len as f64;
    first_len as u64 > target_kb * 1024 && reduction < SECOND_PASS_REDUCTION
}

async fn try_compress(
    gs: &Path,
    scratch_dir: &Path,
    bytes: &[u8],
    rule: &Compress,
) -> crate::error::Result<Vec<u8>> {
    let input = ScratchFile::write(scratch_dir, "compress-in", bytes).await?;
    let first_out = ScratchFile::reserve(scratch_dir, "compress-out");
    let preset = preset_for(rule.compression_level, rule.target_file_size, rule.image_quality);
    let first = run_pass(gs, &preset, &input, &first_out).await?;

    if !needs_second_pass(rule, bytes.len(), first.len()) {
        return Ok(first);
    }

    let second_out = ScratchFile::reserve(scratch_dir, "compress-out2");
    let maximum = preset_for(CompressionLevel::Maximum, None, rule.image_quality);
    match run_pass(gs, &maximum, &input, &second_out).await {
        Ok(second) => {
            info!(first = first.len(), second = second.len(), "second compression pass");
            Ok(second)
        }
        Err(e) => {
            warn!(error = %e, "second compression pass failed; keeping first pass");
            Ok(first)
        }
    }
}

/// 再圧縮する。外部ツールが失敗した場合は入力をそのまま返す。
#[instrument(skip(bytes, rule), fields(input_len = bytes.len(), level = ?rule.compression_level))]
pub async fn compress(gs: &Path, scratch_dir: &Path, bytes: &[u8], rule: &Compress) -> Vec<u8> {
    match try_compress(gs, scratch_dir, bytes, rule).await {
        Ok(out) => {
            info!(before = bytes.len(), after = out.len(), "compressed");
            out
        }
        Err(e) => {
            warn!(error = %e, "compression failed; returning original bytes");
            bytes.to_vec()
        }
    }
}
