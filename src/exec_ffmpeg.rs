use std::{
    path::Path,
    process::{Command, Stdio},
};

use crate::{
    error::{FiligreeError, FiligreeResult},
    graph::Graph,
    serialize::to_filter_complex,
};

/// Runs a compositing graph against one source image, writing the result to
/// `out`. Input 0 is the main image, input 1 the watermark asset.
pub trait Executor {
    fn execute(
        &self,
        graph: &Graph,
        main: &Path,
        watermark: &Path,
        out: &Path,
    ) -> FiligreeResult<()>;
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> FiligreeResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Executes graphs through the system `ffmpeg` binary. We intentionally use
/// the binary rather than `ffmpeg-next` to avoid native FFmpeg dev
/// header/lib requirements.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegExecutor;

impl Executor for FfmpegExecutor {
    fn execute(
        &self,
        graph: &Graph,
        main: &Path,
        watermark: &Path,
        out: &Path,
    ) -> FiligreeResult<()> {
        let filter = to_filter_complex(graph)?;

        let output = Command::new("ffmpeg")
            .args(["-y", "-loglevel", "error"])
            .arg("-i")
            .arg(main)
            .arg("-i")
            .arg(watermark)
            .arg("-filter_complex")
            .arg(&filter)
            .arg(out)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                FiligreeError::exec(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FiligreeError::exec(format!(
                "ffmpeg exited with status {} for '{}': {}",
                output.status,
                main.display(),
                stderr.trim()
            )));
        }

        Ok(())
    }
}
