use std::{
    path::Path,
    process::{Command, Stdio},
};

use crate::error::{FiligreeError, FiligreeResult};

/// Queries a raster file for its pixel dimensions.
pub trait DimensionProbe {
    fn probe(&self, path: &Path) -> FiligreeResult<(u32, u32)>;
}

pub fn is_ffprobe_on_path() -> bool {
    Command::new("ffprobe")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// `ffprobe`-backed probe, matching the engine the executor runs against.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfprobeProbe;

impl DimensionProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> FiligreeResult<(u32, u32)> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "csv=s=x:p=0",
            ])
            .arg(path)
            .output()
            .map_err(|e| {
                FiligreeError::probe(format!(
                    "failed to spawn ffprobe (is it installed and on PATH?): {e}"
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FiligreeError::probe(format!(
                "ffprobe exited with status {} for '{}': {}",
                output.status,
                path.display(),
                stderr.trim()
            )));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }
}

fn parse_probe_output(raw: &str) -> FiligreeResult<(u32, u32)> {
    // Some muxers make ffprobe emit a trailing field separator.
    let line = raw.trim().trim_end_matches('x');
    let (w, h) = line
        .split_once('x')
        .ok_or_else(|| FiligreeError::probe(format!("unexpected ffprobe output '{line}'")))?;

    let width: u32 = w
        .trim()
        .parse()
        .map_err(|_| FiligreeError::probe(format!("unexpected ffprobe width '{w}'")))?;
    let height: u32 = h
        .trim()
        .parse()
        .map_err(|_| FiligreeError::probe(format!("unexpected ffprobe height '{h}'")))?;

    if width == 0 || height == 0 {
        return Err(FiligreeError::probe(format!(
            "ffprobe reported degenerate dimensions {width}x{height}"
        )));
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_plain_and_trailing_separator_forms() {
        assert_eq!(parse_probe_output("1920x1080\n").unwrap(), (1920, 1080));
        assert_eq!(parse_probe_output("1920x1080x").unwrap(), (1920, 1080));
    }

    #[test]
    fn parse_rejects_garbage_and_zero_dimensions() {
        assert!(parse_probe_output("").is_err());
        assert!(parse_probe_output("not-dimensions").is_err());
        assert!(parse_probe_output("12x").is_err());
        assert!(parse_probe_output("0x100").is_err());
        assert!(parse_probe_output("100x0").is_err());
    }
}
