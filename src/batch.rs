use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tracing::{info, warn};

use crate::{
    builder::{ScalePolicy, TileConfig, build},
    error::{FiligreeError, FiligreeResult},
    exec_ffmpeg::Executor,
    graph::{Canvas, WatermarkAsset},
    probe::DimensionProbe,
};

/// Output files keep the input name behind this tag.
pub const OUTPUT_PREFIX: &str = "watermarked_";

const ELIGIBLE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub total: usize,
}

impl BatchSummary {
    pub fn fully_successful(&self) -> bool {
        self.succeeded == self.total
    }
}

/// The files a batch will process: regular files with a png/jpg/jpeg
/// extension (case-insensitive), in name order.
pub fn eligible_files(dir: &Path) -> FiligreeResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("read input directory '{}'", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("read input directory '{}'", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if ELIGIBLE_EXTENSIONS
            .iter()
            .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn output_path_for(input: &Path, output_dir: &Path) -> FiligreeResult<PathBuf> {
    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            FiligreeError::config(format!(
                "input file '{}' has no usable name",
                input.display()
            ))
        })?;
    Ok(output_dir.join(format!("{OUTPUT_PREFIX}{name}")))
}

/// Watermarks every eligible file in `input_dir`, strictly sequentially:
/// probe -> build graph -> execute, one file at a time. A failing file is
/// logged and skipped; the loop always runs to completion and the summary
/// counts both outcomes.
#[allow(clippy::too_many_arguments)]
pub fn run_batch(
    input_dir: &Path,
    output_dir: &Path,
    asset: WatermarkAsset,
    asset_path: &Path,
    scale: &ScalePolicy,
    tiling: &TileConfig,
    probe: &dyn DimensionProbe,
    executor: &dyn Executor,
) -> FiligreeResult<BatchSummary> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("create output directory '{}'", output_dir.display()))?;

    let files = eligible_files(input_dir)?;
    if files.is_empty() {
        return Err(FiligreeError::config(format!(
            "input directory '{}' contains no png/jpg/jpeg images",
            input_dir.display()
        )));
    }

    let total = files.len();
    let mut succeeded = 0usize;
    for (index, path) in files.iter().enumerate() {
        match watermark_one(path, output_dir, asset, asset_path, scale, tiling, probe, executor)
        {
            Ok(out_path) => {
                succeeded += 1;
                info!(
                    file = %path.display(),
                    out = %out_path.display(),
                    done = index + 1,
                    total,
                    "watermarked"
                );
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping file");
            }
        }
    }

    let summary = BatchSummary { succeeded, total };
    if summary.fully_successful() {
        info!(succeeded, total, "batch complete");
    } else {
        warn!(succeeded, total, "batch completed with failures");
    }
    Ok(summary)
}

#[allow(clippy::too_many_arguments)]
fn watermark_one(
    path: &Path,
    output_dir: &Path,
    asset: WatermarkAsset,
    asset_path: &Path,
    scale: &ScalePolicy,
    tiling: &TileConfig,
    probe: &dyn DimensionProbe,
    executor: &dyn Executor,
) -> FiligreeResult<PathBuf> {
    let (width, height) = probe.probe(path)?;
    let canvas = Canvas::new(width, height)?;
    let graph = build(canvas, asset, scale, tiling)?;
    let out_path = output_path_for(path, output_dir)?;
    executor.execute(&graph, path, asset_path, &out_path)?;
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names_are_prefixed() {
        let out = output_path_for(Path::new("in/photo.jpg"), Path::new("out")).unwrap();
        assert_eq!(out, PathBuf::from("out/watermarked_photo.jpg"));
    }

    #[test]
    fn summary_distinguishes_full_from_partial() {
        assert!(
            BatchSummary {
                succeeded: 3,
                total: 3
            }
            .fully_successful()
        );
        assert!(
            !BatchSummary {
                succeeded: 2,
                total: 3
            }
            .fully_successful()
        );
    }
}
