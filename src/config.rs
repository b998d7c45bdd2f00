use std::path::PathBuf;

use crate::{
    asset::TextStyle,
    builder::{ScalePolicy, TileConfig},
    error::{FiligreeError, FiligreeResult},
};

pub const DEFAULT_OPACITY: f64 = 0.1;
pub const DEFAULT_ROTATION_DEGREES: f64 = 45.0;
pub const DEFAULT_COLOR: &str = "#FFFFFF";
pub const DEFAULT_FONT_SIZE: u32 = 100;
pub const DEFAULT_DENSITY: u32 = 8;
/// Proportion-of-min-dimension factors used with the spread grid.
pub const FACTOR_TILED: f64 = 0.15;
pub const FACTOR_UNTILED: f64 = 0.3;
/// Percent-of-width default used with the fixed 2x2 grid.
pub const DEFAULT_PERCENT: f64 = 30.0;

const MIN_FONT_SIZE: u32 = 12;
const MAX_FONT_SIZE: u32 = 200;
const MAX_DENSITY: u32 = 10;

/// Where the watermark raster comes from: rendered from text, or an
/// existing PNG with transparency.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum WatermarkSource {
    Text(TextStyle),
    ImageFile { path: PathBuf },
}

/// Immutable batch configuration, validated once before any file is
/// processed.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub source: WatermarkSource,
    pub opacity: f64,
    pub scale: ScalePolicy,
    pub tiling: TileConfig,
    pub input_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl Config {
    pub fn validate(&self) -> FiligreeResult<()> {
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(FiligreeError::config("opacity must be within 0..=1"));
        }

        self.scale.validate()?;
        self.tiling.validate()?;
        if let TileConfig::Spread { density } = self.tiling
            && !(1..=MAX_DENSITY).contains(&density)
        {
            return Err(FiligreeError::config(format!(
                "tile density must be within 1..={MAX_DENSITY}"
            )));
        }

        match &self.source {
            WatermarkSource::Text(style) => style.validate()?,
            WatermarkSource::ImageFile { path } => {
                if path.as_os_str().is_empty() {
                    return Err(FiligreeError::config("watermark image path must be non-empty"));
                }
            }
        }

        if self.input_dir.as_os_str().is_empty() {
            return Err(FiligreeError::config("input directory must be non-empty"));
        }

        Ok(())
    }

    /// The effective output directory: the configured one, or
    /// `<input>/watermarked`.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.input_dir.join("watermarked"))
    }
}

pub(crate) fn validate_font_size(size: u32) -> FiligreeResult<()> {
    if !(MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&size) {
        return Err(FiligreeError::config(format!(
            "font size must be within {MIN_FONT_SIZE}..={MAX_FONT_SIZE}"
        )));
    }
    Ok(())
}

/// Parses a `#RRGGBB` color.
pub fn parse_hex_color(s: &str) -> FiligreeResult<[u8; 3]> {
    let hex = s
        .strip_prefix('#')
        .ok_or_else(|| FiligreeError::config(format!("color '{s}' must be #RRGGBB")))?;
    if hex.len() != 6 {
        return Err(FiligreeError::config(format!("color '{s}' must be #RRGGBB")));
    }
    let value = u32::from_str_radix(hex, 16)
        .map_err(|_| FiligreeError::config(format!("color '{s}' must be #RRGGBB")))?;
    Ok([(value >> 16) as u8, (value >> 8) as u8, value as u8])
}
