use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tracing::{debug, warn};

use crate::error::{FiligreeError, FiligreeResult};

/// Transparent margin kept around the text content, in pixels per side.
pub const CONTENT_PADDING: f64 = 25.0;
pub const FALLBACK_FONT_FAMILY: &str = "sans-serif";

const MEASURE_CANVAS: u32 = 8192;
// Avoid pathological allocations from extreme size/rotation combinations.
const MAX_DIM: u32 = 16_384;

/// Styling for a text watermark raster.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TextStyle {
    pub text: String,
    pub font_family: String,
    /// Pixel size, bounded 12..=200.
    pub font_size: u32,
    /// `#RRGGBB`.
    pub color: String,
    /// Counter-clockwise, bounded -180..=180.
    pub rotation_degrees: f64,
}

impl TextStyle {
    pub fn validate(&self) -> FiligreeResult<()> {
        if self.text.trim().is_empty() {
            return Err(FiligreeError::config("watermark text must be non-empty"));
        }
        if self.font_family.trim().is_empty() {
            return Err(FiligreeError::config("font family must be non-empty"));
        }
        crate::config::validate_font_size(self.font_size)?;
        if !self.rotation_degrees.is_finite()
            || !(-180.0..=180.0).contains(&self.rotation_degrees)
        {
            return Err(FiligreeError::config(
                "rotation angle must be within -180..=180",
            ));
        }
        crate::config::parse_hex_color(&self.color)?;
        Ok(())
    }
}

/// A rendered watermark PNG plus its dimensions. When backed by a temporary
/// file, the file lives as long as this value, i.e. for the whole batch.
#[derive(Debug)]
pub struct RenderedAsset {
    pub width: u32,
    pub height: u32,
    path: PathBuf,
    _temp: Option<tempfile::NamedTempFile>,
}

impl RenderedAsset {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Renders the text watermark into a temporary PNG reused across the batch.
pub fn render_text_asset(style: &TextStyle) -> FiligreeResult<RenderedAsset> {
    let temp = tempfile::Builder::new()
        .prefix("filigree-watermark-")
        .suffix(".png")
        .tempfile()
        .context("create temporary watermark file")?;
    let (width, height) = rasterize_to(style, temp.path())?;
    Ok(RenderedAsset {
        width,
        height,
        path: temp.path().to_path_buf(),
        _temp: Some(temp),
    })
}

/// Renders the text watermark to a caller-chosen path.
pub fn render_text_asset_to(style: &TextStyle, out: &Path) -> FiligreeResult<RenderedAsset> {
    crate::exec_ffmpeg::ensure_parent_dir(out)?;
    let (width, height) = rasterize_to(style, out)?;
    Ok(RenderedAsset {
        width,
        height,
        path: out.to_path_buf(),
        _temp: None,
    })
}

/// Two-pass SVG rendition: measure the text's bounding box on an oversized
/// canvas, then re-compose a padded, optionally rotated document sized to
/// the content and rasterize it. The canvas expands to the rotated extents
/// with transparent fill; opacity is NOT baked in here, the graph's
/// alpha-multiply stage applies it.
fn rasterize_to(style: &TextStyle, out: &Path) -> FiligreeResult<(u32, u32)> {
    style.validate()?;

    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    let family = resolve_family(&opt.fontdb, &style.font_family);

    let content = measure_text(style, &family, &opt)?;
    let doc = compose_svg(style, &family, content);
    debug!(
        content_w = content.width,
        content_h = content.height,
        "composed watermark svg"
    );

    let tree = usvg::Tree::from_str(&doc, &opt)
        .map_err(|e| FiligreeError::render(format!("compose watermark svg: {e}")))?;

    let width = tree.size().width().ceil() as u32;
    let height = tree.size().height().ceil() as u32;
    if width == 0 || height == 0 {
        return Err(FiligreeError::render("watermark raster has zero size"));
    }
    if width > MAX_DIM || height > MAX_DIM {
        return Err(FiligreeError::render(format!(
            "watermark raster too large: {width}x{height} (max {MAX_DIM}x{MAX_DIM})"
        )));
    }

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| FiligreeError::render("failed to allocate watermark pixmap"))?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::identity(),
        &mut pixmap.as_mut(),
    );

    let rgba = straight_rgba8(&pixmap);
    image::save_buffer_with_format(
        out,
        &rgba,
        width,
        height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .map_err(|e| {
        FiligreeError::render(format!("write watermark png '{}': {e}", out.display()))
    })?;

    Ok((width, height))
}

#[derive(Clone, Copy, Debug)]
struct ContentBox {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

fn measure_text(
    style: &TextStyle,
    family: &str,
    opt: &usvg::Options,
) -> FiligreeResult<ContentBox> {
    let doc = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{m}" height="{m}">{text}</svg>"#,
        m = MEASURE_CANVAS,
        text = text_element(style, family, 0.0, f64::from(style.font_size)),
    );
    let tree = usvg::Tree::from_str(&doc, opt)
        .map_err(|e| FiligreeError::render(format!("measure watermark text: {e}")))?;

    let bbox = tree.root().abs_bounding_box();
    if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
        return Err(FiligreeError::render(
            "watermark text produced no visible content",
        ));
    }
    Ok(ContentBox {
        x: bbox.x(),
        y: bbox.y(),
        width: bbox.width(),
        height: bbox.height(),
    })
}

fn compose_svg(style: &TextStyle, family: &str, content: ContentBox) -> String {
    let cw = f64::from(content.width) + 2.0 * CONTENT_PADDING;
    let ch = f64::from(content.height) + 2.0 * CONTENT_PADDING;
    let (fw, fh) = rotated_canvas(cw, ch, style.rotation_degrees);

    let text = text_element(
        style,
        family,
        CONTENT_PADDING - f64::from(content.x),
        f64::from(style.font_size) + CONTENT_PADDING - f64::from(content.y),
    );
    let body = if style.rotation_degrees == 0.0 {
        text
    } else {
        format!(
            r#"<g transform="translate({tx} {ty}) rotate({rot} {cx} {cy})">{text}</g>"#,
            tx = (fw - cw) / 2.0,
            ty = (fh - ch) / 2.0,
            rot = -style.rotation_degrees,
            cx = cw / 2.0,
            cy = ch / 2.0,
        )
    };

    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}">{body}</svg>"#,
        w = fw.ceil(),
        h = fh.ceil(),
    )
}

fn text_element(style: &TextStyle, family: &str, x: f64, y: f64) -> String {
    format!(
        r#"<text x="{x}" y="{y}" font-family="{}" font-size="{}" fill="{}">{}</text>"#,
        escape_xml(family),
        style.font_size,
        style.color,
        escape_xml(&style.text),
    )
}

/// Axis-aligned extents of a `width` x `height` box rotated by `degrees`.
pub(crate) fn rotated_canvas(width: f64, height: f64, degrees: f64) -> (f64, f64) {
    let r = degrees.to_radians();
    let (sin, cos) = (r.sin().abs(), r.cos().abs());
    (width * cos + height * sin, width * sin + height * cos)
}

fn resolve_family(db: &usvg::fontdb::Database, requested: &str) -> String {
    let available = db.faces().any(|face| {
        face.families
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(requested))
    });
    if available {
        requested.to_string()
    } else {
        warn!(
            requested,
            fallback = FALLBACK_FONT_FAMILY,
            "font family not found, falling back"
        );
        FALLBACK_FONT_FAMILY.to_string()
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn straight_rgba8(pixmap: &resvg::tiny_skia::Pixmap) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixmap.pixels().len() * 4);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    out
}
