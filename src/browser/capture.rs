//! Slide capture
//!
//! Locates the crop target (falling back to `<body>`), turns its box into an
//! integer clip rectangle and writes the clipped screenshot next to the
//! other outputs. The viewport is never resized to fit the element, so the
//! page layout stays exactly as rendered.

use crate::browser::driver::{
    BoundingBox, ClipRect, ElementMeasure, ScreenshotRequest, SlidePage,
};
use crate::config::{ImageFormat, SlideshotConfig};
use crate::error::{CaptureError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Selector used when the configured one matches nothing
pub const FALLBACK_SELECTOR: &str = "body";

/// Reply of [`measure_script`]
#[derive(Debug, Deserialize)]
pub struct MeasureReply {
    /// Whether the selector matched
    pub found: bool,
    /// Page-space left edge
    #[serde(default)]
    pub x: f64,
    /// Page-space top edge
    #[serde(default)]
    pub y: f64,
    /// Box width
    #[serde(default)]
    pub width: f64,
    /// Box height
    #[serde(default)]
    pub height: f64,
}

impl From<MeasureReply> for ElementMeasure {
    fn from(reply: MeasureReply) -> Self {
        if !reply.found {
            return ElementMeasure::Missing;
        }
        let bbox = BoundingBox {
            x: reply.x,
            y: reply.y,
            width: reply.width,
            height: reply.height,
        };
        if bbox.is_visible() {
            ElementMeasure::Visible(bbox)
        } else {
            ElementMeasure::Hidden
        }
    }
}

/// Script that centres the first match of `selector` in the viewport and
/// reports its box in page coordinates
pub fn measure_script(selector: &str) -> Result<String> {
    let literal = serde_json::to_string(selector)?;
    Ok(format!(
        r#"
        (() => {{
            const el = document.querySelector({literal});
            if (!el) return {{ found: false }};
            el.scrollIntoView({{ block: 'center', inline: 'center' }});
            const rect = el.getBoundingClientRect();
            return {{
                found: true,
                x: rect.left + window.scrollX,
                y: rect.top + window.scrollY,
                width: rect.width,
                height: rect.height
            }};
        }})()
        "#
    ))
}

/// Integer clip covering `bbox`: origin floored and clamped at 0, size ceiled
pub fn compute_clip(bbox: &BoundingBox) -> ClipRect {
    ClipRect {
        x: bbox.x.max(0.0).floor() as u32,
        y: bbox.y.max(0.0).floor() as u32,
        width: bbox.width.ceil() as u32,
        height: bbox.height.ceil() as u32,
    }
}

/// Output name: input stem plus the normalized extension
pub fn output_file_name(input: &str, format: ImageFormat) -> Result<String> {
    let stem = Path::new(input)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CaptureError::InvalidOutputName(input.to_string()))?;
    Ok(format!("{}.{}", stem, format.extension()))
}

/// Measure the crop target, falling back to `<body>` when nothing matches
#[instrument(skip(page))]
pub async fn locate_target<P: SlidePage + ?Sized>(
    page: &P,
    selector: Option<&str>,
) -> Result<BoundingBox> {
    let mut measure = match selector {
        Some(selector) => page.measure(selector).await?,
        None => ElementMeasure::Missing,
    };

    if measure == ElementMeasure::Missing {
        debug!("No element for {:?}, measuring body", selector);
        measure = page.measure(FALLBACK_SELECTOR).await?;
    }

    match measure {
        ElementMeasure::Visible(bbox) => Ok(bbox),
        _ => {
            let target = selector.unwrap_or(FALLBACK_SELECTOR).to_string();
            Err(CaptureError::NoVisibleBox(target).into())
        }
    }
}

/// Capture one slide into `out_dir` and return the written path
///
/// An existing file with the same name is overwritten.
#[instrument(skip(page, config))]
pub async fn capture_slide<P: SlidePage + ?Sized>(
    page: &P,
    file: &str,
    out_dir: &Path,
    config: &SlideshotConfig,
) -> Result<PathBuf> {
    let bbox = locate_target(page, config.selector.as_deref()).await?;
    let clip = compute_clip(&bbox);
    let out_path = out_dir.join(output_file_name(file, config.format)?);

    let request = ScreenshotRequest {
        clip,
        format: config.format,
        quality: config.format.uses_quality().then_some(config.quality),
    };
    let data = page.screenshot(request).await?;
    tokio::fs::write(&out_path, &data).await?;

    info!(
        "Saved {} (clip {}x{} @x{})",
        out_path.display(),
        clip.width,
        clip.height,
        config.scale
    );
    Ok(out_path)
}
