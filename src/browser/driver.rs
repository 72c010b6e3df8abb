//! Page automation seam
//!
//! The run loop talks to the browser only through these traits, so a
//! recording fake can stand in for Chrome in tests. [`super::controller`]
//! provides the CDP implementation.

use crate::browser::cookies::CookieRecord;
use crate::config::{ImageFormat, SlideshotConfig};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Logical viewport used for every slide
pub const VIEWPORT_WIDTH: u32 = 1920;
/// Logical viewport height used for every slide
pub const VIEWPORT_HEIGHT: u32 = 1080;

/// Rendering viewport; only the scale factor changes between runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width in CSS pixels
    pub width: u32,
    /// Height in CSS pixels
    pub height: u32,
    /// Device scale factor
    pub device_scale_factor: f64,
}

impl Viewport {
    /// The fixed 1920x1080 viewport at the given density
    pub fn with_scale(scale: f64) -> Self {
        Self {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
            device_scale_factor: scale,
        }
    }
}

/// Element box in page coordinates (CSS pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// A box is visible when it has a positive, finite area
    pub fn is_visible(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Outcome of measuring the element matched by a selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementMeasure {
    /// Nothing matches the selector
    Missing,
    /// The element exists but has no visible box
    Hidden,
    /// Visible box after scrolling the element to the viewport centre
    Visible(BoundingBox),
}

/// Integer clip rectangle handed to the screenshot encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRect {
    /// Left edge, never negative
    pub x: u32,
    /// Top edge, never negative
    pub y: u32,
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

/// Screenshot encoding request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenshotRequest {
    /// Region to capture
    pub clip: ClipRect,
    /// Encoding
    pub format: ImageFormat,
    /// JPEG quality; `None` for PNG
    pub quality: Option<u8>,
}

/// Network idle policy used after navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkIdle {
    /// In-flight requests tolerated while idle
    pub max_inflight: usize,
    /// How long the page must stay under the threshold
    pub idle_window: Duration,
    /// Hard limit for navigation plus idle wait
    pub timeout: Duration,
}

impl Default for NetworkIdle {
    fn default() -> Self {
        Self {
            max_inflight: 2,
            idle_window: Duration::from_millis(500),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Starts the browser; only called for live runs
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Session type produced by this launcher
    type Session: BrowserSession;

    /// Launch a browser configured for this run
    async fn launch(&self, config: &SlideshotConfig) -> Result<Self::Session>;
}

/// A running browser
#[async_trait]
pub trait BrowserSession: Send {
    /// Page type opened by this session
    type Page: SlidePage;

    /// Open a blank tab
    async fn new_page(&self) -> Result<Self::Page>;

    /// Shut the browser down
    async fn close(&mut self) -> Result<()>;
}

/// One browser tab, exclusively owned by the loop iteration using it
#[async_trait]
pub trait SlidePage: Send + Sync {
    /// Apply viewport size and device scale factor
    async fn emulate_viewport(&self, viewport: Viewport) -> Result<()>;

    /// Send `Referer` with subsequent requests
    async fn set_referer(&self, referer: &str) -> Result<()>;

    /// Add cookies to the page's cookie jar
    async fn set_cookies(&self, cookies: &[CookieRecord]) -> Result<()>;

    /// Navigate and wait for network idle, bounded by `idle.timeout`
    async fn navigate(&self, url: &str, idle: NetworkIdle) -> Result<()>;

    /// `window.innerHeight`
    async fn inner_height(&self) -> Result<f64>;

    /// Scroll to vertical offset `y` and report `document.body.scrollHeight`
    async fn scroll_to(&self, y: f64) -> Result<f64>;

    /// Resolve once every image has loaded or errored and fonts are ready
    async fn wait_for_assets(&self) -> Result<()>;

    /// Scroll the first match of `selector` into view and measure it
    async fn measure(&self, selector: &str) -> Result<ElementMeasure>;

    /// Encode the clipped region
    async fn screenshot(&self, request: ScreenshotRequest) -> Result<Vec<u8>>;

    /// Close the tab
    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_is_fixed() {
        let viewport = Viewport::with_scale(2.0);
        assert_eq!(viewport.width, 1920);
        assert_eq!(viewport.height, 1080);
        assert_eq!(viewport.device_scale_factor, 2.0);
    }

    #[test]
    fn test_network_idle_default() {
        let idle = NetworkIdle::default();
        assert_eq!(idle.max_inflight, 2);
        assert_eq!(idle.idle_window, Duration::from_millis(500));
        assert_eq!(idle.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_bounding_box_visibility() {
        let visible = BoundingBox {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 1.0,
        };
        assert!(visible.is_visible());
        assert!(!BoundingBox { width: 0.0, ..visible }.is_visible());
        assert!(!BoundingBox {
            height: f64::NAN,
            ..visible
        }
        .is_visible());
    }
}
