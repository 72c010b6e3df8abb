//! Browser automation module
//!
//! This module drives headless Chrome through ChromiumOxide: launch and
//! page lifecycle, navigation and settling, cookie injection, and the
//! clipped slide capture.

pub mod capture;
pub mod controller;
pub mod cookies;
pub mod driver;
pub mod navigation;

pub use capture::{capture_slide, compute_clip, locate_target, output_file_name};
pub use controller::{BrowserConfig, ChromeLauncher, ChromePage, ChromeSession};
pub use cookies::{load_cookies, CookieRecord};
pub use driver::{
    BoundingBox, BrowserSession, ClipRect, ElementMeasure, Launcher, NetworkIdle,
    ScreenshotRequest, SlidePage, Viewport,
};
pub use navigation::{resolve_target_url, settle_lazy_content, wait_for_assets, IdleTracker};
