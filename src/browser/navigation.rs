//! Page navigation and settling
//!
//! URL resolution for slide files, network idle bookkeeping, and the two
//! post-load waits: scrolling through the page to trigger lazy content and
//! waiting for images and web fonts.

use crate::browser::driver::SlidePage;
use crate::error::Result;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Prefix marking a local-file base URL
pub const FILE_SCHEME: &str = "file://";
/// Pause between scroll steps
pub const SCROLL_INTERVAL: Duration = Duration::from_millis(40);
/// Smallest scroll step in CSS pixels
pub const MIN_SCROLL_STEP: f64 = 200.0;
/// Scroll steps after which settling gives up on an ever-growing page
pub const MAX_SCROLL_STEPS: usize = 5000;

/// Resolves once every `<img>` has loaded or errored and `document.fonts`
/// is ready (font failures are ignored). Both waits run concurrently.
pub const ASSET_READY_SCRIPT: &str = r#"
    (async () => {
        const images = Array.from(document.images)
            .filter(img => !img.complete)
            .map(img => new Promise(resolve => {
                img.addEventListener('load', resolve, { once: true });
                img.addEventListener('error', resolve, { once: true });
            }));
        const fonts = (document.fonts && document.fonts.ready)
            ? document.fonts.ready.catch(() => {})
            : Promise.resolve();
        await Promise.all([...images, fonts]);
        return true;
    })()
"#;

/// Whether `base` addresses local files
pub fn uses_file_scheme(base: &str) -> bool {
    base.starts_with(FILE_SCHEME)
}

/// Build the URL for `file`
///
/// `file://` bases get the file's absolute path (relative names resolve
/// against `cwd`) appended verbatim. Other bases get exactly one `/` before
/// the file name. Nothing is percent-encoded or validated.
pub fn resolve_target_url(base: &str, file: &str, cwd: &Path) -> String {
    if uses_file_scheme(base) {
        return format!("{}{}", base, cwd.join(file).display());
    }

    let mut url = base.to_string();
    if !url.ends_with('/') {
        url.push('/');
    }
    url.push_str(file);
    url
}

/// Tracks in-flight requests to decide when the network is idle
#[derive(Debug, Default)]
pub struct IdleTracker {
    inflight: HashSet<String>,
    max_inflight: usize,
}

impl IdleTracker {
    /// Tracker tolerating `max_inflight` open requests
    pub fn new(max_inflight: usize) -> Self {
        Self {
            inflight: HashSet::new(),
            max_inflight,
        }
    }

    /// Record a request start
    pub fn request_started(&mut self, id: impl Into<String>) {
        self.inflight.insert(id.into());
    }

    /// Record a request completion or failure
    pub fn request_finished(&mut self, id: &str) {
        self.inflight.remove(id);
    }

    /// Number of requests still open
    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    /// Whether the open request count is within the tolerated threshold
    pub fn is_quiet(&self) -> bool {
        self.inflight.len() <= self.max_inflight
    }
}

/// Scroll increment for a viewport of the given height
pub fn scroll_step(inner_height: f64) -> f64 {
    let step = (inner_height * 0.6).floor();
    if step.is_finite() {
        step.max(MIN_SCROLL_STEP)
    } else {
        MIN_SCROLL_STEP
    }
}

/// Scroll from top to bottom to trigger lazy loading, then back to the top
///
/// The page height is re-read after every step, so content appended while
/// scrolling is also visited.
#[instrument(skip(page))]
pub async fn settle_lazy_content<P: SlidePage + ?Sized>(page: &P) -> Result<()> {
    let step = scroll_step(page.inner_height().await?);
    let mut y = 0.0;
    let mut steps = 0;

    loop {
        tokio::time::sleep(SCROLL_INTERVAL).await;
        y += step;
        steps += 1;
        let height = page.scroll_to(y).await?;
        if y >= height {
            break;
        }
        if steps >= MAX_SCROLL_STEPS {
            warn!("Page still growing after {} scroll steps, stopping", steps);
            break;
        }
    }

    page.scroll_to(0.0).await?;
    debug!("Lazy content settled after {} steps of {}px", steps, step);
    Ok(())
}

/// Wait for images and fonts, optionally bounded
///
/// An expired bound is logged and the capture proceeds with whatever has
/// rendered so far.
#[instrument(skip(page))]
pub async fn wait_for_assets<P: SlidePage + ?Sized>(
    page: &P,
    timeout: Option<Duration>,
) -> Result<()> {
    match timeout {
        None => page.wait_for_assets().await,
        Some(limit) => match tokio::time::timeout(limit, page.wait_for_assets()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Images/fonts still loading after {}ms, capturing anyway",
                    limit.as_millis()
                );
                Ok(())
            }
        },
    }
}
