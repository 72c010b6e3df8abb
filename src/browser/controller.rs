//! Browser lifecycle management
//!
//! This module launches Chrome through ChromiumOxide and implements the
//! page automation traits on top of CDP.

use crate::browser::capture::{measure_script, MeasureReply};
use crate::browser::cookies::{set_cookies_params, CookieRecord};
use crate::browser::driver::{
    BrowserSession, ElementMeasure, Launcher, NetworkIdle, ScreenshotRequest, SlidePage, Viewport,
    VIEWPORT_HEIGHT, VIEWPORT_WIDTH,
};
use crate::browser::navigation::{IdleTracker, ASSET_READY_SCRIPT};
use crate::config::{ImageFormat, SlideshotConfig};
use crate::error::{BrowserError, CaptureError, Error, NavigationError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, Headers,
    SetExtraHttpHeadersParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventLoadEventFired, Viewport as ClipViewport,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Chrome flags that let `file://` pages load sibling resources
pub const FILE_ACCESS_ARGS: [&str; 2] = ["--disable-web-security", "--allow-file-access-from-files"];

/// Configuration for browser launch
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Device scale factor (default: 1)
    pub device_scale_factor: f64,
    /// Enable sandbox (default: true for production)
    pub sandbox: bool,
    /// Path to Chrome/Chromium executable (None = auto-detect)
    pub chrome_path: Option<String>,
    /// Additional Chrome arguments
    pub extra_args: Vec<String>,
    /// Bound on a single CDP command, including `Page.navigate`
    pub request_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            device_scale_factor: 1.0,
            sandbox: true,
            chrome_path: None,
            extra_args: Vec::new(),
            request_timeout: NetworkIdle::default().timeout,
        }
    }
}

impl BrowserConfig {
    /// Create a new config builder
    pub fn builder() -> BrowserConfigBuilder {
        BrowserConfigBuilder::default()
    }

    /// Launch settings for a slide run
    pub fn for_run(config: &SlideshotConfig) -> Self {
        let mut builder = Self::builder()
            .scale(config.scale)
            .sandbox(config.sandbox);

        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_path(path.clone());
        }
        if config.uses_file_scheme() {
            for arg in FILE_ACCESS_ARGS {
                builder = builder.arg(arg);
            }
        }

        builder.build()
    }
}

/// Builder for BrowserConfig
#[derive(Default)]
pub struct BrowserConfigBuilder {
    config: BrowserConfig,
}

impl BrowserConfigBuilder {
    /// Set device scale factor
    pub fn scale(mut self, scale: f64) -> Self {
        self.config.device_scale_factor = scale;
        self
    }

    /// Enable/disable sandbox
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    /// Set Chrome path
    pub fn chrome_path<S: Into<String>>(mut self, path: S) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Add extra Chrome argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.config.extra_args.push(arg.into());
        self
    }

    /// Build the config
    pub fn build(self) -> BrowserConfig {
        self.config
    }
}

/// Launches Chrome for live runs
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeLauncher;

#[async_trait]
impl Launcher for ChromeLauncher {
    type Session = ChromeSession;

    async fn launch(&self, config: &SlideshotConfig) -> Result<ChromeSession> {
        ChromeSession::with_config(BrowserConfig::for_run(config)).await
    }
}

/// A launched Chrome instance
pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromeSession {
    /// Launch Chrome with the given config
    #[instrument(skip(config))]
    pub async fn with_config(config: BrowserConfig) -> Result<Self> {
        info!(
            "Launching browser: sandbox={} args={:?}",
            config.sandbox, config.extra_args
        );

        let mut builder = CdpBrowserConfig::builder()
            .request_timeout(config.request_timeout)
            .viewport(chromiumoxide::handler::viewport::Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                device_scale_factor: Some(config.device_scale_factor),
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            });

        if !config.sandbox {
            builder = builder.arg("--no-sandbox");
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        for arg in &config.extra_args {
            builder = builder.arg(arg);
        }

        let cdp_config = builder
            .build()
            .map_err(|e| BrowserError::ConfigError(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler event error: {}", e);
                }
            }
            debug!("Browser handler finished");
        });

        info!("Browser launched successfully");

        Ok(Self {
            browser,
            handler: handler_task,
        })
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    type Page = ChromePage;

    #[instrument(skip(self))]
    async fn new_page(&self) -> Result<ChromePage> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;
        debug!("Created new page");
        Ok(ChromePage { page })
    }

    #[instrument(skip(self))]
    async fn close(&mut self) -> Result<()> {
        info!("Closing browser");

        self.browser
            .close()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?;

        if tokio::time::timeout(Duration::from_secs(5), &mut self.handler)
            .await
            .is_err()
        {
            warn!("Browser handler did not stop within 5s");
        }

        info!("Browser closed");
        Ok(())
    }
}

/// One Chrome tab
pub struct ChromePage {
    page: Page,
}

/// Whether a failed `goto` only gave up waiting while the page kept loading
///
/// chromiumoxide bounds the wait for the load event at 30s regardless of
/// the request timeout, so a timeout here is not a navigation failure.
pub fn load_still_pending(err: &CdpError) -> bool {
    matches!(err, CdpError::Timeout)
}

impl ChromePage {
    /// Load `url` and block until the request count stays within
    /// `idle.max_inflight` for `idle.idle_window`
    ///
    /// Callers bound the whole wait; see [`SlidePage::navigate`].
    async fn goto_until_idle(&self, url: &str, idle: NetworkIdle) -> Result<()> {
        let mut started = self.page.event_listener::<EventRequestWillBeSent>().await?;
        let mut finished = self.page.event_listener::<EventLoadingFinished>().await?;
        let mut failed = self.page.event_listener::<EventLoadingFailed>().await?;
        let mut loaded = self.page.event_listener::<EventLoadEventFired>().await?;

        match self.page.goto(url).await {
            Ok(_) => {}
            Err(e) if load_still_pending(&e) => {
                debug!("Load event still pending for {}, waiting", url);
                loaded.next().await.ok_or_else(|| {
                    NavigationError::LoadFailed("page closed before load".to_string())
                })?;
            }
            Err(e) => return Err(NavigationError::LoadFailed(e.to_string()).into()),
        }

        let mut tracker = IdleTracker::new(idle.max_inflight);
        let mut quiet_since = Some(Instant::now());

        loop {
            let deadline = quiet_since
                .map(|since| since + idle.idle_window)
                .unwrap_or_else(|| Instant::now() + idle.timeout);

            tokio::select! {
                Some(event) = started.next() => {
                    tracker.request_started(event.request_id.inner().clone());
                }
                Some(event) = finished.next() => {
                    tracker.request_finished(event.request_id.inner());
                }
                Some(event) = failed.next() => {
                    tracker.request_finished(event.request_id.inner());
                }
                _ = tokio::time::sleep_until(deadline) => {
                    if quiet_since.is_some() {
                        break;
                    }
                }
            }

            if !tracker.is_quiet() {
                quiet_since = None;
            } else if quiet_since.is_none() {
                quiet_since = Some(Instant::now());
            }
        }

        debug!("Network idle with {} request(s) in flight", tracker.inflight());
        Ok(())
    }
}

#[async_trait]
impl SlidePage for ChromePage {
    async fn emulate_viewport(&self, viewport: Viewport) -> Result<()> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(viewport.width as i64)
            .height(viewport.height as i64)
            .device_scale_factor(viewport.device_scale_factor)
            .mobile(false)
            .build()
            .map_err(BrowserError::PreparationFailed)?;

        self.page
            .execute(params)
            .await
            .map_err(|e| BrowserError::PreparationFailed(e.to_string()))?;
        Ok(())
    }

    async fn set_referer(&self, referer: &str) -> Result<()> {
        let headers = Headers::new(serde_json::json!({ "Referer": referer }));
        self.page
            .execute(SetExtraHttpHeadersParams::new(headers))
            .await
            .map_err(|e| BrowserError::PreparationFailed(e.to_string()))?;
        Ok(())
    }

    async fn set_cookies(&self, cookies: &[CookieRecord]) -> Result<()> {
        // Page::set_cookies rejects about:blank; the raw command does not
        self.page.execute(set_cookies_params(cookies)?).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn navigate(&self, url: &str, idle: NetworkIdle) -> Result<()> {
        let timeout_ms = idle.timeout.as_millis() as u64;
        tokio::time::timeout(idle.timeout, self.goto_until_idle(url, idle))
            .await
            .map_err(|_| NavigationError::Timeout(timeout_ms))?
    }

    async fn inner_height(&self) -> Result<f64> {
        self.page
            .evaluate("window.innerHeight")
            .await
            .map_err(|e| NavigationError::SettleFailed(e.to_string()))?
            .into_value::<f64>()
            .map_err(|e| NavigationError::SettleFailed(e.to_string()).into())
    }

    async fn scroll_to(&self, y: f64) -> Result<f64> {
        let script = format!(
            "(() => {{ window.scrollTo(0, {}); return document.body ? document.body.scrollHeight : 0; }})()",
            y
        );
        self.page
            .evaluate(script.as_str())
            .await
            .map_err(|e| NavigationError::SettleFailed(e.to_string()))?
            .into_value::<f64>()
            .map_err(|e| NavigationError::SettleFailed(e.to_string()).into())
    }

    async fn wait_for_assets(&self) -> Result<()> {
        self.page
            .evaluate(ASSET_READY_SCRIPT)
            .await
            .map_err(|e| NavigationError::SettleFailed(e.to_string()))?;
        Ok(())
    }

    async fn measure(&self, selector: &str) -> Result<ElementMeasure> {
        let script = measure_script(selector)?;
        let reply: MeasureReply = self
            .page
            .evaluate(script.as_str())
            .await
            .map_err(|e| CaptureError::MeasureFailed(e.to_string()))?
            .into_value()
            .map_err(|e| CaptureError::MeasureFailed(e.to_string()))?;
        Ok(reply.into())
    }

    async fn screenshot(&self, request: ScreenshotRequest) -> Result<Vec<u8>> {
        let format = match request.format {
            ImageFormat::Png => CaptureScreenshotFormat::Png,
            ImageFormat::Jpeg => CaptureScreenshotFormat::Jpeg,
        };

        let mut params_builder = ScreenshotParams::builder()
            .format(format)
            .clip(ClipViewport {
                x: request.clip.x as f64,
                y: request.clip.y as f64,
                width: request.clip.width as f64,
                height: request.clip.height as f64,
                scale: 1.0,
            })
            .from_surface(true)
            .capture_beyond_viewport(true);

        if let Some(quality) = request.quality {
            params_builder = params_builder.quality(quality as i64);
        }

        let data = self
            .page
            .screenshot(params_builder.build())
            .await
            .map_err(|e| CaptureError::ScreenshotFailed(e.to_string()))?;

        debug!("Screenshot captured: {} bytes", data.len());
        Ok(data)
    }

    async fn close(&self) -> Result<()> {
        self.page.clone().close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOverrides;

    #[test]
    fn test_browser_config_default() {
        let config = BrowserConfig::default();
        assert_eq!(config.device_scale_factor, 1.0);
        assert!(config.sandbox);
        assert!(config.extra_args.is_empty());
        assert_eq!(config.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_browser_config_builder() {
        let config = BrowserConfig::builder()
            .scale(2.0)
            .sandbox(false)
            .chrome_path("/usr/bin/chromium")
            .arg("--disable-gpu")
            .build();

        assert_eq!(config.device_scale_factor, 2.0);
        assert!(!config.sandbox);
        assert_eq!(config.chrome_path.as_deref(), Some("/usr/bin/chromium"));
        assert_eq!(config.extra_args, vec!["--disable-gpu"]);
    }

    #[test]
    fn test_for_run_relaxes_file_access_only_for_file_scheme() {
        let http = BrowserConfig::for_run(&SlideshotConfig::default());
        assert!(http.extra_args.is_empty());

        let file = BrowserConfig::for_run(&SlideshotConfig::default().with_overrides(
            ConfigOverrides {
                base: Some("file://".to_string()),
                scale: Some(2.0),
                no_sandbox: true,
                ..Default::default()
            },
        ));
        assert_eq!(file.extra_args, FILE_ACCESS_ARGS.to_vec());
        assert_eq!(file.device_scale_factor, 2.0);
        assert!(!file.sandbox);
    }

    #[test]
    fn test_command_timeout_covers_navigation_budget() {
        let config = BrowserConfig::for_run(&SlideshotConfig::default());
        assert!(config.request_timeout >= NetworkIdle::default().timeout);
    }

    #[test]
    fn test_slow_load_keeps_waiting() {
        assert!(load_still_pending(&CdpError::Timeout));
        assert!(!load_still_pending(&CdpError::ChromeMessage(
            "net::ERR_NAME_NOT_RESOLVED".to_string()
        )));
    }
}
