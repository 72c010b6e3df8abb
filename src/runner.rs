//! Run orchestration
//!
//! ```text
//! resolve files ──▶ dry run? ──yes──▶ report
//!                      │
//!                      no
//!                      ▼
//!               launch browser ──▶ for each file: open ▶ prepare ▶ capture ▶ close
//!                      │
//!                      ▼
//!               close browser (always) ──▶ report
//! ```
//!
//! Files are processed strictly one at a time in discovery order. The first
//! failing file aborts the run; outputs already written are kept and the
//! browser is closed before the error is returned.

use crate::browser::capture::capture_slide;
use crate::browser::cookies::{load_cookies, CookieRecord};
use crate::browser::driver::{BrowserSession, Launcher, NetworkIdle, SlidePage, Viewport};
use crate::browser::navigation::{resolve_target_url, settle_lazy_content, wait_for_assets};
use crate::config::SlideshotConfig;
use crate::discovery::discover_in;
use crate::error::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Outcome of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Files selected for processing, in processing order
    pub files: Vec<String>,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Images written, in processing order
    pub outputs: Vec<PathBuf>,
}

impl RunReport {
    fn planned(files: Vec<String>, dry_run: bool) -> Self {
        Self {
            files,
            dry_run,
            outputs: Vec::new(),
        }
    }
}

/// Explicit files when given, otherwise discovery in `cwd`
pub fn resolve_files(config: &SlideshotConfig, cwd: &Path) -> Result<Vec<String>> {
    if !config.files.is_empty() {
        return Ok(config.files.clone());
    }
    discover_in(cwd, &config.pattern)
}

/// Run against the process working directory
pub async fn run<L: Launcher>(config: &SlideshotConfig, launcher: &L) -> Result<RunReport> {
    let cwd = std::env::current_dir()?;
    run_in(config, &cwd, launcher).await
}

/// Run with `cwd` as the directory for discovery, relative paths and outputs
#[instrument(skip(config, launcher))]
pub async fn run_in<L: Launcher>(
    config: &SlideshotConfig,
    cwd: &Path,
    launcher: &L,
) -> Result<RunReport> {
    let files = resolve_files(config, cwd)?;

    if files.is_empty() {
        warn!(
            "No HTML files found for pattern '{}'; check --pattern or add *.html files to {}",
            config.pattern,
            cwd.display()
        );
        return Ok(RunReport::planned(files, config.dry_run));
    }

    if config.dry_run {
        debug!("Dry run, {} file(s) planned", files.len());
        return Ok(RunReport::planned(files, true));
    }

    let cookies = read_cookies(&cwd.join(&config.cookies_path));
    let out_dir = cwd.join(&config.out_dir);

    let mut session = launcher.launch(config).await?;
    let outcome = capture_all(&session, config, cwd, &out_dir, &files, &cookies).await;
    let closed = session.close().await;

    let outputs = match outcome {
        Ok(outputs) => outputs,
        Err(e) => {
            if let Err(close_err) = closed {
                warn!("Failed to close browser after error: {}", close_err);
            }
            return Err(e);
        }
    };
    closed?;

    info!("All {} slide(s) captured", outputs.len());
    Ok(RunReport {
        files,
        dry_run: false,
        outputs,
    })
}

fn read_cookies(path: &Path) -> Vec<CookieRecord> {
    match load_cookies(path) {
        Ok(cookies) => cookies.unwrap_or_default(),
        Err(e) => {
            warn!("Ignoring cookie file: {}", e);
            Vec::new()
        }
    }
}

async fn capture_all<S: BrowserSession>(
    session: &S,
    config: &SlideshotConfig,
    cwd: &Path,
    out_dir: &Path,
    files: &[String],
    cookies: &[CookieRecord],
) -> Result<Vec<PathBuf>> {
    let mut outputs = Vec::with_capacity(files.len());

    for file in files {
        let page = session.new_page().await?;
        match capture_file(&page, file, config, cwd, out_dir, cookies).await {
            Ok(path) => {
                page.close().await?;
                outputs.push(path);
            }
            Err(e) => {
                if let Err(close_err) = page.close().await {
                    debug!("Failed to close page for {}: {}", file, close_err);
                }
                return Err(e);
            }
        }
    }

    Ok(outputs)
}

/// Prepare one page, load the slide and capture it
#[instrument(skip(page, config, cwd, out_dir, cookies))]
pub async fn capture_file<P: SlidePage + ?Sized>(
    page: &P,
    file: &str,
    config: &SlideshotConfig,
    cwd: &Path,
    out_dir: &Path,
    cookies: &[CookieRecord],
) -> Result<PathBuf> {
    page.emulate_viewport(Viewport::with_scale(config.scale)).await?;

    if let Some(referer) = &config.referer {
        page.set_referer(referer).await?;
    }

    if !cookies.is_empty() {
        match page.set_cookies(cookies).await {
            Ok(()) => info!("Injected {} cookie(s)", cookies.len()),
            Err(e) => warn!("Failed to inject cookies (ignored): {}", e),
        }
    }

    let url = resolve_target_url(&config.base, file, cwd);
    info!("Opening {}", url);
    page.navigate(&url, NetworkIdle::default()).await?;

    settle_lazy_content(page).await?;
    wait_for_assets(page, config.asset_timeout).await?;

    capture_slide(page, file, out_dir, config).await
}
