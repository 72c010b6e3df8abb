//! SlideShot CLI
//!
//! Captures every slide in the working directory (or the files given on the
//! command line) through headless Chrome.

use anyhow::Context;
use clap::Parser;
use slideshot::browser::ChromeLauncher;
use slideshot::config::{parse_quality, parse_scale, ConfigOverrides, ImageFormat, SlideshotConfig};
use slideshot::error::{render_chain, ConfigError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

const EXAMPLES: &str = "\
Examples:
  slideshot -s 2                      # scan *.html, export 2x PNG
  slideshot -s 2 --out-ext jpg -q 85
  slideshot -b file:// 1.html 2.html
  slideshot --referer https://example.com/

Environment (used when the matching flag is absent):
  BASE, SCALE, REFERER, OUT_EXT, QUALITY";

/// SlideShot - crop-accurate screenshots of HTML slides
#[derive(Parser, Debug)]
#[command(name = "slideshot")]
#[command(version)]
#[command(about = "Crop-accurate screenshots of HTML slides via headless Chrome")]
#[command(after_help = EXAMPLES)]
struct Args {
    /// Slide files to capture (default: scan the working directory with --pattern)
    files: Vec<String>,

    /// Base URL, http(s) or file:// [default: http://localhost:8000/]
    #[arg(short, long)]
    base: Option<String>,

    /// Device scale factor, 2 for sharper output [default: 1]
    #[arg(short, long, value_parser = scale_arg)]
    scale: Option<f64>,

    /// Referer header for hotlink-protected assets
    #[arg(long, visible_alias = "ref")]
    referer: Option<String>,

    /// Output format: png, jpg or jpeg [default: png]
    #[arg(long = "out-ext", visible_alias = "ext", value_parser = format_arg)]
    out_ext: Option<ImageFormat>,

    /// JPEG quality 0-100, ignored for PNG [default: 90]
    #[arg(short, long, value_parser = quality_arg)]
    quality: Option<u8>,

    /// File pattern: *.ext or a comma-separated list [default: *.html]
    #[arg(short, long)]
    pattern: Option<String>,

    /// Crop target selector, falls back to body [default: .slide]
    #[arg(short = 'c', long)]
    selector: Option<String>,

    /// Print the files and settings without capturing
    #[arg(long)]
    dry_run: bool,

    /// Cookie list (JSON array) injected before navigation [default: cookies.json]
    #[arg(long, value_name = "PATH")]
    cookies: Option<PathBuf>,

    /// Directory for output images [default: working directory]
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Path to Chrome/Chromium executable
    #[arg(long)]
    chrome_path: Option<String>,

    /// Launch Chrome without its sandbox (containers, CI)
    #[arg(long)]
    no_sandbox: bool,

    /// Seconds to wait for images and fonts, 0 waits forever [default: 60]
    #[arg(long, value_name = "SECS")]
    asset_timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            base: self.base,
            scale: self.scale,
            referer: self.referer,
            format: self.out_ext,
            quality: self.quality,
            pattern: self.pattern,
            selector: self.selector,
            dry_run: self.dry_run,
            files: self.files,
            cookies_path: self.cookies,
            out_dir: self.out_dir,
            asset_timeout: self.asset_timeout.map(Duration::from_secs),
            chrome_path: self.chrome_path,
            no_sandbox: self.no_sandbox,
        }
    }
}

fn scale_arg(raw: &str) -> Result<f64, String> {
    parse_scale("--scale", raw).map_err(|e| e.to_string())
}

fn quality_arg(raw: &str) -> Result<u8, String> {
    parse_quality("--quality", raw).map_err(|e| e.to_string())
}

fn format_arg(raw: &str) -> Result<ImageFormat, ConfigError> {
    raw.parse()
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose {
        "warn,slideshot=debug"
    } else {
        "warn,slideshot=info"
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match execute(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Run failed: {}", render_chain(&*e));
            ExitCode::FAILURE
        }
    }
}

async fn execute(args: Args) -> anyhow::Result<()> {
    let config = SlideshotConfig::from_env_with(args.overrides())
        .context("invalid BASE/SCALE/REFERER/OUT_EXT/QUALITY environment")?;

    tracing::debug!("Resolved configuration: {:?}", config);

    let report = slideshot::run(&config, &ChromeLauncher)
        .await
        .context("slide capture failed")?;

    if report.dry_run && !report.files.is_empty() {
        println!("[Dry Run] Would process:");
        for file in &report.files {
            println!(" - {}", file);
        }
        println!("Config: {}", config.summary());
    }

    Ok(())
}
