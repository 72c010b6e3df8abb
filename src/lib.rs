//! SlideShot - Crop-accurate screenshots of HTML slides
//!
//! This crate opens HTML "slide" documents in headless Chrome (via
//! ChromiumOxide/CDP), waits for lazy content, images and fonts to settle,
//! and saves a pixel-accurate crop of the slide element as PNG or JPEG.
//!
//! # Architecture
//!
//! ```text
//! CLI / env ──▶ SlideshotConfig ──▶ runner ──▶ Launcher (Chrome or fake)
//!                                     │              │
//!                                     ▼              ▼
//!                                discovery      SlidePage per file
//!                                                 │
//!                                     navigate ▶ settle ▶ measure ▶ clip ▶ PNG/JPEG
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use slideshot::browser::ChromeLauncher;
//! use slideshot::{ConfigOverrides, SlideshotConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SlideshotConfig::from_env_with(ConfigOverrides {
//!         scale: Some(2.0),
//!         ..Default::default()
//!     })?;
//!
//!     let report = slideshot::run(&config, &ChromeLauncher).await?;
//!     println!("Captured: {:?}", report.outputs);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod browser;
pub mod config;
pub mod discovery;
pub mod error;
pub mod runner;

// Re-exports for convenience
pub use config::{ConfigOverrides, ImageFormat, SlideshotConfig};
pub use discovery::{discover, discover_in, natural_cmp};
pub use error::{Error, Result};
pub use runner::{run, run_in, RunReport};
