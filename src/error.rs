//! Error types for SlideShot
//!
//! This module provides the error hierarchy using `thiserror`. Every fatal
//! failure of a live run surfaces through [`Error`]; cookie problems have
//! their own type because they are logged and tolerated.

use thiserror::Error;

/// The main error type for SlideShot operations
#[derive(Error, Debug)]
pub enum Error {
    /// Browser-related errors
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Navigation errors
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// Capture errors (measurement, screenshot, output)
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Cookie file errors
    #[error("Cookie error: {0}")]
    Cookie(#[from] CookieError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ChromiumOxide errors
    #[error("CDP error: {0}")]
    Cdp(String),
}

/// Browser lifecycle and control errors
#[derive(Error, Debug)]
pub enum BrowserError {
    /// Failed to launch browser
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Browser configuration error
    #[error("Invalid browser configuration: {0}")]
    ConfigError(String),

    /// Failed to create new page/tab
    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    /// Failed to apply viewport emulation or request headers
    #[error("Failed to prepare page: {0}")]
    PreparationFailed(String),
}

/// Navigation errors
#[derive(Error, Debug)]
pub enum NavigationError {
    /// Navigation (including the network idle wait) timed out
    #[error("Navigation timed out after {0}ms")]
    Timeout(u64),

    /// Page load failed
    #[error("Page load failed: {0}")]
    LoadFailed(String),

    /// Script evaluation during page settling failed
    #[error("Page settling failed: {0}")]
    SettleFailed(String),
}

/// Capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Neither the target element nor body produced a visible box
    #[error("No visible box for target element (or body) using selector '{0}'")]
    NoVisibleBox(String),

    /// Element measurement script failed
    #[error("Element measurement failed: {0}")]
    MeasureFailed(String),

    /// Screenshot failed
    #[error("Screenshot capture failed: {0}")]
    ScreenshotFailed(String),

    /// Input name has no usable base name for the output file
    #[error("Cannot derive output file name from '{0}'")]
    InvalidOutputName(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Unsupported output extension
    #[error("Unsupported output extension '{0}' (expected png, jpg or jpeg)")]
    UnsupportedExtension(String),

    /// Quality outside 0-100
    #[error("JPEG quality must be within 0-100, got {0}")]
    QualityOutOfRange(i64),

    /// A numeric setting could not be parsed
    #[error("Invalid value for {key}: '{value}'")]
    InvalidNumber {
        /// Setting name (environment variable or flag)
        key: String,
        /// Raw value as supplied
        value: String,
    },
}

/// Cookie file errors (non-fatal for a run)
#[derive(Error, Debug)]
pub enum CookieError {
    /// Cookie file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Cookie file path
        path: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Cookie file is not a JSON array of cookie records
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// Cookie file path
        path: String,
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// A cookie record could not be converted into a CDP cookie
    #[error("Invalid cookie '{name}': {reason}")]
    Invalid {
        /// Cookie name
        name: String,
        /// Reason reported by the CDP builder
        reason: String,
    },
}

/// Result type alias for SlideShot operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a CDP error from a string
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }
}

/// Convert chromiumoxide errors
impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}

/// Render `err` and its sources as one line
///
/// Most variants already interpolate their source, so a cause whose text is
/// contained in the message above it is skipped.
pub fn render_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut last = rendered.clone();
    let mut source = err.source();

    while let Some(cause) = source {
        let message = cause.to_string();
        if !last.contains(&message) {
            rendered.push_str(": ");
            rendered.push_str(&message);
        }
        last = message;
        source = cause.source();
    }

    rendered
}
