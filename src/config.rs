//! Run configuration
//!
//! A [`SlideshotConfig`] is built once at startup from built-in defaults,
//! the legacy environment variables (`BASE`, `SCALE`, `REFERER`, `OUT_EXT`,
//! `QUALITY`) and explicit overrides, in that order of increasing precedence.
//! It is immutable for the rest of the run and passed by reference.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default base URL
pub const DEFAULT_BASE: &str = "http://localhost:8000/";
/// Default device scale factor
pub const DEFAULT_SCALE: f64 = 1.0;
/// Default JPEG quality
pub const DEFAULT_QUALITY: u8 = 90;
/// Default discovery pattern
pub const DEFAULT_PATTERN: &str = "*.html";
/// Default crop target selector
pub const DEFAULT_SELECTOR: &str = ".slide";
/// Cookie file name looked up next to the executable
pub const COOKIE_FILE_NAME: &str = "cookies.json";
/// Default bound on the image/font readiness wait
pub const DEFAULT_ASSET_TIMEOUT: Duration = Duration::from_secs(60);

/// Output image encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless PNG
    #[default]
    Png,
    /// JPEG, requested as either `jpg` or `jpeg`
    Jpeg,
}

impl ImageFormat {
    /// File extension written to disk (`jpeg` is normalized to `jpg`)
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    /// Whether the encoder honours a quality setting
    pub fn uses_quality(&self) -> bool {
        matches!(self, ImageFormat::Jpeg)
    }
}

impl FromStr for ImageFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            _ => Err(ConfigError::UnsupportedExtension(s.to_string())),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Fully resolved configuration for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideshotConfig {
    /// Base URL; `file://` bases address files by absolute path
    pub base: String,
    /// Device scale factor used for rendering
    pub scale: f64,
    /// Optional Referer header sent with navigations
    pub referer: Option<String>,
    /// Output encoding
    pub format: ImageFormat,
    /// JPEG quality (0-100), ignored for PNG
    pub quality: u8,
    /// Discovery pattern used when no explicit files are given
    pub pattern: String,
    /// Crop target selector; `None` crops the document body
    pub selector: Option<String>,
    /// Report the plan without launching a browser
    pub dry_run: bool,
    /// Explicit input files (empty = discover with `pattern`)
    pub files: Vec<String>,
    /// Optional cookie list injected before each navigation
    pub cookies_path: PathBuf,
    /// Directory receiving the output images
    pub out_dir: PathBuf,
    /// Bound on the image/font readiness wait (`None` = wait forever)
    pub asset_timeout: Option<Duration>,
    /// Chrome/Chromium executable (None = auto-detect)
    pub chrome_path: Option<String>,
    /// Launch Chrome with its sandbox enabled
    pub sandbox: bool,
}

impl Default for SlideshotConfig {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE.to_string(),
            scale: DEFAULT_SCALE,
            referer: None,
            format: ImageFormat::Png,
            quality: DEFAULT_QUALITY,
            pattern: DEFAULT_PATTERN.to_string(),
            selector: Some(DEFAULT_SELECTOR.to_string()),
            dry_run: false,
            files: Vec::new(),
            cookies_path: default_cookie_path(),
            out_dir: PathBuf::from("."),
            asset_timeout: Some(DEFAULT_ASSET_TIMEOUT),
            chrome_path: None,
            sandbox: true,
        }
    }
}

/// Explicit per-run settings; every `Some` wins over environment and defaults
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Base URL
    pub base: Option<String>,
    /// Device scale factor
    pub scale: Option<f64>,
    /// Referer header (empty string clears an environment value)
    pub referer: Option<String>,
    /// Output encoding
    pub format: Option<ImageFormat>,
    /// JPEG quality
    pub quality: Option<u8>,
    /// Discovery pattern
    pub pattern: Option<String>,
    /// Crop target selector (empty string selects the body)
    pub selector: Option<String>,
    /// Dry run
    pub dry_run: bool,
    /// Explicit input files
    pub files: Vec<String>,
    /// Cookie file path
    pub cookies_path: Option<PathBuf>,
    /// Output directory
    pub out_dir: Option<PathBuf>,
    /// Asset wait bound; `Some(Duration::ZERO)` disables the bound
    pub asset_timeout: Option<Duration>,
    /// Chrome executable
    pub chrome_path: Option<String>,
    /// Disable the Chrome sandbox
    pub no_sandbox: bool,
}

impl ConfigOverrides {
    /// Environment variables whose value these overrides replace
    pub fn shadowed_env_keys(&self) -> Vec<&'static str> {
        [
            ("BASE", self.base.is_some()),
            ("SCALE", self.scale.is_some()),
            ("REFERER", self.referer.is_some()),
            ("OUT_EXT", self.format.is_some()),
            ("QUALITY", self.quality.is_some()),
        ]
        .into_iter()
        .filter_map(|(key, set)| set.then_some(key))
        .collect()
    }
}

impl SlideshotConfig {
    /// Resolve the process environment under `overrides`
    pub fn from_env_with(overrides: ConfigOverrides) -> Result<Self> {
        Self::resolve(|key| std::env::var(key).ok(), overrides)
    }

    /// Defaults, then `lookup`, then `overrides`
    ///
    /// Variables shadowed by an override are never read, so a malformed
    /// value there cannot fail the run.
    pub fn resolve<F>(lookup: F, overrides: ConfigOverrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let shadowed = overrides.shadowed_env_keys();
        let config = Self::from_lookup(|key| {
            if shadowed.iter().any(|k| *k == key) {
                None
            } else {
                lookup(key)
            }
        })?;
        Ok(config.with_overrides(overrides))
    }

    /// Build a configuration from an arbitrary variable lookup
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(base) = get("BASE") {
            config.base = base;
        }
        if let Some(raw) = get("SCALE") {
            config.scale = parse_scale("SCALE", &raw)?;
        }
        config.referer = get("REFERER");
        if let Some(raw) = get("OUT_EXT") {
            config.format = raw.parse()?;
        }
        if let Some(raw) = get("QUALITY") {
            config.quality = parse_quality("QUALITY", &raw)?;
        }

        Ok(config)
    }

    /// Apply explicit overrides on top of this configuration
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(base) = overrides.base {
            self.base = base;
        }
        if let Some(scale) = overrides.scale {
            self.scale = scale;
        }
        if let Some(referer) = overrides.referer {
            self.referer = Some(referer).filter(|r| !r.is_empty());
        }
        if let Some(format) = overrides.format {
            self.format = format;
        }
        if let Some(quality) = overrides.quality {
            self.quality = quality;
        }
        if let Some(pattern) = overrides.pattern {
            self.pattern = pattern;
        }
        if let Some(selector) = overrides.selector {
            self.selector = Some(selector).filter(|s| !s.trim().is_empty());
        }
        if overrides.dry_run {
            self.dry_run = true;
        }
        if !overrides.files.is_empty() {
            self.files = overrides.files;
        }
        if let Some(path) = overrides.cookies_path {
            self.cookies_path = path;
        }
        if let Some(dir) = overrides.out_dir {
            self.out_dir = dir;
        }
        if let Some(timeout) = overrides.asset_timeout {
            self.asset_timeout = Some(timeout).filter(|t| !t.is_zero());
        }
        if let Some(path) = overrides.chrome_path {
            self.chrome_path = Some(path);
        }
        if overrides.no_sandbox {
            self.sandbox = false;
        }
        self
    }

    /// Whether the base addresses local files
    pub fn uses_file_scheme(&self) -> bool {
        crate::browser::navigation::uses_file_scheme(&self.base)
    }

    /// One-line summary printed by dry runs
    pub fn summary(&self) -> String {
        format!(
            "base={} scale={} outExt={} quality={} selector={}",
            self.base,
            self.scale,
            self.format,
            self.quality,
            self.selector.as_deref().unwrap_or("body"),
        )
    }
}

/// Parse a device scale factor; must be a positive finite number
pub fn parse_scale(key: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s > 0.0)
        .ok_or_else(|| {
            ConfigError::InvalidNumber {
                key: key.to_string(),
                value: raw.to_string(),
            }
            .into()
        })
}

/// Parse a JPEG quality in 0-100
pub fn parse_quality(key: &str, raw: &str) -> Result<u8> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            key: key.to_string(),
            value: raw.to_string(),
        })?;
    u8::try_from(value)
        .ok()
        .filter(|q| *q <= 100)
        .ok_or_else(|| ConfigError::QualityOutOfRange(value).into())
}

/// `cookies.json` next to the running executable, or in the working
/// directory when there is none there
pub fn default_cookie_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(COOKIE_FILE_NAME)))
        .filter(|path| path.is_file())
        .unwrap_or_else(|| PathBuf::from(COOKIE_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SlideshotConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base, "http://localhost:8000/");
        assert_eq!(config.scale, 1.0);
        assert_eq!(config.referer, None);
        assert_eq!(config.format, ImageFormat::Png);
        assert_eq!(config.quality, 90);
        assert_eq!(config.pattern, "*.html");
        assert_eq!(config.selector.as_deref(), Some(".slide"));
        assert!(!config.dry_run);
        assert!(config.sandbox);
    }

    #[test]
    fn test_environment_values() {
        let config = SlideshotConfig::from_lookup(lookup(&[
            ("BASE", "file://"),
            ("SCALE", "2"),
            ("REFERER", "https://example.com/"),
            ("OUT_EXT", "JPEG"),
            ("QUALITY", "75"),
        ]))
        .unwrap();
        assert_eq!(config.base, "file://");
        assert_eq!(config.scale, 2.0);
        assert_eq!(config.referer.as_deref(), Some("https://example.com/"));
        assert_eq!(config.format, ImageFormat::Jpeg);
        assert_eq!(config.quality, 75);
    }

    #[test]
    fn test_empty_environment_values_are_unset() {
        let config =
            SlideshotConfig::from_lookup(lookup(&[("BASE", ""), ("REFERER", "")])).unwrap();
        assert_eq!(config.base, DEFAULT_BASE);
        assert!(config.referer.is_none());
    }

    #[test]
    fn test_invalid_environment_numbers_are_rejected() {
        let err = SlideshotConfig::from_lookup(lookup(&[("SCALE", "big")])).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::InvalidNumber { .. })));

        let err = SlideshotConfig::from_lookup(lookup(&[("QUALITY", "101")])).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::QualityOutOfRange(101))));

        let err = SlideshotConfig::from_lookup(lookup(&[("OUT_EXT", "gif")])).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::UnsupportedExtension(_))));
    }

    #[test]
    fn test_overrides_win_over_environment() {
        let config = SlideshotConfig::from_lookup(lookup(&[("SCALE", "2"), ("QUALITY", "50")]))
            .unwrap()
            .with_overrides(ConfigOverrides {
                scale: Some(3.0),
                pattern: Some("a.html,b.html".to_string()),
                dry_run: true,
                ..Default::default()
            });
        assert_eq!(config.scale, 3.0);
        assert_eq!(config.quality, 50);
        assert_eq!(config.pattern, "a.html,b.html");
        assert!(config.dry_run);
    }

    #[test]
    fn test_flags_shadow_malformed_environment() {
        let vars = [("SCALE", "abc"), ("QUALITY", "150"), ("OUT_EXT", "gif")];
        let config = SlideshotConfig::resolve(
            lookup(&vars),
            ConfigOverrides {
                scale: Some(2.0),
                quality: Some(80),
                format: Some(ImageFormat::Jpeg),
                dry_run: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(config.scale, 2.0);
        assert_eq!(config.quality, 80);
        assert_eq!(config.format, ImageFormat::Jpeg);

        let err = SlideshotConfig::resolve(
            lookup(&vars),
            ConfigOverrides {
                scale: Some(2.0),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::UnsupportedExtension(_))));
    }

    #[test]
    fn test_unshadowed_environment_still_applies() {
        let config = SlideshotConfig::resolve(
            lookup(&[("BASE", "file://"), ("SCALE", "3")]),
            ConfigOverrides {
                base: Some("http://127.0.0.1:9000/".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(config.base, "http://127.0.0.1:9000/");
        assert_eq!(config.scale, 3.0);
    }

    #[test]
    fn test_empty_selector_override_targets_body() {
        let config = SlideshotConfig::default().with_overrides(ConfigOverrides {
            selector: Some(String::new()),
            ..Default::default()
        });
        assert!(config.selector.is_none());
        assert!(config.summary().ends_with("selector=body"));
    }

    #[test]
    fn test_zero_asset_timeout_disables_bound() {
        let config = SlideshotConfig::default().with_overrides(ConfigOverrides {
            asset_timeout: Some(Duration::ZERO),
            ..Default::default()
        });
        assert!(config.asset_timeout.is_none());
    }

    #[test]
    fn test_image_format_parsing() {
        assert_eq!("png".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert_eq!("jpg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!(" Jpeg ".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert!("webp".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn test_jpeg_extension_is_normalized() {
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
        assert!(ImageFormat::Jpeg.uses_quality());
        assert!(!ImageFormat::Png.uses_quality());
    }

    #[test]
    fn test_parse_quality_bounds() {
        assert_eq!(parse_quality("q", "0").unwrap(), 0);
        assert_eq!(parse_quality("q", "100").unwrap(), 100);
        assert!(parse_quality("q", "-1").is_err());
        assert!(parse_quality("q", "ninety").is_err());
    }
}
