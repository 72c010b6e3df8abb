//! Cookie file loading
//!
//! The cookie file is a JSON array in the format browser cookie exporters
//! produce (`name`, `value`, `domain`, `path`, `expires`, `httpOnly`,
//! `secure`, `sameSite`). Unknown fields are ignored.

use crate::error::CookieError;
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, CookieSameSite, SetCookiesParams, TimeSinceEpoch,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, instrument};

/// One cookie as stored in the cookie file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieRecord {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// URL the cookie is scoped to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Cookie domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Cookie path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Expiry in seconds since the epoch; negative means session cookie
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    /// HttpOnly flag
    #[serde(default)]
    pub http_only: bool,
    /// Secure flag
    #[serde(default)]
    pub secure: bool,
    /// SameSite policy (`Strict`, `Lax` or `None`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

impl CookieRecord {
    /// Convert into the CDP cookie parameter
    pub fn to_cdp(&self) -> Result<CookieParam, CookieError> {
        let mut builder = CookieParam::builder()
            .name(self.name.clone())
            .value(self.value.clone())
            .http_only(self.http_only)
            .secure(self.secure);

        if let Some(url) = &self.url {
            builder = builder.url(url.clone());
        }
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(path) = &self.path {
            builder = builder.path(path.clone());
        }
        if let Some(expires) = self.expires.filter(|e| *e >= 0.0) {
            builder = builder.expires(TimeSinceEpoch::new(expires));
        }
        if let Some(same_site) = self.same_site.as_deref().and_then(parse_same_site) {
            builder = builder.same_site(same_site);
        }

        builder.build().map_err(|reason| CookieError::Invalid {
            name: self.name.clone(),
            reason,
        })
    }
}

fn parse_same_site(raw: &str) -> Option<CookieSameSite> {
    match raw.to_ascii_lowercase().as_str() {
        "strict" => Some(CookieSameSite::Strict),
        "lax" => Some(CookieSameSite::Lax),
        "none" => Some(CookieSameSite::None),
        _ => None,
    }
}

/// `Network.setCookies` command for `cookies`
///
/// Cookies are scoped by their own `url` or `domain`, so the command can be
/// sent from a blank page before the first navigation.
pub fn set_cookies_params(cookies: &[CookieRecord]) -> Result<SetCookiesParams, CookieError> {
    let params = cookies
        .iter()
        .map(CookieRecord::to_cdp)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SetCookiesParams::new(params))
}

/// Read the cookie file at `path`
///
/// Returns `Ok(None)` when the file does not exist.
#[instrument]
pub fn load_cookies(path: &Path) -> Result<Option<Vec<CookieRecord>>, CookieError> {
    if !path.is_file() {
        debug!("No cookie file at {}", path.display());
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path).map_err(|source| CookieError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let cookies: Vec<CookieRecord> =
        serde_json::from_str(&raw).map_err(|source| CookieError::Parse {
            path: path.display().to_string(),
            source,
        })?;

    Ok(Some(cookies))
}
