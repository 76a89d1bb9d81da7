//! GitHub HTTPS probes
//!
//! Two lightweight requests back the non-SSH probes: the owner's
//! published-keys page and the repository metadata endpoint for token
//! validation. Base URLs are injectable so tests can point the client at
//! a local mock server.

use crate::debug;
use crate::ssh::PublicKey;
use anyhow::{Context, Result};
use std::time::Duration;

/// Default web base URL (published keys live here)
pub const WEB_BASE: &str = "https://github.com";
/// Default API base URL (token validation lives here)
pub const API_BASE: &str = "https://api.github.com";

/// Request timeout; probes must fail fast, not hang the run
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a token validation request that reached the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenValidation {
    /// The endpoint returned 2xx for the authenticated request
    Valid,
    /// The endpoint answered with the given non-2xx status
    Rejected(u16),
}

/// Blocking client for the two GitHub endpoints the probes need
#[derive(Debug, Clone)]
pub struct GithubClient {
    /// Underlying HTTP client with timeout and user agent applied
    http: reqwest::blocking::Client,
    /// Base URL for the published-keys page
    web_base: String,
    /// Base URL for the REST API
    api_base: String,
}

impl GithubClient {
    /// Create a client against the real GitHub endpoints
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new() -> Result<Self> {
        Self::with_base_urls(WEB_BASE.to_string(), API_BASE.to_string())
    }

    /// Create a client against the endpoints named in the settings
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn from_settings(settings: &crate::config::Settings) -> Result<Self> {
        Self::with_base_urls(
            settings.github.web_base.clone(),
            settings.github.api_base.clone(),
        )
    }

    /// Create a client against specific base URLs
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn with_base_urls(web_base: String, api_base: String) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("dotgate/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            web_base,
            api_base,
        })
    }

    /// Fetch the account's published public keys
    ///
    /// The endpoint serves newline-separated `type base64 [comment]`
    /// lines; unparseable lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server answers with a
    /// non-success status
    pub fn published_keys(&self, owner: &str) -> Result<Vec<PublicKey>> {
        let url = format!("{}/{owner}.keys", self.web_base);
        debug::log(&format!("fetching published keys: {url}"));

        let response = self
            .http
            .get(&url)
            .send()
            .with_context(|| format!("Failed to fetch {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "Published keys request returned HTTP {}",
                status.as_u16()
            ));
        }

        let body = response
            .text()
            .context("Failed to read published keys response")?;

        Ok(PublicKey::parse_list(&body))
    }

    /// Validate a token with an authenticated repository metadata request
    ///
    /// A 2xx response means the token can read the repository. Any other
    /// status is reported as [`TokenValidation::Rejected`]; only transport
    /// failures are errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached
    pub fn validate_token(&self, token: &str, owner: &str, repo: &str) -> Result<TokenValidation> {
        let url = format!("{}/repos/{owner}/{repo}", self.api_base);
        debug::log(&format!("validating token against {url}"));

        let response = self
            .http
            .get(&url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Accept", "application/vnd.github+json")
            .send()
            .with_context(|| format!("Failed to reach {url}"))?;

        let status = response.status();
        debug::log(&format!("token validation status: {}", status.as_u16()));

        if status.is_success() {
            Ok(TokenValidation::Valid)
        } else {
            Ok(TokenValidation::Rejected(status.as_u16()))
        }
    }
}
