//! Shared HTTP client with a browser-like request profile
//!
//! The origin serves different content to clients that do not look like a
//! browser, so every request carries a realistic User-Agent, Accept headers and
//! a Referer pointing at the site origin. The underlying `reqwest::Client` is
//! reference counted; cloning a [`PageClient`] shares the connection pool.

use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER};
use tracing::debug;
use url::Url;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const ACCEPT_IMAGE: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";

/// HTTP client shared by every pipeline component
#[derive(Clone, Debug)]
pub struct PageClient {
    client: reqwest::Client,
    origin: Url,
}

impl PageClient {
    /// Build the client from configuration
    ///
    /// # Errors
    /// Returns error if the origin cannot be derived or the client cannot be built
    pub fn new(config: &Config) -> Result<Self> {
        let origin = config.site_origin()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        let referer = HeaderValue::from_str(origin.as_str())
            .map_err(|e| Error::config("baseUrl", format!("origin is not a valid header: {e}")))?;
        headers.insert(REFERER, referer);

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self { client, origin })
    }

    /// Site origin used to absolutize relative links
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Fetch a page as text
    ///
    /// # Errors
    /// Returns [`Error::Fetch`] on network failure, timeout, or a non-2xx status
    pub async fn get_html(&self, url: &str) -> Result<String> {
        debug!(url, "Fetching page");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, ACCEPT_HTML)
            .send()
            .await
            .map_err(|e| fetch_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch {
                url: url.to_string(),
                reason: format!("HTTP status {}", status.as_u16()),
            });
        }

        response.text().await.map_err(|e| fetch_error(url, &e))
    }

    /// Start a binary GET with image Accept headers
    pub(crate) async fn get_image(&self, url: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(url)
            .header(ACCEPT, ACCEPT_IMAGE)
            .send()
            .await
    }
}

fn fetch_error(url: &str, e: &reqwest::Error) -> Error {
    let reason = if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    };
    Error::Fetch {
        url: url.to_string(),
        reason,
    }
}
