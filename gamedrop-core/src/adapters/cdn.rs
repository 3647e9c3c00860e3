//! CDN HTTP clients
//!
//! The catalog document and the artifact segments are static files published
//! on a CDN. Both clients use blocking reqwest with a bounded timeout and make
//! exactly one attempt per call.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::Url;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{Catalog, SegmentLocator};
use crate::ports::{CatalogSource, SegmentSource};

/// Build a blocking client with the given request timeout
fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Validate that a configured URL is absolute http(s)
fn parse_http_url(raw: &str, what: &str) -> Result<Url> {
    let parsed = Url::parse(raw).map_err(|e| Error::Config(format!("Invalid {} '{}': {}", what, raw, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::Config(format!("{} must use http or https, got {}", what, other))),
    }
}

/// Map request errors to readable messages
fn describe_request_error(error: &reqwest::Error, timeout: Duration) -> String {
    if error.is_timeout() {
        format!("timed out after {}ms", timeout.as_millis())
    } else if error.is_connect() {
        "unable to connect".to_string()
    } else {
        error.to_string()
    }
}

/// Reject non-2xx responses
fn check_status(response: &Response) -> std::result::Result<(), String> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(format!("HTTP {}", status.as_u16()))
    }
}

/// Catalog client fetching `games.json`
#[derive(Debug)]
pub struct HttpCatalogClient {
    client: Client,
    catalog_url: String,
    timeout: Duration,
}

impl HttpCatalogClient {
    pub fn new(catalog_url: &str, timeout: Duration) -> Result<Self> {
        parse_http_url(catalog_url, "catalog URL")?;
        Ok(Self {
            client: build_client(timeout)?,
            catalog_url: catalog_url.to_string(),
            timeout,
        })
    }

    pub fn catalog_url(&self) -> &str {
        &self.catalog_url
    }
}

impl CatalogSource for HttpCatalogClient {
    fn fetch_catalog(&self) -> Result<Catalog> {
        debug!(url = %self.catalog_url, "fetching catalog");

        let response = self.client.get(&self.catalog_url).send().map_err(|e| {
            let reason = describe_request_error(&e, self.timeout);
            warn!(url = %self.catalog_url, %reason, "catalog request failed");
            Error::CatalogUnavailable(format!("Failed to load games.json: {}", reason))
        })?;

        check_status(&response)
            .map_err(|reason| Error::CatalogUnavailable(format!("Failed to load games.json: {}", reason)))?;

        let document: JsonValue = response
            .json()
            .map_err(|e| Error::CatalogUnavailable(format!("Failed to parse games.json: {}", e)))?;

        Catalog::from_document(document)
    }
}

/// Segment fetcher resolving locators against a base URL
#[derive(Debug)]
pub struct HttpSegmentSource {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpSegmentSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        parse_http_url(base_url, "segment base URL")?;
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl SegmentSource for HttpSegmentSource {
    fn fetch_segment(&self, locator: &SegmentLocator) -> Result<Vec<u8>> {
        let url = locator.url(&self.base_url);
        debug!(%url, ordinal = locator.ordinal, "fetching segment");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| Error::segment_failed(&url, describe_request_error(&e, self.timeout)))?;

        check_status(&response).map_err(|reason| Error::segment_failed(&url, reason))?;

        let bytes = response
            .bytes()
            .map_err(|e| Error::segment_failed(&url, describe_request_error(&e, self.timeout)))?;

        Ok(bytes.to_vec())
    }
}
