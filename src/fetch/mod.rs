// src/fetch/mod.rs
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Request timeout applied when the caller has no opinion.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("covidscraper/", env!("CARGO_PKG_VERSION"));

/// Build the blocking HTTP client shared by the extractors. Timeout expiry
/// surfaces as a transport failure on the call that hit it.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("building HTTP client")
}

/// GET `url` and parse the body as JSON.
pub fn get_json(client: &Client, url: &str) -> Result<Value> {
    debug!("GET {}", url);
    client
        .get(url)
        .send()
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("non-success status from {}", url))?
        .json()
        .with_context(|| format!("reading JSON from {}", url))
}

/// POST a pre-serialized body with the given headers and parse the response
/// as JSON. The dashboard source needs its query definitions sent verbatim,
/// so the body is not re-serialized here.
pub fn post_json(client: &Client, url: &str, headers: HeaderMap, body: String) -> Result<Value> {
    debug!("POST {} ({} header overrides)", url, headers.len());
    client
        .post(url)
        .headers(headers)
        .body(body)
        .send()
        .with_context(|| format!("POST {} failed", url))?
        .error_for_status()
        .with_context(|| format!("non-success status from {}", url))?
        .json()
        .with_context(|| format!("reading JSON from {}", url))
}

/// POST a JSON payload and return the raw response bytes (ZIP downloads).
pub fn post_bytes<T: Serialize>(client: &Client, url: &str, payload: &T) -> Result<Vec<u8>> {
    debug!("POST {}", url);
    let bytes = client
        .post(url)
        .json(payload)
        .send()
        .with_context(|| format!("POST {} failed", url))?
        .error_for_status()
        .with_context(|| format!("non-success status from {}", url))?
        .bytes()
        .with_context(|| format!("reading body from {}", url))?;
    Ok(bytes.to_vec())
}
