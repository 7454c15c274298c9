//! Source document download.
//!
//! The engine never learns how the document was fetched; this is the whole
//! of the network boundary for the input side.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

/// Download the price-list PDF and return its bytes.
///
/// Fails on invalid URLs, network errors, and non-2xx responses.
pub async fn download_pdf(source: &str) -> Result<Vec<u8>> {
    let url = url::Url::parse(source).with_context(|| format!("invalid source URL: {source}"))?;

    info!(%url, "downloading price list");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .context("failed to build HTTP client")?;

    let response = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?
        .error_for_status()
        .context("server rejected the download")?;

    let bytes = response
        .bytes()
        .await
        .context("failed to read response body")?;

    info!(bytes = bytes.len(), "download complete");
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_invalid_url() {
        let err = download_pdf("not a url").await.unwrap_err();
        assert!(err.to_string().contains("invalid source URL"));
    }
}
