// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a page body as text.
///
/// Non-success statuses are network errors. A body that is blank, or whose
/// declared content type is not markup, is a parse error.
pub async fn fetch_markup(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?.error_for_status()?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    if let Some(content_type) = content_type.as_deref() {
        if !is_markup_type(content_type) {
            return Err(AppError::parse(format!(
                "{url} returned non-markup content type '{content_type}'"
            )));
        }
    }

    let text = response.text().await?;
    if text.trim().is_empty() {
        return Err(AppError::parse(format!("{url} returned an empty document")));
    }
    Ok(text)
}

fn is_markup_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml" || mime.ends_with("/xml")
}
