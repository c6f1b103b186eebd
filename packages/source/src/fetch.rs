//! HTTP fetch with retry for transient errors.
//!
//! The portal occasionally times out or returns 5xx under load; every
//! download goes through [`fetch_csv`], which retries those with
//! exponential backoff instead of failing the whole run on the first
//! hiccup. Non-retryable statuses (4xx other than 429) fail immediately.

use std::time::Duration;

use crate::SourceError;

/// Maximum number of retry attempts for transient HTTP errors.
///
/// With exponential backoff (2s, 4s, 8s, 16s, 32s) the total wait before
/// giving up is 62 seconds.
const MAX_RETRIES: u32 = 5;

/// Per-request timeout. The full dataset is a few tens of megabytes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Downloads the source CSV, returning the raw (Latin-1) bytes.
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the request fails after all retries,
/// or [`SourceError::Status`] for a non-retryable HTTP status.
#[allow(clippy::future_not_send)]
pub async fn fetch_csv(url: &str) -> Result<Vec<u8>, SourceError> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    let mut last_error: Option<SourceError> = None;

    for attempt in 0..=MAX_RETRIES {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << attempt); // 2s, 4s, 8s
            log::warn!("  retry {attempt}/{MAX_RETRIES} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match client.get(url).send().await {
            Err(e) => {
                if is_transient(&e) && attempt < MAX_RETRIES {
                    log::warn!("  transient error: {e}");
                    last_error = Some(SourceError::Http(e));
                    continue;
                }
                return Err(SourceError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                // 429 and 5xx are worth retrying; other 4xx are permanent.
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    if attempt < MAX_RETRIES {
                        log::warn!("  HTTP {status}, retrying");
                        last_error = Some(SourceError::Status {
                            status,
                            url: url.to_string(),
                        });
                        continue;
                    }
                    return Err(SourceError::Status {
                        status,
                        url: url.to_string(),
                    });
                }

                if !status.is_success() {
                    return Err(SourceError::Status {
                        status,
                        url: url.to_string(),
                    });
                }

                return Ok(response.bytes().await?.to_vec());
            }
        }
    }

    Err(last_error.unwrap_or(SourceError::Empty))
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
}
