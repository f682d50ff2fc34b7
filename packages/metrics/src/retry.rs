//! HTTP retry helper for transient datastore errors.
//!
//! Datastore calls go through [`send_json`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so every request gets
//! retry with exponential backoff on connection failures, timeouts,
//! HTTP 429 and HTTP 5xx.
//!
//! ```ignore
//! let body = retry::send_json(|| client.get(&url).query(&params)).await?;
//! ```

use std::time::Duration;

use crate::MetricsError;

/// Maximum number of retries for transient HTTP errors.
///
/// Overlay fetches sit behind interactive input, so the budget is small:
/// backoff of 250ms, 500ms and 1s before giving up.
const MAX_RETRIES: u32 = 3;

/// Delay before the first retry; doubles on each attempt.
const BASE_DELAY: Duration = Duration::from_millis(250);

/// Maximum length of the response body preview included in errors.
const BODY_PREVIEW_LEN: usize = 300;

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`.
///
/// Does **not** retry HTTP 4xx other than 429; those are permanent.
///
/// # Errors
///
/// Returns [`MetricsError`] if the request fails after all retries, the
/// server returns a non-retryable status code, or the body is not JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, MetricsError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, MAX_RETRIES).await?;
    let url = response.url().to_string();
    let status = response.status();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        let preview = if text.len() > BODY_PREVIEW_LEN {
            format!("{}...", text.chars().take(BODY_PREVIEW_LEN).collect::<String>())
        } else {
            text.clone()
        };
        log::error!(
            "JSON parse failed\n  url: {url}\n  status: {status}\n  \
             parse error: {e}\n  body preview: {preview}"
        );
        MetricsError::Query {
            message: format!("JSON parse failed: {e} (status={status})"),
        }
    })
}

/// Core retry loop.
///
/// Returns the successful [`reqwest::Response`] (status 2xx or 3xx).
#[allow(clippy::future_not_send)]
async fn send_inner<F>(build_request: &F, max_retries: u32) -> Result<reqwest::Response, MetricsError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_error: Option<MetricsError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    last_error = Some(MetricsError::Http(e));
                    continue;
                }
                return Err(MetricsError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    if attempt < max_retries {
                        log::warn!("  HTTP {status}");
                        last_error = Some(MetricsError::Query {
                            message: format!("HTTP {status}"),
                        });
                        continue;
                    }
                    return Err(MetricsError::Query {
                        message: format!("HTTP {status} after {max_retries} retries"),
                    });
                }

                if status.is_client_error() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(MetricsError::Query {
                        message: format!("HTTP {status}: {body}"),
                    });
                }

                return Ok(response);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| MetricsError::Query {
        message: "request failed after all retries".to_string(),
    }))
}

/// Delay before retry number `attempt` (1-based).
fn backoff(attempt: u32) -> Duration {
    BASE_DELAY * (1u32 << attempt.saturating_sub(1).min(8))
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff(1), Duration::from_millis(250));
        assert_eq!(backoff(2), Duration::from_millis(500));
        assert_eq!(backoff(3), Duration::from_secs(1));
    }
}
