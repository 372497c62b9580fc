//! Shared HTTP helpers.

use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::{ExternalServiceError, ServiceResult};

/// Longest error body kept in error details.
const MAX_ERROR_BODY: usize = 500;

/// Build a client with a request timeout.
pub(crate) fn build_client(timeout: Duration) -> ServiceResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ExternalServiceError::unconfigured(format!("HTTP client setup failed: {}", e)))
}

/// Turn a non-success response into a `RequestFailed` error.
pub(crate) async fn ensure_success(service: &str, response: Response) -> ServiceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY).collect();
    Err(ExternalServiceError::request_failed(format!(
        "{} returned {}: {}",
        service, status, body
    )))
}

/// Join a base URL and a path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://a/", "/v1/x"), "http://a/v1/x");
        assert_eq!(join_url("http://a", "v1/x"), "http://a/v1/x");
    }
}
