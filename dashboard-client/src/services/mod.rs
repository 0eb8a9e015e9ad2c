//! Thin HTTP wrappers over the backend REST API.
//!
//! Each client method maps 1:1 to an endpoint and normalizes failures: the
//! backend's `{ "message": ... }` body becomes the error message, with a
//! per-call fallback when the body carries none.

pub mod report_client;
pub mod requisition_client;

use requisition_core::error::AppError;
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Normalize a response: 2xx passes through, anything else becomes
/// `AppError::Api` with the server's message or `fallback`.
pub(crate) async fn expect_success(
    response: reqwest::Response,
    fallback: &str,
) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| fallback.to_string());

    tracing::error!(status = status.as_u16(), message = %message, "backend request failed");

    Err(AppError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Normalize and deserialize a JSON response body.
pub(crate) async fn parse_json<T: DeserializeOwned>(
    response: reqwest::Response,
    fallback: &str,
) -> Result<T, AppError> {
    let response = expect_success(response, fallback).await?;
    Ok(response.json::<T>().await?)
}
